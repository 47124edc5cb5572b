use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// WebSocket message types exchanged with portal clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// Connection status update to client
    ConnectionStatus,
    /// An order was created or changed
    OrderUpdate,
    /// An order was removed
    OrderDeletion,
    /// Client asks for its current order list
    Refresh,
    /// Full list of the orders visible to a connection
    OrdersSnapshot,
    Ping,
    Pong,
}

impl MessageType {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::ConnectionStatus => "connection_status",
            MessageType::OrderUpdate => "order_update",
            MessageType::OrderDeletion => "order_deletion",
            MessageType::Refresh => "refresh",
            MessageType::OrdersSnapshot => "orders_snapshot",
            MessageType::Ping => "ping",
            MessageType::Pong => "pong",
        }
    }
}

/// WebSocket message structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSocketMessage<T> {
    /// Message type
    #[serde(rename = "type")]
    pub type_: String,
    /// Message data, absent on bare requests such as `ping`
    #[serde(default)]
    pub data: T,
    /// Timestamp when the message was created
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    /// Optional message ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
}

impl<T> WebSocketMessage<T> {
    pub fn new(type_: MessageType, data: T) -> Self {
        Self {
            type_: type_.as_str().to_string(),
            data,
            timestamp: Utc::now(),
            id: Some(Uuid::new_v4()),
        }
    }
}

/// Connection status message sent to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionStatusData {
    pub status: ConnectionStatus,
}

/// Connection status enum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
}
