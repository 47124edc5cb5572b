use std::{collections::HashMap, sync::Arc};

use axum::extract::ws::{Message, WebSocket};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{
    RwLock,
    mpsc::{self, error::TrySendError},
};
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{
        ConnectionStatus, ConnectionStatusData, MessageType, WebSocketMessage,
        order::{Order, OrderDeletionData},
        user::Claims,
    },
    ws::MessageRouter,
};

/// A registered connection and the user behind it
struct Subscriber {
    sender: mpsc::Sender<Message>,
    claims: Claims,
}

/// WebSocket connection manager
pub struct ConnectionManager {
    connections: RwLock<HashMap<Uuid, Subscriber>>,
}

impl ConnectionManager {
    /// Create a new connection manager
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new connection
    pub async fn register(&self, id: Uuid, sender: mpsc::Sender<Message>, claims: Claims) {
        let mut connections = self.connections.write().await;
        tracing::info!("Registered connection {} for {}", id, claims.username);
        connections.insert(id, Subscriber { sender, claims });
    }

    /// Unregister a connection
    pub async fn unregister(&self, id: &Uuid) {
        let mut connections = self.connections.write().await;
        connections.remove(id);
        tracing::info!("Unregistered connection {}", id);
    }

    pub async fn claims_of(&self, connection_id: &Uuid) -> Option<Claims> {
        let connections = self.connections.read().await;
        connections.get(connection_id).map(|s| s.claims.clone())
    }

    /// Send a message to a specific connection
    pub async fn send_to(&self, connection_id: &Uuid, message: impl Serialize) -> Result<()> {
        let sender = {
            let connections = self.connections.read().await;
            connections
                .get(connection_id)
                .map(|subscriber| subscriber.sender.clone())
                .ok_or_else(|| AppError::WebSocket(format!("Connection {} not found", connection_id)))?
        };

        let message_json = serde_json::to_string(&message).map_err(AppError::Json)?;
        if let Err(e) = sender.send(Message::Text(message_json.into())).await {
            tracing::error!("Failed to send message to {}: {}", connection_id, e);
            return Err(AppError::WebSocket(format!("Failed to send message: {}", e)));
        }

        Ok(())
    }

    /// Queue a message on every connection whose claims pass `filter`.
    ///
    /// Never waits on a subscriber: a connection whose queue is full misses
    /// the message. Returns how many connections received it.
    async fn broadcast_where(
        &self,
        message: impl Serialize,
        filter: impl Fn(&Claims) -> bool,
    ) -> Result<usize> {
        let message_json = serde_json::to_string(&message).map_err(AppError::Json)?;
        let targets: Vec<(Uuid, mpsc::Sender<Message>)> = {
            let connections = self.connections.read().await;
            connections
                .iter()
                .filter(|(_, subscriber)| filter(&subscriber.claims))
                .map(|(id, subscriber)| (*id, subscriber.sender.clone()))
                .collect()
        };

        let mut delivered = 0;
        for (id, sender) in targets {
            match sender.try_send(Message::Text(message_json.clone().into())) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!("Connection {} is not draining its queue, message dropped", id)
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!("Connection {} already closed", id)
                }
            }
        }

        Ok(delivered)
    }

    /// Send a message to every connection allowed to see `client_code`.
    /// Returns how many connections received it.
    pub async fn broadcast_to_client(&self, client_code: &str, message: impl Serialize) -> Result<usize> {
        self.broadcast_where(message, |claims| claims.can_view(client_code))
            .await
    }

    /// Broadcast an order change
    pub async fn broadcast_order_update(&self, order: &Order) -> Result<usize> {
        let message = WebSocketMessage::new(MessageType::OrderUpdate, order);
        self.broadcast_to_client(&order.client_code, message).await
    }

    /// Broadcast an order that may have moved to another client.
    ///
    /// Connections that could see the order under `previous_client_code` but
    /// not under its new code get an `order_deletion` first.
    pub async fn broadcast_order_change(
        &self,
        order: &Order,
        previous_client_code: &str,
    ) -> Result<usize> {
        if !previous_client_code.eq_ignore_ascii_case(&order.client_code) {
            let deletion = OrderDeletionData {
                order_number: order.order_number.clone(),
                client_code: previous_client_code.to_string(),
                deleted: true,
                timestamp: Utc::now(),
            };
            let message = WebSocketMessage::new(MessageType::OrderDeletion, deletion);
            let revoked = self
                .broadcast_where(message, |claims| {
                    claims.can_view(previous_client_code) && !claims.can_view(&order.client_code)
                })
                .await?;
            tracing::info!(
                order_number = %order.order_number,
                from = previous_client_code,
                to = %order.client_code,
                revoked,
                "Order moved to another client"
            );
        }

        self.broadcast_order_update(order).await
    }

    /// Broadcast an order deletion
    pub async fn broadcast_order_deletion(&self, deletion: OrderDeletionData) -> Result<usize> {
        let client_code = deletion.client_code.clone();
        let message = WebSocketMessage::new(MessageType::OrderDeletion, deletion);
        self.broadcast_to_client(&client_code, message).await
    }

    /// Send a connection status update to a specific connection
    pub async fn send_connection_status(
        &self,
        connection_id: &Uuid,
        status: ConnectionStatus,
    ) -> Result<()> {
        let status_data = ConnectionStatusData { status };
        let message = WebSocketMessage::new(MessageType::ConnectionStatus, status_data);
        self.send_to(connection_id, message).await
    }

    /// Get the number of active connections
    pub async fn connection_count(&self) -> usize {
        let connections = self.connections.read().await;
        connections.len()
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared state for the connection manager
pub type SharedConnectionManager = Arc<ConnectionManager>;

/// Handle an authenticated WebSocket connection
pub async fn handle_socket(
    socket: WebSocket,
    claims: Claims,
    connection_manager: SharedConnectionManager,
    router: Arc<dyn MessageRouter>,
) {
    let connection_id = Uuid::new_v4();
    tracing::info!("New websocket connection: {}", connection_id);

    let (mut sender, mut receiver) = socket.split();

    // Everything bound for this client goes through one channel
    let (tx, mut rx) = mpsc::channel::<Message>(100);

    connection_manager.register(connection_id, tx.clone(), claims).await;

    if let Err(e) = connection_manager
        .send_connection_status(&connection_id, ConnectionStatus::Connected)
        .await
    {
        tracing::error!("Error sending connection status: {}", e);
    }

    let mut forward_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if let Err(e) = sender.send(message).await {
                tracing::error!("Error sending WebSocket message: {}", e);
                break;
            }
        }
    });

    let manager = connection_manager.clone();
    let mut receive_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Text(text)) => {
                    tracing::debug!("Received message: {}", text.as_str());

                    match serde_json::from_str::<WebSocketMessage<Value>>(text.as_str()) {
                        Ok(message) => {
                            if let Err(e) = router
                                .route_message(connection_id, message, manager.clone())
                                .await
                            {
                                tracing::error!("Error routing message: {}", e);
                            }
                        }
                        Err(e) => {
                            tracing::error!("Error parsing message: {}", e);
                        }
                    }
                }
                Ok(Message::Binary(_)) => {
                    tracing::debug!("Received binary message");
                }
                Ok(Message::Ping(data)) => {
                    if let Err(e) = tx.send(Message::Pong(data)).await {
                        tracing::error!("Error sending pong: {}", e);
                        break;
                    }
                }
                Ok(Message::Pong(_)) => {
                    tracing::debug!("Received pong");
                }
                Ok(Message::Close(_)) => {
                    tracing::info!("Client disconnected");
                    break;
                }
                Err(e) => {
                    tracing::error!("WebSocket error: {}", e);
                    break;
                }
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = &mut forward_task => receive_task.abort(),
        _ = &mut receive_task => forward_task.abort(),
    }

    connection_manager.unregister(&connection_id).await;
    tracing::info!("WebSocket connection closed: {}", connection_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::models::{order::OrderRecord, stage::StageVocabulary, user::Role};

    fn claims(role: Role, client_code: Option<&str>) -> Claims {
        Claims {
            sub: 1,
            username: "tester".to_string(),
            role,
            client_code: client_code.map(str::to_string),
            exp: 0,
            iat: 0,
        }
    }

    #[tokio::test]
    async fn broadcast_reaches_owner_and_admin_only() {
        let manager = ConnectionManager::new();
        let (ws_tx, mut ws_rx) = mpsc::channel(4);
        let (ld_tx, mut ld_rx) = mpsc::channel(4);
        let (admin_tx, mut admin_rx) = mpsc::channel(4);

        manager.register(Uuid::new_v4(), ws_tx, claims(Role::Client, Some("WS"))).await;
        manager.register(Uuid::new_v4(), ld_tx, claims(Role::Client, Some("LD"))).await;
        manager.register(Uuid::new_v4(), admin_tx, claims(Role::Admin, None)).await;

        let delivered = manager
            .broadcast_to_client("ws", serde_json::json!({ "order_number": "WS-1" }))
            .await
            .unwrap();

        assert_eq!(delivered, 2);
        assert!(ws_rx.try_recv().is_ok());
        assert!(admin_rx.try_recv().is_ok());
        assert!(ld_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn send_to_unknown_connection_fails() {
        let manager = ConnectionManager::new();
        let result = manager.send_to(&Uuid::new_v4(), "hello").await;
        assert!(matches!(result, Err(AppError::WebSocket(_))));
        assert_eq!(manager.connection_count().await, 0);
    }

    #[tokio::test]
    async fn unregister_removes_connection() {
        let manager = ConnectionManager::new();
        let id = Uuid::new_v4();
        let (tx, _rx) = mpsc::channel(1);
        manager.register(id, tx, claims(Role::Client, Some("WS"))).await;
        assert_eq!(manager.connection_count().await, 1);
        assert!(manager.claims_of(&id).await.is_some());
        manager.unregister(&id).await;
        assert_eq!(manager.connection_count().await, 0);
    }

    fn order(order_number: &str, client_code: &str) -> Order {
        let record = OrderRecord {
            id: "a1".to_string(),
            order_number: order_number.to_string(),
            client_code: client_code.to_string(),
            design: "Himalayan Bloom".to_string(),
            size: "8' x 10'".to_string(),
            status: Some("DYEING".to_string()),
            order_issued: Some("2024-01-01".to_string()),
            delivery_date: Some("2024-03-01".to_string()),
            has_delay: false,
            delay_reason: None,
            last_edit: Utc::now(),
        };
        Order::from_record(record, &StageVocabulary::production(), Utc::now())
    }

    fn received_type(rx: &mut mpsc::Receiver<Message>) -> Option<String> {
        match rx.try_recv().ok()? {
            Message::Text(text) => {
                let value: Value = serde_json::from_str(text.as_str()).unwrap();
                value["type"].as_str().map(str::to_string)
            }
            _ => None,
        }
    }

    #[tokio::test]
    async fn moved_order_is_withdrawn_from_previous_owner() {
        let manager = ConnectionManager::new();
        let (ws_tx, mut ws_rx) = mpsc::channel(4);
        let (ld_tx, mut ld_rx) = mpsc::channel(4);
        let (admin_tx, mut admin_rx) = mpsc::channel(4);

        manager.register(Uuid::new_v4(), ws_tx, claims(Role::Client, Some("WS"))).await;
        manager.register(Uuid::new_v4(), ld_tx, claims(Role::Client, Some("LD"))).await;
        manager.register(Uuid::new_v4(), admin_tx, claims(Role::Admin, None)).await;

        let delivered = manager
            .broadcast_order_change(&order("WS-1", "LD"), "WS")
            .await
            .unwrap();
        assert_eq!(delivered, 2);

        assert_eq!(received_type(&mut ws_rx).as_deref(), Some("order_deletion"));
        assert_eq!(received_type(&mut ws_rx), None);
        assert_eq!(received_type(&mut ld_rx).as_deref(), Some("order_update"));
        assert_eq!(received_type(&mut admin_rx).as_deref(), Some("order_update"));
        assert_eq!(received_type(&mut admin_rx), None);
    }

    #[tokio::test]
    async fn unchanged_owner_only_gets_update() {
        let manager = ConnectionManager::new();
        let (ws_tx, mut ws_rx) = mpsc::channel(4);
        manager.register(Uuid::new_v4(), ws_tx, claims(Role::Client, Some("WS"))).await;

        manager
            .broadcast_order_change(&order("WS-1", "WS"), "ws")
            .await
            .unwrap();

        assert_eq!(received_type(&mut ws_rx).as_deref(), Some("order_update"));
        assert_eq!(received_type(&mut ws_rx), None);
    }

    #[tokio::test]
    async fn stalled_connection_does_not_block_others() {
        let manager = ConnectionManager::new();
        let (stalled_tx, _stalled_rx) = mpsc::channel(1);
        let (ws_tx, mut ws_rx) = mpsc::channel(4);
        manager.register(Uuid::new_v4(), stalled_tx, claims(Role::Admin, None)).await;
        manager.register(Uuid::new_v4(), ws_tx, claims(Role::Client, Some("WS"))).await;

        let first = manager.broadcast_to_client("WS", "first").await.unwrap();
        assert_eq!(first, 2);

        let second = tokio::time::timeout(
            Duration::from_secs(1),
            manager.broadcast_to_client("WS", "second"),
        )
        .await
        .expect("broadcast waited on a full queue")
        .unwrap();
        assert_eq!(second, 1);

        let (late_tx, _late_rx) = mpsc::channel(1);
        tokio::time::timeout(
            Duration::from_secs(1),
            manager.register(Uuid::new_v4(), late_tx, claims(Role::Client, Some("LD"))),
        )
        .await
        .expect("register blocked behind a broadcast");

        assert!(ws_rx.try_recv().is_ok());
        assert!(ws_rx.try_recv().is_ok());
        assert_eq!(manager.connection_count().await, 3);
    }

    #[tokio::test]
    async fn closed_connection_is_skipped() {
        let manager = ConnectionManager::new();
        let (tx, rx) = mpsc::channel(1);
        manager.register(Uuid::new_v4(), tx, claims(Role::Admin, None)).await;
        drop(rx);

        assert_eq!(manager.broadcast_to_client("WS", "gone").await.unwrap(), 0);
    }
}
