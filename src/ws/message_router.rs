use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{MessageType, WebSocketMessage, order::OrderQuery},
    services::order_service::OrderService,
    ws::connection::SharedConnectionManager,
};

/// Message router trait for handling websocket messages
#[async_trait]
pub trait MessageRouter: Send + Sync {
    async fn route_message(
        &self,
        connection_id: Uuid,
        message: WebSocketMessage<Value>,
        connection_manager: SharedConnectionManager,
    ) -> Result<()>;
}

/// Default implementation of the MessageRouter trait
pub struct DefaultMessageRouter {
    orders: OrderService,
}

impl DefaultMessageRouter {
    pub fn new(orders: OrderService) -> Self {
        Self { orders }
    }

    /// Reply with every order visible to the connection
    async fn handle_refresh(
        &self,
        connection_id: Uuid,
        data: Value,
        connection_manager: SharedConnectionManager,
    ) -> Result<()> {
        let claims = connection_manager
            .claims_of(&connection_id)
            .await
            .ok_or_else(|| AppError::Auth("Not authenticated".to_string()))?;

        let query: OrderQuery = match data {
            Value::Null => OrderQuery::default(),
            data => serde_json::from_value(data)
                .map_err(|e| AppError::BadRequest(format!("Invalid refresh request: {}", e)))?,
        };

        let orders = self.orders.list_orders(&claims, &query).await?;
        let message = WebSocketMessage::new(MessageType::OrdersSnapshot, orders);
        connection_manager.send_to(&connection_id, message).await
    }

    async fn handle_ping(
        &self,
        connection_id: Uuid,
        connection_manager: SharedConnectionManager,
    ) -> Result<()> {
        let message = WebSocketMessage::new(MessageType::Pong, Value::Null);
        connection_manager.send_to(&connection_id, message).await
    }
}

#[async_trait]
impl MessageRouter for DefaultMessageRouter {
    async fn route_message(
        &self,
        connection_id: Uuid,
        message: WebSocketMessage<Value>,
        connection_manager: SharedConnectionManager,
    ) -> Result<()> {
        let message_type = serde_json::from_value::<MessageType>(Value::String(message.type_.clone()));

        match message_type {
            Ok(MessageType::Refresh) => {
                self.handle_refresh(connection_id, message.data, connection_manager)
                    .await
            }
            Ok(MessageType::Ping) => self.handle_ping(connection_id, connection_manager).await,
            _ => {
                tracing::warn!("Unhandled message type: {}", message.type_);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::extract::ws::Message;
    use tokio::sync::mpsc;

    use super::*;
    use crate::{
        db::{init_memory_pool, order_store::OrderStore},
        models::{
            order::OrderInput,
            stage::StageVocabulary,
            user::{Claims, Role},
        },
        ws::ConnectionManager,
    };

    async fn router() -> DefaultMessageRouter {
        let pool = init_memory_pool().await.unwrap();
        let orders = OrderService::new(OrderStore::new(pool), Arc::new(StageVocabulary::production()));
        for (order_number, client_code) in [("WS-1", "WS"), ("WS-2", "WS"), ("LD-1", "LD")] {
            orders
                .create_order(OrderInput {
                    order_number: order_number.to_string(),
                    client_code: client_code.to_string(),
                    design: "Valley Sunset".to_string(),
                    size: "9' x 12'".to_string(),
                    status: "DYEING".to_string(),
                    order_issued: Some("2024-01-01".to_string()),
                    delivery_date: Some("2024-03-01".to_string()),
                    has_delay: false,
                    delay_reason: None,
                })
                .await
                .unwrap();
        }
        DefaultMessageRouter::new(orders)
    }

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

    async fn connect(
        manager: &SharedConnectionManager,
        claims: Claims,
    ) -> (Uuid, mpsc::Receiver<Message>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(8);
        manager.register(id, tx, claims).await;
        (id, rx)
    }

    fn incoming(json: &str) -> WebSocketMessage<Value> {
        serde_json::from_str(json).unwrap()
    }

    fn next_message(rx: &mut mpsc::Receiver<Message>) -> Value {
        match rx.try_recv().expect("no message queued") {
            Message::Text(text) => serde_json::from_str(text.as_str()).unwrap(),
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    fn order_numbers(message: &Value) -> Vec<String> {
        message["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|order| order["orderNumber"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn refresh_sends_snapshot_scoped_to_client() {
        let router = router().await;
        let manager: SharedConnectionManager = Arc::new(ConnectionManager::new());
        let (ws_id, mut ws_rx) = connect(&manager, claims(Role::Client, Some("WS"))).await;
        let (_ld_id, mut ld_rx) = connect(&manager, claims(Role::Client, Some("LD"))).await;

        router
            .route_message(ws_id, incoming(r#"{"type":"refresh"}"#), manager.clone())
            .await
            .unwrap();

        let snapshot = next_message(&mut ws_rx);
        assert_eq!(snapshot["type"], "orders_snapshot");
        assert_eq!(order_numbers(&snapshot), vec!["WS-1", "WS-2"]);
        assert!(ws_rx.try_recv().is_err());
        assert!(ld_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn refresh_for_admin_lists_every_order() {
        let router = router().await;
        let manager: SharedConnectionManager = Arc::new(ConnectionManager::new());
        let (admin_id, mut admin_rx) = connect(&manager, claims(Role::Admin, None)).await;

        router
            .route_message(
                admin_id,
                incoming(r#"{"type":"refresh","data":{"q":"ld"}}"#),
                manager.clone(),
            )
            .await
            .unwrap();
        assert_eq!(order_numbers(&next_message(&mut admin_rx)), vec!["LD-1"]);

        router
            .route_message(admin_id, incoming(r#"{"type":"refresh"}"#), manager.clone())
            .await
            .unwrap();
        assert_eq!(
            order_numbers(&next_message(&mut admin_rx)),
            vec!["LD-1", "WS-1", "WS-2"]
        );
    }

    #[tokio::test]
    async fn ping_gets_pong() {
        let router = router().await;
        let manager: SharedConnectionManager = Arc::new(ConnectionManager::new());
        let (id, mut rx) = connect(&manager, claims(Role::Client, Some("WS"))).await;

        router
            .route_message(id, incoming(r#"{"type":"ping"}"#), manager.clone())
            .await
            .unwrap();

        let pong = next_message(&mut rx);
        assert_eq!(pong["type"], "pong");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn refresh_from_unknown_connection_is_rejected() {
        let router = router().await;
        let manager: SharedConnectionManager = Arc::new(ConnectionManager::new());

        let result = router
            .route_message(Uuid::new_v4(), incoming(r#"{"type":"refresh"}"#), manager)
            .await;
        assert!(matches!(result, Err(AppError::Auth(_))));
    }

    #[tokio::test]
    async fn unknown_types_are_ignored() {
        let router = router().await;
        let manager: SharedConnectionManager = Arc::new(ConnectionManager::new());
        let (id, mut rx) = connect(&manager, claims(Role::Admin, None)).await;

        router
            .route_message(id, incoming(r#"{"type":"order_update","data":{}}"#), manager.clone())
            .await
            .unwrap();
        assert!(rx.try_recv().is_err());
    }
}
