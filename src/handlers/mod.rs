use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::{
    config::Config,
    db::{order_store::OrderStore, user_store::UserStore, DbPool},
    services::{
        auth_service::{AuthService, TokenIssuer},
        order_service::OrderService,
    },
    ws::{ConnectionManager, DefaultMessageRouter, MessageRouter, SharedConnectionManager},
};

pub mod admin;
pub mod auth;
pub mod orders;
pub mod ws;

pub use auth::{AdminUser, AuthUser};

/// Shared application state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub orders: OrderService,
    pub connection_manager: SharedConnectionManager,
    pub message_router: Arc<dyn MessageRouter>,
}

impl AppState {
    pub fn new(pool: DbPool, config: &Config) -> Self {
        let tokens = TokenIssuer::new(&config.jwt_secret, config.jwt_expiration_hours);
        let auth = AuthService::new(UserStore::new(pool.clone()), tokens);
        let orders = OrderService::new(
            OrderStore::new(pool),
            Arc::new(config.stage_vocabulary()),
        );
        let message_router = Arc::new(DefaultMessageRouter::new(orders.clone()));

        Self {
            auth,
            orders,
            connection_manager: Arc::new(ConnectionManager::new()),
            message_router,
        }
    }
}

/// Build the HTTP router
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/me", get(auth::me))
        .route("/stages", get(orders::list_stages))
        .route("/orders", get(orders::list_orders))
        .route("/orders/summary", get(orders::order_summary))
        .route("/orders/{order_number}", get(orders::get_order))
        .route("/admin/orders", post(admin::create_order))
        .route(
            "/admin/orders/{order_number}",
            put(admin::update_order).delete(admin::delete_order),
        )
        .route(
            "/admin/clients",
            get(admin::list_clients).post(admin::create_client),
        )
        .route("/admin/clients/{id}", axum::routing::delete(admin::delete_client))
        .route("/admin/client-codes", get(admin::client_codes));

    Router::new()
        .route("/health", get(health))
        .route("/ws", get(ws::ws_handler))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
