use axum::{
    extract::{
        ws::{WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use serde::Deserialize;

use crate::{
    error::Result,
    handlers::AppState,
    models::user::Claims,
    ws::handle_socket,
};

/// Browsers cannot set headers on a WebSocket handshake, so the token
/// travels in the query string.
#[derive(Debug, Deserialize)]
pub struct WsAuth {
    pub token: String,
}

/// Handler for WebSocket connections
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(auth): Query<WsAuth>,
) -> Result<impl IntoResponse> {
    let claims = state.auth.tokens().verify(&auth.token)?;
    Ok(ws.on_upgrade(move |socket| handle_websocket(socket, claims, state)))
}

/// Handle a new WebSocket connection
async fn handle_websocket(socket: WebSocket, claims: Claims, state: AppState) {
    handle_socket(
        socket,
        claims,
        state.connection_manager,
        state.message_router,
    )
    .await;
}
