use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;

use crate::{
    error::Result,
    handlers::{AdminUser, AppState},
    models::{
        order::{OrderDeletionData, OrderInput},
        user::NewClientAccount,
    },
};

/// Create order handler
pub async fn create_order(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(input): Json<OrderInput>,
) -> Result<impl IntoResponse> {
    let order = state.orders.create_order(input).await?;

    // Push the new order to everyone who can see it
    state.connection_manager.broadcast_order_update(&order).await?;

    Ok((StatusCode::CREATED, Json(order)))
}

/// Update order handler
pub async fn update_order(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(order_number): Path<String>,
    Json(input): Json<OrderInput>,
) -> Result<impl IntoResponse> {
    let updated = state.orders.update_order(&order_number, input).await?;
    state
        .connection_manager
        .broadcast_order_change(&updated.order, &updated.previous_client_code)
        .await?;

    Ok((StatusCode::OK, Json(updated.order)))
}

/// Delete order handler
pub async fn delete_order(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(order_number): Path<String>,
) -> Result<impl IntoResponse> {
    let record = state.orders.delete_order(&order_number).await?;

    let deletion = OrderDeletionData {
        order_number: record.order_number,
        client_code: record.client_code,
        deleted: true,
        timestamp: Utc::now(),
    };
    state.connection_manager.broadcast_order_deletion(deletion).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_clients(State(state): State<AppState>, _admin: AdminUser) -> Result<impl IntoResponse> {
    let users = state.auth.list_users().await?;
    Ok((StatusCode::OK, Json(users)))
}

pub async fn create_client(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(account): Json<NewClientAccount>,
) -> Result<impl IntoResponse> {
    let user = state.auth.create_client(account).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn delete_client(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    state.auth.delete_client(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Buyer codes that appear on stored orders
pub async fn client_codes(State(state): State<AppState>, _admin: AdminUser) -> Result<impl IntoResponse> {
    let codes = state.orders.client_codes().await?;
    Ok((StatusCode::OK, Json(codes)))
}
