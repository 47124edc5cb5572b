use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;

use crate::{
    error::Result,
    handlers::{AppState, AuthUser},
    models::{
        order::{OrderDetail, OrderQuery},
        stage::Stage,
    },
};

/// Stage catalogue entry
#[derive(Debug, Serialize)]
pub struct StageInfo {
    pub code: Stage,
    pub label: &'static str,
    pub description: &'static str,
    pub rank: usize,
    pub terminal: bool,
}

/// Stages of the active vocabulary in rank order
pub async fn list_stages(State(state): State<AppState>, _user: AuthUser) -> impl IntoResponse {
    let vocabulary = state.orders.vocabulary();
    let stages: Vec<StageInfo> = vocabulary
        .ranked()
        .map(|(rank, stage)| StageInfo {
            code: stage,
            label: stage.label(),
            description: stage.description(),
            rank,
            terminal: vocabulary.terminal().contains(&stage),
        })
        .collect();

    Json(stages)
}

pub async fn list_orders(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Query(query): Query<OrderQuery>,
) -> Result<impl IntoResponse> {
    let orders = state.orders.list_orders(&claims, &query).await?;
    Ok((StatusCode::OK, Json(orders)))
}

pub async fn order_summary(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<impl IntoResponse> {
    let summary = state.orders.summary(&claims).await?;
    Ok((StatusCode::OK, Json(summary)))
}

pub async fn get_order(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(order_number): Path<String>,
) -> Result<impl IntoResponse> {
    let order = state.orders.get_order(&claims, &order_number).await?;
    Ok((StatusCode::OK, Json(OrderDetail::from(order))))
}
