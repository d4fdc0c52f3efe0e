//! Dashboard statistics handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::Utc;
use serde::Deserialize;
use shared::models::{Order, OrderStats, UserOrderStats};

use crate::core::ServerState;
use crate::statistics::{self, DASHBOARD_RECENT};
use crate::utils::{ApiResponse, AppResult};

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<i64>,
}

pub async fn order_stats(
    State(state): State<ServerState>,
) -> AppResult<Json<ApiResponse<OrderStats>>> {
    let stats = statistics::get_order_stats(state.pool(), Utc::now()).await?;
    Ok(Json(ApiResponse::success(stats)))
}

pub async fn recent_orders(
    State(state): State<ServerState>,
    Query(query): Query<RecentQuery>,
) -> AppResult<Json<ApiResponse<Vec<Order>>>> {
    let limit = query.limit.unwrap_or(DASHBOARD_RECENT);
    let orders = statistics::get_recent_orders(state.pool(), limit).await?;
    Ok(Json(ApiResponse::success(orders)))
}

pub async fn user_stats(
    State(state): State<ServerState>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<ApiResponse<UserOrderStats>>> {
    let stats = statistics::get_user_stats(state.pool(), user_id).await?;
    Ok(Json(ApiResponse::success(stats)))
}
