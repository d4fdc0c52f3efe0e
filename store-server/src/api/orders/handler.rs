//! Order API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use shared::models::{Order, OrderCreate, OrderStatus, PageRequest, PaginatedResponse, StatusUpdate};

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::utils::{ApiResponse, AppResult};

/// Place an order for the authenticated user
pub async fn create(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<OrderCreate>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let actor = user.actor()?;
    let order = state.orders.create_order(&actor, payload).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// The caller's own orders, newest first
pub async fn list_mine(
    State(state): State<ServerState>,
    user: CurrentUser,
    Query(page): Query<PageRequest>,
) -> AppResult<Json<ApiResponse<PaginatedResponse<Order>>>> {
    let actor = user.actor()?;
    let orders = state.orders.list_orders_for_user(&actor, page).await?;
    Ok(Json(ApiResponse::success(orders)))
}

pub async fn get_by_id(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let actor = user.actor()?;
    let order = state.orders.get_order(&actor, id).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Cancel a pending order (owner) or any open order (admin)
pub async fn cancel(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let actor = user.actor()?;
    let order = state
        .orders
        .transition_status(&actor, id, StatusUpdate::to(OrderStatus::Cancelled))
        .await?;
    Ok(Json(ApiResponse::success(order)))
}
