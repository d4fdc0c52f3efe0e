//! Admin order handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use shared::models::{
    Order, OrderFilter, PageRequest, PaginatedResponse, PaymentStatusUpdate, StatusUpdate,
};

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::utils::{ApiResponse, AppResult};

pub async fn list(
    State(state): State<ServerState>,
    user: CurrentUser,
    Query(filter): Query<OrderFilter>,
    Query(page): Query<PageRequest>,
) -> AppResult<Json<ApiResponse<PaginatedResponse<Order>>>> {
    let actor = user.actor()?;
    let orders = state.orders.list_orders_admin(&actor, &filter, page).await?;
    Ok(Json(ApiResponse::success(orders)))
}

pub async fn update_status(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(update): Json<StatusUpdate>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let actor = user.actor()?;
    let order = state.orders.transition_status(&actor, id, update).await?;
    Ok(Json(ApiResponse::success(order)))
}

pub async fn update_payment(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(update): Json<PaymentStatusUpdate>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let actor = user.actor()?;
    let order = state
        .orders
        .transition_payment_status(&actor, id, update.payment_status)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Returns the deleted order
pub async fn delete(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let actor = user.actor()?;
    let order = state.orders.delete_order(&actor, id).await?;
    Ok(Json(ApiResponse::success_with_message("Order deleted", order)))
}
