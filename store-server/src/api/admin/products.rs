//! Admin product handlers

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use shared::models::{Product, ProductCreate};

use crate::core::ServerState;
use crate::utils::{ApiResponse, AppResult};

#[derive(Debug, Deserialize)]
pub struct StockCorrection {
    pub stock: i64,
}

pub async fn list(State(state): State<ServerState>) -> AppResult<Json<ApiResponse<Vec<Product>>>> {
    let products = state.inventory.list_products().await?;
    Ok(Json(ApiResponse::success(products)))
}

pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<ProductCreate>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let product = state.inventory.create_product(payload).await?;
    Ok(Json(ApiResponse::success(product)))
}

/// Products at or below their reorder threshold
pub async fn low_stock(
    State(state): State<ServerState>,
) -> AppResult<Json<ApiResponse<Vec<Product>>>> {
    let products = state.inventory.list_low_stock().await?;
    Ok(Json(ApiResponse::success(products)))
}

/// Absolute stock correction after a physical count
pub async fn set_stock(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<StockCorrection>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let product = state.inventory.set_stock(id, payload.stock).await?;
    Ok(Json(ApiResponse::success(product)))
}
