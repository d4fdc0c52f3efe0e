//! Admin API Module
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/admin/orders | GET | 订单列表 (过滤 + 分页) |
//! | /api/admin/orders/stats | GET | 统计看板 |
//! | /api/admin/orders/recent | GET | 最近订单 |
//! | /api/admin/orders/{id}/status | PUT | 状态流转 |
//! | /api/admin/orders/{id}/payment | PUT | 支付状态 |
//! | /api/admin/orders/{id} | DELETE | 删除订单 |
//! | /api/admin/products | GET/POST | 商品列表 / 新建 |
//! | /api/admin/products/low-stock | GET | 低库存报表 |
//! | /api/admin/products/{id}/stock | PUT | 库存校正 |
//! | /api/admin/users/{id}/stats | GET | 用户订单汇总 |
//!
//! 全部要求管理员角色

mod orders;
mod products;
mod statistics;

use axum::{
    Router, middleware,
    routing::{delete, get, put},
};

use crate::auth::require_admin;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/admin", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/orders", get(orders::list))
        .route("/orders/stats", get(statistics::order_stats))
        .route("/orders/recent", get(statistics::recent_orders))
        .route("/orders/{id}", delete(orders::delete))
        .route("/orders/{id}/status", put(orders::update_status))
        .route("/orders/{id}/payment", put(orders::update_payment))
        .route("/products", get(products::list).post(products::create))
        .route("/products/low-stock", get(products::low_stock))
        .route("/products/{id}/stock", put(products::set_stock))
        .route("/users/{id}/stats", get(statistics::user_stats))
        .layer(middleware::from_fn(require_admin))
}
