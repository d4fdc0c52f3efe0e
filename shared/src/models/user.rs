//! User Model
//!
//! Users are managed by the account surface; the order core only reads them
//! and bumps the aggregate counters when an order is placed.

use serde::{Deserialize, Serialize};

/// User entity with order aggregates
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    /// "customer" | "admin"
    pub role: String,
    /// Orders ever placed (not reduced by cancellation or return)
    pub total_orders: i64,
    /// Sum of order totals ever placed (not reduced by cancellation or return)
    pub total_spent: f64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create user payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCreate {
    pub name: String,
    pub email: String,
    pub role: Option<String>,
}

/// Per-user order rollup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserOrderStats {
    pub user_id: i64,
    pub total_orders: i64,
    pub total_spent: f64,
}
