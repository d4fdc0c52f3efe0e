//! Product Model

use serde::{Deserialize, Serialize};

/// Product entity
///
/// `stock`, `min_stock` and `sold_count` are owned by the inventory ledger;
/// catalog edits never touch them directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Product {
    pub id: i64,
    /// Business key, immutable after creation
    pub sku: String,
    pub name: String,
    /// Unit price
    pub price: f64,
    pub image: String,
    /// Quantity available for sale (never negative)
    pub stock: i64,
    /// Reorder threshold, informational only
    pub min_stock: i64,
    pub sold_count: i64,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Product {
    /// At or below the reorder threshold
    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.min_stock
    }
}

/// Create product payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCreate {
    pub sku: String,
    pub name: String,
    pub price: f64,
    pub image: Option<String>,
    pub stock: Option<i64>,
    pub min_stock: Option<i64>,
}
