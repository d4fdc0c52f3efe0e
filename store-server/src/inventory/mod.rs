//! Inventory Ledger
//!
//! Single source of truth for `stock` and `sold_count`. A positive adjustment
//! sells (`stock -= n`, `sold_count += n`), a negative one restocks and
//! reverses the sales count.
//!
//! The `*_in` functions run on a caller-provided connection so that several
//! adjustments share one transaction:
//!
//! ```ignore
//! let mut tx = pool.begin().await?;
//! inventory::reserve_items(&mut tx, &lines).await?;
//! repository::order::insert(&mut tx, &order).await?;
//! tx.commit().await?;
//! ```

use shared::models::{OrderItem, OrderItemInput, Product, ProductCreate};
use sqlx::{SqliteConnection, SqlitePool};

use crate::db::repository::{RepoError, product};
use crate::orders::{OrderError, OrderResult};

/// Apply one signed stock adjustment inside the caller's unit of work.
///
/// The decrement is a single conditional statement, so two concurrent sales
/// can never both pass the sufficiency check against the same stock.
pub async fn adjust_stock_in(
    conn: &mut SqliteConnection,
    product_id: i64,
    signed_quantity: i64,
) -> OrderResult<Product> {
    if signed_quantity == 0 {
        return Err(OrderError::Validation(
            "stock adjustment quantity must be non-zero".into(),
        ));
    }

    if signed_quantity > 0 {
        if let Some(updated) = product::take_stock(conn, product_id, signed_quantity).await? {
            tracing::debug!(product_id, quantity = signed_quantity, stock = updated.stock, "Stock taken");
            return Ok(updated);
        }
        // Nothing written: tell a missing product from an empty shelf
        return match product::find_by_id(&mut *conn, product_id).await? {
            None => Err(OrderError::ProductNotFound(product_id)),
            Some(current) => {
                tracing::warn!(
                    product_id,
                    requested = signed_quantity,
                    available = current.stock,
                    "Insufficient stock"
                );
                Err(OrderError::InsufficientStock {
                    product_id,
                    requested: signed_quantity,
                    available: current.stock,
                })
            }
        };
    }

    let quantity = signed_quantity
        .checked_neg()
        .ok_or_else(|| OrderError::Validation("stock adjustment out of range".into()))?;
    let returned = product::return_stock(conn, product_id, quantity)
        .await?
        .ok_or(OrderError::ProductNotFound(product_id))?;
    if returned.unmatched > 0 {
        // 补库存超过已售数量：sold_count 停在 0，库存照常增加
        tracing::warn!(
            product_id,
            quantity,
            unmatched = returned.unmatched,
            "Restock exceeds recorded sales, sold_count clamped at zero"
        );
    }
    let updated = returned.product;
    tracing::debug!(product_id, quantity, stock = updated.stock, "Stock returned");
    Ok(updated)
}

/// Sell every line; the first failure aborts and the caller rolls back.
///
/// Returns the updated products in line order (used for price snapshots).
pub async fn reserve_items(
    conn: &mut SqliteConnection,
    lines: &[OrderItemInput],
) -> OrderResult<Vec<Product>> {
    let mut products = Vec::with_capacity(lines.len());
    for line in lines {
        products.push(adjust_stock_in(conn, line.product_id, line.quantity).await?);
    }
    Ok(products)
}

/// Compensating adjustment for every line of an order
pub async fn restock_items(conn: &mut SqliteConnection, items: &[OrderItem]) -> OrderResult<()> {
    for item in items {
        adjust_stock_in(conn, item.product_id, -item.quantity).await?;
    }
    Ok(())
}

fn validate_product(data: &ProductCreate) -> OrderResult<()> {
    if data.sku.trim().is_empty() {
        return Err(OrderError::Validation("sku is required".into()));
    }
    if data.name.trim().is_empty() {
        return Err(OrderError::Validation("name is required".into()));
    }
    if !data.price.is_finite() || data.price < 0.0 {
        return Err(OrderError::InvalidPrice(data.price));
    }
    if data.stock.is_some_and(|s| s < 0) || data.min_stock.is_some_and(|s| s < 0) {
        return Err(OrderError::Validation(
            "stock and min_stock must be non-negative".into(),
        ));
    }
    Ok(())
}

/// Pool-level ledger operations (each call is its own unit of work)
#[derive(Clone, Debug)]
pub struct InventoryLedger {
    pool: SqlitePool,
}

impl InventoryLedger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Standalone `adjustStock`, committed immediately
    pub async fn adjust_stock(&self, product_id: i64, signed_quantity: i64) -> OrderResult<Product> {
        let mut tx = self.pool.begin().await?;
        let product = adjust_stock_in(&mut tx, product_id, signed_quantity).await?;
        tx.commit().await?;
        tracing::info!(product_id, quantity = signed_quantity, stock = product.stock, "Stock adjusted");
        Ok(product)
    }

    pub async fn create_product(&self, data: ProductCreate) -> OrderResult<Product> {
        validate_product(&data)?;
        let sku = data.sku.clone();
        let product = product::create(&self.pool, data).await.map_err(|e| match e {
            RepoError::Duplicate(_) => OrderError::DuplicateSku(sku.clone()),
            other => other.into(),
        })?;
        tracing::info!(product_id = product.id, sku = %product.sku, stock = product.stock, "Product created");
        Ok(product)
    }

    pub async fn get_product(&self, product_id: i64) -> OrderResult<Product> {
        product::find_by_id(&self.pool, product_id)
            .await?
            .ok_or(OrderError::ProductNotFound(product_id))
    }

    pub async fn find_by_sku(&self, sku: &str) -> OrderResult<Option<Product>> {
        Ok(product::find_by_sku(&self.pool, sku).await?)
    }

    pub async fn list_products(&self) -> OrderResult<Vec<Product>> {
        Ok(product::find_all(&self.pool).await?)
    }

    /// Products at or below `min_stock` (informational, nothing is blocked)
    pub async fn list_low_stock(&self) -> OrderResult<Vec<Product>> {
        Ok(product::find_low_stock(&self.pool).await?)
    }

    /// Absolute correction after a stock-take
    pub async fn set_stock(&self, product_id: i64, stock: i64) -> OrderResult<Product> {
        if stock < 0 {
            return Err(OrderError::Validation(format!(
                "stock must be non-negative, got {stock}"
            )));
        }
        let product = product::set_stock(&self.pool, product_id, stock)
            .await
            .map_err(|e| match e {
                RepoError::NotFound(_) => OrderError::ProductNotFound(product_id),
                other => other.into(),
            })?;
        tracing::info!(product_id, stock, "Stock corrected");
        Ok(product)
    }
}
