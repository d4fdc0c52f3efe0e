//! Product Repository
//!
//! Stock columns are only written through the conditional updates below;
//! the sufficiency check and the write are a single statement.

use super::{RepoError, RepoResult};
use shared::models::{Product, ProductCreate};
use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};

const PRODUCT_SELECT: &str = "SELECT id, sku, name, price, image, stock, min_stock, sold_count, is_active, created_at, updated_at FROM product";
const PRODUCT_RETURNING: &str = "RETURNING id, sku, name, price, image, stock, min_stock, sold_count, is_active, created_at, updated_at";

pub async fn find_by_id<'e>(
    executor: impl SqliteExecutor<'e>,
    id: i64,
) -> RepoResult<Option<Product>> {
    let sql = format!("{PRODUCT_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(row)
}

pub async fn find_by_sku(pool: &SqlitePool, sku: &str) -> RepoResult<Option<Product>> {
    let sql = format!("{PRODUCT_SELECT} WHERE sku = ?");
    let row = sqlx::query_as::<_, Product>(&sql)
        .bind(sku)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_all(pool: &SqlitePool) -> RepoResult<Vec<Product>> {
    let sql = format!("{PRODUCT_SELECT} WHERE is_active = 1 ORDER BY name");
    let rows = sqlx::query_as::<_, Product>(&sql).fetch_all(pool).await?;
    Ok(rows)
}

/// Active products at or below their reorder threshold, emptiest first
pub async fn find_low_stock(pool: &SqlitePool) -> RepoResult<Vec<Product>> {
    let sql = format!(
        "{PRODUCT_SELECT} WHERE is_active = 1 AND stock <= min_stock ORDER BY stock ASC, name"
    );
    let rows = sqlx::query_as::<_, Product>(&sql).fetch_all(pool).await?;
    Ok(rows)
}

pub async fn create(pool: &SqlitePool, data: ProductCreate) -> RepoResult<Product> {
    if find_by_sku(pool, &data.sku).await?.is_some() {
        return Err(RepoError::Duplicate(format!(
            "Product SKU '{}' already exists",
            data.sku
        )));
    }

    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    let sql = format!(
        "INSERT INTO product (id, sku, name, price, image, stock, min_stock, sold_count, is_active, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, 1, ?8, ?8) {PRODUCT_RETURNING}"
    );
    // 并发插入同一 SKU 时由 UNIQUE 约束兜底 (映射为 Duplicate)
    let product = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .bind(&data.sku)
        .bind(&data.name)
        .bind(data.price)
        .bind(data.image.unwrap_or_default())
        .bind(data.stock.unwrap_or(0))
        .bind(data.min_stock.unwrap_or(0))
        .bind(now)
        .fetch_one(pool)
        .await?;
    Ok(product)
}

/// Remove `quantity` units if at least that many are on hand.
///
/// Returns `None` when the product is missing or the stock is insufficient;
/// in both cases nothing was written.
pub async fn take_stock(
    conn: &mut SqliteConnection,
    id: i64,
    quantity: i64,
) -> RepoResult<Option<Product>> {
    let now = shared::util::now_millis();
    let sql = format!(
        "UPDATE product SET stock = stock - ?1, sold_count = sold_count + ?1, updated_at = ?2 WHERE id = ?3 AND stock >= ?1 {PRODUCT_RETURNING}"
    );
    let row = sqlx::query_as::<_, Product>(&sql)
        .bind(quantity)
        .bind(now)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

/// Outcome of [`return_stock`]
#[derive(Debug, Clone)]
pub struct StockReturn {
    pub product: Product,
    /// Units with no recorded sale behind them; `sold_count` stopped at zero
    pub unmatched: i64,
}

/// Put `quantity` units back and reverse the matching sales count.
///
/// Two statements: call inside a transaction. The first one is the write
/// that takes the lock and reports `sold_count` as it was.
pub async fn return_stock(
    conn: &mut SqliteConnection,
    id: i64,
    quantity: i64,
) -> RepoResult<Option<StockReturn>> {
    let now = shared::util::now_millis();
    let previous_sold: Option<i64> = sqlx::query_scalar(
        "UPDATE product SET stock = stock + ?1, updated_at = ?2 WHERE id = ?3 RETURNING sold_count",
    )
    .bind(quantity)
    .bind(now)
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    let Some(previous_sold) = previous_sold else {
        return Ok(None);
    };

    let sql = format!("UPDATE product SET sold_count = ?1 WHERE id = ?2 {PRODUCT_RETURNING}");
    let product = sqlx::query_as::<_, Product>(&sql)
        .bind((previous_sold - quantity).max(0))
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(Some(StockReturn {
        product,
        unmatched: (quantity - previous_sold).max(0),
    }))
}

/// Absolute stock correction (stock-take); leaves `sold_count` alone
pub async fn set_stock(pool: &SqlitePool, id: i64, stock: i64) -> RepoResult<Product> {
    let now = shared::util::now_millis();
    let sql = format!("UPDATE product SET stock = ?1, updated_at = ?2 WHERE id = ?3 {PRODUCT_RETURNING}");
    sqlx::query_as::<_, Product>(&sql)
        .bind(stock)
        .bind(now)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Product {id} not found")))
}
