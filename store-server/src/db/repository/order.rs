//! Order Repository
//!
//! Orders are stored as one `orders` row plus immutable `order_item` snapshot
//! rows; the shipping address is embedded as JSON.

use super::{RepoError, RepoResult};
use shared::models::{
    Order, OrderFilter, OrderItem, OrderStatus, PageRequest, PaginatedResponse, PaymentStatus,
    ShippingAddress,
};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use std::collections::HashMap;

const ORDER_COLUMNS: &str = "id, user_id, status, payment_status, payment_method, is_returned, subtotal, tax, shipping_cost, total, shipping_address, tracking_number, return_reason, return_date, delivered_at, notes, version, created_at, updated_at";
const ITEM_COLUMNS: &str = "order_id, product_id, sku, name, price, quantity, image";

/// Raw `orders` row
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i64,
    user_id: i64,
    status: String,
    payment_status: String,
    payment_method: String,
    is_returned: bool,
    subtotal: f64,
    tax: f64,
    shipping_cost: f64,
    total: f64,
    shipping_address: String,
    tracking_number: Option<String>,
    return_reason: Option<String>,
    return_date: Option<i64>,
    delivered_at: Option<i64>,
    notes: Option<String>,
    version: i64,
    created_at: i64,
    updated_at: i64,
}

/// Raw `order_item` row
#[derive(Debug, sqlx::FromRow)]
struct ItemRow {
    order_id: i64,
    product_id: i64,
    sku: String,
    name: String,
    price: f64,
    quantity: i64,
    image: String,
}

impl From<ItemRow> for OrderItem {
    fn from(row: ItemRow) -> Self {
        Self {
            product_id: row.product_id,
            sku: row.sku,
            name: row.name,
            price: row.price,
            quantity: row.quantity,
            image: row.image,
        }
    }
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> RepoResult<Order> {
        let status: OrderStatus = self
            .status
            .parse()
            .map_err(|e: String| RepoError::Database(format!("order {}: {e}", self.id)))?;
        let payment_status: PaymentStatus = self
            .payment_status
            .parse()
            .map_err(|e: String| RepoError::Database(format!("order {}: {e}", self.id)))?;
        let shipping_address: ShippingAddress = serde_json::from_str(&self.shipping_address)
            .map_err(|e| {
                RepoError::Database(format!("order {}: bad shipping address: {e}", self.id))
            })?;

        Ok(Order {
            id: self.id,
            user_id: self.user_id,
            items,
            shipping_address,
            payment_method: self.payment_method,
            status,
            payment_status,
            is_returned: self.is_returned,
            subtotal: self.subtotal,
            tax: self.tax,
            shipping_cost: self.shipping_cost,
            total: self.total,
            tracking_number: self.tracking_number,
            return_reason: self.return_reason,
            return_date: self.return_date,
            delivered_at: self.delivered_at,
            notes: self.notes,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Attach item snapshots to a batch of order rows, preserving row order
async fn hydrate(conn: &mut SqliteConnection, rows: Vec<OrderRow>) -> RepoResult<Vec<Order>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
        "SELECT {ITEM_COLUMNS} FROM order_item WHERE order_id IN ("
    ));
    let mut ids = qb.separated(", ");
    for row in &rows {
        ids.push_bind(row.id);
    }
    qb.push(") ORDER BY order_id, line_no");

    let item_rows = qb.build_query_as::<ItemRow>().fetch_all(&mut *conn).await?;
    let mut by_order: HashMap<i64, Vec<OrderItem>> = HashMap::new();
    for item in item_rows {
        by_order.entry(item.order_id).or_default().push(item.into());
    }

    rows.into_iter()
        .map(|row| {
            let items = by_order.remove(&row.id).unwrap_or_default();
            row.into_order(items)
        })
        .collect()
}

pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> RepoResult<Option<Order>> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?");
    let row = sqlx::query_as::<_, OrderRow>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    match row {
        Some(row) => Ok(hydrate(conn, vec![row]).await?.pop()),
        None => Ok(None),
    }
}

/// Persist a new order and its item snapshots
pub async fn insert(conn: &mut SqliteConnection, order: &Order) -> RepoResult<()> {
    let address = serde_json::to_string(&order.shipping_address)
        .map_err(|e| RepoError::Validation(format!("shipping address: {e}")))?;

    sqlx::query(
        "INSERT INTO orders (id, user_id, status, payment_status, payment_method, is_returned, subtotal, tax, shipping_cost, total, shipping_address, tracking_number, return_reason, return_date, delivered_at, notes, version, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
    )
    .bind(order.id)
    .bind(order.user_id)
    .bind(order.status.as_str())
    .bind(order.payment_status.as_str())
    .bind(&order.payment_method)
    .bind(order.is_returned)
    .bind(order.subtotal)
    .bind(order.tax)
    .bind(order.shipping_cost)
    .bind(order.total)
    .bind(address)
    .bind(&order.tracking_number)
    .bind(&order.return_reason)
    .bind(order.return_date)
    .bind(order.delivered_at)
    .bind(&order.notes)
    .bind(order.version)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut *conn)
    .await?;

    for (line_no, item) in order.items.iter().enumerate() {
        sqlx::query(
            "INSERT INTO order_item (order_id, line_no, product_id, sku, name, price, quantity, image) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(order.id)
        .bind(line_no as i64)
        .bind(item.product_id)
        .bind(&item.sku)
        .bind(&item.name)
        .bind(item.price)
        .bind(item.quantity)
        .bind(&item.image)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Take the database write lock for this unit of work without changing the row.
///
/// Returns `false` when the order does not exist.
pub async fn claim(conn: &mut SqliteConnection, id: i64) -> RepoResult<bool> {
    let rows = sqlx::query("UPDATE orders SET version = version WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(rows.rows_affected() > 0)
}

/// Write the mutable lifecycle fields if the stored version still matches.
///
/// Returns `false` when another writer bumped the version first.
pub async fn update_lifecycle(
    conn: &mut SqliteConnection,
    order: &Order,
    expected_version: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE orders SET status = ?1, payment_status = ?2, is_returned = ?3, tracking_number = ?4, return_reason = ?5, return_date = ?6, delivered_at = ?7, version = version + 1, updated_at = ?8 WHERE id = ?9 AND version = ?10",
    )
    .bind(order.status.as_str())
    .bind(order.payment_status.as_str())
    .bind(order.is_returned)
    .bind(&order.tracking_number)
    .bind(&order.return_reason)
    .bind(order.return_date)
    .bind(order.delivered_at)
    .bind(order.updated_at)
    .bind(order.id)
    .bind(expected_version)
    .execute(&mut *conn)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// Delete an order; item snapshots go with it (ON DELETE CASCADE)
pub async fn delete(conn: &mut SqliteConnection, id: i64) -> RepoResult<bool> {
    let rows = sqlx::query("DELETE FROM orders WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(rows.rows_affected() > 0)
}

fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &OrderFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(payment_status) = filter.payment_status {
        qb.push(" AND payment_status = ")
            .push_bind(payment_status.as_str());
    }
    if let Some(user_id) = filter.user_id {
        qb.push(" AND user_id = ").push_bind(user_id);
    }
}

/// Filtered page of orders, newest first
pub async fn find_page(
    pool: &SqlitePool,
    filter: &OrderFilter,
    page: PageRequest,
) -> RepoResult<PaginatedResponse<Order>> {
    let page = page.normalized();
    let mut conn = pool.acquire().await?;

    let mut count_qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT COUNT(*) FROM orders");
    push_filter(&mut count_qb, filter);
    let total = count_qb
        .build_query_scalar::<i64>()
        .fetch_one(&mut *conn)
        .await?;

    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {ORDER_COLUMNS} FROM orders"));
    push_filter(&mut qb, filter);
    qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
        .push_bind(page.limit as i64)
        .push(" OFFSET ")
        .push_bind(page.offset());
    let rows = qb.build_query_as::<OrderRow>().fetch_all(&mut *conn).await?;
    let orders = hydrate(&mut conn, rows).await?;

    Ok(PaginatedResponse::new(
        orders,
        total.max(0) as u64,
        page.page,
        page.limit,
    ))
}

/// Most recent orders across all users
pub async fn find_recent(conn: &mut SqliteConnection, limit: i64) -> RepoResult<Vec<Order>> {
    let sql = format!(
        "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC, id DESC LIMIT ?"
    );
    let rows = sqlx::query_as::<_, OrderRow>(&sql)
        .bind(limit)
        .fetch_all(&mut *conn)
        .await?;
    hydrate(conn, rows).await
}

// =============================================================================
// Aggregates
// =============================================================================
//
// 统计接口在同一只读事务内依次调用下列函数，保证各项数字来自同一快照

pub async fn count(conn: &mut SqliteConnection) -> RepoResult<i64> {
    let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM orders")
        .fetch_one(&mut *conn)
        .await?;
    Ok(n)
}

/// Sum of `total` over every order, whatever its status
pub async fn sum_total(conn: &mut SqliteConnection) -> RepoResult<f64> {
    let sum = sqlx::query_scalar::<_, f64>("SELECT COALESCE(SUM(total), 0.0) FROM orders")
        .fetch_one(&mut *conn)
        .await?;
    Ok(sum)
}

/// Sum of `total` over orders that were neither cancelled nor returned
pub async fn sum_total_net(conn: &mut SqliteConnection) -> RepoResult<f64> {
    let sum = sqlx::query_scalar::<_, f64>(
        "SELECT COALESCE(SUM(total), 0.0) FROM orders WHERE status NOT IN ('cancelled', 'returned')",
    )
    .fetch_one(&mut *conn)
    .await?;
    Ok(sum)
}

/// `(status, count)` for every status that has at least one order
pub async fn count_by_status(conn: &mut SqliteConnection) -> RepoResult<Vec<(OrderStatus, i64)>> {
    let rows: Vec<(String, i64)> =
        sqlx::query_as("SELECT status, COUNT(*) FROM orders GROUP BY status")
            .fetch_all(&mut *conn)
            .await?;
    rows.into_iter()
        .map(|(status, n)| {
            status
                .parse::<OrderStatus>()
                .map(|s| (s, n))
                .map_err(RepoError::Database)
        })
        .collect()
}

/// Monthly revenue row: `("YYYY-MM", revenue, orders)` in UTC
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct MonthlyRow {
    pub month: String,
    pub revenue: f64,
    pub orders: i64,
}

/// Revenue and order count per calendar month for orders created at or after `since_millis`
pub async fn monthly_revenue(
    conn: &mut SqliteConnection,
    since_millis: i64,
) -> RepoResult<Vec<MonthlyRow>> {
    let rows = sqlx::query_as::<_, MonthlyRow>(
        "SELECT strftime('%Y-%m', created_at / 1000, 'unixepoch') AS month, COALESCE(SUM(total), 0.0) AS revenue, COUNT(*) AS orders FROM orders WHERE created_at >= ? GROUP BY month ORDER BY month",
    )
    .bind(since_millis)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}
