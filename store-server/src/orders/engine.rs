//! Order Lifecycle Engine
//!
//! Every mutation is one unit of work: a SQLite transaction whose first
//! statement is a write (the stock decrement on create, a claim on the order
//! row otherwise). That takes the database write lock up front, so the read of
//! the current state, the stock effect and the status write commit or roll
//! back together. The `version` column is compare-and-swapped on every
//! lifecycle write; a lost swap or a busy database is retried a bounded number
//! of times before surfacing as `ConcurrentModification`.

use std::future::Future;
use std::time::Duration;

use shared::models::{
    Order, OrderCreate, OrderFilter, OrderItem, OrderItemInput, OrderStatus, PageRequest,
    PaginatedResponse, PaymentStatus, StatusUpdate,
};
use sqlx::SqlitePool;

use super::access::Actor;
use super::error::{OrderError, OrderResult};
use super::money::{compute_totals, validate_order_input};
use super::state::{OrderState, StockEffect};
use crate::db::repository::{order as order_repo, user as user_repo};
use crate::inventory;

/// Default bound on optimistic-concurrency retries
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// Order lifecycle engine
#[derive(Clone, Debug)]
pub struct OrderEngine {
    pool: SqlitePool,
    retry_attempts: u32,
}

impl OrderEngine {
    pub fn new(pool: SqlitePool, retry_attempts: u32) -> Self {
        Self {
            pool,
            retry_attempts: retry_attempts.max(1),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run `unit` until it succeeds, fails for a non-retryable reason, or the
    /// attempt budget is spent
    async fn with_retry<T, F, Fut>(&self, operation: &'static str, mut unit: F) -> OrderResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = OrderResult<T>>,
    {
        let mut attempt = 1;
        loop {
            match unit().await {
                Err(e) if e.is_retryable() && attempt < self.retry_attempts => {
                    tracing::warn!(operation, attempt, error = %e, "Unit of work conflicted, retrying");
                    tokio::time::sleep(Duration::from_millis(5 * u64::from(attempt))).await;
                    attempt += 1;
                }
                Err(e) if e.is_retryable() => {
                    tracing::warn!(operation, attempts = attempt, error = %e, "Retry budget exhausted");
                    return Err(e);
                }
                other => return other,
            }
        }
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Place an order for the caller.
    ///
    /// Stock for every line, the user aggregates and the order row are written
    /// in one transaction; any failure leaves the store untouched.
    pub async fn create_order(&self, actor: &Actor, input: OrderCreate) -> OrderResult<Order> {
        let lines = validate_order_input(&input)?;
        self.with_retry("create_order", || {
            self.try_create_order(actor.user_id, &lines, &input)
        })
        .await
    }

    async fn try_create_order(
        &self,
        user_id: i64,
        lines: &[OrderItemInput],
        input: &OrderCreate,
    ) -> OrderResult<Order> {
        let mut tx = self.pool.begin().await?;

        let products = inventory::reserve_items(&mut tx, lines).await?;
        if let Some(inactive) = products.iter().find(|p| !p.is_active) {
            return Err(OrderError::Validation(format!(
                "product {} is not available",
                inactive.id
            )));
        }

        // 价格/名称快照在同一事务内读取
        let items: Vec<OrderItem> = lines
            .iter()
            .zip(products)
            .map(|(line, product)| OrderItem {
                product_id: product.id,
                sku: product.sku,
                name: product.name,
                price: product.price,
                quantity: line.quantity,
                image: product.image,
            })
            .collect();
        let priced: Vec<(f64, i64)> = items.iter().map(|i| (i.price, i.quantity)).collect();
        let totals = compute_totals(
            &priced,
            input.tax.unwrap_or(0.0),
            input.shipping_cost.unwrap_or(0.0),
        );

        if !user_repo::increment_order_stats(&mut tx, user_id, totals.total).await? {
            return Err(OrderError::UserNotFound(user_id));
        }

        let now = shared::util::now_millis();
        let order = Order {
            id: shared::util::snowflake_id(),
            user_id,
            items,
            shipping_address: input.shipping_address.clone(),
            payment_method: input.payment_method.trim().to_string(),
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            is_returned: false,
            subtotal: totals.subtotal,
            tax: totals.tax,
            shipping_cost: totals.shipping_cost,
            total: totals.total,
            tracking_number: None,
            return_reason: None,
            return_date: None,
            delivered_at: None,
            notes: input.notes.clone(),
            version: 0,
            created_at: now,
            updated_at: now,
        };
        order_repo::insert(&mut tx, &order).await?;
        tx.commit().await?;

        tracing::info!(
            order_id = order.id,
            user_id,
            lines = order.items.len(),
            total = order.total,
            "Order created"
        );
        Ok(order)
    }

    /// Move an order to a new status, applying the stock effect in the same
    /// transaction as the status write.
    ///
    /// Repeating a transition is a no-op that returns the unchanged order.
    pub async fn transition_status(
        &self,
        actor: &Actor,
        order_id: i64,
        update: StatusUpdate,
    ) -> OrderResult<Order> {
        self.with_retry("transition_status", || {
            self.try_transition_status(actor, order_id, &update)
        })
        .await
    }

    async fn try_transition_status(
        &self,
        actor: &Actor,
        order_id: i64,
        update: &StatusUpdate,
    ) -> OrderResult<Order> {
        let mut tx = self.pool.begin().await?;
        if !order_repo::claim(&mut tx, order_id).await? {
            return Err(OrderError::OrderNotFound(order_id));
        }
        let mut order = order_repo::find_by_id(&mut tx, order_id)
            .await?
            .ok_or(OrderError::OrderNotFound(order_id))?;

        actor.can_transition(&order, update.status)?;
        let plan = match OrderState::from(&order).plan_transition(update.status) {
            Ok(plan) => plan,
            Err(e) => {
                tracing::warn!(order_id, from = %order.status, to = %update.status, "Transition rejected");
                return Err(e);
            }
        };
        if plan.is_noop() {
            tracing::debug!(order_id, status = %order.status, "Transition is a no-op");
            return Ok(order);
        }

        if plan.stock == StockEffect::Restock {
            inventory::restock_items(&mut tx, &order.items).await?;
        }

        let now = shared::util::now_millis();
        let expected_version = order.version;
        order.status = plan.to;
        order.payment_status = plan.payment;
        if plan.mark_returned {
            order.is_returned = true;
            order.return_date = Some(now);
        }
        if plan.mark_delivered {
            order.delivered_at = Some(now);
        }
        if plan.to == OrderStatus::Shipped && update.tracking_number.is_some() {
            order.tracking_number = update.tracking_number.clone();
        }
        if plan.to == OrderStatus::Returned && update.return_reason.is_some() {
            order.return_reason = update.return_reason.clone();
        }
        order.updated_at = now;

        if !order_repo::update_lifecycle(&mut tx, &order, expected_version).await? {
            return Err(OrderError::ConcurrentModification(format!(
                "order {order_id} changed during transition"
            )));
        }
        tx.commit().await?;
        order.version = expected_version + 1;

        tracing::info!(
            order_id,
            from = %plan.from,
            to = %plan.to,
            payment = %order.payment_status,
            restocked = plan.stock == StockEffect::Restock,
            "Order status changed"
        );
        Ok(order)
    }

    /// Update the payment sub-state (admin only, no stock interaction)
    pub async fn transition_payment_status(
        &self,
        actor: &Actor,
        order_id: i64,
        payment_status: PaymentStatus,
    ) -> OrderResult<Order> {
        actor.require_admin()?;
        self.with_retry("transition_payment_status", || {
            self.try_transition_payment(order_id, payment_status)
        })
        .await
    }

    async fn try_transition_payment(
        &self,
        order_id: i64,
        payment_status: PaymentStatus,
    ) -> OrderResult<Order> {
        let mut tx = self.pool.begin().await?;
        if !order_repo::claim(&mut tx, order_id).await? {
            return Err(OrderError::OrderNotFound(order_id));
        }
        let mut order = order_repo::find_by_id(&mut tx, order_id)
            .await?
            .ok_or(OrderError::OrderNotFound(order_id))?;

        let Some(next) = OrderState::from(&order).plan_payment(payment_status)? else {
            return Ok(order);
        };

        let from = order.payment_status;
        let expected_version = order.version;
        order.payment_status = next;
        order.updated_at = shared::util::now_millis();
        if !order_repo::update_lifecycle(&mut tx, &order, expected_version).await? {
            return Err(OrderError::ConcurrentModification(format!(
                "order {order_id} changed during payment update"
            )));
        }
        tx.commit().await?;
        order.version = expected_version + 1;

        tracing::info!(order_id, from = %from, to = %next, "Payment status changed");
        Ok(order)
    }

    /// Delete an order (admin only). Orders still in fulfilment give their
    /// stock back in the same transaction; user aggregates are left as they are.
    pub async fn delete_order(&self, actor: &Actor, order_id: i64) -> OrderResult<Order> {
        actor.require_admin()?;
        self.with_retry("delete_order", || self.try_delete_order(order_id))
            .await
    }

    async fn try_delete_order(&self, order_id: i64) -> OrderResult<Order> {
        let mut tx = self.pool.begin().await?;
        if !order_repo::claim(&mut tx, order_id).await? {
            return Err(OrderError::OrderNotFound(order_id));
        }
        let order = order_repo::find_by_id(&mut tx, order_id)
            .await?
            .ok_or(OrderError::OrderNotFound(order_id))?;

        let restock = order.status.is_open();
        if restock {
            inventory::restock_items(&mut tx, &order.items).await?;
        }
        order_repo::delete(&mut tx, order_id).await?;
        tx.commit().await?;

        tracing::info!(order_id, status = %order.status, restocked = restock, "Order deleted");
        Ok(order)
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Owner or admin
    pub async fn get_order(&self, actor: &Actor, order_id: i64) -> OrderResult<Order> {
        let mut conn = self.pool.acquire().await?;
        let order = order_repo::find_by_id(&mut conn, order_id)
            .await?
            .ok_or(OrderError::OrderNotFound(order_id))?;
        actor.can_view(&order)?;
        Ok(order)
    }

    /// The caller's own orders, newest first
    pub async fn list_orders_for_user(
        &self,
        actor: &Actor,
        page: PageRequest,
    ) -> OrderResult<PaginatedResponse<Order>> {
        let filter = OrderFilter {
            user_id: Some(actor.user_id),
            ..Default::default()
        };
        Ok(order_repo::find_page(&self.pool, &filter, page).await?)
    }

    /// Filtered list across all users (admin only)
    pub async fn list_orders_admin(
        &self,
        actor: &Actor,
        filter: &OrderFilter,
        page: PageRequest,
    ) -> OrderResult<PaginatedResponse<Order>> {
        actor.require_admin()?;
        Ok(order_repo::find_page(&self.pool, filter, page).await?)
    }
}
