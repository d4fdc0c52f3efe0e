//! Statistics Aggregator (数据统计)
//!
//! Read-only rollups over the order store. `total_revenue` is the literal
//! sum over every order; `net_revenue` leaves out cancelled and returned
//! orders. Both are reported so the gap stays visible.
//!
//! The dashboard is read inside one transaction; under WAL every aggregate
//! sees the same snapshot, so counts and sums agree with each other even
//! while checkouts are committing.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use rust_decimal::Decimal;
use shared::models::{
    MonthlyBucket, Order, OrderStats, OrderStatus, StatsOverview, StatusCount, UserOrderStats,
};
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashMap;

use crate::db::repository::{order as order_repo, user as user_repo};
use crate::orders::money::{to_decimal, to_f64};
use crate::orders::{OrderError, OrderResult};

/// Months covered by the monthly series
pub const MONTHS: u32 = 12;
/// Orders included in the dashboard payload
pub const DASHBOARD_RECENT: i64 = 5;
/// Upper bound for `get_recent_orders`
pub const MAX_RECENT: i64 = 50;

/// `(year, month)` shifted back by `n` months
fn months_back(year: i32, month: u32, n: u32) -> (i32, u32) {
    let index = year * 12 + month as i32 - 1 - n as i32;
    (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
}

/// First millisecond of the window covering the last `MONTHS` calendar months
fn window_start(now: DateTime<Utc>) -> i64 {
    let (year, month) = months_back(now.year(), now.month(), MONTHS - 1);
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .map(|d| d.timestamp_millis())
        .unwrap_or(0)
}

pub async fn overview(conn: &mut SqliteConnection) -> OrderResult<StatsOverview> {
    let total_orders = order_repo::count(conn).await?;
    let total_revenue = order_repo::sum_total(conn).await?;
    let net_revenue = order_repo::sum_total_net(conn).await?;

    let average_order_value = if total_orders > 0 {
        to_f64(to_decimal(total_revenue) / Decimal::from(total_orders))
    } else {
        0.0
    };

    Ok(StatsOverview {
        total_orders,
        total_revenue: to_f64(to_decimal(total_revenue)),
        net_revenue: to_f64(to_decimal(net_revenue)),
        average_order_value,
    })
}

/// Count per status; every status is present
pub async fn status_breakdown(conn: &mut SqliteConnection) -> OrderResult<Vec<StatusCount>> {
    let counts: HashMap<OrderStatus, i64> =
        order_repo::count_by_status(conn).await?.into_iter().collect();
    Ok(OrderStatus::ALL
        .into_iter()
        .map(|status| StatusCount {
            status,
            count: counts.get(&status).copied().unwrap_or(0),
        })
        .collect())
}

/// Revenue and order count for the last twelve calendar months (UTC),
/// oldest first, months without orders included as zero
pub async fn monthly(
    conn: &mut SqliteConnection,
    now: DateTime<Utc>,
) -> OrderResult<Vec<MonthlyBucket>> {
    let since = window_start(now);
    let rows: HashMap<String, order_repo::MonthlyRow> = order_repo::monthly_revenue(conn, since)
        .await?
        .into_iter()
        .map(|row| (row.month.clone(), row))
        .collect();

    let buckets: Vec<MonthlyBucket> = (0..MONTHS)
        .map(|offset| {
            let (year, month) = months_back(now.year(), now.month(), MONTHS - 1 - offset);
            let key = format!("{year:04}-{month:02}");
            let (revenue, orders) = rows
                .get(&key)
                .map(|r| (to_f64(to_decimal(r.revenue)), r.orders))
                .unwrap_or((0.0, 0));
            MonthlyBucket {
                year,
                month,
                revenue,
                orders,
            }
        })
        .collect();
    Ok(buckets)
}

/// Most recent orders, `limit` clamped to 1..=50
pub async fn get_recent_orders(pool: &SqlitePool, limit: i64) -> OrderResult<Vec<Order>> {
    let mut conn = pool.acquire().await?;
    Ok(order_repo::find_recent(&mut conn, limit.clamp(1, MAX_RECENT)).await?)
}

/// Dashboard payload
pub async fn get_order_stats(pool: &SqlitePool, now: DateTime<Utc>) -> OrderResult<OrderStats> {
    let mut tx = pool.begin().await?;
    let stats = OrderStats {
        overview: overview(&mut tx).await?,
        status_breakdown: status_breakdown(&mut tx).await?,
        monthly: monthly(&mut tx, now).await?,
        recent_orders: order_repo::find_recent(&mut tx, DASHBOARD_RECENT).await?,
    };
    tx.commit().await?;
    tracing::debug!(
        total_orders = stats.overview.total_orders,
        total_revenue = stats.overview.total_revenue,
        net_revenue = stats.overview.net_revenue,
        "Order stats computed"
    );
    Ok(stats)
}

/// Lifetime order aggregates of one user (never reduced by cancellations)
pub async fn get_user_stats(pool: &SqlitePool, user_id: i64) -> OrderResult<UserOrderStats> {
    let user = user_repo::find_by_id(pool, user_id)
        .await?
        .ok_or(OrderError::UserNotFound(user_id))?;
    Ok(UserOrderStats {
        user_id: user.id,
        total_orders: user.total_orders,
        total_spent: user.total_spent,
    })
}
