//! Order statistics

use serde::{Deserialize, Serialize};

use super::order::{Order, OrderStatus};

/// Headline numbers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsOverview {
    pub total_orders: i64,
    /// Sum of every order total, cancelled and returned ones included
    pub total_revenue: f64,
    /// Sum of totals excluding cancelled and returned orders
    pub net_revenue: f64,
    /// total_revenue / total_orders (0 when there are no orders)
    pub average_order_value: f64,
}

/// Order count for a single status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: i64,
}

/// Revenue for one calendar month (UTC)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyBucket {
    pub year: i32,
    /// 1-12
    pub month: u32,
    pub revenue: f64,
    pub orders: i64,
}

/// Admin dashboard payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStats {
    pub overview: StatsOverview,
    /// One entry per status, zero-filled
    pub status_breakdown: Vec<StatusCount>,
    /// Last twelve months, oldest first, zero-filled
    pub monthly: Vec<MonthlyBucket>,
    pub recent_orders: Vec<Order>,
}
