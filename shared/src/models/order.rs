//! Order Model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fulfilment status of an order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Returned,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::Returned,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Returned => "returned",
        }
    }

    /// Delivered, cancelled and returned orders expect no further stock effect
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled | Self::Returned)
    }

    /// Still in fulfilment (pending, processing or shipped)
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Pending | Self::Processing | Self::Shipped)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown order status: {s}"))
    }
}

/// Payment sub-state, updated independently of fulfilment
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 4] = [
        PaymentStatus::Pending,
        PaymentStatus::Paid,
        PaymentStatus::Failed,
        PaymentStatus::Refunded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }

    /// No money is expected to move any more
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Failed | Self::Refunded)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown payment status: {s}"))
    }
}

/// Shipping address, embedded in the order document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub full_name: String,
    pub street: String,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub postal_code: String,
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Line item snapshot, frozen at checkout time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: i64,
    pub sku: String,
    pub name: String,
    /// Unit price at time of purchase
    pub price: f64,
    pub quantity: i64,
    pub image: String,
}

/// Order entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    /// Owning user
    pub user_id: i64,
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    /// Set exactly once, when the return restocks the items
    pub is_returned: bool,
    pub subtotal: f64,
    pub tax: f64,
    pub shipping_cost: f64,
    pub total: f64,
    pub tracking_number: Option<String>,
    pub return_reason: Option<String>,
    pub return_date: Option<i64>,
    pub delivered_at: Option<i64>,
    pub notes: Option<String>,
    /// Optimistic concurrency token
    #[serde(default, skip_serializing)]
    pub version: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Requested line (price and name come from the catalog at checkout)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemInput {
    pub product_id: i64,
    pub quantity: i64,
}

/// Create order payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreate {
    pub items: Vec<OrderItemInput>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    #[serde(default)]
    pub tax: Option<f64>,
    #[serde(default)]
    pub shipping_cost: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Status transition payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
    /// Recorded when moving to `shipped`
    #[serde(default)]
    pub tracking_number: Option<String>,
    /// Recorded when moving to `returned`
    #[serde(default)]
    pub return_reason: Option<String>,
}

impl StatusUpdate {
    pub fn to(status: OrderStatus) -> Self {
        Self {
            status,
            tracking_number: None,
            return_reason: None,
        }
    }
}

/// Payment status payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentStatusUpdate {
    pub payment_status: PaymentStatus,
}

/// Admin order list filter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub user_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_and_prints_lowercase() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>(), Ok(status));
        }
        assert!("PENDING".parse::<OrderStatus>().is_err());
        assert_eq!(
            serde_json::to_string(&OrderStatus::Cancelled).unwrap(),
            "\"cancelled\""
        );
    }

    #[test]
    fn terminal_and_open_statuses_partition() {
        for status in OrderStatus::ALL {
            assert_ne!(status.is_terminal(), status.is_open(), "{status}");
        }
    }

    #[test]
    fn payment_status_roundtrip() {
        for status in PaymentStatus::ALL {
            assert_eq!(status.as_str().parse::<PaymentStatus>(), Ok(status));
        }
        assert!(PaymentStatus::Refunded.is_settled());
        assert!(!PaymentStatus::Paid.is_settled());
    }

    #[test]
    fn create_payload_defaults_optional_money() {
        let json = r#"{
            "items": [{"product_id": 1, "quantity": 2}],
            "shipping_address": {
                "full_name": "Ada", "street": "1 Main", "city": "Town",
                "postal_code": "00001", "country": "ES"
            },
            "payment_method": "card"
        }"#;
        let payload: OrderCreate = serde_json::from_str(json).unwrap();
        assert_eq!(payload.items.len(), 1);
        assert!(payload.tax.is_none());
        assert!(payload.shipping_cost.is_none());
        assert!(payload.shipping_address.state.is_none());
    }
}
