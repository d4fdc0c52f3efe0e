use crate::db::repository::RepoError;
use shared::models::{OrderStatus, PaymentStatus};
use shared::{AppError, ErrorCode};
use thiserror::Error;

/// Order core errors (ledger, lifecycle engine, record store)
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Order not found: {0}")]
    OrderNotFound(i64),

    #[error("Product not found: {0}")]
    ProductNotFound(i64),

    #[error("User not found: {0}")]
    UserNotFound(i64),

    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: i64,
        requested: i64,
        available: i64,
    },

    #[error("SKU already exists: {0}")]
    DuplicateSku(String),

    #[error("Invalid price: {0}")]
    InvalidPrice(f64),

    #[error("Invalid payment method: {0:?}")]
    InvalidPaymentMethod(String),

    #[error("Order must contain at least one item")]
    EmptyOrder,

    #[error("Invalid quantity {quantity} for product {product_id}")]
    InvalidQuantity { product_id: i64, quantity: i64 },

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Invalid payment transition on {status} order: {from} -> {to}")]
    InvalidPaymentTransition {
        status: OrderStatus,
        from: PaymentStatus,
        to: PaymentStatus,
    },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not the owner of order {0}")]
    NotOrderOwner(i64),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Concurrent modification: {0}")]
    ConcurrentModification(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl OrderError {
    /// Worth running the unit of work again
    pub fn is_retryable(&self) -> bool {
        matches!(self, OrderError::ConcurrentModification(_))
    }
}

impl From<RepoError> for OrderError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Busy(msg) => OrderError::ConcurrentModification(msg),
            RepoError::Validation(msg) => OrderError::Validation(msg),
            RepoError::NotFound(msg) | RepoError::Duplicate(msg) | RepoError::Database(msg) => {
                OrderError::Database(msg)
            }
        }
    }
}

impl From<sqlx::Error> for OrderError {
    fn from(err: sqlx::Error) -> Self {
        RepoError::from(err).into()
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        let message = err.to_string();
        match err {
            OrderError::OrderNotFound(id) => {
                AppError::with_message(ErrorCode::OrderNotFound, message).with_detail("order_id", id)
            }
            OrderError::ProductNotFound(id) => {
                AppError::with_message(ErrorCode::ProductNotFound, message)
                    .with_detail("product_id", id)
            }
            OrderError::UserNotFound(id) => {
                AppError::with_message(ErrorCode::UserNotFound, message).with_detail("user_id", id)
            }
            OrderError::InsufficientStock {
                product_id,
                requested,
                available,
            } => AppError::with_message(ErrorCode::ProductOutOfStock, message)
                .with_detail("product_id", product_id)
                .with_detail("requested", requested)
                .with_detail("available", available),
            OrderError::DuplicateSku(sku) => {
                AppError::with_message(ErrorCode::ProductSkuExists, message).with_detail("sku", sku)
            }
            OrderError::InvalidPrice(price) => {
                AppError::with_message(ErrorCode::ProductInvalidPrice, message)
                    .with_detail("price", price)
            }
            OrderError::InvalidPaymentMethod(_) => {
                AppError::with_message(ErrorCode::PaymentInvalidMethod, message)
            }
            OrderError::EmptyOrder => AppError::with_message(ErrorCode::OrderEmpty, message),
            OrderError::InvalidQuantity { product_id, .. } => {
                AppError::with_message(ErrorCode::OrderInvalidQuantity, message)
                    .with_detail("product_id", product_id)
            }
            OrderError::InvalidTransition { from, to } => {
                AppError::with_message(ErrorCode::OrderInvalidTransition, message)
                    .with_detail("from", from.as_str())
                    .with_detail("to", to.as_str())
            }
            OrderError::InvalidPaymentTransition { from, to, .. } => {
                AppError::with_message(ErrorCode::PaymentInvalidTransition, message)
                    .with_detail("from", from.as_str())
                    .with_detail("to", to.as_str())
            }
            OrderError::Validation(_) => AppError::with_message(ErrorCode::ValidationFailed, message),
            OrderError::NotOrderOwner(id) => {
                AppError::with_message(ErrorCode::NotOrderOwner, message).with_detail("order_id", id)
            }
            OrderError::Unauthorized(_) => AppError::with_message(ErrorCode::PermissionDenied, message),
            OrderError::ConcurrentModification(_) => {
                AppError::with_message(ErrorCode::ConcurrentModification, message)
            }
            OrderError::Database(_) => {
                tracing::error!(error = %message, "Order store error");
                AppError::with_message(ErrorCode::DatabaseError, message)
            }
        }
    }
}

/// Result type for order core operations
pub type OrderResult<T> = Result<T, OrderError>;
