//! Unified error codes for the storefront
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 4xxx: Order errors
//! - 5xxx: Payment errors
//! - 6xxx: Product / inventory errors
//! - 8xxx: User errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values so the frontend can switch on
/// them without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Validation failed
    ValidationFailed = 2,
    /// Record was modified concurrently and the retry budget ran out
    ConcurrentModification = 9,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Admin role required
    AdminRequired = 2003,
    /// Caller does not own the order
    NotOrderOwner = 2006,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Order is empty
    OrderEmpty = 4007,
    /// Status transition is not allowed from the current state
    OrderInvalidTransition = 4008,
    /// Line item quantity outside the accepted range
    OrderInvalidQuantity = 4009,

    // ==================== 5xxx: Payment ====================
    /// Invalid payment method
    PaymentInvalidMethod = 5003,
    /// Payment status change is not allowed from the current state
    PaymentInvalidTransition = 5006,

    // ==================== 6xxx: Product ====================
    /// Product not found
    ProductNotFound = 6001,
    /// Product has invalid price
    ProductInvalidPrice = 6002,
    /// Not enough stock to satisfy the request
    ProductOutOfStock = 6003,
    /// SKU already used by another product
    ProductSkuExists = 6004,

    // ==================== 8xxx: User ====================
    /// User not found
    UserNotFound = 8001,

    // ==================== 9xxx: System ====================
    /// Database error
    DatabaseError = 9002,
    /// System busy (write lock contention, retry later)
    SystemBusy = 9404,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::ConcurrentModification => "Resource was modified concurrently, please retry",

            // Auth
            ErrorCode::NotAuthenticated => "User is not authenticated",
            ErrorCode::TokenExpired => "Authentication token has expired",
            ErrorCode::TokenInvalid => "Authentication token is invalid",

            // Permission
            ErrorCode::PermissionDenied => "Permission denied",
            ErrorCode::AdminRequired => "Administrator role is required",
            ErrorCode::NotOrderOwner => "Order belongs to another user",

            // Order
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::OrderEmpty => "Order is empty",
            ErrorCode::OrderInvalidTransition => "Order status transition is not allowed",
            ErrorCode::OrderInvalidQuantity => "Item quantity is out of range",

            // Payment
            ErrorCode::PaymentInvalidMethod => "Invalid payment method",
            ErrorCode::PaymentInvalidTransition => "Payment status change is not allowed",

            // Product
            ErrorCode::ProductNotFound => "Product not found",
            ErrorCode::ProductInvalidPrice => "Product has invalid price",
            ErrorCode::ProductOutOfStock => "Insufficient stock",
            ErrorCode::ProductSkuExists => "Product SKU already exists",

            // User
            ErrorCode::UserNotFound => "User not found",

            // System
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::SystemBusy => "System busy, please retry later",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", self.code())
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            2 => Ok(ErrorCode::ValidationFailed),
            9 => Ok(ErrorCode::ConcurrentModification),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1003 => Ok(ErrorCode::TokenExpired),
            1004 => Ok(ErrorCode::TokenInvalid),

            // Permission
            2001 => Ok(ErrorCode::PermissionDenied),
            2003 => Ok(ErrorCode::AdminRequired),
            2006 => Ok(ErrorCode::NotOrderOwner),

            // Order
            4001 => Ok(ErrorCode::OrderNotFound),
            4007 => Ok(ErrorCode::OrderEmpty),
            4008 => Ok(ErrorCode::OrderInvalidTransition),
            4009 => Ok(ErrorCode::OrderInvalidQuantity),

            // Payment
            5003 => Ok(ErrorCode::PaymentInvalidMethod),
            5006 => Ok(ErrorCode::PaymentInvalidTransition),

            // Product
            6001 => Ok(ErrorCode::ProductNotFound),
            6002 => Ok(ErrorCode::ProductInvalidPrice),
            6003 => Ok(ErrorCode::ProductOutOfStock),
            6004 => Ok(ErrorCode::ProductSkuExists),

            // User
            8001 => Ok(ErrorCode::UserNotFound),

            // System
            9002 => Ok(ErrorCode::DatabaseError),
            9404 => Ok(ErrorCode::SystemBusy),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}
