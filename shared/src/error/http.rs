//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Success => StatusCode::OK,

            // 404 Not Found
            Self::OrderNotFound | Self::ProductNotFound | Self::UserNotFound => StatusCode::NOT_FOUND,

            // 409 Conflict
            Self::ConcurrentModification
            | Self::ProductOutOfStock
            | Self::ProductSkuExists => StatusCode::CONFLICT,

            // 422 Unprocessable Entity
            Self::OrderInvalidTransition | Self::PaymentInvalidTransition => {
                StatusCode::UNPROCESSABLE_ENTITY
            }

            // 401 Unauthorized
            Self::NotAuthenticated | Self::TokenExpired | Self::TokenInvalid => {
                StatusCode::UNAUTHORIZED
            }

            // 403 Forbidden
            Self::PermissionDenied | Self::AdminRequired | Self::NotOrderOwner => {
                StatusCode::FORBIDDEN
            }

            // 503 Service Unavailable (transient errors, client can retry)
            Self::SystemBusy => StatusCode::SERVICE_UNAVAILABLE,

            // 500 Internal Server Error
            Self::DatabaseError => StatusCode::INTERNAL_SERVER_ERROR,

            // 400 Bad Request (default for validation errors)
            _ => StatusCode::BAD_REQUEST,
        }
    }
}
