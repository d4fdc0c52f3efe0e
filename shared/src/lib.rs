//! Shared types for the storefront
//!
//! Domain models, error codes and the API response envelope used by the
//! server crate and by any client talking to it.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
