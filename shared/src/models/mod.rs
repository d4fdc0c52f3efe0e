//! Data models
//!
//! Shared between store-server and API clients.
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` (SQLite INTEGER PRIMARY KEY).

pub mod order;
pub mod page;
pub mod product;
pub mod stats;
pub mod user;

// Re-exports
pub use order::*;
pub use page::*;
pub use product::*;
pub use stats::*;
pub use user::*;
