//! Order core
//!
//! - [`OrderEngine`] - 订单生命周期 (create / transition / payment / delete / reads)
//! - [`state`] - compound status planning, no I/O
//! - [`money`] - Decimal arithmetic and input validation
//! - [`Actor`] - caller identity and ownership rules

pub mod access;
pub mod engine;
pub mod error;
pub mod money;
pub mod state;

#[cfg(test)]
mod tests;

pub use access::Actor;
pub use engine::{DEFAULT_RETRY_ATTEMPTS, OrderEngine};
pub use error::{OrderError, OrderResult};
pub use state::{OrderState, StockEffect, TransitionPlan};
