//! Caller identity as seen by the order core
//!
//! The identity is supplied by the auth layer and trusted as-is.

use shared::models::{Order, OrderStatus};

use super::error::{OrderError, OrderResult};

/// Authenticated caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: i64,
    pub is_admin: bool,
}

impl Actor {
    pub fn customer(user_id: i64) -> Self {
        Self {
            user_id,
            is_admin: false,
        }
    }

    pub fn admin(user_id: i64) -> Self {
        Self {
            user_id,
            is_admin: true,
        }
    }

    pub fn require_admin(&self) -> OrderResult<()> {
        if self.is_admin {
            Ok(())
        } else {
            Err(OrderError::Unauthorized("admin role required".into()))
        }
    }

    /// Owner or admin
    pub fn can_view(&self, order: &Order) -> OrderResult<()> {
        if self.is_admin || order.user_id == self.user_id {
            Ok(())
        } else {
            Err(OrderError::NotOrderOwner(order.id))
        }
    }

    /// Admins may apply any transition; customers may only cancel their own
    /// pending order (repeating the cancel is allowed and is a no-op).
    pub fn can_transition(&self, order: &Order, to: OrderStatus) -> OrderResult<()> {
        if self.is_admin {
            return Ok(());
        }
        self.can_view(order)?;
        let cancelling = to == OrderStatus::Cancelled
            && matches!(order.status, OrderStatus::Pending | OrderStatus::Cancelled);
        if cancelling {
            Ok(())
        } else {
            Err(OrderError::Unauthorized(format!(
                "customers may only cancel pending orders (order is {}, requested {to})",
                order.status
            )))
        }
    }
}
