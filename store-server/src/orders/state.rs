//! Order lifecycle state machine
//!
//! `status`, `payment_status` and `is_returned` are planned together as one
//! compound state so the engine never writes an illegal combination such as
//! a returned order whose payment is still pending.
//!
//! | From → To | Stock effect | Other effects |
//! |-----------|--------------|---------------|
//! | pending/processing/shipped → cancelled | restock every line | settle payment |
//! | pending/processing/shipped/delivered → returned | restock (once, guarded by `is_returned`) | `is_returned`, `return_date`, settle payment |
//! | → delivered | none | `delivered_at` on first delivery only |
//! | same status | none | none |
//! | cancelled/returned → anything else | rejected | |
//! | delivered → anything but returned | rejected | |

use shared::models::{Order, OrderStatus, PaymentStatus};

use super::error::{OrderError, OrderResult};

/// Stock effect of a transition, applied once per line item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockEffect {
    None,
    /// Compensating adjustment: put every line back on the shelf
    Restock,
}

/// Compound lifecycle state of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderState {
    pub status: OrderStatus,
    pub payment: PaymentStatus,
    pub is_returned: bool,
    /// `delivered_at` already recorded
    pub delivered: bool,
}

/// Everything a status transition will do, computed before any write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionPlan {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub stock: StockEffect,
    /// Payment sub-state after the transition
    pub payment: PaymentStatus,
    pub mark_returned: bool,
    pub mark_delivered: bool,
}

impl TransitionPlan {
    /// Nothing to write
    pub fn is_noop(&self) -> bool {
        self.from == self.to
    }
}

impl From<&Order> for OrderState {
    fn from(order: &Order) -> Self {
        Self {
            status: order.status,
            payment: order.payment_status,
            is_returned: order.is_returned,
            delivered: order.delivered_at.is_some(),
        }
    }
}

/// Payment sub-state once the order is cancelled or returned
fn settle(payment: PaymentStatus) -> PaymentStatus {
    match payment {
        PaymentStatus::Paid => PaymentStatus::Refunded,
        PaymentStatus::Pending => PaymentStatus::Failed,
        settled => settled,
    }
}

impl OrderState {
    /// State of a freshly created order
    pub fn initial() -> Self {
        Self {
            status: OrderStatus::Pending,
            payment: PaymentStatus::Pending,
            is_returned: false,
            delivered: false,
        }
    }

    /// Plan the move to `to`, or reject it
    pub fn plan_transition(&self, to: OrderStatus) -> OrderResult<TransitionPlan> {
        use OrderStatus::*;

        let from = self.status;
        let mut plan = TransitionPlan {
            from,
            to,
            stock: StockEffect::None,
            payment: self.payment,
            mark_returned: false,
            mark_delivered: false,
        };

        if from == to {
            return Ok(plan);
        }

        let allowed = match from {
            Cancelled | Returned => false,
            Delivered => to == Returned,
            Pending | Processing | Shipped => true,
        };
        if !allowed {
            return Err(OrderError::InvalidTransition { from, to });
        }

        match to {
            Cancelled => {
                plan.stock = StockEffect::Restock;
                plan.payment = settle(self.payment);
            }
            Returned => {
                if !self.is_returned {
                    plan.stock = StockEffect::Restock;
                    plan.mark_returned = true;
                }
                plan.payment = settle(self.payment);
            }
            Delivered => plan.mark_delivered = !self.delivered,
            Pending | Processing | Shipped => {}
        }

        Ok(plan)
    }

    /// Validate a payment change; `None` means nothing to write
    pub fn plan_payment(&self, to: PaymentStatus) -> OrderResult<Option<PaymentStatus>> {
        if self.payment == to {
            return Ok(None);
        }
        let closed = matches!(self.status, OrderStatus::Cancelled | OrderStatus::Returned);
        if closed && !to.is_settled() {
            return Err(OrderError::InvalidPaymentTransition {
                status: self.status,
                from: self.payment,
                to,
            });
        }
        Ok(Some(to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderStatus::*;

    fn state(status: OrderStatus, payment: PaymentStatus) -> OrderState {
        OrderState {
            status,
            payment,
            is_returned: status == Returned,
            delivered: status == Delivered,
        }
    }

    #[test]
    fn test_same_status_is_noop() {
        for status in OrderStatus::ALL {
            let plan = state(status, PaymentStatus::Paid)
                .plan_transition(status)
                .unwrap();
            assert!(plan.is_noop());
            assert_eq!(plan.stock, StockEffect::None);
            assert_eq!(plan.payment, PaymentStatus::Paid);
        }
    }

    #[test]
    fn test_cancel_open_order_restocks_and_settles() {
        for from in [Pending, Processing, Shipped] {
            let plan = state(from, PaymentStatus::Paid)
                .plan_transition(Cancelled)
                .unwrap();
            assert_eq!(plan.stock, StockEffect::Restock);
            assert_eq!(plan.payment, PaymentStatus::Refunded);
        }
        let plan = OrderState::initial().plan_transition(Cancelled).unwrap();
        assert_eq!(plan.payment, PaymentStatus::Failed);
    }

    #[test]
    fn test_terminal_states_cannot_be_left() {
        for from in [Cancelled, Returned] {
            for to in OrderStatus::ALL.into_iter().filter(|s| *s != from) {
                let err = state(from, PaymentStatus::Refunded)
                    .plan_transition(to)
                    .unwrap_err();
                assert!(matches!(err, OrderError::InvalidTransition { .. }), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn test_delivered_only_moves_to_returned() {
        let delivered = state(Delivered, PaymentStatus::Paid);
        for to in [Pending, Processing, Shipped, Cancelled] {
            assert!(delivered.plan_transition(to).is_err(), "delivered -> {to}");
        }
        let plan = delivered.plan_transition(Returned).unwrap();
        assert_eq!(plan.stock, StockEffect::Restock);
        assert!(plan.mark_returned);
        assert_eq!(plan.payment, PaymentStatus::Refunded);
    }

    #[test]
    fn test_return_restocks_only_once() {
        // 已退货标记存在时不再补库存
        let odd = OrderState {
            status: Shipped,
            payment: PaymentStatus::Refunded,
            is_returned: true,
            delivered: false,
        };
        let plan = odd.plan_transition(Returned).unwrap();
        assert_eq!(plan.stock, StockEffect::None);
        assert!(!plan.mark_returned);
    }

    #[test]
    fn test_delivered_at_first_time_only() {
        let plan = state(Shipped, PaymentStatus::Paid)
            .plan_transition(Delivered)
            .unwrap();
        assert!(plan.mark_delivered);

        let redelivered = OrderState {
            status: Shipped,
            payment: PaymentStatus::Paid,
            is_returned: false,
            delivered: true,
        };
        assert!(!redelivered.plan_transition(Delivered).unwrap().mark_delivered);
    }

    #[test]
    fn test_open_states_move_freely() {
        let plan = state(Shipped, PaymentStatus::Pending)
            .plan_transition(Processing)
            .unwrap();
        assert_eq!(plan.stock, StockEffect::None);
        assert_eq!(plan.payment, PaymentStatus::Pending);
    }

    #[test]
    fn test_payment_on_closed_order_must_settle() {
        let cancelled = state(Cancelled, PaymentStatus::Failed);
        assert!(cancelled.plan_payment(PaymentStatus::Paid).is_err());
        assert!(cancelled.plan_payment(PaymentStatus::Pending).is_err());
        assert_eq!(
            cancelled.plan_payment(PaymentStatus::Refunded).unwrap(),
            Some(PaymentStatus::Refunded)
        );
        assert_eq!(cancelled.plan_payment(PaymentStatus::Failed).unwrap(), None);

        let open = OrderState::initial();
        assert_eq!(
            open.plan_payment(PaymentStatus::Paid).unwrap(),
            Some(PaymentStatus::Paid)
        );
    }
}
