//! Money calculation utilities using rust_decimal for precision
//!
//! All calculations are done using `Decimal` internally, then converted to `f64`
//! for storage/serialization.

use rust_decimal::prelude::*;
use shared::models::{OrderCreate, OrderItemInput};

use super::error::{OrderError, OrderResult};

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Maximum allowed quantity per line
pub const MAX_QUANTITY: i64 = 9999;
/// Maximum allowed tax / shipping amount (1,000,000)
const MAX_AMOUNT: f64 = 1_000_000.0;

/// Convert f64 to Decimal for calculation
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert Decimal back to f64 for storage, rounded to 2 decimal places
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

/// Validate a non-negative, finite amount such as tax or shipping cost
fn validate_amount(value: f64, field_name: &str) -> OrderResult<()> {
    if !value.is_finite() {
        return Err(OrderError::Validation(format!(
            "{field_name} must be a finite number, got {value}"
        )));
    }
    if value < 0.0 {
        return Err(OrderError::Validation(format!(
            "{field_name} must be non-negative, got {value}"
        )));
    }
    if value > MAX_AMOUNT {
        return Err(OrderError::Validation(format!(
            "{field_name} exceeds maximum allowed ({MAX_AMOUNT}), got {value}"
        )));
    }
    Ok(())
}

/// Validate a create-order payload and merge repeated product lines.
///
/// Lines come back in first-seen order.
pub fn validate_order_input(input: &OrderCreate) -> OrderResult<Vec<OrderItemInput>> {
    if input.items.is_empty() {
        return Err(OrderError::EmptyOrder);
    }
    if input.payment_method.trim().is_empty() {
        return Err(OrderError::InvalidPaymentMethod(
            input.payment_method.clone(),
        ));
    }
    if let Some(tax) = input.tax {
        validate_amount(tax, "tax")?;
    }
    if let Some(shipping) = input.shipping_cost {
        validate_amount(shipping, "shipping_cost")?;
    }

    let address = &input.shipping_address;
    for (field, value) in [
        ("full_name", &address.full_name),
        ("street", &address.street),
        ("city", &address.city),
        ("postal_code", &address.postal_code),
        ("country", &address.country),
    ] {
        if value.trim().is_empty() {
            return Err(OrderError::Validation(format!(
                "shipping_address.{field} is required"
            )));
        }
    }

    let mut lines: Vec<OrderItemInput> = Vec::with_capacity(input.items.len());
    for item in &input.items {
        if item.quantity <= 0 || item.quantity > MAX_QUANTITY {
            return Err(OrderError::InvalidQuantity {
                product_id: item.product_id,
                quantity: item.quantity,
            });
        }
        match lines.iter_mut().find(|l| l.product_id == item.product_id) {
            Some(line) => {
                line.quantity += item.quantity;
                if line.quantity > MAX_QUANTITY {
                    return Err(OrderError::InvalidQuantity {
                        product_id: line.product_id,
                        quantity: line.quantity,
                    });
                }
            }
            None => lines.push(item.clone()),
        }
    }
    Ok(lines)
}

/// Order money breakdown
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderTotals {
    pub subtotal: f64,
    pub tax: f64,
    pub shipping_cost: f64,
    pub total: f64,
}

/// subtotal = Σ price × quantity; total = subtotal + tax + shipping
pub fn compute_totals(lines: &[(f64, i64)], tax: f64, shipping_cost: f64) -> OrderTotals {
    let subtotal: Decimal = lines
        .iter()
        .map(|(price, qty)| to_decimal(*price) * Decimal::from(*qty))
        .sum();
    let tax = to_decimal(tax);
    let shipping = to_decimal(shipping_cost);
    let total = subtotal + tax + shipping;

    OrderTotals {
        subtotal: to_f64(subtotal),
        tax: to_f64(tax),
        shipping_cost: to_f64(shipping),
        total: to_f64(total),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::ShippingAddress;

    fn payload(items: Vec<(i64, i64)>) -> OrderCreate {
        OrderCreate {
            items: items
                .into_iter()
                .map(|(product_id, quantity)| OrderItemInput {
                    product_id,
                    quantity,
                })
                .collect(),
            shipping_address: ShippingAddress {
                full_name: "Ada Lovelace".into(),
                street: "1 Analytical Way".into(),
                city: "London".into(),
                state: None,
                postal_code: "N1".into(),
                country: "GB".into(),
                phone: None,
            },
            payment_method: "card".into(),
            tax: None,
            shipping_cost: None,
            notes: None,
        }
    }

    #[test]
    fn test_totals_avoid_float_drift() {
        // 0.1 * 3 在 f64 下为 0.30000000000000004
        let totals = compute_totals(&[(0.1, 3), (19.99, 2)], 2.5, 4.99);
        assert_eq!(totals.subtotal, 40.28);
        assert_eq!(totals.tax, 2.5);
        assert_eq!(totals.total, 47.77);
    }

    #[test]
    fn test_empty_order_rejected() {
        assert!(matches!(
            validate_order_input(&payload(vec![])),
            Err(OrderError::EmptyOrder)
        ));
    }

    #[test]
    fn test_quantity_bounds() {
        assert!(matches!(
            validate_order_input(&payload(vec![(1, 0)])),
            Err(OrderError::InvalidQuantity { quantity: 0, .. })
        ));
        assert!(validate_order_input(&payload(vec![(1, MAX_QUANTITY)])).is_ok());
        assert!(validate_order_input(&payload(vec![(1, MAX_QUANTITY + 1)])).is_err());
    }

    #[test]
    fn test_duplicate_lines_are_merged() {
        let lines = validate_order_input(&payload(vec![(1, 2), (2, 1), (1, 3)])).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].product_id, 1);
        assert_eq!(lines[0].quantity, 5);

        // merged quantity is bounded too
        assert!(validate_order_input(&payload(vec![(1, 9000), (1, 1000)])).is_err());
    }

    #[test]
    fn test_amounts_must_be_finite_and_non_negative() {
        let mut p = payload(vec![(1, 1)]);
        p.tax = Some(f64::NAN);
        assert!(validate_order_input(&p).is_err());
        p.tax = Some(-1.0);
        assert!(validate_order_input(&p).is_err());
        p.tax = Some(1.0);
        p.shipping_cost = Some(f64::INFINITY);
        assert!(validate_order_input(&p).is_err());
    }

    #[test]
    fn test_blank_payment_method_rejected() {
        let mut p = payload(vec![(1, 1)]);
        p.payment_method = "   ".into();
        assert!(matches!(
            validate_order_input(&p),
            Err(OrderError::InvalidPaymentMethod(_))
        ));
    }

    #[test]
    fn test_address_required_fields() {
        let mut p = payload(vec![(1, 1)]);
        p.shipping_address.city = "  ".into();
        assert!(matches!(
            validate_order_input(&p),
            Err(OrderError::Validation(msg)) if msg.contains("city")
        ));
    }
}
