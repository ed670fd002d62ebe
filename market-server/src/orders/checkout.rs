//! Checkout planning
//!
//! Runs against cart lines read under the backend's lock, so the stock
//! figures are the ones the order will be committed against.

use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use std::collections::BTreeMap;

/// A cart line joined with its product's current state
#[derive(Debug, Clone)]
pub struct CheckoutLine {
    pub cart_item_id: String,
    pub product_id: String,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub stock: i32,
}

/// One order item to insert
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedLine {
    pub product_id: String,
    pub quantity: i32,
    /// Unit price at time of purchase
    pub unit_price: Decimal,
}

#[derive(Debug, Clone)]
pub struct CheckoutPlan {
    pub lines: Vec<PlannedLine>,
    /// Σ unit price × quantity
    pub total: Decimal,
    /// product id -> units to take from stock, in product id order
    pub decrements: BTreeMap<String, i32>,
}

fn out_of_range() -> AppError {
    AppError::with_message(ErrorCode::ValueOutOfRange, "Order total is out of range")
}

pub fn plan_checkout(lines: &[CheckoutLine]) -> Result<CheckoutPlan, AppError> {
    if lines.is_empty() {
        return Err(AppError::new(ErrorCode::CartEmpty));
    }

    let mut decrements: BTreeMap<String, i32> = BTreeMap::new();
    let mut planned = Vec::with_capacity(lines.len());
    let mut total = Decimal::ZERO;

    for line in lines {
        if line.quantity < 1 {
            return Err(AppError::new(ErrorCode::InvalidQuantity)
                .with_detail("cart_item_id", line.cart_item_id.as_str()));
        }

        let requested = decrements.entry(line.product_id.clone()).or_insert(0);
        *requested = requested.saturating_add(line.quantity);
        if *requested > line.stock {
            return Err(AppError::insufficient_stock(
                &line.product_id,
                &line.product_name,
                *requested,
                line.stock,
            ));
        }

        total = line
            .unit_price
            .checked_mul(Decimal::from(line.quantity))
            .and_then(|subtotal| total.checked_add(subtotal))
            .ok_or_else(out_of_range)?;
        planned.push(PlannedLine {
            product_id: line.product_id.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
        });
    }

    Ok(CheckoutPlan {
        lines: planned,
        total,
        decrements,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn line(product: &str, quantity: i32, price: &str, stock: i32) -> CheckoutLine {
        CheckoutLine {
            cart_item_id: format!("c-{product}"),
            product_id: product.to_string(),
            product_name: format!("Product {product}"),
            quantity,
            unit_price: Decimal::from_str(price).unwrap(),
            stock,
        }
    }

    #[test]
    fn test_empty_cart_rejected() {
        let err = plan_checkout(&[]).unwrap_err();
        assert_eq!(err.code, ErrorCode::CartEmpty);
    }

    #[test]
    fn test_total_and_decrements() {
        let plan = plan_checkout(&[line("b", 2, "19.99", 5), line("a", 3, "0.50", 3)]).unwrap();
        assert_eq!(plan.total, Decimal::from_str("41.48").unwrap());
        assert_eq!(plan.lines.len(), 2);
        assert_eq!(plan.lines[0].unit_price, Decimal::from_str("19.99").unwrap());

        let order: Vec<_> = plan.decrements.iter().collect();
        assert_eq!(order, vec![(&"a".to_string(), &3), (&"b".to_string(), &2)]);
    }

    #[test]
    fn test_quantity_equal_to_stock_allowed() {
        assert!(plan_checkout(&[line("a", 4, "1", 4)]).is_ok());
    }

    #[test]
    fn test_first_short_line_reported() {
        let err = plan_checkout(&[
            line("a", 1, "1", 10),
            line("b", 3, "1", 2),
            line("c", 9, "1", 0),
        ])
        .unwrap_err();

        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert_eq!(err.message, "Insufficient stock for Product b");
        let details = err.details.unwrap();
        assert_eq!(details["product_id"], "b");
        assert_eq!(details["requested"], 3);
        assert_eq!(details["available"], 2);
    }

    #[test]
    fn test_repeated_product_checked_in_aggregate() {
        let err = plan_checkout(&[line("a", 2, "1", 3), line("a", 2, "1", 3)]).unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert_eq!(err.details.unwrap()["requested"], 4);
    }

    #[test]
    fn test_aggregate_quantity_saturates_instead_of_wrapping() {
        let err = plan_checkout(&[line("a", i32::MAX, "1", 5), line("a", 1, "1", 5)]).unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
    }

    #[test]
    fn test_total_overflow_rejected() {
        let err = plan_checkout(&[line("a", 2, "70000000000000000000000000000", 5)]).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValueOutOfRange);

        let err = plan_checkout(&[
            line("a", 1, "50000000000000000000000000000", 5),
            line("b", 1, "50000000000000000000000000000", 5),
        ])
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValueOutOfRange);
    }

    #[test]
    fn test_non_positive_quantity_rejected() {
        let err = plan_checkout(&[line("a", 0, "1", 3)]).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidQuantity);
    }
}
