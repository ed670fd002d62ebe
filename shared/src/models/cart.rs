//! Cart Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Product;
use crate::error::{AppError, ErrorCode};

/// Upper bound for a single cart line
pub const MAX_QUANTITY: i32 = 10_000;

/// Cart line: one product pending checkout for one user
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: String,
    pub user_id: String,
    pub product_id: String,
    /// Always >= 1
    pub quantity: i32,
    pub created_at: i64,
}

/// Cart line with its product
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemDetail {
    #[serde(flatten)]
    pub item: CartItem,
    pub product: Product,
}

impl CartItemDetail {
    /// `None` when price × quantity does not fit a Decimal
    pub fn line_total(&self) -> Option<Decimal> {
        self.product
            .price
            .checked_mul(Decimal::from(self.item.quantity))
    }
}

/// Cart view (GET /api/cart)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    pub items: Vec<CartItemDetail>,
    /// Sum of price × quantity, formatted with 2 decimals
    pub total: String,
}

impl Cart {
    pub fn new(items: Vec<CartItemDetail>) -> Result<Self, AppError> {
        let total = items
            .iter()
            .try_fold(Decimal::ZERO, |acc, line| acc.checked_add(line.line_total()?))
            .ok_or_else(|| {
                AppError::with_message(ErrorCode::ValueOutOfRange, "Cart total is out of range")
            })?;
        Ok(Self {
            items,
            total: format!("{:.2}", total.round_dp(2)),
        })
    }
}

/// Add-to-cart payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartAdd {
    pub product_id: Option<String>,
    /// Defaults to 1
    pub quantity: Option<i32>,
}

/// Set cart line quantity payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CartQuantityUpdate {
    pub quantity: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn line(price: &str, quantity: i32) -> CartItemDetail {
        CartItemDetail {
            item: CartItem {
                id: format!("c-{price}"),
                user_id: "u-1".into(),
                product_id: "p-1".into(),
                quantity,
                created_at: 0,
            },
            product: Product {
                id: "p-1".into(),
                seller_id: "s-1".into(),
                name: "Item".into(),
                description: "".into(),
                price: Decimal::from_str(price).unwrap(),
                image_url: None,
                category: "Misc".into(),
                stock: 10,
                created_at: 0,
                updated_at: 0,
            },
        }
    }

    #[test]
    fn test_cart_total_two_decimals() {
        let cart = Cart::new(vec![line("19.99", 2), line("5", 1)]).unwrap();
        assert_eq!(cart.total, "44.98");
    }

    #[test]
    fn test_empty_cart_total() {
        assert_eq!(Cart::new(vec![]).unwrap().total, "0.00");
    }

    #[test]
    fn test_cart_total_overflow_is_an_error() {
        let err = Cart::new(vec![line("70000000000000000000000000000", 2)]).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValueOutOfRange);

        let err = Cart::new(vec![
            line("50000000000000000000000000000", 1),
            line("50000000000000000000000000000", 1),
        ])
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValueOutOfRange);
    }

    #[test]
    fn test_max_price_constant() {
        use crate::models::MAX_PRICE;
        assert_eq!(MAX_PRICE, Decimal::from_str("9999999999.99").unwrap());
    }
}
