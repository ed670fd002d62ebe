//! Seller sales summary

use rust_decimal::Decimal;
use shared::models::{OrderStatus, SellerSales};
use std::collections::HashSet;

/// One sold order line of the seller
#[derive(Debug, Clone)]
pub struct SaleLine<'a> {
    pub order_id: &'a str,
    pub status: OrderStatus,
    pub quantity: i32,
    pub unit_price: Decimal,
}

/// Aggregate lines of orders that count as sales (confirmed, shipped, delivered)
pub fn summarize_sales<'a>(
    seller_id: &str,
    lines: impl IntoIterator<Item = SaleLine<'a>>,
) -> SellerSales {
    let mut orders = HashSet::new();
    let mut total_sales = Decimal::ZERO;
    let mut total_order_items = 0i64;

    for line in lines.into_iter().filter(|l| l.status.counts_as_sale()) {
        orders.insert(line.order_id);
        total_sales += line.unit_price * Decimal::from(line.quantity);
        total_order_items += i64::from(line.quantity);
    }

    SellerSales {
        seller_id: seller_id.to_string(),
        total_sales,
        total_order_items,
        order_count: orders.len() as i64,
    }
}
