//! Order status transition table

use shared::error::{AppError, ErrorCode};
use shared::models::{OrderStatus, OrderWithItems};

/// Who is acting on an order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    /// The buyer who placed the order
    Customer,
    /// A seller with at least one line in the order
    Seller,
}

impl Actor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Seller => "seller",
        }
    }
}

/// An accepted status change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: OrderStatus,
    pub to: OrderStatus,
    /// Every line's quantity goes back to product stock
    pub restores_stock: bool,
}

pub fn can_transition(actor: Actor, from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::*;
    match actor {
        Actor::Customer => matches!((from, to), (Pending, Cancelled) | (Confirmed, Cancelled)),
        Actor::Seller => matches!(
            (from, to),
            (Pending, Confirmed)
                | (Confirmed, Shipped)
                | (Shipped, Delivered)
                | (Pending, Cancelled)
                | (Confirmed, Cancelled)
        ),
    }
}

/// Validate a status change against the table
pub fn transition(
    actor: Actor,
    from: OrderStatus,
    to: OrderStatus,
) -> Result<Transition, AppError> {
    if !can_transition(actor, from, to) {
        return Err(AppError::with_message(
            ErrorCode::InvalidStatusTransition,
            format!("Cannot change order status from {from} to {to}"),
        )
        .with_detail("from", from.as_db())
        .with_detail("to", to.as_db())
        .with_detail("actor", actor.as_str()));
    }
    Ok(Transition {
        from,
        to,
        restores_stock: to == OrderStatus::Cancelled,
    })
}

/// Parse a requested status, rejecting unknown values
pub fn parse_status(value: &str) -> Result<OrderStatus, AppError> {
    OrderStatus::from_db(value.trim()).ok_or_else(|| {
        AppError::with_message(ErrorCode::InvalidOrderStatus, "Invalid status")
            .with_detail("status", value)
    })
}

/// The buyer acts as customer; a seller of any line acts as seller.
pub fn resolve_actor(order: &OrderWithItems, user_id: &str) -> Result<Actor, AppError> {
    if order.order.user_id == user_id {
        Ok(Actor::Customer)
    } else if order.has_seller(user_id) {
        Ok(Actor::Seller)
    } else {
        Err(AppError::not_owner("You can only update your own orders"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderStatus::*;
    use rust_decimal::Decimal;
    use shared::models::{Order, OrderItem, OrderItemDetail, ProductSummary};

    #[test]
    fn test_customer_may_only_cancel_open_orders() {
        for from in OrderStatus::ALL {
            for to in OrderStatus::ALL {
                let allowed = can_transition(Actor::Customer, from, to);
                let expected = to == Cancelled && matches!(from, Pending | Confirmed);
                assert_eq!(allowed, expected, "{from} -> {to}");
            }
        }
    }

    #[test]
    fn test_seller_fulfilment_path() {
        assert!(can_transition(Actor::Seller, Pending, Confirmed));
        assert!(can_transition(Actor::Seller, Confirmed, Shipped));
        assert!(can_transition(Actor::Seller, Shipped, Delivered));
        assert!(can_transition(Actor::Seller, Confirmed, Cancelled));
        // No skipping steps or going backwards
        assert!(!can_transition(Actor::Seller, Pending, Shipped));
        assert!(!can_transition(Actor::Seller, Shipped, Confirmed));
        assert!(!can_transition(Actor::Seller, Shipped, Cancelled));
    }

    #[test]
    fn test_terminal_statuses_are_final_for_everyone() {
        for actor in [Actor::Customer, Actor::Seller] {
            for from in [Delivered, Cancelled] {
                for to in OrderStatus::ALL {
                    assert!(!can_transition(actor, from, to), "{actor:?} {from} -> {to}");
                }
            }
        }
    }

    #[test]
    fn test_transition_marks_stock_restore_on_cancel() {
        let t = transition(Actor::Customer, Confirmed, Cancelled).unwrap();
        assert!(t.restores_stock);

        let t = transition(Actor::Seller, Pending, Confirmed).unwrap();
        assert!(!t.restores_stock);
    }

    #[test]
    fn test_transition_rejection_details() {
        let err = transition(Actor::Customer, Shipped, Cancelled).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidStatusTransition);
        let details = err.details.unwrap();
        assert_eq!(details["from"], "SHIPPED");
        assert_eq!(details["to"], "CANCELLED");
        assert_eq!(details["actor"], "customer");
    }

    #[test]
    fn test_parse_status() {
        assert_eq!(parse_status("SHIPPED").unwrap(), Shipped);
        assert_eq!(parse_status(" CANCELLED ").unwrap(), Cancelled);
        assert_eq!(
            parse_status("LOST").unwrap_err().code,
            ErrorCode::InvalidOrderStatus
        );
    }

    fn order(buyer: &str, seller: &str) -> OrderWithItems {
        OrderWithItems {
            order: Order {
                id: "o-1".into(),
                user_id: buyer.into(),
                status: Pending,
                total_amount: Decimal::from(10),
                shipping_address: "1 Main St".into(),
                created_at: 0,
                updated_at: 0,
            },
            items: vec![OrderItemDetail {
                item: OrderItem {
                    id: "i-1".into(),
                    order_id: "o-1".into(),
                    product_id: "p-1".into(),
                    quantity: 1,
                    price: Decimal::from(10),
                },
                product: ProductSummary {
                    id: "p-1".into(),
                    name: "Mug".into(),
                    image_url: None,
                    price: Decimal::from(10),
                    seller_id: seller.into(),
                },
            }],
        }
    }

    #[test]
    fn test_resolve_actor() {
        let o = order("buyer", "seller");
        assert_eq!(resolve_actor(&o, "buyer").unwrap(), Actor::Customer);
        assert_eq!(resolve_actor(&o, "seller").unwrap(), Actor::Seller);
        assert_eq!(
            resolve_actor(&o, "stranger").unwrap_err().code,
            ErrorCode::NotResourceOwner
        );
    }
}
