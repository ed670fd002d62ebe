//! Order lifecycle rules shared by every store backend
//!
//! - `status`: who may move an order between which statuses
//! - `checkout`: turning locked cart lines into an order plan
//! - `sales`: seller revenue summary

mod checkout;
mod sales;
mod status;

pub use checkout::{CheckoutLine, CheckoutPlan, PlannedLine, plan_checkout};
pub use sales::{SaleLine, summarize_sales};
pub use status::{Actor, Transition, can_transition, parse_status, resolve_actor, transition};

pub use shared::models::OrderStatus;
