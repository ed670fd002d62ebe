//! market-server: marketplace backend
//!
//! - Product catalog with seller cards and rating aggregates
//! - Per-user cart and checkout into orders with stock reservation
//! - Order status lifecycle (customer cancellation, seller fulfilment)
//! - Reviews with verified-purchase marking
//! - JWT authentication via bearer header or `auth-token` cookie

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod middleware;
pub mod orders;
pub mod state;
pub mod store;
pub mod util;

pub use config::Config;
pub use state::AppState;
