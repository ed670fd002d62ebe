//! Data models
//!
//! Shared between market-server and API clients.
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are uuid v4 strings, all timestamps are Unix milliseconds.
//! JSON uses camelCase field names.

pub mod cart;
pub mod order;
pub mod product;
pub mod review;
pub mod user;

// Re-exports
pub use cart::*;
pub use order::*;
pub use product::*;
pub use review::*;
pub use user::*;
