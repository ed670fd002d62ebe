//! Authentication: JWT issuing/validation, the auth cookie, the
//! `CurrentUser` extractor and per-IP rate limiting.

pub mod cookie;
mod extractor;
pub mod jwt;
pub mod rate_limit;

pub use jwt::{Claims, CurrentUser, JwtConfig, JwtError, JwtService};
pub use rate_limit::RateLimiter;
