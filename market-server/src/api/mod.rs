//! HTTP API for market-server
//!
//! | Prefix | Module | Auth |
//! |--------|--------|------|
//! | /health | [`health`] | none |
//! | /api/auth | [`auth`] | login/register public and rate limited |
//! | /api/products | [`products`] | writes need a user |
//! | /api/cart | [`cart`] | user |
//! | /api/orders | [`orders`] | user |
//! | /api/reviews | [`reviews`] | writes need a user |

pub mod auth;
pub mod cart;
pub mod health;
pub mod orders;
pub mod products;
pub mod reviews;

use axum::Router;
use axum::middleware as axum_middleware;
use http::{HeaderName, HeaderValue};
use shared::error::{AppError, ErrorCode};
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::config::Config;
use crate::middleware::logging_middleware;
use crate::state::AppState;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// In-flight request cap across the whole router
const MAX_CONCURRENT_REQUESTS: usize = 256;

#[derive(Clone)]
struct XRequestId;

impl MakeRequestId for XRequestId {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Build a router with all routes registered (no middleware)
pub fn build_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(auth::router(state))
        .merge(products::router())
        .merge(cart::router())
        .merge(orders::router())
        .merge(reviews::router())
}

/// Build the application: routes, middleware and state
pub fn create_router(state: AppState) -> Router {
    build_router(&state)
        .layer(GlobalConcurrencyLimitLayer::new(MAX_CONCURRENT_REQUESTS))
        .layer(CompressionLayer::new())
        // Request logging, sees the request id set below
        .layer(axum_middleware::from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
            REQUEST_ID_HEADER,
        )))
        .layer(SetRequestIdLayer::new(
            HeaderName::from_static(REQUEST_ID_HEADER),
            XRequestId,
        ))
        .with_state(state)
}

/// CORS policy: configured origins, or permissive in development
pub fn cors_layer(config: &Config) -> CorsLayer {
    if config.cors_origins.is_empty() {
        if !config.is_development() {
            tracing::warn!("CORS_ORIGINS not set outside development, allowing any origin");
        }
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            http::Method::GET,
            http::Method::POST,
            http::Method::PUT,
            http::Method::DELETE,
        ])
        .allow_headers([http::header::AUTHORIZATION, http::header::CONTENT_TYPE])
        .allow_credentials(true)
}

// ── Payload helpers ──

/// Trimmed value of a required text field
pub(crate) fn required_text(value: Option<String>, field: &str) -> Result<String, AppError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            AppError::with_message(ErrorCode::RequiredField, format!("{field} is required"))
                .with_detail("field", field)
        })
}

/// Trimmed optional text; blank becomes `None`
pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
