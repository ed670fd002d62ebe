//! Per-IP fixed-window rate limiting for login and registration

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use shared::error::{AppError, ErrorCode};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::state::AppState;

/// Entries idle longer than this are dropped by `cleanup`
const IDLE_TTL: Duration = Duration::from_secs(300);

/// A named limit: at most `max_requests` per `window` per client IP
#[derive(Debug, Clone, Copy)]
pub struct RateRule {
    pub route: &'static str,
    pub max_requests: u32,
    pub window: Duration,
}

pub const LOGIN_RULE: RateRule = RateRule {
    route: "login",
    max_requests: 5,
    window: Duration::from_secs(60),
};

pub const REGISTER_RULE: RateRule = RateRule {
    route: "register",
    max_requests: 3,
    window: Duration::from_secs(60),
};

struct IpEntry {
    count: u32,
    window_start: Instant,
}

#[derive(Clone, Default)]
pub struct RateLimiter {
    /// route name -> (IP -> entry)
    inner: Arc<Mutex<HashMap<&'static str, HashMap<String, IpEntry>>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the request is allowed, `false` if rate-limited.
    pub async fn check(&self, rule: RateRule, ip: &str) -> bool {
        let mut map = self.inner.lock().await;
        let route_map = map.entry(rule.route).or_default();
        let now = Instant::now();

        let entry = route_map.entry(ip.to_owned()).or_insert_with(|| IpEntry {
            count: 0,
            window_start: now,
        });

        if now.duration_since(entry.window_start) >= rule.window {
            entry.count = 0;
            entry.window_start = now;
        }

        entry.count += 1;
        entry.count <= rule.max_requests
    }

    /// Remove idle entries
    pub async fn cleanup(&self) {
        let mut map = self.inner.lock().await;
        let now = Instant::now();

        for route_map in map.values_mut() {
            route_map.retain(|_, entry| now.duration_since(entry.window_start) < IDLE_TTL);
        }
        map.retain(|_, route_map| !route_map.is_empty());
    }

    #[cfg(test)]
    async fn tracked_ips(&self, route: &str) -> usize {
        self.inner.lock().await.get(route).map_or(0, HashMap::len)
    }
}

/// Client IP: first X-Forwarded-For entry, then the peer address.
fn extract_ip(request: &Request) -> String {
    if let Some(forwarded) = request.headers().get("x-forwarded-for")
        && let Ok(val) = forwarded.to_str()
        && let Some(first) = val.split(',').next()
    {
        let ip = first.trim();
        if !ip.is_empty() {
            return ip.to_owned();
        }
    }

    request
        .extensions()
        .get::<axum::extract::ConnectInfo<std::net::SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_owned())
}

async fn enforce(state: &AppState, rule: RateRule, request: Request, next: Next) -> Response {
    let ip = extract_ip(&request);
    if !state.rate_limiter.check(rule, &ip).await {
        tracing::warn!(route = rule.route, ip = %ip, "Rate limit exceeded");
        return AppError::with_message(
            ErrorCode::TooManyAttempts,
            "Too many requests, try again later",
        )
        .into_response();
    }
    next.run(request).await
}

/// Login: 5 requests/minute per IP
pub async fn login_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    enforce(&state, LOGIN_RULE, request, next).await
}

/// Registration: 3 requests/minute per IP
pub async fn register_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    enforce(&state, REGISTER_RULE, request, next).await
}
