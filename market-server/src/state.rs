//! Application state for market-server

use std::sync::Arc;

use crate::auth::{JwtConfig, JwtService, RateLimiter};
use crate::config::Config;
use crate::error::BoxError;
use crate::store::{MarketStore, MemoryStore, PgStore, seed};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Storage backend (Postgres or in-memory)
    pub store: Arc<dyn MarketStore>,
    /// Token issuing and validation
    pub jwt: Arc<JwtService>,
    /// Rate limiter for login/registration routes
    pub rate_limiter: RateLimiter,
    /// Mark the auth cookie `Secure`
    pub cookie_secure: bool,
}

impl AppState {
    /// Create a new AppState
    ///
    /// Connects to Postgres when `DATABASE_URL` is set, otherwise falls back
    /// to the in-memory store (optionally seeded with demo data).
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let store: Arc<dyn MarketStore> = match &config.database_url {
            Some(url) => {
                let store = PgStore::connect(url, config.database_max_connections).await?;
                tracing::info!("Using PostgreSQL store");
                Arc::new(store)
            }
            None => {
                tracing::warn!("DATABASE_URL not set, using in-memory store");
                let store = MemoryStore::new();
                if config.seed_demo_data {
                    seed::seed_memory(&store)?;
                }
                Arc::new(store)
            }
        };

        let jwt = JwtService::with_config(JwtConfig {
            secret: config.jwt_secret.clone(),
            expiry_hours: config.jwt_expiry_hours,
        });

        Ok(Self::with_store(store, jwt, config.cookie_secure))
    }

    /// Assemble state around an existing store
    pub fn with_store(store: Arc<dyn MarketStore>, jwt: JwtService, cookie_secure: bool) -> Self {
        Self {
            store,
            jwt: Arc::new(jwt),
            rate_limiter: RateLimiter::new(),
            cookie_secure,
        }
    }
}
