//! Market server configuration

use crate::error::BoxError;

/// Market server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Environment: development | staging | production
    pub environment: String,
    /// HTTP listen port
    pub http_port: u16,
    /// PostgreSQL connection URL; `None` selects the in-memory store (development only)
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    /// HS256 signing secret
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    /// Mark the auth cookie `Secure`
    pub cookie_secure: bool,
    /// Allowed CORS origins; empty means permissive in development
    pub cors_origins: Vec<String>,
    /// Seed demo users and products into the in-memory store
    pub seed_demo_data: bool,
}

impl Config {
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, BoxError> {
        let environment = lookup("ENVIRONMENT").unwrap_or_else(|| "development".into());
        let development = environment == "development";

        let database_url = lookup("DATABASE_URL").filter(|s| !s.is_empty());
        if database_url.is_none() && !development {
            return Err(format!("DATABASE_URL must be set in {environment} environment").into());
        }

        let jwt_secret = match lookup("JWT_SECRET").filter(|s| !s.is_empty()) {
            Some(secret) => secret,
            None if development => {
                tracing::warn!("JWT_SECRET not set, using a random development secret");
                generate_dev_secret()
            }
            None => {
                return Err(format!("JWT_SECRET must be set in {environment} environment").into());
            }
        };

        Ok(Self {
            http_port: parse_or(&lookup, "HTTP_PORT", 8080),
            database_url,
            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10),
            jwt_secret,
            jwt_expiry_hours: parse_or(&lookup, "JWT_EXPIRY_HOURS", 24),
            cookie_secure: parse_or(&lookup, "COOKIE_SECURE", !development),
            cors_origins: lookup("CORS_ORIGINS")
                .map(|s| {
                    s.split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            seed_demo_data: parse_or(&lookup, "SEED_DEMO_DATA", development),
            environment,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> T {
    lookup(name)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn generate_dev_secret() -> String {
    use rand::Rng;
    use rand::distributions::Alphanumeric;
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, BoxError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn test_development_defaults() {
        let config = load(&[]).unwrap();
        assert!(config.is_development());
        assert_eq!(config.http_port, 8080);
        assert!(config.database_url.is_none());
        assert_eq!(config.database_max_connections, 10);
        assert_eq!(config.jwt_expiry_hours, 24);
        assert_eq!(config.jwt_secret.len(), 64);
        assert!(!config.cookie_secure);
        assert!(config.seed_demo_data);
        assert!(config.cors_origins.is_empty());
    }

    #[test]
    fn test_production_requires_database_and_secret() {
        assert!(load(&[("ENVIRONMENT", "production")]).is_err());
        assert!(
            load(&[
                ("ENVIRONMENT", "production"),
                ("DATABASE_URL", "postgres://localhost/market"),
            ])
            .is_err()
        );

        let config = load(&[
            ("ENVIRONMENT", "production"),
            ("DATABASE_URL", "postgres://localhost/market"),
            ("JWT_SECRET", "prod-secret"),
        ])
        .unwrap();
        assert!(config.cookie_secure);
        assert!(!config.seed_demo_data);
    }

    #[test]
    fn test_overrides_and_origin_list() {
        let config = load(&[
            ("HTTP_PORT", "9000"),
            ("JWT_EXPIRY_HOURS", "2"),
            ("COOKIE_SECURE", "true"),
            ("CORS_ORIGINS", "https://a.example, https://b.example,"),
            ("SEED_DEMO_DATA", "false"),
        ])
        .unwrap();
        assert_eq!(config.http_port, 9000);
        assert_eq!(config.jwt_expiry_hours, 2);
        assert!(config.cookie_secure);
        assert!(!config.seed_demo_data);
        assert_eq!(
            config.cors_origins,
            vec!["https://a.example", "https://b.example"]
        );
    }

    #[test]
    fn test_unparsable_value_falls_back() {
        let config = load(&[("HTTP_PORT", "eighty")]).unwrap();
        assert_eq!(config.http_port, 8080);
    }
}
