//! Environment configuration

use std::time::Duration;
use thiserror::Error;

use crate::pixel::DispatchTiming;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Postgres document store; `None` keeps documents in memory.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    /// Order events are published when set.
    pub nats_url: Option<String>,
    pub port: u16,
    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    pub log_filter: String,
    pub pixel_timing: DispatchTiming,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

impl AppConfig {
    /// Load `.env` if present, then read the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key))
    }

    /// Build from any env-var lookup, so tests can pass a plain map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        let optional = |var: &str| lookup(var).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let or_default = |var: &str, default: &str| optional(var).unwrap_or_else(|| default.to_string());
        let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
            or_default(var, default).parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
        };

        let port = or_default("PORT", "8083").parse::<u16>().map_err(|e| ConfigError::InvalidEnvVar {
            var: "PORT".to_string(),
            reason: e.to_string(),
        })?;
        let db_max_connections = u32::try_from(parse_u64("STOREFRONT_DB_MAX_CONNECTIONS", "10")?).map_err(|e| {
            ConfigError::InvalidEnvVar { var: "STOREFRONT_DB_MAX_CONNECTIONS".to_string(), reason: e.to_string() }
        })?;

        Ok(Self {
            database_url: optional("DATABASE_URL"),
            db_max_connections,
            nats_url: optional("NATS_URL"),
            port,
            log_filter: or_default("STOREFRONT_LOG", "info"),
            pixel_timing: DispatchTiming {
                platform_delay: Duration::from_millis(parse_u64("STOREFRONT_PIXEL_DELAY_MS", "300")?),
                event_delay: Duration::from_millis(parse_u64("STOREFRONT_PIXEL_EVENT_DELAY_MS", "600")?),
            },
        })
    }
}
