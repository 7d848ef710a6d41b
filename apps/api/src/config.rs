//! API server configuration.
//!
//! Configuration is loaded from environment variables with fallback to
//! defaults.

use std::env;

use duka_core::LoyaltyPolicy;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// HTTP listen port.
    pub http_port: u16,

    /// Path to the SQLite database file.
    pub database_path: String,

    /// Loyalty accrual/redemption policy.
    pub loyalty_policy: LoyaltyPolicy,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let config = ApiConfig {
            http_port: env::var("HTTP_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("HTTP_PORT".to_string()))?,

            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "duka.db".to_string()),

            loyalty_policy: LoyaltyPolicy {
                points_per_unit: env::var("LOYALTY_POINTS_PER_UNIT")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .map_err(|_| {
                        ConfigError::InvalidValue("LOYALTY_POINTS_PER_UNIT".to_string())
                    })?,
                min_redeem_increment: env::var("LOYALTY_MIN_REDEEM_INCREMENT")
                    .unwrap_or_else(|_| "100".to_string())
                    .parse()
                    .map_err(|_| {
                        ConfigError::InvalidValue("LOYALTY_MIN_REDEEM_INCREMENT".to_string())
                    })?,
                ..LoyaltyPolicy::default()
            },
        };

        Ok(config)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}
