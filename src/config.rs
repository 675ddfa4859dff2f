use crate::domain::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    /// Seeds the runtime setting on first start; a stored value wins.
    pub default_rolling_commission_rate: Decimal,
    /// Zero disables the scheduled reconciliation job.
    pub reconcile_interval_secs: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let default_rolling_commission_rate = env_map
            .get("DEFAULT_ROLLING_COMMISSION_RATE")
            .map(|s| s.as_str())
            .unwrap_or("0.014");
        let default_rolling_commission_rate = Decimal::from_str(default_rolling_commission_rate)
            .ok()
            .filter(|rate| !rate.is_negative() && *rate < Decimal::from(1i64))
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "DEFAULT_ROLLING_COMMISSION_RATE".to_string(),
                    format!(
                        "must be a decimal fraction in [0, 1), got {}",
                        default_rolling_commission_rate
                    ),
                )
            })?;

        let reconcile_interval_secs = env_map
            .get("RECONCILE_INTERVAL_SECS")
            .map(|s| s.as_str())
            .unwrap_or("0")
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "RECONCILE_INTERVAL_SECS".to_string(),
                    "must be a non-negative integer".to_string(),
                )
            })?;

        Ok(Config {
            port,
            database_path,
            default_rolling_commission_rate,
            reconcile_interval_secs,
        })
    }
}
