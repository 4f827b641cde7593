use std::time::Duration;
use thiserror::Error;

use crate::websockets::SessionConfig;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Server configuration, read from the environment
#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: String,
    /// PostgreSQL connection string; in-memory repositories when unset
    pub database_url: Option<String>,
    /// How long the dispatcher waits on a full watcher queue
    pub send_timeout: Duration,
    pub session: SessionConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = SessionConfig::default();

        let outbound_capacity =
            parse_or(&lookup, "AMA_OUTBOUND_CAPACITY", defaults.outbound_capacity)?;
        if outbound_capacity == 0 {
            return Err(ConfigError::Invalid {
                key: "AMA_OUTBOUND_CAPACITY",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            listen_addr: lookup("AMA_LISTEN_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            send_timeout: Duration::from_millis(parse_or(&lookup, "AMA_SEND_TIMEOUT_MS", 250)?),
            session: SessionConfig {
                outbound_capacity,
                write_timeout: Duration::from_millis(parse_or(
                    &lookup,
                    "AMA_WRITE_TIMEOUT_MS",
                    defaults.write_timeout.as_millis() as u64,
                )?),
            },
        })
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
    }
}
