//! Runtime configuration read from environment variables.
//!
//! | variable                   | default        |
//! |----------------------------|----------------|
//! | `BIND_ADDR`                | `0.0.0.0:8080` |
//! | `DATABASE_URL`             | unset: in-memory store |
//! | `DATABASE_MAX_CONNECTIONS` | `5`            |
//! | `DEFAULT_SEGMENT`          | `fabric`       |

use std::net::SocketAddr;

use thiserror::Error;

use loomerp_core::Segment;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// `None` selects the in-memory store.
    pub database: Option<DatabaseConfig>,
    /// Segment used when a request does not name one.
    pub default_segment: Segment,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_addr = match get("BIND_ADDR") {
            Some(raw) => raw.parse().map_err(|e| ConfigError::Invalid {
                key: "BIND_ADDR",
                message: format!("{e}"),
            })?,
            None => SocketAddr::from(([0, 0, 0, 0], 8080)),
        };

        let max_connections = match get("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => match raw.parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "DATABASE_MAX_CONNECTIONS",
                        message: format!("expected a positive integer, got {raw:?}"),
                    });
                }
            },
            None => 5,
        };

        let database = get("DATABASE_URL").map(|url| DatabaseConfig {
            url,
            max_connections,
        });

        let default_segment = match get("DEFAULT_SEGMENT") {
            Some(raw) => Segment::new(raw).map_err(|e| ConfigError::Invalid {
                key: "DEFAULT_SEGMENT",
                message: e.to_string(),
            })?,
            None => Segment::default(),
        };

        Ok(Self {
            bind_addr,
            database,
            default_segment,
        })
    }
}
