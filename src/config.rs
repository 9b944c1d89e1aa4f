use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

pub const HTTP_ADDR_VAR: &str = "SCHEDULE_STORE_HTTP_ADDR";
pub const DATABASE_VAR: &str = "SCHEDULE_STORE_DATABASE";

const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_DATABASE: &str = "schedules.db";
const IN_MEMORY: &str = ":memory:";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} must be a socket address like 127.0.0.1:3000 (got '{value}')")]
    InvalidAddr { var: &'static str, value: String },

    #[error("{var} must not be empty")]
    EmptyDatabase { var: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    InMemory,
    File(PathBuf),
}

impl DatabaseLocation {
    pub fn open(&self) -> crate::StoreResult<crate::Database> {
        match self {
            DatabaseLocation::InMemory => crate::Database::open_in_memory(),
            DatabaseLocation::File(path) => crate::Database::open(path),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub http_addr: SocketAddr,
    pub database: DatabaseLocation,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let addr = lookup(HTTP_ADDR_VAR).unwrap_or_else(|| DEFAULT_HTTP_ADDR.to_string());
        let http_addr = addr.trim().parse().map_err(|_| ConfigError::InvalidAddr {
            var: HTTP_ADDR_VAR,
            value: addr.clone(),
        })?;

        let database = match lookup(DATABASE_VAR) {
            None => DatabaseLocation::File(PathBuf::from(DEFAULT_DATABASE)),
            Some(value) if value.trim().is_empty() => {
                return Err(ConfigError::EmptyDatabase { var: DATABASE_VAR });
            }
            Some(value) if value.trim() == IN_MEMORY => DatabaseLocation::InMemory,
            Some(value) => DatabaseLocation::File(PathBuf::from(value.trim())),
        };

        Ok(Self {
            http_addr,
            database,
        })
    }
}
