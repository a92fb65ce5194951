//! Process configuration from environment variables.

use std::net::SocketAddr;

use thiserror::Error;

pub const BIND_ADDR_VAR: &str = "SERVICEGATE_BIND_ADDR";
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Error)]
pub enum ApiConfigError {
    #[error("SERVICEGATE_BIND_ADDR is not a valid socket address: {0}")]
    InvalidBindAddr(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    /// Postgres connection string; without it tenant lookups run against an
    /// empty in-memory executor (dev only).
    pub database_url: Option<String>,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ApiConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ApiConfigError> {
        let raw_addr = lookup(BIND_ADDR_VAR).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = raw_addr
            .parse()
            .map_err(|_| ApiConfigError::InvalidBindAddr(raw_addr.clone()))?;

        let database_url = lookup(DATABASE_URL_VAR).filter(|url| !url.trim().is_empty());

        Ok(Self {
            bind_addr,
            database_url,
        })
    }
}
