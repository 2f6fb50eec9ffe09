//! Process configuration read once at startup.

use crate::error::ConfigError;
use crate::model::validate_identifier;
use crate::vault::EncryptionKey;
use std::net::SocketAddr;

pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost/provisioner";
pub const DEFAULT_CATALOG_SCHEMA: &str = "provisioner";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_BODY_LIMIT_BYTES: usize = 1024 * 1024;

#[derive(Clone, Debug)]
pub struct Settings {
    /// Catalog store (PostgreSQL).
    pub database_url: String,
    pub encryption_key: EncryptionKey,
    pub catalog_schema: String,
    pub bind_addr: SocketAddr,
    pub body_limit_bytes: usize,
}

impl Settings {
    /// `DATABASE_URL`, `ENCRYPTION_KEY` (required), `CATALOG_SCHEMA`, `BIND_ADDR`, `BODY_LIMIT_BYTES`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let encryption_key = get("ENCRYPTION_KEY").ok_or(ConfigError::Missing("ENCRYPTION_KEY"))?;
        let encryption_key = EncryptionKey::parse(&encryption_key)?;

        let catalog_schema = get("CATALOG_SCHEMA").unwrap_or_else(|| DEFAULT_CATALOG_SCHEMA.into());
        validate_identifier("schema", &catalog_schema).map_err(|e| ConfigError::Invalid {
            name: "CATALOG_SCHEMA",
            reason: e.to_string(),
        })?;

        let bind_addr = get("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.into())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                name: "BIND_ADDR",
                reason: e.to_string(),
            })?;

        let body_limit_bytes = match get("BODY_LIMIT_BYTES") {
            Some(v) => v.parse::<usize>().map_err(|e| ConfigError::Invalid {
                name: "BODY_LIMIT_BYTES",
                reason: e.to_string(),
            })?,
            None => DEFAULT_BODY_LIMIT_BYTES,
        };

        Ok(Settings {
            database_url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.into()),
            encryption_key,
            catalog_schema,
            bind_addr,
            body_limit_bytes,
        })
    }
}
