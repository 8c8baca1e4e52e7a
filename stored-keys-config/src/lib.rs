//! Configuration management for stored-keys backends

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Environment prefix used by [`StoreConfig::from_env`]
pub const ENV_PREFIX: &str = "STORED_KEYS";

/// Backend named in configuration that no constructor exists for
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown stored key backend: {0}")]
pub struct UnknownBackend(pub String);

/// Stored key backends that can be selected by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Process-local map, lost on exit
    Memory,
    /// Relational store reached through sqlx's SQLite driver
    Sqlite,
}

impl BackendKind {
    pub const ALL: [BackendKind; 2] = [BackendKind::Memory, BackendKind::Sqlite];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Memory => "memory",
            BackendKind::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = UnknownBackend;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(BackendKind::Memory),
            "sqlite" | "sql" => Ok(BackendKind::Sqlite),
            _ => Err(UnknownBackend(s.to_string())),
        }
    }
}

/// Stored key service configuration
///
/// Key-encryption keys are deliberately absent: they are supplied per call
/// and never stored next to the envelopes they protect.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Backend name, see [`BackendKind`]
    pub backend: String,
    /// Connection URL for the SQL backend
    pub database_url: String,
    /// Upper bound on pooled SQL connections
    pub max_connections: u32,
    /// How long a SQL call may wait for a pooled connection
    pub acquire_timeout_secs: u64,
    pub log_level: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::memory()
    }
}

impl StoreConfig {
    /// In-memory backend with default settings
    pub fn memory() -> Self {
        Self {
            backend: BackendKind::Memory.to_string(),
            database_url: "sqlite::memory:".to_string(),
            max_connections: 5,
            acquire_timeout_secs: 30,
            log_level: "info".to_string(),
        }
    }

    /// SQL backend at `database_url`
    pub fn sqlite(database_url: impl Into<String>) -> Self {
        Self {
            backend: BackendKind::Sqlite.to_string(),
            database_url: database_url.into(),
            ..Self::memory()
        }
    }

    /// Load configuration from `.env` and `STORED_KEYS_*` environment variables
    pub fn from_env() -> Result<Self, config::ConfigError> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();
        Self::from_env_prefix(ENV_PREFIX)
    }

    /// Load configuration from `<prefix>_*` environment variables only
    pub fn from_env_prefix(prefix: &str) -> Result<Self, config::ConfigError> {
        let defaults = Self::memory();

        config::Config::builder()
            .set_default("backend", defaults.backend)?
            .set_default("database_url", defaults.database_url)?
            .set_default("max_connections", i64::from(defaults.max_connections))?
            .set_default("acquire_timeout_secs", defaults.acquire_timeout_secs as i64)?
            .set_default("log_level", defaults.log_level)?
            .add_source(config::Environment::with_prefix(prefix).try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Parsed backend selection
    pub fn backend_kind(&self) -> Result<BackendKind, UnknownBackend> {
        self.backend.parse()
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    /// Get log level, defaulting to "info"
    pub fn log_level(&self) -> &str {
        if self.log_level.is_empty() {
            "info"
        } else {
            &self.log_level
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.backend_kind(), Ok(BackendKind::Memory));
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.acquire_timeout(), Duration::from_secs(30));
        assert_eq!(config.log_level(), "info");
    }

    #[test]
    fn test_backend_kind_parsing() {
        assert_eq!("memory".parse(), Ok(BackendKind::Memory));
        assert_eq!(" SQLite ".parse(), Ok(BackendKind::Sqlite));
        assert_eq!(
            "postgres".parse::<BackendKind>(),
            Err(UnknownBackend("postgres".to_string()))
        );

        for kind in BackendKind::ALL {
            assert_eq!(kind.as_str().parse(), Ok(kind));
        }
    }

    #[test]
    fn test_sqlite_constructor_keeps_defaults() {
        let config = StoreConfig::sqlite("sqlite://keys.db");
        assert_eq!(config.backend_kind(), Ok(BackendKind::Sqlite));
        assert_eq!(config.database_url, "sqlite://keys.db");
        assert_eq!(config.max_connections, 5);
    }

    #[test]
    fn test_from_env_prefix_defaults() {
        // Prefix nothing else sets
        let config = StoreConfig::from_env_prefix("STORED_KEYS_TEST_EMPTY").unwrap();
        assert_eq!(config.backend, "memory");
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.max_connections, 5);
    }

    #[test]
    fn test_from_env_prefix_overrides() {
        std::env::set_var("STORED_KEYS_TEST_SET_BACKEND", "sqlite");
        std::env::set_var("STORED_KEYS_TEST_SET_DATABASE_URL", "sqlite://override.db");
        std::env::set_var("STORED_KEYS_TEST_SET_MAX_CONNECTIONS", "2");

        let config = StoreConfig::from_env_prefix("STORED_KEYS_TEST_SET").unwrap();

        std::env::remove_var("STORED_KEYS_TEST_SET_BACKEND");
        std::env::remove_var("STORED_KEYS_TEST_SET_DATABASE_URL");
        std::env::remove_var("STORED_KEYS_TEST_SET_MAX_CONNECTIONS");

        assert_eq!(config.backend_kind(), Ok(BackendKind::Sqlite));
        assert_eq!(config.database_url, "sqlite://override.db");
        assert_eq!(config.max_connections, 2);
        assert_eq!(config.acquire_timeout_secs, 30);
    }
}
