//! Service configuration loaded from environment variables.

use std::time::Duration;

/// Port of the inventory service when `PORT` is unset.
pub const INVENTORY_PORT: u16 = 3001;

/// Port of the order service when `PORT` is unset.
pub const ORDER_PORT: u16 = 3000;

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Configuration shared by both services, with defaults for every value.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default `"0.0.0.0"`)
/// - `PORT`: listen port (default depends on the service)
/// - `RUST_LOG`: tracing filter directive (default `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default `text`)
/// - `DATABASE_URL`: PostgreSQL; in-memory repositories when unset
/// - `REDIS_URL`: lock authority; in-memory locks when unset
/// - `LOCK_TTL_MS`: product lock TTL (default 5000)
/// - `INVENTORY_URL`: ledger base URL for the order service; in-process ledger when unset
/// - `LEDGER_TIMEOUT_MS`: per-call ledger timeout (default 3000)
/// - `STATUS_WRITE_ATTEMPTS`: order writes after a ledger step (default 3)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    pub lock_ttl: Duration,
    pub inventory_url: Option<String>,
    pub ledger_timeout: Duration,
    pub status_write_attempts: u32,
}

impl Config {
    /// Loads configuration from the process environment.
    pub fn from_env(default_port: u16) -> Self {
        Self::from_lookup(default_port, |key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, falling back to defaults for
    /// missing or unparsable values.
    pub fn from_lookup(default_port: u16, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::with_port(default_port);
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let millis = |key: &str, default: Duration| {
            non_empty(key)
                .and_then(|v| v.parse().ok())
                .map_or(default, Duration::from_millis)
        };

        Self {
            host: non_empty("HOST").unwrap_or(defaults.host),
            port: non_empty("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: non_empty("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: match non_empty("LOG_FORMAT") {
                Some(format) if format.eq_ignore_ascii_case("json") => LogFormat::Json,
                _ => LogFormat::Text,
            },
            database_url: non_empty("DATABASE_URL"),
            redis_url: non_empty("REDIS_URL"),
            lock_ttl: millis("LOCK_TTL_MS", defaults.lock_ttl),
            inventory_url: non_empty("INVENTORY_URL"),
            ledger_timeout: millis("LEDGER_TIMEOUT_MS", defaults.ledger_timeout),
            status_write_attempts: non_empty("STATUS_WRITE_ATTEMPTS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.status_write_attempts),
        }
    }

    /// Defaults with the given port.
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Self::default()
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: ORDER_PORT,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            redis_url: None,
            lock_ttl: inventory::DEFAULT_LOCK_TTL,
            inventory_url: None,
            ledger_timeout: Duration::from_millis(3000),
            status_write_attempts: 3,
        }
    }
}
