//! Service configuration loaded from environment variables.

use std::time::Duration;

use storage::PostgresConfig;

/// Default listen port of the booking service.
pub const BOOKING_SERVICE_PORT: u16 = 5150;

/// Default listen port of the payment service.
pub const PAYMENT_SERVICE_PORT: u16 = 5200;

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Service configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default depends on the service)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `json` for JSON lines, anything else for text
/// - `DATABASE_URL`: Postgres URL; unset runs on the seeded in-memory store
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: `10`)
/// - `STORAGE_TIMEOUT_MS`: pool acquire and statement bound (default: `5000`)
/// - `OUTBOUND_TIMEOUT_MS`: bound on calls to other services (default: `10000`)
/// - `BOOKING_SERVICE_URL`, `USER_SERVICE_URL`, `NOTIFICATION_URL`: remote
///   collaborators of the payment service; unset uses the in-process one
/// - `CORS_ALLOW_ORIGIN`: allowed origin (default: any)
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub storage_timeout: Duration,
    pub outbound_timeout: Duration,
    pub booking_service_url: Option<String>,
    pub user_service_url: Option<String>,
    pub notification_url: Option<String>,
    pub cors_allow_origin: Option<String>,
}

impl Config {
    /// Returns the defaults for a service listening on `port`.
    pub fn defaults(port: u16) -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            database_max_connections: 10,
            storage_timeout: Duration::from_millis(5_000),
            outbound_timeout: Duration::from_millis(10_000),
            booking_service_url: None,
            user_service_url: None,
            notification_url: None,
            cors_allow_origin: None,
        }
    }

    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env(default_port: u16) -> Self {
        Self::from_lookup(default_port, |key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    pub fn from_lookup(default_port: u16, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::defaults(default_port);
        let text = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let millis = |key: &str, default: Duration| {
            text(key)
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(default)
        };

        Self {
            host: text("HOST").unwrap_or(defaults.host),
            port: text("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: text("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: match text("LOG_FORMAT") {
                Some(format) if format.eq_ignore_ascii_case("json") => LogFormat::Json,
                _ => LogFormat::Text,
            },
            database_url: text("DATABASE_URL"),
            database_max_connections: text("DATABASE_MAX_CONNECTIONS")
                .and_then(|v| v.parse().ok())
                .filter(|&n| n > 0)
                .unwrap_or(defaults.database_max_connections),
            storage_timeout: millis("STORAGE_TIMEOUT_MS", defaults.storage_timeout),
            outbound_timeout: millis("OUTBOUND_TIMEOUT_MS", defaults.outbound_timeout),
            booking_service_url: text("BOOKING_SERVICE_URL"),
            user_service_url: text("USER_SERVICE_URL"),
            notification_url: text("NOTIFICATION_URL"),
            cors_allow_origin: text("CORS_ALLOW_ORIGIN"),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the Postgres settings, or None to run on the in-memory store.
    pub fn postgres(&self) -> Option<PostgresConfig> {
        self.database_url.as_ref().map(|url| PostgresConfig {
            url: url.clone(),
            max_connections: self.database_max_connections,
            acquire_timeout: self.storage_timeout,
            statement_timeout: self.storage_timeout,
        })
    }

    /// True when bookings are reserved in a remote service while payments
    /// stay in this process's in-memory store. Reconciliation then cannot
    /// see the bookings it compares against.
    pub fn splits_booking_store(&self) -> bool {
        self.booking_service_url.is_some() && self.database_url.is_none()
    }
}
