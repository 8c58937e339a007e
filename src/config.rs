//! Gateway configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`).
//!
//! | Variable                  | Default        |
//! |---------------------------|----------------|
//! | `LISTEN_ADDR`             | `0.0.0.0:4000` |
//! | `WS_PATH`                 | `/graphql`     |
//! | `KEEP_ALIVE_INTERVAL_MS`  | `30000` (0 = off) |
//! | `OUTBOUND_QUEUE_CAPACITY` | `256`          |
//! | `LOG_FORMAT`              | `text`         |

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::error::GatewayError;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl FromStr for LogFormat {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(GatewayError::InvalidConfig(format!(
                "LOG_FORMAT must be text or json, got {other:?}"
            ))),
        }
    }
}

/// Top-level gateway configuration.
///
/// Loaded once at startup via [`GatewayConfig::from_env`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Socket address to bind the HTTP server to.
    pub listen_addr: SocketAddr,

    /// Route serving the graphql-ws endpoint.
    pub ws_path: String,

    /// Milliseconds between keep-alive frames (0 disables).
    pub keep_alive_interval_ms: u64,

    /// Frames buffered per connection before delivery reports failure.
    pub outbound_queue_capacity: usize,

    /// Log output format.
    pub log_format: LogFormat,
}

impl GatewayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidConfig`] if `LISTEN_ADDR`, `WS_PATH`
    /// or `LOG_FORMAT` is set to an invalid value.
    pub fn from_env() -> Result<Self, GatewayError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`GatewayConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, GatewayError> {
        let listen_addr = lookup("LISTEN_ADDR")
            .unwrap_or_else(|| "0.0.0.0:4000".to_string())
            .parse::<SocketAddr>()
            .map_err(|e| GatewayError::InvalidConfig(format!("LISTEN_ADDR: {e}")))?;

        let ws_path = lookup("WS_PATH").unwrap_or_else(|| "/graphql".to_string());
        if !ws_path.starts_with('/') {
            return Err(GatewayError::InvalidConfig(format!(
                "WS_PATH must start with '/', got {ws_path:?}"
            )));
        }

        let keep_alive_interval_ms = parse_or(&lookup, "KEEP_ALIVE_INTERVAL_MS", 30_000);
        let outbound_queue_capacity = parse_or(&lookup, "OUTBOUND_QUEUE_CAPACITY", 256);
        let log_format = lookup("LOG_FORMAT")
            .map(|v| v.parse::<LogFormat>())
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            listen_addr,
            ws_path,
            keep_alive_interval_ms,
            outbound_queue_capacity,
            log_format,
        })
    }

    /// Keep-alive period, `None` when disabled.
    #[must_use]
    pub fn keep_alive(&self) -> Option<Duration> {
        (self.keep_alive_interval_ms > 0).then(|| Duration::from_millis(self.keep_alive_interval_ms))
    }
}

/// Parses `key` as `T`, returning `default` on missing or invalid values.
fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    lookup(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
