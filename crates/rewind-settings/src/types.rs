//! Settings types.
//!
//! All sections serialize in camelCase and every field has a default, so a
//! settings file only needs the keys it changes.

use std::collections::BTreeMap;
use std::path::PathBuf;

use rewind_core::constants;
use rewind_core::retry::Backoff;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RewindSettings {
    /// Listener settings.
    pub server: ServerSettings,
    /// Historical replay tuning.
    pub replay: ReplaySettings,
    /// Live streaming tuning.
    pub stream: StreamSettings,
    /// Local data store.
    pub data: DataSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

impl RewindSettings {
    /// Reject values that would stall or break delivery.
    pub fn validate(&self) -> Result<()> {
        if self.replay.batch_size == 0 {
            return Err(SettingsError::InvalidValue(
                "replay.batchSize must be positive".into(),
            ));
        }
        if self.replay.http_batch_size == 0 {
            return Err(SettingsError::InvalidValue(
                "replay.httpBatchSize must be positive".into(),
            ));
        }
        if self.replay.backpressure_poll_ms == 0 || self.stream.backpressure_poll_ms == 0 {
            return Err(SettingsError::InvalidValue(
                "backpressure poll intervals must be positive".into(),
            ));
        }
        if self.replay.max_buffered_bytes == 0 {
            return Err(SettingsError::InvalidValue(
                "replay.maxBufferedBytes must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// HTTP/WebSocket listener.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Largest inbound WebSocket message accepted, in bytes.
    pub max_message_size: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: constants::DEFAULT_PORT,
            max_message_size: 16 * 1024 * 1024,
        }
    }
}

/// Historical replay delivery.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReplaySettings {
    /// Grace period during which connections coalesce into one session.
    pub session_start_delay_ms: u64,
    /// Records per write on the single-connection path.
    pub batch_size: usize,
    /// Poll interval while a transport is backpressured.
    pub backpressure_poll_ms: u64,
    /// Poll interval while draining before a normal close.
    pub close_drain_poll_ms: u64,
    /// NDJSON lines per write on the HTTP route.
    pub http_batch_size: usize,
    /// Outbound bytes a transport may hold before it reports backpressure.
    pub max_buffered_bytes: usize,
}

impl Default for ReplaySettings {
    fn default() -> Self {
        Self {
            session_start_delay_ms: constants::SESSION_START_DELAY_MS,
            batch_size: constants::FAST_PATH_BATCH_SIZE,
            backpressure_poll_ms: constants::REPLAY_BACKPRESSURE_POLL_MS,
            close_drain_poll_ms: constants::CLOSE_DRAIN_POLL_MS,
            http_batch_size: constants::HTTP_BATCH_SIZE,
            max_buffered_bytes: constants::DEFAULT_MAX_BUFFERED_BYTES,
        }
    }
}

/// Live streaming delivery and upstream connections.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StreamSettings {
    /// Poll interval while a transport is backpressured.
    pub backpressure_poll_ms: u64,
    /// Polls tolerated before the client is closed for backpressure.
    pub max_backpressure_retries: u32,
    /// Consecutive upstream errors tolerated per venue.
    pub max_subsequent_errors: u32,
    /// Upstream reconnect backoff.
    pub reconnect: Backoff,
    /// Upstream WebSocket URL per venue.
    pub endpoints: BTreeMap<String, String>,
}

impl Default for StreamSettings {
    fn default() -> Self {
        let endpoints = [
            ("bitmex", "wss://ws.bitmex.com/realtime"),
            ("deribit", "wss://www.deribit.com/ws/api/v2"),
            ("binance", "wss://stream.binance.com:9443/ws"),
            ("binance-futures", "wss://fstream.binance.com/ws"),
            ("coinbase", "wss://ws-feed.exchange.coinbase.com"),
            ("kraken", "wss://ws.kraken.com"),
            ("bitstamp", "wss://ws.bitstamp.net"),
            ("okex", "wss://ws.okx.com:8443/ws/v5/public"),
            ("bybit", "wss://stream.bybit.com/v5/public/linear"),
            ("bitfinex", "wss://api-pub.bitfinex.com/ws/2"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        Self {
            backpressure_poll_ms: constants::STREAM_BACKPRESSURE_POLL_MS,
            max_backpressure_retries: constants::MAX_BACKPRESSURE_RETRIES,
            max_subsequent_errors: constants::MAX_SUBSEQUENT_ERRORS,
            reconnect: Backoff::default(),
            endpoints,
        }
    }
}

/// Local NDJSON data store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DataSettings {
    /// Root directory, laid out as `<exchange>/<channel>/<symbol>.ndjson`.
    pub data_dir: PathBuf,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            data_dir: std::env::temp_dir().join(".rewind-data"),
        }
    }
}

/// Log output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Minimum level when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn defaults_match_constants() {
        let s = RewindSettings::default();
        assert_eq!(s.server.port, 8000);
        assert_eq!(s.replay.session_start_delay_ms, 2000);
        assert_eq!(s.replay.batch_size, 10);
        assert_eq!(s.replay.backpressure_poll_ms, 30);
        assert_eq!(s.replay.close_drain_poll_ms, 100);
        assert_eq!(s.replay.http_batch_size, 32);
        assert_eq!(s.stream.backpressure_poll_ms, 20);
        assert_eq!(s.stream.max_backpressure_retries, 2000);
        assert_eq!(s.stream.max_subsequent_errors, 50);
        assert_eq!(s.logging.level, "info");
        assert!(s.stream.endpoints.contains_key("bitmex"));
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(RewindSettings::default()).unwrap();
        assert!(json["replay"]["sessionStartDelayMs"].is_number());
        assert!(json["stream"]["maxBackpressureRetries"].is_number());
        assert!(json["data"]["dataDir"].is_string());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let s: RewindSettings =
            serde_json::from_str(r#"{"replay":{"batchSize":25}}"#).unwrap();
        assert_eq!(s.replay.batch_size, 25);
        assert_eq!(s.replay.http_batch_size, 32);
        assert_eq!(s.server.port, 8000);
    }

    #[test]
    fn validate_accepts_defaults() {
        assert!(RewindSettings::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_batch() {
        let mut s = RewindSettings::default();
        s.replay.batch_size = 0;
        assert_matches!(s.validate(), Err(SettingsError::InvalidValue(msg)) if msg.contains("batchSize"));
    }

    #[test]
    fn validate_rejects_zero_poll() {
        let mut s = RewindSettings::default();
        s.stream.backpressure_poll_ms = 0;
        assert!(s.validate().is_err());
    }
}
