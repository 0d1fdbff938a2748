//! Defaults shared across crates.

/// Crate version reported by `/health`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default HTTP/WebSocket listen port.
pub const DEFAULT_PORT: u16 = 8000;

/// Grace period before a pending replay session starts.
pub const SESSION_START_DELAY_MS: u64 = 2000;

/// Records per batch on the single-connection replay path.
pub const FAST_PATH_BATCH_SIZE: usize = 10;

/// Backpressure poll interval for replay delivery.
pub const REPLAY_BACKPRESSURE_POLL_MS: u64 = 30;

/// Poll interval while waiting for a buffer to drain before a normal close.
pub const CLOSE_DRAIN_POLL_MS: u64 = 100;

/// NDJSON lines per write on the HTTP replay route.
pub const HTTP_BATCH_SIZE: usize = 32;

/// Backpressure poll interval for live streaming.
pub const STREAM_BACKPRESSURE_POLL_MS: u64 = 20;

/// Backpressure polls tolerated in live streaming before the client is dropped.
pub const MAX_BACKPRESSURE_RETRIES: u32 = 2000;

/// Consecutive upstream errors tolerated per live venue.
pub const MAX_SUBSEQUENT_ERRORS: u32 = 50;

/// Default outbound buffer high-water mark per transport (1 MiB).
pub const DEFAULT_MAX_BUFFERED_BYTES: usize = 1024 * 1024;
