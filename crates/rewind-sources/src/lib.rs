//! # rewind-sources
//!
//! Concrete record sources.
//!
//! - [`file`]: [`FileReplaySource`], historical records from a local NDJSON
//!   store laid out as `<root>/<exchange>/<channel>/<symbol>.ndjson`
//! - [`relay`]: [`UpstreamRelay`], live records relayed from venue
//!   WebSocket APIs with reconnect backoff

#![deny(unsafe_code)]

pub mod file;
pub mod relay;

pub use file::FileReplaySource;
pub use relay::UpstreamRelay;
