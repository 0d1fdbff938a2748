//! Route handlers.
//!
//! - [`http`]: NDJSON replay over a chunked response
//! - [`ws`]: the three WebSocket surfaces
//! - [`status`]: health, metrics and the BitMEX help document

pub mod http;
pub mod status;
pub mod ws;

use serde::Deserialize;

/// `?options=<json>` as used by `/replay`, `/ws-replay-combined` and
/// `/ws-stream`.
#[derive(Debug, Default, Deserialize)]
pub struct OptionsQuery {
    /// JSON document: one options object or an array of them.
    pub options: Option<String>,
}

/// Query of `/ws-replay`.
#[derive(Debug, Default, Deserialize)]
pub struct ReplayQuery {
    /// Venue identifier.
    pub exchange: Option<String>,
    /// Window start.
    pub from: Option<String>,
    /// Window end.
    pub to: Option<String>,
    /// Optional explicit session name shared by cooperating clients.
    pub session: Option<String>,
}
