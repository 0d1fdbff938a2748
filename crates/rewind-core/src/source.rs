//! Data source boundaries.
//!
//! Sources hand back lazy streams and stop when the stream is dropped.

use std::pin::Pin;

use futures::Stream;
use serde_json::Value;

use crate::errors::SourceError;
use crate::filter::Filter;
use crate::record::Record;
use crate::window::ReplayWindow;

/// Lazy, ordered sequence of records.
pub type RecordStream = Pin<Box<dyn Stream<Item = Result<Record, SourceError>> + Send>>;

/// What to replay.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplayRequest {
    /// Venue and range.
    pub window: ReplayWindow,
    /// Channels and symbols to include. Empty selects everything.
    pub filters: Vec<Filter>,
}

impl ReplayRequest {
    /// Create a request.
    pub fn new(window: ReplayWindow, filters: Vec<Filter>) -> Self {
        Self { window, filters }
    }
}

/// Historical data provider.
pub trait ReplaySource: Send + Sync + 'static {
    /// Open a stream of records in `localTimestamp` order.
    ///
    /// An `Err` item ends the stream abnormally; nothing follows it.
    fn open(&self, request: &ReplayRequest) -> RecordStream;
}

/// What to stream live.
#[derive(Clone, Debug, PartialEq)]
pub struct LiveRequest {
    /// Venue identifier.
    pub exchange: String,
    /// Native subscribe messages to forward upstream.
    pub subscriptions: Vec<Value>,
    /// Canonical filters the subscriptions map to.
    pub filters: Vec<Filter>,
}

/// Real-time data provider.
pub trait LiveSource: Send + Sync + 'static {
    /// Open a stream of records in arrival order.
    ///
    /// Transient failures are reported as `Err` items; a live stream may keep
    /// yielding after one.
    fn stream(&self, request: &LiveRequest) -> RecordStream;
}
