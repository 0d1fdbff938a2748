//! # rewind-core
//!
//! Shared vocabulary for the replay gateway:
//!
//! - [`window`]: replay windows and timestamp parsing
//! - [`filter`]: canonical `{channel, symbols}` subscription filters
//! - [`record`]: timestamped raw records and their wire framings
//! - [`source`]: the [`ReplaySource`](source::ReplaySource) and
//!   [`LiveSource`](source::LiveSource) collaborator boundaries
//! - [`options`]: request options accepted by the HTTP and WebSocket routes
//! - [`merge`]: k-way merge of record streams by local timestamp
//! - [`retry`]: reconnect backoff math
//! - [`logging`]: `tracing` subscriber setup

#![deny(unsafe_code)]

pub mod constants;
pub mod errors;
pub mod filter;
pub mod logging;
pub mod merge;
pub mod options;
pub mod record;
pub mod retry;
pub mod source;
pub mod window;

pub use errors::{SourceError, WindowError};
pub use filter::Filter;
pub use record::Record;
pub use source::{LiveRequest, LiveSource, RecordStream, ReplayRequest, ReplaySource};
pub use window::ReplayWindow;
