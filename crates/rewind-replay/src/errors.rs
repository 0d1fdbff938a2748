//! Replay error taxonomy and WebSocket close codes.

use rewind_core::{SourceError, WindowError};
use rewind_mappers::MappingError;
use thiserror::Error;

/// WebSocket close codes used by the gateway.
pub mod close_code {
    /// Replay or stream completed.
    pub const NORMAL: u16 = 1000;
    /// The server is shutting down.
    pub const GOING_AWAY: u16 = 1001;
    /// Client could not keep up with a live stream.
    pub const POLICY_VIOLATION: u16 = 1008;
    /// Any other abnormal termination; the reason names the error.
    pub const INTERNAL_ERROR: u16 = 1011;
}

/// Close frame reasons may not exceed 123 bytes.
pub const MAX_REASON_BYTES: usize = 123;

/// Reason sent when a synchronized or single replay completes.
pub const REPLAY_FINISHED: &str = "WS replay finished";

/// How a transport is told to terminate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Closure {
    /// WebSocket close code.
    pub code: u16,
    /// Human-readable reason, truncated to [`MAX_REASON_BYTES`].
    pub reason: String,
}

impl Closure {
    /// Build a closure, truncating the reason at a character boundary.
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        let mut reason = reason.into();
        if reason.len() > MAX_REASON_BYTES {
            let mut end = MAX_REASON_BYTES;
            while !reason.is_char_boundary(end) {
                end -= 1;
            }
            reason.truncate(end);
        }
        Self { code, reason }
    }

    /// Normal completion.
    pub fn normal(reason: impl Into<String>) -> Self {
        Self::new(close_code::NORMAL, reason)
    }

    /// Whether this closure reports an error.
    pub fn is_error(&self) -> bool {
        self.code != close_code::NORMAL
    }
}

/// Errors raised while registering, mapping or driving a replay.
#[derive(Debug, Error)]
pub enum ReplayError {
    /// A control message was recognized but could not be translated.
    #[error("invalid subscribe message: {0}")]
    Mapping(#[from] MappingError),
    /// A connection reached session start without any subscription.
    #[error("No subscriptions received for websocket connection {connection} ({window})")]
    NoSubscriptions {
        /// Connection identifier.
        connection: String,
        /// Venue and window the connection requested.
        window: String,
    },
    /// The data source failed.
    #[error(transparent)]
    Source(#[from] SourceError),
    /// The client transport faulted.
    #[error("transport error: {0}")]
    Transport(String),
    /// A connection arrived after its session started.
    #[error("trying to add new WS connection to replay session that already started")]
    LateJoin,
    /// No subscription mapper exists for the venue.
    #[error(
        "Exchange {exchange} is not supported via {route} Websocket API, please use HTTP streaming API instead."
    )]
    UnsupportedExchange {
        /// Requested venue.
        exchange: String,
        /// Route the client used.
        route: &'static str,
    },
    /// Request parameters were unusable.
    #[error("invalid options: {0}")]
    InvalidOptions(String),
    /// The replay window was invalid.
    #[error(transparent)]
    Window(#[from] WindowError),
    /// A live client stayed backpressured past the retry budget.
    #[error("Too much backpressure")]
    TooMuchBackpressure,
    /// A live upstream kept failing.
    #[error("Too many subsequent errors when connecting to {0} WS API")]
    TooManyErrors(String),
}

impl ReplayError {
    /// Close code and reason reported to the client for this error.
    pub fn closure(&self) -> Closure {
        match self {
            Self::TooMuchBackpressure => {
                Closure::new(close_code::POLICY_VIOLATION, self.to_string())
            }
            _ => Closure::new(close_code::INTERNAL_ERROR, self.to_string()),
        }
    }
}

/// Result type for replay operations.
pub type Result<T> = std::result::Result<T, ReplayError>;
