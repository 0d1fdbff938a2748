//! Error types for windows and replay sources.

use chrono::{DateTime, Utc};

/// Failure parsing or validating a replay window.
#[derive(Debug, thiserror::Error)]
pub enum WindowError {
    /// No venue was given.
    #[error("exchange must be provided")]
    MissingExchange,
    /// A timestamp could not be parsed.
    #[error("invalid timestamp '{0}', expected ISO 8601 date or date-time")]
    InvalidTimestamp(String),
    /// `from` is not strictly before `to`.
    #[error("invalid replay window: from ({from}) must be before to ({to})")]
    Empty {
        /// Requested start.
        from: DateTime<Utc>,
        /// Requested end.
        to: DateTime<Utc>,
    },
}

/// Failure surfaced by a replay or live data source.
///
/// A source reports these by ending its stream with an `Err` item; records
/// are never emitted after an error.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The request was rejected before any data was read.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// The source refused access.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// No data exists for the requested venue or channel.
    #[error("not found: {0}")]
    NotFound(String),
    /// Local I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A stored or received record could not be decoded.
    #[error("failed to decode {location}: {reason}")]
    Decode {
        /// File and line, or upstream URL.
        location: String,
        /// What was wrong with it.
        reason: String,
    },
    /// An upstream connection failed.
    #[error("upstream error: {0}")]
    Upstream(String),
}

impl SourceError {
    /// HTTP status code for this error when it is reported before streaming.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidRequest(_) => 400,
            Self::Unauthorized(_) => 401,
            Self::NotFound(_) => 404,
            Self::Io(_) | Self::Decode { .. } | Self::Upstream(_) => 500,
        }
    }
}

impl From<WindowError> for SourceError {
    fn from(err: WindowError) -> Self {
        Self::InvalidRequest(err.to_string())
    }
}
