//! Mapping errors.

use thiserror::Error;

/// A subscribe message that a mapper accepted but could not translate.
///
/// Callers treat these as noise: the message is dropped and logged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    /// A required field is absent or null.
    #[error("missing field '{0}'")]
    MissingField(String),
    /// A field has the wrong JSON type.
    #[error("field '{field}' must be {expected}")]
    InvalidField {
        /// Field name.
        field: String,
        /// Expected JSON shape.
        expected: &'static str,
    },
    /// The venue has no mapping for this channel or method.
    #[error("unknown {venue} channel '{channel}'")]
    UnknownChannel {
        /// Venue the mapper serves.
        venue: &'static str,
        /// Channel as sent by the client.
        channel: String,
    },
    /// A string field does not have the expected structure.
    #[error("malformed {what} '{value}'")]
    Malformed {
        /// What was being parsed.
        what: &'static str,
        /// The offending value.
        value: String,
    },
}

/// Result type for mapping operations.
pub type Result<T> = std::result::Result<T, MappingError>;
