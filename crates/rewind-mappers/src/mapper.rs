//! The mapper capability.

use chrono::{DateTime, Utc};
use rewind_core::Filter;
use serde_json::Value;

use crate::errors::Result;

/// Translates one venue's subscribe protocol into canonical filters.
///
/// `window_start` is the start of the replay window. Venues that changed
/// their subscribe schema branch on it so old windows accept the old schema.
pub trait SubscriptionMapper: Send + Sync {
    /// Whether `message` is a subscribe request in this venue's protocol.
    ///
    /// Must be side-effect free and total over any JSON input.
    fn can_handle(&self, message: &Value, window_start: DateTime<Utc>) -> bool;

    /// Filters requested by `message`. Only called when
    /// [`can_handle`](Self::can_handle) returned `true`.
    fn map(&self, message: &Value, window_start: DateTime<Utc>) -> Result<Vec<Filter>>;
}
