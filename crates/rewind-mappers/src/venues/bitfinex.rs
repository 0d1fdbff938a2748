//! Bitfinex.

use chrono::{DateTime, Utc};
use rewind_core::Filter;
use serde_json::Value;

use crate::errors::Result;
use crate::mapper::SubscriptionMapper;

/// Bitfinex and Bitfinex derivatives. Channel ids are assigned by the venue,
/// so any message counts as a subscription to the full recorded feed.
pub struct Bitfinex;

impl SubscriptionMapper for Bitfinex {
    fn can_handle(&self, _: &Value, _: DateTime<Utc>) -> bool {
        true
    }

    fn map(&self, _: &Value, _: DateTime<Utc>) -> Result<Vec<Filter>> {
        Ok(Vec::new())
    }
}
