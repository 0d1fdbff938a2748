//! Upbit: `[{"ticket":"x"},{"type":"trade","codes":["KRW-BTC"]},{"format":"SIMPLE"}]`.

use chrono::{DateTime, Utc};
use rewind_core::Filter;
use serde_json::Value;

use crate::errors::Result;
use crate::json::{filter, opt_str, symbols_field};
use crate::mapper::SubscriptionMapper;

/// Upbit. The subscribe request is a JSON array; only typed entries subscribe.
pub struct Upbit;

impl SubscriptionMapper for Upbit {
    fn can_handle(&self, message: &Value, _: DateTime<Utc>) -> bool {
        message.is_array()
    }

    fn map(&self, message: &Value, _: DateTime<Utc>) -> Result<Vec<Filter>> {
        message
            .as_array()
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .filter_map(|entry| opt_str(entry, "type").map(|t| (t, entry)))
            .map(|(channel, entry)| Ok(filter(channel, symbols_field(entry, "codes")?)))
            .collect()
    }
}
