//! BitMEX: `{"op": "subscribe", "args": ["trade:XBTUSD", "instrument"]}`.

use chrono::{DateTime, Utc};
use rewind_core::Filter;
use serde_json::Value;

use crate::errors::Result;
use crate::json::{field, has_str, single, string_list};
use crate::mapper::SubscriptionMapper;

/// BitMEX realtime API.
pub struct Bitmex;

impl SubscriptionMapper for Bitmex {
    fn can_handle(&self, message: &Value, _: DateTime<Utc>) -> bool {
        has_str(message, "op", "subscribe")
    }

    fn map(&self, message: &Value, _: DateTime<Utc>) -> Result<Vec<Filter>> {
        let args = string_list(field(message, "args")?, "args")?;
        Ok(args
            .into_iter()
            .map(|arg| match arg.split_once(':') {
                Some((channel, symbol)) => single(channel, symbol),
                None => Filter::channel(arg),
            })
            .collect())
    }
}
