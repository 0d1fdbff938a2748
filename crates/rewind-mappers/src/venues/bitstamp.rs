//! Bitstamp: `{"event":"bts:subscribe","data":{"channel":"live_trades_btcusd"}}`.

use chrono::{DateTime, Utc};
use rewind_core::Filter;
use serde_json::Value;

use crate::errors::{MappingError, Result};
use crate::json::{field, has_str, single, str_field};
use crate::mapper::SubscriptionMapper;

/// Bitstamp v2.
pub struct Bitstamp;

impl SubscriptionMapper for Bitstamp {
    fn can_handle(&self, message: &Value, _: DateTime<Utc>) -> bool {
        has_str(message, "event", "bts:subscribe")
    }

    fn map(&self, message: &Value, _: DateTime<Utc>) -> Result<Vec<Filter>> {
        let channel = str_field(field(message, "data")?, "channel")?;
        let (name, symbol) = channel
            .rsplit_once('_')
            .ok_or_else(|| MappingError::Malformed {
                what: "bitstamp channel",
                value: channel.to_string(),
            })?;
        Ok(vec![single(name, symbol)])
    }
}
