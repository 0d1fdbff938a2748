//! WOO X: `{"event":"subscribe","topic":"SPOT_BTC_USDT@orderbook"}`.

use chrono::{DateTime, Utc};
use rewind_core::Filter;
use serde_json::Value;

use crate::errors::Result;
use crate::json::{has_str, single, str_field};
use crate::mapper::SubscriptionMapper;

/// WOO X.
pub struct WooX;

impl SubscriptionMapper for WooX {
    fn can_handle(&self, message: &Value, _: DateTime<Utc>) -> bool {
        has_str(message, "event", "subscribe")
    }

    fn map(&self, message: &Value, _: DateTime<Utc>) -> Result<Vec<Filter>> {
        let topic = str_field(message, "topic")?;
        Ok(vec![match topic.split_once('@') {
            Some((symbol, channel)) => single(channel, symbol),
            None => Filter::channel(topic),
        }])
    }
}
