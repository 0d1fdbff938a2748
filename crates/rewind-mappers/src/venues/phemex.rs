//! Phemex: `{"method":"orderbook.subscribe","params":["sBTCUSDT"]}`.

use chrono::{DateTime, Utc};
use rewind_core::Filter;
use serde_json::Value;

use crate::errors::Result;
use crate::json::{ChannelTable, expand, has_field, str_field, symbols_field};
use crate::mapper::SubscriptionMapper;

const METHODS: ChannelTable = &[
    ("orderbook.subscribe", &["book"]),
    ("trade.subscribe", &["trades"]),
    ("market24h.subscribe", &["market24h"]),
];

/// Phemex.
pub struct Phemex;

impl SubscriptionMapper for Phemex {
    fn can_handle(&self, message: &Value, _: DateTime<Utc>) -> bool {
        has_field(message, "method")
    }

    fn map(&self, message: &Value, _: DateTime<Utc>) -> Result<Vec<Filter>> {
        let method = str_field(message, "method")?;
        let symbols = symbols_field(message, "params")?;
        expand("phemex", METHODS, method, symbols.as_deref())
    }
}
