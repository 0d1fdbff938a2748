//! HitBTC: `{"method":"subscribeTrades","params":{"symbol":"ETHBTC"}}`.

use chrono::{DateTime, Utc};
use rewind_core::Filter;
use serde_json::Value;

use crate::errors::Result;
use crate::json::{ChannelTable, expand, field, has_field, str_field};
use crate::mapper::SubscriptionMapper;

const METHODS: ChannelTable = &[
    ("subscribeTrades", &["snapshotTrades", "updateTrades"]),
    ("subscribeOrderbook", &["snapshotOrderbook", "updateOrderbook"]),
];

/// HitBTC v2.
pub struct Hitbtc;

impl SubscriptionMapper for Hitbtc {
    fn can_handle(&self, message: &Value, _: DateTime<Utc>) -> bool {
        has_field(message, "method")
    }

    fn map(&self, message: &Value, _: DateTime<Utc>) -> Result<Vec<Filter>> {
        let method = str_field(message, "method")?;
        let symbols = [str_field(field(message, "params")?, "symbol")?.to_string()];
        expand("hitbtc", METHODS, method, Some(symbols.as_slice()))
    }
}
