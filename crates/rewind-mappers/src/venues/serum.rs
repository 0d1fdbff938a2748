//! Serum-style DEX relays (Serum, Star Atlas, Mango).

use chrono::{DateTime, Utc};
use rewind_core::Filter;
use serde_json::Value;

use crate::errors::Result;
use crate::json::{ChannelTable, expand, has_str, str_field, symbols_field};
use crate::mapper::SubscriptionMapper;

const CHANNELS: ChannelTable = &[
    ("trades", &["recent_trades", "trade"]),
    ("level1", &["quote"]),
    ("level2", &["l2snapshot", "l2update"]),
    ("level3", &["l3snapshot", "open", "fill", "change", "done"]),
];

/// `{"op":"subscribe","channel":"level2","markets":["BTC/USDC"]}`.
pub struct Serum;

impl SubscriptionMapper for Serum {
    fn can_handle(&self, message: &Value, _: DateTime<Utc>) -> bool {
        has_str(message, "op", "subscribe")
    }

    fn map(&self, message: &Value, _: DateTime<Utc>) -> Result<Vec<Filter>> {
        let channel = str_field(message, "channel")?;
        let markets = symbols_field(message, "markets")?;
        expand("serum", CHANNELS, channel, markets.as_deref())
    }
}
