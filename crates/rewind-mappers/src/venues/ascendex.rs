//! AscendEX: `{"op":"sub","ch":"trades:BTC/USDT"}` or `{"op":"req","action":"depth-snapshot","args":{"symbol":..}}`.

use chrono::{DateTime, Utc};
use rewind_core::Filter;
use serde_json::Value;

use crate::errors::{MappingError, Result};
use crate::json::{filter, opt_str};
use crate::mapper::SubscriptionMapper;

/// AscendEX.
pub struct Ascendex;

impl SubscriptionMapper for Ascendex {
    fn can_handle(&self, message: &Value, _: DateTime<Utc>) -> bool {
        matches!(opt_str(message, "op"), Some("sub" | "req"))
    }

    fn map(&self, message: &Value, _: DateTime<Utc>) -> Result<Vec<Filter>> {
        let ch = opt_str(message, "ch");
        let (ch_channel, ch_symbol) = match ch.map(|c| c.split_once(':')) {
            Some(Some((channel, symbol))) => (Some(channel), Some(symbol)),
            Some(None) => (ch, None),
            None => (None, None),
        };
        let channel = opt_str(message, "action")
            .or(ch_channel)
            .ok_or_else(|| MappingError::MissingField("action".into()))?;
        let symbol = message
            .get("args")
            .and_then(|args| opt_str(args, "symbol"))
            .or(ch_symbol)
            .filter(|s| !s.is_empty());
        Ok(vec![filter(channel, symbol.map(|s| vec![s.to_string()]))])
    }
}
