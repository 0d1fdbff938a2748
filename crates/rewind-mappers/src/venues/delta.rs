//! Delta Exchange: `{"type":"subscribe","payload":{"channels":[{"name":..,"symbols":[..]}]}}`.

use chrono::{DateTime, Utc};
use rewind_core::Filter;
use serde_json::Value;

use crate::errors::Result;
use crate::json::{array_field, field, filter, has_str, str_field, symbols_field};
use crate::mapper::SubscriptionMapper;

/// Delta Exchange. Mark prices are stored under `MARK:<symbol>`.
pub struct Delta;

impl SubscriptionMapper for Delta {
    fn can_handle(&self, message: &Value, _: DateTime<Utc>) -> bool {
        has_str(message, "type", "subscribe")
    }

    fn map(&self, message: &Value, _: DateTime<Utc>) -> Result<Vec<Filter>> {
        array_field(field(message, "payload")?, "channels")?
            .iter()
            .map(|channel| {
                let name = str_field(channel, "name")?;
                let mut symbols = symbols_field(channel, "symbols")?;
                if name == "mark_price" {
                    symbols = symbols
                        .map(|list| list.into_iter().map(|s| format!("MARK:{s}")).collect());
                }
                Ok(filter(name, symbols))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn prefixes_mark_price_symbols() {
        let msg = json!({"type": "subscribe", "payload": {"channels": [
            {"name": "mark_price", "symbols": ["BTCUSDT"]},
            {"name": "l2_orderbook", "symbols": ["BTCUSDT"]},
            {"name": "funding_rate"}
        ]}});
        assert_eq!(
            Delta.map(&msg, Utc::now()).unwrap(),
            vec![
                Filter::with_symbols("mark_price", ["MARK:BTCUSDT"]),
                Filter::with_symbols("l2_orderbook", ["BTCUSDT"]),
                Filter::channel("funding_rate"),
            ]
        );
    }
}
