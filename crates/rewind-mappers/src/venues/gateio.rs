//! Gate.io spot (v3) and futures.

use chrono::{DateTime, Utc};
use rewind_core::Filter;
use serde_json::Value;

use crate::errors::{MappingError, Result};
use crate::json::{array_field, filter, has_str, non_empty, opt_str, str_field};
use crate::mapper::SubscriptionMapper;

/// Entries are symbols, or arrays whose first element is the symbol
/// (`["BTC_USDT", 30, "0.1"]` for depth).
fn symbols_from(entries: &[Value], key: &str) -> Result<Option<Vec<String>>> {
    let symbols = entries
        .iter()
        .map(|entry| {
            let symbol = match entry {
                Value::Array(items) => items.first().and_then(Value::as_str),
                other => other.as_str(),
            };
            symbol.map(str::to_string).ok_or_else(|| MappingError::InvalidField {
                field: key.to_string(),
                expected: "symbols or [symbol, ..] arrays",
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(non_empty(symbols))
}

/// Gate.io spot: `{"method":"trades.subscribe","params":["BTC_USDT"]}`.
pub struct GateIo;

impl SubscriptionMapper for GateIo {
    fn can_handle(&self, message: &Value, _: DateTime<Utc>) -> bool {
        opt_str(message, "method").is_some_and(|m| m.ends_with(".subscribe"))
    }

    fn map(&self, message: &Value, _: DateTime<Utc>) -> Result<Vec<Filter>> {
        let method = str_field(message, "method")?;
        let channel = method.split('.').next().unwrap_or(method);
        let symbols = symbols_from(array_field(message, "params")?, "params")?;
        Ok(vec![filter(channel, symbols)])
    }
}

/// Gate.io futures: `{"event":"subscribe","channel":"futures.trades","payload":["BTC_USD"]}`.
pub struct GateIoFutures;

impl SubscriptionMapper for GateIoFutures {
    fn can_handle(&self, message: &Value, _: DateTime<Utc>) -> bool {
        has_str(message, "event", "subscribe")
    }

    fn map(&self, message: &Value, _: DateTime<Utc>) -> Result<Vec<Filter>> {
        let full = str_field(message, "channel")?;
        let channel = full
            .split('.')
            .nth(1)
            .ok_or_else(|| MappingError::Malformed {
                what: "gate-io-futures channel",
                value: full.to_string(),
            })?;
        let symbols = symbols_from(array_field(message, "payload")?, "payload")?;
        Ok(vec![filter(channel, symbols)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn spot_accepts_nested_params() {
        let msg = json!({"id": 1, "method": "depth.subscribe", "params": [["BTC_USDT", 30, "0.1"], ["ETH_USDT", 30, "0.1"]]});
        assert_eq!(
            GateIo.map(&msg, Utc::now()).unwrap(),
            vec![Filter::with_symbols("depth", ["BTC_USDT", "ETH_USDT"])]
        );
    }

    #[test]
    fn spot_ignores_other_methods() {
        assert!(!GateIo.can_handle(&json!({"method": "server.ping"}), Utc::now()));
        assert!(GateIo.can_handle(&json!({"method": "trades.subscribe"}), Utc::now()));
    }

    #[test]
    fn futures_takes_second_channel_segment() {
        let msg = json!({"time": 1, "channel": "futures.order_book", "event": "subscribe", "payload": ["BTC_USD", "20", "0"]});
        assert_eq!(
            GateIoFutures.map(&msg, Utc::now()).unwrap(),
            vec![Filter::with_symbols("order_book", ["BTC_USD", "20", "0"])]
        );
    }
}
