//! Deribit JSON-RPC: `{"method":"public/subscribe","params":{"channels":["trades.BTC-PERPETUAL.raw"]}}`.

use chrono::{DateTime, Utc};
use rewind_core::Filter;
use serde_json::Value;

use crate::errors::{MappingError, Result};
use crate::json::{field, has_str, single, string_list};
use crate::mapper::SubscriptionMapper;

/// Deribit v2 API.
///
/// Channel names are `<channel>.<instrument>[.<options>...]`, e.g.
/// `book.ETH-PERPETUAL.100ms` or `deribit_price_ranking.btc_usd`.
pub struct Deribit;

impl SubscriptionMapper for Deribit {
    fn can_handle(&self, message: &Value, _: DateTime<Utc>) -> bool {
        has_str(message, "method", "public/subscribe")
    }

    fn map(&self, message: &Value, _: DateTime<Utc>) -> Result<Vec<Filter>> {
        let params = field(message, "params")?;
        string_list(field(params, "channels")?, "channels")?
            .into_iter()
            .map(|channel| {
                let mut parts = channel.split('.');
                match (parts.next(), parts.next()) {
                    (Some(name), Some(instrument)) if !name.is_empty() => {
                        Ok(single(name, instrument))
                    }
                    _ => Err(MappingError::Malformed {
                        what: "deribit channel",
                        value: channel.to_string(),
                    }),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn subscribe(channels: &[&str]) -> Value {
        json!({"jsonrpc": "2.0", "method": "public/subscribe", "params": {"channels": channels}})
    }

    #[test]
    fn extracts_instrument_from_second_segment() {
        let filters = Deribit
            .map(
                &subscribe(&[
                    "trades.BTC-PERPETUAL.raw",
                    "book.ETH-PERPETUAL.100.1.100ms",
                    "deribit_price_ranking.btc_usd",
                ]),
                Utc::now(),
            )
            .unwrap();
        assert_eq!(
            filters,
            vec![
                Filter::with_symbols("trades", ["BTC-PERPETUAL"]),
                Filter::with_symbols("book", ["ETH-PERPETUAL"]),
                Filter::with_symbols("deribit_price_ranking", ["btc_usd"]),
            ]
        );
    }

    #[test]
    fn channel_without_instrument_is_malformed() {
        assert_matches!(
            Deribit.map(&subscribe(&["heartbeat"]), Utc::now()),
            Err(MappingError::Malformed { value, .. }) if value == "heartbeat"
        );
    }

    #[test]
    fn private_subscribe_is_not_handled() {
        let msg = json!({"method": "private/subscribe", "params": {"channels": []}});
        assert!(!Deribit.can_handle(&msg, Utc::now()));
    }
}
