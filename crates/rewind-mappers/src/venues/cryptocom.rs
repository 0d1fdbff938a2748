//! Crypto.com: `{"method":"subscribe","params":{"channels":["book.BTC_USDT.10"]}}`.

use chrono::{DateTime, Utc};
use rewind_core::Filter;
use serde_json::Value;

use crate::errors::Result;
use crate::json::{field, has_str, single, string_list};
use crate::mapper::SubscriptionMapper;

/// Crypto.com exchange and derivatives. Channels are `<channel>.<instrument>[.<depth>]`.
pub struct CryptoCom;

impl SubscriptionMapper for CryptoCom {
    fn can_handle(&self, message: &Value, _: DateTime<Utc>) -> bool {
        has_str(message, "method", "subscribe")
    }

    fn map(&self, message: &Value, _: DateTime<Utc>) -> Result<Vec<Filter>> {
        let params = field(message, "params")?;
        Ok(string_list(field(params, "channels")?, "channels")?
            .into_iter()
            .map(|channel| {
                let mut parts = channel.split('.');
                match (parts.next(), parts.next()) {
                    (Some(name), Some(instrument)) => single(name, instrument),
                    _ => Filter::channel(channel),
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn channel_precedes_instrument() {
        let msg = json!({"id": 1, "method": "subscribe", "params": {"channels": ["book.BTC_USDT.10", "trade.ETH_USDT", "heartbeat"]}});
        assert_eq!(
            CryptoCom.map(&msg, Utc::now()).unwrap(),
            vec![
                Filter::with_symbols("book", ["BTC_USDT"]),
                Filter::with_symbols("trade", ["ETH_USDT"]),
                Filter::channel("heartbeat"),
            ]
        );
    }
}
