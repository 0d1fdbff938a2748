//! Hyperliquid: `{"method":"subscribe","subscription":{"type":"trades","coin":"SOL"}}`.

use chrono::{DateTime, Utc};
use rewind_core::Filter;
use serde_json::Value;

use crate::errors::{MappingError, Result};
use crate::json::{has_str, opt_str, single};
use crate::mapper::SubscriptionMapper;

/// Hyperliquid. Flat `{"type","coin"}` fields are accepted as well.
pub struct Hyperliquid;

impl SubscriptionMapper for Hyperliquid {
    fn can_handle(&self, message: &Value, _: DateTime<Utc>) -> bool {
        has_str(message, "method", "subscribe")
    }

    fn map(&self, message: &Value, _: DateTime<Utc>) -> Result<Vec<Filter>> {
        let body = message.get("subscription").unwrap_or(message);
        let channel = opt_str(body, "type")
            .or_else(|| opt_str(message, "type"))
            .ok_or_else(|| MappingError::MissingField("subscription.type".into()))?;
        let coin = opt_str(body, "coin").or_else(|| opt_str(message, "coin"));
        Ok(vec![match coin {
            Some(coin) => single(channel, coin),
            None => Filter::channel(channel),
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_nested_subscription() {
        let msg = json!({"method": "subscribe", "subscription": {"type": "l2Book", "coin": "ETH"}});
        assert_eq!(
            Hyperliquid.map(&msg, Utc::now()).unwrap(),
            vec![Filter::with_symbols("l2Book", ["ETH"])]
        );
    }

    #[test]
    fn falls_back_to_flat_fields() {
        let msg = json!({"method": "subscribe", "type": "trades", "coin": "BTC"});
        assert_eq!(
            Hyperliquid.map(&msg, Utc::now()).unwrap(),
            vec![Filter::with_symbols("trades", ["BTC"])]
        );
    }
}
