//! Kraken: `{"event":"subscribe","pair":["XBT/USD"],"subscription":{"name":"trade"}}`.

use chrono::{DateTime, Utc};
use rewind_core::Filter;
use serde_json::Value;

use crate::errors::Result;
use crate::json::{field, filter, has_str, str_field, symbols_field};
use crate::mapper::SubscriptionMapper;

/// Kraken spot.
pub struct Kraken;

impl SubscriptionMapper for Kraken {
    fn can_handle(&self, message: &Value, _: DateTime<Utc>) -> bool {
        has_str(message, "event", "subscribe")
    }

    fn map(&self, message: &Value, _: DateTime<Utc>) -> Result<Vec<Filter>> {
        let name = str_field(field(message, "subscription")?, "name")?;
        Ok(vec![filter(name, symbols_field(message, "pair")?)])
    }
}

/// Crypto Facilities: `{"event":"subscribe","feed":"book","product_ids":[..]}`.
pub struct Cryptofacilities;

impl SubscriptionMapper for Cryptofacilities {
    fn can_handle(&self, message: &Value, _: DateTime<Utc>) -> bool {
        has_str(message, "event", "subscribe")
    }

    fn map(&self, message: &Value, _: DateTime<Utc>) -> Result<Vec<Filter>> {
        Ok(vec![filter(
            str_field(message, "feed")?,
            symbols_field(message, "product_ids")?,
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kraken_maps_pairs() {
        let msg = json!({"event": "subscribe", "pair": ["XBT/USD", "ETH/USD"], "subscription": {"name": "book", "depth": 1000}});
        assert_eq!(
            Kraken.map(&msg, Utc::now()).unwrap(),
            vec![Filter::with_symbols("book", ["XBT/USD", "ETH/USD"])]
        );
    }

    #[test]
    fn cryptofacilities_maps_feed() {
        let msg = json!({"event": "subscribe", "feed": "trade", "product_ids": ["PI_XBTUSD"]});
        assert_eq!(
            Cryptofacilities.map(&msg, Utc::now()).unwrap(),
            vec![Filter::with_symbols("trade", ["PI_XBTUSD"])]
        );
    }
}
