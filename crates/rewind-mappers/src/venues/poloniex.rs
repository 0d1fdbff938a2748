//! Poloniex: `{"command":"subscribe","channel":"BTC_ETH"}`.

use chrono::{DateTime, Utc};
use rewind_core::Filter;
use serde_json::Value;

use crate::errors::{MappingError, Result};
use crate::json::{field, has_str, single};
use crate::mapper::SubscriptionMapper;

/// Poloniex. Every subscription is to the aggregated book of one market.
pub struct Poloniex;

impl SubscriptionMapper for Poloniex {
    fn can_handle(&self, message: &Value, _: DateTime<Utc>) -> bool {
        has_str(message, "command", "subscribe")
    }

    fn map(&self, message: &Value, _: DateTime<Utc>) -> Result<Vec<Filter>> {
        let market = match field(message, "channel")? {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => {
                return Err(MappingError::InvalidField {
                    field: "channel".into(),
                    expected: "a market name or id",
                });
            }
        };
        Ok(vec![single("price_aggregated_book", &market)])
    }
}
