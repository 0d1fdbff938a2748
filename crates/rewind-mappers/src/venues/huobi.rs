//! Huobi: `{"sub":"market.btcusdt.trade.detail","id":"1"}`.

use chrono::{DateTime, Utc};
use rewind_core::Filter;
use serde_json::Value;

use crate::errors::{MappingError, Result};
use crate::json::{has_field, single, str_field};
use crate::mapper::SubscriptionMapper;

/// Huobi spot and derivatives.
pub struct Huobi;

impl SubscriptionMapper for Huobi {
    fn can_handle(&self, message: &Value, _: DateTime<Utc>) -> bool {
        has_field(message, "sub")
    }

    fn map(&self, message: &Value, _: DateTime<Utc>) -> Result<Vec<Filter>> {
        let topic = str_field(message, "sub")?;
        let pieces: Vec<&str> = topic.split('.').collect();
        match pieces.as_slice() {
            [_, symbol, channel, ..] => Ok(vec![single(channel, symbol)]),
            _ => Err(MappingError::Malformed {
                what: "huobi topic",
                value: topic.to_string(),
            }),
        }
    }
}
