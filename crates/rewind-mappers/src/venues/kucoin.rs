//! KuCoin: `{"type":"subscribe","topic":"/market/ticker:BTC-USDT,ETH-USDT"}`.

use chrono::{DateTime, Utc};
use rewind_core::Filter;
use serde_json::Value;

use crate::errors::Result;
use crate::json::{filter, has_str, non_empty, str_field};
use crate::mapper::SubscriptionMapper;

/// KuCoin spot and futures.
pub struct Kucoin;

impl SubscriptionMapper for Kucoin {
    fn can_handle(&self, message: &Value, _: DateTime<Utc>) -> bool {
        has_str(message, "type", "subscribe")
    }

    fn map(&self, message: &Value, _: DateTime<Utc>) -> Result<Vec<Filter>> {
        let topic = str_field(message, "topic")?;
        let (channel, symbols) = match topic.split_once(':') {
            Some((channel, list)) => (
                channel,
                non_empty(
                    list.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect(),
                ),
            ),
            None => (topic, None),
        };
        Ok(vec![filter(channel.trim_start_matches('/'), symbols)])
    }
}
