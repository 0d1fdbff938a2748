//! bitFlyer Lightning JSON-RPC.

use chrono::{DateTime, Utc};
use rewind_core::Filter;
use serde_json::Value;

use crate::errors::{MappingError, Result};
use crate::json::{field, has_str, single, str_field};
use crate::mapper::SubscriptionMapper;

// Longest prefix first: `lightning_board` is a prefix of the snapshot channel.
const CHANNELS: &[&str] = &[
    "lightning_board_snapshot",
    "lightning_board",
    "lightning_ticker",
    "lightning_executions",
];

/// bitFlyer: `{"method":"subscribe","params":{"channel":"lightning_executions_FX_BTC_JPY"}}`.
pub struct Bitflyer;

impl SubscriptionMapper for Bitflyer {
    fn can_handle(&self, message: &Value, _: DateTime<Utc>) -> bool {
        has_str(message, "method", "subscribe")
    }

    fn map(&self, message: &Value, _: DateTime<Utc>) -> Result<Vec<Filter>> {
        let requested = str_field(field(message, "params")?, "channel")?;
        let channel = CHANNELS
            .iter()
            .find(|c| requested.starts_with(*c))
            .ok_or_else(|| MappingError::UnknownChannel {
                venue: "bitflyer",
                channel: requested.to_string(),
            })?;
        let symbol = requested[channel.len()..].trim_start_matches('_');
        if symbol.is_empty() {
            return Err(MappingError::Malformed {
                what: "bitflyer channel",
                value: requested.to_string(),
            });
        }
        Ok(vec![single(channel, symbol)])
    }
}
