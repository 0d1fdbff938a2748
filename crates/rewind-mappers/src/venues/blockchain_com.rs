//! Blockchain.com: `{"action":"subscribe","channel":"l2","symbol":"BTC-USD"}`.

use chrono::{DateTime, Utc};
use rewind_core::Filter;
use serde_json::Value;

use crate::errors::Result;
use crate::json::{has_str, opt_str, single, str_field};
use crate::mapper::SubscriptionMapper;

/// Blockchain.com exchange.
pub struct BlockchainCom;

impl SubscriptionMapper for BlockchainCom {
    fn can_handle(&self, message: &Value, _: DateTime<Utc>) -> bool {
        has_str(message, "action", "subscribe")
    }

    fn map(&self, message: &Value, _: DateTime<Utc>) -> Result<Vec<Filter>> {
        let channel = str_field(message, "channel")?;
        Ok(vec![match opt_str(message, "symbol") {
            Some(symbol) => single(channel, symbol),
            None => Filter::channel(channel),
        }])
    }
}
