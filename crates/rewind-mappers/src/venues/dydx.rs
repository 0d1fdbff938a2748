//! dYdX v3 and v4: `{"type":"subscribe","channel":"v3_orderbook","id":"BTC-USD"}`.

use chrono::{DateTime, Utc};
use rewind_core::Filter;
use serde_json::Value;

use crate::errors::Result;
use crate::json::{filter, has_str, opt_str, str_field};
use crate::mapper::SubscriptionMapper;

/// dYdX.
pub struct Dydx;

impl SubscriptionMapper for Dydx {
    fn can_handle(&self, message: &Value, _: DateTime<Utc>) -> bool {
        has_str(message, "type", "subscribe")
    }

    fn map(&self, message: &Value, _: DateTime<Utc>) -> Result<Vec<Filter>> {
        let channel = str_field(message, "channel")?;
        let symbols = opt_str(message, "id")
            .filter(|id| !id.is_empty())
            .map(|id| vec![id.to_string()]);
        Ok(vec![filter(channel, symbols)])
    }
}
