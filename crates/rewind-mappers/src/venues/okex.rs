//! `{"op":"subscribe","args":[..]}` venues: OKX family, Bitget, CoinFLEX, FTX.

use chrono::{DateTime, Utc};
use rewind_core::Filter;
use serde_json::Value;

use crate::errors::{MappingError, Result};
use crate::json::{array_field, has_str, opt_str, single, str_field};
use crate::mapper::SubscriptionMapper;

/// OKX, OKCoin, Bitget and CoinFLEX.
///
/// Arguments are either `"channel:symbol"` strings (OKEx v3, CoinFLEX) or
/// `{"channel": .., "instId": ..}` objects (OKX v5, Bitget).
pub struct Okex;

impl SubscriptionMapper for Okex {
    fn can_handle(&self, message: &Value, _: DateTime<Utc>) -> bool {
        has_str(message, "op", "subscribe")
    }

    fn map(&self, message: &Value, _: DateTime<Utc>) -> Result<Vec<Filter>> {
        array_field(message, "args")?
            .iter()
            .map(|arg| match arg {
                Value::String(arg) => Ok(match arg.split_once(':') {
                    Some((channel, symbol)) => single(channel, symbol),
                    None => Filter::channel(arg.as_str()),
                }),
                Value::Object(_) => {
                    let channel = str_field(arg, "channel")?;
                    Ok(match opt_str(arg, "instId") {
                        Some(symbol) => single(channel, symbol),
                        None => Filter::channel(channel),
                    })
                }
                other => Err(MappingError::Malformed {
                    what: "subscribe argument",
                    value: other.to_string(),
                }),
            })
            .collect()
    }
}

/// FTX: one market per message, `{"op":"subscribe","channel":"trades","market":"BTC-PERP"}`.
pub struct Ftx;

impl SubscriptionMapper for Ftx {
    fn can_handle(&self, message: &Value, _: DateTime<Utc>) -> bool {
        has_str(message, "op", "subscribe")
    }

    fn map(&self, message: &Value, _: DateTime<Utc>) -> Result<Vec<Filter>> {
        Ok(vec![single(
            str_field(message, "channel")?,
            str_field(message, "market")?,
        )])
    }
}
