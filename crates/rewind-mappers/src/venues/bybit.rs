//! Bybit, including the spot schema change on 2023-04-05.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rewind_core::Filter;
use serde_json::Value;

use crate::errors::Result;
use crate::json::{field, has_str, opt_str, single, str_field, string_list};
use crate::mapper::SubscriptionMapper;

/// Windows starting after this instant use the v5 spot schema.
pub const V5_SPOT_CUTOVER: DateTime<Utc> = match NaiveDate::from_ymd_opt(2023, 4, 5) {
    Some(date) => date.and_time(NaiveTime::MIN).and_utc(),
    None => panic!("bybit v5 cutover is not a calendar date"),
};

/// Bybit derivatives and options: args `<channel>[.<depth>].<symbol>`.
pub struct Bybit;

impl SubscriptionMapper for Bybit {
    fn can_handle(&self, message: &Value, _: DateTime<Utc>) -> bool {
        has_str(message, "op", "subscribe")
    }

    fn map(&self, message: &Value, _: DateTime<Utc>) -> Result<Vec<Filter>> {
        Ok(string_list(field(message, "args")?, "args")?
            .into_iter()
            .map(|arg| match arg.split_once('.') {
                Some((channel, rest)) => {
                    single(channel, rest.rsplit_once('.').map_or(rest, |(_, s)| s))
                }
                None => Filter::channel(arg),
            })
            .collect())
    }
}

/// Bybit spot. Before the v5 cutover:
/// `{"topic":"trade","event":"sub","params":{"symbol":"BTCUSDT"}}`.
pub struct BybitSpot;

impl SubscriptionMapper for BybitSpot {
    fn can_handle(&self, message: &Value, window_start: DateTime<Utc>) -> bool {
        if window_start > V5_SPOT_CUTOVER {
            Bybit.can_handle(message, window_start)
        } else {
            has_str(message, "event", "sub")
        }
    }

    fn map(&self, message: &Value, window_start: DateTime<Utc>) -> Result<Vec<Filter>> {
        if window_start > V5_SPOT_CUTOVER {
            return Bybit.map(message, window_start);
        }
        let topic = str_field(message, "topic")?;
        let symbol = opt_str(message, "symbol")
            .or_else(|| message.get("params").and_then(|p| opt_str(p, "symbol")));
        Ok(vec![match symbol {
            Some(symbol) => single(topic, symbol),
            None => Filter::channel(topic),
        }])
    }
}
