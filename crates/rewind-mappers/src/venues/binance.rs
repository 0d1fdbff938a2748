//! Binance stream subscriptions.

use chrono::{DateTime, Utc};
use rewind_core::Filter;
use serde_json::Value;

use crate::errors::{MappingError, Result};
use crate::json::{field, filter, has_str, str_field, string_list, symbols_field};
use crate::mapper::SubscriptionMapper;

/// Binance spot, futures, options and regional venues.
///
/// Stream names are `<symbol>@<channel>[@<interval>]`.
pub struct Binance;

impl SubscriptionMapper for Binance {
    fn can_handle(&self, message: &Value, _: DateTime<Utc>) -> bool {
        has_str(message, "method", "SUBSCRIBE")
    }

    fn map(&self, message: &Value, _: DateTime<Utc>) -> Result<Vec<Filter>> {
        string_list(field(message, "params")?, "params")?
            .into_iter()
            .map(|stream| {
                let (symbol, rest) = stream.split_once('@').ok_or_else(|| {
                    MappingError::Malformed {
                        what: "binance stream",
                        value: stream.to_string(),
                    }
                })?;
                let channel = rest.rsplit_once('@').map_or(rest, |(channel, _)| channel);
                Ok(Filter::with_symbols(channel, [symbol]))
            })
            .collect()
    }
}

/// Binance DEX: `{"method":"subscribe","topic":"trades","symbols":[..]}`.
pub struct BinanceDex;

impl SubscriptionMapper for BinanceDex {
    fn can_handle(&self, message: &Value, _: DateTime<Utc>) -> bool {
        has_str(message, "method", "subscribe")
    }

    fn map(&self, message: &Value, _: DateTime<Utc>) -> Result<Vec<Filter>> {
        Ok(vec![filter(
            str_field(message, "topic")?,
            symbols_field(message, "symbols")?,
        )])
    }
}
