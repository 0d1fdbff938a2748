//! Coinbase-style subscribe messages with channel expansion.
//!
//! Coinbase, Bitnomial and Gemini subscribe to aggregate channels that are
//! stored as several message types; each aggregate expands to all of them.

use chrono::{DateTime, Utc};
use rewind_core::Filter;
use serde_json::Value;

use crate::errors::Result;
use crate::json::{
    ChannelTable, array_field, as_str, expand, filter, has_str, str_field, symbols_field,
};
use crate::mapper::SubscriptionMapper;

const COINBASE_CHANNELS: ChannelTable = &[
    (
        "full",
        &["received", "open", "done", "match", "change", "full_snapshot"],
    ),
    ("level2", &["snapshot", "l2update"]),
    ("matches", &["match", "last_match"]),
    ("ticker", &["ticker"]),
];

const BITNOMIAL_CHANNELS: ChannelTable = &[
    ("book", &["book", "levels"]),
    ("trade", &["trade"]),
    ("block", &["block"]),
];

const GEMINI_CHANNELS: ChannelTable = &[(
    "l2",
    &[
        "trade",
        "l2_updates",
        "auction_open",
        "auction_indicative",
        "auction_result",
    ],
)];

/// `channels` entries are names (using top-level symbols) or
/// `{name, <symbols_key>}` objects.
fn map_channel_list(
    message: &Value,
    venue: &'static str,
    symbols_key: &str,
    table: ChannelTable,
) -> Result<Vec<Filter>> {
    let top_level = symbols_field(message, symbols_key)?;
    let mut filters = Vec::new();
    for channel in array_field(message, "channels")? {
        let (name, symbols) = match channel {
            Value::String(name) => (name.as_str(), top_level.clone()),
            other => (
                str_field(other, "name")?,
                symbols_field(other, symbols_key)?.or_else(|| top_level.clone()),
            ),
        };
        filters.extend(expand(venue, table, name, symbols.as_deref())?);
    }
    Ok(filters)
}

/// Coinbase Exchange.
pub struct Coinbase;

impl SubscriptionMapper for Coinbase {
    fn can_handle(&self, message: &Value, _: DateTime<Utc>) -> bool {
        has_str(message, "type", "subscribe")
    }

    fn map(&self, message: &Value, _: DateTime<Utc>) -> Result<Vec<Filter>> {
        map_channel_list(message, "coinbase", "product_ids", COINBASE_CHANNELS)
    }
}

/// Bitnomial.
pub struct Bitnomial;

impl SubscriptionMapper for Bitnomial {
    fn can_handle(&self, message: &Value, _: DateTime<Utc>) -> bool {
        has_str(message, "type", "subscribe")
    }

    fn map(&self, message: &Value, _: DateTime<Utc>) -> Result<Vec<Filter>> {
        map_channel_list(message, "bitnomial", "product_codes", BITNOMIAL_CHANNELS)
    }
}

/// Gemini market data v2: `{"type":"subscribe","subscriptions":[{"name":"l2","symbols":[..]}]}`.
pub struct Gemini;

impl SubscriptionMapper for Gemini {
    fn can_handle(&self, message: &Value, _: DateTime<Utc>) -> bool {
        has_str(message, "type", "subscribe")
    }

    fn map(&self, message: &Value, _: DateTime<Utc>) -> Result<Vec<Filter>> {
        let mut filters = Vec::new();
        for sub in array_field(message, "subscriptions")? {
            let name = str_field(sub, "name")?;
            let symbols = symbols_field(sub, "symbols")?;
            filters.extend(expand("gemini", GEMINI_CHANNELS, name, symbols.as_deref())?);
        }
        Ok(filters)
    }
}

/// Coinbase International: upper-case `SUBSCRIBE`, channels used as stored.
pub struct CoinbaseInternational;

impl SubscriptionMapper for CoinbaseInternational {
    fn can_handle(&self, message: &Value, _: DateTime<Utc>) -> bool {
        has_str(message, "type", "SUBSCRIBE")
    }

    fn map(&self, message: &Value, _: DateTime<Utc>) -> Result<Vec<Filter>> {
        let symbols = symbols_field(message, "product_ids")?;
        array_field(message, "channels")?
            .iter()
            .map(|channel| Ok(filter(as_str(channel, "channels")?, symbols.clone())))
            .collect()
    }
}
