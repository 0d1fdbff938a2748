//! Canonical subscription filters.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// A `{channel, symbols}` criterion. `symbols: None` selects every symbol.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Filter {
    /// Venue channel name, e.g. `trade` or `orderBookL2`.
    pub channel: String,
    /// Symbols to include, or every symbol when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbols: Option<Vec<String>>,
}

impl Filter {
    /// A filter selecting every symbol of `channel`.
    pub fn channel(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            symbols: None,
        }
    }

    /// A filter restricted to `symbols`.
    pub fn with_symbols<I, S>(channel: impl Into<String>, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            channel: channel.into(),
            symbols: Some(symbols.into_iter().map(Into::into).collect()),
        }
    }

    /// Whether a record on `channel` for `symbol` passes this filter.
    pub fn matches(&self, channel: &str, symbol: &str) -> bool {
        self.channel == channel
            && self
                .symbols
                .as_ref()
                .is_none_or(|symbols| symbols.iter().any(|s| s == symbol))
    }
}

/// Collapse filters that share a channel.
///
/// Symbol lists are unioned; an unrestricted filter for a channel absorbs any
/// restricted one. Output is ordered by channel.
pub fn merge_filters(filters: &[Filter]) -> Vec<Filter> {
    let mut channels: BTreeMap<&str, Option<BTreeSet<&str>>> = BTreeMap::new();
    for filter in filters {
        let entry = channels
            .entry(filter.channel.as_str())
            .or_insert_with(|| Some(BTreeSet::new()));
        match filter.symbols.as_ref() {
            None => *entry = None,
            Some(symbols) => {
                if let Some(acc) = entry.as_mut() {
                    acc.extend(symbols.iter().map(String::as_str));
                }
            }
        }
    }
    channels
        .into_iter()
        .map(|(channel, symbols)| Filter {
            channel: channel.to_string(),
            symbols: symbols.map(|s| s.into_iter().map(str::to_string).collect()),
        })
        .collect()
}
