//! Field access helpers shared by the venue mappers.

use rewind_core::Filter;
use serde_json::Value;

use crate::errors::{MappingError, Result};

/// Channel expansion table: client channel → stored channels.
pub(crate) type ChannelTable = &'static [(&'static str, &'static [&'static str])];

/// Whether `message[key]` is the string `expected`.
pub(crate) fn has_str(message: &Value, key: &str, expected: &str) -> bool {
    message.get(key).and_then(Value::as_str) == Some(expected)
}

/// Whether `message[key]` is present and not null.
pub(crate) fn has_field(message: &Value, key: &str) -> bool {
    message.get(key).is_some_and(|v| !v.is_null())
}

pub(crate) fn field<'a>(message: &'a Value, key: &str) -> Result<&'a Value> {
    message
        .get(key)
        .filter(|v| !v.is_null())
        .ok_or_else(|| MappingError::MissingField(key.to_string()))
}

pub(crate) fn as_str<'a>(value: &'a Value, key: &str) -> Result<&'a str> {
    value.as_str().ok_or_else(|| MappingError::InvalidField {
        field: key.to_string(),
        expected: "a string",
    })
}

pub(crate) fn str_field<'a>(message: &'a Value, key: &str) -> Result<&'a str> {
    as_str(field(message, key)?, key)
}

pub(crate) fn opt_str<'a>(message: &'a Value, key: &str) -> Option<&'a str> {
    message.get(key).and_then(Value::as_str)
}

pub(crate) fn array_field<'a>(message: &'a Value, key: &str) -> Result<&'a [Value]> {
    field(message, key)?
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| MappingError::InvalidField {
            field: key.to_string(),
            expected: "an array",
        })
}

/// A string or an array of strings.
pub(crate) fn string_list<'a>(value: &'a Value, key: &str) -> Result<Vec<&'a str>> {
    match value {
        Value::String(s) => Ok(vec![s.as_str()]),
        Value::Array(items) => items.iter().map(|item| as_str(item, key)).collect(),
        _ => Err(MappingError::InvalidField {
            field: key.to_string(),
            expected: "a string or an array of strings",
        }),
    }
}

/// Optional symbol list. Absent, null or empty means every symbol.
pub(crate) fn symbols_field(message: &Value, key: &str) -> Result<Option<Vec<String>>> {
    match message.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => Ok(non_empty(
            string_list(value, key)?
                .into_iter()
                .map(str::to_string)
                .collect(),
        )),
    }
}

pub(crate) fn non_empty(symbols: Vec<String>) -> Option<Vec<String>> {
    (!symbols.is_empty()).then_some(symbols)
}

pub(crate) fn filter(channel: &str, symbols: Option<Vec<String>>) -> Filter {
    Filter {
        channel: channel.to_string(),
        symbols,
    }
}

pub(crate) fn single(channel: &str, symbol: &str) -> Filter {
    Filter::with_symbols(channel, [symbol])
}

/// Expand `channel` through `table`, giving every target the same symbols.
pub(crate) fn expand(
    venue: &'static str,
    table: ChannelTable,
    channel: &str,
    symbols: Option<&[String]>,
) -> Result<Vec<Filter>> {
    let (_, targets) = table
        .iter()
        .find(|(name, _)| *name == channel)
        .ok_or_else(|| MappingError::UnknownChannel {
            venue,
            channel: channel.to_string(),
        })?;
    Ok(targets
        .iter()
        .map(|target| filter(target, symbols.map(<[String]>::to_vec)))
        .collect())
}
