//! Replay windows.
//!
//! A window names one venue and a half-open historical range `[from, to)`.
//! Timestamps are accepted as plain dates (`2019-06-01`), naive date-times
//! (`2019-06-01T00:05`, `2019-06-01 00:05:00.250`) interpreted as UTC, or full
//! RFC 3339 values with an offset.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::WindowError;

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse a client-supplied timestamp as UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, WindowError> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
        .map_err(|_| WindowError::InvalidTimestamp(value.to_string()))
}

/// One venue and a historical range. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReplayWindow {
    /// Venue identifier, e.g. `bitmex`.
    pub exchange: String,
    /// Inclusive start.
    pub from: DateTime<Utc>,
    /// Exclusive end.
    pub to: DateTime<Utc>,
}

impl ReplayWindow {
    /// Build a window, rejecting an empty venue or a non-positive range.
    pub fn new(
        exchange: impl Into<String>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Self, WindowError> {
        let exchange = exchange.into();
        if exchange.trim().is_empty() {
            return Err(WindowError::MissingExchange);
        }
        if from >= to {
            return Err(WindowError::Empty { from, to });
        }
        Ok(Self { exchange, from, to })
    }

    /// Build a window from textual timestamps.
    pub fn parse(exchange: impl Into<String>, from: &str, to: &str) -> Result<Self, WindowError> {
        Self::new(exchange, parse_timestamp(from)?, parse_timestamp(to)?)
    }

    /// Whether `ts` falls inside `[from, to)`.
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.from && ts < self.to
    }
}

impl std::fmt::Display for ReplayWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} - {}",
            self.exchange,
            self.from.to_rfc3339(),
            self.to.to_rfc3339()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn parses_plain_date_as_midnight() {
        assert_eq!(
            parse_timestamp("2019-06-01").unwrap(),
            utc(2019, 6, 1, 0, 0, 0)
        );
    }

    #[test]
    fn parses_rfc3339_with_offset() {
        assert_eq!(
            parse_timestamp("2019-06-01T02:00:00+02:00").unwrap(),
            utc(2019, 6, 1, 0, 0, 0)
        );
        assert_eq!(
            parse_timestamp("2019-06-01T00:01:00.000Z").unwrap(),
            utc(2019, 6, 1, 0, 1, 0)
        );
    }

    #[test]
    fn parses_naive_date_times_as_utc() {
        assert_eq!(
            parse_timestamp("2019-06-01T00:05").unwrap(),
            utc(2019, 6, 1, 0, 5, 0)
        );
        assert_eq!(
            parse_timestamp("2019-06-01 00:05").unwrap(),
            utc(2019, 6, 1, 0, 5, 0)
        );
        assert_eq!(
            parse_timestamp(" 2019-06-01T00:05:07 ").unwrap(),
            utc(2019, 6, 1, 0, 5, 7)
        );
    }

    #[test]
    fn rejects_garbage() {
        assert_matches!(
            parse_timestamp("yesterday"),
            Err(WindowError::InvalidTimestamp(v)) if v == "yesterday"
        );
    }

    #[test]
    fn window_requires_from_before_to() {
        assert_matches!(
            ReplayWindow::parse("bitmex", "2019-06-02", "2019-06-01"),
            Err(WindowError::Empty { .. })
        );
        assert_matches!(
            ReplayWindow::parse("bitmex", "2019-06-01", "2019-06-01"),
            Err(WindowError::Empty { .. })
        );
    }

    #[test]
    fn window_requires_exchange() {
        assert_matches!(
            ReplayWindow::parse(" ", "2019-06-01", "2019-06-02"),
            Err(WindowError::MissingExchange)
        );
    }

    #[test]
    fn contains_is_half_open() {
        let window = ReplayWindow::parse("deribit", "2019-06-01", "2019-06-02").unwrap();
        assert!(window.contains(utc(2019, 6, 1, 0, 0, 0)));
        assert!(window.contains(utc(2019, 6, 1, 23, 59, 59)));
        assert!(!window.contains(utc(2019, 6, 2, 0, 0, 0)));
        assert!(!window.contains(utc(2019, 5, 31, 23, 59, 59)));
    }

    #[test]
    fn display_includes_venue_and_range() {
        let window = ReplayWindow::parse("deribit", "2019-06-01", "2019-06-02").unwrap();
        let text = window.to_string();
        assert!(text.starts_with("deribit 2019-06-01T00:00:00"));
        assert!(text.contains(" - 2019-06-02T00:00:00"));
    }
}
