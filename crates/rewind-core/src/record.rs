//! Timestamped raw records and the framings used to ship them.

use bytes::{BufMut, Bytes, BytesMut};
use chrono::{DateTime, SecondsFormat, Utc};

/// One message as captured from a venue, with its local receive time.
///
/// `message` is the venue's raw payload, passed through untouched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    /// When the message was received by the capturing process.
    pub local_timestamp: DateTime<Utc>,
    /// Raw venue payload.
    pub message: Bytes,
}

impl Record {
    /// Create a record.
    pub fn new(local_timestamp: DateTime<Utc>, message: impl Into<Bytes>) -> Self {
        Self {
            local_timestamp,
            message: message.into(),
        }
    }

    /// `{"localTimestamp":"..","message":<raw>}\n` as used by the HTTP route.
    pub fn ndjson_line(&self) -> Bytes {
        let ts = format_timestamp(self.local_timestamp);
        let mut buf = BytesMut::with_capacity(self.message.len() + ts.len() + 40);
        buf.put_slice(b"{\"localTimestamp\":\"");
        buf.put_slice(ts.as_bytes());
        buf.put_slice(b"\",\"message\":");
        buf.put_slice(&self.message);
        buf.put_slice(b"}\n");
        buf.freeze()
    }

    /// `{"exchange":..,"localTimestamp":..,"message":<raw>}` for multi-venue streams.
    pub fn envelope(&self, exchange: &str) -> Bytes {
        let ts = format_timestamp(self.local_timestamp);
        let exchange = serde_json::Value::String(exchange.to_string()).to_string();
        let mut buf = BytesMut::with_capacity(self.message.len() + ts.len() + exchange.len() + 48);
        buf.put_slice(b"{\"exchange\":");
        buf.put_slice(exchange.as_bytes());
        buf.put_slice(b",\"localTimestamp\":\"");
        buf.put_slice(ts.as_bytes());
        buf.put_slice(b"\",\"message\":");
        buf.put_slice(&self.message);
        buf.put_slice(b"}");
        buf.freeze()
    }
}

/// RFC 3339 in UTC with a `Z` suffix and only as many fractional digits as needed.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(message: &str) -> Record {
        let ts = Utc.with_ymd_and_hms(2019, 6, 1, 0, 0, 1).unwrap()
            + chrono::Duration::milliseconds(250);
        Record::new(ts, message.to_string())
    }

    #[test]
    fn ndjson_line_embeds_raw_message() {
        let line = record(r#"{"table":"trade","data":[]}"#).ndjson_line();
        assert_eq!(
            &line[..],
            br#"{"localTimestamp":"2019-06-01T00:00:01.250Z","message":{"table":"trade","data":[]}}
"#
        );
        let parsed: serde_json::Value = serde_json::from_slice(&line).unwrap();
        assert_eq!(parsed["message"]["table"], "trade");
    }

    #[test]
    fn envelope_is_valid_json() {
        let frame = record(r#"{"a":1}"#).envelope("deribit");
        let parsed: serde_json::Value = serde_json::from_slice(&frame).unwrap();
        assert_eq!(parsed["exchange"], "deribit");
        assert_eq!(parsed["localTimestamp"], "2019-06-01T00:00:01.250Z");
        assert_eq!(parsed["message"]["a"], 1);
    }

    #[test]
    fn whole_seconds_have_no_fraction() {
        let ts = Utc.with_ymd_and_hms(2020, 1, 1, 12, 0, 0).unwrap();
        assert_eq!(format_timestamp(ts), "2020-01-01T12:00:00Z");
    }
}
