//! Local NDJSON record store.
//!
//! Each line is `<rfc3339 localTimestamp> <raw venue message>`, lines in
//! timestamp order. Symbol files are merged by timestamp at read time.
//! Reading is lazy: nothing past the consumer's last pull is read.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use rewind_core::filter::merge_filters;
use rewind_core::merge::merge_by_timestamp;
use rewind_core::record::format_timestamp;
use rewind_core::{
    Filter, Record, RecordStream, ReplayRequest, ReplaySource, ReplayWindow, SourceError,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

const EXTENSION: &str = "ndjson";

/// Historical source backed by a directory tree.
#[derive(Clone, Debug)]
pub struct FileReplaySource {
    root: PathBuf,
}

impl FileReplaySource {
    /// Source rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File holding `symbol` records of `channel` on `exchange`.
    ///
    /// Path separators inside symbols are replaced with `_`. Exchange and
    /// channel names must be plain path components.
    pub fn file_path(
        &self,
        exchange: &str,
        channel: &str,
        symbol: &str,
    ) -> Result<PathBuf, SourceError> {
        let sanitized = sanitize(symbol);
        let symbol = component("symbol", &sanitized)?;
        Ok(self
            .root
            .join(component("exchange", exchange)?)
            .join(component("channel", channel)?)
            .join(format!("{symbol}.{EXTENSION}")))
    }
}

fn sanitize(symbol: &str) -> String {
    symbol.replace(['/', '\\'], "_")
}

/// `value` if it names exactly one entry inside its parent directory.
fn component<'a>(kind: &str, value: &'a str) -> Result<&'a str, SourceError> {
    let plain = !value.is_empty()
        && value != "."
        && value != ".."
        && !value.contains(['/', '\\', '\0']);
    if plain {
        Ok(value)
    } else {
        Err(SourceError::InvalidRequest(format!(
            "invalid {kind} name '{}'",
            value.escape_default()
        )))
    }
}

/// One store line for `record`, newline included.
pub fn encode_line(record: &Record) -> Vec<u8> {
    let ts = format_timestamp(record.local_timestamp);
    let mut line = Vec::with_capacity(ts.len() + record.message.len() + 2);
    line.extend_from_slice(ts.as_bytes());
    line.push(b' ');
    line.extend_from_slice(&record.message);
    line.push(b'\n');
    line
}

impl ReplaySource for FileReplaySource {
    fn open(&self, request: &ReplayRequest) -> RecordStream {
        Box::pin(replay(self.clone(), request.clone()))
    }
}

fn replay(
    source: FileReplaySource,
    request: ReplayRequest,
) -> impl Stream<Item = Result<Record, SourceError>> + Send {
    async_stream::try_stream! {
        let files = discover(&source, &request).await?;
        debug!(window = %request.window, files = files.len(), "opening replay files");
        let window = request.window;
        let streams = files
            .into_iter()
            .map(|path| Box::pin(read_file(path, window.clone())) as RecordStream)
            .collect();
        let mut merged = merge_by_timestamp(streams);
        while let Some(record) = merged.next().await {
            yield record?;
        }
    }
}

async fn discover(
    source: &FileReplaySource,
    request: &ReplayRequest,
) -> Result<Vec<PathBuf>, SourceError> {
    let exchange = &request.window.exchange;
    let venue_dir = source.root.join(component("exchange", exchange)?);
    if !tokio::fs::try_exists(&venue_dir).await? {
        return Err(SourceError::NotFound(format!("no stored data for {exchange}")));
    }

    let filters = if request.filters.is_empty() {
        list_dir(&venue_dir, true)
            .await?
            .into_iter()
            .filter_map(|dir| dir.file_name()?.to_str().map(Filter::channel))
            .collect()
    } else {
        merge_filters(&request.filters)
    };

    let mut files = Vec::new();
    for filter in filters {
        let channel_dir = venue_dir.join(component("channel", &filter.channel)?);
        if !tokio::fs::try_exists(&channel_dir).await? {
            debug!(%exchange, channel = %filter.channel, "no stored data for channel");
            continue;
        }
        match &filter.symbols {
            None => files.extend(
                list_dir(&channel_dir, false)
                    .await?
                    .into_iter()
                    .filter(|p| p.extension().is_some_and(|e| e == EXTENSION)),
            ),
            Some(symbols) => {
                for symbol in symbols {
                    let path = source.file_path(exchange, &filter.channel, symbol)?;
                    if tokio::fs::try_exists(&path).await? {
                        files.push(path);
                    }
                }
            }
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

async fn list_dir(dir: &Path, dirs: bool) -> Result<Vec<PathBuf>, SourceError> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut out = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir() == dirs {
            out.push(entry.path());
        }
    }
    out.sort();
    Ok(out)
}

fn read_file(
    path: PathBuf,
    window: ReplayWindow,
) -> impl Stream<Item = Result<Record, SourceError>> + Send {
    async_stream::try_stream! {
        let file = tokio::fs::File::open(&path).await?;
        let mut lines = BufReader::new(file).lines();
        let mut number = 0usize;
        while let Some(line) = lines.next_line().await? {
            number += 1;
            if line.trim().is_empty() {
                continue;
            }
            let record = parse_line(&line).map_err(|reason| SourceError::Decode {
                location: format!("{}:{number}", path.display()),
                reason,
            })?;
            if record.local_timestamp < window.from {
                continue;
            }
            if record.local_timestamp >= window.to {
                break;
            }
            yield record;
        }
    }
}

fn parse_line(line: &str) -> Result<Record, String> {
    let (ts, message) = line
        .split_once(' ')
        .ok_or_else(|| "expected '<timestamp> <message>'".to_string())?;
    let ts = DateTime::parse_from_rfc3339(ts)
        .map_err(|e| format!("invalid timestamp '{ts}': {e}"))?
        .with_timezone(&Utc);
    let message = message.trim();
    if message.is_empty() {
        return Err("empty message".into());
    }
    Ok(Record::new(ts, Bytes::copy_from_slice(message.as_bytes())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::TimeZone;

    #[test]
    fn parses_store_lines() {
        let record = parse_line(r#"2019-06-01T00:00:01.5Z {"a":1}"#).unwrap();
        assert_eq!(
            record.local_timestamp,
            Utc.with_ymd_and_hms(2019, 6, 1, 0, 0, 1).unwrap() + chrono::Duration::milliseconds(500)
        );
        assert_eq!(&record.message[..], br#"{"a":1}"#);
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(parse_line("no-separator").is_err());
        assert!(parse_line("yesterday {}").is_err());
        assert!(parse_line("2019-06-01T00:00:00Z  ").is_err());
    }

    #[test]
    fn encode_round_trips_through_parse() {
        let record = Record::new(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(), "{}");
        let line = String::from_utf8(encode_line(&record)).unwrap();
        assert_eq!(line, "2020-01-01T00:00:00Z {}\n");
        assert_eq!(parse_line(line.trim_end()).unwrap(), record);
    }

    #[test]
    fn symbols_with_separators_stay_in_channel_dir() {
        let source = FileReplaySource::new("/data");
        assert_eq!(
            source.file_path("kraken", "trade", "XBT/USD").unwrap(),
            PathBuf::from("/data/kraken/trade/XBT_USD.ndjson")
        );
    }

    #[test]
    fn traversal_components_are_rejected() {
        let source = FileReplaySource::new("/data");
        for (exchange, channel, symbol) in [
            ("..", "trade", "XBTUSD"),
            ("bitmex", "../../etc", "XBTUSD"),
            ("bitmex", ".", "XBTUSD"),
            ("bitmex", "", "XBTUSD"),
            ("bit\\mex", "trade", "XBTUSD"),
            ("bitmex", "trade", ".."),
            ("bitmex", "trade", "XBT\0USD"),
        ] {
            assert_matches!(
                source.file_path(exchange, channel, symbol),
                Err(SourceError::InvalidRequest(_)),
                "{exchange}/{channel}/{symbol}"
            );
        }
    }

    #[tokio::test]
    async fn missing_venue_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileReplaySource::new(dir.path());
        let window = ReplayWindow::parse("bitmex", "2019-06-01", "2019-06-02").unwrap();
        let mut stream = source.open(&ReplayRequest::new(window, vec![]));
        assert_matches!(stream.next().await, Some(Err(SourceError::NotFound(_))));
    }
}
