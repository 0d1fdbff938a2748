use std::fs;
use std::path::Path;

use assert_matches::assert_matches;
use futures::StreamExt;
use rewind_core::{Filter, Record, ReplayRequest, ReplaySource, ReplayWindow, SourceError};
use rewind_sources::FileReplaySource;

fn write(root: &Path, exchange: &str, channel: &str, symbol: &str, lines: &[&str]) {
    let dir = root.join(exchange).join(channel);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(format!("{symbol}.ndjson")), lines.join("\n") + "\n").unwrap();
}

fn store() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "bitmex",
        "trade",
        "XBTUSD",
        &[
            r#"2019-06-01T00:00:00Z {"s":"XBTUSD","n":1}"#,
            r#"2019-06-01T00:00:02Z {"s":"XBTUSD","n":2}"#,
            r#"2019-06-01T00:00:04Z {"s":"XBTUSD","n":3}"#,
        ],
    );
    write(
        dir.path(),
        "bitmex",
        "trade",
        "ETHUSD",
        &[
            r#"2019-06-01T00:00:01Z {"s":"ETHUSD","n":1}"#,
            r#"2019-06-01T00:00:03Z {"s":"ETHUSD","n":2}"#,
        ],
    );
    write(
        dir.path(),
        "bitmex",
        "quote",
        "XBTUSD",
        &[r#"2019-06-01T00:00:02.5Z {"q":1}"#],
    );
    dir
}

fn window(from: &str, to: &str) -> ReplayWindow {
    ReplayWindow::parse("bitmex", from, to).unwrap()
}

async fn messages(source: &FileReplaySource, request: ReplayRequest) -> Vec<String> {
    source
        .open(&request)
        .map(|item| String::from_utf8(item.unwrap().message.to_vec()).unwrap())
        .collect()
        .await
}

#[tokio::test]
async fn symbol_files_are_merged_by_timestamp() {
    let dir = store();
    let source = FileReplaySource::new(dir.path());
    let request = ReplayRequest::new(
        window("2019-06-01", "2019-06-02"),
        vec![Filter::channel("trade")],
    );
    assert_eq!(
        messages(&source, request).await,
        [
            r#"{"s":"XBTUSD","n":1}"#,
            r#"{"s":"ETHUSD","n":1}"#,
            r#"{"s":"XBTUSD","n":2}"#,
            r#"{"s":"ETHUSD","n":2}"#,
            r#"{"s":"XBTUSD","n":3}"#,
        ]
    );
}

#[tokio::test]
async fn symbols_and_window_restrict_records() {
    let dir = store();
    let source = FileReplaySource::new(dir.path());
    let request = ReplayRequest::new(
        window("2019-06-01T00:00:01Z", "2019-06-01T00:00:04Z"),
        vec![
            Filter::with_symbols("trade", ["XBTUSD"]),
            Filter::with_symbols("quote", ["XBTUSD"]),
        ],
    );
    assert_eq!(
        messages(&source, request).await,
        [r#"{"s":"XBTUSD","n":2}"#, r#"{"q":1}"#]
    );
}

#[tokio::test]
async fn no_filters_selects_every_channel() {
    let dir = store();
    let source = FileReplaySource::new(dir.path());
    let request = ReplayRequest::new(window("2019-06-01", "2019-06-02"), vec![]);
    assert_eq!(messages(&source, request).await.len(), 6);
}

#[tokio::test]
async fn unknown_channel_yields_nothing() {
    let dir = store();
    let source = FileReplaySource::new(dir.path());
    let request = ReplayRequest::new(
        window("2019-06-01", "2019-06-02"),
        vec![Filter::channel("liquidation")],
    );
    assert!(messages(&source, request).await.is_empty());
}

#[tokio::test]
async fn malformed_line_ends_stream_with_decode_error() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "deribit",
        "trades",
        "BTC-PERPETUAL",
        &[r#"2019-06-01T00:00:00Z {"ok":true}"#, "garbage"],
    );
    let source = FileReplaySource::new(dir.path());
    let request = ReplayRequest::new(
        ReplayWindow::parse("deribit", "2019-06-01", "2019-06-02").unwrap(),
        vec![],
    );
    let items: Vec<Result<Record, SourceError>> = source.open(&request).collect().await;
    assert_eq!(items.len(), 2);
    assert!(items[0].is_ok());
    assert_matches!(&items[1], Err(SourceError::Decode { location, .. }) if location.ends_with(":2"));
}

#[tokio::test]
async fn stopping_early_does_not_require_draining() {
    let dir = store();
    let source = FileReplaySource::new(dir.path());
    let request = ReplayRequest::new(window("2019-06-01", "2019-06-02"), vec![]);
    let first: Vec<_> = source.open(&request).take(1).collect().await;
    assert_eq!(first.len(), 1);
}

/// Store rooted at `<tmp>/data` with a readable file next to it in `<tmp>/secret`.
fn store_with_sibling() -> (tempfile::TempDir, FileReplaySource) {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");
    write(
        &data,
        "bitmex",
        "trade",
        "XBTUSD",
        &[r#"2019-06-01T00:00:00Z {"n":1}"#],
    );
    let secret = dir.path().join("secret");
    fs::create_dir_all(&secret).unwrap();
    fs::write(
        secret.join("x.ndjson"),
        "2019-06-01T00:00:00Z {\"leak\":true}\n",
    )
    .unwrap();
    (dir, FileReplaySource::new(data))
}

async fn rejected(source: &FileReplaySource, request: ReplayRequest) {
    let items: Vec<Result<Record, SourceError>> = source.open(&request).collect().await;
    assert_eq!(items.len(), 1, "expected a single error, got {items:?}");
    assert_matches!(&items[0], Err(SourceError::InvalidRequest(_)));
}

#[tokio::test]
async fn channel_outside_data_dir_is_rejected() {
    let (_dir, source) = store_with_sibling();
    for channel in ["../../secret", "..", ".", "", "trade/../../..", "a\\b", "tr\0ade"] {
        let request = ReplayRequest::new(
            window("2019-06-01", "2019-06-02"),
            vec![Filter::channel(channel)],
        );
        rejected(&source, request).await;
    }
}

#[tokio::test]
async fn exchange_outside_data_dir_is_rejected() {
    let (_dir, source) = store_with_sibling();
    for exchange in ["..", "../secret", "bitmex/../../secret"] {
        let request = ReplayRequest::new(
            ReplayWindow::parse(exchange, "2019-06-01", "2019-06-02").unwrap(),
            vec![Filter::channel("secret")],
        );
        rejected(&source, request).await;
    }
}

#[tokio::test]
async fn dot_symbols_are_rejected() {
    let (_dir, source) = store_with_sibling();
    for symbol in ["..", ".", "", "XBT\0USD"] {
        let request = ReplayRequest::new(
            window("2019-06-01", "2019-06-02"),
            vec![Filter::with_symbols("trade", [symbol])],
        );
        rejected(&source, request).await;
    }
}

#[tokio::test]
async fn symbol_separators_never_leave_the_channel_dir() {
    let (dir, source) = store_with_sibling();
    let request = ReplayRequest::new(
        window("2019-06-01", "2019-06-02"),
        vec![Filter::with_symbols("trade", ["../../../secret/x"])],
    );
    assert!(messages(&source, request).await.is_empty());
    write(
        &dir.path().join("data"),
        "bitmex",
        "trade",
        ".._.._.._secret_x",
        &[r#"2019-06-01T00:00:01Z {"n":2}"#],
    );
    let request = ReplayRequest::new(
        window("2019-06-01", "2019-06-02"),
        vec![Filter::with_symbols("trade", ["../../../secret/x"])],
    );
    assert_eq!(messages(&source, request).await, [r#"{"n":2}"#]);
}
