//! End-to-end session scenarios over an in-memory source and a recording
//! transport that logs every delivery in global order.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use assert_matches::assert_matches;
use bytes::Bytes;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use rewind_core::{
    Record, RecordStream, ReplayRequest, ReplaySource, ReplayWindow, SourceError,
};
use rewind_replay::{
    Closure, Connection, ReplayError, SessionConfig, SessionCoordinator, SessionKey, Transport,
};
use serde_json::{Value, json};

/// Trades at the given seconds, per symbol, optionally paced in real time.
struct Trades {
    trades: Vec<(&'static str, u32)>,
    pace: Duration,
}

impl ReplaySource for Trades {
    fn open(&self, request: &ReplayRequest) -> RecordStream {
        let records: Vec<Result<Record, SourceError>> = self
            .trades
            .iter()
            .filter(|(symbol, _)| request.filters.iter().any(|f| f.matches("trade", symbol)))
            .map(|(symbol, second)| {
                let ts = Utc.with_ymd_and_hms(2019, 6, 1, 0, 0, *second).unwrap();
                let message = json!({"table": "trade", "symbol": symbol, "second": second});
                Record::new(ts, message.to_string())
            })
            .filter(|record| request.window.contains(record.local_timestamp))
            .map(Ok)
            .collect();
        let pace = self.pace;
        Box::pin(async_stream::stream! {
            for record in records {
                if !pace.is_zero() {
                    tokio::time::sleep(pace).await;
                }
                yield record;
            }
        })
    }
}

type Log = Arc<Mutex<Vec<(&'static str, u64)>>>;

struct Recording {
    name: &'static str,
    log: Log,
    closure: Mutex<Option<Closure>>,
    closed: AtomicBool,
    fault: Mutex<Option<String>>,
}

impl Recording {
    fn new(name: &'static str, log: &Log) -> Arc<Self> {
        Arc::new(Self {
            name,
            log: Arc::clone(log),
            closure: Mutex::new(None),
            closed: AtomicBool::new(false),
            fault: Mutex::new(None),
        })
    }

    fn closure(&self) -> Option<Closure> {
        self.closure.lock().clone()
    }
}

impl Transport for Recording {
    fn send(&self, frame: Bytes) -> bool {
        let message: Value = serde_json::from_slice(&frame).unwrap();
        self.log
            .lock()
            .push((self.name, message["second"].as_u64().unwrap()));
        true
    }

    fn buffered_amount(&self) -> usize {
        0
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn error(&self) -> Option<String> {
        self.fault.lock().clone()
    }

    fn close(&self, closure: Closure) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            *self.closure.lock() = Some(closure);
        }
    }
}

fn window() -> ReplayWindow {
    ReplayWindow::parse("bitmex", "2019-06-01T00:00:00Z", "2019-06-01T01:00:00Z").unwrap()
}

fn subscribed(transport: &Arc<Recording>, symbol: &str) -> Arc<Connection> {
    let connection = Connection::new(window(), Arc::clone(transport) as Arc<dyn Transport>).unwrap();
    let message = json!({"op": "subscribe", "args": [format!("trade:{symbol}")]});
    let _ = connection.on_control_message(message.to_string().as_bytes());
    Arc::new(connection)
}

fn coordinator(trades: Vec<(&'static str, u32)>) -> SessionCoordinator {
    paced_coordinator(trades, Duration::ZERO)
}

fn paced_coordinator(trades: Vec<(&'static str, u32)>, pace: Duration) -> SessionCoordinator {
    SessionCoordinator::new(Arc::new(Trades { trades, pace }), SessionConfig::default())
}

async fn until_idle(coordinator: &SessionCoordinator) {
    while coordinator.active_sessions() > 0 {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

fn interleaved() -> Vec<(&'static str, u32)> {
    let mut trades = Vec::new();
    for s in [1, 3, 5, 7, 9] {
        trades.push(("XBTUSD", s));
    }
    for s in [0, 2, 2, 4, 6, 8, 10, 11] {
        trades.push(("ETHUSD", s));
    }
    trades.sort_by_key(|(_, s)| *s);
    trades
}

#[tokio::test(start_paused = true)]
async fn two_connections_stay_within_one_record_of_the_primary() {
    let log = Log::default();
    let coordinator = coordinator(interleaved());
    let a = Recording::new("a", &log);
    let b = Recording::new("b", &log);
    let key = SessionKey::Window(window());
    let _ = coordinator.join(key.clone(), subscribed(&a, "XBTUSD")).unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    let _ = coordinator.join(key, subscribed(&b, "ETHUSD")).unwrap();

    until_idle(&coordinator).await;

    assert_eq!(
        *log.lock(),
        vec![
            ("a", 1),
            ("b", 0),
            ("b", 2),
            ("a", 3),
            ("b", 2),
            ("b", 4),
            ("a", 5),
            ("b", 6),
            ("a", 7),
            ("b", 8),
            ("a", 9),
            ("b", 10),
            ("b", 11),
        ]
    );
    assert_eq!(a.closure(), Some(Closure::normal("WS replay finished")));
    assert_eq!(b.closure(), Some(Closure::normal("WS replay finished")));
}

#[tokio::test(start_paused = true)]
async fn follower_lead_never_exceeds_one_record() {
    let log = Log::default();
    let mut trades: Vec<(&'static str, u32)> = (0..40).map(|s| ("ETHUSD", s)).collect();
    trades.extend([("XBTUSD", 10), ("XBTUSD", 20), ("XBTUSD", 30), ("XBTUSD", 50)]);
    let coordinator = coordinator(trades);
    let a = Recording::new("a", &log);
    let b = Recording::new("b", &log);
    let key = SessionKey::Window(window());
    let _ = coordinator.join(key.clone(), subscribed(&a, "XBTUSD")).unwrap();
    let _ = coordinator.join(key, subscribed(&b, "ETHUSD")).unwrap();
    until_idle(&coordinator).await;

    let log = log.lock();
    let mut primary = None;
    let mut ahead = 0;
    for (name, second) in log.iter() {
        if *name == "a" {
            primary = Some(*second);
            ahead = 0;
        } else if primary.is_some_and(|p| *second > p) {
            ahead += 1;
            assert!(ahead <= 1, "follower ran ahead at {second}");
        }
    }
    assert_eq!(log.iter().filter(|(n, _)| *n == "b").count(), 40);
}

#[tokio::test(start_paused = true)]
async fn connection_without_subscriptions_closes_with_error() {
    let log = Log::default();
    let coordinator = coordinator(interleaved());
    let silent = Recording::new("silent", &log);
    let connection = Connection::new(window(), Arc::clone(&silent) as Arc<dyn Transport>).unwrap();
    let _ = coordinator
        .join(SessionKey::Window(window()), Arc::new(connection))
        .unwrap();

    until_idle(&coordinator).await;

    assert!(log.lock().is_empty());
    let closure = silent.closure().unwrap();
    assert_eq!(closure.code, 1011);
    assert!(closure.reason.starts_with("No subscriptions received for websocket connection"));
}

#[tokio::test(start_paused = true)]
async fn late_joiner_is_refused_and_never_served() {
    let log = Log::default();
    let coordinator = paced_coordinator(interleaved(), Duration::from_secs(1));
    let a = Recording::new("a", &log);
    let key = SessionKey::Named("late".into());
    let _ = coordinator.join(key.clone(), subscribed(&a, "XBTUSD")).unwrap();

    tokio::time::sleep(coordinator.config().start_delay + Duration::from_millis(10)).await;
    let late = Recording::new("late", &log);
    assert_matches!(
        coordinator.join(key, subscribed(&late, "ETHUSD")),
        Err(ReplayError::LateJoin)
    );
    assert_eq!(late.closure(), None);
    until_idle(&coordinator).await;
    assert!(log.lock().iter().all(|(name, _)| *name == "a"));
}

#[tokio::test(start_paused = true)]
async fn departed_client_does_not_stop_its_peer() {
    let log = Log::default();
    let coordinator = coordinator(interleaved());
    let a = Recording::new("a", &log);
    let b = Recording::new("b", &log);
    let key = SessionKey::Window(window());
    let _ = coordinator.join(key.clone(), subscribed(&a, "XBTUSD")).unwrap();
    let _ = coordinator.join(key, subscribed(&b, "ETHUSD")).unwrap();
    a.closed.store(true, Ordering::SeqCst);

    until_idle(&coordinator).await;

    let log = log.lock();
    assert!(log.iter().all(|(name, _)| *name == "b"));
    assert_eq!(log.len(), 8);
    assert_eq!(a.closure(), None);
    assert_eq!(b.closure().unwrap().code, 1000);
}

#[tokio::test(start_paused = true)]
async fn transport_fault_fails_the_whole_session() {
    let log = Log::default();
    let coordinator = coordinator(interleaved());
    let a = Recording::new("a", &log);
    let b = Recording::new("b", &log);
    let key = SessionKey::Window(window());
    let _ = coordinator.join(key.clone(), subscribed(&a, "XBTUSD")).unwrap();
    let _ = coordinator.join(key, subscribed(&b, "ETHUSD")).unwrap();
    *b.fault.lock() = Some("connection reset".into());

    until_idle(&coordinator).await;

    let expected = Closure::new(1011, "transport error: connection reset");
    assert_eq!(a.closure(), Some(expected.clone()));
    assert_eq!(b.closure(), Some(expected));
}
