//! Replay sessions.
//!
//! A session groups the connections that asked for the same replay while it
//! was pending. Membership freezes when the grace period ends; from then on
//! one task drives every member until the data is exhausted or something
//! fails.
//!
//! Lifecycle: `Pending → Started → Closing → Closed`, tracked as an explicit
//! phase behind a lock and checked on every mutation.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use parking_lot::Mutex;
use rewind_core::{RecordStream, ReplaySource, ReplayWindow};
use tracing::{debug, info, warn};

use crate::connection::Connection;
use crate::coordinator::SessionConfig;
use crate::delivery::{Delivery, DeliveryConfig, DeliveryLoop, Framing};
use crate::errors::{ReplayError, Result};
use crate::metrics::{RECORDS_SENT_TOTAL, REPLAY_SESSIONS_STARTED_TOTAL};

/// How connections are grouped into sessions.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SessionKey {
    /// Same venue and window.
    Window(ReplayWindow),
    /// Client-chosen session name; may span venues.
    Named(String),
}

impl SessionKey {
    /// Key for a connection: the explicit name if one was given, otherwise
    /// its window.
    pub fn for_connection(window: &ReplayWindow, session: Option<&str>) -> Self {
        match session.map(str::trim).filter(|s| !s.is_empty()) {
            Some(name) => Self::Named(name.to_string()),
            None => Self::Window(window.clone()),
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Window(window) => write!(f, "{window}"),
            Self::Named(name) => write!(f, "session {name}"),
        }
    }
}

/// Public view of a session's lifecycle phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Accepting connections.
    Pending,
    /// Membership frozen, records flowing.
    Started,
    /// Delivery over, connections being closed.
    Closing,
    /// Every connection closed.
    Closed,
}

impl SessionState {
    /// Lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Started => "started",
            Self::Closing => "closing",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

enum Phase {
    Pending(Vec<Arc<Connection>>),
    Started,
    Closing,
    Closed,
}

/// A group of connections replayed together.
pub struct ReplaySession {
    key: SessionKey,
    phase: Mutex<Phase>,
}

impl fmt::Debug for ReplaySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplaySession")
            .field("key", &self.key)
            .field("state", &self.state())
            .finish()
    }
}

impl ReplaySession {
    /// Empty pending session.
    pub fn new(key: SessionKey) -> Self {
        Self {
            key,
            phase: Mutex::new(Phase::Pending(Vec::new())),
        }
    }

    /// Session key.
    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    /// Current phase.
    pub fn state(&self) -> SessionState {
        match *self.phase.lock() {
            Phase::Pending(_) => SessionState::Pending,
            Phase::Started => SessionState::Started,
            Phase::Closing => SessionState::Closing,
            Phase::Closed => SessionState::Closed,
        }
    }

    /// Members registered so far; zero once started.
    pub fn pending_members(&self) -> usize {
        match &*self.phase.lock() {
            Phase::Pending(members) => members.len(),
            _ => 0,
        }
    }

    /// Add a connection. Fails with [`ReplayError::LateJoin`] unless pending.
    pub fn try_join(&self, connection: Arc<Connection>) -> Result<()> {
        match &mut *self.phase.lock() {
            Phase::Pending(members) => {
                members.push(connection);
                Ok(())
            }
            _ => Err(ReplayError::LateJoin),
        }
    }

    /// Freeze membership. Returns the members the first time, nothing after.
    fn begin(&self) -> Vec<Arc<Connection>> {
        let mut phase = self.phase.lock();
        match std::mem::replace(&mut *phase, Phase::Started) {
            Phase::Pending(members) => members,
            other => {
                *phase = other;
                Vec::new()
            }
        }
    }

    fn set_phase(&self, next: Phase) {
        *self.phase.lock() = next;
    }

    /// Start the session and drive it to completion.
    ///
    /// Connections without subscriptions are closed with an error and left
    /// out; the rest share the session's outcome. Returns that outcome for
    /// logging; it has already been reported to every client.
    pub async fn run(&self, source: &dyn ReplaySource, config: &SessionConfig) -> Result<()> {
        let members = self.begin();
        let mut valid = Vec::with_capacity(members.len());
        let mut rejected = None;
        for connection in members {
            match connection.mark_replay_starting() {
                Ok(()) => valid.push(connection),
                Err(err) => {
                    warn!(session = %self.key, connection = %connection.id(), error = %err, "closing connection without subscriptions");
                    connection.close(Some(&err));
                    rejected = Some(err);
                }
            }
        }

        let outcome = match valid.len() {
            0 => Err(rejected.unwrap_or_else(|| {
                ReplayError::InvalidOptions("session started without connections".into())
            })),
            1 => {
                metrics::counter!(REPLAY_SESSIONS_STARTED_TOTAL, "mode" => "single").increment(1);
                info!(session = %self.key, "replay session started");
                run_single(&valid[0], source, config).await
            }
            n => {
                metrics::counter!(REPLAY_SESSIONS_STARTED_TOTAL, "mode" => "synchronized")
                    .increment(1);
                info!(session = %self.key, connections = n, "synchronized replay session started");
                run_synchronized(&valid, source, config).await
            }
        };

        self.set_phase(Phase::Closing);
        close_all(&valid, outcome.as_ref().err(), config).await;
        self.set_phase(Phase::Closed);
        match &outcome {
            Ok(()) => info!(session = %self.key, "replay session finished"),
            Err(err) => warn!(session = %self.key, error = %err, "replay session failed"),
        }
        outcome
    }
}

async fn run_single(
    connection: &Connection,
    source: &dyn ReplaySource,
    config: &SessionConfig,
) -> Result<()> {
    let stream = source.open(&connection.replay_request());
    let delivery = DeliveryLoop::new(
        connection.transport(),
        DeliveryConfig::replay(config.backpressure_poll, config.batch_size),
    );
    match delivery.run(stream, &Framing::Raw).await? {
        Delivery::Open => {}
        Delivery::Detached => debug!(connection = %connection.id(), "client left during replay"),
    }
    Ok(())
}

struct Lane<'a> {
    connection: &'a Connection,
    stream: RecordStream,
    delivery: DeliveryLoop<'a>,
    last: Option<DateTime<Utc>>,
    done: bool,
}

impl Lane<'_> {
    async fn deliver(&mut self, message: Bytes, ts: DateTime<Utc>) -> Result<()> {
        match self.delivery.send_frame(message).await? {
            Delivery::Open => {
                metrics::counter!(RECORDS_SENT_TOTAL, "route" => "ws-replay").increment(1);
                self.last = Some(ts);
            }
            Delivery::Detached => {
                debug!(connection = %self.connection.id(), "client left, dropping lane");
                self.done = true;
            }
        }
        Ok(())
    }

    /// Deliver records up to and including the first one later than `until`.
    /// Skipped while the lane already leads `until`.
    async fn catch_up(&mut self, until: DateTime<Utc>) -> Result<()> {
        if self.last.is_some_and(|last| last > until) {
            return Ok(());
        }
        while !self.done {
            match self.stream.next().await {
                None => self.done = true,
                Some(Err(err)) => return Err(err.into()),
                Some(Ok(record)) => {
                    let ts = record.local_timestamp;
                    self.deliver(record.message, ts).await?;
                    if ts > until {
                        break;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Drive several connections so none runs more than one record ahead of the
/// primary's clock.
///
/// The primary is the first unfinished lane. When it runs out (or its client
/// leaves) the next lane takes over so the rest still drain.
async fn run_synchronized(
    connections: &[Arc<Connection>],
    source: &dyn ReplaySource,
    config: &SessionConfig,
) -> Result<()> {
    let delivery_config =
        DeliveryConfig::replay(config.backpressure_poll, config.batch_size).unbatched();
    let mut lanes: Vec<Lane<'_>> = connections
        .iter()
        .map(|connection| Lane {
            connection,
            stream: source.open(&connection.replay_request()),
            delivery: DeliveryLoop::new(connection.transport(), delivery_config),
            last: None,
            done: false,
        })
        .collect();

    loop {
        let next = lanes.iter().position(|lane| !lane.done);
        let Some(primary) = next else {
            break;
        };
        let until = match lanes[primary].stream.next().await {
            None => {
                lanes[primary].done = true;
                continue;
            }
            Some(Err(err)) => return Err(err.into()),
            Some(Ok(record)) => {
                let ts = record.local_timestamp;
                lanes[primary].deliver(record.message, ts).await?;
                ts
            }
        };
        for lane in lanes.iter_mut().skip(primary + 1).filter(|lane| !lane.done) {
            lane.catch_up(until).await?;
        }
    }
    Ok(())
}

async fn close_all(
    connections: &[Arc<Connection>],
    error: Option<&ReplayError>,
    config: &SessionConfig,
) {
    match error {
        Some(err) => {
            for connection in connections {
                connection.close(Some(err));
            }
        }
        None => {
            for connection in connections {
                DeliveryLoop::new(connection.transport(), DeliveryConfig::default())
                    .wait_for_drain(config.close_drain_poll)
                    .await;
                connection.close(None);
            }
        }
    }
}
