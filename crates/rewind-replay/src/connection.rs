//! One replay client.
//!
//! A connection collects filters from the client's native subscribe messages
//! until its session starts. From then on its filter list is frozen and any
//! further control message is ignored.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use parking_lot::Mutex;
use rewind_core::{Filter, ReplayRequest, ReplayWindow};
use rewind_mappers::{MappingError, SubscriptionMapper, mapper_for};
use tracing::{debug, warn};

use crate::delivery::Health;
use crate::errors::{Closure, REPLAY_FINISHED, ReplayError, Result};
use crate::transport::Transport;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique connection identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Allocate the next identifier.
    pub fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// What happened to an inbound control message.
#[derive(Debug, PartialEq, Eq)]
pub enum ControlOutcome {
    /// Recognized as a subscription; `added` filters were appended.
    Subscribed {
        /// Filters appended by this message.
        added: usize,
    },
    /// Not valid JSON.
    NotJson,
    /// Valid JSON but not a subscribe request for this venue.
    NotSubscribe,
    /// Arrived after replay started.
    AfterStart,
    /// Recognized but could not be translated.
    Unmappable(MappingError),
}

#[derive(Default)]
struct State {
    filters: Vec<Filter>,
    subscriptions: usize,
    started: bool,
}

/// A client transport bound to one replay window.
pub struct Connection {
    id: ConnectionId,
    window: ReplayWindow,
    mapper: &'static dyn SubscriptionMapper,
    state: Mutex<State>,
    transport: Arc<dyn Transport>,
}

impl Connection {
    /// Bind `transport` to `window`. Fails for venues without a mapper.
    pub fn new(window: ReplayWindow, transport: Arc<dyn Transport>) -> Result<Self> {
        let mapper =
            mapper_for(&window.exchange).ok_or_else(|| ReplayError::UnsupportedExchange {
                exchange: window.exchange.clone(),
                route: "/ws-replay",
            })?;
        Ok(Self {
            id: ConnectionId::next(),
            window,
            mapper,
            state: Mutex::new(State::default()),
            transport,
        })
    }

    /// Connection identifier.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Requested venue and window.
    pub fn window(&self) -> &ReplayWindow {
        &self.window
    }

    /// Underlying transport.
    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    /// Handle an inbound client frame. Never fails; unusable frames are
    /// logged and dropped.
    pub fn on_control_message(&self, raw: &[u8]) -> ControlOutcome {
        let Ok(message) = serde_json::from_slice::<serde_json::Value>(raw) else {
            debug!(connection = %self.id, "ignored non-JSON control message");
            return ControlOutcome::NotJson;
        };

        let mut state = self.state.lock();
        if state.started {
            debug!(connection = %self.id, "ignored control message after replay start");
            return ControlOutcome::AfterStart;
        }
        if !self.mapper.can_handle(&message, self.window.from) {
            debug!(connection = %self.id, %message, "ignored control message");
            return ControlOutcome::NotSubscribe;
        }
        match self.mapper.map(&message, self.window.from) {
            Ok(filters) => {
                let added = filters.len();
                debug!(connection = %self.id, %message, ?filters, "mapped subscribe message");
                state.filters.extend(filters);
                state.subscriptions += 1;
                ControlOutcome::Subscribed { added }
            }
            Err(err) => {
                warn!(connection = %self.id, %message, error = %err, "failed to map subscribe message");
                ControlOutcome::Unmappable(err)
            }
        }
    }

    /// Freeze the filter list. Fails when no subscription was received.
    pub fn mark_replay_starting(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.started = true;
        if state.subscriptions == 0 {
            return Err(ReplayError::NoSubscriptions {
                connection: self.id.to_string(),
                window: self.window.to_string(),
            });
        }
        Ok(())
    }

    /// Whether replay has started for this connection.
    pub fn is_started(&self) -> bool {
        self.state.lock().started
    }

    /// Number of subscribe messages accepted so far.
    pub fn subscription_count(&self) -> usize {
        self.state.lock().subscriptions
    }

    /// Filters accumulated so far.
    pub fn filters(&self) -> Vec<Filter> {
        self.state.lock().filters.clone()
    }

    /// Source request for this connection's window and filters.
    pub fn replay_request(&self) -> ReplayRequest {
        ReplayRequest::new(self.window.clone(), self.filters())
    }

    /// Write a raw message. `false` means the transport is over its limit
    /// or closed.
    pub fn send_record(&self, message: Bytes) -> bool {
        self.transport.send(message)
    }

    /// Whether any outbound bytes are still buffered.
    pub fn is_backpressured(&self) -> bool {
        self.transport.buffered_amount() > 0
    }

    /// Whether the transport can still be written to.
    pub fn health(&self) -> Health {
        Health::of(self.transport.as_ref())
    }

    /// Close with `1000` when `error` is `None`, otherwise with the error's
    /// close code and message. Closing twice is a no-op.
    pub fn close(&self, error: Option<&ReplayError>) {
        if self.transport.is_closed() {
            return;
        }
        let closure = match error {
            None => {
                debug!(connection = %self.id, "closing connection");
                Closure::normal(REPLAY_FINISHED)
            }
            Some(err) => {
                debug!(connection = %self.id, error = %err, "closing connection with error");
                err.closure()
            }
        };
        self.transport.close(closure);
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.id, self.window)
    }
}
