//! Outbound transport contract.
//!
//! A [`Transport`] accepts frames without blocking and reports how much it
//! still holds. [`ChannelTransport`] implements it over an unbounded channel
//! with byte accounting; the receiving half is pumped into a socket or an
//! HTTP body by the server and acknowledges bytes once they are written.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::errors::Closure;

/// Sink for outbound frames.
pub trait Transport: Send + Sync {
    /// Queue one frame. Never blocks.
    ///
    /// Returns `true` if the buffer stayed within its limit after the write,
    /// `false` if the caller should wait for it to drain (or the transport is
    /// closed).
    fn send(&self, frame: Bytes) -> bool;

    /// Bytes accepted but not yet written out.
    fn buffered_amount(&self) -> usize;

    /// Whether the transport is closed, by either side.
    fn is_closed(&self) -> bool;

    /// The fault that broke the transport, if any.
    fn error(&self) -> Option<String>;

    /// Terminate with `closure`. Closing twice is a no-op.
    fn close(&self, closure: Closure);
}

/// Item delivered to the pump.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outbound {
    /// Data to write.
    Frame(Bytes),
    /// Final message; nothing follows.
    Close(Closure),
}

struct Shared {
    buffered: AtomicUsize,
    high_water: usize,
    close_sent: AtomicBool,
    closed: CancellationToken,
    error: Mutex<Option<String>>,
}

impl Shared {
    fn fail(&self, error: String) {
        let mut slot = self.error.lock();
        if slot.is_none() {
            *slot = Some(error);
        }
        drop(slot);
        self.closed.cancel();
    }
}

/// Producer half of a channel-backed transport.
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<Outbound>,
    shared: Arc<Shared>,
}

/// Consumer half, owned by the task writing to the real sink.
///
/// Dropping it closes the transport.
pub struct OutboundReceiver {
    rx: mpsc::UnboundedReceiver<Outbound>,
    shared: Arc<Shared>,
}

/// Create a transport whose `send` reports backpressure once more than
/// `high_water` bytes are outstanding.
pub fn channel(high_water: usize) -> (ChannelTransport, OutboundReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let shared = Arc::new(Shared {
        buffered: AtomicUsize::new(0),
        high_water,
        close_sent: AtomicBool::new(false),
        closed: CancellationToken::new(),
        error: Mutex::new(None),
    });
    (
        ChannelTransport {
            tx,
            shared: Arc::clone(&shared),
        },
        OutboundReceiver { rx, shared },
    )
}

impl ChannelTransport {
    /// Record that the remote side went away. Not an error.
    pub fn peer_closed(&self) {
        self.shared.closed.cancel();
    }

    /// Resolves once the transport is closed.
    pub async fn closed(&self) {
        self.shared.closed.cancelled().await;
    }
}

impl Transport for ChannelTransport {
    fn send(&self, frame: Bytes) -> bool {
        if self.shared.closed.is_cancelled() {
            return false;
        }
        let len = frame.len();
        let buffered = self.shared.buffered.fetch_add(len, Ordering::AcqRel) + len;
        if self.tx.send(Outbound::Frame(frame)).is_err() {
            let _ = self.shared.buffered.fetch_sub(len, Ordering::AcqRel);
            self.shared.closed.cancel();
            return false;
        }
        buffered <= self.shared.high_water
    }

    fn buffered_amount(&self) -> usize {
        self.shared.buffered.load(Ordering::Acquire)
    }

    fn is_closed(&self) -> bool {
        self.shared.closed.is_cancelled()
    }

    fn error(&self) -> Option<String> {
        self.shared.error.lock().clone()
    }

    fn close(&self, closure: Closure) {
        if self.shared.close_sent.swap(true, Ordering::AcqRel) {
            return;
        }
        if !self.shared.closed.is_cancelled() {
            let _ = self.tx.send(Outbound::Close(closure));
        }
        self.shared.closed.cancel();
    }
}

impl OutboundReceiver {
    /// Next item to write. `None` once the producer is gone.
    pub async fn recv(&mut self) -> Option<Outbound> {
        self.rx.recv().await
    }

    /// Mark `len` bytes as written to the sink.
    pub fn ack(&self, len: usize) {
        let _ = self
            .shared
            .buffered
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |b| {
                Some(b.saturating_sub(len))
            });
    }

    /// Record a write failure. The producer sees it through
    /// [`Transport::error`] before its next send.
    pub fn fail(&self, error: impl Into<String>) {
        self.shared.fail(error.into());
    }

    /// Record that the remote side went away.
    pub fn peer_closed(&self) {
        self.shared.closed.cancel();
    }

    /// Whether the transport is closed.
    pub fn is_closed(&self) -> bool {
        self.shared.closed.is_cancelled()
    }

    /// Resolves once the transport is closed.
    pub async fn closed(&self) {
        self.shared.closed.cancelled().await;
    }
}

impl Drop for OutboundReceiver {
    fn drop(&mut self) {
        self.shared.closed.cancel();
    }
}
