//! Backpressure-aware delivery of record streams into a [`Transport`].
//!
//! Writes never block. When a write reports the buffer over its limit the
//! loop polls until the buffer is empty again, then continues. Under
//! [`BackpressurePolicy::Bounded`] the number of polls per wait is capped and
//! exceeding it fails with [`ReplayError::TooMuchBackpressure`].
//!
//! Before every write the transport is checked: a recorded fault becomes
//! [`ReplayError::Transport`], a plain close means the client left and the
//! loop stops with [`Delivery::Detached`].

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use rewind_core::constants::{
    FAST_PATH_BATCH_SIZE, MAX_BACKPRESSURE_RETRIES, REPLAY_BACKPRESSURE_POLL_MS,
    STREAM_BACKPRESSURE_POLL_MS,
};
use rewind_core::{Record, RecordStream};
use tracing::{debug, trace};

use crate::errors::{Closure, ReplayError, Result};
use crate::metrics::DELIVERY_BACKPRESSURE_WAITS_TOTAL;
use crate::transport::Transport;

/// How records are turned into outbound frames.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Framing {
    /// The venue message as-is.
    Raw,
    /// `{"localTimestamp","message"}` lines; a batch becomes one write.
    NdJson,
    /// `{"exchange","localTimestamp","message"}` for the given venue.
    Envelope(String),
}

impl Framing {
    /// Encode one record.
    pub fn frame(&self, record: &Record) -> Bytes {
        match self {
            Self::Raw => record.message.clone(),
            Self::NdJson => record.ndjson_line(),
            Self::Envelope(exchange) => record.envelope(exchange),
        }
    }

    fn concatenates(&self) -> bool {
        matches!(self, Self::NdJson)
    }
}

/// What to do while a client is slow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackpressurePolicy {
    /// Wait as long as it takes.
    Unbounded,
    /// Give up after `max_retries` polls in a single wait.
    Bounded {
        /// Polls tolerated per wait.
        max_retries: u32,
    },
}

/// Delivery loop tuning.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeliveryConfig {
    /// Interval between buffer checks while backpressured.
    pub poll_interval: Duration,
    /// Records written before the buffer is checked.
    pub batch_size: usize,
    /// Slow-client policy.
    pub policy: BackpressurePolicy,
}

impl DeliveryConfig {
    /// Replay delivery: unbounded waits, batched writes.
    pub fn replay(poll_interval: Duration, batch_size: usize) -> Self {
        Self {
            poll_interval,
            batch_size: batch_size.max(1),
            policy: BackpressurePolicy::Unbounded,
        }
    }

    /// Live delivery: one record per write, bounded waits.
    pub fn live(poll_interval: Duration, max_retries: u32) -> Self {
        Self {
            poll_interval,
            batch_size: 1,
            policy: BackpressurePolicy::Bounded { max_retries },
        }
    }

    /// Same settings, one record per write.
    #[must_use]
    pub fn unbatched(self) -> Self {
        Self {
            batch_size: 1,
            ..self
        }
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self::replay(
            Duration::from_millis(REPLAY_BACKPRESSURE_POLL_MS),
            FAST_PATH_BATCH_SIZE,
        )
    }
}

/// Default live settings.
pub fn default_live_config() -> DeliveryConfig {
    DeliveryConfig::live(
        Duration::from_millis(STREAM_BACKPRESSURE_POLL_MS),
        MAX_BACKPRESSURE_RETRIES,
    )
}

/// Outcome of a successful delivery step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// Transport still open.
    Open,
    /// Client went away; nothing more can be delivered.
    Detached,
}

/// Transport condition as seen by a producer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Health {
    /// Writable.
    Open,
    /// Closed without a fault.
    Closed,
    /// Broken by a fault.
    Faulted(String),
}

impl Health {
    /// Inspect `transport`.
    pub fn of(transport: &dyn Transport) -> Self {
        if let Some(err) = transport.error() {
            Self::Faulted(err)
        } else if transport.is_closed() {
            Self::Closed
        } else {
            Self::Open
        }
    }

    /// Map to a delivery outcome; faults become errors.
    pub fn into_delivery(self) -> Result<Delivery> {
        match self {
            Self::Open => Ok(Delivery::Open),
            Self::Closed => Ok(Delivery::Detached),
            Self::Faulted(err) => Err(ReplayError::Transport(err)),
        }
    }
}

/// Pushes frames into one transport, honoring backpressure.
pub struct DeliveryLoop<'a> {
    transport: &'a dyn Transport,
    config: DeliveryConfig,
}

impl<'a> DeliveryLoop<'a> {
    /// Loop over `transport`.
    pub fn new(transport: &'a dyn Transport, config: DeliveryConfig) -> Self {
        Self { transport, config }
    }

    /// Write one frame, waiting out backpressure afterwards.
    pub async fn send_frame(&self, frame: Bytes) -> Result<Delivery> {
        if Health::of(self.transport).into_delivery()? == Delivery::Detached {
            return Ok(Delivery::Detached);
        }
        if self.transport.send(frame) {
            return Ok(Delivery::Open);
        }
        self.await_drain().await
    }

    /// Write several frames, waiting out backpressure once at the end.
    pub async fn send_batch(&self, frames: Vec<Bytes>) -> Result<Delivery> {
        if frames.is_empty() {
            return Health::of(self.transport).into_delivery();
        }
        let mut saturated = false;
        for frame in frames {
            if Health::of(self.transport).into_delivery()? == Delivery::Detached {
                return Ok(Delivery::Detached);
            }
            saturated |= !self.transport.send(frame);
        }
        if saturated {
            return self.await_drain().await;
        }
        Ok(Delivery::Open)
    }

    async fn flush(&self, pending: &mut Vec<Record>, framing: &Framing) -> Result<Delivery> {
        if pending.is_empty() {
            return Ok(Delivery::Open);
        }
        let frames = if framing.concatenates() {
            let mut buf = BytesMut::new();
            for record in pending.iter() {
                buf.extend_from_slice(&framing.frame(record));
            }
            vec![buf.freeze()]
        } else {
            pending.iter().map(|r| framing.frame(r)).collect()
        };
        pending.clear();
        self.send_batch(frames).await
    }

    /// Deliver `stream` in batches until it ends, the client leaves or an
    /// error occurs. Records read before a source error are flushed first.
    pub async fn run(&self, mut stream: RecordStream, framing: &Framing) -> Result<Delivery> {
        let mut pending = Vec::with_capacity(self.config.batch_size);
        while let Some(item) = stream.next().await {
            match item {
                Ok(record) => {
                    pending.push(record);
                    if pending.len() >= self.config.batch_size
                        && self.flush(&mut pending, framing).await? == Delivery::Detached
                    {
                        return Ok(Delivery::Detached);
                    }
                }
                Err(err) => {
                    let _ = self.flush(&mut pending, framing).await?;
                    return Err(err.into());
                }
            }
        }
        self.flush(&mut pending, framing).await
    }

    async fn await_drain(&self) -> Result<Delivery> {
        metrics::counter!(DELIVERY_BACKPRESSURE_WAITS_TOTAL).increment(1);
        let mut retries = 0u32;
        loop {
            match Health::of(self.transport).into_delivery()? {
                Delivery::Detached => return Ok(Delivery::Detached),
                Delivery::Open if self.transport.buffered_amount() == 0 => {
                    return Ok(Delivery::Open);
                }
                Delivery::Open => {}
            }
            if let BackpressurePolicy::Bounded { max_retries } = self.config.policy {
                if retries >= max_retries {
                    debug!(
                        buffered = self.transport.buffered_amount(),
                        retries, "backpressure retry budget exhausted"
                    );
                    return Err(ReplayError::TooMuchBackpressure);
                }
            }
            retries += 1;
            trace!(buffered = self.transport.buffered_amount(), "waiting for buffer to drain");
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// Wait until everything written has been flushed or the transport closed.
    pub async fn wait_for_drain(&self, poll: Duration) {
        while !self.transport.is_closed() && self.transport.buffered_amount() > 0 {
            tokio::time::sleep(poll).await;
        }
    }

    /// Close according to `result`: drain then close normally on success,
    /// close immediately with the error's code otherwise.
    pub async fn finish(&self, result: &Result<Delivery>, drain_poll: Duration, reason: &str) {
        match result {
            Ok(Delivery::Open) => {
                self.wait_for_drain(drain_poll).await;
                self.transport.close(Closure::normal(reason));
            }
            Ok(Delivery::Detached) => {}
            Err(err) => {
                debug!(error = %err, "closing transport with error");
                self.transport.close(err.closure());
            }
        }
    }
}
