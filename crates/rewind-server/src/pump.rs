//! Moves outbound frames from a transport channel into a real sink.
//!
//! Bytes are acknowledged to the transport only after the sink accepted
//! them, which is what gives producers their backpressure signal.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use bytes::Bytes;
use futures::{SinkExt, Stream, StreamExt};
use rewind_replay::{Outbound, OutboundReceiver};
use tracing::{debug, trace};

use crate::metrics::{WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL};

/// Counts an open WebSocket for `/health` and metrics while alive.
pub struct ConnectionGuard {
    open: Arc<AtomicUsize>,
}

impl ConnectionGuard {
    /// Register one open connection on `route`.
    pub fn open(open: &Arc<AtomicUsize>, route: &'static str) -> Self {
        let _ = open.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(WS_CONNECTIONS_TOTAL, "route" => route).increment(1);
        metrics::gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);
        Self {
            open: Arc::clone(open),
        }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let _ = self.open.fetch_sub(1, Ordering::Relaxed);
        metrics::gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
    }
}

fn ws_message(frame: &Bytes) -> Message {
    match std::str::from_utf8(frame) {
        Ok(text) => Message::Text(text.into()),
        Err(_) => Message::Binary(frame.clone()),
    }
}

/// Pump `outbound` into `socket` and hand every inbound data frame to
/// `on_inbound` until either side finishes.
///
/// A peer close marks the transport closed; a failed write records the
/// failure as a transport fault.
pub async fn run_socket<F>(socket: WebSocket, mut outbound: OutboundReceiver, on_inbound: F)
where
    F: Fn(&[u8]) + Send + Sync,
{
    let (mut sink, mut stream) = socket.split();

    let writer = async {
        while let Some(item) = outbound.recv().await {
            match item {
                Outbound::Frame(frame) => {
                    let len = frame.len();
                    if let Err(err) = sink.send(ws_message(&frame)).await {
                        debug!(error = %err, "websocket write failed");
                        outbound.fail(err.to_string());
                        return;
                    }
                    outbound.ack(len);
                }
                Outbound::Close(closure) => {
                    trace!(code = closure.code, reason = %closure.reason, "sending close frame");
                    let frame = CloseFrame {
                        code: closure.code,
                        reason: closure.reason.into(),
                    };
                    let _ = sink.send(Message::Close(Some(frame))).await;
                    return;
                }
            }
        }
    };

    let reader = async {
        while let Some(message) = stream.next().await {
            match message {
                Ok(Message::Text(text)) => on_inbound(text.as_str().as_bytes()),
                Ok(Message::Binary(data)) => on_inbound(&data),
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(err) => {
                    debug!(error = %err, "websocket read failed");
                    break;
                }
            }
        }
    };

    let peer_left = tokio::select! {
        () = writer => false,
        () = reader => true,
    };
    if peer_left {
        debug!("websocket client disconnected");
        outbound.peer_closed();
    }
}

/// Turn `outbound` into an HTTP body stream.
///
/// Each chunk is acknowledged once the body is polled again, i.e. after the
/// previous chunk was handed to the connection. An error close aborts the
/// body so the client sees a truncated response rather than a clean end.
pub fn body_stream(mut outbound: OutboundReceiver) -> impl Stream<Item = io::Result<Bytes>> + Send {
    async_stream::stream! {
        while let Some(item) = outbound.recv().await {
            match item {
                Outbound::Frame(frame) => {
                    let len = frame.len();
                    yield Ok(frame);
                    outbound.ack(len);
                }
                Outbound::Close(closure) => {
                    if closure.is_error() {
                        yield Err(io::Error::other(closure.reason));
                    }
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rewind_replay::{Closure, Transport, transport::channel};

    #[tokio::test]
    async fn body_stream_acks_and_ends_on_normal_close() {
        let (tx, rx) = channel(1024);
        assert!(tx.send(Bytes::from_static(b"line\n")));
        tx.close(Closure::normal("done"));
        let chunks: Vec<_> = body_stream(rx).collect().await;
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].as_ref().unwrap(), &Bytes::from_static(b"line\n"));
        assert_eq!(tx.buffered_amount(), 0);
    }

    #[tokio::test]
    async fn body_stream_aborts_on_error_close() {
        let (tx, rx) = channel(1024);
        tx.close(Closure::new(1011, "upstream error: gone"));
        let chunks: Vec<_> = body_stream(rx).collect().await;
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].as_ref().unwrap_err().to_string(), "upstream error: gone");
    }

    #[test]
    fn text_frames_stay_text() {
        assert!(matches!(ws_message(&Bytes::from_static(b"{}")), Message::Text(_)));
        assert!(matches!(
            ws_message(&Bytes::from_static(&[0xff, 0x00])),
            Message::Binary(_)
        ));
    }

    #[test]
    fn guard_tracks_open_connections() {
        let open = Arc::new(AtomicUsize::new(0));
        let guard = ConnectionGuard::open(&open, "/ws-replay");
        assert_eq!(open.load(Ordering::Relaxed), 1);
        drop(guard);
        assert_eq!(open.load(Ordering::Relaxed), 0);
    }
}
