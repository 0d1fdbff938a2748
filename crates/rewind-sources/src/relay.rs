//! Live relay from venue WebSocket APIs.
//!
//! Connects to the venue's configured endpoint, sends the client's native
//! subscribe messages verbatim and yields every data frame as a record
//! stamped with the local receive time. A dropped or refused connection
//! yields one [`SourceError::Upstream`] and is retried after an exponential,
//! jittered backoff; the consumer decides when to give up.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use futures::{SinkExt, Stream, StreamExt};
use rewind_core::retry::Backoff;
use rewind_core::{LiveRequest, LiveSource, Record, RecordStream, SourceError};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

type VenueSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// [`LiveSource`] over venue WebSocket endpoints.
#[derive(Clone, Debug)]
pub struct UpstreamRelay {
    endpoints: Arc<BTreeMap<String, String>>,
    backoff: Backoff,
}

impl UpstreamRelay {
    /// Relay using `endpoints` (venue → WebSocket URL).
    pub fn new(endpoints: BTreeMap<String, String>, backoff: Backoff) -> Self {
        Self {
            endpoints: Arc::new(endpoints),
            backoff,
        }
    }

    /// Endpoint configured for `exchange`.
    pub fn endpoint(&self, exchange: &str) -> Option<&str> {
        self.endpoints.get(exchange).map(String::as_str)
    }
}

impl LiveSource for UpstreamRelay {
    fn stream(&self, request: &LiveRequest) -> RecordStream {
        let Some(url) = self.endpoint(&request.exchange) else {
            let err = SourceError::NotFound(format!(
                "no upstream endpoint configured for {}",
                request.exchange
            ));
            return Box::pin(futures::stream::once(async move { Err(err) }));
        };
        Box::pin(relay(
            url.to_string(),
            request.exchange.clone(),
            request.subscriptions.clone(),
            self.backoff.clone(),
        ))
    }
}

fn relay(
    url: String,
    exchange: String,
    subscriptions: Vec<Value>,
    backoff: Backoff,
) -> impl Stream<Item = Result<Record, SourceError>> + Send {
    async_stream::stream! {
        let mut attempt = 0u32;
        loop {
            match connect(&url, &subscriptions).await {
                Ok(mut socket) => {
                    info!(%exchange, %url, "connected to upstream");
                    attempt = 0;
                    loop {
                        match socket.next().await {
                            Some(Ok(Message::Text(text))) => {
                                yield Ok(Record::new(
                                    Utc::now(),
                                    Bytes::copy_from_slice(text.as_str().as_bytes()),
                                ));
                            }
                            Some(Ok(Message::Binary(data))) => {
                                yield Ok(Record::new(Utc::now(), data));
                            }
                            Some(Ok(Message::Close(frame))) => {
                                debug!(%exchange, ?frame, "upstream closed");
                                yield Err(SourceError::Upstream(format!("{exchange} closed the connection")));
                                break;
                            }
                            None => {
                                yield Err(SourceError::Upstream(format!("{exchange} connection ended")));
                                break;
                            }
                            Some(Ok(_)) => {}
                            Some(Err(err)) => {
                                yield Err(SourceError::Upstream(format!("{exchange}: {err}")));
                                break;
                            }
                        }
                    }
                }
                Err(err) => {
                    warn!(%exchange, %url, error = %err, attempt, "upstream connect failed");
                    yield Err(err);
                }
            }
            let delay = backoff.delay(attempt, rand::random::<f64>());
            attempt = attempt.saturating_add(1);
            debug!(%exchange, ?delay, "reconnecting to upstream");
            tokio::time::sleep(delay).await;
        }
    }
}

async fn connect(url: &str, subscriptions: &[Value]) -> Result<VenueSocket, SourceError> {
    let (mut socket, _) = tokio::time::timeout(CONNECT_TIMEOUT, connect_async(url))
        .await
        .map_err(|_| SourceError::Upstream(format!("timed out connecting to {url}")))?
        .map_err(|e| SourceError::Upstream(format!("failed to connect to {url}: {e}")))?;
    for subscription in subscriptions {
        socket
            .send(Message::Text(subscription.to_string().into()))
            .await
            .map_err(|e| SourceError::Upstream(format!("failed to subscribe: {e}")))?;
    }
    Ok(socket)
}
