//! Live streaming relay.
//!
//! Each requested venue is validated against its subscription mapper, then
//! streamed from a [`LiveSource`]. Branches are merged by arrival. Slow
//! clients get a bounded number of backpressure polls. Upstream failures are
//! tolerated per venue up to a budget of consecutive errors; any successful
//! record resets that venue's count.

use chrono::Utc;
use futures::StreamExt;
use futures::stream::select_all;
use rewind_core::options::StreamOptions;
use rewind_core::{LiveRequest, LiveSource, SourceError};
use rewind_mappers::mapper_for;
use tracing::{debug, info, warn};

use crate::delivery::{Delivery, DeliveryConfig, DeliveryLoop, Framing};
use crate::errors::{ReplayError, Result};
use crate::metrics::RECORDS_SENT_TOTAL;
use crate::transport::Transport;

/// Close reason if every upstream ends on its own.
pub const STREAM_FINISHED: &str = "WS stream finished";

/// Live relay tuning.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LiveConfig {
    /// Bounded delivery settings.
    pub delivery: DeliveryConfig,
    /// Consecutive upstream errors tolerated per venue.
    pub max_subsequent_errors: u32,
    /// Poll interval while draining before a normal close.
    pub close_drain_poll: std::time::Duration,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            delivery: crate::delivery::default_live_config(),
            max_subsequent_errors: rewind_core::constants::MAX_SUBSEQUENT_ERRORS,
            close_drain_poll: std::time::Duration::from_millis(
                rewind_core::constants::CLOSE_DRAIN_POLL_MS,
            ),
        }
    }
}

/// Validate stream options.
///
/// Subscriptions the venue's mapper does not recognize or cannot translate
/// are dropped with a warning; an option left without any is an error.
pub fn prepare_live(options: Vec<StreamOptions>) -> Result<Vec<LiveRequest>> {
    if options.is_empty() {
        return Err(ReplayError::InvalidOptions(
            "at least one stream option is required".into(),
        ));
    }
    let now = Utc::now();
    options
        .into_iter()
        .map(|option| {
            let mapper =
                mapper_for(&option.exchange).ok_or_else(|| ReplayError::UnsupportedExchange {
                    exchange: option.exchange.clone(),
                    route: "/ws-stream",
                })?;
            let mut subscriptions = Vec::with_capacity(option.subscriptions.len());
            let mut filters = Vec::new();
            for subscription in option.subscriptions {
                if !mapper.can_handle(&subscription, now) {
                    warn!(exchange = %option.exchange, %subscription, "ignoring unrecognized subscription");
                    continue;
                }
                match mapper.map(&subscription, now) {
                    Ok(mapped) => {
                        filters.extend(mapped);
                        subscriptions.push(subscription);
                    }
                    Err(err) => {
                        warn!(exchange = %option.exchange, %subscription, error = %err, "ignoring invalid subscription");
                    }
                }
            }
            if subscriptions.is_empty() {
                return Err(ReplayError::InvalidOptions(format!(
                    "no valid subscriptions provided for {}",
                    option.exchange
                )));
            }
            Ok(LiveRequest {
                exchange: option.exchange,
                subscriptions,
                filters,
            })
        })
        .collect()
}

fn is_fatal(err: &SourceError) -> bool {
    matches!(
        err,
        SourceError::InvalidRequest(_) | SourceError::NotFound(_) | SourceError::Unauthorized(_)
    )
}

async fn relay(
    source: &dyn LiveSource,
    requests: &[LiveRequest],
    delivery: &DeliveryLoop<'_>,
    max_subsequent_errors: u32,
) -> Result<Delivery> {
    let framings: Vec<Framing> = if requests.len() == 1 {
        vec![Framing::Raw]
    } else {
        requests
            .iter()
            .map(|r| Framing::Envelope(r.exchange.clone()))
            .collect()
    };
    let mut merged = select_all(requests.iter().enumerate().map(|(i, request)| {
        source.stream(request).map(move |item| (i, item)).boxed()
    }));
    let mut errors = vec![0u32; requests.len()];

    while let Some((i, item)) = merged.next().await {
        match item {
            Ok(record) => {
                errors[i] = 0;
                if delivery.send_frame(framings[i].frame(&record)).await? == Delivery::Detached {
                    debug!("client left live stream");
                    return Ok(Delivery::Detached);
                }
                metrics::counter!(RECORDS_SENT_TOTAL, "route" => "ws-stream").increment(1);
            }
            Err(err) if is_fatal(&err) => return Err(err.into()),
            Err(err) => {
                errors[i] += 1;
                warn!(exchange = %requests[i].exchange, error = %err, attempt = errors[i], "upstream error");
                if errors[i] >= max_subsequent_errors {
                    return Err(ReplayError::TooManyErrors(requests[i].exchange.clone()));
                }
            }
        }
    }
    Ok(Delivery::Open)
}

/// Relay `requests` into `transport` until the client leaves or delivery
/// fails, then close it accordingly.
pub async fn run_live(
    source: &dyn LiveSource,
    requests: &[LiveRequest],
    transport: &dyn Transport,
    config: &LiveConfig,
) -> Result<Delivery> {
    let delivery = DeliveryLoop::new(transport, config.delivery);
    info!(venues = requests.len(), "live stream started");
    let result = relay(source, requests, &delivery, config.max_subsequent_errors).await;
    if let Err(err) = &result {
        warn!(error = %err, "live stream failed");
    }
    delivery
        .finish(&result, config.close_drain_poll, STREAM_FINISHED)
        .await;
    result
}
