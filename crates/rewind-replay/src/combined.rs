//! Combined replay: several venues merged into one transport.
//!
//! Unlike synchronized sessions this is a strict merge. Each record is
//! wrapped in an envelope naming its venue and records are released in
//! `localTimestamp` order, ties going to the earlier option.

use futures::StreamExt;
use rewind_core::merge::merge_tagged;
use rewind_core::options::ReplayOptions;
use rewind_core::{ReplayRequest, ReplaySource};
use tracing::{debug, info, warn};

use crate::coordinator::SessionConfig;
use crate::delivery::{Delivery, DeliveryConfig, DeliveryLoop};
use crate::errors::{ReplayError, Result};
use crate::metrics::RECORDS_SENT_TOTAL;
use crate::transport::Transport;

/// Close reason after a combined replay completes.
pub const COMBINED_FINISHED: &str = "WS replay-combined finished";

/// Validate options into source requests, keeping their order.
pub fn prepare_combined(options: Vec<ReplayOptions>) -> Result<Vec<ReplayRequest>> {
    if options.is_empty() {
        return Err(ReplayError::InvalidOptions(
            "at least one replay option is required".into(),
        ));
    }
    options
        .into_iter()
        .map(|option| option.into_request().map_err(ReplayError::from))
        .collect()
}

async fn deliver_merged(
    source: &dyn ReplaySource,
    requests: &[ReplayRequest],
    delivery: &DeliveryLoop<'_>,
) -> Result<Delivery> {
    let mut merged = merge_tagged(requests.iter().map(|r| source.open(r)).collect());
    let mut sent = 0u64;
    while let Some(item) = merged.next().await {
        let (input, record) = item?;
        let frame = record.envelope(&requests[input].window.exchange);
        if delivery.send_frame(frame).await? == Delivery::Detached {
            debug!(records = sent, "client left during combined replay");
            return Ok(Delivery::Detached);
        }
        sent += 1;
        metrics::counter!(RECORDS_SENT_TOTAL, "route" => "ws-replay-combined").increment(1);
    }
    debug!(records = sent, "combined replay exhausted");
    Ok(Delivery::Open)
}

/// Replay `requests` merged into `transport`, then close it: normally after
/// the buffer drains, or immediately with the error's close code.
pub async fn run_combined(
    source: &dyn ReplaySource,
    requests: &[ReplayRequest],
    transport: &dyn Transport,
    config: &SessionConfig,
) -> Result<Delivery> {
    let delivery = DeliveryLoop::new(
        transport,
        DeliveryConfig::replay(config.backpressure_poll, 1),
    );
    info!(venues = requests.len(), "combined replay started");
    let result = deliver_merged(source, requests, &delivery).await;
    if let Err(err) = &result {
        warn!(error = %err, "combined replay failed");
    }
    delivery
        .finish(&result, config.close_drain_poll, COMBINED_FINISHED)
        .await;
    result
}
