//! `GET /replay`: historical data as NDJSON over a chunked response.

use std::time::Instant;

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use futures::StreamExt;
use rewind_core::ReplayRequest;
use rewind_core::options::{ReplayOptions, parse_options};
use rewind_replay::{DeliveryLoop, Framing};
use tracing::{info, warn};

use super::OptionsQuery;
use crate::errors::ApiError;
use crate::metrics::HTTP_REPLAY_REQUESTS_TOTAL;
use crate::pump::body_stream;
use crate::server::AppState;

/// Content type of the replay body.
pub const NDJSON_CONTENT_TYPE: &str = "application/x-json-stream";

const REPLAY_FINISHED: &str = "HTTP replay finished";

fn request(query: &OptionsQuery) -> Result<ReplayRequest, ApiError> {
    let raw = query
        .options
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("missing options query parameter"))?;
    let mut options = parse_options::<ReplayOptions>(raw)
        .map_err(|err| ApiError::bad_request(format!("invalid options: {err}")))?;
    if options.len() != 1 {
        return Err(ApiError::bad_request(
            "exactly one replay option is required, use /ws-replay-combined to merge venues",
        ));
    }
    Ok(options.remove(0).into_request()?)
}

/// Stream one venue's records for a window.
///
/// The source is polled once before the response starts so a failure to
/// open it becomes an HTTP status; later failures truncate the body.
pub async fn replay(
    Query(query): Query<OptionsQuery>,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let request = request(&query).inspect_err(|err| {
        metrics::counter!(HTTP_REPLAY_REQUESTS_TOTAL, "status" => err.status.as_str().to_owned())
            .increment(1);
    })?;

    let mut records = state.replay_source.open(&request);
    let first = match records.next().await {
        Some(Err(err)) => {
            warn!(window = %request.window, error = %err, "GET /replay failed");
            let err = ApiError::from(err);
            metrics::counter!(HTTP_REPLAY_REQUESTS_TOTAL, "status" => err.status.as_str().to_owned())
                .increment(1);
            return Err(err);
        }
        first => first,
    };
    metrics::counter!(HTTP_REPLAY_REQUESTS_TOTAL, "status" => "200").increment(1);

    let (tx, rx) = state.open_transport();
    let config = state.http_delivery();
    let drain_poll = state.coordinator.config().close_drain_poll;
    let _ = tokio::spawn(async move {
        let started = Instant::now();
        info!(window = %request.window, "GET /replay started");
        let delivery = DeliveryLoop::new(tx.as_ref(), config);
        let stream = futures::stream::iter(first).chain(records).boxed();
        let result = delivery.run(stream, &Framing::NdJson).await;
        if let Err(err) = &result {
            warn!(window = %request.window, error = %err, "GET /replay aborted");
        }
        delivery.finish(&result, drain_poll, REPLAY_FINISHED).await;
        info!(
            window = %request.window,
            elapsed_ms = started.elapsed().as_millis(),
            "GET /replay finished"
        );
    });

    Ok(([(CONTENT_TYPE, NDJSON_CONTENT_TYPE)], Body::from_stream(body_stream(rx))).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn query(raw: &str) -> OptionsQuery {
        OptionsQuery {
            options: Some(raw.to_string()),
        }
    }

    #[test]
    fn one_option_becomes_a_request() {
        let request = request(&query(
            r#"{"exchange":"bitmex","from":"2020-01-01","to":"2020-01-02","filters":[{"channel":"trade"}]}"#,
        ))
        .unwrap();
        assert_eq!(request.window.exchange, "bitmex");
        assert_eq!(request.filters.len(), 1);
    }

    #[test]
    fn several_options_are_refused() {
        let err = request(&query(
            r#"[{"exchange":"bitmex","from":"2020-01-01","to":"2020-01-02"},
                {"exchange":"deribit","from":"2020-01-01","to":"2020-01-02"}]"#,
        ))
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn bad_window_is_a_bad_request() {
        let err = request(&query(
            r#"{"exchange":"bitmex","from":"2020-01-02","to":"2020-01-01"}"#,
        ))
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        let err = request(&OptionsQuery::default()).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }
}
