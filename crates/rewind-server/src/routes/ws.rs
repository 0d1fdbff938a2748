//! WebSocket routes.
//!
//! Every handler follows the same shape: open a transport, spawn whatever
//! produces into it, then pump it into the socket until either side is done.
//! Request errors are reported as a close frame on the upgraded socket.

use std::sync::Arc;

use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use rewind_core::ReplayWindow;
use rewind_core::options::{ReplayOptions, StreamOptions, parse_options};
use rewind_replay::{
    Connection, ReplayError, SessionKey, Transport, prepare_combined, prepare_live, run_combined,
    run_live,
};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};

use super::{OptionsQuery, ReplayQuery};
use crate::pump::{ConnectionGuard, run_socket};
use crate::server::AppState;

/// `GET /ws-replay`: synchronized replay driven by native subscribe messages.
pub async fn replay(
    ws: WebSocketUpgrade,
    Query(query): Query<ReplayQuery>,
    State(state): State<AppState>,
) -> Response {
    ws.max_message_size(state.settings.server.max_message_size)
        .on_upgrade(move |socket| replay_socket(socket, query, state))
}

#[instrument(skip_all, fields(exchange = query.exchange.as_deref().unwrap_or_default()))]
async fn replay_socket(socket: WebSocket, query: ReplayQuery, state: AppState) {
    let _guard = ConnectionGuard::open(&state.connections, "/ws-replay");
    let (tx, rx) = state.open_transport();
    let transport: Arc<dyn Transport> = tx;

    match join_session(&query, &transport, &state) {
        Ok(connection) => {
            run_socket(socket, rx, move |raw| {
                let _ = connection.on_control_message(raw);
            })
            .await;
            debug!("ws-replay connection finished");
        }
        Err(err) => {
            warn!(error = %err, "ws-replay connection refused");
            transport.close(err.closure());
            run_socket(socket, rx, |_| {}).await;
        }
    }
}

fn join_session(
    query: &ReplayQuery,
    transport: &Arc<dyn Transport>,
    state: &AppState,
) -> Result<Arc<Connection>, ReplayError> {
    let window = ReplayWindow::parse(
        query.exchange.clone().unwrap_or_default(),
        query.from.as_deref().unwrap_or_default(),
        query.to.as_deref().unwrap_or_default(),
    )?;
    let key = SessionKey::for_connection(&window, query.session.as_deref());
    let connection = Arc::new(Connection::new(window, Arc::clone(transport))?);
    info!(connection = %connection.id(), session = %key, "ws-replay connection opened");
    let _session = state.coordinator.join(key, Arc::clone(&connection))?;
    Ok(connection)
}

/// `GET /ws-replay-combined`: several venues merged by timestamp.
pub async fn replay_combined(
    ws: WebSocketUpgrade,
    Query(query): Query<OptionsQuery>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| combined_socket(socket, query, state))
}

#[instrument(skip_all, fields(route = "/ws-replay-combined"))]
async fn combined_socket(socket: WebSocket, query: OptionsQuery, state: AppState) {
    let _guard = ConnectionGuard::open(&state.connections, "/ws-replay-combined");
    let (tx, rx) = state.open_transport();

    match options::<ReplayOptions>(&query).and_then(prepare_combined) {
        Ok(requests) => {
            let source = Arc::clone(&state.replay_source);
            let config = *state.coordinator.config();
            let transport = Arc::clone(&tx);
            let _ = tokio::spawn(async move {
                let _ = run_combined(source.as_ref(), &requests, transport.as_ref(), &config).await;
            });
        }
        Err(err) => {
            warn!(error = %err, "ws-replay-combined request refused");
            tx.close(err.closure());
        }
    }
    run_socket(socket, rx, |_| {}).await;
}

/// `GET /ws-stream`: live relay from venue APIs.
pub async fn stream(
    ws: WebSocketUpgrade,
    Query(query): Query<OptionsQuery>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| stream_socket(socket, query, state))
}

#[instrument(skip_all, fields(route = "/ws-stream"))]
async fn stream_socket(socket: WebSocket, query: OptionsQuery, state: AppState) {
    let _guard = ConnectionGuard::open(&state.connections, "/ws-stream");
    let (tx, rx) = state.open_transport();

    match options::<StreamOptions>(&query).and_then(prepare_live) {
        Ok(requests) => {
            let source = Arc::clone(&state.live_source);
            let config = state.live_config();
            let transport = Arc::clone(&tx);
            let _ = tokio::spawn(async move {
                let _ = run_live(source.as_ref(), &requests, transport.as_ref(), &config).await;
            });
        }
        Err(err) => {
            warn!(error = %err, "ws-stream request refused");
            tx.close(err.closure());
        }
    }
    run_socket(socket, rx, |_| {}).await;
}

fn options<T: DeserializeOwned>(query: &OptionsQuery) -> Result<Vec<T>, ReplayError> {
    let raw = query
        .options
        .as_deref()
        .ok_or_else(|| ReplayError::InvalidOptions("missing options query parameter".into()))?;
    parse_options(raw).map_err(|err| ReplayError::InvalidOptions(err.to_string()))
}
