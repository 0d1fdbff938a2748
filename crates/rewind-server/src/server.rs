//! Shared state, router and accept loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use axum::Router;
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusHandle;
use rewind_core::{LiveSource, ReplaySource};
use rewind_replay::errors::close_code;
use rewind_replay::{
    ChannelTransport, Closure, DeliveryConfig, LiveConfig, OutboundReceiver, SessionConfig,
    SessionCoordinator, Transport, transport,
};
use rewind_settings::RewindSettings;
use rewind_sources::{FileReplaySource, UpstreamRelay};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::errors::{Result, ServerError};
use crate::routes;
use crate::shutdown::ShutdownCoordinator;

/// Shared application state passed to axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Effective settings.
    pub settings: Arc<RewindSettings>,
    /// Registry of `/ws-replay` sessions.
    pub coordinator: SessionCoordinator,
    /// Historical data.
    pub replay_source: Arc<dyn ReplaySource>,
    /// Live venue feeds.
    pub live_source: Arc<dyn LiveSource>,
    /// Prometheus handle, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
    /// Process start, for uptime.
    pub start_time: Instant,
    /// Open WebSocket connections.
    pub connections: Arc<AtomicUsize>,
    /// Server-wide shutdown signal.
    pub shutdown: Arc<ShutdownCoordinator>,
}

impl AppState {
    /// Build state around explicit sources.
    pub fn new(
        settings: RewindSettings,
        replay_source: Arc<dyn ReplaySource>,
        live_source: Arc<dyn LiveSource>,
    ) -> Self {
        let coordinator =
            SessionCoordinator::new(Arc::clone(&replay_source), session_config(&settings));
        Self {
            settings: Arc::new(settings),
            coordinator,
            replay_source,
            live_source,
            metrics: None,
            start_time: Instant::now(),
            connections: Arc::new(AtomicUsize::new(0)),
            shutdown: Arc::new(ShutdownCoordinator::new()),
        }
    }

    /// Open WebSocket connections right now.
    pub fn open_connections(&self) -> usize {
        self.connections.load(Ordering::Relaxed)
    }

    /// Tuning for `/ws-stream`.
    pub fn live_config(&self) -> LiveConfig {
        let stream = &self.settings.stream;
        LiveConfig {
            delivery: DeliveryConfig::live(
                Duration::from_millis(stream.backpressure_poll_ms),
                stream.max_backpressure_retries,
            ),
            max_subsequent_errors: stream.max_subsequent_errors,
            close_drain_poll: Duration::from_millis(self.settings.replay.close_drain_poll_ms),
        }
    }

    /// Tuning for `GET /replay`.
    pub fn http_delivery(&self) -> DeliveryConfig {
        let replay = &self.settings.replay;
        DeliveryConfig::replay(
            Duration::from_millis(replay.backpressure_poll_ms),
            replay.http_batch_size,
        )
    }

    /// A fresh outbound channel that is closed with 1001 when the server
    /// shuts down, so graceful shutdown is not held up by open streams.
    pub fn open_transport(&self) -> (Arc<ChannelTransport>, OutboundReceiver) {
        let (tx, rx) = transport::channel(self.settings.replay.max_buffered_bytes);
        let tx = Arc::new(tx);
        let watched = Arc::clone(&tx);
        let token = self.shutdown.token();
        let _ = tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {
                    watched.close(Closure::new(close_code::GOING_AWAY, "server shutting down"));
                }
                () = watched.closed() => {}
            }
        });
        (tx, rx)
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("connections", &self.open_connections())
            .field("coordinator", &self.coordinator)
            .finish_non_exhaustive()
    }
}

/// Session timing derived from settings.
pub fn session_config(settings: &RewindSettings) -> SessionConfig {
    let replay = &settings.replay;
    SessionConfig {
        start_delay: Duration::from_millis(replay.session_start_delay_ms),
        batch_size: replay.batch_size,
        backpressure_poll: Duration::from_millis(replay.backpressure_poll_ms),
        close_drain_poll: Duration::from_millis(replay.close_drain_poll_ms),
    }
}

/// Build the axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/replay", get(routes::http::replay))
        .route("/ws-replay", get(routes::ws::replay))
        .route("/ws-replay-combined", get(routes::ws::replay_combined))
        .route("/ws-stream", get(routes::ws::stream))
        .route("/health", get(routes::status::health))
        .route("/metrics", get(routes::status::metrics))
        .route(
            "/api/v1/schema/websocketHelp",
            get(routes::status::websocket_help),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// The gateway: state plus a way to serve it.
#[derive(Debug)]
pub struct RewindServer {
    state: AppState,
}

impl RewindServer {
    /// Serve from explicit sources.
    pub fn new(
        settings: RewindSettings,
        replay_source: Arc<dyn ReplaySource>,
        live_source: Arc<dyn LiveSource>,
    ) -> Self {
        Self {
            state: AppState::new(settings, replay_source, live_source),
        }
    }

    /// Serve the local file store and the configured venue endpoints.
    pub fn from_settings(settings: RewindSettings) -> Self {
        let replay_source: Arc<dyn ReplaySource> =
            Arc::new(FileReplaySource::new(settings.data.data_dir.clone()));
        let live_source: Arc<dyn LiveSource> = Arc::new(UpstreamRelay::new(
            settings.stream.endpoints.clone(),
            settings.stream.reconnect.clone(),
        ));
        Self::new(settings, replay_source, live_source)
    }

    /// Render `/metrics` from `handle`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.state.metrics = Some(handle);
        self
    }

    /// Shared state.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Shutdown signal; trigger it to stop [`RewindServer::serve`].
    pub fn shutdown(&self) -> Arc<ShutdownCoordinator> {
        Arc::clone(&self.state.shutdown)
    }

    /// Router over this server's state.
    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Bind the configured host and port.
    pub async fn bind(&self) -> Result<TcpListener> {
        let addr = format!(
            "{}:{}",
            self.state.settings.server.host, self.state.settings.server.port
        );
        TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })
    }

    /// Accept connections until shutdown is triggered.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let local = listener.local_addr()?;
        info!(addr = %local, "rewind server listening");
        let token = self.state.shutdown.token();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(token.cancelled_owned())
            .await?;
        info!("rewind server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use futures::StreamExt;
    use rewind_core::{LiveRequest, RecordStream, ReplayRequest};
    use tower::ServiceExt;

    struct Nothing;

    impl ReplaySource for Nothing {
        fn open(&self, _request: &ReplayRequest) -> RecordStream {
            futures::stream::empty().boxed()
        }
    }

    impl LiveSource for Nothing {
        fn stream(&self, _request: &LiveRequest) -> RecordStream {
            futures::stream::empty().boxed()
        }
    }

    fn state() -> AppState {
        AppState::new(RewindSettings::default(), Arc::new(Nothing), Arc::new(Nothing))
    }

    #[test]
    fn session_config_follows_settings() {
        let mut settings = RewindSettings::default();
        settings.replay.session_start_delay_ms = 250;
        settings.replay.batch_size = 4;
        let config = session_config(&settings);
        assert_eq!(config.start_delay, Duration::from_millis(250));
        assert_eq!(config.batch_size, 4);
    }

    #[tokio::test]
    async fn live_config_uses_stream_settings() {
        let state = state();
        let config = state.live_config();
        assert_eq!(
            config.max_subsequent_errors,
            state.settings.stream.max_subsequent_errors
        );
    }

    #[tokio::test]
    async fn health_route_answers() {
        let resp = build_router(state())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let resp = build_router(state())
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn shutdown_closes_open_transports() {
        let state = state();
        let (tx, mut rx) = state.open_transport();
        state.shutdown.shutdown();
        match rx.recv().await {
            Some(rewind_replay::Outbound::Close(closure)) => {
                assert_eq!(closure.code, close_code::GOING_AWAY);
            }
            other => panic!("expected close, got {other:?}"),
        }
        assert!(tx.is_closed());
    }
}
