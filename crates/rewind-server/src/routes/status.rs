//! Health, metrics and client-compatibility routes.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};

use crate::errors::ApiError;
use crate::health::{HealthResponse, health_check};
use crate::server::AppState;

/// `GET /health`.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health_check(
        state.start_time,
        state.open_connections(),
        state.coordinator.active_sessions(),
    ))
}

/// `GET /metrics`: Prometheus text exposition.
pub async fn metrics(State(state): State<AppState>) -> Result<Response, ApiError> {
    let handle = state.metrics.as_ref().ok_or_else(|| ApiError {
        status: StatusCode::NOT_FOUND,
        message: "metrics recorder not installed".into(),
    })?;
    Ok(handle.render().into_response())
}

/// `GET /api/v1/schema/websocketHelp`.
///
/// BitMEX client libraries fetch this before connecting; answering it lets
/// them point at `/ws-replay` unmodified.
pub async fn websocket_help() -> Json<Value> {
    Json(bitmex_help())
}

fn bitmex_help() -> Value {
    json!({
        "info": "See https://www.bitmex.com/app/wsAPI and https://www.bitmex.com/explorer for more documentation.",
        "usage": "Send a message in the format: {\"op\": string, \"args\": Array<string>}",
        "ops": ["authKey", "authKeyExpires", "cancelAllAfter", "subscribe", "unsubscribe"],
        "subscribe": "To subscribe, send: {\"op\": \"subscribe\", \"args\": [subscriptionTopic, ...]}.",
        "subscriptionSubjects": {
            "authenticationRequired": [],
            "public": [
                "announcement", "connected", "chat", "publicNotifications", "instrument",
                "settlement", "funding", "insurance", "liquidation", "orderBookL2",
                "orderBookL2_25", "quote", "trade", "quoteBin1m", "quoteBin5m", "quoteBin1h",
                "quoteBin1d", "tradeBin1m", "tradeBin5m", "tradeBin1h", "tradeBin1d"
            ]
        }
    })
}
