//! Service-info and health endpoints.

use axum::{Json, extract::State as AxumState, response::IntoResponse};
use serde_json::json;

use crate::SharedState;

/// Root endpoint with service information.
pub async fn root(AxumState(state): AxumState<SharedState>) -> impl IntoResponse {
    let identity = state
        .connection
        .identity()
        .map(|i| i.username)
        .unwrap_or_else(|| "disconnected".to_string());

    Json(json!({
        "status": "Server is running",
        "name": "git-notify-relay",
        "version": env!("CARGO_PKG_VERSION"),
        "bot_status": identity,
        "started_at": state.started_at,
        "uptime_seconds": state.start_time.elapsed().as_secs(),
        "endpoints": {
            "github": "/webhook/github",
            "gitlab": "/webhook/gitlab",
            "health": "/health"
        }
    }))
}

/// Health check: healthy once the chat connection is ready.
pub async fn health(AxumState(state): AxumState<SharedState>) -> impl IntoResponse {
    let ready = state.connection.is_ready();
    Json(json!({
        "status": if ready { "healthy" } else { "starting" },
        "bot_connected": ready,
        "bot_user": state.connection.identity().map(|i| i.username),
    }))
}
