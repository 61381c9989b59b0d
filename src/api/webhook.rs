//! Webhook handlers for GitHub and GitLab push events.
//!
//! The boundary owns the transport mapping: the core hands back typed
//! results and never an uncaught fault, so callers always receive a
//! structured body, even on internal failure.

use axum::{
    Json,
    body::Bytes,
    extract::State as AxumState,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{error, info, warn};

use crate::SharedState;
use crate::error::DispatchError;
use crate::normalize::normalize;
use crate::notification::NotificationSource;

/// Handles the GitHub webhook POST request.
pub async fn github_webhook(
    AxumState(state): AxumState<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let event_hint = headers
        .get("X-GitHub-Event")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");
    info!("Webhook received from GitHub (event: {})", event_hint);

    let payload: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            info!("Could not parse JSON body: {:?}", e);
            return bad_request("Invalid JSON body");
        }
    };

    // A push is any body with a commits array and a non-empty ref;
    // everything else is ignored regardless of the event hint.
    let has_commits = payload.get("commits").is_some_and(|c| c.is_array());
    let has_ref = payload
        .get("ref")
        .and_then(|r| r.as_str())
        .is_some_and(|r| !r.is_empty());
    if !has_commits || !has_ref {
        info!("Event ignored (not a push)");
        return ignored();
    }

    relay(&state, NotificationSource::GitHubPush, &payload).await
}

/// Handles the GitLab webhook POST request.
pub async fn gitlab_webhook(
    AxumState(state): AxumState<SharedState>,
    body: Bytes,
) -> Response {
    info!("Webhook received from GitLab");

    let payload: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            info!("Could not parse JSON body: {:?}", e);
            return bad_request("Invalid JSON body");
        }
    };

    if payload.get("object_kind").and_then(|k| k.as_str()) != Some("push") {
        info!("Event ignored (not a push)");
        return ignored();
    }

    relay(&state, NotificationSource::GitLabPush, &payload).await
}

/// Normalize and dispatch, then map the typed outcome to a transport
/// status code.
async fn relay(
    state: &SharedState,
    source: NotificationSource,
    payload: &serde_json::Value,
) -> Response {
    let notification = match normalize(source, payload) {
        Ok(n) => n,
        Err(e) => {
            error!("Payload rejected: {}", e);
            return bad_request(&e.to_string());
        }
    };

    info!(
        "Push detected in '{}' branch '{}' ({} commits)",
        notification.repository_name,
        notification.branch,
        notification.commits.len()
    );

    match state.dispatcher.dispatch(&notification).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "success", "message": "Notification sent" })),
        )
            .into_response(),
        Err(DispatchError::ChannelNotFound) => {
            warn!("Notification channel not found");
            (
                StatusCode::NOT_FOUND,
                Json(json!({ "status": "error", "detail": "Notification channel not found" })),
            )
                .into_response()
        }
        Err(e) => {
            error!("Dispatch failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "error", "detail": e.to_string() })),
            )
                .into_response()
        }
    }
}

fn ignored() -> Response {
    (
        StatusCode::OK,
        Json(json!({ "status": "ignored", "message": "Not a push event" })),
    )
        .into_response()
}

fn bad_request(detail: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "status": "error", "detail": detail })),
    )
        .into_response()
}
