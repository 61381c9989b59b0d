use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{Router, routing};
use chrono::Utc;
use git_notify_relay::api::{github_webhook, gitlab_webhook, health, root};
use git_notify_relay::backend::ChatBackend;
use git_notify_relay::discord::DiscordBackend;
use git_notify_relay::dispatch::Dispatcher;
use git_notify_relay::error::LifecycleError;
use git_notify_relay::lifecycle::{LifecycleManager, LoggingObserver, StateHandle};
use git_notify_relay::{AppState, RelayConfig};
use tracing::{error, info, warn};

const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8888";

/// How long to wait for the chat handshake before serving ingress
/// anyway. Ingress is never blocked indefinitely on readiness.
const READY_GRACE_PERIOD: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let bind_address =
        std::env::var("BIND_ADDRESS").unwrap_or_else(|_| DEFAULT_BIND_ADDRESS.to_string());
    let config = RelayConfig::from_env();

    let Some(credential) = config.credential.clone() else {
        eprintln!("Configuration error: {}", LifecycleError::MissingCredential);
        std::process::exit(1);
    };
    if config.target_channel_id.is_none() {
        warn!("DISCORD_CHANNEL_ID is not set; webhook dispatch will fail until it is");
    }

    let backend: Arc<dyn ChatBackend> = Arc::new(DiscordBackend::new());
    let connection = StateHandle::new(config.target_channel_id.clone());
    let mut manager = LifecycleManager::new(backend.clone(), connection.clone());
    manager.register_observer(Arc::new(LoggingObserver::new(connection.clone())));
    let manager = Arc::new(manager);

    // The chat session lives on its own task; ingress only reads the
    // shared connection state.
    let start_manager = manager.clone();
    let start_task = tokio::spawn(async move {
        if let Err(e) = start_manager.start(Some(credential.as_str())).await {
            // No partial-degraded mode: a bot that cannot authenticate
            // must not pretend to serve ingress.
            error!("Chat connection failed: {}", e);
            std::process::exit(1);
        }
    });

    // Bounded grace period so early webhooks find a ready connection.
    if !connection.wait_ready(READY_GRACE_PERIOD).await {
        warn!("Chat connection not ready yet; serving ingress anyway");
    }

    let state = Arc::new(AppState {
        dispatcher: Dispatcher::new(backend, connection.clone()),
        connection,
        start_time: Instant::now(),
        started_at: Utc::now(),
    });

    let app = Router::new()
        .route("/", routing::get(root))
        .route("/health", routing::get(health))
        .route("/webhook/github", routing::post(github_webhook))
        .route("/webhook/gitlab", routing::post(gitlab_webhook))
        .with_state(state);

    info!("Listening on {}", bind_address);
    let listener = tokio::net::TcpListener::bind(bind_address).await.unwrap();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    // Cancel any in-flight handshake, then tear the session down.
    start_task.abort();
    manager.close().await;
    info!("Shutdown complete");
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received, closing chat connection");
    }
}
