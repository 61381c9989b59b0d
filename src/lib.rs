pub mod api;
pub mod backend;
pub mod discord;
pub mod dispatch;
pub mod error;
pub mod lifecycle;
pub mod message;
pub mod normalize;
pub mod notification;
pub mod resolver;

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};

use crate::backend::ChannelId;
use crate::dispatch::Dispatcher;
use crate::lifecycle::StateHandle;

/// Values the relay consumes from the environment.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Chat credential. Absence is a fatal startup error.
    pub credential: Option<String>,
    /// Fixed destination channel. Absence is a non-fatal warning;
    /// dispatch then always fails with `ChannelNotFound`.
    pub target_channel_id: Option<ChannelId>,
}

impl RelayConfig {
    pub fn from_env() -> Self {
        let credential = std::env::var("DISCORD_BOT_TOKEN")
            .ok()
            .filter(|t| !t.is_empty());
        let target_channel_id = std::env::var("DISCORD_CHANNEL_ID")
            .ok()
            .filter(|c| !c.is_empty())
            .map(ChannelId);
        Self {
            credential,
            target_channel_id,
        }
    }
}

pub struct AppState {
    /// Read-only view of the connection; the lifecycle task is the
    /// single writer.
    pub connection: StateHandle,
    pub dispatcher: Dispatcher,
    pub start_time: Instant,
    pub started_at: DateTime<Utc>,
}

pub type SharedState = Arc<AppState>;
