//! Notification dispatch: readiness gate, channel resolution, render,
//! and a single send attempt.

use std::sync::Arc;

use tracing::{info, warn};

use crate::backend::ChatBackend;
use crate::error::DispatchError;
use crate::lifecycle::StateHandle;
use crate::message;
use crate::notification::Notification;
use crate::resolver;

/// Stateless beyond reading the shared connection state; every
/// dispatch call is independent.
#[derive(Clone)]
pub struct Dispatcher {
    backend: Arc<dyn ChatBackend>,
    state: StateHandle,
}

impl Dispatcher {
    pub fn new(backend: Arc<dyn ChatBackend>, state: StateHandle) -> Self {
        Self { backend, state }
    }

    /// Delivers one notification to the fixed target channel.
    ///
    /// At most one send attempt per call: no retry, no queuing, no
    /// confirmation beyond the backend's immediate acknowledgment.
    pub async fn dispatch(&self, notification: &Notification) -> Result<(), DispatchError> {
        if !self.state.is_ready() {
            warn!("Dispatch attempted before chat connection is ready");
            return Err(DispatchError::NotReady);
        }

        let channel =
            resolver::resolve_fixed(&self.state).ok_or(DispatchError::ChannelNotFound)?;
        if !self.backend.channel_accessible(&channel).await {
            warn!("Configured channel {} is not accessible", channel);
            return Err(DispatchError::ChannelNotFound);
        }

        let body = message::render(notification);
        self.backend
            .send_message(&channel, &body)
            .await
            .map_err(DispatchError::DeliveryFailed)?;

        info!(
            "Notification for '{}' ({} commits) delivered to channel {}",
            notification.repository_name,
            notification.commits.len(),
            channel
        );
        Ok(())
    }
}
