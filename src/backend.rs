//! The chat-backend capability boundary.
//!
//! The relay only needs four things from the chat service: connect,
//! send to a channel, probe a channel, and disconnect. Everything
//! behind that (gateway protocol, rate limits, shards) stays inside
//! the implementation.

use std::fmt;

use async_trait::async_trait;

/// Opaque channel identifier as the backend reports it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelId(pub String);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The bot's own identity, known once the handshake completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotIdentity {
    pub username: String,
}

impl fmt::Display for BotIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.username)
    }
}

/// One channel inside a group the bot was added to, with the send
/// permission already computed by the backend.
#[derive(Debug, Clone)]
pub struct GroupChannel {
    pub id: ChannelId,
    pub name: String,
    pub can_send: bool,
}

/// A group/server the bot has just joined, as reported by the backend.
#[derive(Debug, Clone)]
pub struct GroupScope {
    pub name: String,
    /// The group's designated default channel, if any.
    pub system_channel: Option<ChannelId>,
    /// Text channels in the group's listed order.
    pub channels: Vec<GroupChannel>,
}

/// Transport-level failures reported by the backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("backend returned status {0}")]
    Status(u16),

    #[error("credential rejected")]
    Unauthorized,

    #[error("not connected")]
    NotConnected,
}

/// Minimal capability surface of the chat service.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Performs the handshake and returns the bot's identity.
    async fn connect(&self, credential: &str) -> Result<BotIdentity, BackendError>;

    /// Sends one message to the given channel. Exactly one attempt.
    async fn send_message(&self, channel: &ChannelId, content: &str) -> Result<(), BackendError>;

    /// Whether the channel currently exists and is accessible to the bot.
    async fn channel_accessible(&self, channel: &ChannelId) -> bool;

    /// Tears down the session. Safe to call more than once.
    async fn disconnect(&self);
}
