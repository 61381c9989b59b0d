//! Discord REST implementation of [`ChatBackend`].

use std::sync::RwLock;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::AUTHORIZATION;
use serde_json::{Value, json};
use tracing::debug;

use crate::backend::{BackendError, BotIdentity, ChannelId, ChatBackend};

const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

pub struct DiscordBackend {
    http: reqwest::Client,
    api_base: String,
    /// Set by a successful `connect`, cleared by `disconnect`.
    token: RwLock<Option<String>>,
}

impl DiscordBackend {
    pub fn new() -> Self {
        Self::with_api_base(DEFAULT_API_BASE)
    }

    /// Base URL override, for pointing at a local stand-in server.
    pub fn with_api_base(api_base: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.into(),
            token: RwLock::new(None),
        }
    }

    fn auth_header(&self) -> Result<String, BackendError> {
        self.token
            .read()
            .unwrap()
            .as_ref()
            .map(|token| format!("Bot {token}"))
            .ok_or(BackendError::NotConnected)
    }
}

impl Default for DiscordBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn transport(e: reqwest::Error) -> BackendError {
    BackendError::Transport(e.to_string())
}

#[async_trait]
impl ChatBackend for DiscordBackend {
    async fn connect(&self, credential: &str) -> Result<BotIdentity, BackendError> {
        let response = self
            .http
            .get(format!("{}/users/@me", self.api_base))
            .header(AUTHORIZATION, format!("Bot {credential}"))
            .send()
            .await
            .map_err(transport)?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(BackendError::Unauthorized);
        }
        if !response.status().is_success() {
            return Err(BackendError::Status(response.status().as_u16()));
        }

        let body: Value = response.json().await.map_err(transport)?;
        let username = body
            .get("username")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();

        *self.token.write().unwrap() = Some(credential.to_string());
        Ok(BotIdentity { username })
    }

    async fn send_message(&self, channel: &ChannelId, content: &str) -> Result<(), BackendError> {
        let auth = self.auth_header()?;
        let response = self
            .http
            .post(format!("{}/channels/{}/messages", self.api_base, channel))
            .header(AUTHORIZATION, auth)
            .json(&json!({ "content": content }))
            .send()
            .await
            .map_err(transport)?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(BackendError::Status(response.status().as_u16()))
        }
    }

    async fn channel_accessible(&self, channel: &ChannelId) -> bool {
        let Ok(auth) = self.auth_header() else {
            return false;
        };
        match self
            .http
            .get(format!("{}/channels/{}", self.api_base, channel))
            .header(AUTHORIZATION, auth)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Channel probe for {} failed: {}", channel, e);
                false
            }
        }
    }

    async fn disconnect(&self) {
        // REST sessions hold no server-side state; dropping the token
        // is the whole teardown.
        self.token.write().unwrap().take();
    }
}
