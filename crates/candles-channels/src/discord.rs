//! Discord channel — resolves channels/members and sends messages via the
//! Bot REST API. Implements the narrow `Host` interface the scheduler
//! consumes; nothing else of Discord's object model leaks past here.

use async_trait::async_trait;
use serde::Deserialize;

use candles_core::config::DiscordConfig;
use candles_core::error::{CandlesError, Result};
use candles_core::traits::{DestinationHandle, Host, UserHandle};
use candles_core::types::{DestinationId, GroupId, UserId};

const API_BASE: &str = "https://discord.com/api/v10";

/// Discord REST client implementing [`Host`].
pub struct DiscordChannel {
    config: DiscordConfig,
    client: reqwest::Client,
}

impl DiscordChannel {
    pub fn new(config: DiscordConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!("{API_BASE}/{path}")
    }

    fn auth(&self) -> String {
        format!("Bot {}", self.config.bot_token)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let response = self
            .client
            .get(self.api_url(path))
            .header("Authorization", self.auth())
            .send()
            .await
            .map_err(|e| CandlesError::Resolution(format!("GET {path} failed: {e}")))?;

        // 404 (gone) and 403 (no access) are both "cannot resolve".
        if response.status() == reqwest::StatusCode::NOT_FOUND
            || response.status() == reqwest::StatusCode::FORBIDDEN
        {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(CandlesError::Resolution(format!(
                "GET {path}: HTTP {}",
                response.status()
            )));
        }
        let value = response
            .json::<T>()
            .await
            .map_err(|e| CandlesError::Resolution(format!("Invalid response for {path}: {e}")))?;
        Ok(Some(value))
    }
}

#[async_trait]
impl Host for DiscordChannel {
    async fn resolve_destination(&self, id: DestinationId) -> Option<DestinationHandle> {
        match self.get_json::<ChannelPayload>(&format!("channels/{id}")).await {
            Ok(Some(channel)) => Some(DestinationHandle {
                id,
                name: format!("#{}", channel.name.unwrap_or_else(|| id.to_string())),
            }),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("⚠️ Channel {id} lookup failed: {e}");
                None
            }
        }
    }

    async fn resolve_user(&self, group: GroupId, user: UserId) -> Option<UserHandle> {
        let path = format!("guilds/{group}/members/{user}");
        match self.get_json::<MemberPayload>(&path).await {
            Ok(Some(member)) => Some(member.into_handle(user)),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("⚠️ Member {user} lookup in guild {group} failed: {e}");
                None
            }
        }
    }

    async fn send(&self, dest: &DestinationHandle, text: &str) -> Result<()> {
        let response = self
            .client
            .post(self.api_url(&format!("channels/{}/messages", dest.id)))
            .header("Authorization", self.auth())
            .json(&serde_json::json!({ "content": text }))
            .send()
            .await
            .map_err(|e| CandlesError::Transport(format!("Message send failed: {e}")))?;

        if response.status().is_success() {
            tracing::debug!("Message delivered to {}", dest.name);
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(CandlesError::Transport(format!(
                "Discord API error {status}: {body}"
            )))
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChannelPayload {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MemberPayload {
    nick: Option<String>,
    user: Option<MemberUser>,
}

#[derive(Debug, Deserialize)]
struct MemberUser {
    username: String,
    global_name: Option<String>,
}

impl MemberPayload {
    /// Display-name precedence: guild nick, then global name, then username.
    fn into_handle(self, id: UserId) -> UserHandle {
        let display_name = self
            .nick
            .or_else(|| self.user.as_ref().and_then(|u| u.global_name.clone()))
            .unwrap_or_else(|| {
                self.user
                    .map(|u| u.username)
                    .unwrap_or_else(|| id.to_string())
            });
        UserHandle {
            id,
            mention: format!("<@{id}>"),
            display_name,
        }
    }
}
