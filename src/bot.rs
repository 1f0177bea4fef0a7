use std::sync::Arc;

use anyhow::{anyhow, Context as _};
use async_trait::async_trait;
use log::{debug, info};

use crate::config::{Config, ProviderKind};
use crate::provider::{AnswerProvider, OpenAiProvider, TeamServerProvider};
use crate::slack::{
    AuthTestResponse, ConversationsJoinResponse, ConversationsListResponse, JoinConversation,
    PostMessage, PostMessageResponse,
};

#[async_trait]
pub trait Bot: Send + Sync {
    fn bot_id(&self) -> &'_ str;
    fn provider(&self) -> &dyn AnswerProvider;

    /// Posts `text` into `channel`, threaded under `thread_ts` when given.
    async fn send_message(
        &self,
        channel: &str,
        text: &str,
        thread_ts: Option<&str>,
    ) -> anyhow::Result<PostMessageResponse>;
}

pub struct RelayBot {
    pub bot_id: String,
    pub bot_token: String,
    pub api_base_url: String,
    pub http_client: reqwest::Client,
    pub provider: Arc<dyn AnswerProvider>,
}

impl RelayBot {
    /// Builds the bot from configuration, asking Slack who we are when the
    /// bot user id is not configured.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let provider: Arc<dyn AnswerProvider> = match config.provider {
            ProviderKind::TeamServer => Arc::new(TeamServerProvider::new(
                config.team_server.clone(),
                config.provider_timeout,
            )?),
            ProviderKind::OpenAi => Arc::new(OpenAiProvider::new(
                config.openai.clone(),
                config.provider_timeout,
            )?),
        };

        let mut bot = Self {
            bot_id: config.bot_user_id.clone().unwrap_or_default(),
            bot_token: config.bot_token.clone(),
            api_base_url: config.slack_api_base_url.trim_end_matches('/').to_string(),
            http_client: reqwest::Client::new(),
            provider,
        };

        if bot.bot_id.is_empty() {
            bot.bot_id = bot.auth_test().await?;
        }

        info!(
            "Bot user id: {}, answer provider: {}",
            bot.bot_id,
            bot.provider.name()
        );

        Ok(bot)
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/{}", self.api_base_url, method)
    }

    /// Resolves the bot's own user id.
    pub async fn auth_test(&self) -> anyhow::Result<String> {
        let resp = self
            .http_client
            .post(self.api_url("auth.test"))
            .bearer_auth(&self.bot_token)
            .send()
            .await
            .context("Failed to send request")?
            .json::<AuthTestResponse>()
            .await
            .context("Failed to parse response")?;

        match resp {
            AuthTestResponse {
                ok: true,
                user_id: Some(user_id),
                ..
            } => Ok(user_id),
            AuthTestResponse { error, .. } => Err(anyhow!(
                "auth.test failed - {}",
                error.unwrap_or_else(|| "no user id".to_string())
            )),
        }
    }

    /// Joins the public channel called `name`, returning its id.
    pub async fn join_channel(&self, name: &str) -> anyhow::Result<String> {
        let mut cursor: Option<String> = None;

        let channel = loop {
            let mut query = vec![
                ("types", "public_channel"),
                ("exclude_archived", "true"),
                ("limit", "200"),
            ];
            if let Some(cursor) = &cursor {
                query.push(("cursor", cursor.as_str()));
            }

            let resp = self
                .http_client
                .get(self.api_url("conversations.list"))
                .bearer_auth(&self.bot_token)
                .query(&query)
                .send()
                .await
                .context("Failed to send request")?
                .json::<ConversationsListResponse>()
                .await
                .context("Failed to parse response")?;

            if !resp.ok {
                return Err(anyhow!(
                    "conversations.list failed - {}",
                    resp.error.unwrap_or_default()
                ));
            }

            if let Some(channel) = resp
                .channels
                .unwrap_or_default()
                .into_iter()
                .find(|channel| channel.name.as_deref() == Some(name))
            {
                break channel;
            }

            cursor = resp
                .response_metadata
                .and_then(|meta| meta.next_cursor)
                .filter(|next| !next.is_empty());

            if cursor.is_none() {
                return Err(anyhow!("Channel #{} not found", name));
            }
        };

        if channel.is_member == Some(true) {
            debug!("Already a member of #{} ({})", name, channel.id);
            return Ok(channel.id);
        }

        let resp = self
            .http_client
            .post(self.api_url("conversations.join"))
            .header("Content-type", "application/json; charset=utf-8")
            .bearer_auth(&self.bot_token)
            .json(&JoinConversation {
                channel: &channel.id,
            })
            .send()
            .await
            .context("Failed to send request")?
            .json::<ConversationsJoinResponse>()
            .await
            .context("Failed to parse response")?;

        if !resp.ok {
            return Err(anyhow!(
                "conversations.join failed - {}",
                resp.error.unwrap_or_default()
            ));
        }

        Ok(channel.id)
    }
}

#[async_trait]
impl Bot for RelayBot {
    fn bot_id(&self) -> &'_ str {
        &self.bot_id
    }

    fn provider(&self) -> &dyn AnswerProvider {
        self.provider.as_ref()
    }

    async fn send_message(
        &self,
        channel: &str,
        text: &str,
        thread_ts: Option<&str>,
    ) -> anyhow::Result<PostMessageResponse> {
        let builder = self
            .http_client
            .post(self.api_url("chat.postMessage"))
            .header("Content-type", "application/json; charset=utf-8")
            .bearer_auth(&self.bot_token);

        let reply = PostMessage {
            channel,
            text,
            thread_ts,
            unfurl_links: None,
        };

        let resp = builder
            .json(&reply)
            .send()
            .await
            .context("Failed to send request")?;

        let resp = resp
            .json::<PostMessageResponse>()
            .await
            .context("Failed to parse response")?;

        Ok(resp)
    }
}
