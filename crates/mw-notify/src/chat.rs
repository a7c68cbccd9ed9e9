//! Telegram-style bot webhook delivery.

use anyhow::{Context, Result};
use chrono_tz::Tz;
use mw_config::secrets::Secrets;
use mw_config::NotifyConfig;
use mw_diff::ChangeSet;
use mw_schemas::{FetchFailure, Snapshot};
use mw_sources::SourceDescriptor;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::{render, Notifier};

/// Resolved bot credentials. Both halves are required.
#[derive(Clone)]
pub struct ChatChannel {
    bot_token: String,
    chat_id: String,
}

impl ChatChannel {
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
        }
    }
}

impl std::fmt::Debug for ChatChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatChannel")
            .field("bot_token", &"<REDACTED>")
            .field("chat_id", &"<REDACTED>")
            .finish()
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

#[derive(Debug, Clone)]
pub struct ChatNotifier {
    http: reqwest::Client,
    api_base: String,
    channel: Option<ChatChannel>,
    tz: Tz,
}

impl ChatNotifier {
    pub fn new(api_base: impl Into<String>, channel: Option<ChatChannel>, tz: Tz) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .context("notifier http client init failed")?;
        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            channel,
            tz,
        })
    }

    /// Channel credentials are looked up by the env var NAMES in `cfg`.
    pub fn from_config(cfg: &NotifyConfig, secrets: &Secrets) -> Result<Self> {
        let channel = match (secrets.get(&cfg.bot_token_env), secrets.get(&cfg.chat_id_env)) {
            (Some(token), Some(chat_id)) => Some(ChatChannel::new(token, chat_id)),
            _ => None,
        };
        Self::new(cfg.api_base.clone(), channel, cfg.timezone()?)
    }

    pub fn is_configured(&self) -> bool {
        self.channel.is_some()
    }

    /// POST one message. Every failure is logged and swallowed.
    pub async fn send(&self, text: &str) {
        let Some(channel) = &self.channel else {
            info!("chat channel not configured; skipping notification");
            return;
        };

        let url = format!("{}/bot{}/sendMessage", self.api_base, channel.bot_token);
        let body = SendMessage {
            chat_id: &channel.chat_id,
            text,
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };

        match self.http.post(&url).json(&body).send().await {
            Ok(resp) if resp.status().is_success() => {
                debug!("notification delivered");
            }
            Ok(resp) => {
                error!(status = resp.status().as_u16(), "chat API rejected notification");
            }
            Err(e) => {
                // The URL embeds the bot token.
                error!(error = %e.without_url(), "failed to send notification");
            }
        }
    }
}

#[async_trait::async_trait]
impl Notifier for ChatNotifier {
    async fn notify_change(&self, source: &SourceDescriptor, changes: &ChangeSet, current: &Snapshot) {
        self.send(&render::render_change(source, changes, current, self.tz))
            .await;
    }

    async fn notify_failure(&self, source: &SourceDescriptor, failure: &FetchFailure) {
        self.send(&render::render_failure(source, failure, self.tz))
            .await;
    }
}
