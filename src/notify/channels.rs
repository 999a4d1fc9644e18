//! Chat channels a notification can be delivered to

use chrono::Utc;
use serde_json::{Value, json};
use tracing::trace;

use super::NotifyError;
use super::discord::{Embed, MessageBuilder};
use crate::config::{Discord, Webhook, WebhookConfig};

const TELEGRAM_API: &str = "https://api.telegram.org";

#[derive(Debug, Clone)]
pub enum Channel {
    Telegram {
        api_base: String,
        token: String,
        chat_id: String,
    },
    Wecom {
        url: String,
    },
    Lark {
        url: String,
    },
    Discord(Discord),
    Webhook(Webhook),
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.trim().is_empty()).cloned()
}

impl Channel {
    /// Channels with all required fields filled in
    pub fn from_config(config: &WebhookConfig) -> Vec<Channel> {
        let mut channels = vec![];

        if let (Some(token), Some(chat_id)) = (
            non_empty(&config.telegram_token),
            non_empty(&config.telegram_chat_id),
        ) {
            channels.push(Channel::Telegram {
                api_base: TELEGRAM_API.to_string(),
                token,
                chat_id,
            });
        }
        if let Some(url) = non_empty(&config.wecom) {
            channels.push(Channel::Wecom { url });
        }
        if let Some(url) = non_empty(&config.lark) {
            channels.push(Channel::Lark { url });
        }
        if let Some(discord) = config.discord.as_ref().filter(|d| !d.url.is_empty()) {
            channels.push(Channel::Discord(discord.clone()));
        }
        if let Some(webhook) = config.webhook.as_ref().filter(|w| !w.url.is_empty()) {
            channels.push(Channel::Webhook(webhook.clone()));
        }

        channels
    }

    pub fn name(&self) -> &'static str {
        match self {
            Channel::Telegram { .. } => "telegram",
            Channel::Wecom { .. } => "wecom",
            Channel::Lark { .. } => "lark",
            Channel::Discord(_) => "discord",
            Channel::Webhook(_) => "webhook",
        }
    }

    fn url(&self) -> String {
        match self {
            Channel::Telegram {
                api_base, token, ..
            } => format!("{api_base}/bot{token}/sendMessage"),
            Channel::Wecom { url } | Channel::Lark { url } => url.clone(),
            Channel::Discord(discord) => discord.url.clone(),
            Channel::Webhook(webhook) => webhook.url.clone(),
        }
    }

    /// JSON body expected by the channel
    pub fn payload(&self, message: &str) -> Value {
        match self {
            Channel::Telegram { chat_id, .. } => json!({
                "chat_id": chat_id,
                "text": message,
                "parse_mode": "HTML",
            }),
            Channel::Wecom { .. } => json!({
                "msgtype": "text",
                "text": { "content": message },
            }),
            Channel::Lark { .. } => json!({
                "msg_type": "text",
                "content": { "text": message },
            }),
            Channel::Discord(discord) => {
                let mut builder = MessageBuilder::new().add_embed(Embed::alert(message));
                if let Some(user_id) = &discord.user_id {
                    builder = builder.content(format!("🚨 <@{user_id}>"));
                }
                serde_json::to_value(builder.build()).unwrap_or(Value::Null)
            }
            Channel::Webhook(_) => json!({
                "message": message,
                "source": "market-sentinel",
                "timestamp": Utc::now().to_rfc3339(),
            }),
        }
    }

    pub async fn send(&self, client: &reqwest::Client, message: &str) -> Result<(), NotifyError> {
        let channel = self.name();
        trace!("posting {channel} notification");

        let response = client
            .post(self.url())
            .json(&self.payload(message))
            .send()
            .await
            .map_err(|e| NotifyError::Request {
                channel,
                message: e.to_string(),
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(NotifyError::Rejected {
                channel,
                status: response.status().as_u16(),
            })
        }
    }
}
