use crate::channels::traits::{ChatSender, SendError};
use crate::config::TelegramConfig;
use crate::model::ChatId;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Descriptions the Bot API uses when the bot can no longer post to a chat.
const REMOVED_MARKERS: &[&str] = &[
    "bot was kicked",
    "bot is not a member",
    "not a member of the",
    "chat not found",
    "group chat was deleted",
];

/// Telegram Bot API sender using `sendMessage`.
pub struct TelegramSender {
    base_url: String,
    bot_token: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    error_code: Option<u16>,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramSender {
    pub fn new(config: &TelegramConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            base_url: config.api_base_url.trim_end_matches('/').to_owned(),
            bot_token: config.bot_token.clone(),
            client,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.base_url, self.bot_token)
    }
}

/// Map a failed Bot API reply to a [`SendError`].
pub(crate) fn classify(chat_id: ChatId, status: u16, description: &str) -> SendError {
    let lower = description.to_lowercase();
    let removed = matches!(status, 400 | 403)
        && REMOVED_MARKERS.iter().any(|marker| lower.contains(marker));
    if removed {
        SendError::RemovedFromChat {
            chat_id,
            reason: description.to_owned(),
        }
    } else {
        SendError::Failed(format!("telegram {status}: {description}"))
    }
}

#[async_trait]
impl ChatSender for TelegramSender {
    fn id(&self) -> &'static str {
        "telegram"
    }

    async fn send(&self, chat_id: ChatId, text: &str) -> Result<(), SendError> {
        if self.bot_token.trim().is_empty() {
            return Err(SendError::Failed("telegram bot token is empty".to_owned()));
        }

        let body = json!({
            "chat_id": chat_id,
            "text": text,
        });
        let response = self
            .client
            .post(self.endpoint())
            .json(&body)
            .send()
            .await
            .map_err(|e| SendError::Failed(format!("telegram request failed: {e}")))?;

        let status = response.status();
        let raw = response.text().await.unwrap_or_default();
        let parsed: Option<ApiResponse> = serde_json::from_str(&raw).ok();

        match parsed {
            Some(reply) if reply.ok && status.is_success() => Ok(()),
            Some(reply) => {
                let code = reply.error_code.unwrap_or(status.as_u16());
                let description = reply.description.unwrap_or_default();
                Err(classify(chat_id, code, &description))
            }
            None => Err(classify(chat_id, status.as_u16(), &raw)),
        }
    }
}
