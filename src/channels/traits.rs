use crate::model::ChatId;
use async_trait::async_trait;

/// Delivery failure reported by a [`ChatSender`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    /// The bot is no longer a member of the chat, or the chat is gone.
    #[error("removed from chat {chat_id}: {reason}")]
    RemovedFromChat { chat_id: ChatId, reason: String },

    /// Any other delivery failure.
    #[error("send failed: {0}")]
    Failed(String),
}

impl SendError {
    #[must_use]
    pub fn is_removed_from_chat(&self) -> bool {
        matches!(self, Self::RemovedFromChat { .. })
    }
}

/// Outbound chat transport. New transports only need to implement this trait.
#[async_trait]
pub trait ChatSender: Send + Sync {
    /// Stable transport identifier (e.g. `telegram`).
    fn id(&self) -> &'static str;

    /// Post `text` to the group chat `chat_id`.
    async fn send(&self, chat_id: ChatId, text: &str) -> Result<(), SendError>;
}
