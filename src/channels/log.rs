use crate::channels::traits::{ChatSender, SendError};
use crate::model::ChatId;
use async_trait::async_trait;

/// Dry-run sender that writes messages to the log instead of a chat.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSender;

#[async_trait]
impl ChatSender for LogSender {
    fn id(&self) -> &'static str {
        "log"
    }

    async fn send(&self, chat_id: ChatId, text: &str) -> Result<(), SendError> {
        tracing::info!(chat_id, text, "dry-run message");
        Ok(())
    }
}
