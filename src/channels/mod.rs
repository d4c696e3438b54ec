//! Outbound chat transports.
//!
//! Transports are pluggable behind [`ChatSender`]. The watchers only need to
//! post text to a group and learn whether the bot was removed from it.

mod log;
pub mod telegram;
pub mod traits;

pub use log::LogSender;
pub use telegram::TelegramSender;
pub use traits::{ChatSender, SendError};

use crate::config::TelegramConfig;
use std::sync::Arc;

/// Build the configured sender: Telegram when a bot token is set, otherwise
/// the dry-run [`LogSender`].
pub fn sender_from_config(config: &TelegramConfig) -> Arc<dyn ChatSender> {
    if config.bot_token.trim().is_empty() {
        tracing::warn!("telegram bot token is empty; messages are only logged");
        Arc::new(LogSender)
    } else {
        Arc::new(TelegramSender::new(config))
    }
}
