//! Shared test utilities used across multiple test modules.

use crate::channels::{ChatSender, SendError};
use crate::model::ChatId;
use async_trait::async_trait;
use std::sync::Mutex;

/// Sender that records every message and optionally fails each send.
#[derive(Debug, Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<(ChatId, String)>>,
    failure: Option<SendError>,
}

impl RecordingSender {
    /// A sender whose every delivery fails with `error`.
    pub fn failing(error: SendError) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failure: Some(error),
        }
    }

    /// Messages successfully delivered, in order.
    pub fn sent(&self) -> Vec<(ChatId, String)> {
        self.sent.lock().expect("sent lock").clone()
    }
}

#[async_trait]
impl ChatSender for RecordingSender {
    fn id(&self) -> &'static str {
        "recording"
    }

    async fn send(&self, chat_id: ChatId, text: &str) -> Result<(), SendError> {
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        self.sent
            .lock()
            .expect("sent lock")
            .push((chat_id, text.to_owned()));
        Ok(())
    }
}
