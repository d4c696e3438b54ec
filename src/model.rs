//! Records shared by the watcher, the phases and the store.
//!
//! A [`Group`] is a tracked chat, a [`Standuper`] is one member who is
//! expected to report, and a [`NotificationThread`] is an open escalation
//! for a standuper who missed the deadline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Chat identifier as issued by the chat platform.
pub type ChatId = i64;

/// User identifier as issued by the chat platform.
pub type UserId = i64;

/// A tracked group chat and its deadline configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub chat_id: ChatId,
    pub title: String,
    /// IANA time zone name, e.g. `Europe/London`.
    pub tz: String,
    /// Display language code, e.g. `en` or `ru`.
    pub language: String,
    /// Free-text deadline expression. Empty means deadlines are disabled.
    pub standup_deadline: String,
}

impl Group {
    /// Create a group with UTC, English and no deadline.
    pub fn new(chat_id: ChatId, title: impl Into<String>) -> Self {
        Self {
            chat_id,
            title: title.into(),
            tz: "UTC".to_owned(),
            language: "en".to_owned(),
            standup_deadline: String::new(),
        }
    }

    /// Set the time zone.
    pub fn with_tz(mut self, tz: impl Into<String>) -> Self {
        self.tz = tz.into();
        self
    }

    /// Set the display language.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Set the deadline expression.
    pub fn with_deadline(mut self, expression: impl Into<String>) -> Self {
        self.standup_deadline = expression.into();
        self
    }

    /// The trimmed deadline expression, or `None` when deadlines are disabled.
    #[must_use]
    pub fn deadline_expression(&self) -> Option<&str> {
        let trimmed = self.standup_deadline.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}

/// Whether a standuper takes part in deadline tracking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StanduperStatus {
    #[default]
    Active,
    Inactive,
}

impl StanduperStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }

    /// Parse a stored status. Anything unknown is treated as inactive.
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("active") {
            Self::Active
        } else {
            Self::Inactive
        }
    }
}

/// A chat member expected to submit standups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standuper {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub username: Option<String>,
    pub language_code: String,
    pub tz: String,
    pub warnings: u32,
    pub status: StanduperStatus,
    pub created: DateTime<Utc>,
}

impl Standuper {
    /// Create an active standuper. Blank usernames are stored as `None`.
    pub fn new(chat_id: ChatId, user_id: UserId, username: Option<String>) -> Self {
        Self {
            chat_id,
            user_id,
            username: normalize_username(username),
            language_code: "en".to_owned(),
            tz: "UTC".to_owned(),
            warnings: 0,
            status: StanduperStatus::Active,
            created: Utc::now(),
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == StanduperStatus::Active
    }

    /// How the standuper is addressed in group messages.
    #[must_use]
    pub fn mention(&self) -> Mention {
        Mention::for_user(self.user_id, self.username.as_deref())
    }
}

/// Display identity used in outgoing messages.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Mention {
    /// `@username`.
    Username(String),
    /// Anonymous mention keyed by the numeric user id.
    Anonymous(UserId),
}

impl Mention {
    pub fn for_user(user_id: UserId, username: Option<&str>) -> Self {
        match username.map(str::trim).filter(|u| !u.is_empty()) {
            Some(name) => Self::Username(name.trim_start_matches('@').to_owned()),
            None => Self::Anonymous(user_id),
        }
    }
}

impl fmt::Display for Mention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Username(name) => write!(f, "@{name}"),
            Self::Anonymous(id) => write!(f, "[stranger](tg://user?id={id})"),
        }
    }
}

/// Key of a notification thread: one per (chat, standuper).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ThreadKey {
    pub chat_id: ChatId,
    pub user_id: UserId,
}

/// Open escalation for a standuper who missed the deadline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationThread {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub username: Option<String>,
    /// Instant of the next reminder.
    pub next_reminder_at: DateTime<Utc>,
    /// Reminders already sent for this thread.
    pub reminder_counter: u32,
}

impl NotificationThread {
    /// Open a fresh thread for `standuper` with a zero counter.
    pub fn open(standuper: &Standuper, next_reminder_at: DateTime<Utc>) -> Self {
        Self {
            chat_id: standuper.chat_id,
            user_id: standuper.user_id,
            username: standuper.username.clone(),
            next_reminder_at,
            reminder_counter: 0,
        }
    }

    #[must_use]
    pub fn key(&self) -> ThreadKey {
        ThreadKey {
            chat_id: self.chat_id,
            user_id: self.user_id,
        }
    }

    #[must_use]
    pub fn mention(&self) -> Mention {
        Mention::for_user(self.user_id, self.username.as_deref())
    }
}

/// A submitted standup report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standup {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub text: String,
    pub created: DateTime<Utc>,
}

fn normalize_username(username: Option<String>) -> Option<String> {
    username
        .map(|u| u.trim().trim_start_matches('@').to_owned())
        .filter(|u| !u.is_empty())
}
