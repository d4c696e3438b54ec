//! Shared helpers for integration tests.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use standup_nudge::calendar::WorkingDays;
use standup_nudge::channels::{ChatSender, SendError};
use standup_nudge::deadline::LocaleDeadlineParser;
use standup_nudge::i18n::Catalog;
use standup_nudge::model::{ChatId, Group, Standup, Standuper};
use standup_nudge::store::{SqliteStore, StandupStore};
use standup_nudge::watcher::GroupWatcher;
use standup_nudge::{Engine, EngineSettings, WatchContext};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

pub(crate) const CHAT: ChatId = -1001;

/// Sender that records deliveries; can be switched to fail every send.
#[derive(Debug, Default)]
pub(crate) struct RecordingSender {
    sent: Mutex<Vec<(ChatId, String)>>,
    failure: Mutex<Option<SendError>>,
}

impl RecordingSender {
    pub(crate) fn sent(&self) -> Vec<(ChatId, String)> {
        self.sent.lock().expect("sent lock").clone()
    }

    pub(crate) fn texts(&self) -> Vec<String> {
        self.sent().into_iter().map(|(_, text)| text).collect()
    }

    pub(crate) fn clear(&self) {
        self.sent.lock().expect("sent lock").clear();
    }

    pub(crate) fn fail_with(&self, error: SendError) {
        *self.failure.lock().expect("failure lock") = Some(error);
    }
}

#[async_trait]
impl ChatSender for RecordingSender {
    fn id(&self) -> &'static str {
        "recording"
    }

    async fn send(&self, chat_id: ChatId, text: &str) -> Result<(), SendError> {
        if let Some(error) = self.failure.lock().expect("failure lock").clone() {
            return Err(error);
        }
        self.sent
            .lock()
            .expect("sent lock")
            .push((chat_id, text.to_owned()));
        Ok(())
    }
}

/// SQLite-backed store, recording sender and a watcher for one London group.
pub(crate) struct Harness {
    pub store: Arc<SqliteStore>,
    pub sender: Arc<RecordingSender>,
    pub watcher: GroupWatcher,
    _dir: tempfile::TempDir,
}

impl Harness {
    /// Group `CHAT` in Europe/London with a 10am deadline and one standuper
    /// per `(user_id, username)`.
    pub(crate) fn london(standupers: &[(i64, Option<&str>)]) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let store = Arc::new(SqliteStore::open(&dir.path().join("standups.db")).expect("open db"));
        let sender = Arc::new(RecordingSender::default());

        let group = Group::new(CHAT, "backend")
            .with_tz("Europe/London")
            .with_language("en")
            .with_deadline("10am");
        store.save_group(&group).expect("save group");
        for &(user_id, username) in standupers {
            store
                .create_standuper(&Standuper::new(
                    CHAT,
                    user_id,
                    username.map(str::to_owned),
                ))
                .expect("create standuper");
        }

        let ctx = Arc::new(
            WatchContext::new(engine(), store.clone(), store.clone(), sender.clone())
                .with_window(Arc::new(WorkingDays::default())),
        );
        let watcher = GroupWatcher::new(group, ctx, CancellationToken::new());
        Self {
            store,
            sender,
            watcher,
            _dir: dir,
        }
    }

    pub(crate) fn report(&self, user_id: i64, at: DateTime<Utc>) {
        self.store
            .record_standup(&Standup {
                chat_id: CHAT,
                user_id,
                text: "yesterday: reviews; today: deploy".to_owned(),
                created: at,
            })
            .expect("record standup");
    }

    pub(crate) fn update_group(&self, change: impl FnOnce(Group) -> Group) {
        let group = self
            .store
            .find_group(CHAT)
            .expect("find group")
            .expect("group exists");
        self.store.save_group(&change(group)).expect("save group");
    }
}

pub(crate) fn engine() -> Engine {
    Engine::new(
        EngineSettings::default(),
        Arc::new(LocaleDeadlineParser::default()),
        Arc::new(Catalog::default()),
    )
}

/// Monday 2024-03-04 at `h:m` London time (GMT, equal to UTC).
pub(crate) fn london(h: u32, m: u32) -> DateTime<Utc> {
    chrono_tz::Europe::London
        .with_ymd_and_hms(2024, 3, 4, h, m, 0)
        .unwrap()
        .with_timezone(&Utc)
}
