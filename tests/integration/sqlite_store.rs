//! SQLite store persistence across reopen.

use chrono::{TimeZone, Utc};
use standup_nudge::model::{Group, NotificationThread, Standup, Standuper};
use standup_nudge::store::{SqliteStore, StandupStore, SubmissionOracle};

#[test]
fn data_survives_reopen() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("nested").join("standups.db");
    let at = Utc.with_ymd_and_hms(2024, 3, 4, 10, 30, 0).unwrap();

    {
        let store = SqliteStore::open(&path).expect("open db");
        store
            .save_group(&Group::new(-1, "ops").with_tz("Asia/Tokyo").with_deadline("9am"))
            .unwrap();
        let standuper = Standuper::new(-1, 7, Some("kenji".to_owned()));
        store.create_standuper(&standuper).unwrap();
        store
            .upsert_thread(&NotificationThread::open(&standuper, at))
            .unwrap();
        store
            .record_standup(&Standup {
                chat_id: -1,
                user_id: 7,
                text: "done".to_owned(),
                created: at,
            })
            .unwrap();
    }

    let store = SqliteStore::open(&path).expect("reopen db");
    let group = store.find_group(-1).unwrap().expect("group persisted");
    assert_eq!(group.tz, "Asia/Tokyo");
    assert_eq!(group.deadline_expression(), Some("9am"));

    let standupers = store.list_active_standupers(-1).unwrap();
    assert_eq!(standupers.len(), 1);
    assert_eq!(standupers[0].username.as_deref(), Some("kenji"));

    let threads = store.list_threads(-1).unwrap();
    assert_eq!(threads[0].next_reminder_at, at);

    let tokyo_now = at.with_timezone(&chrono_tz::Asia::Tokyo);
    assert!(store.submitted_today(-1, 7, &tokyo_now).unwrap());
}

#[test]
fn teardown_deletes_are_scoped_to_one_chat() {
    let store = SqliteStore::open_in_memory().expect("open db");
    for chat in [-1, -2] {
        store.save_group(&Group::new(chat, "team")).unwrap();
        store
            .create_standuper(&Standuper::new(chat, 1, None))
            .unwrap();
    }

    store.delete_group_standupers(-1).unwrap();
    store.delete_group(-1).unwrap();

    assert_eq!(store.list_groups().unwrap().len(), 1);
    assert!(store.list_active_standupers(-1).unwrap().is_empty());
    assert_eq!(store.list_active_standupers(-2).unwrap().len(), 1);
}
