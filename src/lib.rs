//! standup-nudge: deadline reminders for team standups in group chats.
//!
//! Every tracked group gets its own watcher task that wakes once a minute
//! and, in the group's local time:
//!
//! - **Warn**: shortly before the deadline, lists everyone who has not
//!   reported yet
//! - **Remind**: escalates open notification threads at a fixed interval
//!   until the standuper reports or a reminder ceiling is hit
//! - **Notify**: at the deadline, names the non-reporters and opens a thread
//!   for each of them
//!
//! # Architecture
//!
//! - [`watcher`]: pool of per-group tasks fed by a stream of track requests
//! - [`engine`]: pure per-tick evaluation producing store mutations and messages
//! - [`store`]: SQLite and in-memory persistence behind [`store::StandupStore`]
//! - [`channels`]: outbound chat transports behind [`channels::ChatSender`]
//! - [`deadline`] and [`i18n`]: deadline grammar and message catalog

pub mod app_dirs;
pub mod calendar;
pub mod channels;
pub mod config;
pub mod deadline;
pub mod engine;
pub mod error;
pub mod i18n;
pub mod model;
pub mod store;
pub mod watcher;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::NudgeConfig;
pub use engine::{Engine, EngineSettings, TickInput, TickPlan, evaluate_tick};
pub use error::{NudgeError, Result};
pub use watcher::{GroupFeed, WatchContext, WatchRequest, WatcherPool};
