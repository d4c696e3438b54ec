//! Group watching: one ticking task per tracked group.
//!
//! [`WatcherPool`] consumes [`WatchRequest`]s (usually from a [`GroupFeed`])
//! and runs a [`GroupWatcher`] for every tracked chat.

pub mod feed;
pub mod group;
pub mod pool;

pub use feed::GroupFeed;
pub use group::{GroupWatcher, StopReason, TickOutcome, WatchContext, WatcherState};
pub use pool::{WatchRequest, WatcherPool};
