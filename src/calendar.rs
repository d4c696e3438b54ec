//! Reporting window and clock collaborators.

use crate::model::Group;
use chrono::{DateTime, Datelike, Utc, Weekday};
use chrono_tz::Tz;
use std::sync::Mutex;

/// Decides whether a group is inside its reporting window.
pub trait ReportingWindow: Send + Sync {
    fn is_open(&self, group: &Group, local_now: &DateTime<Tz>) -> bool;
}

/// Open on a fixed set of weekdays in the group's local time.
#[derive(Debug, Clone)]
pub struct WorkingDays {
    days: Vec<Weekday>,
}

impl WorkingDays {
    pub fn new(days: Vec<Weekday>) -> Self {
        Self { days }
    }
}

impl Default for WorkingDays {
    fn default() -> Self {
        Self::new(vec![
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
        ])
    }
}

impl ReportingWindow for WorkingDays {
    fn is_open(&self, _group: &Group, local_now: &DateTime<Tz>) -> bool {
        self.days.contains(&local_now.weekday())
    }
}

/// Always open.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysOpen;

impl ReportingWindow for AlwaysOpen {
    fn is_open(&self, _group: &Group, _local_now: &DateTime<Tz>) -> bool {
        true
    }
}

/// Source of the reference instant read once per tick.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for tests and simulations.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        let mut guard = self.now.lock().unwrap_or_else(|p| p.into_inner());
        *guard = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut guard = self.now.lock().unwrap_or_else(|p| p.into_inner());
        *guard += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|p| p.into_inner())
    }
}
