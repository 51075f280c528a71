use chrono::{DateTime, Local, NaiveDateTime, Utc};

/// Source of "now" for the save session and the CLI.
///
/// The engine functions never call this themselves; callers read the clock
/// once and thread the value through.
pub trait Clock {
    /// Current instant, used for `created_at` / `updated_at` stamps.
    fn now(&self) -> DateTime<Utc>;

    /// Board-local wall-clock time, used for publish-date comparisons.
    fn local_now(&self) -> NaiveDateTime;
}

/// The real wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn local_now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock pinned to one instant, with board-local time equal to UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock {
    at: DateTime<Utc>,
}

impl FixedClock {
    #[must_use]
    pub const fn new(at: DateTime<Utc>) -> Self {
        Self { at }
    }

    /// Build from a board-local wall-clock value.
    #[must_use]
    pub fn at_local(local: NaiveDateTime) -> Self {
        Self {
            at: local.and_utc(),
        }
    }

    /// Move the clock forward by `millis` milliseconds.
    pub fn advance_millis(&mut self, millis: i64) {
        self.at += chrono::Duration::milliseconds(millis);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.at
    }

    fn local_now(&self) -> NaiveDateTime {
        self.at.naive_utc()
    }
}
