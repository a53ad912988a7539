//! Time source for a synchronization run

use chrono::{DateTime, Utc};

/// Supplies the current time
///
/// The engine reads the clock once per run so that every entity changed
/// in the same run carries the same timestamp.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at a given instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    at: DateTime<Utc>,
}

impl FixedClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self { at }
    }

    /// Clock frozen at `secs` seconds after the unix epoch
    pub fn from_timestamp(secs: i64) -> Self {
        Self {
            at: DateTime::from_timestamp(secs, 0).unwrap_or_default(),
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.at
    }
}
