//! Clock seam for scheduling decisions.
//!
//! Everything that turns a reference-zone time into a concrete trigger
//! instant goes through [`Clock`], so scheduling logic can be tested with
//! a pinned wall clock and zone offset.

use chrono::{DateTime, Local, Offset, Utc};

/// Source of "now" and of the device's zone offset.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Offset of the device's wall clock from the reference zone, in
    /// minutes (e.g. UTC+5:30 -> 330, UTC-8 -> -480).
    fn offset_minutes(&self) -> i32;
}

/// The real device clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn offset_minutes(&self) -> i32 {
        Local::now().offset().fix().local_minus_utc() / 60
    }
}

/// A pinned clock for tests and simulations.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    pub now: DateTime<Utc>,
    pub offset_minutes: i32,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>, offset_minutes: i32) -> Self {
        Self {
            now,
            offset_minutes,
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }

    fn offset_minutes(&self) -> i32 {
        self.offset_minutes
    }
}
