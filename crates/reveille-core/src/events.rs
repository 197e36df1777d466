//! Events pushed from the device engine to the (excluded) UI layer.
//!
//! The core never assumes a UI thread exists; it only promises to
//! deliver these asynchronously on a channel. A front end renders them
//! however it likes -- the simulation harness just prints them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::time::SimpleTime;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// The device is now watching `group` (or nothing).
    GroupChanged { group: Option<String> },

    /// The local one-shot trigger was (re)armed.
    AlarmScheduled {
        group: String,
        time: SimpleTime,
        local_instant: DateTime<Utc>,
    },

    /// The trigger fired; the device is audibly ringing.
    RingingStarted { group: String },

    /// Ringing stopped -- everyone is awake, or the user silenced it.
    /// A foreground ringing screen should navigate away on this.
    RingingStopped { group: String },

    /// This device completed the awake set and pushed the cycle reset.
    CycleReset { group: String },
}
