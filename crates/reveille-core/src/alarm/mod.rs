//! The shared group alarm document and its wire contract.
//!
//! Document schema (field names are part of the wire contract):
//!
//! ```text
//! alarms/{groupID}: { members: [string], awake: [string],
//!                     time: "HH:MM", ringing: bool, allAwake: bool }
//! users/{userID}:   { alarm: string | null }
//! ```
//!
//! Records decode with full defaulting: a missing or malformed field
//! takes its resting value rather than failing the read, matching how
//! the reconciliation loop must survive documents written by older or
//! buggier clients.

pub mod ops;

use serde::{Deserialize, Serialize};

use crate::time::SimpleTime;

/// One group's shared alarm state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlarmRecord {
    /// Everyone in the group, unique, maintained by the membership ops.
    pub members: Vec<String>,
    /// Members who have acknowledged waking this cycle. Always a subset
    /// of `members` after any committed transaction.
    pub awake: Vec<String>,
    /// Next scheduled wake time, reference zone.
    pub time: SimpleTime,
    /// True once anyone has acknowledged this cycle.
    pub ringing: bool,
    /// True exactly when `awake` covers `members`, evaluated at write
    /// time by the acknowledgement transaction.
    #[serde(rename = "allAwake")]
    pub all_awake: bool,
}

impl AlarmRecord {
    /// A freshly created group: one member, default time, at rest.
    pub fn new_for(member: &str) -> Self {
        Self {
            members: vec![member.to_string()],
            ..Self::default()
        }
    }

    pub fn has_member(&self, user: &str) -> bool {
        self.members.iter().any(|m| m == user)
    }

    /// Back to the resting state: nobody awake, nothing ringing.
    pub fn clear_cycle(&mut self) {
        self.awake.clear();
        self.ringing = false;
        self.all_awake = false;
    }
}

/// A user's link to their current group, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserRecord {
    pub alarm: Option<String>,
}

/// Add `item` to a membership list if not already present.
pub(crate) fn add_unique(list: &mut Vec<String>, item: &str) {
    if item.is_empty() {
        return;
    }
    if !list.iter().any(|x| x == item) {
        list.push(item.to_string());
    }
}

/// Remove every occurrence of `item` from a membership list.
pub(crate) fn remove_unique(list: &mut Vec<String>, item: &str) {
    if item.is_empty() {
        return;
    }
    list.retain(|x| x != item);
}
