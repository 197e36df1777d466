//! Membership and acknowledgement transactions.
//!
//! Every operation here is one atomic read-modify-write against the
//! store: read the group document and the caller's user link, validate,
//! write both or neither. Validation failures reject the transaction
//! body before anything is staged, so a guard violation never commits a
//! partial effect.

use tracing::{debug, warn};

use super::{add_unique, remove_unique, AlarmRecord, UserRecord};
use crate::error::{Failure, TxError};
use crate::store::{DocumentStore, StoreTx};
use crate::time::SimpleTime;

/// Result of an acknowledgement: whether this caller's entry completed
/// the awake set. Scoped to the call so one device may safely talk to
/// more than one group over its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetAwakeOutcome {
    pub completed_set: bool,
}

/// The alarm a user is currently linked to, as read at attach time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentAlarm {
    pub group_id: String,
    pub record: AlarmRecord,
}

/// Login/connect entry point: ensure the user document exists and fetch
/// the alarm their link points at. A dangling link (alarm document gone)
/// is cleared in the same transaction.
pub fn attach<S: DocumentStore>(store: &S, user_id: &str) -> Result<Option<CurrentAlarm>, Failure> {
    if user_id.is_empty() {
        return Err(Failure::AccountNotFound);
    }
    store
        .run_transaction(&mut |tx| {
            let user = match tx.get_user(user_id)? {
                Some(user) => user,
                None => {
                    // First sign-in: create the link document, unlinked.
                    tx.set_user(user_id, &UserRecord::default())?;
                    return Ok(None);
                }
            };
            let group_id = match user.alarm {
                Some(id) if !id.is_empty() => id,
                _ => return Ok(None),
            };
            match tx.get_alarm(&group_id)? {
                Some(record) => Ok(Some(CurrentAlarm { group_id, record })),
                None => {
                    // Link points at a deleted alarm; heal it.
                    tx.set_user(user_id, &UserRecord::default())?;
                    Ok(None)
                }
            }
        })
        .map_err(TxError::into_failure)
}

/// Create a new group alarm owned by nobody in particular, with the
/// requester as its first member. Detaches the requester from any
/// previous group first.
pub fn create<S: DocumentStore>(store: &S, group_id: &str, user_id: &str) -> Result<(), Failure> {
    if group_id.is_empty() {
        return Err(Failure::AlarmNotFound);
    }
    store
        .run_transaction(&mut |tx| {
            if tx.get_alarm(group_id)?.is_some() {
                return Err(TxError::Rejected(Failure::AlarmAlreadyExists));
            }
            detach_from_previous(tx, user_id, None)?;
            tx.set_alarm(group_id, &AlarmRecord::new_for(user_id))?;
            link_user(tx, user_id, Some(group_id))?;
            Ok(())
        })
        .map_err(TxError::into_failure)
}

/// Join an existing group. No joining mid-cycle: a ringing group rejects
/// new members until it resets.
pub fn join<S: DocumentStore>(store: &S, group_id: &str, user_id: &str) -> Result<(), Failure> {
    if group_id.is_empty() {
        return Err(Failure::AlarmNotFound);
    }
    store
        .run_transaction(&mut |tx| {
            let mut record = match tx.get_alarm(group_id)? {
                Some(record) => record,
                None => return Err(TxError::Rejected(Failure::AlarmNotFound)),
            };
            if record.ringing {
                return Err(TxError::Rejected(Failure::AlarmIsRinging));
            }
            add_unique(&mut record.members, user_id);
            detach_from_previous(tx, user_id, Some(group_id))?;
            tx.set_alarm(group_id, &record)?;
            link_user(tx, user_id, Some(group_id))?;
            Ok(())
        })
        .map_err(TxError::into_failure)
}

/// Leave a group, deleting it when the last member walks away.
pub fn leave<S: DocumentStore>(store: &S, group_id: &str, user_id: &str) -> Result<(), Failure> {
    if group_id.is_empty() {
        return Err(Failure::AlarmNotFound);
    }
    store
        .run_transaction(&mut |tx| {
            let mut record = match tx.get_alarm(group_id)? {
                Some(record) => record,
                None => return Err(TxError::Rejected(Failure::AlarmNotFound)),
            };
            if record.ringing {
                return Err(TxError::Rejected(Failure::AlarmIsRinging));
            }
            remove_unique(&mut record.members, user_id);
            if record.members.is_empty() {
                tx.delete_alarm(group_id)?;
            } else {
                tx.set_alarm(group_id, &record)?;
            }
            link_user(tx, user_id, None)?;
            Ok(())
        })
        .map_err(TxError::into_failure)
}

/// Overwrite the scheduled time. Guarded like leave: a ringing group's
/// time is frozen until the cycle resets.
pub fn update_time<S: DocumentStore>(
    store: &S,
    group_id: &str,
    new_time: SimpleTime,
) -> Result<(), Failure> {
    if group_id.is_empty() {
        return Err(Failure::AlarmNotFound);
    }
    store
        .run_transaction(&mut |tx| {
            let mut record = match tx.get_alarm(group_id)? {
                Some(record) => record,
                None => return Err(TxError::Rejected(Failure::AlarmNotFound)),
            };
            if record.ringing {
                return Err(TxError::Rejected(Failure::AlarmIsRinging));
            }
            record.time = new_time;
            tx.set_alarm(group_id, &record)?;
            Ok(())
        })
        .map_err(TxError::into_failure)
}

/// Record the caller as awake for the current cycle. Always flips the
/// group into ringing ("someone is up, check in"); sets `allAwake` when
/// the caller's entry completes the set.
pub fn set_awake<S: DocumentStore>(
    store: &S,
    group_id: &str,
    user_id: &str,
) -> Result<SetAwakeOutcome, Failure> {
    if group_id.is_empty() {
        return Err(Failure::AlarmNotFound);
    }
    store
        .run_transaction(&mut |tx| {
            let mut record = match tx.get_alarm(group_id)? {
                Some(record) => record,
                None => return Err(TxError::Rejected(Failure::AlarmNotFound)),
            };
            // Only members may acknowledge; keeps awake ⊆ members.
            if !record.has_member(user_id) {
                return Err(TxError::Rejected(Failure::AlarmNotFound));
            }
            add_unique(&mut record.awake, user_id);
            let completed_set = record.awake.len() == record.members.len();
            if completed_set {
                record.all_awake = true;
            }
            record.ringing = true;
            tx.set_alarm(group_id, &record)?;
            Ok(SetAwakeOutcome { completed_set })
        })
        .map_err(TxError::into_failure)
}

/// Best-effort cleanup back to the resting state: nobody awake, nothing
/// ringing. Never surfaces to a user-facing flow; failures are logged.
pub fn reset<S: DocumentStore>(store: &S, group_id: &str) {
    if group_id.is_empty() {
        warn!("reset requested without a group id");
        return;
    }
    let outcome = store.run_transaction(&mut |tx| {
        let mut record = match tx.get_alarm(group_id)? {
            Some(record) => record,
            // Group vanished; nothing to reset.
            None => return Ok(()),
        };
        record.clear_cycle();
        tx.set_alarm(group_id, &record)?;
        Ok(())
    });
    match outcome {
        Ok(()) => debug!(group_id, "alarm cycle reset"),
        Err(e) => warn!(group_id, error = %e, "alarm reset failed"),
    }
}

/// If the user's link points at some other group, remove them from it,
/// deleting that group when they were its last member. `keep` names a
/// group the caller is about to write; a link to it is left alone.
fn detach_from_previous(
    tx: &mut dyn StoreTx,
    user_id: &str,
    keep: Option<&str>,
) -> Result<(), TxError> {
    let previous = tx
        .get_user(user_id)?
        .and_then(|user| user.alarm)
        .filter(|id| !id.is_empty() && keep != Some(id.as_str()));
    let Some(prev_id) = previous else {
        return Ok(());
    };
    if let Some(mut prev) = tx.get_alarm(&prev_id)? {
        remove_unique(&mut prev.members, user_id);
        if prev.members.is_empty() {
            tx.delete_alarm(&prev_id)?;
        } else {
            tx.set_alarm(&prev_id, &prev)?;
        }
    }
    Ok(())
}

fn link_user(tx: &mut dyn StoreTx, user_id: &str, group_id: Option<&str>) -> Result<(), TxError> {
    tx.set_user(
        user_id,
        &UserRecord {
            alarm: group_id.map(str::to_string),
        },
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    fn alarm(store: &MemoryStore, group_id: &str) -> Option<AlarmRecord> {
        store
            .run_transaction(&mut |tx| Ok(tx.get_alarm(group_id)?))
            .unwrap()
    }

    fn link(store: &MemoryStore, user_id: &str) -> Option<String> {
        store
            .run_transaction(&mut |tx| Ok(tx.get_user(user_id)?.and_then(|u| u.alarm)))
            .unwrap()
    }

    #[test]
    fn create_then_join_builds_membership() {
        let store = MemoryStore::new();
        create(&store, "G", "a@x").unwrap();
        join(&store, "G", "b@x").unwrap();

        let rec = alarm(&store, "G").unwrap();
        assert_eq!(rec.members, ["a@x", "b@x"]);
        assert!(rec.awake.is_empty());
        assert_eq!(rec.time, SimpleTime::DEFAULT);
        assert!(!rec.ringing && !rec.all_awake);
        assert_eq!(link(&store, "a@x").as_deref(), Some("G"));
        assert_eq!(link(&store, "b@x").as_deref(), Some("G"));
    }

    #[test]
    fn duplicate_create_is_rejected_without_mutation() {
        let store = MemoryStore::new();
        create(&store, "G", "a@x").unwrap();
        create(&store, "H", "b@x").unwrap();

        assert_eq!(create(&store, "G", "b@x"), Err(Failure::AlarmAlreadyExists));
        // The existing record and b's prior membership are untouched.
        assert_eq!(alarm(&store, "G").unwrap().members, ["a@x"]);
        assert_eq!(alarm(&store, "H").unwrap().members, ["b@x"]);
        assert_eq!(link(&store, "b@x").as_deref(), Some("H"));
    }

    #[test]
    fn create_detaches_from_previous_group() {
        let store = MemoryStore::new();
        create(&store, "G", "a@x").unwrap();
        join(&store, "G", "b@x").unwrap();
        create(&store, "H", "b@x").unwrap();

        assert_eq!(alarm(&store, "G").unwrap().members, ["a@x"]);
        assert_eq!(alarm(&store, "H").unwrap().members, ["b@x"]);
        assert_eq!(link(&store, "b@x").as_deref(), Some("H"));
    }

    #[test]
    fn previous_group_is_deleted_when_emptied_by_a_move() {
        let store = MemoryStore::new();
        create(&store, "G", "a@x").unwrap();
        join(&store, "H", "a@x").unwrap_err(); // H does not exist
        create(&store, "H", "a@x").unwrap();

        assert_eq!(alarm(&store, "G"), None);
        assert_eq!(alarm(&store, "H").unwrap().members, ["a@x"]);
    }

    #[test]
    fn join_missing_group_fails() {
        let store = MemoryStore::new();
        assert_eq!(join(&store, "nope", "a@x"), Err(Failure::AlarmNotFound));
        assert_eq!(join(&store, "", "a@x"), Err(Failure::AlarmNotFound));
    }

    #[test]
    fn rejoining_your_own_group_is_a_no_op() {
        let store = MemoryStore::new();
        create(&store, "G", "a@x").unwrap();
        join(&store, "G", "a@x").unwrap();
        assert_eq!(alarm(&store, "G").unwrap().members, ["a@x"]);
        assert_eq!(link(&store, "a@x").as_deref(), Some("G"));
    }

    #[test]
    fn leave_clears_link_and_deletes_empty_group() {
        let store = MemoryStore::new();
        create(&store, "G", "a@x").unwrap();
        join(&store, "G", "b@x").unwrap();

        leave(&store, "G", "b@x").unwrap();
        assert_eq!(alarm(&store, "G").unwrap().members, ["a@x"]);
        assert_eq!(link(&store, "b@x"), None);

        leave(&store, "G", "a@x").unwrap();
        assert_eq!(alarm(&store, "G"), None);
        // A join to the deleted ID behaves as if it never existed.
        assert_eq!(join(&store, "G", "b@x"), Err(Failure::AlarmNotFound));
    }

    #[test]
    fn ringing_guards_block_join_leave_and_update() {
        let store = MemoryStore::new();
        create(&store, "G", "a@x").unwrap();
        set_awake(&store, "G", "a@x").unwrap();

        assert_eq!(join(&store, "G", "b@x"), Err(Failure::AlarmIsRinging));
        assert_eq!(leave(&store, "G", "a@x"), Err(Failure::AlarmIsRinging));
        let t = SimpleTime::new(7, 30).unwrap();
        assert_eq!(update_time(&store, "G", t), Err(Failure::AlarmIsRinging));

        // And none of those attempts mutated anything.
        let rec = alarm(&store, "G").unwrap();
        assert_eq!(rec.members, ["a@x"]);
        assert_eq!(rec.time, SimpleTime::DEFAULT);
        assert_eq!(link(&store, "b@x"), None);
    }

    #[test]
    fn update_time_overwrites_when_at_rest() {
        let store = MemoryStore::new();
        create(&store, "G", "a@x").unwrap();
        let t = SimpleTime::new(6, 45).unwrap();
        update_time(&store, "G", t).unwrap();
        assert_eq!(alarm(&store, "G").unwrap().time, t);
        assert_eq!(
            update_time(&store, "missing", t),
            Err(Failure::AlarmNotFound)
        );
    }

    #[test]
    fn set_awake_builds_the_cycle() {
        let store = MemoryStore::new();
        create(&store, "G", "a@x").unwrap();
        join(&store, "G", "b@x").unwrap();

        let first = set_awake(&store, "G", "a@x").unwrap();
        assert!(!first.completed_set);
        let rec = alarm(&store, "G").unwrap();
        assert_eq!(rec.awake, ["a@x"]);
        assert!(rec.ringing);
        assert!(!rec.all_awake);

        // Idempotent for the same caller.
        let again = set_awake(&store, "G", "a@x").unwrap();
        assert!(!again.completed_set);
        assert_eq!(alarm(&store, "G").unwrap().awake, ["a@x"]);

        let last = set_awake(&store, "G", "b@x").unwrap();
        assert!(last.completed_set);
        let rec = alarm(&store, "G").unwrap();
        assert_eq!(rec.awake, ["a@x", "b@x"]);
        assert!(rec.all_awake);

        // awake ⊆ members throughout.
        assert!(rec.awake.iter().all(|m| rec.members.contains(m)));
    }

    #[test]
    fn set_awake_rejects_non_members_and_missing_groups() {
        let store = MemoryStore::new();
        create(&store, "G", "a@x").unwrap();
        assert_eq!(
            set_awake(&store, "G", "stranger@x"),
            Err(Failure::AlarmNotFound)
        );
        assert_eq!(set_awake(&store, "gone", "a@x"), Err(Failure::AlarmNotFound));
        assert!(!alarm(&store, "G").unwrap().ringing);
    }

    #[test]
    fn reset_returns_to_resting_state() {
        let store = MemoryStore::new();
        create(&store, "G", "a@x").unwrap();
        set_awake(&store, "G", "a@x").unwrap();

        reset(&store, "G");
        let rec = alarm(&store, "G").unwrap();
        assert!(rec.awake.is_empty());
        assert!(!rec.ringing && !rec.all_awake);
        assert_eq!(rec.members, ["a@x"]);

        // Idempotent, and silent on a missing group.
        reset(&store, "G");
        reset(&store, "never-existed");
    }

    #[test]
    fn attach_creates_heals_and_reports() {
        let store = MemoryStore::new();
        assert_eq!(attach(&store, ""), Err(Failure::AccountNotFound));

        // First sign-in: user document created, no alarm.
        assert_eq!(attach(&store, "a@x").unwrap(), None);
        assert_eq!(link(&store, "a@x"), None);

        create(&store, "G", "a@x").unwrap();
        let current = attach(&store, "a@x").unwrap().unwrap();
        assert_eq!(current.group_id, "G");
        assert_eq!(current.record.members, ["a@x"]);

        // Dangling link: delete the alarm out from under the user.
        store
            .run_transaction(&mut |tx| Ok(tx.delete_alarm("G")?))
            .unwrap();
        assert_eq!(attach(&store, "a@x").unwrap(), None);
        assert_eq!(link(&store, "a@x"), None);
    }
}
