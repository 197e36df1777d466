//! In-process document store.
//!
//! A single mutex over both collections makes every transaction trivially
//! serializable, so the internal conflict-retry loop of a hosted store
//! never comes into play here. Documents are held in their raw JSON wire
//! form and decoded at the boundary, exactly as a remote store would hand
//! them over.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::warn;

use super::{AlarmSnapshot, CancelGuard, DocumentStore, StoreTx, Watch};
use crate::alarm::{AlarmRecord, UserRecord};
use crate::error::{StoreError, TxError};

#[derive(Default)]
struct Inner {
    alarms: HashMap<String, Value>,
    users: HashMap<String, Value>,
    watchers: HashMap<String, Vec<Watcher>>,
    next_watcher_id: u64,
}

struct Watcher {
    id: u64,
    tx: mpsc::UnboundedSender<AlarmSnapshot>,
}

/// Shared in-memory store; clones share the same documents.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock means a panic mid-transaction; the staged
        // writes were never applied, so the documents are still sound.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn decode_alarm(group_id: &str, doc: &Value) -> Result<AlarmRecord, StoreError> {
    serde_json::from_value(doc.clone()).map_err(|e| StoreError::Corrupt {
        path: format!("alarms/{group_id}"),
        message: e.to_string(),
    })
}

fn decode_user(user_id: &str, doc: &Value) -> Result<UserRecord, StoreError> {
    serde_json::from_value(doc.clone()).map_err(|e| StoreError::Corrupt {
        path: format!("users/{user_id}"),
        message: e.to_string(),
    })
}

fn encode<T: serde::Serialize>(record: &T) -> Result<Value, StoreError> {
    serde_json::to_value(record).map_err(|e| StoreError::Unknown(e.to_string()))
}

/// Staged state of one in-flight transaction. Writes buffer here and
/// only land on commit; reads see the buffer first.
#[derive(Default)]
struct Staged {
    alarms: HashMap<String, Option<Value>>,
    users: HashMap<String, Option<Value>>,
}

struct MemoryTx<'a> {
    base: &'a Inner,
    staged: Staged,
}

impl StoreTx for MemoryTx<'_> {
    fn get_alarm(&mut self, group_id: &str) -> Result<Option<AlarmRecord>, StoreError> {
        let doc = match self.staged.alarms.get(group_id) {
            Some(staged) => staged.as_ref(),
            None => self.base.alarms.get(group_id),
        };
        doc.map(|d| decode_alarm(group_id, d)).transpose()
    }

    fn set_alarm(&mut self, group_id: &str, record: &AlarmRecord) -> Result<(), StoreError> {
        let doc = encode(record)?;
        self.staged.alarms.insert(group_id.to_string(), Some(doc));
        Ok(())
    }

    fn delete_alarm(&mut self, group_id: &str) -> Result<(), StoreError> {
        self.staged.alarms.insert(group_id.to_string(), None);
        Ok(())
    }

    fn get_user(&mut self, user_id: &str) -> Result<Option<UserRecord>, StoreError> {
        let doc = match self.staged.users.get(user_id) {
            Some(staged) => staged.as_ref(),
            None => self.base.users.get(user_id),
        };
        doc.map(|d| decode_user(user_id, d)).transpose()
    }

    fn set_user(&mut self, user_id: &str, record: &UserRecord) -> Result<(), StoreError> {
        let doc = encode(record)?;
        self.staged.users.insert(user_id.to_string(), Some(doc));
        Ok(())
    }
}

impl DocumentStore for MemoryStore {
    fn run_transaction<T>(
        &self,
        body: &mut dyn FnMut(&mut dyn StoreTx) -> Result<T, TxError>,
    ) -> Result<T, TxError> {
        let mut inner = self.lock();
        let mut tx = MemoryTx {
            base: &*inner,
            staged: Staged::default(),
        };
        let out = body(&mut tx)?;
        let staged = tx.staged;

        for (user_id, doc) in staged.users {
            match doc {
                Some(doc) => inner.users.insert(user_id, doc),
                None => inner.users.remove(&user_id),
            };
        }
        let mut touched = Vec::new();
        for (group_id, doc) in staged.alarms {
            match doc {
                Some(doc) => inner.alarms.insert(group_id.clone(), doc),
                None => inner.alarms.remove(&group_id),
            };
            touched.push(group_id);
        }
        for group_id in touched {
            fan_out(&mut inner, &group_id);
        }
        Ok(out)
    }

    fn watch(&self, group_id: &str) -> Watch {
        let (tx, rx) = mpsc::unbounded_channel();
        let (id, initial) = {
            let mut inner = self.lock();
            let id = inner.next_watcher_id;
            inner.next_watcher_id += 1;
            let initial = snapshot_of(&inner, group_id);
            inner
                .watchers
                .entry(group_id.to_string())
                .or_default()
                .push(Watcher { id, tx: tx.clone() });
            (id, initial)
        };
        let _ = tx.send(initial);

        let weak: Weak<Mutex<Inner>> = Arc::downgrade(&self.inner);
        let key = group_id.to_string();
        let cancel = CancelGuard::new(move || {
            if let Some(inner) = weak.upgrade() {
                let mut inner = match inner.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                if let Some(list) = inner.watchers.get_mut(&key) {
                    list.retain(|w| w.id != id);
                }
            }
        });
        Watch::new(rx, cancel)
    }
}

fn snapshot_of(inner: &Inner, group_id: &str) -> AlarmSnapshot {
    let record = inner.alarms.get(group_id).and_then(|doc| {
        decode_alarm(group_id, doc)
            .map_err(|e| warn!(group_id, error = %e, "skipping undecodable snapshot"))
            .ok()
    });
    AlarmSnapshot {
        group_id: group_id.to_string(),
        record,
    }
}

fn fan_out(inner: &mut Inner, group_id: &str) {
    let snapshot = snapshot_of(inner, group_id);
    if let Some(list) = inner.watchers.get_mut(group_id) {
        list.retain(|w| w.tx.send(snapshot.clone()).is_ok());
    }
}
