//! The document store boundary.
//!
//! The store is the sole arbiter of shared group state: every write
//! re-reads inside a serializable read-modify-write transaction, and the
//! store fans committed snapshots out to subscribers in commit order. The
//! engine behind this seam is external; [`memory::MemoryStore`] is the
//! in-process implementation used by tests and the simulation harness.

pub mod memory;

use tokio::sync::mpsc;

use crate::alarm::{AlarmRecord, UserRecord};
use crate::error::{StoreError, TxError};

/// Typed read/write handles scoped to the documents a transaction may
/// touch. Reads see the transaction's own staged writes.
pub trait StoreTx {
    fn get_alarm(&mut self, group_id: &str) -> Result<Option<AlarmRecord>, StoreError>;
    fn set_alarm(&mut self, group_id: &str, record: &AlarmRecord) -> Result<(), StoreError>;
    fn delete_alarm(&mut self, group_id: &str) -> Result<(), StoreError>;
    fn get_user(&mut self, user_id: &str) -> Result<Option<UserRecord>, StoreError>;
    fn set_user(&mut self, user_id: &str, record: &UserRecord) -> Result<(), StoreError>;
}

/// A committed view of one group document. `record` is `None` when the
/// document does not exist (never created, or deleted by the last leave).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmSnapshot {
    pub group_id: String,
    pub record: Option<AlarmRecord>,
}

/// The transactional document store.
///
/// `run_transaction` retries internal write conflicts; a
/// [`TxError::Rejected`] returned by the body short-circuits the attempt
/// without committing and without retrying. Implementations must be
/// serializable per document pair touched.
pub trait DocumentStore: Send + Sync + 'static {
    fn run_transaction<T>(
        &self,
        body: &mut dyn FnMut(&mut dyn StoreTx) -> Result<T, TxError>,
    ) -> Result<T, TxError>;

    /// Open a change subscription on one group document. The current
    /// snapshot is delivered first, then every committed change in commit
    /// order. Dropping the [`Watch`] cancels the subscription.
    fn watch(&self, group_id: &str) -> Watch;
}

/// Live change subscription on a single group document.
pub struct Watch {
    rx: mpsc::UnboundedReceiver<AlarmSnapshot>,
    _cancel: CancelGuard,
}

impl Watch {
    pub fn new(rx: mpsc::UnboundedReceiver<AlarmSnapshot>, cancel: CancelGuard) -> Self {
        Self { rx, _cancel: cancel }
    }

    /// Next committed snapshot; `None` once the store side closed.
    pub async fn recv(&mut self) -> Option<AlarmSnapshot> {
        self.rx.recv().await
    }

    /// Non-blocking variant for synchronous drains in tests and tools.
    pub fn try_recv(&mut self) -> Option<AlarmSnapshot> {
        self.rx.try_recv().ok()
    }
}

/// Runs its cleanup exactly once, when dropped.
pub struct CancelGuard {
    on_cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl CancelGuard {
    pub fn new(on_cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            on_cancel: Some(Box::new(on_cancel)),
        }
    }
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        if let Some(f) = self.on_cancel.take() {
            f();
        }
    }
}
