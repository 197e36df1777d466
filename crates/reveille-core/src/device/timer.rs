//! The device's one-shot wake trigger.
//!
//! Wraps the OS scheduler as an abortable sleep task: arming replaces
//! any pending trigger, disarming is immediate and best-effort. At most
//! one trigger is pending per timer; firing sends the armed group ID
//! back on the channel given at construction.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// One-shot trigger; owns at most one pending sleep task.
pub struct WakeTimer {
    fired_tx: mpsc::UnboundedSender<String>,
    pending: Option<JoinHandle<()>>,
}

impl WakeTimer {
    /// `fired_tx` receives the group ID payload when the trigger fires.
    pub fn new(fired_tx: mpsc::UnboundedSender<String>) -> Self {
        Self {
            fired_tx,
            pending: None,
        }
    }

    /// Arm (or re-arm) the trigger to fire after `delay`, replacing any
    /// pending one. A zero delay fires immediately.
    pub fn arm(&mut self, delay: Duration, group_id: &str) {
        self.disarm();
        debug!(group_id, ?delay, "arming wake trigger");
        let tx = self.fired_tx.clone();
        let group = group_id.to_string();
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(group);
        }));
    }

    /// Cancel the pending trigger, if any. No acknowledgement expected.
    pub fn disarm(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    pub fn is_armed(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for WakeTimer {
    fn drop(&mut self) {
        self.disarm();
    }
}
