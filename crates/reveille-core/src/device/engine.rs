//! The per-device reconciliation engine.
//!
//! One actor task per running device owns all device-local state: the
//! group being watched, the last time value applied to the trigger,
//! whether the device is audibly ringing, and whether its own
//! acknowledgement completed the awake set. The task multiplexes three
//! inputs -- committed snapshots from the store, the wake trigger
//! firing, and commands from the front end -- so their mutations of that
//! state are serialized by construction.
//!
//! Snapshot decision table, applied in order on every delivery:
//!
//! ```text
//! change detected              | action taken
//! -----------------------------------------------------
//! time differs from cache      | re-arm the wake trigger
//! everyone is awake            | stop ringing, tell the UI
//! own ack completed the set    | push the cycle reset
//! ```

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use super::timer::WakeTimer;
use crate::alarm::ops;
use crate::clock::Clock;
use crate::error::Failure;
use crate::events::Event;
use crate::store::{AlarmSnapshot, DocumentStore, Watch};
use crate::time::SimpleTime;

enum Command {
    /// Watch a different group (or none). Cancels the previous watch
    /// before opening the new one.
    Connect { group: Option<String> },
    /// The user declared themselves awake.
    Acknowledge {
        reply: oneshot::Sender<Result<(), Failure>>,
    },
    /// Ring right now, without waiting for the trigger.
    TriggerNow,
    Shutdown,
}

/// Front-end handle to a running engine. Cheap to clone.
#[derive(Clone)]
pub struct DeviceHandle {
    cmd_tx: mpsc::UnboundedSender<Command>,
}

impl DeviceHandle {
    pub fn connect(&self, group: Option<&str>) {
        let _ = self.cmd_tx.send(Command::Connect {
            group: group.map(str::to_string),
        });
    }

    /// Record this device's user as awake. Resolves once the
    /// acknowledgement transaction commits or fails.
    pub async fn acknowledge(&self) -> Result<(), Failure> {
        let (reply, rx) = oneshot::channel();
        if self.cmd_tx.send(Command::Acknowledge { reply }).is_err() {
            return Err(Failure::Unknown);
        }
        rx.await.unwrap_or(Err(Failure::Unknown))
    }

    pub fn trigger_now(&self) {
        let _ = self.cmd_tx.send(Command::TriggerNow);
    }

    pub fn shutdown(&self) {
        let _ = self.cmd_tx.send(Command::Shutdown);
    }
}

/// Spawns the reconciliation actor for one device.
pub struct ReconcileEngine;

impl ReconcileEngine {
    /// Start the engine for `user_id`. Returns the command handle and
    /// the stream of UI events. The engine watches nothing until the
    /// first `connect`.
    pub fn spawn<S, C>(
        store: Arc<S>,
        clock: C,
        user_id: impl Into<String>,
    ) -> (DeviceHandle, mpsc::UnboundedReceiver<Event>)
    where
        S: DocumentStore,
        C: Clock + 'static,
    {
        let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (fired_tx, mut fired_rx) = mpsc::unbounded_channel();

        let mut state = EngineState {
            store,
            clock,
            user_id: user_id.into(),
            events: event_tx,
            group_id: None,
            last_known_time: None,
            last_awake: false,
            is_ringing: false,
            timer: WakeTimer::new(fired_tx),
        };

        tokio::spawn(async move {
            // The live watch stays outside the state struct so the
            // select arms borrow disjoint values.
            let mut watch: Option<Watch> = None;
            loop {
                tokio::select! {
                    cmd = cmd_rx.recv() => match cmd {
                        Some(Command::Connect { group }) => {
                            // Drop first: never two live watches.
                            watch = None;
                            watch = state.connect(group);
                        }
                        Some(Command::Acknowledge { reply }) => {
                            let _ = reply.send(state.acknowledge());
                        }
                        Some(Command::TriggerNow) => state.start_ringing(),
                        Some(Command::Shutdown) | None => break,
                    },
                    snap = next_snapshot(&mut watch) => match snap {
                        Some(snap) => state.apply_snapshot(snap),
                        // Store side closed; go quiet until reconnect.
                        None => watch = None,
                    },
                    Some(group) = fired_rx.recv() => state.trigger_fired(group),
                }
            }
        });

        (DeviceHandle { cmd_tx }, event_rx)
    }
}

async fn next_snapshot(watch: &mut Option<Watch>) -> Option<AlarmSnapshot> {
    match watch {
        Some(watch) => watch.recv().await,
        None => std::future::pending().await,
    }
}

struct EngineState<S, C> {
    store: Arc<S>,
    clock: C,
    user_id: String,
    events: mpsc::UnboundedSender<Event>,
    group_id: Option<String>,
    /// Last group time applied to the trigger; `None` after a reconnect
    /// so the first snapshot always arms.
    last_known_time: Option<SimpleTime>,
    /// Set when this device's own acknowledgement completed the set.
    last_awake: bool,
    is_ringing: bool,
    timer: WakeTimer,
}

impl<S: DocumentStore, C: Clock> EngineState<S, C> {
    fn connect(&mut self, group: Option<String>) -> Option<Watch> {
        debug!(user = %self.user_id, ?group, "switching watched group");
        self.timer.disarm();
        self.group_id = group.clone();
        self.last_known_time = None;
        self.last_awake = false;
        self.emit(Event::GroupChanged { group: group.clone() });
        group.map(|id| self.store.watch(&id))
    }

    fn apply_snapshot(&mut self, snap: AlarmSnapshot) {
        let Some(record) = snap.record else {
            // Deleted or never-created document. Nothing to schedule.
            debug!(group = %snap.group_id, "snapshot without a record");
            return;
        };

        // 1. A changed time re-arms the trigger, unless we are mid-ring
        //    (the time cannot legitimately change while ringing; a stale
        //    snapshot must not silence-and-rearm a live alarm).
        if self.last_known_time != Some(record.time) && !self.is_ringing {
            self.last_known_time = Some(record.time);
            let instant = record.time.next_local_occurrence(&self.clock);
            let delay = (instant - self.clock.now())
                .to_std()
                .unwrap_or(std::time::Duration::ZERO);
            self.timer.arm(delay, &snap.group_id);
            self.emit(Event::AlarmScheduled {
                group: snap.group_id.clone(),
                time: record.time,
                local_instant: instant,
            });
        }

        // 2. Everyone is awake: stop together, on every member's device.
        if record.all_awake {
            self.stop_ringing(&snap.group_id);
        }

        // 3. Our own acknowledgement completed the set: push the cycle
        //    reset so the next scheduled time starts clean.
        if self.last_awake {
            ops::reset(self.store.as_ref(), &snap.group_id);
            self.last_awake = false;
            self.emit(Event::CycleReset {
                group: snap.group_id.clone(),
            });
        }
    }

    fn acknowledge(&mut self) -> Result<(), Failure> {
        let Some(group_id) = self.group_id.clone() else {
            return Err(Failure::AlarmNotFound);
        };
        let outcome = ops::set_awake(self.store.as_ref(), &group_id, &self.user_id)?;
        if outcome.completed_set {
            self.last_awake = true;
        }
        Ok(())
    }

    fn trigger_fired(&mut self, group: String) {
        // Stale fire from before a reconnect carries the old group.
        if self.group_id.as_deref() != Some(group.as_str()) {
            debug!(%group, "ignoring trigger for a group no longer watched");
            return;
        }
        self.start_ringing();
    }

    fn start_ringing(&mut self) {
        let Some(group) = self.group_id.clone() else {
            return;
        };
        if self.is_ringing {
            return;
        }
        self.is_ringing = true;
        self.last_awake = false;
        self.emit(Event::RingingStarted { group });
    }

    fn stop_ringing(&mut self, group: &str) {
        // Already stopped with nothing pending: repeated allAwake
        // snapshots must not replay the signal to the UI.
        if !self.is_ringing && !self.timer.is_armed() {
            return;
        }
        self.timer.disarm();
        self.is_ringing = false;
        // Emitted even when this device never rang: a foreground screen
        // waiting on the group navigates away on this signal.
        self.emit(Event::RingingStopped {
            group: group.to_string(),
        });
    }

    fn emit(&self, event: Event) {
        let _ = self.events.send(event);
    }
}
