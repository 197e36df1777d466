//! The per-device side: one reconciliation engine and one wake trigger.

pub mod engine;
pub mod timer;

pub use engine::{DeviceHandle, ReconcileEngine};
pub use timer::WakeTimer;
