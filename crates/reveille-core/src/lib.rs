//! # Reveille Core Library
//!
//! Core logic for Reveille, a shared wake-up alarm for small groups:
//! one alarm time per group, and the alarm is only over once every
//! member has acknowledged being awake.
//!
//! There is no central coordinator. Each device mutates a single shared
//! group document through optimistic, serializable transactions and
//! watches that document for committed changes; a per-device
//! reconciliation engine turns those snapshots into local scheduling
//! actions.
//!
//! ## Key components
//!
//! - [`SimpleTime`]: the reference-zone alarm time and its conversion to
//!   the next local trigger instant
//! - [`DocumentStore`]: the transactional store boundary, with
//!   [`store::memory::MemoryStore`] as the in-process implementation
//! - [`alarm::ops`]: the membership and acknowledgement transactions
//! - [`ReconcileEngine`]: the per-device watcher/actor
//! - [`Event`]: what the front end receives

pub mod alarm;
pub mod clock;
pub mod config;
pub mod device;
pub mod error;
pub mod events;
pub mod store;
pub mod time;

pub use alarm::{AlarmRecord, UserRecord};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::DeviceConfig;
pub use device::{DeviceHandle, ReconcileEngine};
pub use error::{ConfigError, Failure, StoreError};
pub use events::Event;
pub use store::{AlarmSnapshot, DocumentStore};
pub use time::SimpleTime;
