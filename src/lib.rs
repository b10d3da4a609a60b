//! # spark-input
//!
//! Input event dispatch core: raw keyboard and pointer samples in, typed
//! events out to subscribed handlers.
//!
//! Device state is held in [spark-signals](https://github.com/RLabs-Inc/spark-signals)
//! signals, so UI code can follow modifiers, CapsLock and the pointer
//! reactively.
//!
//! ## Architecture
//!
//! Everything runs synchronously on the caller's thread, one sample at a time:
//! ```text
//! RawSample → ingest (validate, stamp) → Classifier → [EventInfo] → dispatch → handlers
//! ```
//!
//! The classifier owns the per-channel gesture state (held keys, pressed
//! buttons, pending clicks). Handlers are matched by bitmask and run in
//! registration order; they may register and unregister during dispatch.
//!
//! ## Modules
//!
//! - [`types`] - Event type bits, modifiers, positions, event snapshots
//! - [`ingest`] - Raw samples and validation
//! - [`state`] - Device state, keyboard and pointer channels, classifier
//! - [`registry`] - Subscription slot table and handles
//! - [`dispatch`] - Snapshot dispatch with panic isolation
//! - [`service`] - The owned event service
//! - [`global`] - Thread-local installed service
//! - [`input`] - crossterm bridge

pub mod clock;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod global;
pub mod ingest;
pub mod input;
pub mod keymap;
pub mod registry;
pub mod service;
pub mod state;
pub mod types;

/// Event protocol interface revision.
pub const REVISION: u32 = 0x07;

// Re-export commonly used items
pub use types::*;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{EventConfig, PointerSpeed};
pub use dispatch::DispatchReport;
pub use error::{EventError, Result};
pub use ingest::{KeySample, PointerMotion, PointerSample, RawSample};
pub use registry::EventHandle;
pub use service::EventService;
pub use state::{DeviceSnapshot, DeviceState, KeyRecord};
