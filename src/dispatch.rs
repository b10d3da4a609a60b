//! Dispatcher - fan one event out to every matching handler.
//!
//! The matching handlers are snapshotted when the pass starts and the
//! registry borrow is released before any handler runs, so handlers are
//! free to register and unregister (themselves included). Each snapshot
//! entry is re-checked for liveness right before it is invoked:
//!
//! - unregistered before its turn: skipped for the rest of the pass
//! - unregistered after its turn: nothing to undo
//! - registered during the pass: not in the snapshot, first event is the next one
//!
//! A panicking handler is caught and logged; the remaining handlers still run.

use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};

use log::error;

use crate::registry::Registry;
use crate::types::EventInfo;

/// Outcome of one dispatch pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Handlers invoked, including ones that panicked.
    pub invoked: usize,
    /// Handlers that panicked.
    pub failed: usize,
}

/// Deliver `event` to every live handler whose mask intersects its type.
pub fn dispatch(registry: &RefCell<Registry>, event: &EventInfo) -> DispatchReport {
    let snapshot = registry.borrow().matching(event.event_type);
    let mut report = DispatchReport::default();

    for (handle, handler) in snapshot {
        if !registry.borrow().contains(handle) {
            continue;
        }

        report.invoked += 1;
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| handler(event))) {
            report.failed += 1;
            let reason = payload
                .downcast_ref::<&str>()
                .copied()
                .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
                .unwrap_or("non-string panic payload");
            let registry = registry.borrow();
            let name = registry.name(handle).ok().flatten().unwrap_or("<unnamed>");
            error!(
                "handler {} {:?} panicked on {:?}: {}",
                name, handle, event.event_type, reason
            );
        }
    }

    report
}

// =============================================================================
// TESTS
// =============================================================================
