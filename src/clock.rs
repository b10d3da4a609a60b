//! Clock - time sources for gesture timing and event stamping.
//!
//! The core never reads time on its own; it asks a [`Clock`] for a
//! monotonic reading (click timing) and a wall-clock stamp (creation time).
//!
//! - [`SystemClock`] - `Instant` plus chrono's UTC clock, for hosted builds
//! - [`ManualClock`] - shared, hand-advanced clock for tests and replays

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use chrono::Utc;

use crate::types::EventTime;

/// Time source consumed by the event service.
pub trait Clock {
    /// Monotonic time since an arbitrary fixed origin.
    fn monotonic(&self) -> Duration;

    /// Current wall-clock time.
    fn wall_time(&self) -> EventTime;
}

// =============================================================================
// SYSTEM CLOCK
// =============================================================================

/// Clock backed by `Instant` and chrono's UTC wall clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn monotonic(&self) -> Duration {
        self.origin.elapsed()
    }

    fn wall_time(&self) -> EventTime {
        Utc::now().into()
    }
}

// =============================================================================
// MANUAL CLOCK
// =============================================================================

/// Hand-driven clock. Clones share the same reading.
///
/// Wall time is `epoch_secs` plus the elapsed monotonic time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
    epoch_secs: u64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the wall clock at the given Unix time.
    pub fn with_epoch(epoch_secs: u64) -> Self {
        Self {
            now: Rc::new(Cell::new(Duration::ZERO)),
            epoch_secs,
        }
    }

    /// Set the monotonic reading.
    pub fn set(&self, now: Duration) {
        self.now.set(now);
    }

    /// Set the monotonic reading in milliseconds.
    pub fn set_millis(&self, millis: u64) {
        self.set(Duration::from_millis(millis));
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn monotonic(&self) -> Duration {
        self.now.get()
    }

    fn wall_time(&self) -> EventTime {
        EventTime::from_unix_seconds(self.epoch_secs + self.now.get().as_secs())
    }
}
