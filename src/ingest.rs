//! Ingest - raw hardware samples into normalized ticks.
//!
//! Accepts one sample at a time from the input source, validates it and
//! stamps it with the clock. No classification happens here. Bad samples
//! are dropped with a warning; ingest never fails.

use std::time::Duration;

use log::warn;

use crate::clock::Clock;
use crate::types::{EventTime, KeyCode, PointerButtons};

// =============================================================================
// RAW SAMPLES
// =============================================================================

/// Key sample: physical key and its new state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeySample {
    pub code: KeyCode,
    pub pressed: bool,
}

impl KeySample {
    pub fn down(code: KeyCode) -> Self {
        Self {
            code,
            pressed: true,
        }
    }

    pub fn up(code: KeyCode) -> Self {
        Self {
            code,
            pressed: false,
        }
    }
}

/// Pointer motion as reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerMotion {
    /// Movement relative to the current position.
    Relative { dx: i32, dy: i32 },
    /// Absolute position (tablets, touch, terminal mice).
    Absolute { x: i32, y: i32 },
}

impl Default for PointerMotion {
    fn default() -> Self {
        Self::Relative { dx: 0, dy: 0 }
    }
}

/// Pointer sample: motion plus button edges seen since the last sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PointerSample {
    pub motion: PointerMotion,
    pub pressed: PointerButtons,
    pub released: PointerButtons,
}

impl PointerSample {
    /// Relative move with no button change.
    pub fn moved(dx: i32, dy: i32) -> Self {
        Self {
            motion: PointerMotion::Relative { dx, dy },
            ..Self::default()
        }
    }

    /// Absolute move with no button change.
    pub fn moved_to(x: i32, y: i32) -> Self {
        Self {
            motion: PointerMotion::Absolute { x, y },
            ..Self::default()
        }
    }

    /// Button press without motion.
    pub fn press(buttons: PointerButtons) -> Self {
        Self {
            pressed: buttons,
            ..Self::default()
        }
    }

    /// Button release without motion.
    pub fn release(buttons: PointerButtons) -> Self {
        Self {
            released: buttons,
            ..Self::default()
        }
    }

    /// Attach motion to this sample.
    pub fn with_motion(mut self, motion: PointerMotion) -> Self {
        self.motion = motion;
        self
    }
}

/// One raw sample from the input source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawSample {
    Key(KeySample),
    Pointer(PointerSample),
}

impl From<KeySample> for RawSample {
    fn from(sample: KeySample) -> Self {
        Self::Key(sample)
    }
}

impl From<PointerSample> for RawSample {
    fn from(sample: PointerSample) -> Self {
        Self::Pointer(sample)
    }
}

// =============================================================================
// TICK
// =============================================================================

/// A validated sample stamped with monotonic and wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub timestamp: Duration,
    pub created: EventTime,
    pub sample: RawSample,
}

/// Validate and stamp a sample. Returns `None` for malformed samples.
pub fn normalize(sample: RawSample, clock: &dyn Clock) -> Option<Tick> {
    if let Err(reason) = validate(&sample) {
        warn!("dropping malformed sample {:?}: {}", sample, reason);
        return None;
    }

    Some(Tick {
        timestamp: clock.monotonic(),
        created: clock.wall_time(),
        sample,
    })
}

fn validate(sample: &RawSample) -> Result<(), &'static str> {
    match sample {
        RawSample::Key(key) => {
            if !key.code.is_known() {
                return Err("unknown key code");
            }
        }
        RawSample::Pointer(pointer) => {
            if pointer.pressed.intersects(pointer.released) {
                return Err("button pressed and released in one sample");
            }
        }
    }
    Ok(())
}
