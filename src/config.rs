//! Service configuration.
//!
//! Timing windows, tolerances and bounds used by the classifier and the
//! registry. Defaults suit a plain two-button mouse on an unbounded canvas.

use std::time::Duration;

use crate::error::{EventError, Result};
use crate::types::{Modifiers, PointerButtons, ScreenBounds};

/// Scaling applied to relative pointer deltas: `delta * multiplier / divisor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerSpeed {
    pub multiplier: i32,
    pub divisor: i32,
}

impl Default for PointerSpeed {
    fn default() -> Self {
        Self {
            multiplier: 1,
            divisor: 1,
        }
    }
}

impl PointerSpeed {
    /// Scale one axis, rounding toward zero.
    pub fn scale(&self, delta: i32) -> i32 {
        let scaled = i64::from(delta) * i64::from(self.multiplier) / i64::from(self.divisor);
        scaled.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
    }
}

/// Configuration for an event service.
#[derive(Debug, Clone, PartialEq)]
pub struct EventConfig {
    /// Two clicks on the same button within this window form a double-click.
    pub double_click_window: Duration,
    /// Max distance between down and up (and between paired clicks).
    /// `None` accepts any drift.
    pub click_tolerance: Option<u32>,
    /// Screen area. Positions are clamped into it when set.
    pub screen: Option<ScreenBounds>,
    /// Relative motion scaling.
    pub pointer_speed: PointerSpeed,
    /// Maximum live subscriptions. `None` is unbounded.
    pub max_handlers: Option<usize>,
    /// Maximum debug name length in bytes.
    pub max_name_len: usize,
    /// Size of the recent key event ring.
    pub key_history_len: usize,
    /// Pointer buttons that act as modifier keys while held.
    pub pointer_modifiers: Vec<(PointerButtons, Modifiers)>,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            double_click_window: Duration::from_millis(500),
            click_tolerance: None,
            screen: None,
            pointer_speed: PointerSpeed::default(),
            max_handlers: None,
            max_name_len: 64,
            key_history_len: 8,
            pointer_modifiers: Vec::new(),
        }
    }
}

impl EventConfig {
    pub fn with_double_click_window(mut self, window: Duration) -> Self {
        self.double_click_window = window;
        self
    }

    pub fn with_click_tolerance(mut self, tolerance: u32) -> Self {
        self.click_tolerance = Some(tolerance);
        self
    }

    pub fn with_screen(mut self, width: u32, height: u32) -> Self {
        self.screen = Some(ScreenBounds::new(width, height));
        self
    }

    pub fn with_pointer_speed(mut self, multiplier: i32, divisor: i32) -> Self {
        self.pointer_speed = PointerSpeed {
            multiplier,
            divisor,
        };
        self
    }

    pub fn with_max_handlers(mut self, max: usize) -> Self {
        self.max_handlers = Some(max);
        self
    }

    pub fn with_max_name_len(mut self, len: usize) -> Self {
        self.max_name_len = len;
        self
    }

    pub fn with_key_history_len(mut self, len: usize) -> Self {
        self.key_history_len = len;
        self
    }

    /// Treat `button` as `modifiers` while it is held.
    pub fn with_pointer_modifier(mut self, button: PointerButtons, modifiers: Modifiers) -> Self {
        self.pointer_modifiers.push((button, modifiers));
        self
    }

    /// Check the configuration for values the classifier cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.pointer_speed.divisor == 0 {
            return Err(EventError::InvalidArgument("pointer speed divisor is zero"));
        }
        if let Some(screen) = self.screen {
            if screen.width == 0 || screen.height == 0 {
                return Err(EventError::InvalidArgument("screen bounds are empty"));
            }
        }
        if self.key_history_len == 0 {
            return Err(EventError::InvalidArgument("key history length is zero"));
        }
        for (button, _) in &self.pointer_modifiers {
            if button.bits().count_ones() != 1 {
                return Err(EventError::InvalidArgument(
                    "pointer modifier must name a single button",
                ));
            }
        }
        Ok(())
    }
}
