//! Device State - modifier map, CapsLock latch and pointer position.
//!
//! Values live in signals so UI code can track them reactively, the same
//! way the mouse and keyboard state of the terminal framework does.
//! Writes are crate-private: only the classifier and the service's
//! cursor setter mutate device state.
//!
//! # API
//!
//! - `modifiers`, `is_caps_lock_on`, `position` - Current values
//! - `snapshot` - All three at once
//! - `watch_modifiers`, `watch_caps_lock`, `watch_position` - Read-only deriveds

use std::fmt;

use spark_signals::{derived, signal, Derived, Signal};

use crate::types::{Modifiers, Position};

/// Point-in-time copy of the device state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceSnapshot {
    pub modifiers: Modifiers,
    pub caps_lock: bool,
    pub position: Position,
}

/// Shared device state. Clones observe the same signals.
#[derive(Clone)]
pub struct DeviceState {
    modifiers: Signal<Modifiers>,
    caps_lock: Signal<bool>,
    position: Signal<Position>,
}

impl DeviceState {
    /// Neutral state: no modifiers, CapsLock off, pointer at `position`.
    pub fn new(position: Position) -> Self {
        Self {
            modifiers: signal(Modifiers::empty()),
            caps_lock: signal(false),
            position: signal(position),
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers.get()
    }

    pub fn is_caps_lock_on(&self) -> bool {
        self.caps_lock.get()
    }

    pub fn position(&self) -> Position {
        self.position.get()
    }

    pub fn snapshot(&self) -> DeviceSnapshot {
        DeviceSnapshot {
            modifiers: self.modifiers(),
            caps_lock: self.is_caps_lock_on(),
            position: self.position(),
        }
    }

    /// Reactive view of the modifier map.
    pub fn watch_modifiers(&self) -> Derived<Modifiers> {
        let sig = self.modifiers.clone();
        derived(move || sig.get())
    }

    /// Reactive view of the CapsLock latch.
    pub fn watch_caps_lock(&self) -> Derived<bool> {
        let sig = self.caps_lock.clone();
        derived(move || sig.get())
    }

    /// Reactive view of the pointer position.
    pub fn watch_position(&self) -> Derived<Position> {
        let sig = self.position.clone();
        derived(move || sig.get())
    }

    // =========================================================================
    // Mutation (classifier and cursor setter only)
    // =========================================================================

    pub(crate) fn set_modifiers(&self, modifiers: Modifiers) {
        if self.modifiers.get() != modifiers {
            self.modifiers.set(modifiers);
        }
    }

    /// Flip the CapsLock latch, returning the new state.
    pub(crate) fn toggle_caps_lock(&self) -> bool {
        let on = !self.caps_lock.get();
        self.caps_lock.set(on);
        on
    }

    pub(crate) fn set_position(&self, position: Position) {
        if self.position.get() != position {
            self.position.set(position);
        }
    }
}

impl Default for DeviceState {
    fn default() -> Self {
        Self::new(Position::ORIGIN)
    }
}

impl fmt::Debug for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceState")
            .field("modifiers", &self.modifiers())
            .field("caps_lock", &self.is_caps_lock_on())
            .field("position", &self.position())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spark_signals::effect;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_initial_state() {
        let state = DeviceState::default();
        assert_eq!(state.snapshot(), DeviceSnapshot::default());

        let state = DeviceState::new(Position::new(400, 300));
        assert_eq!(state.position(), Position::new(400, 300));
        assert!(!state.is_caps_lock_on());
    }

    #[test]
    fn test_clones_share_state() {
        let state = DeviceState::default();
        let view = state.clone();

        state.set_position(Position::new(5, 6));
        state.set_modifiers(Modifiers::LEFT_CONTROL);
        assert!(state.toggle_caps_lock());

        assert_eq!(
            view.snapshot(),
            DeviceSnapshot {
                modifiers: Modifiers::LEFT_CONTROL,
                caps_lock: true,
                position: Position::new(5, 6),
            }
        );

        assert!(!state.toggle_caps_lock());
        assert!(!view.is_caps_lock_on());
    }

    #[test]
    fn test_watch_caps_lock_is_reactive() {
        let state = DeviceState::default();
        let watched = state.watch_caps_lock();

        let runs = Rc::new(Cell::new(0));
        let last = Rc::new(Cell::new(false));
        let runs_clone = runs.clone();
        let last_clone = last.clone();
        let _effect = effect(move || {
            last_clone.set(watched.get());
            runs_clone.set(runs_clone.get() + 1);
        });

        assert_eq!(runs.get(), 1);
        assert!(!last.get());

        state.toggle_caps_lock();
        assert!(last.get());
        assert!(runs.get() >= 2);
    }

    #[test]
    fn test_watch_position() {
        let state = DeviceState::default();
        let position = state.watch_position();

        state.set_position(Position::new(-3, 12));
        assert_eq!(position.get(), Position::new(-3, 12));
    }
}
