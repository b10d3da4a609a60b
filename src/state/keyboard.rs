//! Keyboard Channel - key samples into key and modifier events.
//!
//! Tracks which physical keys are held so that auto-repeat can be told
//! apart from a fresh press, keeps the modifier bits contributed by the
//! keyboard, and flips the CapsLock latch on the press edge only.
//!
//! Emission rules per sample:
//!
//! - press, not held: `KeyDown` (plus `ModifierDown` for modifier keys)
//! - press, held (auto-repeat): `KeyDown` again, nothing for modifier keys
//! - release, held: `KeyUp` (plus `ModifierUp` for modifier keys)
//! - release, not held: dropped as spurious

use std::collections::VecDeque;
use std::time::Duration;

use log::{debug, warn};

use super::device::DeviceState;
use crate::ingest::KeySample;
use crate::keymap;
use crate::types::{EventInfo, EventTime, EventType, KeyCode, KeyPair, Modifiers};

/// One entry in the recent key ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyRecord {
    pub code: KeyCode,
    pub pressed: bool,
    /// Press of a key that was already held.
    pub repeat: bool,
    pub timestamp: Duration,
}

/// Per-channel keyboard state.
#[derive(Debug, Clone)]
pub struct KeyboardChannel {
    held: Vec<KeyCode>,
    modifiers: Modifiers,
    history: VecDeque<KeyRecord>,
    history_len: usize,
}

impl KeyboardChannel {
    pub fn new(history_len: usize) -> Self {
        Self {
            held: Vec::new(),
            modifiers: Modifiers::empty(),
            history: VecDeque::with_capacity(history_len),
            history_len,
        }
    }

    /// Modifier bits currently held on the keyboard.
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Whether a key is currently held.
    pub fn is_held(&self, code: KeyCode) -> bool {
        self.held.contains(&code)
    }

    /// Recent key samples, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &KeyRecord> {
        self.history.iter()
    }

    /// Forget held keys, modifiers and history.
    pub fn reset(&mut self) {
        self.held.clear();
        self.modifiers = Modifiers::empty();
        self.history.clear();
    }

    /// Classify one key sample.
    ///
    /// `other_modifiers` are modifier bits held by other channels; the
    /// device modifier map is always the union of both.
    pub fn process(
        &mut self,
        sample: KeySample,
        timestamp: Duration,
        created: EventTime,
        device: &DeviceState,
        other_modifiers: Modifiers,
        out: &mut Vec<EventInfo>,
    ) {
        let code = sample.code;

        if sample.pressed {
            let repeat = self.is_held(code);
            if !repeat {
                self.held.push(code);
            }
            self.record(code, true, repeat, timestamp);

            if let Some(bit) = code.modifier() {
                if repeat {
                    return;
                }
                self.modifiers |= bit;
                device.set_modifiers(self.modifiers | other_modifiers);
                out.push(self.key_event(EventType::KEY_DOWN, code, created, device));
                out.push(modifier_event(EventType::MODIFIER_DOWN, bit, created, device));
                return;
            }

            if code == KeyCode::CAPS_LOCK && !repeat {
                let on = device.toggle_caps_lock();
                debug!("caps lock {}", if on { "on" } else { "off" });
            }
            out.push(self.key_event(EventType::KEY_DOWN, code, created, device));
        } else {
            let Some(index) = self.held.iter().position(|held| *held == code) else {
                warn!("ignoring release of key {:#06x} that is not held", code.0);
                return;
            };
            self.held.remove(index);
            self.record(code, false, false, timestamp);

            if let Some(bit) = code.modifier() {
                self.modifiers.remove(bit);
                device.set_modifiers(self.modifiers | other_modifiers);
                out.push(self.key_event(EventType::KEY_UP, code, created, device));
                out.push(modifier_event(EventType::MODIFIER_UP, bit, created, device));
                return;
            }
            out.push(self.key_event(EventType::KEY_UP, code, created, device));
        }
    }

    fn record(&mut self, code: KeyCode, pressed: bool, repeat: bool, timestamp: Duration) {
        if self.history.len() == self.history_len {
            self.history.pop_front();
        }
        self.history.push_back(KeyRecord {
            code,
            pressed,
            repeat,
            timestamp,
        });
    }

    fn key_event(
        &self,
        event_type: EventType,
        code: KeyCode,
        created: EventTime,
        device: &DeviceState,
    ) -> EventInfo {
        let snapshot = device.snapshot();
        let pair = KeyPair {
            input_key: keymap::translate(code, snapshot.modifiers, snapshot.caps_lock),
            key_code: code,
        };
        EventInfo::key(event_type, pair, created, snapshot.modifiers, snapshot.position)
    }
}

pub(crate) fn modifier_event(
    event_type: EventType,
    changed: Modifiers,
    created: EventTime,
    device: &DeviceState,
) -> EventInfo {
    EventInfo::modifier(
        event_type,
        changed,
        created,
        device.modifiers(),
        device.position(),
    )
}

// =============================================================================
// TESTS
// =============================================================================
