//! Gesture Classifier - ticks into semantic events.
//!
//! Routes each tick to its channel and keeps the shared modifier map equal
//! to the union of what the keyboard and pointer channels hold. Events are
//! stamped with device state at the moment they are produced.

use log::debug;

use super::device::DeviceState;
use super::keyboard::{KeyRecord, KeyboardChannel};
use super::pointer::{PointerChannel, PointerContext};
use crate::config::EventConfig;
use crate::ingest::{RawSample, Tick};
use crate::types::{EventInfo, Modifiers, PointerButtons, ScreenBounds};

/// Stateful classifier over both input channels.
#[derive(Debug)]
pub struct Classifier {
    config: EventConfig,
    device: DeviceState,
    keyboard: KeyboardChannel,
    pointer: PointerChannel,
}

impl Classifier {
    pub fn new(config: EventConfig, device: DeviceState) -> Self {
        let keyboard = KeyboardChannel::new(config.key_history_len);
        Self {
            config,
            device,
            keyboard,
            pointer: PointerChannel::new(),
        }
    }

    pub fn config(&self) -> &EventConfig {
        &self.config
    }

    pub fn device(&self) -> &DeviceState {
        &self.device
    }

    /// Classify one tick into zero or more events, in emission order.
    pub fn classify(&mut self, tick: &Tick) -> Vec<EventInfo> {
        let mut out = Vec::with_capacity(4);
        match tick.sample {
            RawSample::Key(sample) => self.keyboard.process(
                sample,
                tick.timestamp,
                tick.created,
                &self.device,
                self.pointer.modifiers(),
                &mut out,
            ),
            RawSample::Pointer(sample) => {
                let ctx = PointerContext {
                    timestamp: tick.timestamp,
                    created: tick.created,
                    config: &self.config,
                    device: &self.device,
                    other_modifiers: self.keyboard.modifiers(),
                };
                self.pointer.process(sample, &ctx, &mut out);
            }
        }
        out
    }

    /// Buttons currently held on the pointer channel.
    pub fn pressed_buttons(&self) -> PointerButtons {
        self.pointer.pressed()
    }

    /// Recent key samples, oldest first.
    pub fn recent_keys(&self) -> Vec<KeyRecord> {
        self.keyboard.history().copied().collect()
    }

    /// Change the screen bounds and pull the pointer back on screen.
    pub fn set_screen(&mut self, screen: Option<ScreenBounds>) {
        self.config.screen = screen;
        if let Some(screen) = screen {
            self.device.set_position(screen.clamp(self.device.position()));
        }
    }

    /// Drop all pending gesture state on both channels.
    ///
    /// Clears the modifier map; CapsLock and position survive.
    pub fn reset(&mut self) {
        debug!("resetting input channels");
        self.keyboard.reset();
        self.pointer.reset();
        self.device.set_modifiers(Modifiers::empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::ingest::{normalize, KeySample, PointerSample};
    use crate::types::{EventType, KeyCode, Position};

    fn setup(config: EventConfig) -> (Classifier, ManualClock) {
        (Classifier::new(config, DeviceState::default()), ManualClock::new())
    }

    fn run(classifier: &mut Classifier, clock: &ManualClock, sample: RawSample) -> Vec<EventInfo> {
        let tick = normalize(sample, clock).unwrap();
        classifier.classify(&tick)
    }

    #[test]
    fn test_routes_to_channels() {
        let (mut classifier, clock) = setup(EventConfig::default());

        let keys = run(&mut classifier, &clock, KeySample::down(KeyCode::A).into());
        assert_eq!(keys[0].event_type, EventType::KEY_DOWN);

        let moves = run(&mut classifier, &clock, PointerSample::moved(3, 3).into());
        assert_eq!(moves[0].event_type, EventType::MOUSE_MOVED);
        assert_eq!(moves[0].position, Position::new(3, 3));
    }

    #[test]
    fn test_modifier_union_across_channels() {
        let config = EventConfig::default()
            .with_pointer_modifier(PointerButtons::RIGHT, Modifiers::RIGHT_OPTION);
        let (mut classifier, clock) = setup(config);

        run(&mut classifier, &clock, KeySample::down(KeyCode::LEFT_SHIFT).into());
        let events = run(
            &mut classifier,
            &clock,
            PointerSample::press(PointerButtons::RIGHT).into(),
        );
        let down = events.last().unwrap();
        assert_eq!(down.modifiers, Modifiers::LEFT_SHIFT | Modifiers::RIGHT_OPTION);

        let events = run(&mut classifier, &clock, KeySample::up(KeyCode::LEFT_SHIFT).into());
        assert_eq!(events[0].modifiers, Modifiers::RIGHT_OPTION);
    }

    #[test]
    fn test_events_carry_wall_time() {
        let (mut classifier, _) = setup(EventConfig::default());
        let clock = ManualClock::with_epoch(1_700_000_000);
        clock.set_millis(5_000);

        let events = run(&mut classifier, &clock, KeySample::down(KeyCode::A).into());
        assert_eq!(events[0].created.second, 25);
    }

    #[test]
    fn test_set_screen_reclamps_position() {
        let (mut classifier, clock) = setup(EventConfig::default());
        run(&mut classifier, &clock, PointerSample::moved_to(900, 700).into());

        classifier.set_screen(Some(ScreenBounds::new(640, 480)));
        assert_eq!(classifier.device().position(), Position::new(639, 479));
    }

    #[test]
    fn test_reset_keeps_caps_lock_and_position() {
        let (mut classifier, clock) = setup(EventConfig::default());
        run(&mut classifier, &clock, KeySample::down(KeyCode::CAPS_LOCK).into());
        run(&mut classifier, &clock, KeySample::down(KeyCode::LEFT_COMMAND).into());
        run(&mut classifier, &clock, PointerSample::moved_to(10, 10).into());
        run(&mut classifier, &clock, PointerSample::press(PointerButtons::LEFT).into());

        classifier.reset();

        let device = classifier.device();
        assert!(device.is_caps_lock_on());
        assert!(device.modifiers().is_empty());
        assert_eq!(device.position(), Position::new(10, 10));
        assert!(classifier.pressed_buttons().is_empty());
        assert!(classifier.recent_keys().is_empty());
    }
}
