//! Pointer Channel - pointer samples into move, button and click events.
//!
//! Each button is either idle or pressed. A press records the down time
//! and position; the matching release completes a click. Two clicks on the
//! same button inside the double-click window add a `MOUSE_DOUBLE_CLICK`,
//! after which the pairing starts over (no triple clicks).
//!
//! Per sample the emission order is: `MOUSE_MOVED` first, then buttons in
//! Left, Right, Reserved order. A release emits `MOUSE_UP`, then
//! `MOUSE_CLICK`, then `MOUSE_DOUBLE_CLICK` when one fires.

use std::time::Duration;

use log::{debug, warn};

use super::device::DeviceState;
use super::keyboard::modifier_event;
use crate::config::EventConfig;
use crate::ingest::{PointerMotion, PointerSample};
use crate::types::{EventInfo, EventTime, EventType, Modifiers, PointerButtons, Position};

#[derive(Debug, Clone, Copy, Default)]
struct ButtonState {
    /// Down timestamp and position while pressed.
    down: Option<(Duration, Position)>,
    /// Last completed click still eligible for pairing.
    last_click: Option<(Duration, Position)>,
}

/// Per-sample inputs shared by the press and release paths.
#[derive(Debug, Clone, Copy)]
pub struct PointerContext<'a> {
    /// Monotonic sample time, drives click pairing.
    pub timestamp: Duration,
    pub created: EventTime,
    pub config: &'a EventConfig,
    pub device: &'a DeviceState,
    /// Modifier bits held on the keyboard channel.
    pub other_modifiers: Modifiers,
}

/// Per-channel pointer state.
#[derive(Debug, Clone, Default)]
pub struct PointerChannel {
    buttons: [ButtonState; 3],
    chord_modifiers: Modifiers,
}

impl PointerChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buttons currently held.
    pub fn pressed(&self) -> PointerButtons {
        let mut pressed = PointerButtons::empty();
        for button in PointerButtons::ORDER {
            if self.buttons[button.slot()].down.is_some() {
                pressed |= button;
            }
        }
        pressed
    }

    /// Modifier bits contributed by held pointer chords.
    pub fn modifiers(&self) -> Modifiers {
        self.chord_modifiers
    }

    /// Forget pressed buttons, pending clicks and chord modifiers.
    pub fn reset(&mut self) {
        self.buttons = [ButtonState::default(); 3];
        self.chord_modifiers = Modifiers::empty();
    }

    /// Classify one pointer sample.
    pub fn process(
        &mut self,
        sample: PointerSample,
        ctx: &PointerContext<'_>,
        out: &mut Vec<EventInfo>,
    ) {
        let PointerContext {
            config,
            device,
            created,
            ..
        } = *ctx;

        // 1. Motion
        let current = device.position();
        let target = match sample.motion {
            PointerMotion::Relative { dx, dy } => current.offset(
                config.pointer_speed.scale(dx),
                config.pointer_speed.scale(dy),
            ),
            PointerMotion::Absolute { x, y } => Position::new(x, y),
        };
        let target = match config.screen {
            Some(screen) => screen.clamp(target),
            None => target,
        };
        if target != current {
            device.set_position(target);
            out.push(pointer_event(EventType::MOUSE_MOVED, created, device));
        }

        // 2. Buttons
        for button in PointerButtons::ORDER {
            if sample.pressed.contains(button) {
                self.press(button, ctx, out);
            }
            if sample.released.contains(button) {
                self.release(button, ctx, out);
            }
        }
    }

    fn press(
        &mut self,
        button: PointerButtons,
        ctx: &PointerContext<'_>,
        out: &mut Vec<EventInfo>,
    ) {
        let state = &mut self.buttons[button.slot()];
        if state.down.is_some() {
            warn!("ignoring duplicate press of {:?}", button);
            return;
        }
        state.down = Some((ctx.timestamp, ctx.device.position()));

        let gained = self.sync_chords(ctx);
        if !gained.is_empty() {
            out.push(modifier_event(EventType::MODIFIER_DOWN, gained, ctx.created, ctx.device));
        }

        out.push(pointer_event(
            EventType::MOUSE_DOWN | button.event_bit(),
            ctx.created,
            ctx.device,
        ));
    }

    fn release(
        &mut self,
        button: PointerButtons,
        ctx: &PointerContext<'_>,
        out: &mut Vec<EventInfo>,
    ) {
        let PointerContext {
            timestamp,
            created,
            config,
            device,
            ..
        } = *ctx;
        let state = &mut self.buttons[button.slot()];
        let Some((_, down_position)) = state.down.take() else {
            warn!("ignoring release of {:?} without a press", button);
            return;
        };
        let position = device.position();
        let bit = button.event_bit();

        out.push(pointer_event(EventType::MOUSE_UP | bit, created, device));

        let within = |a: Position, b: Position| {
            config
                .click_tolerance
                .is_none_or(|tolerance| a.chebyshev_distance(b) <= tolerance)
        };

        if within(down_position, position) {
            out.push(pointer_event(EventType::MOUSE_CLICK | bit, created, device));

            let paired = state.last_click.is_some_and(|(at, where_)| {
                timestamp.saturating_sub(at) <= config.double_click_window && within(where_, position)
            });
            if paired {
                debug!("double click on {:?}", button);
                out.push(pointer_event(
                    EventType::MOUSE_DOUBLE_CLICK | bit,
                    created,
                    device,
                ));
                state.last_click = None;
            } else {
                state.last_click = Some((timestamp, position));
            }
        } else {
            state.last_click = None;
        }

        let before = self.chord_modifiers;
        self.sync_chords(ctx);
        let cleared = before - self.chord_modifiers;
        if !cleared.is_empty() {
            out.push(modifier_event(EventType::MODIFIER_UP, cleared, created, device));
        }
    }

    /// Rebuild the chord bits from the buttons still held and publish the
    /// union with the keyboard bits. Returns the newly set bits.
    fn sync_chords(&mut self, ctx: &PointerContext<'_>) -> Modifiers {
        let before = self.chord_modifiers;
        self.chord_modifiers = self
            .pressed()
            .iter()
            .filter_map(|button| chord_for(ctx.config, button))
            .fold(Modifiers::empty(), |acc, chord| acc | chord);
        ctx.device.set_modifiers(self.chord_modifiers | ctx.other_modifiers);
        self.chord_modifiers - before
    }
}

fn chord_for(config: &EventConfig, button: PointerButtons) -> Option<Modifiers> {
    config
        .pointer_modifiers
        .iter()
        .find(|(chord_button, _)| *chord_button == button)
        .map(|(_, modifiers)| *modifiers)
}

fn pointer_event(event_type: EventType, created: EventTime, device: &DeviceState) -> EventInfo {
    EventInfo::pointer(event_type, created, device.modifiers(), device.position())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EventData;

    struct Harness {
        channel: PointerChannel,
        device: DeviceState,
        config: EventConfig,
    }

    impl Harness {
        fn new(config: EventConfig) -> Self {
            Self {
                channel: PointerChannel::new(),
                device: DeviceState::default(),
                config,
            }
        }

        fn feed(&mut self, sample: PointerSample, millis: u64) -> Vec<EventType> {
            let mut out: Vec<EventType> = Vec::new();
            self.feed_events(sample, millis)
                .into_iter()
                .map(|e| e.event_type)
                .collect()
        }

        fn feed_events(&mut self, sample: PointerSample, millis: u64) -> Vec<EventInfo> {
            let ctx = PointerContext {
                timestamp: Duration::from_millis(millis),
                created: EventTime::default(),
                config: &self.config,
                device: &self.device,
                other_modifiers: Modifiers::empty(),
            };
            let mut out = Vec::new();
            self.channel.process(sample, &ctx, &mut out);
            out
        }

        fn click(&mut self, button: PointerButtons, down_ms: u64, up_ms: u64) -> Vec<EventType> {
            let mut events = self.feed(PointerSample::press(button), down_ms);
            events.extend(self.feed(PointerSample::release(button), up_ms));
            events
        }
    }

    const LEFT: EventType = EventType::LEFT_BUTTON;

    #[test]
    fn test_click_sequence() {
        let mut h = Harness::new(EventConfig::default());
        let events = h.click(PointerButtons::LEFT, 0, 80);
        assert_eq!(
            events,
            vec![
                EventType::MOUSE_DOWN | LEFT,
                EventType::MOUSE_UP | LEFT,
                EventType::MOUSE_CLICK | LEFT,
            ]
        );
        assert!(h.channel.pressed().is_empty());
    }

    #[test]
    fn test_double_click_within_window() {
        let mut h = Harness::new(EventConfig::default());
        h.click(PointerButtons::LEFT, 0, 10);
        let second = h.click(PointerButtons::LEFT, 250, 310);
        assert_eq!(
            second,
            vec![
                EventType::MOUSE_DOWN | LEFT,
                EventType::MOUSE_UP | LEFT,
                EventType::MOUSE_CLICK | LEFT,
                EventType::MOUSE_DOUBLE_CLICK | LEFT,
            ]
        );
    }

    #[test]
    fn test_no_double_click_outside_window() {
        let mut h = Harness::new(EventConfig::default());
        h.click(PointerButtons::LEFT, 0, 10);
        let second = h.click(PointerButtons::LEFT, 590, 610);
        assert!(!second.contains(&(EventType::MOUSE_DOUBLE_CLICK | LEFT)));
        assert!(second.contains(&(EventType::MOUSE_CLICK | LEFT)));
    }

    #[test]
    fn test_third_click_starts_fresh_window() {
        let mut h = Harness::new(EventConfig::default());
        h.click(PointerButtons::LEFT, 0, 10);
        let second = h.click(PointerButtons::LEFT, 100, 110);
        let third = h.click(PointerButtons::LEFT, 200, 210);
        let fourth = h.click(PointerButtons::LEFT, 300, 310);

        let double = EventType::MOUSE_DOUBLE_CLICK | LEFT;
        assert!(second.contains(&double));
        assert!(!third.contains(&double));
        assert!(fourth.contains(&double));
    }

    #[test]
    fn test_double_click_is_per_button() {
        let mut h = Harness::new(EventConfig::default());
        h.click(PointerButtons::LEFT, 0, 10);
        let right = h.click(PointerButtons::RIGHT, 100, 110);
        assert!(!right.iter().any(|t| t.contains(EventType::MOUSE_DOUBLE_CLICK)));
        assert!(right.iter().all(|t| t.contains(EventType::RIGHT_BUTTON)));
    }

    #[test]
    fn test_spurious_release_and_duplicate_press() {
        let mut h = Harness::new(EventConfig::default());
        assert!(h.feed(PointerSample::release(PointerButtons::LEFT), 0).is_empty());

        assert_eq!(
            h.feed(PointerSample::press(PointerButtons::LEFT), 10),
            vec![EventType::MOUSE_DOWN | LEFT]
        );
        assert!(h.feed(PointerSample::press(PointerButtons::LEFT), 20).is_empty());
        assert_eq!(h.channel.pressed(), PointerButtons::LEFT);
    }

    #[test]
    fn test_move_emitted_before_button_events() {
        let mut h = Harness::new(EventConfig::default());
        let events = h.feed(
            PointerSample::press(PointerButtons::LEFT)
                .with_motion(PointerMotion::Relative { dx: 4, dy: -2 }),
            0,
        );
        assert_eq!(
            events,
            vec![EventType::MOUSE_MOVED, EventType::MOUSE_DOWN | LEFT]
        );
        assert_eq!(h.device.position(), Position::new(4, -2));
    }

    #[test]
    fn test_drift_does_not_cancel_click_by_default() {
        let mut h = Harness::new(EventConfig::default());
        h.feed(PointerSample::press(PointerButtons::LEFT), 0);
        h.feed(PointerSample::moved(50, 50), 20);
        let up = h.feed(PointerSample::release(PointerButtons::LEFT), 40);
        assert!(up.contains(&(EventType::MOUSE_CLICK | LEFT)));
    }

    #[test]
    fn test_click_tolerance_cancels_drifted_click() {
        let mut h = Harness::new(EventConfig::default().with_click_tolerance(2));
        h.feed(PointerSample::press(PointerButtons::LEFT), 0);
        h.feed(PointerSample::moved(10, 0), 20);
        let up = h.feed(PointerSample::release(PointerButtons::LEFT), 40);
        assert_eq!(up, vec![EventType::MOUSE_UP | LEFT]);

        // Small drift stays a click
        h.feed(PointerSample::press(PointerButtons::LEFT), 100);
        h.feed(PointerSample::moved(1, 1), 110);
        let up = h.feed(PointerSample::release(PointerButtons::LEFT), 120);
        assert!(up.contains(&(EventType::MOUSE_CLICK | LEFT)));
    }

    #[test]
    fn test_move_while_held_updates_position() {
        let mut h = Harness::new(EventConfig::default());
        h.feed(PointerSample::press(PointerButtons::RIGHT), 0);
        assert_eq!(h.feed(PointerSample::moved_to(30, 40), 10), vec![EventType::MOUSE_MOVED]);
        assert_eq!(h.device.position(), Position::new(30, 40));
    }

    #[test]
    fn test_screen_clamping() {
        let mut h = Harness::new(EventConfig::default().with_screen(100, 50));
        h.feed(PointerSample::moved(500, 500), 0);
        assert_eq!(h.device.position(), Position::new(99, 49));

        // Pushing against the edge does not move
        assert!(h.feed(PointerSample::moved(5, 5), 10).is_empty());
    }

    #[test]
    fn test_pointer_speed() {
        let mut h = Harness::new(EventConfig::default().with_pointer_speed(2, 1));
        h.feed(PointerSample::moved(3, -4), 0);
        assert_eq!(h.device.position(), Position::new(6, -8));
    }

    #[test]
    fn test_zero_motion_emits_nothing() {
        let mut h = Harness::new(EventConfig::default());
        assert!(h.feed(PointerSample::moved(0, 0), 0).is_empty());
    }

    #[test]
    fn test_pointer_chord_modifier() {
        let config = EventConfig::default()
            .with_pointer_modifier(PointerButtons::RIGHT, Modifiers::LEFT_CONTROL);
        let mut h = Harness::new(config);

        let out = h.feed_events(PointerSample::press(PointerButtons::RIGHT), 0);
        assert_eq!(out[0].event_type, EventType::MODIFIER_DOWN);
        assert_eq!(out[0].data, EventData::Raw(Modifiers::LEFT_CONTROL.bits() as usize));
        assert_eq!(out[1].event_type, EventType::MOUSE_DOWN | EventType::RIGHT_BUTTON);
        assert_eq!(out[1].modifiers, Modifiers::LEFT_CONTROL);
        assert_eq!(h.channel.modifiers(), Modifiers::LEFT_CONTROL);

        let up = h.feed(PointerSample::release(PointerButtons::RIGHT), 30);
        assert_eq!(up.last(), Some(&EventType::MODIFIER_UP));
        assert!(h.device.modifiers().is_empty());
    }

    #[test]
    fn test_shared_chord_held_until_last_button_released() {
        let config = EventConfig::default()
            .with_pointer_modifier(PointerButtons::LEFT, Modifiers::LEFT_CONTROL)
            .with_pointer_modifier(PointerButtons::RIGHT, Modifiers::LEFT_CONTROL);
        let mut h = Harness::new(config);

        let left = h.feed(PointerSample::press(PointerButtons::LEFT), 0);
        assert_eq!(left[0], EventType::MODIFIER_DOWN);
        // The bit is already set; no second modifier edge.
        let right = h.feed(PointerSample::press(PointerButtons::RIGHT), 10);
        assert_eq!(right, vec![EventType::MOUSE_DOWN | EventType::RIGHT_BUTTON]);

        let up = h.feed(PointerSample::release(PointerButtons::RIGHT), 20);
        assert!(!up.contains(&EventType::MODIFIER_UP));
        assert_eq!(h.channel.pressed(), PointerButtons::LEFT);
        assert_eq!(h.channel.modifiers(), Modifiers::LEFT_CONTROL);
        assert_eq!(h.device.modifiers(), Modifiers::LEFT_CONTROL);

        let up = h.feed(PointerSample::release(PointerButtons::LEFT), 30);
        assert_eq!(up.last(), Some(&EventType::MODIFIER_UP));
        assert!(h.device.modifiers().is_empty());
    }

    #[test]
    fn test_multiple_buttons_in_one_sample() {
        let mut h = Harness::new(EventConfig::default());
        let events = h.feed(
            PointerSample::press(PointerButtons::RIGHT | PointerButtons::LEFT),
            0,
        );
        assert_eq!(
            events,
            vec![
                EventType::MOUSE_DOWN | EventType::LEFT_BUTTON,
                EventType::MOUSE_DOWN | EventType::RIGHT_BUTTON,
            ]
        );
    }

    #[test]
    fn test_reset_clears_pending_gestures() {
        let mut h = Harness::new(EventConfig::default());
        h.click(PointerButtons::LEFT, 0, 10);
        h.feed(PointerSample::press(PointerButtons::LEFT), 20);
        h.channel.reset();

        assert!(h.channel.pressed().is_empty());
        // Release after reset is spurious
        assert!(h.feed(PointerSample::release(PointerButtons::LEFT), 30).is_empty());
        // Pending click was forgotten: no double click
        let events = h.click(PointerButtons::LEFT, 40, 50);
        assert!(!events.contains(&(EventType::MOUSE_DOUBLE_CLICK | LEFT)));
    }
}
