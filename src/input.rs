//! Input Module - crossterm events into raw samples
//!
//! Bridges crossterm's terminal events into the raw key and pointer samples
//! the event service consumes. A terminal stands in for the hardware poll
//! loop: columns and rows become absolute pointer positions, key events
//! become key samples.
//!
//! Most terminals only report key presses. In [`KeyReporting::PressOnly`]
//! mode each press is expanded into a full down/up cycle, wrapped in the
//! modifier keys the terminal reported. Terminals speaking the keyboard
//! enhancement protocol (see [`enable_key_releases`]) report repeats,
//! releases and bare modifier keys; [`KeyReporting::Full`] maps those
//! one to one.
//!
//! # API
//!
//! - `convert_key_event` / `convert_mouse_event` - Single event conversion
//! - `convert_event` - Any crossterm event
//! - `poll_sample` - Non-blocking read with timeout
//! - `read_sample` - Blocking read
//! - `route_event` - Feed a converted event into a service
//!
//! # Example
//!
//! ```ignore
//! use spark_input::input::{poll_sample, route_event, KeyReporting};
//! use std::time::Duration;
//!
//! loop {
//!     if let Ok(Some(event)) = poll_sample(Duration::from_millis(16), KeyReporting::PressOnly) {
//!         route_event(&service, event);
//!     }
//! }
//! ```

use crossterm::event::{
    poll, read, DisableMouseCapture, EnableMouseCapture, Event as CrosstermEvent,
    KeyCode as CrosstermKeyCode, KeyEvent as CrosstermKeyEvent, KeyEventKind, KeyModifiers,
    KeyboardEnhancementFlags, ModifierKeyCode, MouseButton as CrosstermMouseButton,
    MouseEvent as CrosstermMouseEvent, MouseEventKind, PopKeyboardEnhancementFlags,
    PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use std::io::stdout;
use std::time::Duration;

use crate::ingest::{KeySample, PointerSample, RawSample};
use crate::keymap;
use crate::service::EventService;
use crate::types::{KeyCode, Modifiers, PointerButtons, ScreenBounds};

/// How the terminal reports keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyReporting {
    /// Presses only; releases are synthesized.
    #[default]
    PressOnly,
    /// Presses, repeats, releases and modifier keys are all reported.
    Full,
}

/// A converted terminal event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// Raw samples, in the order they must be submitted.
    Samples(Vec<RawSample>),
    /// Terminal resized to (columns, rows).
    Resize(u16, u16),
    /// Nothing the event core models (focus, paste, scroll).
    None,
}

// =============================================================================
// MOUSE EVENT CONVERSION
// =============================================================================

/// Convert a crossterm mouse event into a pointer sample.
///
/// Scroll wheel events have no counterpart and yield `None`.
pub fn convert_mouse_event(event: CrosstermMouseEvent) -> Option<PointerSample> {
    let sample = PointerSample::moved_to(i32::from(event.column), i32::from(event.row));
    match event.kind {
        MouseEventKind::Down(btn) => Some(PointerSample {
            pressed: convert_mouse_button(btn),
            ..sample
        }),
        MouseEventKind::Up(btn) => Some(PointerSample {
            released: convert_mouse_button(btn),
            ..sample
        }),
        MouseEventKind::Drag(_) | MouseEventKind::Moved => Some(sample),
        MouseEventKind::ScrollUp
        | MouseEventKind::ScrollDown
        | MouseEventKind::ScrollLeft
        | MouseEventKind::ScrollRight => None,
    }
}

fn convert_mouse_button(btn: CrosstermMouseButton) -> PointerButtons {
    match btn {
        CrosstermMouseButton::Left => PointerButtons::LEFT,
        CrosstermMouseButton::Right => PointerButtons::RIGHT,
        CrosstermMouseButton::Middle => PointerButtons::RESERVED,
    }
}

// =============================================================================
// KEY EVENT CONVERSION
// =============================================================================

/// Convert a crossterm key event into key samples.
///
/// Keys without a physical equivalent on the keyboard usage page yield an
/// empty list.
pub fn convert_key_event(event: CrosstermKeyEvent, reporting: KeyReporting) -> Vec<KeySample> {
    let Some(code) = convert_key_code(event.code) else {
        return Vec::new();
    };

    match reporting {
        KeyReporting::Full => match event.kind {
            KeyEventKind::Press | KeyEventKind::Repeat => vec![KeySample::down(code)],
            KeyEventKind::Release => vec![KeySample::up(code)],
        },
        KeyReporting::PressOnly => {
            if event.kind == KeyEventKind::Release {
                return Vec::new();
            }
            let held = held_modifier_keys(&event, code);

            let mut samples: Vec<KeySample> = held.iter().copied().map(KeySample::down).collect();
            samples.push(KeySample::down(code));
            samples.push(KeySample::up(code));
            samples.extend(held.iter().rev().copied().map(KeySample::up));
            samples
        }
    }
}

/// Modifier keys to wrap around a press-only key event.
fn held_modifier_keys(event: &CrosstermKeyEvent, code: KeyCode) -> Vec<KeyCode> {
    if code.modifier().is_some() {
        return Vec::new();
    }

    // For characters the shift state follows from the character itself;
    // terminals disagree on whether they also set the SHIFT flag.
    let shift = match event.code {
        CrosstermKeyCode::Char(c) => is_shifted(code, c),
        CrosstermKeyCode::BackTab => true,
        _ => event.modifiers.contains(KeyModifiers::SHIFT),
    };

    let mut keys = Vec::new();
    if event.modifiers.contains(KeyModifiers::CONTROL) {
        keys.push(KeyCode::LEFT_CONTROL);
    }
    if shift {
        keys.push(KeyCode::LEFT_SHIFT);
    }
    if event.modifiers.contains(KeyModifiers::ALT) {
        keys.push(KeyCode::LEFT_OPTION);
    }
    if event
        .modifiers
        .intersects(KeyModifiers::SUPER | KeyModifiers::META | KeyModifiers::HYPER)
    {
        keys.push(KeyCode::LEFT_COMMAND);
    }
    keys
}

fn is_shifted(code: KeyCode, c: char) -> bool {
    let plain = keymap::translate(code, Modifiers::empty(), false).unicode_char;
    plain != Some(c)
}

fn convert_key_code(code: CrosstermKeyCode) -> Option<KeyCode> {
    let key = match code {
        CrosstermKeyCode::Char(c) => return keymap::key_for_char(c),
        CrosstermKeyCode::Enter => KeyCode::ENTER,
        CrosstermKeyCode::Tab | CrosstermKeyCode::BackTab => KeyCode::TAB,
        CrosstermKeyCode::Backspace => KeyCode::BACKSPACE,
        CrosstermKeyCode::Delete => KeyCode::DELETE,
        CrosstermKeyCode::Insert => KeyCode::INSERT,
        CrosstermKeyCode::Esc => KeyCode::ESCAPE,
        CrosstermKeyCode::Up => KeyCode::UP,
        CrosstermKeyCode::Down => KeyCode::DOWN,
        CrosstermKeyCode::Left => KeyCode::LEFT,
        CrosstermKeyCode::Right => KeyCode::RIGHT,
        CrosstermKeyCode::Home => KeyCode::HOME,
        CrosstermKeyCode::End => KeyCode::END,
        CrosstermKeyCode::PageUp => KeyCode::PAGE_UP,
        CrosstermKeyCode::PageDown => KeyCode::PAGE_DOWN,
        CrosstermKeyCode::CapsLock => KeyCode::CAPS_LOCK,
        CrosstermKeyCode::F(n @ 1..=12) => KeyCode::usage(KeyCode::F1.usage_id() + (n - 1)),
        CrosstermKeyCode::Modifier(modifier) => return convert_modifier_key(modifier),
        _ => return None,
    };
    Some(key)
}

fn convert_modifier_key(modifier: ModifierKeyCode) -> Option<KeyCode> {
    let key = match modifier {
        ModifierKeyCode::LeftShift => KeyCode::LEFT_SHIFT,
        ModifierKeyCode::LeftControl => KeyCode::LEFT_CONTROL,
        ModifierKeyCode::LeftAlt => KeyCode::LEFT_OPTION,
        ModifierKeyCode::LeftSuper | ModifierKeyCode::LeftMeta | ModifierKeyCode::LeftHyper => {
            KeyCode::LEFT_COMMAND
        }
        ModifierKeyCode::RightShift => KeyCode::RIGHT_SHIFT,
        ModifierKeyCode::RightControl => KeyCode::RIGHT_CONTROL,
        ModifierKeyCode::RightAlt => KeyCode::RIGHT_OPTION,
        ModifierKeyCode::RightSuper | ModifierKeyCode::RightMeta | ModifierKeyCode::RightHyper => {
            KeyCode::RIGHT_COMMAND
        }
        ModifierKeyCode::IsoLevel3Shift | ModifierKeyCode::IsoLevel5Shift => return None,
    };
    Some(key)
}

/// Convert any crossterm event.
pub fn convert_event(event: CrosstermEvent, reporting: KeyReporting) -> HostEvent {
    match event {
        CrosstermEvent::Key(key) => {
            let samples: Vec<RawSample> = convert_key_event(key, reporting)
                .into_iter()
                .map(RawSample::from)
                .collect();
            if samples.is_empty() {
                HostEvent::None
            } else {
                HostEvent::Samples(samples)
            }
        }
        CrosstermEvent::Mouse(mouse) => match convert_mouse_event(mouse) {
            Some(sample) => HostEvent::Samples(vec![sample.into()]),
            None => HostEvent::None,
        },
        CrosstermEvent::Resize(w, h) => HostEvent::Resize(w, h),
        _ => HostEvent::None,
    }
}

// =============================================================================
// EVENT POLLING
// =============================================================================

/// Poll for an event with timeout.
///
/// Returns `Ok(Some(event))` if one is available, `Ok(None)` on timeout.
pub fn poll_sample(timeout: Duration, reporting: KeyReporting) -> std::io::Result<Option<HostEvent>> {
    if poll(timeout)? {
        Ok(Some(read_sample(reporting)?))
    } else {
        Ok(None)
    }
}

/// Read the next event (blocking).
pub fn read_sample(reporting: KeyReporting) -> std::io::Result<HostEvent> {
    Ok(convert_event(read()?, reporting))
}

// =============================================================================
// EVENT ROUTING
// =============================================================================

/// Feed a converted event into `service`. Returns the events dispatched.
///
/// A resize becomes the service's new screen bounds.
pub fn route_event(service: &EventService, event: HostEvent) -> usize {
    match event {
        HostEvent::Samples(samples) => samples
            .into_iter()
            .map(|sample| service.submit(sample))
            .sum(),
        HostEvent::Resize(w, h) => {
            let screen = ScreenBounds::new(u32::from(w), u32::from(h));
            if let Err(err) = service.set_screen_bounds(Some(screen)) {
                log::warn!("ignoring terminal resize to {}x{}: {}", w, h, err);
            }
            0
        }
        HostEvent::None => 0,
    }
}

// =============================================================================
// TERMINAL MODES
// =============================================================================

/// Enable mouse capture.
pub fn enable_mouse() -> std::io::Result<()> {
    execute!(stdout(), EnableMouseCapture)
}

/// Disable mouse capture.
pub fn disable_mouse() -> std::io::Result<()> {
    execute!(stdout(), DisableMouseCapture)
}

/// Ask the terminal for repeat/release reporting and bare modifier keys.
///
/// Pair with [`KeyReporting::Full`] once enabled.
pub fn enable_key_releases() -> std::io::Result<()> {
    execute!(
        stdout(),
        PushKeyboardEnhancementFlags(
            KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
                | KeyboardEnhancementFlags::REPORT_ALL_KEYS_AS_ESCAPE_CODES
        )
    )
}

/// Restore the terminal's previous key reporting.
pub fn disable_key_releases() -> std::io::Result<()> {
    execute!(stdout(), PopKeyboardEnhancementFlags)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::EventConfig;
    use crate::ingest::PointerMotion;
    use crate::types::{EventType, Position};
    use crossterm::event::KeyEventState;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn key(code: CrosstermKeyCode, modifiers: KeyModifiers, kind: KeyEventKind) -> CrosstermKeyEvent {
        CrosstermKeyEvent {
            code,
            modifiers,
            kind,
            state: KeyEventState::NONE,
        }
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> CrosstermMouseEvent {
        CrosstermMouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    #[test]
    fn test_convert_mouse_down() {
        let sample = convert_mouse_event(mouse(
            MouseEventKind::Down(CrosstermMouseButton::Left),
            10,
            5,
        ))
        .unwrap();
        assert_eq!(sample.motion, PointerMotion::Absolute { x: 10, y: 5 });
        assert_eq!(sample.pressed, PointerButtons::LEFT);
        assert!(sample.released.is_empty());
    }

    #[test]
    fn test_convert_mouse_up_middle() {
        let sample = convert_mouse_event(mouse(
            MouseEventKind::Up(CrosstermMouseButton::Middle),
            0,
            0,
        ))
        .unwrap();
        assert_eq!(sample.released, PointerButtons::RESERVED);
    }

    #[test]
    fn test_convert_mouse_scroll_is_dropped() {
        assert!(convert_mouse_event(mouse(MouseEventKind::ScrollDown, 1, 1)).is_none());
    }

    #[test]
    fn test_press_only_synthesizes_release() {
        let samples = convert_key_event(
            key(CrosstermKeyCode::Char('a'), KeyModifiers::NONE, KeyEventKind::Press),
            KeyReporting::PressOnly,
        );
        assert_eq!(
            samples,
            vec![KeySample::down(KeyCode::A), KeySample::up(KeyCode::A)]
        );
    }

    #[test]
    fn test_press_only_wraps_shift_for_shifted_chars() {
        // Some terminals omit the SHIFT flag for uppercase letters.
        let samples = convert_key_event(
            key(CrosstermKeyCode::Char('?'), KeyModifiers::NONE, KeyEventKind::Press),
            KeyReporting::PressOnly,
        );
        assert_eq!(
            samples,
            vec![
                KeySample::down(KeyCode::LEFT_SHIFT),
                KeySample::down(KeyCode::SLASH),
                KeySample::up(KeyCode::SLASH),
                KeySample::up(KeyCode::LEFT_SHIFT),
            ]
        );
    }

    #[test]
    fn test_press_only_control_chord() {
        let samples = convert_key_event(
            key(CrosstermKeyCode::Char('c'), KeyModifiers::CONTROL, KeyEventKind::Press),
            KeyReporting::PressOnly,
        );
        assert_eq!(samples.first(), Some(&KeySample::down(KeyCode::LEFT_CONTROL)));
        assert_eq!(samples.last(), Some(&KeySample::up(KeyCode::LEFT_CONTROL)));
        assert_eq!(samples.len(), 4);
    }

    #[test]
    fn test_full_reporting_maps_kinds() {
        let release = convert_key_event(
            key(CrosstermKeyCode::Enter, KeyModifiers::NONE, KeyEventKind::Release),
            KeyReporting::Full,
        );
        assert_eq!(release, vec![KeySample::up(KeyCode::ENTER)]);

        let repeat = convert_key_event(
            key(CrosstermKeyCode::F(10), KeyModifiers::NONE, KeyEventKind::Repeat),
            KeyReporting::Full,
        );
        assert_eq!(repeat, vec![KeySample::down(KeyCode::usage(0x43))]);

        let shift = convert_key_event(
            key(
                CrosstermKeyCode::Modifier(ModifierKeyCode::RightShift),
                KeyModifiers::SHIFT,
                KeyEventKind::Press,
            ),
            KeyReporting::Full,
        );
        assert_eq!(shift, vec![KeySample::down(KeyCode::RIGHT_SHIFT)]);
    }

    #[test]
    fn test_unmapped_keys_are_dropped() {
        let event = CrosstermEvent::Key(key(
            CrosstermKeyCode::Char('é'),
            KeyModifiers::NONE,
            KeyEventKind::Press,
        ));
        assert_eq!(convert_event(event, KeyReporting::PressOnly), HostEvent::None);
    }

    #[test]
    fn test_route_event_into_service() {
        let service =
            EventService::with_clock(EventConfig::default(), ManualClock::new()).unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        service
            .register_handler(EventType::ALL_KEYBOARD_EVENTS, move |e| {
                s.borrow_mut().push(e.key_pair().map(|p| p.input_key.unicode_char));
            })
            .unwrap();

        let event = convert_event(
            CrosstermEvent::Key(key(
                CrosstermKeyCode::Char('A'),
                KeyModifiers::SHIFT,
                KeyEventKind::Press,
            )),
            KeyReporting::PressOnly,
        );
        // Shift down, Modifier down, A down, A up, Shift up, Modifier up
        assert_eq!(route_event(&service, event), 6);
        assert_eq!(seen.borrow()[2], Some(Some('A')));
        assert!(service.modifiers().is_empty());
    }

    #[test]
    fn test_route_resize() {
        let service =
            EventService::with_clock(EventConfig::default(), ManualClock::new()).unwrap();
        service.set_cursor_position(Position::new(100, 40)).unwrap();

        route_event(&service, HostEvent::Resize(80, 24));
        assert_eq!(service.cursor_position(), Position::new(79, 23));
    }
}
