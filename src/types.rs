//! Core types for spark-input.
//!
//! These types define the event model that flows from the classifier to
//! every subscriber: the event type bitmask, the modifier map, pointer
//! geometry and the immutable [`EventInfo`] snapshot handed to handlers.

use chrono::{DateTime, Datelike, Timelike, Utc};

// =============================================================================
// Event Type (bitflags)
// =============================================================================

bitflags::bitflags! {
    /// Event type as a set of flags.
    ///
    /// An event carries several bits at once, e.g. a left click is
    /// `MOUSE_CLICK | LEFT_BUTTON`. Subscribers match when any bit of their
    /// mask is present in the event type.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct EventType: u32 {
        const NONE = 0;
        const MOUSE_MOVED = 1 << 0;
        const MOUSE_DOWN = 1 << 1;
        const MOUSE_UP = 1 << 2;
        const MOUSE_CLICK = 1 << 3;
        const MOUSE_DOUBLE_CLICK = 1 << 4;
        const LEFT_BUTTON = 1 << 5;
        const RIGHT_BUTTON = 1 << 6;
        const RESERVED_BUTTON = 1 << 7;
        const KEY_DOWN = 1 << 8;
        const KEY_UP = 1 << 9;
        const MODIFIER_DOWN = 1 << 10;
        const MODIFIER_UP = 1 << 11;

        /// Everything a plain click handler usually wants.
        const CLICK_MOUSE_EVENTS = Self::MOUSE_DOWN.bits()
            | Self::MOUSE_UP.bits()
            | Self::MOUSE_CLICK.bits()
            | Self::LEFT_BUTTON.bits()
            | Self::RIGHT_BUTTON.bits();
        const ALL_MOUSE_EVENTS = 0x00FF;
        const ALL_KEYBOARD_EVENTS = 0xFF00;
    }
}

impl EventType {
    /// Button bits carried by pointer events.
    pub const BUTTON_BITS: Self = Self::LEFT_BUTTON
        .union(Self::RIGHT_BUTTON)
        .union(Self::RESERVED_BUTTON);

    /// Whether a subscriber with `mask` should receive an event of this type.
    #[inline]
    pub fn matches(self, mask: EventType) -> bool {
        self.intersects(mask)
    }

    /// True for key and modifier events.
    #[inline]
    pub fn is_keyboard(self) -> bool {
        self.intersects(Self::ALL_KEYBOARD_EVENTS)
    }

    /// True for pointer events.
    #[inline]
    pub fn is_pointer(self) -> bool {
        self.intersects(Self::ALL_MOUSE_EVENTS)
    }

    /// The button bits of this event, if any.
    #[inline]
    pub fn buttons(self) -> PointerButtons {
        let mut buttons = PointerButtons::empty();
        for button in PointerButtons::ORDER {
            if self.contains(button.event_bit()) {
                buttons |= button;
            }
        }
        buttons
    }
}

// =============================================================================
// Pointer Buttons
// =============================================================================

bitflags::bitflags! {
    /// Physical pointer buttons reported by the input source.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PointerButtons: u8 {
        const LEFT = 1 << 0;
        const RIGHT = 1 << 1;
        const RESERVED = 1 << 2;
    }
}

impl PointerButtons {
    /// Processing order for buttons that change in the same sample.
    pub const ORDER: [PointerButtons; 3] = [Self::LEFT, Self::RIGHT, Self::RESERVED];

    /// Map this button set to its event type bits.
    pub fn event_bit(self) -> EventType {
        let mut bits = EventType::empty();
        if self.contains(Self::LEFT) {
            bits |= EventType::LEFT_BUTTON;
        }
        if self.contains(Self::RIGHT) {
            bits |= EventType::RIGHT_BUTTON;
        }
        if self.contains(Self::RESERVED) {
            bits |= EventType::RESERVED_BUTTON;
        }
        bits
    }

    /// Index into per-button state tables. Only meaningful for single buttons.
    pub(crate) fn slot(self) -> usize {
        if self == Self::LEFT {
            0
        } else if self == Self::RIGHT {
            1
        } else {
            2
        }
    }
}

// =============================================================================
// Modifier Map (bitflags)
// =============================================================================

bitflags::bitflags! {
    /// Modifier key map, one bit per physical modifier key.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        const LEFT_CONTROL = 1 << 0;
        const LEFT_SHIFT = 1 << 1;
        const LEFT_OPTION = 1 << 2;
        const LEFT_COMMAND = 1 << 3;
        const RIGHT_CONTROL = 1 << 4;
        const RIGHT_SHIFT = 1 << 5;
        const RIGHT_OPTION = 1 << 6;
        const RIGHT_COMMAND = 1 << 7;

        const CONTROL = Self::LEFT_CONTROL.bits() | Self::RIGHT_CONTROL.bits();
        const SHIFT = Self::LEFT_SHIFT.bits() | Self::RIGHT_SHIFT.bits();
        const OPTION = Self::LEFT_OPTION.bits() | Self::RIGHT_OPTION.bits();
        const COMMAND = Self::LEFT_COMMAND.bits() | Self::RIGHT_COMMAND.bits();
    }
}

impl Modifiers {
    /// Either shift key held.
    pub fn shift(self) -> bool {
        self.intersects(Self::SHIFT)
    }

    /// Either control key held.
    pub fn control(self) -> bool {
        self.intersects(Self::CONTROL)
    }

    /// Either option key held.
    pub fn option(self) -> bool {
        self.intersects(Self::OPTION)
    }

    /// Either command key held.
    pub fn command(self) -> bool {
        self.intersects(Self::COMMAND)
    }
}

// =============================================================================
// Geometry
// =============================================================================

/// Pointer position in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    pub horizontal: i32,
    pub vertical: i32,
}

impl Position {
    pub const ORIGIN: Self = Self::new(0, 0);

    pub const fn new(horizontal: i32, vertical: i32) -> Self {
        Self {
            horizontal,
            vertical,
        }
    }

    /// Offset by a delta, saturating at the i32 range.
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(
            self.horizontal.saturating_add(dx),
            self.vertical.saturating_add(dy),
        )
    }

    /// Largest per-axis distance to another position.
    pub fn chebyshev_distance(self, other: Position) -> u32 {
        let dx = self.horizontal.abs_diff(other.horizontal);
        let dy = self.vertical.abs_diff(other.vertical);
        dx.max(dy)
    }
}

/// Visible screen area. Valid positions are `0..width` by `0..height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenBounds {
    pub width: u32,
    pub height: u32,
}

impl ScreenBounds {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Check if a position lies on screen.
    pub fn contains(&self, position: Position) -> bool {
        position.horizontal >= 0
            && position.vertical >= 0
            && (position.horizontal as u32) < self.width
            && (position.vertical as u32) < self.height
    }

    /// Clamp a position onto the screen.
    pub fn clamp(&self, position: Position) -> Position {
        let max_x = self.width.saturating_sub(1).min(i32::MAX as u32) as i32;
        let max_y = self.height.saturating_sub(1).min(i32::MAX as u32) as i32;
        Position::new(
            position.horizontal.clamp(0, max_x),
            position.vertical.clamp(0, max_y),
        )
    }
}

// =============================================================================
// Creation Time
// =============================================================================

/// Wall-clock stamp with second granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl Default for EventTime {
    fn default() -> Self {
        Self::from_unix_seconds(0)
    }
}

impl EventTime {
    /// Convert seconds since the Unix epoch (UTC) to a calendar stamp.
    ///
    /// Values past chrono's representable range saturate to its maximum.
    pub fn from_unix_seconds(secs: u64) -> Self {
        i64::try_from(secs)
            .ok()
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
            .into()
    }
}

impl From<DateTime<Utc>> for EventTime {
    fn from(stamp: DateTime<Utc>) -> Self {
        Self {
            year: stamp.year().clamp(0, i32::from(u16::MAX)) as u16,
            month: stamp.month() as u8,
            day: stamp.day() as u8,
            hour: stamp.hour() as u8,
            minute: stamp.minute() as u8,
            second: stamp.second() as u8,
        }
    }
}

// =============================================================================
// Keys
// =============================================================================

/// Physical key identity: HID keyboard usage page (0x7000) plus usage id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyCode(pub u16);

impl KeyCode {
    const PAGE: u16 = 0x7000;

    pub const A: Self = Self::usage(0x04);
    pub const Z: Self = Self::usage(0x1D);
    pub const DIGIT_1: Self = Self::usage(0x1E);
    pub const DIGIT_0: Self = Self::usage(0x27);
    pub const ENTER: Self = Self::usage(0x28);
    pub const ESCAPE: Self = Self::usage(0x29);
    pub const BACKSPACE: Self = Self::usage(0x2A);
    pub const TAB: Self = Self::usage(0x2B);
    pub const SPACE: Self = Self::usage(0x2C);
    pub const MINUS: Self = Self::usage(0x2D);
    pub const EQUAL: Self = Self::usage(0x2E);
    pub const LEFT_BRACKET: Self = Self::usage(0x2F);
    pub const RIGHT_BRACKET: Self = Self::usage(0x30);
    pub const BACKSLASH: Self = Self::usage(0x31);
    pub const SEMICOLON: Self = Self::usage(0x33);
    pub const QUOTE: Self = Self::usage(0x34);
    pub const GRAVE: Self = Self::usage(0x35);
    pub const COMMA: Self = Self::usage(0x36);
    pub const PERIOD: Self = Self::usage(0x37);
    pub const SLASH: Self = Self::usage(0x38);
    pub const CAPS_LOCK: Self = Self::usage(0x39);
    pub const F1: Self = Self::usage(0x3A);
    pub const F12: Self = Self::usage(0x45);
    pub const INSERT: Self = Self::usage(0x49);
    pub const HOME: Self = Self::usage(0x4A);
    pub const PAGE_UP: Self = Self::usage(0x4B);
    pub const DELETE: Self = Self::usage(0x4C);
    pub const END: Self = Self::usage(0x4D);
    pub const PAGE_DOWN: Self = Self::usage(0x4E);
    pub const RIGHT: Self = Self::usage(0x4F);
    pub const LEFT: Self = Self::usage(0x50);
    pub const DOWN: Self = Self::usage(0x51);
    pub const UP: Self = Self::usage(0x52);
    pub const LEFT_CONTROL: Self = Self::usage(0xE0);
    pub const LEFT_SHIFT: Self = Self::usage(0xE1);
    pub const LEFT_OPTION: Self = Self::usage(0xE2);
    pub const LEFT_COMMAND: Self = Self::usage(0xE3);
    pub const RIGHT_CONTROL: Self = Self::usage(0xE4);
    pub const RIGHT_SHIFT: Self = Self::usage(0xE5);
    pub const RIGHT_OPTION: Self = Self::usage(0xE6);
    pub const RIGHT_COMMAND: Self = Self::usage(0xE7);

    /// Key code for a keyboard-page usage id.
    pub const fn usage(id: u8) -> Self {
        Self(Self::PAGE | id as u16)
    }

    /// Usage id within the keyboard page.
    pub fn usage_id(self) -> u8 {
        (self.0 & 0x00FF) as u8
    }

    /// Whether this code names a key the core knows about.
    pub fn is_known(self) -> bool {
        if self.0 & 0xFF00 != Self::PAGE {
            return false;
        }
        matches!(self.usage_id(), 0x04..=0xA4 | 0xE0..=0xE7)
    }

    /// The modifier bit for this key, if it is a modifier key.
    pub fn modifier(self) -> Option<Modifiers> {
        match self {
            Self::LEFT_CONTROL => Some(Modifiers::LEFT_CONTROL),
            Self::LEFT_SHIFT => Some(Modifiers::LEFT_SHIFT),
            Self::LEFT_OPTION => Some(Modifiers::LEFT_OPTION),
            Self::LEFT_COMMAND => Some(Modifiers::LEFT_COMMAND),
            Self::RIGHT_CONTROL => Some(Modifiers::RIGHT_CONTROL),
            Self::RIGHT_SHIFT => Some(Modifiers::RIGHT_SHIFT),
            Self::RIGHT_OPTION => Some(Modifiers::RIGHT_OPTION),
            Self::RIGHT_COMMAND => Some(Modifiers::RIGHT_COMMAND),
            _ => None,
        }
    }

    /// Letter key `a`..`z` by character.
    pub fn letter(c: char) -> Option<Self> {
        let lower = c.to_ascii_lowercase();
        if lower.is_ascii_lowercase() {
            Some(Self::usage(0x04 + (lower as u8 - b'a')))
        } else {
            None
        }
    }
}

/// Firmware-style input key: a scan code for non-printing keys, a
/// character for printing ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct InputKey {
    pub scan_code: u16,
    pub unicode_char: Option<char>,
}

/// One translated key: the firmware input key plus the physical key code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyPair {
    pub input_key: InputKey,
    pub key_code: KeyCode,
}

// =============================================================================
// Event Info
// =============================================================================

/// Event payload. Which variant is present follows from the event type:
/// key events carry [`EventData::Key`], pointer events carry
/// [`EventData::Pointer`], modifier-only events carry [`EventData::Raw`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventData {
    Key(KeyPair),
    /// Pointer event discriminant (the event's own type bits).
    Pointer(EventType),
    /// Opaque value. Modifier transitions store the changed modifier bits.
    Raw(usize),
}

/// Immutable snapshot passed to handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventInfo {
    /// Wall-clock creation time.
    pub created: EventTime,
    /// Event type bits.
    pub event_type: EventType,
    /// Payload, tagged by event type.
    pub data: EventData,
    /// Modifier map at emission.
    pub modifiers: Modifiers,
    /// Pointer position at emission.
    pub position: Position,
}

impl EventInfo {
    /// Key down/up event.
    pub fn key(
        event_type: EventType,
        pair: KeyPair,
        created: EventTime,
        modifiers: Modifiers,
        position: Position,
    ) -> Self {
        debug_assert!(!event_type.is_pointer());
        Self {
            created,
            event_type,
            data: EventData::Key(pair),
            modifiers,
            position,
        }
    }

    /// Pointer event. The payload mirrors the type bits.
    pub fn pointer(
        event_type: EventType,
        created: EventTime,
        modifiers: Modifiers,
        position: Position,
    ) -> Self {
        debug_assert!(!event_type.is_keyboard());
        Self {
            created,
            event_type,
            data: EventData::Pointer(event_type),
            modifiers,
            position,
        }
    }

    /// Modifier down/up event carrying the changed bits.
    pub fn modifier(
        event_type: EventType,
        changed: Modifiers,
        created: EventTime,
        modifiers: Modifiers,
        position: Position,
    ) -> Self {
        debug_assert!(!event_type.is_pointer());
        Self {
            created,
            event_type,
            data: EventData::Raw(changed.bits() as usize),
            modifiers,
            position,
        }
    }

    /// Key pair, for key events.
    pub fn key_pair(&self) -> Option<KeyPair> {
        match self.data {
            EventData::Key(pair) => Some(pair),
            _ => None,
        }
    }

    /// Buttons this event refers to.
    pub fn buttons(&self) -> PointerButtons {
        self.event_type.buttons()
    }
}

// =============================================================================
// TESTS
// =============================================================================
