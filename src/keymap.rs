//! Keymap - physical key code to firmware input key translation.
//!
//! Printing keys translate to a character (US layout), honoring Shift and
//! the CapsLock latch. Navigation and function keys translate to firmware
//! scan codes. Everything else yields [`scan::NULL`] with no character.

use crate::types::{InputKey, KeyCode, Modifiers};

/// Firmware scan codes for non-printing keys.
pub mod scan {
    pub const NULL: u16 = 0x00;
    pub const UP: u16 = 0x01;
    pub const DOWN: u16 = 0x02;
    pub const RIGHT: u16 = 0x03;
    pub const LEFT: u16 = 0x04;
    pub const HOME: u16 = 0x05;
    pub const END: u16 = 0x06;
    pub const INSERT: u16 = 0x07;
    pub const DELETE: u16 = 0x08;
    pub const PAGE_UP: u16 = 0x09;
    pub const PAGE_DOWN: u16 = 0x0A;
    pub const F1: u16 = 0x0B;
    pub const F10: u16 = 0x14;
    pub const F11: u16 = 0x15;
    pub const F12: u16 = 0x16;
    pub const ESC: u16 = 0x17;
}

// Unshifted / shifted characters for the symbol row and punctuation.
const DIGITS: [(char, char); 10] = [
    ('1', '!'),
    ('2', '@'),
    ('3', '#'),
    ('4', '$'),
    ('5', '%'),
    ('6', '^'),
    ('7', '&'),
    ('8', '*'),
    ('9', '('),
    ('0', ')'),
];

const PUNCTUATION: [(KeyCode, char, char); 11] = [
    (KeyCode::MINUS, '-', '_'),
    (KeyCode::EQUAL, '=', '+'),
    (KeyCode::LEFT_BRACKET, '[', '{'),
    (KeyCode::RIGHT_BRACKET, ']', '}'),
    (KeyCode::BACKSLASH, '\\', '|'),
    (KeyCode::SEMICOLON, ';', ':'),
    (KeyCode::QUOTE, '\'', '"'),
    (KeyCode::GRAVE, '`', '~'),
    (KeyCode::COMMA, ',', '<'),
    (KeyCode::PERIOD, '.', '>'),
    (KeyCode::SLASH, '/', '?'),
];

/// Translate a physical key into a firmware input key.
pub fn translate(code: KeyCode, modifiers: Modifiers, caps_lock: bool) -> InputKey {
    let shift = modifiers.shift();

    if let Some(c) = character(code, shift, caps_lock) {
        return InputKey {
            scan_code: scan::NULL,
            unicode_char: Some(c),
        };
    }

    InputKey {
        scan_code: scan_code(code),
        unicode_char: None,
    }
}

/// Physical key that produces `c` on a US layout, ignoring modifiers.
pub fn key_for_char(c: char) -> Option<KeyCode> {
    if let Some(code) = KeyCode::letter(c) {
        return Some(code);
    }
    if let Some(index) = DIGITS
        .iter()
        .position(|&(plain, shifted)| plain == c || shifted == c)
    {
        return Some(KeyCode::usage(KeyCode::DIGIT_1.usage_id() + index as u8));
    }
    match c {
        '\r' | '\n' => Some(KeyCode::ENTER),
        '\u{8}' => Some(KeyCode::BACKSPACE),
        '\t' => Some(KeyCode::TAB),
        ' ' => Some(KeyCode::SPACE),
        _ => PUNCTUATION
            .iter()
            .find(|(_, plain, shifted)| *plain == c || *shifted == c)
            .map(|(key, _, _)| *key),
    }
}

fn character(code: KeyCode, shift: bool, caps_lock: bool) -> Option<char> {
    let id = code.usage_id();
    if !code.is_known() {
        return None;
    }

    match code {
        _ if (KeyCode::A..=KeyCode::Z).contains(&code) => {
            let c = (b'a' + (id - KeyCode::A.usage_id())) as char;
            // CapsLock inverts Shift for letters only.
            if shift != caps_lock {
                Some(c.to_ascii_uppercase())
            } else {
                Some(c)
            }
        }
        _ if (KeyCode::DIGIT_1..=KeyCode::DIGIT_0).contains(&code) => {
            let (plain, shifted) = DIGITS[(id - KeyCode::DIGIT_1.usage_id()) as usize];
            Some(if shift { shifted } else { plain })
        }
        KeyCode::ENTER => Some('\r'),
        KeyCode::BACKSPACE => Some('\u{8}'),
        KeyCode::TAB => Some('\t'),
        KeyCode::SPACE => Some(' '),
        _ => PUNCTUATION
            .iter()
            .find(|(key, _, _)| *key == code)
            .map(|&(_, plain, shifted)| if shift { shifted } else { plain }),
    }
}

fn scan_code(code: KeyCode) -> u16 {
    match code {
        KeyCode::UP => scan::UP,
        KeyCode::DOWN => scan::DOWN,
        KeyCode::RIGHT => scan::RIGHT,
        KeyCode::LEFT => scan::LEFT,
        KeyCode::HOME => scan::HOME,
        KeyCode::END => scan::END,
        KeyCode::INSERT => scan::INSERT,
        KeyCode::DELETE => scan::DELETE,
        KeyCode::PAGE_UP => scan::PAGE_UP,
        KeyCode::PAGE_DOWN => scan::PAGE_DOWN,
        KeyCode::ESCAPE => scan::ESC,
        _ if (KeyCode::F1..=KeyCode::F12).contains(&code) => {
            let n = u16::from(code.usage_id() - KeyCode::F1.usage_id());
            match n {
                0..=9 => scan::F1 + n,
                10 => scan::F11,
                _ => scan::F12,
            }
        }
        _ => scan::NULL,
    }
}
