//! Host keyboard → CPC key mapping.
//!
//! Host keys are identified by their physical position, using the W3C
//! `KeyboardEvent.code` names (`KeyA`, `Digit1`, `BracketLeft`...) that
//! window toolkits report. Positional mapping needs no layout: a French
//! host keyboard driving a French CPC lines up key for key.
//!
//! Typing text is different: the same character sits on different keys of
//! the UK and French machines, so `char_to_keys` takes the layout.

use crate::config::KeyboardLayout;
use crate::input::CpcKey;

/// Map a host key code to a CPC key.
///
/// Returns `None` for unmapped keys.
#[must_use]
pub fn map_keycode(code: &str) -> Option<CpcKey> {
    let key = match code {
        "KeyA" => CpcKey::A,
        "KeyB" => CpcKey::B,
        "KeyC" => CpcKey::C,
        "KeyD" => CpcKey::D,
        "KeyE" => CpcKey::E,
        "KeyF" => CpcKey::F,
        "KeyG" => CpcKey::G,
        "KeyH" => CpcKey::H,
        "KeyI" => CpcKey::I,
        "KeyJ" => CpcKey::J,
        "KeyK" => CpcKey::K,
        "KeyL" => CpcKey::L,
        "KeyM" => CpcKey::M,
        "KeyN" => CpcKey::N,
        "KeyO" => CpcKey::O,
        "KeyP" => CpcKey::P,
        "KeyQ" => CpcKey::Q,
        "KeyR" => CpcKey::R,
        "KeyS" => CpcKey::S,
        "KeyT" => CpcKey::T,
        "KeyU" => CpcKey::U,
        "KeyV" => CpcKey::V,
        "KeyW" => CpcKey::W,
        "KeyX" => CpcKey::X,
        "KeyY" => CpcKey::Y,
        "KeyZ" => CpcKey::Z,

        "Digit0" => CpcKey::N0,
        "Digit1" => CpcKey::N1,
        "Digit2" => CpcKey::N2,
        "Digit3" => CpcKey::N3,
        "Digit4" => CpcKey::N4,
        "Digit5" => CpcKey::N5,
        "Digit6" => CpcKey::N6,
        "Digit7" => CpcKey::N7,
        "Digit8" => CpcKey::N8,
        "Digit9" => CpcKey::N9,

        "Minus" => CpcKey::Minus,
        "Equal" => CpcKey::Caret,
        "BracketLeft" => CpcKey::At,
        "BracketRight" => CpcKey::LeftBracket,
        "Semicolon" => CpcKey::Colon,
        "Quote" => CpcKey::Semicolon,
        "Backslash" => CpcKey::RightBracket,
        "IntlBackslash" => CpcKey::Backslash,
        "Comma" => CpcKey::Comma,
        "Period" => CpcKey::Dot,
        "Slash" => CpcKey::Slash,

        "Escape" => CpcKey::Esc,
        "Tab" => CpcKey::Tab,
        "CapsLock" => CpcKey::CapsLock,
        "ShiftLeft" | "ShiftRight" => CpcKey::Shift,
        "ControlLeft" | "ControlRight" => CpcKey::Control,
        "AltLeft" | "AltRight" => CpcKey::Copy,
        "Enter" => CpcKey::Return,
        "Space" => CpcKey::Space,
        "Backspace" => CpcKey::Del,
        "Delete" => CpcKey::Clr,

        "ArrowUp" => CpcKey::Up,
        "ArrowDown" => CpcKey::Down,
        "ArrowLeft" => CpcKey::Left,
        "ArrowRight" => CpcKey::Right,

        "Numpad0" | "F10" => CpcKey::F0,
        "Numpad1" | "F1" => CpcKey::F1,
        "Numpad2" | "F2" => CpcKey::F2,
        "Numpad3" | "F3" => CpcKey::F3,
        "Numpad4" | "F4" => CpcKey::F4,
        "Numpad5" | "F5" => CpcKey::F5,
        "Numpad6" | "F6" => CpcKey::F6,
        "Numpad7" | "F7" => CpcKey::F7,
        "Numpad8" | "F8" => CpcKey::F8,
        "Numpad9" | "F9" => CpcKey::F9,
        "NumpadDecimal" => CpcKey::KeypadDot,
        "NumpadEnter" => CpcKey::KeypadEnter,

        _ => return None,
    };
    Some(key)
}

/// Map a character to the CPC keys needed to type it.
///
/// Returns 1 key for plain characters, 2 for shifted ones, and an empty
/// list for characters the keyboard can't produce.
#[must_use]
pub fn char_to_keys(ch: char, layout: KeyboardLayout) -> Vec<CpcKey> {
    match layout {
        KeyboardLayout::Qwerty => qwerty(ch),
        KeyboardLayout::Azerty => azerty(ch),
    }
}

fn letter(ch: char) -> Option<CpcKey> {
    let key = match ch.to_ascii_uppercase() {
        'A' => CpcKey::A,
        'B' => CpcKey::B,
        'C' => CpcKey::C,
        'D' => CpcKey::D,
        'E' => CpcKey::E,
        'F' => CpcKey::F,
        'G' => CpcKey::G,
        'H' => CpcKey::H,
        'I' => CpcKey::I,
        'J' => CpcKey::J,
        'K' => CpcKey::K,
        'L' => CpcKey::L,
        'M' => CpcKey::M,
        'N' => CpcKey::N,
        'O' => CpcKey::O,
        'P' => CpcKey::P,
        'Q' => CpcKey::Q,
        'R' => CpcKey::R,
        'S' => CpcKey::S,
        'T' => CpcKey::T,
        'U' => CpcKey::U,
        'V' => CpcKey::V,
        'W' => CpcKey::W,
        'X' => CpcKey::X,
        'Y' => CpcKey::Y,
        'Z' => CpcKey::Z,
        _ => return None,
    };
    Some(key)
}

const DIGITS: [CpcKey; 10] = [
    CpcKey::N0,
    CpcKey::N1,
    CpcKey::N2,
    CpcKey::N3,
    CpcKey::N4,
    CpcKey::N5,
    CpcKey::N6,
    CpcKey::N7,
    CpcKey::N8,
    CpcKey::N9,
];

fn digit(ch: char) -> Option<CpcKey> {
    ch.to_digit(10).map(|d| DIGITS[d as usize])
}

/// Letters type unshifted; the firmware starts in upper case with Caps
/// Lock off, and BASIC accepts either.
fn qwerty(ch: char) -> Vec<CpcKey> {
    if let Some(key) = letter(ch).or_else(|| digit(ch)) {
        return vec![key];
    }
    let shifted = |key| vec![CpcKey::Shift, key];
    match ch {
        ' ' => vec![CpcKey::Space],
        '\n' => vec![CpcKey::Return],
        '\t' => vec![CpcKey::Tab],
        '-' => vec![CpcKey::Minus],
        '^' => vec![CpcKey::Caret],
        '@' => vec![CpcKey::At],
        '[' => vec![CpcKey::LeftBracket],
        ']' => vec![CpcKey::RightBracket],
        ';' => vec![CpcKey::Semicolon],
        ':' => vec![CpcKey::Colon],
        '/' => vec![CpcKey::Slash],
        '.' => vec![CpcKey::Dot],
        ',' => vec![CpcKey::Comma],
        '\\' => vec![CpcKey::Backslash],
        '!' => shifted(CpcKey::N1),
        '"' => shifted(CpcKey::N2),
        '#' => shifted(CpcKey::N3),
        '$' => shifted(CpcKey::N4),
        '%' => shifted(CpcKey::N5),
        '&' => shifted(CpcKey::N6),
        '\'' => shifted(CpcKey::N7),
        '(' => shifted(CpcKey::N8),
        ')' => shifted(CpcKey::N9),
        '_' => shifted(CpcKey::N0),
        '=' => shifted(CpcKey::Minus),
        '|' => shifted(CpcKey::At),
        '+' => shifted(CpcKey::Semicolon),
        '*' => shifted(CpcKey::Colon),
        '?' => shifted(CpcKey::Slash),
        '>' => shifted(CpcKey::Dot),
        '<' => shifted(CpcKey::Comma),
        _ => Vec::new(),
    }
}

/// The French machine swaps A/Q and Z/W, moves M next to L and puts
/// the digits on the shifted top row.
fn azerty(ch: char) -> Vec<CpcKey> {
    let shifted = |key| vec![CpcKey::Shift, key];
    if let Some(key) = digit(ch) {
        return shifted(key);
    }
    if let Some(key) = letter(ch) {
        let key = match key {
            CpcKey::A => CpcKey::Q,
            CpcKey::Q => CpcKey::A,
            CpcKey::Z => CpcKey::W,
            CpcKey::W => CpcKey::Z,
            CpcKey::M => CpcKey::Colon,
            other => other,
        };
        return vec![key];
    }
    match ch {
        ' ' => vec![CpcKey::Space],
        '\n' => vec![CpcKey::Return],
        '\t' => vec![CpcKey::Tab],
        '&' => vec![CpcKey::N1],
        '"' => vec![CpcKey::N3],
        '\'' => vec![CpcKey::N4],
        '(' => vec![CpcKey::N5],
        '!' => vec![CpcKey::N8],
        ')' => vec![CpcKey::Minus],
        ',' => vec![CpcKey::M],
        ';' => vec![CpcKey::Comma],
        ':' => vec![CpcKey::Dot],
        '=' => vec![CpcKey::Slash],
        '.' => shifted(CpcKey::Comma),
        '/' => shifted(CpcKey::Dot),
        '+' => shifted(CpcKey::Slash),
        '|' => shifted(CpcKey::At),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_codes() {
        assert_eq!(map_keycode("KeyA"), Some(CpcKey::A));
        assert_eq!(map_keycode("Digit0"), Some(CpcKey::N0));
        assert_eq!(map_keycode("Enter"), Some(CpcKey::Return));
        assert_eq!(map_keycode("ShiftRight"), Some(CpcKey::Shift));
        assert_eq!(map_keycode("Backspace"), Some(CpcKey::Del));
        assert_eq!(map_keycode("F13"), None);
    }

    #[test]
    fn qwerty_characters() {
        assert_eq!(char_to_keys('r', KeyboardLayout::Qwerty), vec![CpcKey::R]);
        assert_eq!(char_to_keys('A', KeyboardLayout::Qwerty), vec![CpcKey::A]);
        assert_eq!(char_to_keys('7', KeyboardLayout::Qwerty), vec![CpcKey::N7]);
        assert_eq!(
            char_to_keys('|', KeyboardLayout::Qwerty),
            vec![CpcKey::Shift, CpcKey::At]
        );
        assert!(char_to_keys('\u{e9}', KeyboardLayout::Qwerty).is_empty());
    }

    #[test]
    fn azerty_swaps_letters_and_shifts_digits() {
        assert_eq!(char_to_keys('a', KeyboardLayout::Azerty), vec![CpcKey::Q]);
        assert_eq!(char_to_keys('w', KeyboardLayout::Azerty), vec![CpcKey::Z]);
        assert_eq!(char_to_keys('m', KeyboardLayout::Azerty), vec![CpcKey::Colon]);
        assert_eq!(char_to_keys('r', KeyboardLayout::Azerty), vec![CpcKey::R]);
        assert_eq!(
            char_to_keys('1', KeyboardLayout::Azerty),
            vec![CpcKey::Shift, CpcKey::N1]
        );
        assert_eq!(char_to_keys('"', KeyboardLayout::Azerty), vec![CpcKey::N3]);
    }
}
