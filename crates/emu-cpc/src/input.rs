//! Input handling for the CPC.
//!
//! Three layers:
//! 1. `CpcKey`: logical keys mapped to the 10×8 keyboard matrix.
//! 2. Immediate `key_event`/`press_key`/`release_key` on `Cpc`.
//! 3. `InputQueue`: timed key events for scripted sequences.
//!
//! Keys are named after the UK keycaps. The French AZERTY machine uses the
//! same matrix with different legends; `keyboard_map` handles the
//! difference when typing text.

use std::collections::VecDeque;

use crate::config::KeyboardLayout;
use crate::keyboard::KeyboardMatrix;
use crate::keyboard_map::char_to_keys;

/// A key position on the CPC keyboard, named by its UK legend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CpcKey {
    // Line 0
    Up,
    Right,
    Down,
    F9,
    F6,
    F3,
    KeypadEnter,
    KeypadDot,
    // Line 1
    Left,
    Copy,
    F7,
    F8,
    F5,
    F1,
    F2,
    F0,
    // Line 2
    Clr,
    LeftBracket,
    Return,
    RightBracket,
    F4,
    Shift,
    Backslash,
    Control,
    // Line 3
    Caret,
    Minus,
    At,
    P,
    Semicolon,
    Colon,
    Slash,
    Dot,
    // Line 4
    N0,
    N9,
    O,
    I,
    L,
    K,
    M,
    Comma,
    // Line 5
    N8,
    N7,
    U,
    Y,
    H,
    J,
    N,
    Space,
    // Line 6
    N6,
    N5,
    R,
    T,
    G,
    F,
    B,
    V,
    // Line 7
    N4,
    N3,
    E,
    W,
    S,
    D,
    C,
    X,
    // Line 8
    N1,
    N2,
    Esc,
    Q,
    Tab,
    A,
    CapsLock,
    Z,
    // Line 9
    JoyUp,
    JoyDown,
    JoyLeft,
    JoyRight,
    Fire2,
    Fire1,
    Del,
}

impl CpcKey {
    /// Every key, in matrix order.
    pub const ALL: [CpcKey; 79] = [
        Self::Up, Self::Right, Self::Down, Self::F9, Self::F6, Self::F3, Self::KeypadEnter,
        Self::KeypadDot, Self::Left, Self::Copy, Self::F7, Self::F8, Self::F5, Self::F1,
        Self::F2, Self::F0, Self::Clr, Self::LeftBracket, Self::Return, Self::RightBracket,
        Self::F4, Self::Shift, Self::Backslash, Self::Control, Self::Caret, Self::Minus,
        Self::At, Self::P, Self::Semicolon, Self::Colon, Self::Slash, Self::Dot, Self::N0,
        Self::N9, Self::O, Self::I, Self::L, Self::K, Self::M, Self::Comma, Self::N8, Self::N7,
        Self::U, Self::Y, Self::H, Self::J, Self::N, Self::Space, Self::N6, Self::N5, Self::R,
        Self::T, Self::G, Self::F, Self::B, Self::V, Self::N4, Self::N3, Self::E, Self::W,
        Self::S, Self::D, Self::C, Self::X, Self::N1, Self::N2, Self::Esc, Self::Q, Self::Tab,
        Self::A, Self::CapsLock, Self::Z, Self::JoyUp, Self::JoyDown, Self::JoyLeft,
        Self::JoyRight, Self::Fire2, Self::Fire1, Self::Del,
    ];

    /// Return the (line, bit) pair for this key in the keyboard matrix.
    #[must_use]
    pub const fn matrix(self) -> (usize, u8) {
        match self {
            Self::Up => (0, 0),
            Self::Right => (0, 1),
            Self::Down => (0, 2),
            Self::F9 => (0, 3),
            Self::F6 => (0, 4),
            Self::F3 => (0, 5),
            Self::KeypadEnter => (0, 6),
            Self::KeypadDot => (0, 7),

            Self::Left => (1, 0),
            Self::Copy => (1, 1),
            Self::F7 => (1, 2),
            Self::F8 => (1, 3),
            Self::F5 => (1, 4),
            Self::F1 => (1, 5),
            Self::F2 => (1, 6),
            Self::F0 => (1, 7),

            Self::Clr => (2, 0),
            Self::LeftBracket => (2, 1),
            Self::Return => (2, 2),
            Self::RightBracket => (2, 3),
            Self::F4 => (2, 4),
            Self::Shift => (2, 5),
            Self::Backslash => (2, 6),
            Self::Control => (2, 7),

            Self::Caret => (3, 0),
            Self::Minus => (3, 1),
            Self::At => (3, 2),
            Self::P => (3, 3),
            Self::Semicolon => (3, 4),
            Self::Colon => (3, 5),
            Self::Slash => (3, 6),
            Self::Dot => (3, 7),

            Self::N0 => (4, 0),
            Self::N9 => (4, 1),
            Self::O => (4, 2),
            Self::I => (4, 3),
            Self::L => (4, 4),
            Self::K => (4, 5),
            Self::M => (4, 6),
            Self::Comma => (4, 7),

            Self::N8 => (5, 0),
            Self::N7 => (5, 1),
            Self::U => (5, 2),
            Self::Y => (5, 3),
            Self::H => (5, 4),
            Self::J => (5, 5),
            Self::N => (5, 6),
            Self::Space => (5, 7),

            Self::N6 => (6, 0),
            Self::N5 => (6, 1),
            Self::R => (6, 2),
            Self::T => (6, 3),
            Self::G => (6, 4),
            Self::F => (6, 5),
            Self::B => (6, 6),
            Self::V => (6, 7),

            Self::N4 => (7, 0),
            Self::N3 => (7, 1),
            Self::E => (7, 2),
            Self::W => (7, 3),
            Self::S => (7, 4),
            Self::D => (7, 5),
            Self::C => (7, 6),
            Self::X => (7, 7),

            Self::N1 => (8, 0),
            Self::N2 => (8, 1),
            Self::Esc => (8, 2),
            Self::Q => (8, 3),
            Self::Tab => (8, 4),
            Self::A => (8, 5),
            Self::CapsLock => (8, 6),
            Self::Z => (8, 7),

            Self::JoyUp => (9, 0),
            Self::JoyDown => (9, 1),
            Self::JoyLeft => (9, 2),
            Self::JoyRight => (9, 3),
            Self::Fire2 => (9, 4),
            Self::Fire1 => (9, 5),
            Self::Del => (9, 7),
        }
    }

    /// Matrix line and bit mask, in the form `Cpc::key_event` takes.
    #[must_use]
    pub const fn line_mask(self) -> (usize, u8) {
        let (line, bit) = self.matrix();
        (line, 1 << bit)
    }
}

/// A timed keyboard event.
#[derive(Debug, Clone)]
pub struct InputEvent {
    /// Frame number at which this event fires.
    pub frame: u64,
    pub key: CpcKey,
    /// True = press, false = release.
    pub pressed: bool,
}

/// Timed input queue for scripted key sequences.
///
/// Events are sorted by frame number and processed at the start of each frame.
pub struct InputQueue {
    events: VecDeque<InputEvent>,
}

impl InputQueue {
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: VecDeque::new(),
        }
    }

    /// Enqueue a raw input event, keeping frame order.
    pub fn push(&mut self, event: InputEvent) {
        let pos = self
            .events
            .iter()
            .position(|e| e.frame > event.frame)
            .unwrap_or(self.events.len());
        self.events.insert(pos, event);
    }

    /// Press `key` at `at_frame` and release it `hold_frames` later.
    pub fn enqueue_key(&mut self, key: CpcKey, at_frame: u64, hold_frames: u64) {
        self.push(InputEvent {
            frame: at_frame,
            key,
            pressed: true,
        });
        self.push(InputEvent {
            frame: at_frame + hold_frames,
            key,
            pressed: false,
        });
    }

    /// Enqueue typing a string on a keyboard with the given layout.
    ///
    /// Each character is held for 3 frames with a 3-frame gap; the firmware
    /// scans the keyboard every 50th of a second, so this is comfortably
    /// above its debounce. Unsupported characters are skipped. Returns the
    /// next free frame.
    pub fn enqueue_text(&mut self, text: &str, start_frame: u64, layout: KeyboardLayout) -> u64 {
        let hold = 3u64;
        let gap = 3u64;
        let mut frame = start_frame;

        for ch in text.chars() {
            let keys = char_to_keys(ch, layout);
            if keys.is_empty() {
                continue;
            }
            for &key in &keys {
                self.enqueue_key(key, frame, hold);
            }
            frame += hold + gap;
        }

        frame
    }

    /// Apply every event due at or before `frame`.
    pub fn process(&mut self, frame: u64, keyboard: &mut KeyboardMatrix) {
        while self.events.front().is_some_and(|e| e.frame <= frame) {
            let Some(event) = self.events.pop_front() else {
                break;
            };
            let (line, mask) = event.key.line_mask();
            keyboard.key_event(line, mask, event.pressed);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl Default for InputQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_matrix_lines() {
        assert_eq!(CpcKey::Up.matrix(), (0, 0));
        assert_eq!(CpcKey::Return.matrix(), (2, 2));
        assert_eq!(CpcKey::Shift.matrix(), (2, 5));
        assert_eq!(CpcKey::Space.matrix(), (5, 7));
        assert_eq!(CpcKey::A.matrix(), (8, 5));
        assert_eq!(CpcKey::Del.matrix(), (9, 7));
    }

    #[test]
    fn every_key_has_a_unique_position() {
        let mut seen = std::collections::HashSet::new();
        for key in CpcKey::ALL {
            assert!(seen.insert(key.matrix()), "{key:?} shares a position");
        }
        assert_eq!(seen.len(), 79);
    }

    #[test]
    fn process_applies_events() {
        let mut queue = InputQueue::new();
        let mut kbd = KeyboardMatrix::new();
        queue.enqueue_key(CpcKey::A, 5, 3);

        queue.process(4, &mut kbd);
        assert_eq!(kbd.read(8) & 0x20, 0x20);

        queue.process(5, &mut kbd);
        assert_eq!(kbd.read(8) & 0x20, 0x00);

        queue.process(8, &mut kbd);
        assert_eq!(kbd.read(8) & 0x20, 0x20);
        assert!(queue.is_empty());
    }

    #[test]
    fn enqueue_text_timing() {
        let mut queue = InputQueue::new();
        let next = queue.enqueue_text("AB", 0, KeyboardLayout::Qwerty);
        assert_eq!(next, 12);
        assert_eq!(queue.len(), 4);
    }

    #[test]
    fn shifted_characters_press_two_keys() {
        let mut queue = InputQueue::new();
        queue.enqueue_text("\"", 0, KeyboardLayout::Qwerty);
        assert_eq!(queue.len(), 4);

        let mut kbd = KeyboardMatrix::new();
        queue.process(0, &mut kbd);
        assert_eq!(kbd.read(2) & 0x20, 0); // Shift
        assert_eq!(kbd.read(8) & 0x02, 0); // 2
    }

    #[test]
    fn unsupported_characters_take_no_time() {
        let mut queue = InputQueue::new();
        let next = queue.enqueue_text("\u{263A}", 10, KeyboardLayout::Qwerty);
        assert_eq!(next, 10);
        assert!(queue.is_empty());
    }
}
