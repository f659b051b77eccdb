//! CPC keyboard matrix.
//!
//! Ten lines of eight keys. The PPI's port C bits 0-3 select a line and the
//! PSG reads it through its port A (register 14). A pressed key reads as 0.
//! Line 9 also carries the first joystick.
//!
//! | Line | Bit 0 | 1     | 2      | 3     | 4     | 5     | 6     | 7     |
//! |------|-------|-------|--------|-------|-------|-------|-------|-------|
//! | 0    | Up    | Right | Down   | F9    | F6    | F3    | Enter | F.    |
//! | 1    | Left  | Copy  | F7     | F8    | F5    | F1    | F2    | F0    |
//! | 2    | Clr   | [     | Return | ]     | F4    | Shift | \     | Ctrl  |
//! | 3    | ^     | -     | @      | P     | ;     | :     | /     | .     |
//! | 4    | 0     | 9     | O      | I     | L     | K     | M     | ,     |
//! | 5    | 8     | 7     | U      | Y     | H     | J     | N     | Space |
//! | 6    | 6     | 5     | R      | T     | G     | F     | B     | V     |
//! | 7    | 4     | 3     | E      | W     | S     | D     | C     | X     |
//! | 8    | 1     | 2     | Esc    | Q     | Tab   | A     | Caps  | Z     |
//! | 9    | J Up  | J Dn  | J Lt   | J Rt  | Fire2 | Fire1 |       | Del   |

pub const LINES: usize = 10;

pub struct KeyboardMatrix {
    /// Active low: a clear bit is a pressed key.
    lines: [u8; LINES],
}

impl KeyboardMatrix {
    #[must_use]
    pub fn new() -> Self {
        Self {
            lines: [0xFF; LINES],
        }
    }

    /// Press or release every key in `mask` on `line`. Lines past 9 are
    /// ignored.
    pub fn key_event(&mut self, line: usize, mask: u8, pressed: bool) {
        if let Some(bits) = self.lines.get_mut(line) {
            if pressed {
                *bits &= !mask;
            } else {
                *bits |= mask;
            }
        }
    }

    /// Read a line. Unconnected lines 10-15 read as nothing pressed.
    #[must_use]
    pub fn read(&self, line: u8) -> u8 {
        self.lines.get(usize::from(line)).copied().unwrap_or(0xFF)
    }

    pub fn release_all(&mut self) {
        self.lines = [0xFF; LINES];
    }
}

impl Default for KeyboardMatrix {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_pressed() {
        let kbd = KeyboardMatrix::new();
        for line in 0..16 {
            assert_eq!(kbd.read(line), 0xFF);
        }
    }

    #[test]
    fn press_and_release() {
        let mut kbd = KeyboardMatrix::new();
        kbd.key_event(8, 0x20, true); // A
        kbd.key_event(8, 0x80, true); // Z
        assert_eq!(kbd.read(8), 0x5F);
        kbd.key_event(8, 0x20, false);
        assert_eq!(kbd.read(8), 0x7F);
        kbd.release_all();
        assert_eq!(kbd.read(8), 0xFF);
    }

    #[test]
    fn out_of_range_line_is_ignored() {
        let mut kbd = KeyboardMatrix::new();
        kbd.key_event(12, 0xFF, true);
        assert_eq!(kbd.read(12), 0xFF);
    }
}
