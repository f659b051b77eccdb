//! CPC hardware palette.
//!
//! The Gate Array drives each RGB gun at one of three levels, giving 27
//! distinct colours. Software selects them through 32 hardware colour
//! numbers; five of those duplicate another entry. The firmware numbers
//! the 27 colours as `9 * green + 3 * red + blue` with levels 0-2.

/// Monitor the machine is connected to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Monitor {
    /// CTM640/644 colour monitor.
    #[default]
    Colour,
    /// GT64/65 green screen.
    Green,
    /// Neutral grey rendering of the green screen's luminance.
    Grey,
}

/// Firmware colour number for each hardware colour number.
pub const HARDWARE_TO_FIRMWARE: [u8; 32] = [
    13, 13, 19, 25, 1, 7, 10, 16, 7, 25, 24, 26, 6, 8, 15, 17, //
    1, 19, 18, 20, 0, 2, 9, 11, 4, 22, 21, 23, 3, 5, 12, 14,
];

/// Hardware colour number for each firmware colour number.
pub const FIRMWARE_TO_HARDWARE: [u8; 27] = [
    0x14, 0x04, 0x15, 0x1C, 0x18, 0x1D, 0x0C, 0x05, 0x0D, 0x16, 0x06, 0x17, 0x1E, 0x00, 0x1F,
    0x0E, 0x07, 0x0F, 0x12, 0x02, 0x13, 0x1A, 0x19, 0x1B, 0x0A, 0x03, 0x0B,
];

/// Gun output for each level.
const LEVEL: [u8; 3] = [0x00, 0x80, 0xFF];

/// Gun levels (red, green, blue) of a firmware colour.
#[must_use]
pub const fn levels(firmware: u8) -> (u8, u8, u8) {
    let n = firmware % 27;
    (n / 3 % 3, n / 9, n % 3)
}

/// `0x00RRGGBB` for a hardware colour number on the given monitor.
#[must_use]
pub fn rgb(hardware: u8, monitor: Monitor) -> u32 {
    let (r, g, b) = levels(HARDWARE_TO_FIRMWARE[usize::from(hardware & 0x1F)]);
    let (r, g, b) = (LEVEL[r as usize], LEVEL[g as usize], LEVEL[b as usize]);
    match monitor {
        Monitor::Colour => (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b),
        Monitor::Green | Monitor::Grey => {
            // Luma weights in 1/256ths
            let luma =
                (u32::from(r) * 77 + u32::from(g) * 150 + u32::from(b) * 29) >> 8;
            if monitor == Monitor::Green {
                // Phosphor tint: full green, a little red and blue
                ((luma >> 2) << 16) | (luma << 8) | (luma >> 2)
            } else {
                (luma << 16) | (luma << 8) | luma
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_are_inverse() {
        for (fw, &hw) in FIRMWARE_TO_HARDWARE.iter().enumerate() {
            assert_eq!(HARDWARE_TO_FIRMWARE[usize::from(hw)] as usize, fw);
        }
    }

    #[test]
    fn twenty_seven_distinct_colours() {
        let mut seen: Vec<u32> = (0..32).map(|hw| rgb(hw, Monitor::Colour)).collect();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), 27);
    }

    #[test]
    fn known_colours() {
        // &54 black, &4B bright white, &4C bright red, &44 blue
        assert_eq!(rgb(0x54, Monitor::Colour), 0x00_0000);
        assert_eq!(rgb(0x4B, Monitor::Colour), 0xFF_FFFF);
        assert_eq!(rgb(0x4C, Monitor::Colour), 0xFF_0000);
        assert_eq!(rgb(0x44, Monitor::Colour), 0x00_0080);
    }

    #[test]
    fn monochrome_monitors_keep_brightness_order() {
        let white = rgb(0x4B, Monitor::Grey);
        let blue = rgb(0x44, Monitor::Grey);
        assert!(white & 0xFF > blue & 0xFF);
        assert_eq!(rgb(0x54, Monitor::Green), 0);
        let green = rgb(0x52, Monitor::Green);
        assert!((green >> 8) & 0xFF > (green >> 16) & 0xFF);
    }
}
