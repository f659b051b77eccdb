//! Motorola 6845 CRT Controller (CRTC).
//!
//! The CRTC generates display addresses and sync timing from 18 internal
//! registers. The host selects a register through the address register and
//! then reads or writes it through the data port. This crate models the
//! register file and the address arithmetic the raster needs; beam timing
//! is driven by the host machine.
//!
//! # Registers
//!
//! | Reg | Name | Width | Description                            |
//! |-----|------|-------|----------------------------------------|
//! | R0  | HT   | 8     | Horizontal total (characters - 1)      |
//! | R1  | HD   | 8     | Horizontal displayed                   |
//! | R2  | HSP  | 8     | Horizontal sync position               |
//! | R3  | SW   | 8     | Sync widths (VSYNC hi, HSYNC lo)       |
//! | R4  | VT   | 7     | Vertical total (rows - 1)              |
//! | R5  | VTA  | 5     | Vertical total adjust (scanlines)      |
//! | R6  | VD   | 7     | Vertical displayed                     |
//! | R7  | VSP  | 7     | Vertical sync position                 |
//! | R8  | IM   | 8     | Interlace mode and skew                |
//! | R9  | MR   | 5     | Maximum raster address                 |
//! | R10 | CS   | 7     | Cursor start raster                    |
//! | R11 | CE   | 5     | Cursor end raster                      |
//! | R12 | SAH  | 6     | Start address high                     |
//! | R13 | SAL  | 8     | Start address low                      |
//! | R14 | CAH  | 6     | Cursor address high                    |
//! | R15 | CAL  | 8     | Cursor address low                     |
//! | R16 | LPH  | 6     | Light pen high (read only)             |
//! | R17 | LPL  | 8     | Light pen low (read only)              |

#![allow(clippy::cast_possible_truncation)]

/// Number of addressable registers.
pub const REGISTER_COUNT: usize = 18;

/// Value of the "CRTC type" byte for the HD6845S/UM6845 (type 0).
pub const CRTC_TYPE: u8 = 0;

/// Writable bits per register.
const WRITE_MASK: [u8; REGISTER_COUNT] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0x7F, 0x1F, 0x7F, 0x7F, 0xF3, 0x1F, 0x7F, 0x1F, 0x3F, 0xFF, 0x3F,
    0xFF, 0x3F, 0xFF,
];

/// Register values the CPC firmware programs at power-on.
const CPC_DEFAULTS: [u8; REGISTER_COUNT] = [
    63, 40, 46, 0x8E, 38, 0, 25, 30, 0, 7, 0, 0, 0x30, 0, 0, 0, 0, 0,
];

/// Motorola 6845 CRT Controller.
#[derive(Debug, Clone)]
pub struct Crtc6845 {
    /// Currently selected register (0-31; 18-31 address nothing).
    selected: u8,
    regs: [u8; REGISTER_COUNT],
}

impl Crtc6845 {
    /// Create a CRTC loaded with the CPC power-on register values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            selected: 0,
            regs: CPC_DEFAULTS,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Write the address register.
    pub fn select(&mut self, reg: u8) {
        self.selected = reg & 0x1F;
    }

    /// Currently selected register number.
    #[must_use]
    pub fn selected(&self) -> u8 {
        self.selected
    }

    /// Write the selected register. Light pen registers and unused
    /// addresses ignore writes.
    pub fn write(&mut self, value: u8) {
        let reg = self.selected as usize;
        if reg < 16 {
            self.regs[reg] = value & WRITE_MASK[reg];
        }
    }

    /// Read the selected register.
    ///
    /// On the type 0 part only the cursor and light pen registers read
    /// back; everything else, including the start address, returns 0.
    #[must_use]
    pub fn read(&self) -> u8 {
        match self.selected {
            14..=17 => self.regs[self.selected as usize],
            _ => 0,
        }
    }

    /// Status port. The type 0 CRTC has none and the bus floats low.
    #[must_use]
    pub fn status(&self) -> u8 {
        0
    }

    /// Raw register value regardless of readability.
    #[must_use]
    pub fn register(&self, reg: usize) -> u8 {
        self.regs.get(reg).copied().unwrap_or(0)
    }

    /// Load a register directly (snapshot restore). The width mask still
    /// applies.
    pub fn set_register(&mut self, reg: usize, value: u8) {
        if let Some(slot) = self.regs.get_mut(reg) {
            *slot = value & WRITE_MASK[reg];
        }
    }

    /// All 18 registers, for snapshots and debuggers.
    #[must_use]
    pub fn registers(&self) -> [u8; REGISTER_COUNT] {
        self.regs
    }

    /// Characters displayed per row (R1).
    #[must_use]
    pub fn horizontal_displayed(&self) -> u8 {
        self.regs[1]
    }

    /// Character rows displayed (R6).
    #[must_use]
    pub fn vertical_displayed(&self) -> u8 {
        self.regs[6]
    }

    /// Scanlines per character row (R9 + 1).
    #[must_use]
    pub fn scanlines_per_row(&self) -> u8 {
        self.regs[9] + 1
    }

    /// 14-bit display start address from R12/R13.
    #[must_use]
    pub fn start_address(&self) -> u16 {
        (u16::from(self.regs[12]) << 8) | u16::from(self.regs[13])
    }

    /// Memory address of character `col` on character row `row`.
    #[must_use]
    pub fn character_address(&self, row: u16, col: u16) -> u16 {
        self.start_address()
            .wrapping_add(row.wrapping_mul(u16::from(self.regs[1])))
            .wrapping_add(col)
            & 0x3FFF
    }
}

impl Default for Crtc6845 {
    fn default() -> Self {
        Self::new()
    }
}

/// Byte address in the CPC's 64K video RAM for memory address `ma` and
/// raster line `ra`. Each character is two bytes wide.
///
/// MA13-12 select the 16K page, RA2-0 the 2K block within it, and MA9-0
/// the word within the block.
#[must_use]
pub fn cpc_video_address(ma: u16, ra: u8) -> u16 {
    ((ma & 0x3000) << 2) | ((u16::from(ra) & 7) << 11) | ((ma & 0x03FF) << 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn powers_on_with_cpc_defaults() {
        let crtc = Crtc6845::new();
        assert_eq!(crtc.register(0), 63);
        assert_eq!(crtc.horizontal_displayed(), 40);
        assert_eq!(crtc.register(3), 0x8E);
        assert_eq!(crtc.vertical_displayed(), 25);
        assert_eq!(crtc.scanlines_per_row(), 8);
        assert_eq!(crtc.start_address(), 0x3000);
    }

    #[test]
    fn writes_are_masked_to_register_width() {
        let mut crtc = Crtc6845::new();
        crtc.select(9);
        crtc.write(0xFF);
        assert_eq!(crtc.register(9), 0x1F);

        crtc.select(12);
        crtc.write(0xFF);
        assert_eq!(crtc.register(12), 0x3F);
    }

    #[test]
    fn light_pen_registers_ignore_writes() {
        let mut crtc = Crtc6845::new();
        crtc.select(16);
        crtc.write(0x12);
        assert_eq!(crtc.register(16), 0);
    }

    #[test]
    fn out_of_range_select_is_harmless() {
        let mut crtc = Crtc6845::new();
        crtc.select(0x1F);
        crtc.write(0x55);
        assert_eq!(crtc.read(), 0);
        assert_eq!(crtc.registers(), Crtc6845::new().registers());
    }

    #[test]
    fn only_cursor_and_light_pen_read_back() {
        let mut crtc = Crtc6845::new();
        crtc.select(14);
        crtc.write(0x2A);
        assert_eq!(crtc.read(), 0x2A);

        crtc.select(12);
        crtc.write(0x10);
        assert_eq!(crtc.read(), 0);
        assert_eq!(crtc.register(12), 0x10);

        crtc.select(1);
        assert_eq!(crtc.read(), 0);
    }

    #[test]
    fn character_address_wraps_at_14_bits() {
        let mut crtc = Crtc6845::new();
        crtc.set_register(12, 0x3F);
        crtc.set_register(13, 0xFF);
        assert_eq!(crtc.character_address(0, 1), 0x0000);
        assert_eq!(crtc.character_address(1, 0), (0x3FFF + 40) & 0x3FFF);
    }

    #[test]
    fn video_address_layout() {
        // Default screen at &C000: MA=&3000
        assert_eq!(cpc_video_address(0x3000, 0), 0xC000);
        assert_eq!(cpc_video_address(0x3000, 1), 0xC800);
        assert_eq!(cpc_video_address(0x3001, 0), 0xC002);
        assert_eq!(cpc_video_address(0x3028, 7), 0xC000 | (7 << 11) | 0x50);
        // Raster bits above 2 are ignored
        assert_eq!(cpc_video_address(0x0000, 8), 0x0000);
    }

    #[test]
    fn reset_restores_defaults() {
        let mut crtc = Crtc6845::new();
        crtc.select(1);
        crtc.write(32);
        crtc.reset();
        assert_eq!(crtc.horizontal_displayed(), 40);
        assert_eq!(crtc.selected(), 0);
    }
}
