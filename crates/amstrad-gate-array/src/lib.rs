//! Amstrad CPC Gate Array.
//!
//! The Gate Array sits between the Z80, the RAM and the CRTC. It holds the
//! 17-entry ink palette, the screen mode, the ROM enables and (via the PAL
//! on 6128s) the RAM banking register, and it divides HSYNC to produce the
//! 300 Hz interrupt.
//!
//! # Write-only register (bits 7-6 select the function)
//!
//! | Bits 7-6 | Function    | Payload                                    |
//! |----------|-------------|--------------------------------------------|
//! | 00       | Select pen  | bit 4 = border, else bits 3-0 = pen        |
//! | 01       | Set ink     | bits 4-0 = hardware colour                 |
//! | 10       | ROM / mode  | bit 4 = reset INT counter, bit 3 = upper ROM off, bit 2 = lower ROM off, bits 1-0 = mode |
//! | 11       | RAM config  | bits 5-3 = 64K page, bits 2-0 = configuration |
//!
//! # Interrupts
//!
//! A 6-bit counter advances once per scanline. When it reaches 52 it wraps
//! to 0 and raises the interrupt line, six times per 312-line frame. A
//! second counter numbers those 52-line groups; group 0 carries VSYNC.
//! Accepting the interrupt clears the line and bit 5 of the counter, so a
//! late acknowledge pushes the next interrupt back.

#![allow(clippy::cast_possible_truncation)]

mod palette;

pub use palette::{FIRMWARE_TO_HARDWARE, HARDWARE_TO_FIRMWARE, Monitor, levels, rgb};

/// Scanlines between interrupts.
pub const LINES_PER_INTERRUPT: u8 = 52;
/// Interrupts per frame.
pub const INTERRUPTS_PER_FRAME: u8 = 6;
/// Pen index of the border.
pub const BORDER: usize = 16;

/// Which register a write landed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    Pen,
    Ink,
    RomConfig,
    RamConfig,
}

/// Amstrad CPC Gate Array.
#[derive(Debug, Clone)]
pub struct GateArray {
    pen: u8,
    /// Hardware colour numbers, pens 0-15 then the border.
    inks: [u8; 17],
    /// Last ROM/mode write, bits 3-0.
    rom_config: u8,
    /// Last RAM config write, bits 5-0.
    ram_config: u8,
    /// Scanline counter, 0-51.
    line_counter: u8,
    /// 52-line group within the frame, 0-5.
    group: u8,
    int_request: bool,
}

impl GateArray {
    #[must_use]
    pub fn new() -> Self {
        Self {
            pen: 0,
            inks: [0x14; 17],
            rom_config: 0,
            ram_config: 0,
            line_counter: 0,
            group: 0,
            int_request: false,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Handle a write to the Gate Array port.
    pub fn write(&mut self, value: u8) -> Register {
        match value >> 6 {
            0 => {
                self.pen = if value & 0x10 != 0 {
                    BORDER as u8
                } else {
                    value & 0x0F
                };
                Register::Pen
            }
            1 => {
                self.inks[usize::from(self.pen)] = value & 0x1F;
                Register::Ink
            }
            2 => {
                self.rom_config = value & 0x0F;
                if value & 0x10 != 0 {
                    self.line_counter = 0;
                    self.int_request = false;
                }
                Register::RomConfig
            }
            _ => {
                self.ram_config = value & 0x3F;
                Register::RamConfig
            }
        }
    }

    /// Advance one scanline. Returns `true` when this line raised the
    /// interrupt.
    pub fn scanline(&mut self) -> bool {
        self.line_counter += 1;
        if self.line_counter < LINES_PER_INTERRUPT {
            return false;
        }
        self.line_counter = 0;
        self.group = (self.group + 1) % INTERRUPTS_PER_FRAME;
        self.int_request = true;
        true
    }

    /// Interrupt acknowledge from the CPU.
    pub fn acknowledge(&mut self) {
        self.int_request = false;
        self.line_counter &= 0x1F;
    }

    #[must_use]
    pub fn int_request(&self) -> bool {
        self.int_request
    }

    /// VSYNC is high for the first group of each frame.
    #[must_use]
    pub fn vsync(&self) -> bool {
        self.group == 0
    }

    #[must_use]
    pub fn line_counter(&self) -> u8 {
        self.line_counter
    }

    #[must_use]
    pub fn group(&self) -> u8 {
        self.group
    }

    #[must_use]
    pub fn pen(&self) -> u8 {
        self.pen
    }

    #[must_use]
    pub fn ink(&self, pen: usize) -> u8 {
        self.inks[pen % 17]
    }

    #[must_use]
    pub fn inks(&self) -> &[u8; 17] {
        &self.inks
    }

    #[must_use]
    pub fn mode(&self) -> u8 {
        self.rom_config & 3
    }

    /// ROM/mode register bits 3-0.
    #[must_use]
    pub fn rom_config(&self) -> u8 {
        self.rom_config
    }

    #[must_use]
    pub fn lower_rom_enabled(&self) -> bool {
        self.rom_config & 0x04 == 0
    }

    #[must_use]
    pub fn upper_rom_enabled(&self) -> bool {
        self.rom_config & 0x08 == 0
    }

    /// RAM configuration register bits 5-0.
    #[must_use]
    pub fn ram_config(&self) -> u8 {
        self.ram_config
    }

    /// Load the registers from a snapshot. `rom_config` may include bit 4,
    /// which is ignored.
    pub fn restore(
        &mut self,
        pen: u8,
        inks: &[u8; 17],
        rom_config: u8,
        ram_config: u8,
        line_counter: u8,
        int_request: bool,
    ) {
        self.pen = if usize::from(pen) >= BORDER {
            BORDER as u8
        } else {
            pen
        };
        for (slot, &ink) in self.inks.iter_mut().zip(inks) {
            *slot = ink & 0x1F;
        }
        self.rom_config = rom_config & 0x0F;
        self.ram_config = ram_config & 0x3F;
        self.line_counter = line_counter % LINES_PER_INTERRUPT;
        self.int_request = int_request;
    }
}

impl Default for GateArray {
    fn default() -> Self {
        Self::new()
    }
}

/// Pens for the two pixels of a mode 0 byte.
pub static MODE0: [[u8; 2]; 256] = build_mode0();
/// Pens for the four pixels of a mode 1 byte.
pub static MODE1: [[u8; 4]; 256] = build_mode1();
/// Pens for the eight pixels of a mode 2 byte.
pub static MODE2: [[u8; 8]; 256] = build_mode2();

const fn bit(byte: usize, n: usize) -> u8 {
    ((byte >> n) & 1) as u8
}

const fn build_mode0() -> [[u8; 2]; 256] {
    let mut table = [[0; 2]; 256];
    let mut b = 0;
    while b < 256 {
        table[b][0] = bit(b, 7) | (bit(b, 3) << 1) | (bit(b, 5) << 2) | (bit(b, 1) << 3);
        table[b][1] = bit(b, 6) | (bit(b, 2) << 1) | (bit(b, 4) << 2) | (bit(b, 0) << 3);
        b += 1;
    }
    table
}

const fn build_mode1() -> [[u8; 4]; 256] {
    let mut table = [[0; 4]; 256];
    let mut b = 0;
    while b < 256 {
        let mut n = 0;
        while n < 4 {
            table[b][n] = bit(b, 7 - n) | (bit(b, 3 - n) << 1);
            n += 1;
        }
        b += 1;
    }
    table
}

const fn build_mode2() -> [[u8; 8]; 256] {
    let mut table = [[0; 8]; 256];
    let mut b = 0;
    while b < 256 {
        let mut n = 0;
        while n < 8 {
            table[b][n] = bit(b, 7 - n);
            n += 1;
        }
        b += 1;
    }
    table
}

/// Decode one screen byte into pens, returning how many were written.
///
/// Mode 3 is the undocumented 4-colour mode at mode 0 resolution.
pub fn decode_byte(mode: u8, byte: u8, out: &mut [u8; 8]) -> usize {
    let b = usize::from(byte);
    match mode & 3 {
        0 => {
            out[..2].copy_from_slice(&MODE0[b]);
            2
        }
        1 => {
            out[..4].copy_from_slice(&MODE1[b]);
            4
        }
        2 => {
            out.copy_from_slice(&MODE2[b]);
            8
        }
        _ => {
            out[0] = MODE0[b][0] & 3;
            out[1] = MODE0[b][1] & 3;
            2
        }
    }
}
