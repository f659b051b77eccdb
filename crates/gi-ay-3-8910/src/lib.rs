//! General Instrument AY-3-8910 Programmable Sound Generator register file.
//!
//! Models the chip as the CPU sees it: sixteen masked registers, the
//! BDIR/BC1 bus handshake and the two general-purpose I/O ports. Tone,
//! noise and envelope state is exposed as decoded register values; no
//! waveform is synthesised.
//!
//! # Register map
//!
//! | Reg | Name      | Bits |
//! |-----|-----------|------|
//! | R0  | A fine    | 7-0  |
//! | R1  | A coarse  | 3-0  |
//! | R2  | B fine    | 7-0  |
//! | R3  | B coarse  | 3-0  |
//! | R4  | C fine    | 7-0  |
//! | R5  | C coarse  | 3-0  |
//! | R6  | Noise     | 4-0  |
//! | R7  | Mixer     | 7-0  |
//! | R8  | A volume  | 4-0  |
//! | R9  | B volume  | 4-0  |
//! | R10 | C volume  | 4-0  |
//! | R11 | Env fine  | 7-0  |
//! | R12 | Env coarse| 7-0  |
//! | R13 | Env shape | 3-0  |
//! | R14 | Port A    | 7-0  |
//! | R15 | Port B    | 7-0  |

/// Bits each register keeps on write.
const REGISTER_MASK: [u8; 16] = [
    0xFF, 0x0F, 0xFF, 0x0F, 0xFF, 0x0F, 0x1F, 0xFF, 0x1F, 0x1F, 0x1F, 0xFF, 0xFF, 0x0F, 0xFF,
    0xFF,
];

/// Mixer bit: port A is an output when set.
const MIXER_PORT_A_OUT: u8 = 0x40;
/// Mixer bit: port B is an output when set.
const MIXER_PORT_B_OUT: u8 = 0x80;

/// Bus function selected by the BDIR and BC1 pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusFunction {
    Inactive,
    /// Drive the selected register onto the data bus.
    Read,
    /// Latch the data bus into the selected register.
    Write,
    /// Latch the data bus into the register address.
    Address,
}

impl BusFunction {
    /// Decode the two control pins.
    #[must_use]
    pub fn from_pins(bdir: bool, bc1: bool) -> Self {
        match (bdir, bc1) {
            (false, false) => BusFunction::Inactive,
            (false, true) => BusFunction::Read,
            (true, false) => BusFunction::Write,
            (true, true) => BusFunction::Address,
        }
    }
}

/// AY-3-8910 Programmable Sound Generator.
#[derive(Debug, Clone)]
pub struct Ay3_8910 {
    regs: [u8; 16],
    selected_reg: u8,
    /// Levels presented on I/O port A by external hardware.
    pub port_a_input: u8,
    /// Levels presented on I/O port B by external hardware.
    pub port_b_input: u8,
}

impl Ay3_8910 {
    #[must_use]
    pub fn new() -> Self {
        Self {
            regs: [0; 16],
            selected_reg: 0,
            port_a_input: 0xFF,
            port_b_input: 0xFF,
        }
    }

    /// Clear every register. External port levels are left alone.
    pub fn reset(&mut self) {
        self.regs = [0; 16];
        self.selected_reg = 0;
    }

    /// Select a register by index (0-15).
    pub fn select_register(&mut self, reg: u8) {
        self.selected_reg = reg & 0x0F;
    }

    #[must_use]
    pub fn selected_register(&self) -> u8 {
        self.selected_reg
    }

    /// Write a value to the currently selected register.
    pub fn write_data(&mut self, value: u8) {
        let reg = self.selected_reg as usize;
        self.regs[reg] = value & REGISTER_MASK[reg];
    }

    /// Read the currently selected register.
    ///
    /// R14 and R15 return the external port levels while the mixer has
    /// the port configured as an input, and the output latch otherwise.
    #[must_use]
    pub fn read_data(&self) -> u8 {
        let mixer = self.regs[7];
        match self.selected_reg {
            14 if mixer & MIXER_PORT_A_OUT == 0 => self.port_a_input,
            15 if mixer & MIXER_PORT_B_OUT == 0 => self.port_b_input,
            reg => self.regs[reg as usize],
        }
    }

    /// Run one bus cycle. Returns the value driven onto the data bus for a
    /// read, `None` otherwise.
    pub fn bus_cycle(&mut self, function: BusFunction, data: u8) -> Option<u8> {
        match function {
            BusFunction::Inactive => None,
            BusFunction::Read => Some(self.read_data()),
            BusFunction::Write => {
                self.write_data(data);
                None
            }
            BusFunction::Address => {
                self.select_register(data);
                None
            }
        }
    }

    /// Raw register value (output latch for the port registers).
    #[must_use]
    pub fn register(&self, reg: usize) -> u8 {
        self.regs[reg & 0x0F]
    }

    /// Load a register directly (snapshot restore). The width mask applies.
    pub fn set_register(&mut self, reg: usize, value: u8) {
        let reg = reg & 0x0F;
        self.regs[reg] = value & REGISTER_MASK[reg];
    }

    #[must_use]
    pub fn registers(&self) -> [u8; 16] {
        self.regs
    }

    /// 12-bit tone period for channel 0-2.
    #[must_use]
    pub fn tone_period(&self, channel: usize) -> u16 {
        let base = (channel % 3) * 2;
        u16::from(self.regs[base]) | (u16::from(self.regs[base + 1]) << 8)
    }

    /// 5-bit noise period.
    #[must_use]
    pub fn noise_period(&self) -> u8 {
        self.regs[6]
    }

    /// 16-bit envelope period.
    #[must_use]
    pub fn envelope_period(&self) -> u16 {
        u16::from_le_bytes([self.regs[11], self.regs[12]])
    }

    #[must_use]
    pub fn envelope_shape(&self) -> u8 {
        self.regs[13]
    }

    /// Tone enabled for a channel (mixer bits are active low).
    #[must_use]
    pub fn tone_enabled(&self, channel: usize) -> bool {
        self.regs[7] & (1 << (channel % 3)) == 0
    }

    /// Noise enabled for a channel (mixer bits are active low).
    #[must_use]
    pub fn noise_enabled(&self, channel: usize) -> bool {
        self.regs[7] & (8 << (channel % 3)) == 0
    }

    /// Fixed amplitude (0-15) for a channel, or `None` when it follows the
    /// envelope.
    #[must_use]
    pub fn amplitude(&self, channel: usize) -> Option<u8> {
        let level = self.regs[8 + channel % 3];
        if level & 0x10 != 0 { None } else { Some(level) }
    }
}

impl Default for Ay3_8910 {
    fn default() -> Self {
        Self::new()
    }
}
