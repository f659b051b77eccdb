//! Intel 8255 Programmable Peripheral Interface (PPI).
//!
//! Three 8-bit ports and a control register. A control write with bit 7
//! set selects the port directions; with bit 7 clear it sets or resets a
//! single port C bit. Only mode 0 (simple I/O) is modelled; the strobed
//! modes behave as mode 0.
//!
//! # Control word (bit 7 = 1)
//!
//! | Bit | Meaning                          |
//! |-----|----------------------------------|
//! | 6-5 | Group A mode                     |
//! | 4   | Port A input                     |
//! | 3   | Port C upper input               |
//! | 2   | Group B mode                     |
//! | 1   | Port B input                     |
//! | 0   | Port C lower input               |

const PORT_A_INPUT: u8 = 0x10;
const PORT_C_UPPER_INPUT: u8 = 0x08;
const PORT_B_INPUT: u8 = 0x02;
const PORT_C_LOWER_INPUT: u8 = 0x01;

/// Control word after reset: mode 0, every port an input.
const RESET_CONTROL: u8 = 0x9B;

/// Intel 8255 Programmable Peripheral Interface.
#[derive(Debug, Clone)]
pub struct Ppi8255 {
    port_a: u8,
    port_b: u8,
    port_c: u8,
    control: u8,
    /// Levels driven onto port A by external hardware.
    pub external_a: u8,
    /// Levels driven onto port B by external hardware.
    pub external_b: u8,
    /// Levels driven onto port C by external hardware.
    pub external_c: u8,
}

impl Ppi8255 {
    #[must_use]
    pub fn new() -> Self {
        Self {
            port_a: 0,
            port_b: 0,
            port_c: 0,
            control: RESET_CONTROL,
            external_a: 0xFF,
            external_b: 0xFF,
            external_c: 0xFF,
        }
    }

    /// Return to the power-on state. External levels are left alone.
    pub fn reset(&mut self) {
        self.port_a = 0;
        self.port_b = 0;
        self.port_c = 0;
        self.control = RESET_CONTROL;
    }

    /// Read a port (0 = A, 1 = B, 2 = C, 3 = control).
    ///
    /// Input ports return the external levels, output ports their latch.
    /// The control register is write-only and reads as 0xFF.
    #[must_use]
    pub fn read(&self, port: u8) -> u8 {
        match port & 3 {
            0 => {
                if self.port_a_is_input() {
                    self.external_a
                } else {
                    self.port_a
                }
            }
            1 => {
                if self.port_b_is_input() {
                    self.external_b
                } else {
                    self.port_b
                }
            }
            2 => {
                let input_mask = self.port_c_input_mask();
                (self.external_c & input_mask) | (self.port_c & !input_mask)
            }
            _ => 0xFF,
        }
    }

    /// Write a port (0 = A, 1 = B, 2 = C, 3 = control). Writes to an input
    /// port update the latch, which appears when the port turns output.
    pub fn write(&mut self, port: u8, value: u8) {
        match port & 3 {
            0 => self.port_a = value,
            1 => self.port_b = value,
            2 => self.port_c = value,
            _ => self.write_control(value),
        }
    }

    fn write_control(&mut self, value: u8) {
        if value & 0x80 != 0 {
            // Mode set clears every output latch
            self.control = value;
            self.port_a = 0;
            self.port_b = 0;
            self.port_c = 0;
        } else {
            let bit = 1 << ((value >> 1) & 7);
            if value & 1 != 0 {
                self.port_c |= bit;
            } else {
                self.port_c &= !bit;
            }
        }
    }

    /// Restore the raw register state without the side effects of a
    /// control write.
    pub fn restore(&mut self, port_a: u8, port_b: u8, port_c: u8, control: u8) {
        self.port_a = port_a;
        self.port_b = port_b;
        self.port_c = port_c;
        self.control = control | 0x80;
    }

    #[must_use]
    pub fn port_a_is_input(&self) -> bool {
        self.control & PORT_A_INPUT != 0
    }

    #[must_use]
    pub fn port_b_is_input(&self) -> bool {
        self.control & PORT_B_INPUT != 0
    }

    fn port_c_input_mask(&self) -> u8 {
        let mut mask = 0;
        if self.control & PORT_C_UPPER_INPUT != 0 {
            mask |= 0xF0;
        }
        if self.control & PORT_C_LOWER_INPUT != 0 {
            mask |= 0x0F;
        }
        mask
    }

    /// Levels the PPI drives on port A. Input pins float high.
    #[must_use]
    pub fn port_a_output(&self) -> u8 {
        if self.port_a_is_input() { 0xFF } else { self.port_a }
    }

    /// Levels the PPI drives on port C. Input nibbles float high.
    #[must_use]
    pub fn port_c_output(&self) -> u8 {
        self.port_c | self.port_c_input_mask()
    }

    /// Port A output latch.
    #[must_use]
    pub fn port_a(&self) -> u8 {
        self.port_a
    }

    /// Port B output latch.
    #[must_use]
    pub fn port_b(&self) -> u8 {
        self.port_b
    }

    /// Port C output latch.
    #[must_use]
    pub fn port_c(&self) -> u8 {
        self.port_c
    }

    #[must_use]
    pub fn control(&self) -> u8 {
        self.control
    }
}

impl Default for Ppi8255 {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_makes_every_port_an_input() {
        let mut ppi = Ppi8255::new();
        ppi.external_a = 0x12;
        ppi.external_b = 0x34;
        ppi.external_c = 0x56;
        assert_eq!(ppi.read(0), 0x12);
        assert_eq!(ppi.read(1), 0x34);
        assert_eq!(ppi.read(2), 0x56);
        assert_eq!(ppi.read(3), 0xFF);
    }

    #[test]
    fn mode_set_clears_latches() {
        let mut ppi = Ppi8255::new();
        ppi.write(0, 0xAA);
        ppi.write(2, 0x55);
        // CPC setting: A out, B in, C out
        ppi.write(3, 0x82);
        assert_eq!(ppi.port_a(), 0);
        assert_eq!(ppi.port_c(), 0);
        assert!(!ppi.port_a_is_input());
        assert!(ppi.port_b_is_input());
    }

    #[test]
    fn outputs_read_back_latch() {
        let mut ppi = Ppi8255::new();
        ppi.write(3, 0x82);
        ppi.external_a = 0x00;
        ppi.external_b = 0x5E;
        ppi.write(0, 0xC3);
        ppi.write(2, 0x49);
        assert_eq!(ppi.read(0), 0xC3);
        assert_eq!(ppi.read(1), 0x5E);
        assert_eq!(ppi.read(2), 0x49);
        assert_eq!(ppi.port_c_output(), 0x49);
    }

    #[test]
    fn port_c_nibbles_have_independent_direction() {
        let mut ppi = Ppi8255::new();
        // C upper input, C lower output
        ppi.write(3, 0x88);
        ppi.external_c = 0xA5;
        ppi.write(2, 0x3C);
        assert_eq!(ppi.read(2), 0xAC);
        assert_eq!(ppi.port_c_output(), 0xFC);
    }

    #[test]
    fn bit_set_reset_touches_one_port_c_bit() {
        let mut ppi = Ppi8255::new();
        ppi.write(3, 0x82);
        ppi.write(3, 0x0F); // set bit 7
        assert_eq!(ppi.port_c(), 0x80);
        ppi.write(3, 0x09); // set bit 4
        assert_eq!(ppi.port_c(), 0x90);
        ppi.write(3, 0x0E); // reset bit 7
        assert_eq!(ppi.port_c(), 0x10);
        // Control itself is unchanged
        assert_eq!(ppi.control(), 0x82);
    }

    #[test]
    fn input_port_a_floats_high_on_output_side() {
        let mut ppi = Ppi8255::new();
        ppi.write(0, 0x12);
        assert_eq!(ppi.port_a_output(), 0xFF);
        ppi.write(3, 0x82);
        ppi.write(0, 0x12);
        assert_eq!(ppi.port_a_output(), 0x12);
    }

    #[test]
    fn restore_skips_latch_clear() {
        let mut ppi = Ppi8255::new();
        ppi.restore(0x01, 0x02, 0x03, 0x82);
        assert_eq!(ppi.port_a(), 0x01);
        assert_eq!(ppi.port_c(), 0x03);
        assert_eq!(ppi.control(), 0x82);
    }
}
