//! Z80 register set.

/// Z80 programmer-visible registers plus the internal state that affects
/// instruction results (WZ, interrupt flip-flops, halt).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Registers {
    pub a: u8,
    pub f: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,

    pub a_alt: u8,
    pub f_alt: u8,
    pub b_alt: u8,
    pub c_alt: u8,
    pub d_alt: u8,
    pub e_alt: u8,
    pub h_alt: u8,
    pub l_alt: u8,

    pub ix: u16,
    pub iy: u16,
    pub sp: u16,
    pub pc: u16,
    pub i: u8,
    /// Refresh counter. Bits 0-6 count M1 cycles; bit 7 only changes via
    /// `LD R,A`.
    pub r: u8,

    /// MEMPTR. Leaks into the X/Y flags of `BIT n,(HL)`.
    pub wz: u16,

    pub iff1: bool,
    pub iff2: bool,
    /// Interrupt mode 0, 1 or 2.
    pub im: u8,
    pub halted: bool,
}

impl Registers {
    #[must_use]
    pub const fn af(&self) -> u16 {
        (self.a as u16) << 8 | self.f as u16
    }

    #[must_use]
    pub const fn bc(&self) -> u16 {
        (self.b as u16) << 8 | self.c as u16
    }

    #[must_use]
    pub const fn de(&self) -> u16 {
        (self.d as u16) << 8 | self.e as u16
    }

    #[must_use]
    pub const fn hl(&self) -> u16 {
        (self.h as u16) << 8 | self.l as u16
    }

    pub fn set_af(&mut self, value: u16) {
        [self.a, self.f] = value.to_be_bytes();
    }

    pub fn set_bc(&mut self, value: u16) {
        [self.b, self.c] = value.to_be_bytes();
    }

    pub fn set_de(&mut self, value: u16) {
        [self.d, self.e] = value.to_be_bytes();
    }

    pub fn set_hl(&mut self, value: u16) {
        [self.h, self.l] = value.to_be_bytes();
    }

    /// `EX AF,AF'`
    pub fn exchange_af(&mut self) {
        std::mem::swap(&mut self.a, &mut self.a_alt);
        std::mem::swap(&mut self.f, &mut self.f_alt);
    }

    /// `EXX`
    pub fn exchange_main(&mut self) {
        std::mem::swap(&mut self.b, &mut self.b_alt);
        std::mem::swap(&mut self.c, &mut self.c_alt);
        std::mem::swap(&mut self.d, &mut self.d_alt);
        std::mem::swap(&mut self.e, &mut self.e_alt);
        std::mem::swap(&mut self.h, &mut self.h_alt);
        std::mem::swap(&mut self.l, &mut self.l_alt);
    }

    /// Bump the low seven bits of R, leaving bit 7 alone.
    pub fn increment_r(&mut self) {
        self.r = (self.r & 0x80) | (self.r.wrapping_add(1) & 0x7F);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_round_trip() {
        let mut regs = Registers::default();
        regs.set_bc(0x1234);
        regs.set_hl(0xBEEF);
        assert_eq!((regs.b, regs.c), (0x12, 0x34));
        assert_eq!(regs.hl(), 0xBEEF);
    }

    #[test]
    fn r_wraps_within_low_seven_bits() {
        let mut regs = Registers { r: 0xFF, ..Registers::default() };
        regs.increment_r();
        assert_eq!(regs.r, 0x80);
        regs.r = 0x7F;
        regs.increment_r();
        assert_eq!(regs.r, 0x00);
    }

    #[test]
    fn exx_leaves_af_alone() {
        let mut regs = Registers { a: 1, b: 2, b_alt: 3, ..Registers::default() };
        regs.exchange_main();
        assert_eq!((regs.a, regs.b, regs.b_alt), (1, 3, 2));
    }
}
