//! ED-prefixed instructions: 16-bit arithmetic, I/O, interrupt control and
//! the block transfer/search/I/O group.

use emu_core::Bus;
use log::warn;

use crate::alu;
use crate::cycles::{DecodeContext, cycles};
use crate::flags::{CF, HF, NF, PF, SF, SZ53, SZ53P, XF, YF, ZF};

use super::{Index, Z80};

/// Direction of a block instruction.
#[derive(Clone, Copy)]
enum Step {
    Increment,
    Decrement,
}

impl Step {
    fn from_opcode(op: u8) -> Self {
        if op & 0x08 == 0 {
            Step::Increment
        } else {
            Step::Decrement
        }
    }

    fn apply(self, value: u16) -> u16 {
        match self {
            Step::Increment => value.wrapping_add(1),
            Step::Decrement => value.wrapping_sub(1),
        }
    }
}

impl Z80 {
    /// `ED xx`. Holes in the table run as an 8 T-state no-op.
    pub(super) fn execute_ed<B: Bus>(&mut self, bus: &mut B) -> u32 {
        let op = self.fetch_opcode(bus);
        self.last_context = DecodeContext::Ed;
        let extra = match op {
            // IN r,(C); ED 70 only sets flags
            0x40 | 0x48 | 0x50 | 0x58 | 0x60 | 0x68 | 0x70 | 0x78 => {
                let bc = self.regs.bc();
                let value = bus.io_read(bc);
                self.regs.wz = bc.wrapping_add(1);
                self.set_reg8(op >> 3, value, Index::Hl);
                self.regs.f = (self.regs.f & CF) | SZ53P[value as usize];
                0
            }

            // OUT (C),r; ED 71 outputs zero
            0x41 | 0x49 | 0x51 | 0x59 | 0x61 | 0x69 | 0x71 | 0x79 => {
                let bc = self.regs.bc();
                let reg = (op >> 3) & 7;
                let value = if reg == 6 { 0 } else { self.reg8(reg, Index::Hl) };
                bus.io_write(bc, value);
                self.regs.wz = bc.wrapping_add(1);
                0
            }

            // SBC HL,rr
            0x42 | 0x52 | 0x62 | 0x72 => {
                let hl = self.regs.hl();
                let rr = self.reg16(op >> 4, Index::Hl);
                let (value, flags) = alu::sbc16(hl, rr, self.regs.f & CF != 0);
                self.regs.wz = hl.wrapping_add(1);
                self.regs.set_hl(value);
                self.regs.f = flags;
                0
            }

            // ADC HL,rr
            0x4A | 0x5A | 0x6A | 0x7A => {
                let hl = self.regs.hl();
                let rr = self.reg16(op >> 4, Index::Hl);
                let (value, flags) = alu::adc16(hl, rr, self.regs.f & CF != 0);
                self.regs.wz = hl.wrapping_add(1);
                self.regs.set_hl(value);
                self.regs.f = flags;
                0
            }

            // LD (nn),rr
            0x43 | 0x53 | 0x63 | 0x73 => {
                let addr = self.fetch_word(bus);
                let value = self.reg16(op >> 4, Index::Hl);
                self.write_word(bus, addr, value);
                self.regs.wz = addr.wrapping_add(1);
                0
            }

            // LD rr,(nn)
            0x4B | 0x5B | 0x6B | 0x7B => {
                let addr = self.fetch_word(bus);
                let value = self.read_word(bus, addr);
                self.set_reg16(op >> 4, value, Index::Hl);
                self.regs.wz = addr.wrapping_add(1);
                0
            }

            // NEG
            0x44 | 0x4C | 0x54 | 0x5C | 0x64 | 0x6C | 0x74 | 0x7C => {
                let r = alu::sub8(0, self.regs.a, false);
                self.regs.a = r.value;
                self.regs.f = r.flags;
                0
            }

            // RETN / RETI
            0x45 | 0x4D | 0x55 | 0x5D | 0x65 | 0x6D | 0x75 | 0x7D => {
                self.regs.iff1 = self.regs.iff2;
                self.regs.pc = self.pop(bus);
                self.regs.wz = self.regs.pc;
                0
            }

            // IM 0 / IM 1 / IM 2
            0x46 | 0x4E | 0x66 | 0x6E => {
                self.regs.im = 0;
                0
            }
            0x56 | 0x76 => {
                self.regs.im = 1;
                0
            }
            0x5E | 0x7E => {
                self.regs.im = 2;
                0
            }

            // LD I,A
            0x47 => {
                self.regs.i = self.regs.a;
                0
            }

            // LD R,A
            0x4F => {
                self.regs.r = self.regs.a;
                0
            }

            // LD A,I / LD A,R: P/V reflects IFF2
            0x57 | 0x5F => {
                self.regs.a = if op == 0x57 { self.regs.i } else { self.regs.r };
                let iff2 = if self.regs.iff2 { PF } else { 0 };
                self.regs.f = (self.regs.f & CF) | SZ53[self.regs.a as usize] | iff2;
                0
            }

            // RRD
            0x67 => {
                let hl = self.regs.hl();
                let value = bus.read(hl);
                bus.write(hl, (self.regs.a << 4) | (value >> 4));
                self.regs.a = (self.regs.a & 0xF0) | (value & 0x0F);
                self.regs.f = (self.regs.f & CF) | SZ53P[self.regs.a as usize];
                self.regs.wz = hl.wrapping_add(1);
                0
            }

            // RLD
            0x6F => {
                let hl = self.regs.hl();
                let value = bus.read(hl);
                bus.write(hl, (value << 4) | (self.regs.a & 0x0F));
                self.regs.a = (self.regs.a & 0xF0) | (value >> 4);
                self.regs.f = (self.regs.f & CF) | SZ53P[self.regs.a as usize];
                self.regs.wz = hl.wrapping_add(1);
                0
            }

            // LDI / LDD / LDIR / LDDR
            0xA0 | 0xA8 | 0xB0 | 0xB8 => self.block_load(bus, op),

            // CPI / CPD / CPIR / CPDR
            0xA1 | 0xA9 | 0xB1 | 0xB9 => self.block_compare(bus, op),

            // INI / IND / INIR / INDR
            0xA2 | 0xAA | 0xB2 | 0xBA => self.block_in(bus, op),

            // OUTI / OUTD / OTIR / OTDR
            0xA3 | 0xAB | 0xB3 | 0xBB => self.block_out(bus, op),

            _ => {
                warn!(
                    "undefined opcode ED {op:02X} at {:04X}, treated as NOP",
                    self.regs.pc.wrapping_sub(2)
                );
                0
            }
        };
        cycles(DecodeContext::Ed, op) + extra
    }

    /// Rewind PC onto the ED prefix so the instruction runs again.
    fn repeat_block(&mut self) -> u32 {
        self.regs.pc = self.regs.pc.wrapping_sub(2);
        self.regs.wz = self.regs.pc.wrapping_add(1);
        5
    }

    fn block_load<B: Bus>(&mut self, bus: &mut B, op: u8) -> u32 {
        let step = Step::from_opcode(op);
        let value = bus.read(self.regs.hl());
        bus.write(self.regs.de(), value);
        self.regs.set_hl(step.apply(self.regs.hl()));
        self.regs.set_de(step.apply(self.regs.de()));
        let bc = self.regs.bc().wrapping_sub(1);
        self.regs.set_bc(bc);

        let n = value.wrapping_add(self.regs.a);
        let mut f = (self.regs.f & (SF | ZF | CF)) | (n & XF) | ((n << 4) & YF);
        if bc != 0 {
            f |= PF;
        }
        self.regs.f = f;

        if op & 0x10 != 0 && bc != 0 {
            return self.repeat_block();
        }
        0
    }

    fn block_compare<B: Bus>(&mut self, bus: &mut B, op: u8) -> u32 {
        let step = Step::from_opcode(op);
        let value = bus.read(self.regs.hl());
        let result = self.regs.a.wrapping_sub(value);
        self.regs.set_hl(step.apply(self.regs.hl()));
        let bc = self.regs.bc().wrapping_sub(1);
        self.regs.set_bc(bc);
        self.regs.wz = step.apply(self.regs.wz);

        let half = (self.regs.a ^ value ^ result) & HF;
        let n = result.wrapping_sub(u8::from(half != 0));
        let mut f = (self.regs.f & CF)
            | NF
            | half
            | (SZ53[result as usize] & (SF | ZF))
            | (n & XF)
            | ((n << 4) & YF);
        if bc != 0 {
            f |= PF;
        }
        self.regs.f = f;

        if op & 0x10 != 0 && bc != 0 && result != 0 {
            return self.repeat_block();
        }
        0
    }

    fn block_in<B: Bus>(&mut self, bus: &mut B, op: u8) -> u32 {
        let step = Step::from_opcode(op);
        let bc = self.regs.bc();
        let value = bus.io_read(bc);
        self.regs.wz = step.apply(bc);
        bus.write(self.regs.hl(), value);
        self.regs.b = self.regs.b.wrapping_sub(1);
        self.regs.set_hl(step.apply(self.regs.hl()));

        let adjusted_c = step.apply(u16::from(self.regs.c)) as u8;
        self.block_io_flags(value, adjusted_c);

        if op & 0x10 != 0 && self.regs.b != 0 {
            self.regs.pc = self.regs.pc.wrapping_sub(2);
            return 5;
        }
        0
    }

    fn block_out<B: Bus>(&mut self, bus: &mut B, op: u8) -> u32 {
        let step = Step::from_opcode(op);
        let value = bus.read(self.regs.hl());
        self.regs.b = self.regs.b.wrapping_sub(1);
        let bc = self.regs.bc();
        self.regs.wz = step.apply(bc);
        bus.io_write(bc, value);
        self.regs.set_hl(step.apply(self.regs.hl()));

        self.block_io_flags(value, self.regs.l);

        if op & 0x10 != 0 && self.regs.b != 0 {
            self.regs.pc = self.regs.pc.wrapping_sub(2);
            return 5;
        }
        0
    }

    /// Undocumented flag effects of INI/OUTI and friends.
    /// `k = value + addend`; H and C on overflow of k, P/V is the parity of
    /// `(k & 7) ^ B`, N mirrors bit 7 of the transferred byte.
    fn block_io_flags(&mut self, value: u8, addend: u8) {
        let k = u16::from(value) + u16::from(addend);
        let b = self.regs.b;
        let mut f = SZ53[b as usize];
        if value & 0x80 != 0 {
            f |= NF;
        }
        if k > 0xFF {
            f |= HF | CF;
        }
        f |= SZ53P[((k & 7) as u8 ^ b) as usize] & PF;
        self.regs.f = f;
    }
}
