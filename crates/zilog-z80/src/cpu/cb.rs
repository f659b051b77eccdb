//! CB-prefixed rotates, shifts and bit operations, plain and indexed.

use emu_core::Bus;

use crate::alu;
use crate::cycles::{DecodeContext, cycles};

use super::{Index, Z80};

impl Z80 {
    /// `CB xx`
    pub(super) fn execute_cb<B: Bus>(&mut self, bus: &mut B) -> u32 {
        let op = self.fetch_opcode(bus);
        self.last_context = DecodeContext::Cb;
        let reg = op & 7;
        let bit = (op >> 3) & 7;
        let hl = self.regs.hl();

        let value = if reg == 6 {
            bus.read(hl)
        } else {
            self.reg8(reg, Index::Hl)
        };

        let result = match op >> 6 {
            0 => {
                let r = alu::rotate_shift(bit, value, self.regs.f);
                self.regs.f = r.flags;
                Some(r.value)
            }
            1 => {
                let xy = if reg == 6 { (self.regs.wz >> 8) as u8 } else { value };
                self.bit_flags(bit, value, xy);
                None
            }
            2 => Some(value & !(1 << bit)),
            _ => Some(value | (1 << bit)),
        };

        if let Some(result) = result {
            if reg == 6 {
                bus.write(hl, result);
            } else {
                self.set_reg8(reg, result, Index::Hl);
            }
        }

        cycles(DecodeContext::Cb, op)
    }

    /// `DD CB d xx` / `FD CB d xx`. The displacement comes before the
    /// opcode, and neither byte is an M1 fetch. Non-`BIT` forms also copy
    /// the result into the register named by the low three bits.
    pub(super) fn execute_indexed_cb<B: Bus>(&mut self, bus: &mut B, index: Index) -> u32 {
        let addr = self.operand_address(bus, index);
        let op = self.fetch_byte(bus);
        let context = if index == Index::Ix {
            DecodeContext::DdCb
        } else {
            DecodeContext::FdCb
        };
        self.last_context = context;

        let reg = op & 7;
        let bit = (op >> 3) & 7;
        let value = bus.read(addr);

        let result = match op >> 6 {
            0 => {
                let r = alu::rotate_shift(bit, value, self.regs.f);
                self.regs.f = r.flags;
                r.value
            }
            1 => {
                self.bit_flags(bit, value, (addr >> 8) as u8);
                return cycles(context, op);
            }
            2 => value & !(1 << bit),
            _ => value | (1 << bit),
        };

        bus.write(addr, result);
        if reg != 6 {
            self.set_reg8(reg, result, Index::Hl);
        }
        cycles(context, op)
    }
}
