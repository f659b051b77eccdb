//! Unprefixed opcodes, shared with the DD and FD contexts.
//!
//! Under DD/FD, `index` redirects HL to IX/IY: `(HL)` becomes `(IX+d)`,
//! H and L become IXH/IXL except in the same instruction as an `(IX+d)`
//! operand, and `EX DE,HL` / `EXX` are unaffected.

use emu_core::Bus;

use crate::alu;
use crate::flags::{CF, DAA, HF, NF, PF, SF, XF, YF, ZF, daa_index};

use super::{Index, Z80};

impl Z80 {
    /// Execute one opcode from the base table. Returns T-states on top of
    /// the table cost (taken branches only).
    pub(super) fn execute_base<B: Bus>(&mut self, bus: &mut B, op: u8, index: Index) -> u32 {
        match op {
            // NOP
            0x00 => {}

            // LD rr,nn
            0x01 | 0x11 | 0x21 | 0x31 => {
                let value = self.fetch_word(bus);
                self.set_reg16(op >> 4, value, index);
            }

            // LD (BC),A / LD (DE),A
            0x02 | 0x12 => {
                let addr = if op == 0x02 { self.regs.bc() } else { self.regs.de() };
                bus.write(addr, self.regs.a);
                self.regs.wz = (u16::from(self.regs.a) << 8) | (addr.wrapping_add(1) & 0xFF);
            }

            // LD A,(BC) / LD A,(DE)
            0x0A | 0x1A => {
                let addr = if op == 0x0A { self.regs.bc() } else { self.regs.de() };
                self.regs.a = bus.read(addr);
                self.regs.wz = addr.wrapping_add(1);
            }

            // INC rr
            0x03 | 0x13 | 0x23 | 0x33 => {
                let p = op >> 4;
                let value = self.reg16(p, index).wrapping_add(1);
                self.set_reg16(p, value, index);
            }

            // DEC rr
            0x0B | 0x1B | 0x2B | 0x3B => {
                let p = op >> 4;
                let value = self.reg16(p, index).wrapping_sub(1);
                self.set_reg16(p, value, index);
            }

            // INC (HL)
            0x34 => {
                let addr = self.operand_address(bus, index);
                let r = alu::inc8(bus.read(addr));
                bus.write(addr, r.value);
                self.regs.f = (self.regs.f & CF) | r.flags;
            }

            // DEC (HL)
            0x35 => {
                let addr = self.operand_address(bus, index);
                let r = alu::dec8(bus.read(addr));
                bus.write(addr, r.value);
                self.regs.f = (self.regs.f & CF) | r.flags;
            }

            // INC r
            0x04 | 0x0C | 0x14 | 0x1C | 0x24 | 0x2C | 0x3C => {
                let reg = op >> 3;
                let r = alu::inc8(self.reg8(reg, index));
                self.set_reg8(reg, r.value, index);
                self.regs.f = (self.regs.f & CF) | r.flags;
            }

            // DEC r
            0x05 | 0x0D | 0x15 | 0x1D | 0x25 | 0x2D | 0x3D => {
                let reg = op >> 3;
                let r = alu::dec8(self.reg8(reg, index));
                self.set_reg8(reg, r.value, index);
                self.regs.f = (self.regs.f & CF) | r.flags;
            }

            // LD (HL),n: the displacement precedes the immediate
            0x36 => {
                let addr = self.operand_address(bus, index);
                let value = self.fetch_byte(bus);
                bus.write(addr, value);
            }

            // LD r,n
            0x06 | 0x0E | 0x16 | 0x1E | 0x26 | 0x2E | 0x3E => {
                let value = self.fetch_byte(bus);
                self.set_reg8(op >> 3, value, index);
            }

            // RLCA
            0x07 => {
                self.regs.a = self.regs.a.rotate_left(1);
                self.accumulator_rotate_flags(self.regs.a & 1);
            }

            // RRCA
            0x0F => {
                let carry = self.regs.a & 1;
                self.regs.a = self.regs.a.rotate_right(1);
                self.accumulator_rotate_flags(carry);
            }

            // RLA
            0x17 => {
                let carry = self.regs.a >> 7;
                self.regs.a = (self.regs.a << 1) | (self.regs.f & CF);
                self.accumulator_rotate_flags(carry);
            }

            // RRA
            0x1F => {
                let carry = self.regs.a & 1;
                self.regs.a = (self.regs.a >> 1) | ((self.regs.f & CF) << 7);
                self.accumulator_rotate_flags(carry);
            }

            // EX AF,AF'
            0x08 => self.regs.exchange_af(),

            // ADD HL,rr
            0x09 | 0x19 | 0x29 | 0x39 => {
                let hl = self.index_value(index);
                let rr = self.reg16(op >> 4, index);
                let (value, flags) = alu::add16(hl, rr);
                self.regs.wz = hl.wrapping_add(1);
                self.set_index_value(index, value);
                self.regs.f = (self.regs.f & (SF | ZF | PF)) | flags;
            }

            // DJNZ e
            0x10 => {
                let e = self.fetch_byte(bus) as i8;
                self.regs.b = self.regs.b.wrapping_sub(1);
                if self.regs.b != 0 {
                    self.relative_jump(e);
                    return 5;
                }
            }

            // JR e
            0x18 => {
                let e = self.fetch_byte(bus) as i8;
                self.relative_jump(e);
            }

            // JR cc,e (NZ, Z, NC, C)
            0x20 | 0x28 | 0x30 | 0x38 => {
                let e = self.fetch_byte(bus) as i8;
                if self.condition((op >> 3) & 3) {
                    self.relative_jump(e);
                    return 5;
                }
            }

            // LD (nn),HL
            0x22 => {
                let addr = self.fetch_word(bus);
                let value = self.index_value(index);
                self.write_word(bus, addr, value);
                self.regs.wz = addr.wrapping_add(1);
            }

            // LD HL,(nn)
            0x2A => {
                let addr = self.fetch_word(bus);
                let value = self.read_word(bus, addr);
                self.set_index_value(index, value);
                self.regs.wz = addr.wrapping_add(1);
            }

            // DAA
            0x27 => {
                let entry = DAA[daa_index(self.regs.a, self.regs.f)];
                self.regs.set_af(entry);
            }

            // CPL
            0x2F => {
                self.regs.a = !self.regs.a;
                self.regs.f = (self.regs.f & (SF | ZF | PF | CF))
                    | HF
                    | NF
                    | (self.regs.a & (YF | XF));
            }

            // LD (nn),A
            0x32 => {
                let addr = self.fetch_word(bus);
                bus.write(addr, self.regs.a);
                self.regs.wz = (u16::from(self.regs.a) << 8) | (addr.wrapping_add(1) & 0xFF);
            }

            // LD A,(nn)
            0x3A => {
                let addr = self.fetch_word(bus);
                self.regs.a = bus.read(addr);
                self.regs.wz = addr.wrapping_add(1);
            }

            // SCF
            0x37 => {
                self.regs.f = (self.regs.f & (SF | ZF | PF)) | CF | (self.regs.a & (YF | XF));
            }

            // CCF: H takes the old carry
            0x3F => {
                let old_carry = self.regs.f & CF;
                self.regs.f = (self.regs.f & (SF | ZF | PF))
                    | (old_carry << 4)
                    | (old_carry ^ CF)
                    | (self.regs.a & (YF | XF));
            }

            // HALT
            0x76 => self.regs.halted = true,

            // LD r,(HL): the register side keeps plain H/L
            0x46 | 0x4E | 0x56 | 0x5E | 0x66 | 0x6E | 0x7E => {
                let addr = self.operand_address(bus, index);
                let value = bus.read(addr);
                self.set_reg8(op >> 3, value, Index::Hl);
            }

            // LD (HL),r
            0x70..=0x77 => {
                let addr = self.operand_address(bus, index);
                let value = self.reg8(op, Index::Hl);
                bus.write(addr, value);
            }

            // LD r,r'
            0x40..=0x7F => {
                let value = self.reg8(op, index);
                self.set_reg8(op >> 3, value, index);
            }

            // ALU A,(HL)
            0x86 | 0x8E | 0x96 | 0x9E | 0xA6 | 0xAE | 0xB6 | 0xBE => {
                let addr = self.operand_address(bus, index);
                let value = bus.read(addr);
                self.accumulate(op >> 3, value);
            }

            // ALU A,r
            0x80..=0xBF => {
                let value = self.reg8(op, index);
                self.accumulate(op >> 3, value);
            }

            // RET cc
            0xC0 | 0xC8 | 0xD0 | 0xD8 | 0xE0 | 0xE8 | 0xF0 | 0xF8 => {
                if self.condition(op >> 3) {
                    self.regs.pc = self.pop(bus);
                    self.regs.wz = self.regs.pc;
                    return 6;
                }
            }

            // POP rr (BC, DE, HL, AF)
            0xC1 | 0xD1 | 0xE1 | 0xF1 => {
                let value = self.pop(bus);
                match (op >> 4) & 3 {
                    3 => self.regs.set_af(value),
                    p => self.set_reg16(p, value, index),
                }
            }

            // JP cc,nn
            0xC2 | 0xCA | 0xD2 | 0xDA | 0xE2 | 0xEA | 0xF2 | 0xFA => {
                let addr = self.fetch_word(bus);
                self.regs.wz = addr;
                if self.condition(op >> 3) {
                    self.regs.pc = addr;
                }
            }

            // JP nn
            0xC3 => {
                let addr = self.fetch_word(bus);
                self.regs.pc = addr;
                self.regs.wz = addr;
            }

            // CALL cc,nn
            0xC4 | 0xCC | 0xD4 | 0xDC | 0xE4 | 0xEC | 0xF4 | 0xFC => {
                let addr = self.fetch_word(bus);
                self.regs.wz = addr;
                if self.condition(op >> 3) {
                    self.push(bus, self.regs.pc);
                    self.regs.pc = addr;
                    return 7;
                }
            }

            // PUSH rr (BC, DE, HL, AF)
            0xC5 | 0xD5 | 0xE5 | 0xF5 => {
                let value = match (op >> 4) & 3 {
                    3 => self.regs.af(),
                    p => self.reg16(p, index),
                };
                self.push(bus, value);
            }

            // ALU A,n
            0xC6 | 0xCE | 0xD6 | 0xDE | 0xE6 | 0xEE | 0xF6 | 0xFE => {
                let value = self.fetch_byte(bus);
                self.accumulate(op >> 3, value);
            }

            // RST p
            0xC7 | 0xCF | 0xD7 | 0xDF | 0xE7 | 0xEF | 0xF7 | 0xFF => {
                self.push(bus, self.regs.pc);
                self.regs.pc = u16::from(op & 0x38);
                self.regs.wz = self.regs.pc;
            }

            // RET
            0xC9 => {
                self.regs.pc = self.pop(bus);
                self.regs.wz = self.regs.pc;
            }

            // CALL nn
            0xCD => {
                let addr = self.fetch_word(bus);
                self.push(bus, self.regs.pc);
                self.regs.pc = addr;
                self.regs.wz = addr;
            }

            // OUT (n),A
            0xD3 => {
                let n = self.fetch_byte(bus);
                let port = u16::from_be_bytes([self.regs.a, n]);
                bus.io_write(port, self.regs.a);
                self.regs.wz = (u16::from(self.regs.a) << 8) | u16::from(n.wrapping_add(1));
            }

            // IN A,(n)
            0xDB => {
                let n = self.fetch_byte(bus);
                let port = u16::from_be_bytes([self.regs.a, n]);
                self.regs.a = bus.io_read(port);
                self.regs.wz = port.wrapping_add(1);
            }

            // EXX
            0xD9 => self.regs.exchange_main(),

            // EX (SP),HL
            0xE3 => {
                let sp = self.regs.sp;
                let value = self.read_word(bus, sp);
                let old = self.index_value(index);
                self.write_word(bus, sp, old);
                self.set_index_value(index, value);
                self.regs.wz = value;
            }

            // JP (HL)
            0xE9 => self.regs.pc = self.index_value(index),

            // EX DE,HL: never indexed
            0xEB => {
                let de = self.regs.de();
                self.regs.set_de(self.regs.hl());
                self.regs.set_hl(de);
            }

            // DI
            0xF3 => {
                self.regs.iff1 = false;
                self.regs.iff2 = false;
            }

            // EI
            0xFB => {
                self.regs.iff1 = true;
                self.regs.iff2 = true;
                self.ei_delay = true;
            }

            // LD SP,HL
            0xF9 => self.regs.sp = self.index_value(index),

            // Prefixes are dispatched before this table.
            0xCB | 0xDD | 0xED | 0xFD => {}
        }
        0
    }

    fn relative_jump(&mut self, e: i8) {
        self.regs.pc = self.regs.pc.wrapping_add_signed(i16::from(e));
        self.regs.wz = self.regs.pc;
    }

    fn accumulate(&mut self, operation: u8, value: u8) {
        let r = alu::alu_op(operation, self.regs.a, value, self.regs.f);
        self.regs.a = r.value;
        self.regs.f = r.flags;
    }

    /// Flags shared by RLCA/RRCA/RLA/RRA: S, Z and P/V survive.
    fn accumulator_rotate_flags(&mut self, carry: u8) {
        self.regs.f = (self.regs.f & (SF | ZF | PF)) | (self.regs.a & (YF | XF)) | (carry & CF);
    }
}
