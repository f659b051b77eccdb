//! ALU operations for the Z80.
//!
//! Half carry is bit 4 of `a ^ b ^ result`; overflow is "both operands
//! agree in sign and the result doesn't" (add) or "operands disagree and
//! the result follows the subtrahend" (subtract).

use crate::flags::{CF, HF, NF, PF, SF, SZ53, SZ53P, XF, YF, ZF};

/// Result of an 8-bit ALU operation with the flags it produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AluResult {
    pub value: u8,
    pub flags: u8,
}

#[must_use]
pub fn add8(a: u8, b: u8, carry: bool) -> AluResult {
    let wide = u16::from(a) + u16::from(b) + u16::from(carry);
    let value = wide as u8;
    let mut flags = SZ53[value as usize] | ((a ^ b ^ value) & HF);
    if (a ^ b) & 0x80 == 0 && (a ^ value) & 0x80 != 0 {
        flags |= PF;
    }
    if wide > 0xFF {
        flags |= CF;
    }
    AluResult { value, flags }
}

#[must_use]
pub fn sub8(a: u8, b: u8, carry: bool) -> AluResult {
    let wide = u16::from(a)
        .wrapping_sub(u16::from(b))
        .wrapping_sub(u16::from(carry));
    let value = wide as u8;
    let mut flags = NF | SZ53[value as usize] | ((a ^ b ^ value) & HF);
    if (a ^ b) & 0x80 != 0 && (a ^ value) & 0x80 != 0 {
        flags |= PF;
    }
    if wide > 0xFF {
        flags |= CF;
    }
    AluResult { value, flags }
}

/// `CP`: a subtraction whose X/Y flags come from the operand, not the result.
#[must_use]
pub fn cp8(a: u8, b: u8) -> AluResult {
    let r = sub8(a, b, false);
    AluResult {
        value: a,
        flags: (r.flags & !(YF | XF)) | (b & (YF | XF)),
    }
}

#[must_use]
pub fn and8(a: u8, b: u8) -> AluResult {
    let value = a & b;
    AluResult { value, flags: SZ53P[value as usize] | HF }
}

#[must_use]
pub fn or8(a: u8, b: u8) -> AluResult {
    let value = a | b;
    AluResult { value, flags: SZ53P[value as usize] }
}

#[must_use]
pub fn xor8(a: u8, b: u8) -> AluResult {
    let value = a ^ b;
    AluResult { value, flags: SZ53P[value as usize] }
}

/// `INC r`. Carry is preserved by the caller.
#[must_use]
pub fn inc8(a: u8) -> AluResult {
    let value = a.wrapping_add(1);
    let mut flags = SZ53[value as usize] | ((a ^ value) & HF);
    if value == 0x80 {
        flags |= PF;
    }
    AluResult { value, flags }
}

/// `DEC r`. Carry is preserved by the caller.
#[must_use]
pub fn dec8(a: u8) -> AluResult {
    let value = a.wrapping_sub(1);
    let mut flags = NF | SZ53[value as usize] | ((a ^ value) & HF);
    if value == 0x7F {
        flags |= PF;
    }
    AluResult { value, flags }
}

/// The eight `ADD/ADC/SUB/SBC/AND/XOR/OR/CP` operations selected by bits
/// 3-5 of the opcode.
#[must_use]
pub fn alu_op(op: u8, a: u8, b: u8, f: u8) -> AluResult {
    let carry = f & CF != 0;
    match op & 7 {
        0 => add8(a, b, false),
        1 => add8(a, b, carry),
        2 => sub8(a, b, false),
        3 => sub8(a, b, carry),
        4 => and8(a, b),
        5 => xor8(a, b),
        6 => or8(a, b),
        _ => cp8(a, b),
    }
}

/// CB-prefix rotates and shifts selected by bits 3-5 of the opcode:
/// `RLC RRC RL RR SLA SRA SLL SRL`.
#[must_use]
pub fn rotate_shift(op: u8, value: u8, f: u8) -> AluResult {
    let carry_in = f & CF;
    let (result, carry_out) = match op & 7 {
        0 => (value.rotate_left(1), value >> 7),
        1 => (value.rotate_right(1), value & 1),
        2 => ((value << 1) | carry_in, value >> 7),
        3 => ((value >> 1) | (carry_in << 7), value & 1),
        4 => (value << 1, value >> 7),
        5 => ((value >> 1) | (value & 0x80), value & 1),
        6 => ((value << 1) | 1, value >> 7),
        _ => (value >> 1, value & 1),
    };
    AluResult { value: result, flags: SZ53P[result as usize] | carry_out }
}

/// `ADD HL,rr`. Returns the sum and the H, C, X, Y bits; S, Z and P/V are
/// preserved by the caller.
#[must_use]
pub fn add16(a: u16, b: u16) -> (u16, u8) {
    let wide = u32::from(a) + u32::from(b);
    let value = wide as u16;
    let high = (value >> 8) as u8;
    let mut flags = high & (YF | XF);
    flags |= (((a ^ b ^ value) >> 8) as u8) & HF;
    if wide > 0xFFFF {
        flags |= CF;
    }
    (value, flags)
}

/// `ADC HL,rr`.
#[must_use]
pub fn adc16(a: u16, b: u16, carry: bool) -> (u16, u8) {
    let wide = u32::from(a) + u32::from(b) + u32::from(carry);
    let value = wide as u16;
    let high = (value >> 8) as u8;
    let mut flags = (high & (SF | YF | XF)) | ((((a ^ b ^ value) >> 8) as u8) & HF);
    if value == 0 {
        flags |= ZF;
    }
    if (a ^ b) & 0x8000 == 0 && (a ^ value) & 0x8000 != 0 {
        flags |= PF;
    }
    if wide > 0xFFFF {
        flags |= CF;
    }
    (value, flags)
}

/// `SBC HL,rr`.
#[must_use]
pub fn sbc16(a: u16, b: u16, carry: bool) -> (u16, u8) {
    let wide = u32::from(a)
        .wrapping_sub(u32::from(b))
        .wrapping_sub(u32::from(carry));
    let value = wide as u16;
    let high = (value >> 8) as u8;
    let mut flags = NF | (high & (SF | YF | XF)) | ((((a ^ b ^ value) >> 8) as u8) & HF);
    if value == 0 {
        flags |= ZF;
    }
    if (a ^ b) & 0x8000 != 0 && (a ^ value) & 0x8000 != 0 {
        flags |= PF;
    }
    if wide > 0xFFFF {
        flags |= CF;
    }
    (value, flags)
}
