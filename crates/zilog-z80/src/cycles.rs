//! T-state costs per decode context.
//!
//! Conditional instructions list their not-taken cost; the executor adds
//! the taken penalty (`JR cc`/`DJNZ` +5, `CALL cc` +7, `RET cc` +6, repeating
//! block instructions +5). Prefix bytes cost 4 T-states each and are folded
//! into the prefixed tables.

/// Which opcode table an instruction byte is decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeContext {
    Base,
    Cb,
    Dd,
    Ed,
    Fd,
    DdCb,
    FdCb,
}

/// Unprefixed opcodes. Prefix bytes are zero; they never index this table.
#[rustfmt::skip]
const BASE: [u8; 256] = [
//  0   1   2   3   4   5   6   7   8   9   A   B   C   D   E   F
    4, 10,  7,  6,  4,  4,  7,  4,  4, 11,  7,  6,  4,  4,  7,  4, // 0
    8, 10,  7,  6,  4,  4,  7,  4, 12, 11,  7,  6,  4,  4,  7,  4, // 1
    7, 10, 16,  6,  4,  4,  7,  4,  7, 11, 16,  6,  4,  4,  7,  4, // 2
    7, 10, 13,  6, 11, 11, 10,  4,  7, 11, 13,  6,  4,  4,  7,  4, // 3
    4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4, // 4
    4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4, // 5
    4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4, // 6
    7,  7,  7,  7,  7,  7,  4,  7,  4,  4,  4,  4,  4,  4,  7,  4, // 7
    4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4, // 8
    4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4, // 9
    4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4, // A
    4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4, // B
    5, 10, 10, 10, 10, 11,  7, 11,  5, 10, 10,  0, 10, 17,  7, 11, // C
    5, 10, 10, 11, 10, 11,  7, 11,  5,  4, 10, 11, 10,  0,  7, 11, // D
    5, 10, 10, 19, 10, 11,  7, 11,  5,  4, 10,  4, 10,  0,  7, 11, // E
    5, 10, 10,  4, 10, 11,  7, 11,  5,  6, 10,  4, 10,  0,  7, 11, // F
];

/// `ED xx`, including the prefix. Holes cost 8 (two NOPs).
#[rustfmt::skip]
const ED: [u8; 256] = [
//  0   1   2   3   4   5   6   7   8   9   A   B   C   D   E   F
    8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8, // 0
    8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8, // 1
    8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8, // 2
    8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8, // 3
   12, 12, 15, 20,  8, 14,  8,  9, 12, 12, 15, 20,  8, 14,  8,  9, // 4
   12, 12, 15, 20,  8, 14,  8,  9, 12, 12, 15, 20,  8, 14,  8,  9, // 5
   12, 12, 15, 20,  8, 14,  8, 18, 12, 12, 15, 20,  8, 14,  8, 18, // 6
   12, 12, 15, 20,  8, 14,  8,  8, 12, 12, 15, 20,  8, 14,  8,  8, // 7
    8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8, // 8
    8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8, // 9
   16, 16, 16, 16,  8,  8,  8,  8, 16, 16, 16, 16,  8,  8,  8,  8, // A
   16, 16, 16, 16,  8,  8,  8,  8, 16, 16, 16, 16,  8,  8,  8,  8, // B
    8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8, // C
    8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8, // D
    8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8, // E
    8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8, // F
];

static CB: [u8; 256] = build_cb();
static XY: [u8; 256] = build_xy();
static XYCB: [u8; 256] = build_xycb();

/// `CB xx`: 8 for registers, 15 for `(HL)`, 12 for `BIT n,(HL)`.
const fn build_cb() -> [u8; 256] {
    let mut table = [8u8; 256];
    let mut op = 0;
    while op < 256 {
        if op & 7 == 6 {
            table[op] = if op >= 0x40 && op < 0x80 { 12 } else { 15 };
        }
        op += 1;
    }
    table
}

/// `DD xx` / `FD xx`. Opcodes that never touch HL run as the unprefixed
/// instruction after a 4 T-state prefix.
const fn build_xy() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut op = 0;
    while op < 256 {
        table[op] = BASE[op] + 4;
        op += 1;
    }

    // ADD IX,rr
    table[0x09] = 15;
    table[0x19] = 15;
    table[0x29] = 15;
    table[0x39] = 15;

    table[0x21] = 14; // LD IX,nn
    table[0x22] = 20; // LD (nn),IX
    table[0x23] = 10; // INC IX
    table[0x24] = 8; // INC IXH
    table[0x25] = 8; // DEC IXH
    table[0x26] = 11; // LD IXH,n
    table[0x2A] = 20; // LD IX,(nn)
    table[0x2B] = 10; // DEC IX
    table[0x2C] = 8; // INC IXL
    table[0x2D] = 8; // DEC IXL
    table[0x2E] = 11; // LD IXL,n
    table[0x34] = 23; // INC (IX+d)
    table[0x35] = 23; // DEC (IX+d)
    table[0x36] = 19; // LD (IX+d),n

    // LD r,r' block: IXH/IXL forms 8, (IX+d) forms 19
    let mut op = 0x40;
    while op < 0x80 {
        let dst = (op >> 3) & 7;
        let src = op & 7;
        if op == 0x76 {
            // HALT
        } else if src == 6 || dst == 6 {
            table[op] = 19;
        } else if src == 4 || src == 5 || dst == 4 || dst == 5 {
            table[op] = 8;
        }
        op += 1;
    }

    // ALU A,r block
    let mut op = 0x80;
    while op < 0xC0 {
        let src = op & 7;
        if src == 6 {
            table[op] = 19;
        } else if src == 4 || src == 5 {
            table[op] = 8;
        }
        op += 1;
    }

    table[0xCB] = 0;
    table[0xE1] = 14; // POP IX
    table[0xE3] = 23; // EX (SP),IX
    table[0xE5] = 15; // PUSH IX
    table[0xE9] = 8; // JP (IX)
    table[0xF9] = 10; // LD SP,IX
    table
}

/// `DD CB d xx` / `FD CB d xx`: 20 for `BIT`, 23 for everything else.
const fn build_xycb() -> [u8; 256] {
    let mut table = [23u8; 256];
    let mut op = 0x40;
    while op < 0x80 {
        table[op] = 20;
        op += 1;
    }
    table
}

/// T-state cost of `op` decoded in `context`.
#[must_use]
pub fn cycles(context: DecodeContext, op: u8) -> u32 {
    let table = match context {
        DecodeContext::Base => &BASE,
        DecodeContext::Cb => &CB,
        DecodeContext::Ed => &ED,
        DecodeContext::Dd | DecodeContext::Fd => &XY,
        DecodeContext::DdCb | DecodeContext::FdCb => &XYCB,
    };
    u32::from(table[op as usize])
}
