//! Z80 CPU core.
//!
//! The core executes whole instructions. Each call to [`Z80::step`] fetches
//! through the prefix bytes, dispatches on the final opcode and returns the
//! T-states consumed, looked up in the per-context tables in `cycles`.
//!
//! [`Z80::execute`] runs instructions until one instruction period
//! (`IPeriod`) has elapsed, then polls the interrupt source once. Any
//! overshoot carries into the next period, so long-run timing is exact
//! even though instructions never split across a poll.

mod base;
mod cb;
mod ed;

use emu_core::{Bus, Cpu, IntRequest, InterruptSource, Observable, Value};

use crate::cycles::{DecodeContext, cycles};
use crate::flags::{CF, HF, NF, PF, SF, XF, YF, ZF};
use crate::registers::Registers;

/// Which register stands in for HL: plain, or IX/IY after a DD/FD prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Index {
    Hl,
    Ix,
    Iy,
}

/// Default instruction period: one 64 µs scanline at 4 MHz.
pub const DEFAULT_IPERIOD: i32 = 256;

/// Zilog Z80 CPU.
pub struct Z80 {
    pub regs: Registers,

    /// T-states between interrupt polls.
    iperiod: i32,
    /// T-states left until the next poll. Goes negative on overshoot.
    icount: i32,

    /// Set by `EI`; blocks acceptance for one instruction.
    ei_delay: bool,
    /// A DD/FD prefix was cut short by another prefix; no interrupt until
    /// the chain reaches an opcode.
    in_prefix: bool,
    /// Maskable request latched until accepted.
    int_pending: bool,
    nmi_pending: bool,

    /// Context of the most recently decoded opcode.
    last_context: DecodeContext,

    total_t_states: u64,
    m1_cycles: u64,
}

impl Z80 {
    #[must_use]
    pub fn new() -> Self {
        Self {
            regs: Registers::default(),
            iperiod: DEFAULT_IPERIOD,
            icount: DEFAULT_IPERIOD,
            ei_delay: false,
            in_prefix: false,
            int_pending: false,
            nmi_pending: false,
            last_context: DecodeContext::Base,
            total_t_states: 0,
            m1_cycles: 0,
        }
    }

    /// Set the instruction period. Values below 1 are clamped to 1.
    pub fn set_iperiod(&mut self, tstates: i32) {
        self.iperiod = tstates.max(1);
        self.icount = self.iperiod;
    }

    #[must_use]
    pub fn iperiod(&self) -> i32 {
        self.iperiod
    }

    /// T-states remaining in the current period (negative after overshoot).
    #[must_use]
    pub fn icount(&self) -> i32 {
        self.icount
    }

    /// Total T-states executed since reset.
    #[must_use]
    pub fn total_t_states(&self) -> u64 {
        self.total_t_states
    }

    /// Total opcode-fetch (M1) cycles since reset, prefixes included.
    #[must_use]
    pub fn m1_cycles(&self) -> u64 {
        self.m1_cycles
    }

    #[must_use]
    pub fn int_pending(&self) -> bool {
        self.int_pending
    }

    /// Drop a latched maskable request without servicing it.
    pub fn clear_interrupt(&mut self) {
        self.int_pending = false;
    }

    #[must_use]
    pub fn last_context(&self) -> DecodeContext {
        self.last_context
    }

    /// Whether the instruction just executed was `EI`.
    #[cfg(feature = "test-utils")]
    #[must_use]
    pub fn ei_delay(&self) -> bool {
        self.ei_delay
    }

    #[cfg(feature = "test-utils")]
    pub fn set_ei_delay(&mut self, pending: bool) {
        self.ei_delay = pending;
    }

    /// Run until the current instruction period is used up, then poll
    /// `bus` for interrupts once. Returns the T-states executed.
    pub fn execute<B: Bus + InterruptSource>(&mut self, bus: &mut B) -> u32 {
        let mut elapsed = 0;
        loop {
            let t = self.step(bus);
            elapsed += t;
            self.icount -= t as i32;
            if self.icount <= 0 {
                self.icount += self.iperiod;
                match bus.poll_interrupt() {
                    IntRequest::None => {}
                    IntRequest::Int => {
                        self.interrupt();
                    }
                    IntRequest::Nmi => self.nmi(),
                }
                return elapsed;
            }
        }
    }

    fn step_instruction<B: Bus>(&mut self, bus: &mut B) -> u32 {
        if let Some(t) = self.accept_interrupt(bus) {
            return t;
        }

        if self.regs.halted {
            // HALT re-executes NOP internally; refresh keeps counting.
            self.regs.increment_r();
            self.m1_cycles += 1;
            return 4;
        }

        let op = self.fetch_opcode(bus);
        match op {
            0xCB => self.execute_cb(bus),
            0xDD => self.execute_prefixed(bus, Index::Ix),
            0xED => self.execute_ed(bus),
            0xFD => self.execute_prefixed(bus, Index::Iy),
            _ => {
                self.last_context = DecodeContext::Base;
                cycles(DecodeContext::Base, op) + self.execute_base(bus, op, Index::Hl)
            }
        }
    }

    /// DD/FD prefix. A following DD, FD or ED cancels this prefix: it costs
    /// 4 T-states and the next byte is decoded afresh on the next step.
    fn execute_prefixed<B: Bus>(&mut self, bus: &mut B, index: Index) -> u32 {
        if matches!(bus.read(self.regs.pc), 0xDD | 0xED | 0xFD) {
            self.in_prefix = true;
            return 4;
        }

        let op = self.fetch_opcode(bus);
        let context = if index == Index::Ix {
            DecodeContext::Dd
        } else {
            DecodeContext::Fd
        };
        if op == 0xCB {
            return self.execute_indexed_cb(bus, index);
        }
        self.last_context = context;
        cycles(context, op) + self.execute_base(bus, op, index)
    }

    fn accept_interrupt<B: Bus>(&mut self, bus: &mut B) -> Option<u32> {
        let shadow = std::mem::take(&mut self.ei_delay);
        if std::mem::take(&mut self.in_prefix) {
            return None;
        }

        if self.nmi_pending {
            self.nmi_pending = false;
            self.leave_halt();
            self.regs.increment_r();
            self.m1_cycles += 1;
            self.regs.iff2 = self.regs.iff1;
            self.regs.iff1 = false;
            self.push(bus, self.regs.pc);
            self.regs.pc = 0x0066;
            self.regs.wz = 0x0066;
            return Some(11);
        }

        if !self.int_pending || !self.regs.iff1 || shadow {
            return None;
        }

        self.int_pending = false;
        self.leave_halt();
        self.regs.increment_r();
        self.m1_cycles += 1;
        self.regs.iff1 = false;
        self.regs.iff2 = false;
        let data = bus.int_ack();
        self.push(bus, self.regs.pc);

        let t = if self.regs.im == 2 {
            let vector = (u16::from(self.regs.i) << 8) | u16::from(data);
            self.regs.pc = self.read_word(bus, vector);
            19
        } else {
            // IM 0 executes the byte on the bus; the CPC floats 0xFF (RST 38).
            // IM 1 always goes to 0x0038.
            self.regs.pc = if self.regs.im == 0 {
                u16::from(data & 0x38)
            } else {
                0x0038
            };
            13
        };
        self.regs.wz = self.regs.pc;
        Some(t)
    }

    fn leave_halt(&mut self) {
        self.regs.halted = false;
    }

    // -----------------------------------------------------------------------
    // Bus helpers
    // -----------------------------------------------------------------------

    /// M1 cycle: read the opcode at PC and bump R.
    fn fetch_opcode<B: Bus>(&mut self, bus: &mut B) -> u8 {
        let op = bus.read(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        self.regs.increment_r();
        self.m1_cycles += 1;
        op
    }

    fn fetch_byte<B: Bus>(&mut self, bus: &mut B) -> u8 {
        let value = bus.read(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        value
    }

    fn fetch_word<B: Bus>(&mut self, bus: &mut B) -> u16 {
        let lo = self.fetch_byte(bus);
        let hi = self.fetch_byte(bus);
        u16::from_le_bytes([lo, hi])
    }

    fn read_word<B: Bus>(&mut self, bus: &mut B, addr: u16) -> u16 {
        let lo = bus.read(addr);
        let hi = bus.read(addr.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    fn write_word<B: Bus>(&mut self, bus: &mut B, addr: u16, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        bus.write(addr, lo);
        bus.write(addr.wrapping_add(1), hi);
    }

    fn push<B: Bus>(&mut self, bus: &mut B, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        bus.write(self.regs.sp, hi);
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        bus.write(self.regs.sp, lo);
    }

    fn pop<B: Bus>(&mut self, bus: &mut B) -> u16 {
        let lo = bus.read(self.regs.sp);
        self.regs.sp = self.regs.sp.wrapping_add(1);
        let hi = bus.read(self.regs.sp);
        self.regs.sp = self.regs.sp.wrapping_add(1);
        u16::from_le_bytes([lo, hi])
    }

    // -----------------------------------------------------------------------
    // Register helpers
    // -----------------------------------------------------------------------

    fn index_value(&self, index: Index) -> u16 {
        match index {
            Index::Hl => self.regs.hl(),
            Index::Ix => self.regs.ix,
            Index::Iy => self.regs.iy,
        }
    }

    fn set_index_value(&mut self, index: Index, value: u16) {
        match index {
            Index::Hl => self.regs.set_hl(value),
            Index::Ix => self.regs.ix = value,
            Index::Iy => self.regs.iy = value,
        }
    }

    /// 8-bit register by its 3-bit encoding (`B C D E H L - A`). Under a
    /// DD/FD prefix, H and L become the halves of IX/IY. Code 6 is the
    /// memory operand and never reaches here.
    fn reg8(&self, r: u8, index: Index) -> u8 {
        match r & 7 {
            0 => self.regs.b,
            1 => self.regs.c,
            2 => self.regs.d,
            3 => self.regs.e,
            4 => (self.index_value(index) >> 8) as u8,
            5 => self.index_value(index) as u8,
            _ => self.regs.a,
        }
    }

    fn set_reg8(&mut self, r: u8, value: u8, index: Index) {
        match r & 7 {
            0 => self.regs.b = value,
            1 => self.regs.c = value,
            2 => self.regs.d = value,
            3 => self.regs.e = value,
            4 => {
                let v = self.index_value(index);
                self.set_index_value(index, (v & 0x00FF) | (u16::from(value) << 8));
            }
            5 => {
                let v = self.index_value(index);
                self.set_index_value(index, (v & 0xFF00) | u16::from(value));
            }
            6 => {}
            _ => self.regs.a = value,
        }
    }

    /// Register pair by its 2-bit encoding (`BC DE HL SP`).
    fn reg16(&self, p: u8, index: Index) -> u16 {
        match p & 3 {
            0 => self.regs.bc(),
            1 => self.regs.de(),
            2 => self.index_value(index),
            _ => self.regs.sp,
        }
    }

    fn set_reg16(&mut self, p: u8, value: u16, index: Index) {
        match p & 3 {
            0 => self.regs.set_bc(value),
            1 => self.regs.set_de(value),
            2 => self.set_index_value(index, value),
            _ => self.regs.sp = value,
        }
    }

    /// Address of the memory operand: `(HL)`, or `(IX+d)`/`(IY+d)` with the
    /// displacement fetched from the instruction stream.
    fn operand_address<B: Bus>(&mut self, bus: &mut B, index: Index) -> u16 {
        if index == Index::Hl {
            return self.regs.hl();
        }
        let d = self.fetch_byte(bus) as i8;
        let addr = self.index_value(index).wrapping_add_signed(i16::from(d));
        self.regs.wz = addr;
        addr
    }

    /// Condition code by its 3-bit encoding (`NZ Z NC C PO PE P M`).
    fn condition(&self, cc: u8) -> bool {
        let f = self.regs.f;
        match cc & 7 {
            0 => f & ZF == 0,
            1 => f & ZF != 0,
            2 => f & CF == 0,
            3 => f & CF != 0,
            4 => f & PF == 0,
            5 => f & PF != 0,
            6 => f & SF == 0,
            _ => f & SF != 0,
        }
    }

    /// Flags for `BIT n,value`. X/Y come from `xy`, which is the operand for
    /// register forms and the high byte of WZ for memory forms.
    fn bit_flags(&mut self, bit: u8, value: u8, xy: u8) {
        let tested = value & (1 << bit);
        let mut f = (self.regs.f & CF) | HF | (xy & (YF | XF));
        if tested == 0 {
            f |= ZF | PF;
        }
        if tested & 0x80 != 0 {
            f |= SF;
        }
        self.regs.f = f;
    }
}

impl Default for Z80 {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu for Z80 {
    type Registers = Registers;

    fn step<B: Bus>(&mut self, bus: &mut B) -> u32 {
        let t = self.step_instruction(bus);
        self.total_t_states += u64::from(t);
        t
    }

    fn pc(&self) -> u32 {
        u32::from(self.regs.pc)
    }

    fn registers(&self) -> Registers {
        self.regs
    }

    fn is_halted(&self) -> bool {
        self.regs.halted
    }

    fn interrupt(&mut self) -> bool {
        self.int_pending = true;
        self.regs.iff1 && !self.ei_delay && !self.in_prefix
    }

    fn nmi(&mut self) {
        self.nmi_pending = true;
    }

    /// Power-on state: everything zero except AF and SP, which read back as
    /// 0xFFFF on real silicon.
    fn reset(&mut self) {
        self.regs = Registers {
            a: 0xFF,
            f: 0xFF,
            sp: 0xFFFF,
            ..Registers::default()
        };
        self.icount = self.iperiod;
        self.ei_delay = false;
        self.in_prefix = false;
        self.int_pending = false;
        self.nmi_pending = false;
        self.last_context = DecodeContext::Base;
        self.total_t_states = 0;
        self.m1_cycles = 0;
    }
}

const Z80_QUERY_PATHS: &[&str] = &[
    "pc", "sp", "a", "f", "b", "c", "d", "e", "h", "l", "af", "bc", "de", "hl", "af'", "bc'",
    "de'", "hl'", "ix", "iy", "i", "r", "wz", "im", "iff1", "iff2", "halted", "flags.s",
    "flags.z", "flags.h", "flags.pv", "flags.n", "flags.c", "iperiod", "t_states", "m1_cycles",
];

impl Observable for Z80 {
    fn query(&self, path: &str) -> Option<Value> {
        let r = &self.regs;
        let flag = |mask: u8| Value::Bool(r.f & mask != 0);
        let pair = |hi: u8, lo: u8| Value::U16(u16::from_be_bytes([hi, lo]));
        Some(match path {
            "pc" => r.pc.into(),
            "sp" => r.sp.into(),
            "a" => r.a.into(),
            "f" => r.f.into(),
            "b" => r.b.into(),
            "c" => r.c.into(),
            "d" => r.d.into(),
            "e" => r.e.into(),
            "h" => r.h.into(),
            "l" => r.l.into(),
            "af" => r.af().into(),
            "bc" => r.bc().into(),
            "de" => r.de().into(),
            "hl" => r.hl().into(),
            "af'" => pair(r.a_alt, r.f_alt),
            "bc'" => pair(r.b_alt, r.c_alt),
            "de'" => pair(r.d_alt, r.e_alt),
            "hl'" => pair(r.h_alt, r.l_alt),
            "ix" => r.ix.into(),
            "iy" => r.iy.into(),
            "i" => r.i.into(),
            "r" => r.r.into(),
            "wz" => r.wz.into(),
            "im" => r.im.into(),
            "iff1" => r.iff1.into(),
            "iff2" => r.iff2.into(),
            "halted" => r.halted.into(),
            "flags.s" => flag(SF),
            "flags.z" => flag(ZF),
            "flags.h" => flag(HF),
            "flags.pv" => flag(PF),
            "flags.n" => flag(NF),
            "flags.c" => flag(CF),
            "iperiod" => Value::U32(self.iperiod as u32),
            "t_states" => self.total_t_states.into(),
            "m1_cycles" => self.m1_cycles.into(),
            _ => return None,
        })
    }

    fn query_paths(&self) -> &'static [&'static str] {
        Z80_QUERY_PATHS
    }
}

#[cfg(test)]
mod tests;
