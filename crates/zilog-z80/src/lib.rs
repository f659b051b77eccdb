//! Instruction-stepped Zilog Z80 CPU emulator.
//!
//! Each call to `step()` executes one whole instruction (or accepts one
//! interrupt) and returns the T-states it took. `execute()` groups steps
//! into instruction periods and polls for interrupts between them.

mod alu;
mod cpu;
mod cycles;
mod flags;
mod registers;

pub use cpu::{DEFAULT_IPERIOD, Z80};
pub use cycles::{DecodeContext, cycles};
pub use flags::{CF, HF, NF, PF, SF, XF, YF, ZF};
pub use registers::Registers;
