//! CPU core trait.

use crate::Bus;

/// A CPU core.
///
/// CPUs execute instructions and access memory through a bus. The bus is
/// passed in, not owned, so the machine can keep every device in one place
/// and hand the CPU a view of them for the duration of a call.
pub trait Cpu {
    /// The type used for register inspection.
    type Registers;

    /// Execute one instruction (or one halted no-op, or one interrupt
    /// acceptance) and return the T-states it took.
    fn step<B: Bus>(&mut self, bus: &mut B) -> u32;

    /// Returns the current program counter.
    ///
    /// Returns `u32` so every CPU address width fits; narrower CPUs
    /// zero-extend.
    fn pc(&self) -> u32;

    /// Returns a snapshot of all registers for inspection.
    fn registers(&self) -> Self::Registers;

    /// Returns true if the CPU is halted.
    fn is_halted(&self) -> bool;

    /// Request a maskable interrupt. Returns true if it can be taken at the
    /// next instruction boundary; otherwise it stays latched.
    fn interrupt(&mut self) -> bool;

    /// Request a non-maskable interrupt.
    fn nmi(&mut self);

    /// Reset the CPU to its power-on state.
    fn reset(&mut self);
}
