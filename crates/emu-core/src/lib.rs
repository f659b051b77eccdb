//! Core traits and types shared by every chip and machine crate.
//!
//! The CPU sees the world through [`Bus`]; the machine decides when
//! interrupts fire through [`InterruptSource`]. Everything else is plain
//! data owned by the machine.

mod bus;
mod cpu;
mod interrupt;
mod observable;

pub use bus::Bus;
pub use cpu::Cpu;
pub use interrupt::{IntRequest, InterruptSource};
pub use observable::{Observable, Value};
