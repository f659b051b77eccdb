//! Amstrad CPC 464/664/6128 emulator.
//!
//! The machine is a Z80 at 4 MHz, a Gate Array, an MC6845 CRTC, an 8255
//! PPI, an AY-3-8910 PSG and a uPD765 disk controller on a 16-bit memory
//! and I/O bus. Timing is scanline-stepped: the CPU runs 256 T-states, the
//! Gate Array counts the line, and 312 lines make a frame.

mod bus;
#[cfg(feature = "native")]
pub mod capture;
mod config;
mod cpc;
pub mod input;
mod keyboard;
pub mod keyboard_map;
mod memory;
pub mod sna;
mod video;

pub use amstrad_gate_array::Monitor;
pub use bus::CpcBus;
pub use config::{CpcConfig, CpcModel, KeyboardLayout, Manufacturer, Refresh};
pub use cpc::{Cpc, FrameReport, LINES_PER_FRAME};
pub use input::{CpcKey, InputQueue};
pub use keyboard::KeyboardMatrix;
pub use memory::{BANK_SIZE, Bank, BufferId, CpcMemory, MAX_RAM_KB, MIN_RAM_KB};
pub use nec_upd765::DiskImage;
pub use video::{Framebuffer, PixelFormat, SCREEN_HEIGHT, SCREEN_WIDTH};
