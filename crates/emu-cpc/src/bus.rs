//! CPC bus: memory and I/O routing.
//!
//! The bus connects the Z80 to memory and every peripheral. The CPC decodes
//! I/O ports by single address lines, held low, with no exclusivity: a port
//! with several lines low reaches several devices at once, and software
//! relies on it (`OUT (&F8FF)` style tricks hit the PPI and expansion bus
//! together).
//!
//! | Line | Device                                         |
//! |------|------------------------------------------------|
//! | A15  | Gate Array (write only)                        |
//! | A14  | CRTC: A9-A8 = select, write, status, read      |
//! | A13  | Upper ROM select (write only)                  |
//! | A12  | Printer port (write only)                      |
//! | A11  | PPI: A9-A8 = port A, B, C, control             |
//! | A10  | Expansion: A7 low = FDC, A7 high = other       |
//!
//! Devices are visited in that order. A read starts from 0x00 and each
//! responding device replaces the value, so the last one wins.
//!
//! # Interrupts
//!
//! The bus is the CPU's `InterruptSource`. Each poll is one scanline: the
//! Gate Array counts it and the poll reports whether its interrupt line is
//! high.

#![allow(clippy::cast_possible_truncation)]

use amstrad_gate_array::{GateArray, Register};
use emu_core::{Bus, IntRequest, InterruptSource};
use gi_ay_3_8910::{Ay3_8910, BusFunction};
use intel_8255::Ppi8255;
use log::{debug, trace};
use motorola_6845::Crtc6845;
use nec_upd765::Upd765;

use crate::keyboard::KeyboardMatrix;
use crate::memory::CpcMemory;

/// PPI port B bits.
const PORT_B_VSYNC: u8 = 0x01;
const PORT_B_50HZ: u8 = 0x10;
const PORT_B_EXP: u8 = 0x20;
const PORT_B_PRINTER_BUSY: u8 = 0x40;
const PORT_B_CASSETTE: u8 = 0x80;

/// The CPC bus, implementing `emu_core::Bus`.
///
/// Owns the memory and every peripheral. The CPU reaches all of them
/// through the `Bus` trait.
pub struct CpcBus {
    pub memory: CpcMemory,
    pub gate_array: GateArray,
    pub crtc: Crtc6845,
    pub ppi: Ppi8255,
    pub psg: Ay3_8910,
    pub fdc: Upd765,
    pub keyboard: KeyboardMatrix,
    /// Manufacturer strap, 3 bits.
    manufacturer: u8,
    refresh_50hz: bool,
    /// Level on the cassette read line.
    pub cassette_in: bool,
    /// No printer attached reads as busy.
    pub printer_busy: bool,
    /// /EXP: low when an expansion claims the line.
    pub expansion_present: bool,
    /// Last byte written to the printer port.
    printer_data: u8,
    /// Gate Array interrupts raised since power-on.
    interrupts: u64,
    /// 52-line groups with VSYNC started since power-on.
    vsync_groups: u64,
}

impl CpcBus {
    #[must_use]
    pub fn new(memory: CpcMemory) -> Self {
        Self {
            memory,
            gate_array: GateArray::new(),
            crtc: Crtc6845::new(),
            ppi: Ppi8255::new(),
            psg: Ay3_8910::new(),
            fdc: Upd765::new(),
            keyboard: KeyboardMatrix::new(),
            manufacturer: 7,
            refresh_50hz: true,
            cassette_in: false,
            printer_busy: true,
            expansion_present: false,
            printer_data: 0,
            interrupts: 0,
            vsync_groups: 0,
        }
    }

    /// Return every device to its power-on state. RAM contents, inserted
    /// disks and the port B straps survive.
    pub fn reset(&mut self) {
        self.gate_array.reset();
        self.crtc.reset();
        self.ppi.reset();
        self.psg.reset();
        self.fdc.reset();
        self.keyboard.release_all();
        self.memory.select_upper_rom(0);
        self.remap();
        self.printer_data = 0;
        self.interrupts = 0;
        self.vsync_groups = 0;
    }

    pub fn set_manufacturer(&mut self, code: u8) {
        self.manufacturer = code & 7;
    }

    pub fn set_refresh_50hz(&mut self, fifty: bool) {
        self.refresh_50hz = fifty;
    }

    #[must_use]
    pub fn interrupts(&self) -> u64 {
        self.interrupts
    }

    #[must_use]
    pub fn vsync_groups(&self) -> u64 {
        self.vsync_groups
    }

    #[must_use]
    pub fn printer_data(&self) -> u8 {
        self.printer_data
    }

    /// Levels the hardware drives onto PPI port B.
    #[must_use]
    pub fn port_b_input(&self) -> u8 {
        let mut value = self.manufacturer << 1;
        if self.gate_array.vsync() {
            value |= PORT_B_VSYNC;
        }
        if self.refresh_50hz {
            value |= PORT_B_50HZ;
        }
        if self.expansion_present {
            value |= PORT_B_EXP;
        }
        if self.printer_busy {
            value |= PORT_B_PRINTER_BUSY;
        }
        if self.cassette_in {
            value |= PORT_B_CASSETTE;
        }
        value
    }

    /// Keyboard line selected by PPI port C bits 3-0.
    #[must_use]
    pub fn keyboard_line(&self) -> u8 {
        self.ppi.port_c_output() & 0x0F
    }

    /// PSG bus function on PPI port C bits 7-6.
    fn psg_function(&self) -> BusFunction {
        let c = self.ppi.port_c_output();
        BusFunction::from_pins(c & 0x80 != 0, c & 0x40 != 0)
    }

    /// Rebuild the bank tables from the Gate Array and ROM select.
    pub fn remap(&mut self) {
        self.memory
            .remap(self.gate_array.rom_config(), self.gate_array.ram_config());
    }

    fn ppi_read(&mut self, port: u8) -> u8 {
        match port {
            0 => {
                self.ppi.external_a = if self.psg_function() == BusFunction::Read {
                    self.psg.port_a_input = self.keyboard.read(self.keyboard_line());
                    self.psg.read_data()
                } else {
                    0xFF
                };
            }
            1 => self.ppi.external_b = self.port_b_input(),
            _ => {}
        }
        self.ppi.read(port)
    }

    fn ppi_write(&mut self, port: u8, value: u8) {
        self.ppi.write(port, value);
        if port == 1 {
            return;
        }
        // The PSG sees port A whenever port C asks it to latch
        let data = self.ppi.port_a_output();
        match self.psg_function() {
            BusFunction::Write => self.psg.write_data(data),
            BusFunction::Address => self.psg.select_register(data),
            BusFunction::Read | BusFunction::Inactive => {}
        }
    }

    fn expansion_read(&mut self, port: u16) -> u8 {
        if port & 0x0080 != 0 {
            debug!("expansion read {port:04X} (no device)");
            return 0x00;
        }
        match (port & 0x0100 != 0, port & 0x0001 != 0) {
            (true, false) => self.fdc.read_msr(),
            (true, true) => self.fdc.read_data(),
            (false, _) => {
                trace!("FDC motor port read {port:04X}");
                0x00
            }
        }
    }

    fn expansion_write(&mut self, port: u16, value: u8) {
        if port & 0x0080 != 0 {
            debug!("expansion write {port:04X} <- {value:02X} (no device)");
            return;
        }
        match (port & 0x0100 != 0, port & 0x0001 != 0) {
            (false, _) => self.fdc.set_motor(value & 1 != 0),
            (true, true) => self.fdc.write_data(value),
            (true, false) => trace!("FDC status port write {port:04X} <- {value:02X}"),
        }
    }
}

impl Bus for CpcBus {
    fn read(&mut self, addr: u16) -> u8 {
        self.memory.read(addr)
    }

    fn write(&mut self, addr: u16, value: u8) {
        self.memory.write(addr, value);
    }

    fn io_read(&mut self, port: u16) -> u8 {
        let function = ((port >> 8) & 3) as u8;
        let mut value = 0x00;

        if port & 0x4000 == 0 {
            match function {
                2 => value = self.crtc.status(),
                3 => value = self.crtc.read(),
                _ => {}
            }
        }
        if port & 0x0800 == 0 {
            value = self.ppi_read(function);
        }
        if port & 0x0400 == 0 {
            value = self.expansion_read(port);
        }

        value
    }

    fn io_write(&mut self, port: u16, value: u8) {
        let function = ((port >> 8) & 3) as u8;
        let mut remap = false;

        if port & 0x8000 == 0 {
            remap = matches!(
                self.gate_array.write(value),
                Register::RomConfig | Register::RamConfig
            );
        }
        if port & 0x4000 == 0 {
            match function {
                0 => self.crtc.select(value),
                1 => self.crtc.write(value),
                _ => {}
            }
        }
        if port & 0x2000 == 0 {
            self.memory.select_upper_rom(value);
            remap = true;
        }
        if port & 0x1000 == 0 {
            debug!("printer <- {value:02X}");
            self.printer_data = value;
        }
        if port & 0x0800 == 0 {
            self.ppi_write(function, value);
        }
        if port & 0x0400 == 0 {
            self.expansion_write(port, value);
        }

        if remap {
            self.remap();
        }
    }

    fn int_ack(&mut self) -> u8 {
        self.gate_array.acknowledge();
        0xFF
    }
}

impl InterruptSource for CpcBus {
    fn poll_interrupt(&mut self) -> IntRequest {
        if self.gate_array.scanline() {
            self.interrupts += 1;
            if self.gate_array.vsync() {
                self.vsync_groups += 1;
            }
        }
        if self.gate_array.int_request() {
            IntRequest::Int
        } else {
            IntRequest::None
        }
    }
}
