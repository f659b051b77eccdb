//! NEC uPD765 floppy disk controller.
//!
//! Standalone IC emulation following the project's chip-level library
//! pattern. Covers the command set AMSDOS and the common CPC disk
//! utilities use, against DSK images held in memory.
//!
//! # Register interface
//!
//! Two externally visible registers:
//! - **Main Status Register (MSR)**: read-only, port &FB7E on the CPC
//! - **Data Register**: read/write, port &FB7F on the CPC
//!
//! The motor line is not part of the chip; on the CPC it is a latch at
//! &FA7E, and the controller only stores it for the host.
//!
//! # State machine
//!
//! Idle → Command (CPU writes parameter bytes) → Execution (CPU moves
//! sector data) → Result (CPU reads status bytes) → Idle.
//!
//! | Phase           | MSR  |
//! |-----------------|------|
//! | Idle            | &80  |
//! | Command         | &90  |
//! | Execution read  | &F0  |
//! | Execution write | &B0  |
//! | Result          | &D0  |

#![allow(clippy::cast_possible_truncation)]

pub mod commands;
pub mod dsk;

use log::debug;

pub use commands::Command;
pub use dsk::{DiskImage, Sector, SectorId, Track};

/// FDC state machine phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for a command byte.
    Idle,
    /// Receiving command parameter bytes.
    Command,
    /// CPU reads sector data.
    ExecutionRead,
    /// CPU supplies sector or format data.
    ExecutionWrite,
    /// CPU reads result bytes.
    Result,
}

impl Phase {
    #[must_use]
    pub fn msr(self) -> u8 {
        match self {
            Phase::Idle => 0x80,
            Phase::Command => 0x90,
            Phase::ExecutionRead => 0xF0,
            Phase::ExecutionWrite => 0xB0,
            Phase::Result => 0xD0,
        }
    }
}

/// One drive slot.
#[derive(Debug, Clone, Default)]
pub struct Drive {
    pub disk: Option<DiskImage>,
    /// Present cylinder number.
    pub cylinder: u8,
    /// Rotational position for READ ID.
    next_id: usize,
}

/// Write awaiting its execution-phase bytes.
#[derive(Debug, Clone)]
pub(crate) enum PendingWrite {
    Sectors {
        drive: usize,
        cylinder: u8,
        head: u8,
        targets: Vec<SectorId>,
        eot: u8,
        st0: u8,
        n: u8,
    },
    Format {
        drive: usize,
        cylinder: u8,
        head: u8,
        gap3: u8,
        filler: u8,
        st0: u8,
        n: u8,
    },
}

/// NEC uPD765 floppy disk controller.
#[derive(Debug, Clone)]
pub struct Upd765 {
    phase: Phase,
    /// Command bytes received so far.
    command: Vec<u8>,
    /// Execution-phase buffer: data to read out, or data written in.
    transfer: Vec<u8>,
    transfer_index: usize,
    /// Bytes expected in an execution write.
    transfer_len: usize,
    /// Result bytes, held back until an execution read drains.
    result: Vec<u8>,
    result_index: usize,
    pending: Option<PendingWrite>,
    /// Seek completions waiting for SENSE INTERRUPT STATUS: (ST0, PCN).
    seek_status: Vec<(u8, u8)>,
    drives: [Drive; 2],
    motor: bool,
    interrupt: bool,
    // SPECIFY parameters, stored only
    step_rate: u8,
    head_unload: u8,
    head_load: u8,
    non_dma: bool,
}

impl Upd765 {
    /// Create a new FDC with no disks inserted.
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            command: Vec::with_capacity(9),
            transfer: Vec::new(),
            transfer_index: 0,
            transfer_len: 0,
            result: Vec::new(),
            result_index: 0,
            pending: None,
            seek_status: Vec::new(),
            drives: [Drive::default(), Drive::default()],
            motor: false,
            interrupt: false,
            step_rate: 0,
            head_unload: 0,
            head_load: 0,
            non_dma: true,
        }
    }

    /// Abandon any command in progress. Disks stay inserted.
    pub fn reset(&mut self) {
        let drives = std::mem::take(&mut self.drives);
        *self = Self::new();
        self.drives = drives;
        for drive in &mut self.drives {
            drive.cylinder = 0;
            drive.next_id = 0;
        }
    }

    /// Read the Main Status Register.
    #[must_use]
    pub fn read_msr(&self) -> u8 {
        self.phase.msr()
    }

    /// Read the data register.
    pub fn read_data(&mut self) -> u8 {
        match self.phase {
            Phase::ExecutionRead => {
                let value = self.transfer.get(self.transfer_index).copied().unwrap_or(0xFF);
                self.transfer_index += 1;
                if self.transfer_index >= self.transfer.len() {
                    self.transfer.clear();
                    self.transfer_index = 0;
                    self.phase = Phase::Result;
                }
                value
            }
            Phase::Result => {
                let value = self.result.get(self.result_index).copied().unwrap_or(0xFF);
                self.result_index += 1;
                if self.result_index >= self.result.len() {
                    self.result.clear();
                    self.result_index = 0;
                    self.phase = Phase::Idle;
                }
                value
            }
            _ => 0xFF,
        }
    }

    /// Write the data register.
    pub fn write_data(&mut self, value: u8) {
        match self.phase {
            Phase::Idle | Phase::Command => {
                if self.phase == Phase::Idle {
                    self.command.clear();
                    self.phase = Phase::Command;
                }
                self.command.push(value);
                if self.command.len() >= Command::decode(self.command[0]).length() {
                    self.execute_command();
                }
            }
            Phase::ExecutionWrite => {
                self.transfer.push(value);
                if self.transfer.len() >= self.transfer_len {
                    self.commit_write();
                }
            }
            Phase::ExecutionRead | Phase::Result => {
                debug!("FDC: data write {value:02X} ignored in {:?}", self.phase);
            }
        }
    }

    /// Insert a disk image into drive 0 or 1.
    pub fn insert_disk(&mut self, drive: usize, image: DiskImage) {
        let unit = &mut self.drives[drive & 1];
        unit.disk = Some(image);
        unit.next_id = 0;
    }

    /// Eject the disk from a drive, returning it.
    pub fn eject_disk(&mut self, drive: usize) -> Option<DiskImage> {
        self.drives[drive & 1].disk.take()
    }

    #[must_use]
    pub fn disk(&self, drive: usize) -> Option<&DiskImage> {
        self.drives[drive & 1].disk.as_ref()
    }

    pub fn disk_mut(&mut self, drive: usize) -> Option<&mut DiskImage> {
        self.drives[drive & 1].disk.as_mut()
    }

    /// Present cylinder of a drive.
    #[must_use]
    pub fn cylinder(&self, drive: usize) -> u8 {
        self.drives[drive & 1].cylinder
    }

    /// Place a drive's head directly (snapshot restore).
    pub fn set_cylinder(&mut self, drive: usize, cylinder: u8) {
        self.drives[drive & 1].cylinder = cylinder;
    }

    pub fn set_motor(&mut self, on: bool) {
        self.motor = on;
    }

    #[must_use]
    pub fn motor(&self) -> bool {
        self.motor
    }

    /// Interrupt line. The CPC leaves it unconnected; it is exposed for
    /// debuggers.
    #[must_use]
    pub fn interrupt(&self) -> bool {
        self.interrupt
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// SPECIFY step rate, head unload and head load times.
    #[must_use]
    pub fn timings(&self) -> (u8, u8, u8) {
        (self.step_rate, self.head_unload, self.head_load)
    }

    #[must_use]
    pub fn non_dma(&self) -> bool {
        self.non_dma
    }

    /// Enter the result phase with the given bytes.
    pub(crate) fn finish(&mut self, result: Vec<u8>) {
        self.result = result;
        self.result_index = 0;
        self.phase = Phase::Result;
    }

    /// Enter an execution read; `result` follows once the data is drained.
    pub(crate) fn begin_read(&mut self, data: Vec<u8>, result: Vec<u8>) {
        self.transfer = data;
        self.transfer_index = 0;
        self.result = result;
        self.result_index = 0;
        self.phase = Phase::ExecutionRead;
    }

    /// Enter an execution write expecting `len` bytes.
    pub(crate) fn begin_write(&mut self, len: usize) {
        self.transfer.clear();
        self.transfer_len = len;
        self.phase = Phase::ExecutionWrite;
    }
}

impl Default for Upd765 {
    fn default() -> Self {
        Self::new()
    }
}
