//! Top-level CPC system.
//!
//! The Z80 runs at 4 MHz with every instruction stretched to whole
//! microseconds by the Gate Array, so one 64 µs scanline is 256 T-states.
//! The CPU's instruction period is set to exactly that: each call to
//! `Z80::execute` runs one scanline and then polls the bus, which advances
//! the Gate Array's line counter.
//!
//! # Frame loop
//!
//! `tick()` runs 312 scanlines (one PAL frame, six Gate Array interrupts)
//! and then renders the frame, unless frame skipping is on and the host has
//! fallen behind.

#![allow(clippy::cast_possible_truncation)]

use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use amstrad_gate_array::Monitor;
use emu_core::{Cpu, Observable, Value};
use log::{info, warn};
use nec_upd765::DiskImage;
use zilog_z80::{DEFAULT_IPERIOD, Z80};

use crate::bus::CpcBus;
use crate::config::{CpcConfig, CpcModel, KeyboardLayout, Manufacturer, Refresh};
use crate::input::{CpcKey, InputQueue};
use crate::memory::CpcMemory;
use crate::sna;
use crate::video::{self, Framebuffer, PixelFormat};

/// Scanlines per frame.
pub const LINES_PER_FRAME: u32 = 312;

/// What one `tick()` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameReport {
    /// Gate Array interrupts raised.
    pub interrupts: u32,
    /// 52-line groups that began with VSYNC.
    pub vsync_groups: u32,
    /// Whether the framebuffer was redrawn.
    pub rendered: bool,
}

/// Running totals since the last reset.
#[derive(Debug, Clone, Copy, Default)]
struct Statistics {
    frames: u64,
    rendered: u64,
    skipped: u64,
}

/// Amstrad CPC system.
pub struct Cpc {
    cpu: Z80,
    bus: CpcBus,
    config: CpcConfig,
    framebuffer: Framebuffer,
    /// Completed frame counter.
    frame_count: u64,
    /// Timed input event queue for scripted key sequences.
    input_queue: InputQueue,
    /// Wall-clock time of the previous frame, for frame skipping.
    last_frame: Option<Instant>,
    stats: Statistics,
}

impl Cpc {
    /// Create a CPC from the given configuration and reset it.
    ///
    /// # Errors
    ///
    /// Returns an error if the system ROM is missing or malformed, the RAM
    /// size is not supported, or an expansion ROM doesn't fit its slot.
    pub fn new(config: &CpcConfig) -> Result<Self, String> {
        let memory = build_memory(config)?;

        let mut bus = CpcBus::new(memory);
        bus.set_manufacturer(config.manufacturer.code());
        bus.set_refresh_50hz(config.refresh == Refresh::Hz50);

        let mut cpu = Z80::new();
        cpu.set_iperiod(DEFAULT_IPERIOD);

        let mut cpc = Self {
            cpu,
            bus,
            config: config.clone(),
            framebuffer: Framebuffer::new(config.pixel_format, config.monitor),
            frame_count: 0,
            input_queue: InputQueue::new(),
            last_frame: None,
            stats: Statistics::default(),
        };
        cpc.reset();
        info!("{}", cpc.system_info());
        Ok(cpc)
    }

    /// Return to the power-on state. RAM contents and inserted disks
    /// survive, as on the real machine.
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.bus.reset();
        self.framebuffer.clear();
        self.frame_count = 0;
        self.input_queue = InputQueue::new();
        self.last_frame = None;
        self.stats = Statistics::default();
    }

    /// Run one frame.
    ///
    /// Processes any pending input queue events first, then runs 312
    /// scanlines and renders.
    pub fn tick(&mut self) -> FrameReport {
        self.input_queue
            .process(self.frame_count, &mut self.bus.keyboard);

        let interrupts = self.bus.interrupts();
        let vsync_groups = self.bus.vsync_groups();

        for _ in 0..LINES_PER_FRAME {
            self.cpu.execute(&mut self.bus);
            // The Gate Array can drop its request (ROM config bit 4) before
            // the CPU takes it.
            if self.cpu.int_pending() && !self.bus.gate_array.int_request() {
                self.cpu.clear_interrupt();
            }
        }

        let rendered = self.frame_due(Instant::now());
        if rendered {
            video::render(
                &mut self.framebuffer,
                &self.bus.crtc,
                &self.bus.gate_array,
                &self.bus.memory,
            );
            self.stats.rendered += 1;
        } else {
            self.stats.skipped += 1;
        }
        self.stats.frames += 1;
        self.frame_count += 1;

        FrameReport {
            interrupts: (self.bus.interrupts() - interrupts) as u32,
            vsync_groups: (self.bus.vsync_groups() - vsync_groups) as u32,
            rendered,
        }
    }

    /// Whether the frame finishing at `now` should be drawn. With frame
    /// skipping on, a frame that took longer than the refresh budget since
    /// the previous one is dropped.
    fn frame_due(&mut self, now: Instant) -> bool {
        let budget = Duration::from_micros(self.config.refresh.frame_micros());
        let due = !self.config.frame_skip
            || self
                .last_frame
                .is_none_or(|last| now.duration_since(last) <= budget);
        self.last_frame = Some(now);
        due
    }

    // Snapshots

    /// Load a `.SNA` snapshot.
    ///
    /// # Errors
    ///
    /// A file that can't be read leaves the machine untouched. A file that
    /// reads but doesn't hold a usable snapshot resets the machine.
    pub fn load_snapshot(&mut self, path: &Path) -> Result<(), String> {
        let data = fs::read(path).map_err(|e| format!("{}: {e}", path.display()))?;
        if let Err(e) = sna::load_sna(self, &data) {
            warn!("snapshot {} rejected: {e}", path.display());
            self.reset();
            return Err(e);
        }
        info!("loaded snapshot {}", path.display());
        Ok(())
    }

    /// Save the machine state as a version 3 `.SNA` snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the file can't be written.
    pub fn save_snapshot(&self, path: &Path) -> Result<(), String> {
        fs::write(path, sna::save_sna(self)).map_err(|e| format!("{}: {e}", path.display()))?;
        info!("saved snapshot {}", path.display());
        Ok(())
    }

    // Disks

    /// Insert a DSK or EDSK image file into drive 0 (A) or 1 (B).
    ///
    /// # Errors
    ///
    /// Returns an error for a bad drive number, an unreadable file or an
    /// image that doesn't parse.
    pub fn insert_disk(&mut self, drive: usize, path: &Path) -> Result<(), String> {
        check_drive(drive)?;
        let data = fs::read(path).map_err(|e| format!("{}: {e}", path.display()))?;
        let image = DiskImage::parse(&data).map_err(|e| format!("{}: {e}", path.display()))?;
        self.insert_disk_image(drive, image)?;
        info!("drive {}: inserted {}", drive_letter(drive), path.display());
        Ok(())
    }

    /// Insert an already-parsed disk image.
    ///
    /// # Errors
    ///
    /// Returns an error for a bad drive number.
    pub fn insert_disk_image(&mut self, drive: usize, image: DiskImage) -> Result<(), String> {
        check_drive(drive)?;
        self.bus.fdc.insert_disk(drive, image);
        Ok(())
    }

    /// Eject the disk in `drive`, returning it.
    pub fn remove_disk(&mut self, drive: usize) -> Option<DiskImage> {
        if drive > 1 {
            return None;
        }
        let image = self.bus.fdc.eject_disk(drive);
        if image.as_ref().is_some_and(DiskImage::is_modified) {
            warn!("drive {}: ejected with unsaved changes", drive_letter(drive));
        }
        image
    }

    /// Write the disk in `drive` back out as an image file.
    ///
    /// # Errors
    ///
    /// Returns an error if the drive is empty or the file can't be written.
    pub fn save_disk(&mut self, drive: usize, path: &Path) -> Result<(), String> {
        check_drive(drive)?;
        let Some(image) = self.bus.fdc.disk_mut(drive) else {
            return Err(format!("drive {}: no disk", drive_letter(drive)));
        };
        fs::write(path, image.to_bytes()).map_err(|e| format!("{}: {e}", path.display()))?;
        image.mark_saved();
        info!("drive {}: saved to {}", drive_letter(drive), path.display());
        Ok(())
    }

    // Keyboard

    /// Press or release every key in `mask` on matrix line `line`.
    pub fn key_event(&mut self, line: usize, mask: u8, pressed: bool) {
        self.bus.keyboard.key_event(line, mask, pressed);
    }

    /// Press a key immediately (stays pressed until released).
    pub fn press_key(&mut self, key: CpcKey) {
        let (line, mask) = key.line_mask();
        self.key_event(line, mask, true);
    }

    /// Release a key.
    pub fn release_key(&mut self, key: CpcKey) {
        let (line, mask) = key.line_mask();
        self.key_event(line, mask, false);
    }

    /// Release all keys.
    pub fn release_all_keys(&mut self) {
        self.bus.keyboard.release_all();
    }

    /// Queue `text` to be typed from the current frame on, using the
    /// configured keyboard layout. Returns the frame typing finishes.
    pub fn type_text(&mut self, text: &str) -> u64 {
        self.input_queue
            .enqueue_text(text, self.frame_count, self.config.keyboard)
    }

    // Configuration

    /// Switch model. RAM is rebuilt when the size follows the model, and
    /// the machine is reset.
    ///
    /// # Errors
    ///
    /// Returns an error if the new memory can't be built; the old model
    /// stays in place.
    pub fn set_model(&mut self, model: CpcModel) -> Result<(), String> {
        let mut config = self.config.clone();
        config.model = model;
        self.rebuild(config)
    }

    /// Set the RAM size in KB, or `None` for the model default. Resets.
    ///
    /// # Errors
    ///
    /// Returns an error for an unsupported size; the old size stays.
    pub fn set_ram_kb(&mut self, ram_kb: Option<u16>) -> Result<(), String> {
        let mut config = self.config.clone();
        config.ram_kb = ram_kb;
        self.rebuild(config)
    }

    fn rebuild(&mut self, config: CpcConfig) -> Result<(), String> {
        let memory = build_memory(&config)?;
        self.bus.memory = memory;
        self.config = config;
        self.reset();
        info!("{}", self.system_info());
        Ok(())
    }

    pub fn set_monitor(&mut self, monitor: Monitor) {
        self.config.monitor = monitor;
        self.framebuffer.set_monitor(monitor);
    }

    pub fn set_refresh(&mut self, refresh: Refresh) {
        self.config.refresh = refresh;
        self.bus.set_refresh_50hz(refresh == Refresh::Hz50);
    }

    pub fn set_keyboard_layout(&mut self, layout: KeyboardLayout) {
        self.config.keyboard = layout;
    }

    pub fn set_manufacturer(&mut self, manufacturer: Manufacturer) {
        self.config.manufacturer = manufacturer;
        self.bus.set_manufacturer(manufacturer.code());
    }

    pub fn set_pixel_format(&mut self, format: PixelFormat) {
        self.config.pixel_format = format;
        self.framebuffer.set_format(format);
    }

    pub fn set_frame_skip(&mut self, enabled: bool) {
        self.config.frame_skip = enabled;
    }

    // Accessors

    #[must_use]
    pub fn config(&self) -> &CpcConfig {
        &self.config
    }

    #[must_use]
    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    /// Reference to the CPU.
    #[must_use]
    pub fn cpu(&self) -> &Z80 {
        &self.cpu
    }

    /// Mutable reference to the CPU.
    pub fn cpu_mut(&mut self) -> &mut Z80 {
        &mut self.cpu
    }

    /// Reference to the bus.
    #[must_use]
    pub fn bus(&self) -> &CpcBus {
        &self.bus
    }

    /// Mutable reference to the bus.
    pub fn bus_mut(&mut self) -> &mut CpcBus {
        &mut self.bus
    }

    /// Completed frame count.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Mutable reference to the timed input queue.
    pub fn input_queue(&mut self) -> &mut InputQueue {
        &mut self.input_queue
    }

    // Status

    /// One-line description of the emulated machine.
    #[must_use]
    pub fn system_info(&self) -> String {
        let roms = self
            .bus
            .memory
            .populated_slots()
            .iter()
            .map(u8::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "{}, {} KB RAM, {} monitor, {} Hz, {} keyboard, {:?}; upper ROMs: {roms}",
            self.config.model.name(),
            self.bus.memory.ram_kb(),
            monitor_name(self.config.monitor),
            match self.config.refresh {
                Refresh::Hz50 => 50,
                Refresh::Hz60 => 60,
            },
            match self.config.keyboard {
                KeyboardLayout::Qwerty => "QWERTY",
                KeyboardLayout::Azerty => "AZERTY",
            },
            self.config.manufacturer,
        )
    }

    /// Drive state, e.g. `A: 40 cyl, 1 side, cylinder 2, motor on`.
    #[must_use]
    pub fn drive_status(&self, drive: usize) -> String {
        if drive > 1 {
            return format!("drive {drive}: not fitted");
        }
        let letter = drive_letter(drive);
        let motor = if self.bus.fdc.motor() { "on" } else { "off" };
        let Some(disk) = self.bus.fdc.disk(drive) else {
            return format!("{letter}: empty, motor {motor}");
        };
        format!(
            "{letter}: {} cyl, {} side{}, cylinder {}, motor {motor}{}{}",
            disk.cylinders(),
            disk.sides(),
            if disk.sides() == 1 { "" } else { "s" },
            self.bus.fdc.cylinder(drive),
            if disk.is_extended() { ", extended" } else { "" },
            if disk.is_modified() { ", modified" } else { "" },
        )
    }

    /// Frame and CPU counters since the last reset.
    #[must_use]
    pub fn statistics(&self) -> String {
        format!(
            "frames {}, rendered {}, skipped {}, interrupts {}, T-states {}",
            self.stats.frames,
            self.stats.rendered,
            self.stats.skipped,
            self.bus.interrupts(),
            self.cpu.total_t_states(),
        )
    }
}

fn build_memory(config: &CpcConfig) -> Result<CpcMemory, String> {
    let mut memory = CpcMemory::new(config.ram_kb(), &config.system_rom)?;
    for (slot, image) in &config.expansion_roms {
        memory.load_upper_rom(*slot, image)?;
    }
    Ok(memory)
}

fn check_drive(drive: usize) -> Result<(), String> {
    if drive > 1 {
        return Err(format!("drive {drive} does not exist (0 = A, 1 = B)"));
    }
    Ok(())
}

fn drive_letter(drive: usize) -> char {
    if drive == 0 { 'A' } else { 'B' }
}

fn monitor_name(monitor: Monitor) -> &'static str {
    match monitor {
        Monitor::Colour => "colour",
        Monitor::Green => "green",
        Monitor::Grey => "grey",
    }
}

/// Parse `memory.<addr>` in decimal, `0x` hex or `&` hex.
fn parse_address(text: &str) -> Option<u16> {
    if let Some(hex) = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .or_else(|| text.strip_prefix('&'))
    {
        u16::from_str_radix(hex, 16).ok()
    } else {
        text.parse().ok()
    }
}

impl Observable for Cpc {
    fn query(&self, path: &str) -> Option<Value> {
        let bus = &self.bus;
        if let Some(rest) = path.strip_prefix("cpu.") {
            self.cpu.query(rest)
        } else if let Some(rest) = path.strip_prefix("crtc.") {
            match rest {
                "selected" => Some(bus.crtc.selected().into()),
                "registers" => Some(Value::from(&bus.crtc.registers()[..])),
                _ => {
                    let reg: usize = rest.strip_prefix('r')?.parse().ok()?;
                    (reg < motorola_6845::REGISTER_COUNT).then(|| bus.crtc.register(reg).into())
                }
            }
        } else if let Some(rest) = path.strip_prefix("ga.") {
            let ga = &bus.gate_array;
            match rest {
                "pen" => Some(ga.pen().into()),
                "inks" => Some(Value::from(&ga.inks()[..])),
                "mode" => Some(ga.mode().into()),
                "rom_config" => Some(ga.rom_config().into()),
                "ram_config" => Some(ga.ram_config().into()),
                "line_counter" => Some(ga.line_counter().into()),
                "int_request" => Some(ga.int_request().into()),
                "vsync" => Some(ga.vsync().into()),
                _ => None,
            }
        } else if let Some(rest) = path.strip_prefix("ppi.") {
            match rest {
                "a" => Some(bus.ppi.port_a().into()),
                "b" => Some(bus.port_b_input().into()),
                "c" => Some(bus.ppi.port_c().into()),
                "control" => Some(bus.ppi.control().into()),
                _ => None,
            }
        } else if let Some(rest) = path.strip_prefix("psg.") {
            match rest {
                "selected" => Some(bus.psg.selected_register().into()),
                "registers" => Some(Value::from(&bus.psg.registers()[..])),
                _ => None,
            }
        } else if let Some(rest) = path.strip_prefix("fdc.") {
            match rest {
                "msr" => Some(bus.fdc.read_msr().into()),
                "motor" => Some(bus.fdc.motor().into()),
                _ => None,
            }
        } else if let Some(rest) = path.strip_prefix("memory.") {
            parse_address(rest).map(|addr| Value::U8(bus.memory.read(addr)))
        } else {
            match path {
                "frame_count" => Some(self.frame_count.into()),
                "rom_select" => Some(bus.memory.rom_select().into()),
                _ => None,
            }
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "cpu.<z80_paths>",
            "crtc.r<0-17>",
            "crtc.selected",
            "crtc.registers",
            "ga.pen",
            "ga.inks",
            "ga.mode",
            "ga.rom_config",
            "ga.ram_config",
            "ga.line_counter",
            "ga.int_request",
            "ga.vsync",
            "ppi.a",
            "ppi.b",
            "ppi.c",
            "ppi.control",
            "psg.selected",
            "psg.registers",
            "fdc.msr",
            "fdc.motor",
            "memory.<address>",
            "frame_count",
            "rom_select",
        ]
    }
}
