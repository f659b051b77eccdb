//! Amstrad CPC emulator binary.
//!
//! Headless: runs a number of frames, then writes a screenshot and/or a
//! snapshot. Settings come from flags, optionally layered over a TOML file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Parser, ValueEnum};
use emu_cpc::{
    Cpc, CpcConfig, CpcModel, KeyboardLayout, Manufacturer, Monitor, Refresh, capture,
};
use log::{LevelFilter, Log, Metadata, Record};
use serde::Deserialize;

// ---------------------------------------------------------------------------
// CLI argument parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
enum ModelArg {
    #[value(name = "464")]
    #[serde(rename = "464")]
    Cpc464,
    #[value(name = "664")]
    #[serde(rename = "664")]
    Cpc664,
    #[value(name = "6128")]
    #[serde(rename = "6128")]
    Cpc6128,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
enum MonitorArg {
    Colour,
    Green,
    Grey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
enum KeyboardArg {
    Qwerty,
    Azerty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ManufacturerArg {
    Amstrad,
    Schneider,
    Isp,
    Triumph,
    Saisho,
    Solavox,
    Awa,
    Orion,
}

/// Amstrad CPC 464/664/6128 emulator (headless).
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// Machine model
    #[arg(long, value_enum)]
    model: Option<ModelArg>,

    /// Monitor type
    #[arg(long, value_enum)]
    monitor: Option<MonitorArg>,

    /// Keyboard layout used for --type
    #[arg(long, value_enum)]
    keyboard: Option<KeyboardArg>,

    /// Refresh rate in Hz
    #[arg(long, value_parser = clap::builder::PossibleValuesParser::new(["50", "60"]))]
    refresh: Option<String>,

    /// Name shown by the firmware at power-on
    #[arg(long, value_enum)]
    manufacturer: Option<ManufacturerArg>,

    /// RAM in KB (64-576, multiple of 64) [default: model standard]
    #[arg(long)]
    ram: Option<u16>,

    /// 32K system ROM (OS followed by BASIC)
    #[arg(long)]
    system_rom: Option<PathBuf>,

    /// Upper ROM in a slot, e.g. 7=amsdos.rom (repeatable)
    #[arg(long = "rom", value_name = "SLOT=PATH", value_parser = parse_rom_arg)]
    roms: Vec<(u8, PathBuf)>,

    /// Load a .SNA snapshot after reset
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Disk image for drive A
    #[arg(long)]
    drive_a: Option<PathBuf>,

    /// Disk image for drive B
    #[arg(long)]
    drive_b: Option<PathBuf>,

    /// Frames to run [default: 200]
    #[arg(long)]
    frames: Option<u32>,

    /// Save a PNG screenshot after the last frame
    #[arg(long)]
    screenshot: Option<PathBuf>,

    /// Save a .SNA snapshot after the last frame
    #[arg(long)]
    save_snapshot: Option<PathBuf>,

    /// TOML file with default settings; flags override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Type text into the CPC (use \n for Return)
    #[arg(long = "type")]
    type_text: Option<String>,

    /// Frame at which to start typing
    #[arg(long, default_value_t = 100)]
    type_at: u64,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn parse_rom_arg(s: &str) -> Result<(u8, PathBuf), String> {
    let (slot, path) = s
        .split_once('=')
        .ok_or_else(|| format!("expected SLOT=PATH, got '{s}'"))?;
    let slot = slot
        .trim()
        .parse::<u8>()
        .map_err(|e| format!("bad ROM slot '{slot}': {e}"))?;
    Ok((slot, PathBuf::from(path)))
}

// ---------------------------------------------------------------------------
// Configuration file
// ---------------------------------------------------------------------------

/// Settings file. Every key is optional.
///
/// ```toml
/// model = "6128"
/// monitor = "green"
/// refresh = 50
/// system_rom = "roms/cpc6128.rom"
///
/// [roms]
/// 7 = "roms/amsdos.rom"
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    model: Option<ModelArg>,
    monitor: Option<MonitorArg>,
    keyboard: Option<KeyboardArg>,
    refresh: Option<u32>,
    manufacturer: Option<ManufacturerArg>,
    ram: Option<u16>,
    system_rom: Option<PathBuf>,
    roms: BTreeMap<String, PathBuf>,
    drive_a: Option<PathBuf>,
    drive_b: Option<PathBuf>,
    frames: Option<u32>,
}

fn load_file_config(path: &Path) -> Result<FileConfig, String> {
    let text = fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))?;
    toml::from_str(&text).map_err(|e| format!("{}: {e}", path.display()))
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}: {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

fn fail(message: &str) -> ! {
    eprintln!("{message}");
    process::exit(1);
}

fn read_file(what: &str, path: &Path) -> Vec<u8> {
    fs::read(path).unwrap_or_else(|e| fail(&format!("Failed to read {what} {}: {e}", path.display())))
}

fn make_config(args: &Args, file: &FileConfig) -> CpcConfig {
    let Some(rom_path) = args.system_rom.as_ref().or(file.system_rom.as_ref()) else {
        fail("No system ROM: pass --system-rom <file> or set system_rom in the config file");
    };
    let system_rom = read_file("system ROM", rom_path);

    let model = match args.model.or(file.model).unwrap_or(ModelArg::Cpc6128) {
        ModelArg::Cpc464 => CpcModel::Cpc464,
        ModelArg::Cpc664 => CpcModel::Cpc664,
        ModelArg::Cpc6128 => CpcModel::Cpc6128,
    };
    let mut config = CpcConfig::new(model, system_rom);
    // Headless runs draw every frame so screenshots are reproducible
    config.frame_skip = false;

    if let Some(monitor) = args.monitor.or(file.monitor) {
        config.monitor = match monitor {
            MonitorArg::Colour => Monitor::Colour,
            MonitorArg::Green => Monitor::Green,
            MonitorArg::Grey => Monitor::Grey,
        };
    }
    if let Some(keyboard) = args.keyboard.or(file.keyboard) {
        config.keyboard = match keyboard {
            KeyboardArg::Qwerty => KeyboardLayout::Qwerty,
            KeyboardArg::Azerty => KeyboardLayout::Azerty,
        };
    }
    let refresh = args
        .refresh
        .as_deref()
        .and_then(|s| s.parse().ok())
        .or(file.refresh);
    match refresh {
        None | Some(50) => {}
        Some(60) => config.refresh = Refresh::Hz60,
        Some(other) => fail(&format!("Refresh must be 50 or 60, got {other}")),
    }
    if let Some(manufacturer) = args.manufacturer.or(file.manufacturer) {
        config.manufacturer = match manufacturer {
            ManufacturerArg::Amstrad => Manufacturer::Amstrad,
            ManufacturerArg::Schneider => Manufacturer::Schneider,
            ManufacturerArg::Isp => Manufacturer::Isp,
            ManufacturerArg::Triumph => Manufacturer::Triumph,
            ManufacturerArg::Saisho => Manufacturer::Saisho,
            ManufacturerArg::Solavox => Manufacturer::Solavox,
            ManufacturerArg::Awa => Manufacturer::Awa,
            ManufacturerArg::Orion => Manufacturer::Orion,
        };
    }
    config.ram_kb = args.ram.or(file.ram);

    // File ROMs first so a flag for the same slot replaces them
    let mut roms = BTreeMap::new();
    for (slot, path) in &file.roms {
        let slot: u8 = slot
            .parse()
            .unwrap_or_else(|_| fail(&format!("Bad ROM slot '{slot}' in config file")));
        roms.insert(slot, path.clone());
    }
    for (slot, path) in &args.roms {
        roms.insert(*slot, path.clone());
    }
    config.expansion_roms = roms
        .into_iter()
        .map(|(slot, path)| (slot, read_file("ROM", &path)))
        .collect();

    config
}

fn make_cpc(args: &Args, file: &FileConfig) -> Cpc {
    let config = make_config(args, file);
    let mut cpc = Cpc::new(&config).unwrap_or_else(|e| fail(&format!("Failed to start: {e}")));

    for (drive, path) in [
        (0, args.drive_a.as_ref().or(file.drive_a.as_ref())),
        (1, args.drive_b.as_ref().or(file.drive_b.as_ref())),
    ] {
        if let Some(path) = path {
            if let Err(e) = cpc.insert_disk(drive, path) {
                fail(&format!("Failed to insert disk: {e}"));
            }
            eprintln!("{}", cpc.drive_status(drive));
        }
    }

    if let Some(path) = &args.snapshot {
        if let Err(e) = cpc.load_snapshot(path) {
            fail(&format!("Failed to load snapshot: {e}"));
        }
        eprintln!("Loaded snapshot: {}", path.display());
    }

    if let Some(text) = &args.type_text {
        let text = text.replace("\\n", "\n");
        let layout = config.keyboard;
        let start = cpc.frame_count() + args.type_at;
        cpc.input_queue().enqueue_text(&text, start, layout);
    }

    cpc
}

// ---------------------------------------------------------------------------
// Headless run
// ---------------------------------------------------------------------------

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    let file = match &args.config {
        Some(path) => load_file_config(path).unwrap_or_else(|e| fail(&format!("Bad config file: {e}"))),
        None => FileConfig::default(),
    };

    let mut cpc = make_cpc(&args, &file);
    eprintln!("{}", cpc.system_info());

    let frames = args.frames.or(file.frames).unwrap_or(200);
    for _ in 0..frames {
        cpc.tick();
    }

    if let Some(path) = &args.screenshot {
        if let Err(e) = capture::save_screenshot(&cpc, path) {
            fail(&format!("Screenshot error: {e}"));
        }
        eprintln!("Screenshot saved to {}", path.display());
    }

    if let Some(path) = &args.save_snapshot {
        if let Err(e) = cpc.save_snapshot(path) {
            fail(&format!("Snapshot error: {e}"));
        }
        eprintln!("Snapshot saved to {}", path.display());
    }

    eprintln!("{}", cpc.statistics());
}
