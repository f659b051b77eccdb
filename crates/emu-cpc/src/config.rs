//! CPC model configuration.

use amstrad_gate_array::Monitor;

use crate::video::PixelFormat;

/// Supported CPC models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpcModel {
    Cpc464,
    Cpc664,
    Cpc6128,
}

impl CpcModel {
    /// RAM fitted as standard, in KB.
    #[must_use]
    pub fn default_ram_kb(self) -> u16 {
        match self {
            CpcModel::Cpc464 | CpcModel::Cpc664 => 64,
            CpcModel::Cpc6128 => 128,
        }
    }

    /// CPC type byte used by snapshots.
    #[must_use]
    pub fn snapshot_type(self) -> u8 {
        match self {
            CpcModel::Cpc464 => 0,
            CpcModel::Cpc664 => 1,
            CpcModel::Cpc6128 => 2,
        }
    }

    #[must_use]
    pub fn from_snapshot_type(value: u8) -> Option<Self> {
        match value {
            0 => Some(CpcModel::Cpc464),
            1 => Some(CpcModel::Cpc664),
            2 => Some(CpcModel::Cpc6128),
            _ => None,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            CpcModel::Cpc464 => "CPC 464",
            CpcModel::Cpc664 => "CPC 664",
            CpcModel::Cpc6128 => "CPC 6128",
        }
    }
}

/// Mains refresh rate, reported on PPI port B bit 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Refresh {
    #[default]
    Hz50,
    Hz60,
}

impl Refresh {
    /// Wall-clock budget for one frame, in microseconds.
    #[must_use]
    pub fn frame_micros(self) -> u64 {
        match self {
            Refresh::Hz50 => 20_000,
            Refresh::Hz60 => 16_667,
        }
    }
}

/// Keyboard fitted to the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyboardLayout {
    #[default]
    Qwerty,
    Azerty,
}

/// Name the firmware prints at power-on, strapped on PPI port B bits 1-3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Manufacturer {
    Isp,
    Triumph,
    Saisho,
    Solavox,
    Awa,
    Schneider,
    Orion,
    #[default]
    Amstrad,
}

impl Manufacturer {
    /// Three-bit code on port B.
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Manufacturer::Orion => 0,
            Manufacturer::Awa => 1,
            Manufacturer::Solavox => 2,
            Manufacturer::Saisho => 3,
            Manufacturer::Triumph => 4,
            Manufacturer::Schneider => 5,
            Manufacturer::Isp => 6,
            Manufacturer::Amstrad => 7,
        }
    }
}

/// Configuration for creating a CPC instance.
#[derive(Debug, Clone)]
pub struct CpcConfig {
    pub model: CpcModel,
    pub monitor: Monitor,
    pub refresh: Refresh,
    pub keyboard: KeyboardLayout,
    pub manufacturer: Manufacturer,
    /// RAM in KB: 64 to 576 in steps of 64. `None` uses the model default.
    pub ram_kb: Option<u16>,
    /// OS ROM followed by BASIC: 32,768 bytes.
    pub system_rom: Vec<u8>,
    /// Upper ROMs by slot, e.g. AMSDOS in slot 7.
    pub expansion_roms: Vec<(u8, Vec<u8>)>,
    pub pixel_format: PixelFormat,
    /// Skip rendering frames that overrun their wall-clock budget.
    pub frame_skip: bool,
}

impl CpcConfig {
    /// A configuration for `model` with every other setting at its default.
    #[must_use]
    pub fn new(model: CpcModel, system_rom: Vec<u8>) -> Self {
        Self {
            model,
            monitor: Monitor::Colour,
            refresh: Refresh::Hz50,
            keyboard: KeyboardLayout::Qwerty,
            manufacturer: Manufacturer::Amstrad,
            ram_kb: None,
            system_rom,
            expansion_roms: Vec::new(),
            pixel_format: PixelFormat::Xrgb8888,
            frame_skip: true,
        }
    }

    #[must_use]
    pub fn ram_kb(&self) -> u16 {
        self.ram_kb.unwrap_or_else(|| self.model.default_ram_kb())
    }
}
