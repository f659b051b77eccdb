//! CPC memory: RAM arena, ROM images and the Gate Array bank tables.
//!
//! The CPU sees four 16K quadrants. Each quadrant has a read bank and a
//! write bank, both `(buffer, offset)` pairs into one of the owned
//! buffers. Writes always land in RAM, so a quadrant showing ROM writes to
//! the RAM underneath it.
//!
//! # RAM configurations (16K blocks per quadrant)
//!
//! | Config | &0000 | &4000 | &8000 | &C000 |
//! |--------|-------|-------|-------|-------|
//! | 0      | 0     | 1     | 2     | 3     |
//! | 1      | 0     | 1     | 2     | 7     |
//! | 2      | 4     | 5     | 6     | 7     |
//! | 3      | 0     | 3     | 2     | 7     |
//! | 4-7    | 0     | 4-7   | 2     | 3     |
//!
//! Blocks 4-7 come from the 64K expansion page in RAM config bits 3-5.
//! A page past the installed RAM falls back to page 0; a 64K machine
//! ignores the RAM config entirely.

#![allow(clippy::cast_possible_truncation)]

pub const BANK_SIZE: usize = 0x4000;
pub const MIN_RAM_KB: u16 = 64;
pub const MAX_RAM_KB: u16 = 576;

const RAM_CONFIGS: [[usize; 4]; 8] = [
    [0, 1, 2, 3],
    [0, 1, 2, 7],
    [4, 5, 6, 7],
    [0, 3, 2, 7],
    [0, 4, 2, 3],
    [0, 5, 2, 3],
    [0, 6, 2, 3],
    [0, 7, 2, 3],
];

/// Which owned buffer a bank points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferId {
    Ram,
    LowerRom,
    UpperRom(u8),
}

/// A 16K window: buffer plus byte offset of its start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bank {
    pub buffer: BufferId,
    pub offset: usize,
}

impl Bank {
    const fn ram(block: usize) -> Self {
        Self {
            buffer: BufferId::Ram,
            offset: block * BANK_SIZE,
        }
    }
}

pub struct CpcMemory {
    ram: Vec<u8>,
    lower_rom: Vec<u8>,
    /// 256 upper ROM slots; slot 0 is BASIC.
    upper_roms: Vec<Option<Vec<u8>>>,
    rom_select: u8,
    read_banks: [Bank; 4],
    write_banks: [Bank; 4],
}

impl CpcMemory {
    /// Build memory from a 32K system ROM (OS then BASIC).
    ///
    /// # Errors
    ///
    /// Fails on a system ROM of the wrong size or a RAM size outside
    /// 64-576 KB or not a multiple of 64.
    pub fn new(ram_kb: u16, system_rom: &[u8]) -> Result<Self, String> {
        if !(MIN_RAM_KB..=MAX_RAM_KB).contains(&ram_kb) || ram_kb % 64 != 0 {
            return Err(format!(
                "RAM size must be a multiple of 64 KB between {MIN_RAM_KB} and {MAX_RAM_KB}, got {ram_kb}"
            ));
        }
        if system_rom.is_empty() {
            return Err("system ROM missing".to_string());
        }
        if system_rom.len() != 2 * BANK_SIZE {
            return Err(format!(
                "system ROM must be {} bytes (OS + BASIC), got {}",
                2 * BANK_SIZE,
                system_rom.len()
            ));
        }

        let mut upper_roms = vec![None; 256];
        upper_roms[0] = Some(system_rom[BANK_SIZE..].to_vec());

        let mut memory = Self {
            ram: vec![0; usize::from(ram_kb) * 1024],
            lower_rom: system_rom[..BANK_SIZE].to_vec(),
            upper_roms,
            rom_select: 0,
            read_banks: [Bank::ram(0); 4],
            write_banks: [Bank::ram(0); 4],
        };
        memory.remap(0, 0);
        Ok(memory)
    }

    /// Install an upper ROM. Images shorter than 16K are padded with 0xFF.
    ///
    /// # Errors
    ///
    /// Fails if the image is larger than 16K.
    pub fn load_upper_rom(&mut self, slot: u8, image: &[u8]) -> Result<(), String> {
        if image.len() > BANK_SIZE {
            return Err(format!(
                "upper ROM for slot {slot} is {} bytes, larger than 16K",
                image.len()
            ));
        }
        let mut rom = vec![0xFF; BANK_SIZE];
        rom[..image.len()].copy_from_slice(image);
        self.upper_roms[usize::from(slot)] = Some(rom);
        Ok(())
    }

    /// Recompute the bank tables from the Gate Array ROM config (bits 2-3)
    /// and RAM config (bits 0-5).
    pub fn remap(&mut self, rom_config: u8, ram_config: u8) {
        let blocks = if self.ram.len() <= 0x10000 {
            RAM_CONFIGS[0]
        } else {
            RAM_CONFIGS[usize::from(ram_config & 7)]
        };

        let mut page = usize::from((ram_config >> 3) & 7);
        if 0x10000 * (page + 2) > self.ram.len() {
            page = 0;
        }

        for (quadrant, &block) in blocks.iter().enumerate() {
            let offset = if block < 4 {
                block * BANK_SIZE
            } else {
                0x10000 * (page + 1) + (block - 4) * BANK_SIZE
            };
            let bank = Bank {
                buffer: BufferId::Ram,
                offset,
            };
            self.read_banks[quadrant] = bank;
            self.write_banks[quadrant] = bank;
        }

        if rom_config & 0x04 == 0 {
            self.read_banks[0] = Bank {
                buffer: BufferId::LowerRom,
                offset: 0,
            };
        }
        if rom_config & 0x08 == 0 {
            let slot = if self.upper_roms[usize::from(self.rom_select)].is_some() {
                self.rom_select
            } else {
                0
            };
            if self.upper_roms[usize::from(slot)].is_some() {
                self.read_banks[3] = Bank {
                    buffer: BufferId::UpperRom(slot),
                    offset: 0,
                };
            }
        }
    }

    /// Select the upper ROM. The caller remaps afterwards.
    pub fn select_upper_rom(&mut self, slot: u8) {
        self.rom_select = slot;
    }

    #[must_use]
    pub fn rom_select(&self) -> u8 {
        self.rom_select
    }

    fn buffer(&self, id: BufferId) -> &[u8] {
        match id {
            BufferId::Ram => &self.ram,
            BufferId::LowerRom => &self.lower_rom,
            BufferId::UpperRom(slot) => self.upper_roms[usize::from(slot)]
                .as_deref()
                .unwrap_or(&[]),
        }
    }

    /// CPU read.
    #[must_use]
    pub fn read(&self, addr: u16) -> u8 {
        let bank = self.read_banks[usize::from(addr >> 14)];
        self.buffer(bank.buffer)
            .get(bank.offset + usize::from(addr & 0x3FFF))
            .copied()
            .unwrap_or(0xFF)
    }

    /// CPU write. Always reaches RAM.
    pub fn write(&mut self, addr: u16, value: u8) {
        let bank = self.write_banks[usize::from(addr >> 14)];
        if let Some(slot) = self.ram.get_mut(bank.offset + usize::from(addr & 0x3FFF)) {
            *slot = value;
        }
    }

    /// Gate Array video fetch: always the base 64K.
    #[must_use]
    pub fn video_read(&self, addr: u16) -> u8 {
        self.ram[usize::from(addr)]
    }

    #[must_use]
    pub fn read_bank(&self, quadrant: usize) -> Bank {
        self.read_banks[quadrant & 3]
    }

    #[must_use]
    pub fn write_bank(&self, quadrant: usize) -> Bank {
        self.write_banks[quadrant & 3]
    }

    #[must_use]
    pub fn ram(&self) -> &[u8] {
        &self.ram
    }

    pub fn ram_mut(&mut self) -> &mut [u8] {
        &mut self.ram
    }

    #[must_use]
    pub fn ram_kb(&self) -> u16 {
        (self.ram.len() / 1024) as u16
    }

    /// Upper ROM slots that hold an image.
    #[must_use]
    pub fn populated_slots(&self) -> Vec<u8> {
        (0..=255u8)
            .filter(|&slot| self.upper_roms[usize::from(slot)].is_some())
            .collect()
    }
}
