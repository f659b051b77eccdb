//! Amstrad CPC `.SNA` snapshot parser and writer.
//!
//! A snapshot is a 256-byte header followed by a straight RAM dump whose
//! size in kilobytes is stored in the header. Versions 1 to 3 share the
//! same layout and only add fields at previously unused offsets:
//!
//! | Offset | Size | Field                                    |
//! |--------|------|------------------------------------------|
//! | &00    | 8    | `MV - SNA`                               |
//! | &10    | 1    | Version                                  |
//! | &11    | 8    | F A C B E D L H                          |
//! | &19    | 4    | R I IFF1 IFF2                            |
//! | &1D    | 8    | IX IY SP PC                              |
//! | &25    | 1    | IM                                       |
//! | &26    | 8    | F' A' C' B' E' D' L' H'                  |
//! | &2E    | 18   | Gate Array pen and inks                  |
//! | &40    | 2    | Gate Array ROM and RAM config            |
//! | &42    | 19   | CRTC select and registers                |
//! | &55    | 1    | Upper ROM select                         |
//! | &56    | 4    | PPI A B C control                        |
//! | &5A    | 17   | PSG select and registers                 |
//! | &6B    | 2    | RAM dump size (KB)                       |
//! | &6D    | 1    | v2: CPC type                             |
//! | &9C    | 1    | v3: FDD motor                            |
//! | &A4    | 1    | v3: CRTC type                            |
//! | &B3    | 1    | v3: Gate Array interrupt line counter    |
//! | &B4    | 1    | v3: interrupt request                    |
//!
//! Version 3 files may carry memory chunks after the RAM dump; they are
//! skipped. Snapshots are always written as version 3.
//!
//! The crate knows nothing about the machine: it maps bytes to a plain
//! [`Snapshot`] and back.

use std::fmt;

pub const SIGNATURE: &[u8; 8] = b"MV - SNA";
pub const HEADER_SIZE: usize = 0x100;
/// Version written by [`Snapshot::to_bytes`].
pub const WRITE_VERSION: u8 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnaError {
    TooShort(usize),
    BadSignature,
    UnsupportedVersion(u8),
    /// Header RAM size, bytes actually present after the header.
    TruncatedRam { expected: usize, found: usize },
}

impl fmt::Display for SnaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort(len) => write!(
                f,
                "SNA file is {len} bytes, shorter than the {HEADER_SIZE}-byte header"
            ),
            Self::BadSignature => write!(f, "not an SNA snapshot (missing \"MV - SNA\")"),
            Self::UnsupportedVersion(v) => write!(f, "unsupported SNA version {v}"),
            Self::TruncatedRam { expected, found } => write!(
                f,
                "SNA RAM dump truncated: header says {expected} bytes, file has {found}"
            ),
        }
    }
}

impl std::error::Error for SnaError {}

/// CPU registers as stored in the header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnaCpu {
    pub a: u8,
    pub f: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    pub a_alt: u8,
    pub f_alt: u8,
    pub b_alt: u8,
    pub c_alt: u8,
    pub d_alt: u8,
    pub e_alt: u8,
    pub h_alt: u8,
    pub l_alt: u8,
    pub r: u8,
    pub i: u8,
    pub iff1: bool,
    pub iff2: bool,
    pub ix: u16,
    pub iy: u16,
    pub sp: u16,
    pub pc: u16,
    pub im: u8,
}

/// A decoded snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Version read from the file (1-3).
    pub version: u8,
    pub cpu: SnaCpu,
    pub ga_pen: u8,
    /// Hardware colour numbers for pens 0-15 and the border.
    pub ga_inks: [u8; 17],
    pub ga_rom_config: u8,
    pub ga_ram_config: u8,
    pub crtc_selected: u8,
    pub crtc_registers: [u8; 18],
    pub rom_select: u8,
    /// PPI port A, B, C and control.
    pub ppi: [u8; 4],
    pub psg_selected: u8,
    pub psg_registers: [u8; 16],
    /// 0 = 464, 1 = 664, 2 = 6128. Version 1 files leave it 0.
    pub cpc_type: u8,
    pub fdd_motor: bool,
    pub crtc_type: u8,
    pub ga_int_counter: u8,
    pub int_request: bool,
    /// RAM dump, a multiple of 1 KB.
    pub ram: Vec<u8>,
}

impl Snapshot {
    /// Size of the RAM dump in kilobytes.
    #[must_use]
    pub fn ram_kb(&self) -> u16 {
        (self.ram.len() / 1024) as u16
    }

    /// Parse a snapshot file.
    ///
    /// # Errors
    ///
    /// Fails on a short file, a missing signature, a version outside 1-3
    /// or a RAM dump shorter than the header promises.
    pub fn parse(data: &[u8]) -> Result<Self, SnaError> {
        if data.len() < HEADER_SIZE {
            return Err(SnaError::TooShort(data.len()));
        }
        if &data[..8] != SIGNATURE {
            return Err(SnaError::BadSignature);
        }
        let version = data[0x10];
        if !(1..=3).contains(&version) {
            return Err(SnaError::UnsupportedVersion(version));
        }

        let word = |offset: usize| u16::from_le_bytes([data[offset], data[offset + 1]]);
        let cpu = SnaCpu {
            f: data[0x11],
            a: data[0x12],
            c: data[0x13],
            b: data[0x14],
            e: data[0x15],
            d: data[0x16],
            l: data[0x17],
            h: data[0x18],
            r: data[0x19],
            i: data[0x1A],
            iff1: data[0x1B] & 1 != 0,
            iff2: data[0x1C] & 1 != 0,
            ix: word(0x1D),
            iy: word(0x1F),
            sp: word(0x21),
            pc: word(0x23),
            im: data[0x25] & 3,
            f_alt: data[0x26],
            a_alt: data[0x27],
            c_alt: data[0x28],
            b_alt: data[0x29],
            e_alt: data[0x2A],
            d_alt: data[0x2B],
            l_alt: data[0x2C],
            h_alt: data[0x2D],
        };

        let ram_len = usize::from(word(0x6B)) * 1024;
        let available = data.len() - HEADER_SIZE;
        if available < ram_len {
            return Err(SnaError::TruncatedRam {
                expected: ram_len,
                found: available,
            });
        }

        let mut snapshot = Self {
            version,
            cpu,
            ga_pen: data[0x2E],
            ga_inks: [0; 17],
            ga_rom_config: data[0x40],
            ga_ram_config: data[0x41],
            crtc_selected: data[0x42],
            crtc_registers: [0; 18],
            rom_select: data[0x55],
            ppi: [0; 4],
            psg_selected: data[0x5A],
            psg_registers: [0; 16],
            cpc_type: 0,
            fdd_motor: false,
            crtc_type: 0,
            ga_int_counter: 0,
            int_request: false,
            ram: data[HEADER_SIZE..HEADER_SIZE + ram_len].to_vec(),
        };
        snapshot.ga_inks.copy_from_slice(&data[0x2F..0x40]);
        snapshot.crtc_registers.copy_from_slice(&data[0x43..0x55]);
        snapshot.ppi.copy_from_slice(&data[0x56..0x5A]);
        snapshot.psg_registers.copy_from_slice(&data[0x5B..0x6B]);

        if version >= 2 {
            snapshot.cpc_type = data[0x6D];
        }
        if version >= 3 {
            snapshot.fdd_motor = data[0x9C] & 1 != 0;
            snapshot.crtc_type = data[0xA4];
            snapshot.ga_int_counter = data[0xB3];
            snapshot.int_request = data[0xB4] & 1 != 0;
        }
        Ok(snapshot)
    }

    /// Serialise as a version 3 snapshot.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![0u8; HEADER_SIZE];
        out[..8].copy_from_slice(SIGNATURE);
        out[0x10] = WRITE_VERSION;

        let c = &self.cpu;
        out[0x11..0x19].copy_from_slice(&[c.f, c.a, c.c, c.b, c.e, c.d, c.l, c.h]);
        out[0x19] = c.r;
        out[0x1A] = c.i;
        out[0x1B] = u8::from(c.iff1);
        out[0x1C] = u8::from(c.iff2);
        out[0x1D..0x1F].copy_from_slice(&c.ix.to_le_bytes());
        out[0x1F..0x21].copy_from_slice(&c.iy.to_le_bytes());
        out[0x21..0x23].copy_from_slice(&c.sp.to_le_bytes());
        out[0x23..0x25].copy_from_slice(&c.pc.to_le_bytes());
        out[0x25] = c.im;
        out[0x26..0x2E].copy_from_slice(&[
            c.f_alt, c.a_alt, c.c_alt, c.b_alt, c.e_alt, c.d_alt, c.l_alt, c.h_alt,
        ]);

        out[0x2E] = self.ga_pen;
        out[0x2F..0x40].copy_from_slice(&self.ga_inks);
        out[0x40] = self.ga_rom_config;
        out[0x41] = self.ga_ram_config;
        out[0x42] = self.crtc_selected;
        out[0x43..0x55].copy_from_slice(&self.crtc_registers);
        out[0x55] = self.rom_select;
        out[0x56..0x5A].copy_from_slice(&self.ppi);
        out[0x5A] = self.psg_selected;
        out[0x5B..0x6B].copy_from_slice(&self.psg_registers);
        out[0x6B..0x6D].copy_from_slice(&self.ram_kb().to_le_bytes());
        out[0x6D] = self.cpc_type;
        out[0x9C] = u8::from(self.fdd_motor);
        out[0xA4] = self.crtc_type;
        out[0xB3] = self.ga_int_counter;
        out[0xB4] = u8::from(self.int_request);

        let whole_kb = usize::from(self.ram_kb()) * 1024;
        out.extend_from_slice(&self.ram[..whole_kb]);
        out
    }
}
