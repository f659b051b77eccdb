//! Standard and extended CPC disk images (`.dsk`).
//!
//! Both flavours start with a 256-byte disk information block followed by
//! one block per physical track, ordered cylinder-major with sides
//! interleaved. Each track block opens with a 256-byte "Track-Info" header
//! listing the sector IDs, followed by the sector data.
//!
//! - Standard: `"MV - CPCEMU Disk-File\r\nDisk-Info\r\n"`, one track size
//!   for the whole disk at 0x32, every sector `128 << N` bytes.
//! - Extended: `"EXTENDED CPC DSK File\r\nDisk-Info\r\n"`, a per-track size
//!   table at 0x34 (in 256-byte units, 0 = unformatted) and a per-sector
//!   stored length, which lets copy-protected layouts survive.

#![allow(clippy::cast_possible_truncation)]

const STANDARD_SIGNATURE: &[u8] = b"MV - CPC";
const EXTENDED_SIGNATURE: &[u8] = b"EXTENDED";
const STANDARD_HEADER: &[u8] = b"MV - CPCEMU Disk-File\r\nDisk-Info\r\n";
const EXTENDED_HEADER: &[u8] = b"EXTENDED CPC DSK File\r\nDisk-Info\r\n";
const TRACK_HEADER: &[u8] = b"Track-Info\r\n";
const CREATOR: &[u8] = b"emu-cpc";

/// Most sector descriptors that fit in a Track-Info block.
pub const MAX_SECTORS: usize = (256 - 0x18) / 8;
/// Largest cylinder count a disk image can hold.
pub const MAX_CYLINDERS: u8 = 84;

/// Bytes in a sector of size code `n`.
#[must_use]
pub fn sector_size(n: u8) -> usize {
    128 << n.min(6)
}

/// The four-byte address mark of a sector: cylinder, head, record, size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorId {
    pub c: u8,
    pub h: u8,
    pub r: u8,
    pub n: u8,
}

#[derive(Debug, Clone)]
pub struct Sector {
    pub id: SectorId,
    /// ST1 bits recorded with the sector (CRC error, missing mark).
    pub st1: u8,
    /// ST2 bits recorded with the sector (deleted mark, data CRC).
    pub st2: u8,
    pub data: Vec<u8>,
}

impl Sector {
    /// Sector carries a deleted data address mark.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.st2 & 0x40 != 0
    }
}

#[derive(Debug, Clone)]
pub struct Track {
    pub gap3: u8,
    pub filler: u8,
    pub sectors: Vec<Sector>,
}

impl Track {
    /// Index of the first sector whose ID matches `c`, `h` and `r`.
    #[must_use]
    pub fn find(&self, c: u8, h: u8, r: u8) -> Option<usize> {
        self.sectors
            .iter()
            .position(|s| s.id.c == c && s.id.h == h && s.id.r == r)
    }
}

/// A parsed disk image. Tracks are indexed by physical position.
#[derive(Debug, Clone)]
pub struct DiskImage {
    cylinders: u8,
    sides: u8,
    /// `cylinders * sides` entries; `None` is an unformatted track.
    tracks: Vec<Option<Track>>,
    extended: bool,
    pub write_protected: bool,
    modified: bool,
}

impl DiskImage {
    /// A disk with every track unformatted.
    #[must_use]
    pub fn unformatted(cylinders: u8, sides: u8) -> Self {
        let sides = sides.clamp(1, 2);
        Self {
            cylinders,
            sides,
            tracks: vec![None; usize::from(cylinders) * usize::from(sides)],
            extended: true,
            write_protected: false,
            modified: false,
        }
    }

    /// Parse a standard or extended image.
    ///
    /// # Errors
    ///
    /// Fails on an unrecognised signature, a side count other than 1 or 2,
    /// or a track block without its Track-Info header. A file that ends
    /// early keeps the tracks read so far.
    pub fn parse(data: &[u8]) -> Result<Self, String> {
        if data.len() < 0x100 {
            return Err("disk image too short for its header".to_string());
        }

        let extended = if data.starts_with(EXTENDED_SIGNATURE) {
            true
        } else if data.starts_with(STANDARD_SIGNATURE) {
            false
        } else {
            return Err("not a DSK image (unrecognised signature)".to_string());
        };

        let cylinders = data[0x30].min(MAX_CYLINDERS);
        let sides = data[0x31];
        if !(1..=2).contains(&sides) {
            return Err(format!("unsupported side count {sides}"));
        }

        let count = usize::from(cylinders) * usize::from(sides);
        let standard_size = usize::from(u16::from_le_bytes([data[0x32], data[0x33]]));
        let mut tracks = Vec::with_capacity(count);
        let mut offset = 0x100;

        for index in 0..count {
            let size = if extended {
                usize::from(data[0x34 + index]) * 0x100
            } else {
                standard_size
            };
            if size == 0 {
                tracks.push(None);
                continue;
            }
            let Some(block) = data.get(offset..) else {
                tracks.push(None);
                continue;
            };
            if block.len() < 0x100 {
                tracks.push(None);
            } else {
                tracks.push(Some(parse_track(block, extended)?));
            }
            offset += size;
        }

        Ok(Self {
            cylinders,
            sides,
            tracks,
            extended,
            write_protected: false,
            modified: false,
        })
    }

    #[must_use]
    pub fn cylinders(&self) -> u8 {
        self.cylinders
    }

    #[must_use]
    pub fn sides(&self) -> u8 {
        self.sides
    }

    #[must_use]
    pub fn is_extended(&self) -> bool {
        self.extended
    }

    /// Contents changed since the image was loaded or last saved.
    #[must_use]
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn mark_saved(&mut self) {
        self.modified = false;
    }

    fn index(&self, cylinder: u8, side: u8) -> Option<usize> {
        if cylinder >= self.cylinders || side >= self.sides {
            return None;
        }
        Some(usize::from(cylinder) * usize::from(self.sides) + usize::from(side))
    }

    /// Formatted track at a physical position.
    #[must_use]
    pub fn track(&self, cylinder: u8, side: u8) -> Option<&Track> {
        self.index(cylinder, side)
            .and_then(|i| self.tracks[i].as_ref())
    }

    /// Sector data by physical position and ID.
    #[must_use]
    pub fn read_sector(&self, cylinder: u8, side: u8, id: SectorId) -> Option<&[u8]> {
        let track = self.track(cylinder, side)?;
        let index = track.find(id.c, id.h, id.r)?;
        Some(&track.sectors[index].data)
    }

    /// Overwrite a sector's data. Returns `false` if no such sector.
    /// Data beyond the stored sector length is dropped.
    pub fn write_sector(&mut self, cylinder: u8, side: u8, id: SectorId, data: &[u8]) -> bool {
        let Some(index) = self.index(cylinder, side) else {
            return false;
        };
        let Some(track) = self.tracks[index].as_mut() else {
            return false;
        };
        let Some(sector) = track.find(id.c, id.h, id.r) else {
            return false;
        };
        let stored = &mut track.sectors[sector].data;
        let len = data.len().min(stored.len());
        stored[..len].copy_from_slice(&data[..len]);
        // A rewritten sector has a good CRC
        track.sectors[sector].st1 &= !0x20;
        track.sectors[sector].st2 &= !0x60;
        self.modified = true;
        true
    }

    /// Lay down a fresh track. The image grows if `cylinder` lies past its
    /// end; sector IDs beyond [`MAX_SECTORS`] are dropped.
    pub fn format_track(&mut self, cylinder: u8, side: u8, ids: &[SectorId], gap3: u8, filler: u8) {
        if cylinder >= MAX_CYLINDERS || side >= self.sides {
            return;
        }
        if cylinder >= self.cylinders {
            self.cylinders = cylinder + 1;
            self.tracks
                .resize(usize::from(self.cylinders) * usize::from(self.sides), None);
        }
        let sectors = ids
            .iter()
            .take(MAX_SECTORS)
            .map(|&id| Sector {
                id,
                st1: 0,
                st2: 0,
                data: vec![filler; sector_size(id.n)],
            })
            .collect();
        let index = usize::from(cylinder) * usize::from(self.sides) + usize::from(side);
        self.tracks[index] = Some(Track {
            gap3,
            filler,
            sectors,
        });
        // Variable geometry needs the extended layout
        self.extended = true;
        self.modified = true;
    }

    /// Serialise in the image's own flavour.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let sides = usize::from(self.sides);
        let blocks: Vec<Option<Vec<u8>>> = self
            .tracks
            .iter()
            .enumerate()
            .map(|(i, t)| {
                t.as_ref().map(|t| {
                    serialise_track(t, (i / sides) as u8, (i % sides) as u8, self.extended)
                })
            })
            .collect();

        let mut header = vec![0u8; 0x100];
        let signature = if self.extended { EXTENDED_HEADER } else { STANDARD_HEADER };
        header[..signature.len()].copy_from_slice(signature);
        header[0x22..0x22 + CREATOR.len()].copy_from_slice(CREATOR);
        header[0x30] = self.cylinders;
        header[0x31] = self.sides;

        let mut out = Vec::new();
        if self.extended {
            for (i, block) in blocks.iter().enumerate() {
                header[0x34 + i] = block.as_ref().map_or(0, |b| (b.len() / 0x100) as u8);
            }
            out.extend_from_slice(&header);
            for block in blocks.into_iter().flatten() {
                out.extend_from_slice(&block);
            }
        } else {
            let size = blocks
                .iter()
                .flatten()
                .map(Vec::len)
                .max()
                .unwrap_or(0x100);
            header[0x32..0x34].copy_from_slice(&(size as u16).to_le_bytes());
            out.extend_from_slice(&header);
            for block in blocks {
                let start = out.len();
                if let Some(block) = block {
                    out.extend_from_slice(&block);
                }
                out.resize(start + size, 0);
            }
        }
        out
    }
}

fn parse_track(block: &[u8], extended: bool) -> Result<Track, String> {
    if !block.starts_with(TRACK_HEADER) {
        return Err("track block is missing its Track-Info header".to_string());
    }

    let default_n = block[0x14];
    let count = usize::from(block[0x15]).min(MAX_SECTORS);
    let mut sectors = Vec::with_capacity(count);
    let mut data_offset = 0x100;

    for s in 0..count {
        let info = &block[0x18 + s * 8..0x20 + s * 8];
        let id = SectorId {
            c: info[0],
            h: info[1],
            r: info[2],
            n: info[3],
        };
        let len = if extended {
            usize::from(u16::from_le_bytes([info[6], info[7]]))
        } else {
            sector_size(default_n)
        };

        // Pad a truncated final sector
        let mut data = vec![0u8; len];
        if let Some(available) = block.get(data_offset..) {
            let n = available.len().min(len);
            data[..n].copy_from_slice(&available[..n]);
        }
        data_offset += len;

        sectors.push(Sector {
            id,
            st1: info[4],
            st2: info[5],
            data,
        });
    }

    Ok(Track {
        gap3: block[0x16],
        filler: block[0x17],
        sectors,
    })
}

fn serialise_track(track: &Track, cylinder: u8, side: u8, extended: bool) -> Vec<u8> {
    let mut block = vec![0u8; 0x100];
    block[..TRACK_HEADER.len()].copy_from_slice(TRACK_HEADER);
    block[0x10] = cylinder;
    block[0x11] = side;
    block[0x14] = track.sectors.first().map_or(2, |s| s.id.n);
    block[0x15] = track.sectors.len() as u8;
    block[0x16] = track.gap3;
    block[0x17] = track.filler;

    for (i, sector) in track.sectors.iter().enumerate() {
        let info = &mut block[0x18 + i * 8..0x20 + i * 8];
        info[0] = sector.id.c;
        info[1] = sector.id.h;
        info[2] = sector.id.r;
        info[3] = sector.id.n;
        info[4] = sector.st1;
        info[5] = sector.st2;
        if extended {
            info[6..8].copy_from_slice(&(sector.data.len() as u16).to_le_bytes());
        }
    }
    for sector in &track.sectors {
        block.extend_from_slice(&sector.data);
    }

    block.resize(block.len().div_ceil(0x100) * 0x100, 0);
    block
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// One-sided standard image: `cylinders` tracks of nine 512-byte
    /// sectors numbered 0xC1-0xC9, each filled with its record number.
    pub(crate) fn standard_image(cylinders: u8) -> Vec<u8> {
        let track_size = 0x100 + 9 * 512;
        let mut data = vec![0u8; 0x100];
        data[..STANDARD_HEADER.len()].copy_from_slice(STANDARD_HEADER);
        data[0x30] = cylinders;
        data[0x31] = 1;
        data[0x32..0x34].copy_from_slice(&(track_size as u16).to_le_bytes());

        for c in 0..cylinders {
            let mut track = vec![0u8; 0x100];
            track[..TRACK_HEADER.len()].copy_from_slice(TRACK_HEADER);
            track[0x10] = c;
            track[0x14] = 2;
            track[0x15] = 9;
            track[0x16] = 0x4E;
            track[0x17] = 0xE5;
            for s in 0..9u8 {
                let info = 0x18 + usize::from(s) * 8;
                track[info] = c;
                track[info + 2] = 0xC1 + s;
                track[info + 3] = 2;
            }
            for s in 0..9u8 {
                track.extend(std::iter::repeat_n(0xC1 + s, 512));
            }
            data.extend_from_slice(&track);
        }
        data
    }

    fn id(c: u8, r: u8) -> SectorId {
        SectorId { c, h: 0, r, n: 2 }
    }

    #[test]
    fn parse_standard_geometry() {
        let img = DiskImage::parse(&standard_image(2)).expect("parse");
        assert_eq!(img.cylinders(), 2);
        assert_eq!(img.sides(), 1);
        assert!(!img.is_extended());
        let track = img.track(1, 0).expect("track 1");
        assert_eq!(track.sectors.len(), 9);
        assert_eq!(track.sectors[0].id, id(1, 0xC1));
        assert_eq!(track.filler, 0xE5);
    }

    #[test]
    fn read_sector_by_id() {
        let img = DiskImage::parse(&standard_image(1)).expect("parse");
        let data = img.read_sector(0, 0, id(0, 0xC5)).expect("sector C5");
        assert_eq!(data.len(), 512);
        assert!(data.iter().all(|&b| b == 0xC5));
        assert!(img.read_sector(0, 0, id(0, 0x01)).is_none());
        assert!(img.read_sector(0, 1, id(0, 0xC1)).is_none());
        assert!(img.read_sector(3, 0, id(3, 0xC1)).is_none());
    }

    #[test]
    fn write_marks_modified() {
        let mut img = DiskImage::parse(&standard_image(1)).expect("parse");
        assert!(!img.is_modified());
        assert!(img.write_sector(0, 0, id(0, 0xC2), &[0x42; 512]));
        assert!(img.is_modified());
        assert_eq!(img.read_sector(0, 0, id(0, 0xC2)).expect("C2")[511], 0x42);
        assert!(!img.write_sector(0, 0, id(0, 0x42), &[0; 512]));
        img.mark_saved();
        assert!(!img.is_modified());
    }

    #[test]
    fn standard_round_trip() {
        let raw = standard_image(2);
        let img = DiskImage::parse(&raw).expect("parse");
        let bytes = img.to_bytes();
        assert_eq!(bytes.len(), raw.len());
        let again = DiskImage::parse(&bytes).expect("reparse");
        assert_eq!(again.read_sector(1, 0, id(1, 0xC9)).expect("C9")[0], 0xC9);
    }

    #[test]
    fn extended_image_with_odd_sizes() {
        let mut data = vec![0u8; 0x100];
        data[..EXTENDED_HEADER.len()].copy_from_slice(EXTENDED_HEADER);
        data[0x30] = 2;
        data[0x31] = 1;
        data[0x34] = 2; // 256 info + 256 data
        data[0x35] = 0; // cylinder 1 unformatted

        let mut track = vec![0u8; 0x100];
        track[..TRACK_HEADER.len()].copy_from_slice(TRACK_HEADER);
        track[0x14] = 1;
        track[0x15] = 2;
        // Sector 1: 200 stored bytes, flagged with a data CRC error
        track[0x18..0x20].copy_from_slice(&[0, 0, 1, 1, 0x20, 0x20, 200, 0]);
        // Sector 2: 56 stored bytes
        track[0x20..0x28].copy_from_slice(&[0, 0, 2, 1, 0, 0, 56, 0]);
        data.extend_from_slice(&track);
        data.extend(std::iter::repeat_n(0xAA, 200));
        data.extend(std::iter::repeat_n(0xBB, 56));

        let img = DiskImage::parse(&data).expect("parse");
        assert!(img.is_extended());
        let t0 = img.track(0, 0).expect("track 0");
        assert_eq!(t0.sectors[0].data.len(), 200);
        assert_eq!(t0.sectors[0].st2, 0x20);
        assert_eq!(t0.sectors[1].data, vec![0xBB; 56]);
        assert!(img.track(1, 0).is_none());

        let again = DiskImage::parse(&img.to_bytes()).expect("reparse");
        assert_eq!(again.track(0, 0).expect("t0").sectors[1].data.len(), 56);
        assert!(again.track(1, 0).is_none());
    }

    #[test]
    fn format_grows_image() {
        let mut img = DiskImage::unformatted(1, 1);
        let ids: Vec<SectorId> = (1..=4).map(|r| SectorId { c: 2, h: 0, r, n: 1 }).collect();
        img.format_track(2, 0, &ids, 0x2A, 0xE5);
        assert_eq!(img.cylinders(), 3);
        let track = img.track(2, 0).expect("formatted");
        assert_eq!(track.sectors.len(), 4);
        assert_eq!(track.sectors[3].data, vec![0xE5; 256]);
        assert!(img.is_modified());
        assert!(img.track(1, 0).is_none());
    }

    #[test]
    fn rejects_bad_images() {
        assert!(DiskImage::parse(&[0u8; 0x100]).is_err());
        assert!(DiskImage::parse(b"MV - CPC").is_err());

        let mut data = standard_image(1);
        data[0x31] = 3;
        assert!(DiskImage::parse(&data).is_err());

        let mut data = standard_image(1);
        data[0x100] = b'X';
        assert!(DiskImage::parse(&data).is_err());
    }
}
