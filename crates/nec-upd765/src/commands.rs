//! Command decoding and execution.
//!
//! The command byte's low five bits select the operation; bits 5-7 carry
//! the SK (skip deleted), MF (MFM) and MT (multi-track) modifiers. Once the
//! last parameter byte arrives the command runs to completion at once. Data
//! transfers are staged in a buffer that the CPU drains or fills through the
//! data register during the execution phase.
//!
//! The CPC never drives the terminal count line, so a transfer only stops
//! at an error or at the end-of-track sector, and every successful read or
//! write ends with "end of cylinder" (ST0 abnormal termination, ST1 EN).
//! AMSDOS treats that combination as success.

#![allow(clippy::cast_possible_truncation)]

use log::debug;

use crate::dsk::{SectorId, sector_size};
use crate::{Phase, PendingWrite, Upd765};

// ST0
pub const ST0_ABNORMAL: u8 = 0x40;
pub const ST0_INVALID: u8 = 0x80;
pub const ST0_SEEK_END: u8 = 0x20;
pub const ST0_NOT_READY: u8 = 0x08;
// ST1
pub const ST1_MISSING_AM: u8 = 0x01;
pub const ST1_NOT_WRITABLE: u8 = 0x02;
pub const ST1_NO_DATA: u8 = 0x04;
pub const ST1_DATA_ERROR: u8 = 0x20;
pub const ST1_END_OF_CYLINDER: u8 = 0x80;
// ST2
pub const ST2_DATA_ERROR: u8 = 0x20;
pub const ST2_CONTROL_MARK: u8 = 0x40;
// ST3
pub const ST3_TWO_SIDE: u8 = 0x08;
pub const ST3_TRACK_0: u8 = 0x10;
pub const ST3_READY: u8 = 0x20;
pub const ST3_WRITE_PROTECT: u8 = 0x40;

/// A decoded command byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    ReadData,
    ReadDeletedData,
    WriteData,
    ReadId,
    FormatTrack,
    Specify,
    SenseDriveStatus,
    Recalibrate,
    SenseInterruptStatus,
    Seek,
    Invalid,
}

impl Command {
    #[must_use]
    pub fn decode(byte: u8) -> Self {
        match byte & 0x1F {
            0x03 => Command::Specify,
            0x04 => Command::SenseDriveStatus,
            0x05 => Command::WriteData,
            0x06 => Command::ReadData,
            0x07 => Command::Recalibrate,
            0x08 => Command::SenseInterruptStatus,
            0x0A => Command::ReadId,
            0x0C => Command::ReadDeletedData,
            0x0D => Command::FormatTrack,
            0x0F => Command::Seek,
            _ => Command::Invalid,
        }
    }

    /// Total bytes in the command phase, including the command byte.
    #[must_use]
    pub fn length(self) -> usize {
        match self {
            Command::ReadData | Command::ReadDeletedData | Command::WriteData => 9,
            Command::FormatTrack => 6,
            Command::Specify | Command::Seek => 3,
            Command::ReadId | Command::SenseDriveStatus | Command::Recalibrate => 2,
            Command::SenseInterruptStatus | Command::Invalid => 1,
        }
    }
}

/// Parameters shared by READ DATA, READ DELETED DATA and WRITE DATA.
struct Transfer {
    skip: bool,
    drive: usize,
    head: u8,
    id: SectorId,
    eot: u8,
}

impl Transfer {
    fn parse(bytes: &[u8]) -> Self {
        Self {
            skip: bytes[0] & 0x20 != 0,
            drive: usize::from(bytes[1] & 1),
            head: (bytes[1] >> 2) & 1,
            id: SectorId {
                c: bytes[2],
                h: bytes[3],
                r: bytes[4],
                n: bytes[5],
            },
            eot: bytes[6],
        }
    }

    fn st0(&self) -> u8 {
        self.drive as u8 | (self.head << 2)
    }
}

impl Upd765 {
    pub(crate) fn execute_command(&mut self) {
        let command = Command::decode(self.command[0]);
        debug!("FDC command {command:?} {:02X?}", self.command);
        match command {
            Command::Specify => {
                self.step_rate = self.command[1] >> 4;
                self.head_unload = self.command[1] & 0x0F;
                self.head_load = self.command[2] >> 1;
                self.non_dma = self.command[2] & 1 != 0;
                self.phase = Phase::Idle;
            }
            Command::SenseDriveStatus => self.sense_drive_status(),
            Command::Recalibrate => self.seek(0),
            Command::Seek => self.seek(self.command[2]),
            Command::SenseInterruptStatus => self.sense_interrupt_status(),
            Command::ReadData => self.read_data_command(false),
            Command::ReadDeletedData => self.read_data_command(true),
            Command::WriteData => self.write_data_command(),
            Command::ReadId => self.read_id(),
            Command::FormatTrack => self.format_track(),
            Command::Invalid => self.finish(vec![ST0_INVALID]),
        }
    }

    fn sense_drive_status(&mut self) {
        let drive = usize::from(self.command[1] & 1);
        let unit = &self.drives[drive];

        let mut st3 = self.command[1] & 0x07;
        if unit.cylinder == 0 {
            st3 |= ST3_TRACK_0;
        }
        if let Some(disk) = &unit.disk {
            st3 |= ST3_READY;
            if disk.sides() == 2 {
                st3 |= ST3_TWO_SIDE;
            }
            if disk.write_protected {
                st3 |= ST3_WRITE_PROTECT;
            }
        }
        self.finish(vec![st3]);
    }

    /// SEEK and RECALIBRATE. Head movement is instant; the interrupt
    /// status waits for SENSE INTERRUPT STATUS.
    fn seek(&mut self, cylinder: u8) {
        let drive = usize::from(self.command[1] & 1);
        let head = (self.command[1] >> 2) & 1;
        let unit = &mut self.drives[drive];
        let mut st0 = ST0_SEEK_END | (head << 2) | drive as u8;
        if unit.disk.is_none() {
            st0 |= ST0_ABNORMAL | ST0_NOT_READY;
        }
        unit.cylinder = cylinder;
        self.seek_status.push((st0, cylinder));
        self.interrupt = true;
        self.phase = Phase::Idle;
    }

    fn sense_interrupt_status(&mut self) {
        if self.seek_status.is_empty() {
            self.finish(vec![ST0_INVALID]);
            return;
        }
        let (st0, pcn) = self.seek_status.remove(0);
        self.interrupt = !self.seek_status.is_empty();
        self.finish(vec![st0, pcn]);
    }

    fn read_data_command(&mut self, deleted: bool) {
        let t = Transfer::parse(&self.command);
        let mut st0 = t.st0();
        let mut st1 = 0;
        let mut st2 = 0;
        let mut id = t.id;

        let Some(disk) = self.drives[t.drive].disk.as_ref() else {
            self.finish_transfer(st0 | ST0_ABNORMAL | ST0_NOT_READY, st1, st2, id);
            return;
        };
        let cylinder = self.drives[t.drive].cylinder;
        let Some(track) = disk.track(cylinder, t.head) else {
            self.finish_transfer(st0 | ST0_ABNORMAL, ST1_MISSING_AM, st2, id);
            return;
        };

        let mut data = Vec::new();
        loop {
            let Some(index) = track.find(id.c, id.h, id.r) else {
                st0 |= ST0_ABNORMAL;
                st1 |= ST1_NO_DATA;
                break;
            };
            let sector = &track.sectors[index];

            if sector.is_deleted() != deleted {
                st2 |= ST2_CONTROL_MARK;
                if !t.skip {
                    data.extend_from_slice(&sector.data);
                    break;
                }
            } else {
                data.extend_from_slice(&sector.data);
            }

            // Copy-protection CRC errors recorded in the image
            if sector.st1 & ST1_DATA_ERROR != 0 || sector.st2 & ST2_DATA_ERROR != 0 {
                st0 |= ST0_ABNORMAL;
                st1 |= sector.st1 & ST1_DATA_ERROR;
                st2 |= sector.st2 & ST2_DATA_ERROR;
                break;
            }

            if id.r == t.eot {
                st0 |= ST0_ABNORMAL;
                st1 |= ST1_END_OF_CYLINDER;
                id.c = id.c.wrapping_add(1);
                id.r = 1;
                break;
            }
            id.r = id.r.wrapping_add(1);
        }

        let result = vec![st0, st1, st2, id.c, id.h, id.r, id.n];
        if data.is_empty() {
            self.finish(result);
        } else {
            self.begin_read(data, result);
        }
    }

    fn write_data_command(&mut self) {
        let t = Transfer::parse(&self.command);
        let st0 = t.st0();
        let id = t.id;

        let Some(disk) = self.drives[t.drive].disk.as_ref() else {
            self.finish_transfer(st0 | ST0_ABNORMAL | ST0_NOT_READY, 0, 0, id);
            return;
        };
        if disk.write_protected {
            self.finish_transfer(st0 | ST0_ABNORMAL, ST1_NOT_WRITABLE, 0, id);
            return;
        }
        let cylinder = self.drives[t.drive].cylinder;
        let Some(track) = disk.track(cylinder, t.head) else {
            self.finish_transfer(st0 | ST0_ABNORMAL, ST1_MISSING_AM, 0, id);
            return;
        };

        // Collect the run of sectors up to EOT that exist on this track.
        let mut targets = Vec::new();
        let mut next = id;
        let mut expected = 0;
        loop {
            let Some(index) = track.find(next.c, next.h, next.r) else {
                break;
            };
            let target = track.sectors[index].id;
            expected += track.sectors[index].data.len();
            targets.push(target);
            if next.r == t.eot {
                break;
            }
            next.r = next.r.wrapping_add(1);
        }

        if targets.is_empty() {
            self.finish_transfer(st0 | ST0_ABNORMAL, ST1_NO_DATA, 0, id);
            return;
        }

        self.pending = Some(PendingWrite::Sectors {
            drive: t.drive,
            cylinder,
            head: t.head,
            targets,
            eot: t.eot,
            st0,
            n: id.n,
        });
        self.begin_write(expected);
    }

    fn read_id(&mut self) {
        let drive = usize::from(self.command[1] & 1);
        let head = (self.command[1] >> 2) & 1;
        let st0 = drive as u8 | (head << 2);
        let unit = &mut self.drives[drive];
        let zero = SectorId {
            c: unit.cylinder,
            h: head,
            r: 0,
            n: 0,
        };

        let Some(disk) = unit.disk.as_ref() else {
            self.finish_transfer(st0 | ST0_ABNORMAL | ST0_NOT_READY, 0, 0, zero);
            return;
        };
        let sectors = disk
            .track(unit.cylinder, head)
            .map_or(&[][..], |t| t.sectors.as_slice());
        if sectors.is_empty() {
            self.finish_transfer(st0 | ST0_ABNORMAL, ST1_MISSING_AM, 0, zero);
            return;
        }

        // Successive READ IDs walk round the track as the disk spins.
        let index = unit.next_id % sectors.len();
        let id = sectors[index].id;
        unit.next_id = index + 1;
        self.finish_transfer(st0, 0, 0, id);
    }

    fn format_track(&mut self) {
        let drive = usize::from(self.command[1] & 1);
        let head = (self.command[1] >> 2) & 1;
        let n = self.command[2];
        let count = self.command[3];
        let gap3 = self.command[4];
        let filler = self.command[5];
        let st0 = drive as u8 | (head << 2);
        let cylinder = self.drives[drive].cylinder;
        let id = SectorId {
            c: cylinder,
            h: head,
            r: 0,
            n,
        };

        let Some(disk) = self.drives[drive].disk.as_ref() else {
            self.finish_transfer(st0 | ST0_ABNORMAL | ST0_NOT_READY, 0, 0, id);
            return;
        };
        if disk.write_protected {
            self.finish_transfer(st0 | ST0_ABNORMAL, ST1_NOT_WRITABLE, 0, id);
            return;
        }
        if count == 0 {
            self.finish_transfer(st0, 0, 0, id);
            return;
        }

        self.pending = Some(PendingWrite::Format {
            drive,
            cylinder,
            head,
            gap3,
            filler,
            st0,
            n,
        });
        self.begin_write(usize::from(count) * 4);
    }

    /// Called once the CPU has supplied every execution-phase byte.
    pub(crate) fn commit_write(&mut self) {
        let Some(pending) = self.pending.take() else {
            self.phase = Phase::Idle;
            return;
        };
        let bytes = std::mem::take(&mut self.transfer);

        match pending {
            PendingWrite::Sectors {
                drive,
                cylinder,
                head,
                targets,
                eot,
                st0,
                n,
            } => {
                let mut offset = 0;
                if let Some(disk) = self.drives[drive].disk.as_mut() {
                    for target in &targets {
                        let len = disk
                            .read_sector(cylinder, head, *target)
                            .map_or(sector_size(target.n), <[u8]>::len);
                        let end = (offset + len).min(bytes.len());
                        disk.write_sector(cylinder, head, *target, &bytes[offset..end]);
                        offset = end;
                    }
                }
                let last = targets.last().copied().unwrap_or(SectorId {
                    c: cylinder,
                    h: head,
                    r: 0,
                    n,
                });
                if last.r == eot {
                    let id = SectorId {
                        c: last.c.wrapping_add(1),
                        h: last.h,
                        r: 1,
                        n,
                    };
                    self.finish_transfer(st0 | ST0_ABNORMAL, ST1_END_OF_CYLINDER, 0, id);
                } else {
                    // The run stopped at a sector that isn't on the track
                    let id = SectorId {
                        r: last.r.wrapping_add(1),
                        n,
                        ..last
                    };
                    self.finish_transfer(st0 | ST0_ABNORMAL, ST1_NO_DATA, 0, id);
                }
            }
            PendingWrite::Format {
                drive,
                cylinder,
                head,
                gap3,
                filler,
                st0,
                n,
            } => {
                let ids: Vec<SectorId> = bytes
                    .chunks_exact(4)
                    .map(|b| SectorId {
                        c: b[0],
                        h: b[1],
                        r: b[2],
                        n: b[3],
                    })
                    .collect();
                if let Some(disk) = self.drives[drive].disk.as_mut() {
                    disk.format_track(cylinder, head, &ids, gap3, filler);
                }
                let last = ids.last().copied().unwrap_or(SectorId {
                    c: cylinder,
                    h: head,
                    r: 0,
                    n,
                });
                self.finish_transfer(st0, 0, 0, last);
            }
        }
    }

    fn finish_transfer(&mut self, st0: u8, st1: u8, st2: u8, id: SectorId) {
        self.finish(vec![st0, st1, st2, id.c, id.h, id.r, id.n]);
    }
}
