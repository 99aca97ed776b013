//! Western Digital WD17xx/WD279x floppy disk controller.
//!
//! Four registers: status/command (0), track (1), sector (2) and data (3).
//! Commands complete as soon as they are written: type I commands move the
//! head and raise INTRQ at once, type II/III commands either fail at once or
//! enter the data transfer phase, where each data register access moves one
//! byte and pulses DRQ until the sector (or the run of sectors) is done.
//!
//! Sector data comes from raw [`FloppyImage`]s, one per drive select.

use serde::{Deserialize, Serialize};

use crate::floppy::FloppyImage;
use crate::logging::{log, LogCategory, LogLevel};

pub const STATUS_BUSY: u8 = 0x01;
/// Index pulse in type I status, DRQ otherwise.
pub const STATUS_DRQ: u8 = 0x02;
pub const STATUS_INDEX: u8 = 0x02;
/// Track 0 in type I status, lost data otherwise.
pub const STATUS_TRACK0: u8 = 0x04;
pub const STATUS_LOST_DATA: u8 = 0x04;
pub const STATUS_CRC_ERROR: u8 = 0x08;
/// Seek error in type I status, record not found otherwise.
pub const STATUS_SEEK_ERROR: u8 = 0x10;
pub const STATUS_RNF: u8 = 0x10;
/// Head loaded in type I status, record type otherwise.
pub const STATUS_HEAD_LOADED: u8 = 0x20;
pub const STATUS_WRITE_PROTECT: u8 = 0x40;
pub const STATUS_NOT_READY: u8 = 0x80;

/// Output lines of the controller.
pub trait FdcLines {
    fn intrq(&mut self, state: bool);
    fn drq(&mut self, state: bool);
}

/// Controller with its outputs left floating.
impl FdcLines for () {
    fn intrq(&mut self, _state: bool) {}
    fn drq(&mut self, _state: bool) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Idle,
    Command,
    DataTransfer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum Transfer {
    ReadSector { multi: bool },
    WriteSector { multi: bool },
    ReadAddress,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wd17xx {
    status: u8,
    track: u8,
    sector: u8,
    data: u8,
    command: u8,
    phase: Phase,
    transfer: Option<Transfer>,
    buffer: Vec<u8>,
    position: usize,
    /// Last step direction, +1 in or -1 out.
    direction: i8,

    drive: usize,
    side: u8,
    mfm: bool,
    in_reset: bool,
    cylinders: [u8; 4],

    intrq: bool,
    drq: bool,
    track_command_logged: bool,

    #[serde(skip)]
    drives: [Option<FloppyImage>; 4],
}

impl Default for Wd17xx {
    fn default() -> Self {
        Self::new()
    }
}

impl Wd17xx {
    pub fn new() -> Self {
        Self {
            status: 0,
            track: 0,
            sector: 1,
            data: 0,
            command: 0,
            phase: Phase::Idle,
            transfer: None,
            buffer: Vec::new(),
            position: 0,
            direction: 1,
            drive: 0,
            side: 0,
            mfm: true,
            in_reset: false,
            cylinders: [0; 4],
            intrq: false,
            drq: false,
            track_command_logged: false,
            drives: Default::default(),
        }
    }

    /// Read and Write Track are not emulated.
    pub fn supports_track_commands(&self) -> bool {
        false
    }

    pub fn insert(&mut self, drive: usize, image: FloppyImage) {
        if let Some(slot) = self.drives.get_mut(drive) {
            *slot = Some(image);
        }
    }

    pub fn eject(&mut self, drive: usize) -> Option<FloppyImage> {
        self.drives.get_mut(drive).and_then(Option::take)
    }

    pub fn image(&self, drive: usize) -> Option<&FloppyImage> {
        self.drives.get(drive).and_then(Option::as_ref)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn intrq_state(&self) -> bool {
        self.intrq
    }

    pub fn drq_state(&self) -> bool {
        self.drq
    }

    pub fn drive(&self) -> usize {
        self.drive
    }

    pub fn side(&self) -> u8 {
        self.side
    }

    pub fn is_mfm(&self) -> bool {
        self.mfm
    }

    /// Head position of the selected drive.
    pub fn cylinder(&self) -> u8 {
        self.cylinders[self.drive]
    }

    pub fn set_drive(&mut self, drive: usize) {
        self.drive = drive & 3;
    }

    pub fn set_side(&mut self, side: u8) {
        self.side = side & 1;
    }

    pub fn set_density(&mut self, mfm: bool) {
        self.mfm = mfm;
    }

    /// Controller reset: registers cleared, pending transfer dropped, head
    /// of the selected drive stepped back to track 0.
    pub fn reset<L: FdcLines + ?Sized>(&mut self, lines: &mut L) {
        self.abort_transfer();
        self.command = 0x03;
        self.track = 0;
        self.sector = 1;
        self.data = 0;
        self.cylinders[self.drive] = 0;
        self.status = self.type1_status();
        self.set_drq(false, lines);
        self.set_intrq(false, lines);
    }

    /// /MR input. Asserting it holds the controller in reset; releasing it
    /// runs a restore.
    pub fn set_master_reset<L: FdcLines + ?Sized>(&mut self, asserted: bool, lines: &mut L) {
        if asserted == self.in_reset {
            return;
        }
        self.in_reset = asserted;
        if asserted {
            self.abort_transfer();
            self.status = 0;
            self.set_drq(false, lines);
            self.set_intrq(false, lines);
        } else {
            self.command_w(0x03, lines);
        }
    }

    pub fn read<L: FdcLines + ?Sized>(&mut self, offset: u32, lines: &mut L) -> u8 {
        match offset & 3 {
            0 => self.status_r(lines),
            1 => self.track,
            2 => self.sector,
            _ => self.data_r(lines),
        }
    }

    pub fn write<L: FdcLines + ?Sized>(&mut self, offset: u32, data: u8, lines: &mut L) {
        match offset & 3 {
            0 => self.command_w(data, lines),
            1 => self.track = data,
            2 => self.sector = data,
            _ => self.data_w(data, lines),
        }
    }

    /// Status register. Reading it acknowledges INTRQ.
    pub fn status_r<L: FdcLines + ?Sized>(&mut self, lines: &mut L) -> u8 {
        self.set_intrq(false, lines);
        let mut status = self.status;
        if self.is_type1(self.command) {
            status = (status & !(STATUS_NOT_READY | STATUS_WRITE_PROTECT))
                | self.drive_status();
        }
        status
    }

    pub fn track_r(&self) -> u8 {
        self.track
    }

    pub fn sector_r(&self) -> u8 {
        self.sector
    }

    pub fn data_r<L: FdcLines + ?Sized>(&mut self, lines: &mut L) -> u8 {
        match self.transfer {
            Some(Transfer::ReadSector { .. }) | Some(Transfer::ReadAddress) => {}
            _ => {
                log(LogCategory::Fdc, LogLevel::Debug, || {
                    "WD17xx: data read with no transfer pending".to_string()
                });
                return self.data;
            }
        }

        self.data = self.buffer[self.position];
        self.position += 1;
        self.set_drq(false, lines);

        if self.position < self.buffer.len() {
            self.set_drq(true, lines);
        } else {
            match self.transfer {
                Some(Transfer::ReadSector { multi: true }) => {
                    self.sector = self.sector.wrapping_add(1);
                    self.load_sector(true, lines);
                }
                Some(Transfer::ReadAddress) => {
                    self.sector = self.buffer[0];
                    self.finish(0, lines);
                }
                _ => self.finish(0, lines),
            }
        }
        self.data
    }

    pub fn data_w<L: FdcLines + ?Sized>(&mut self, data: u8, lines: &mut L) {
        self.data = data;
        let Some(Transfer::WriteSector { multi }) = self.transfer else {
            return;
        };

        self.buffer.push(data);
        self.set_drq(false, lines);
        if self.buffer.len() < self.sector_size() {
            self.set_drq(true, lines);
            return;
        }

        let (track, side, sector) = (self.cylinder(), self.side, self.sector);
        let result = match self.drives[self.drive].as_mut() {
            Some(image) => image.write_sector(track, side, sector, &self.buffer),
            None => Ok(()),
        };
        if let Err(err) = result {
            log(LogCategory::Fdc, LogLevel::Warn, || format!("WD17xx: {}", err));
            self.finish(STATUS_RNF, lines);
            return;
        }

        if multi {
            self.sector = self.sector.wrapping_add(1);
            self.start_write(lines);
        } else {
            self.finish(0, lines);
        }
    }

    pub fn command_w<L: FdcLines + ?Sized>(&mut self, data: u8, lines: &mut L) {
        if self.in_reset {
            return;
        }

        // Force interrupt is accepted at any time
        if data & 0xF0 == 0xD0 {
            self.force_interrupt(data, lines);
            return;
        }
        if self.status & STATUS_BUSY != 0 {
            log(LogCategory::Fdc, LogLevel::Debug, || {
                format!("WD17xx: command {:#04x} ignored while busy", data)
            });
            return;
        }

        self.command = data;
        self.phase = Phase::Command;
        self.set_intrq(false, lines);
        log(LogCategory::Fdc, LogLevel::Debug, || {
            format!("WD17xx: command {:#04x}", data)
        });

        match data >> 4 {
            0x0 => self.seek_to(0, data, true, lines),
            0x1 => self.seek_to(self.data, data, false, lines),
            0x2 | 0x3 => self.step(self.direction, data, lines),
            0x4 | 0x5 => self.step(1, data, lines),
            0x6 | 0x7 => self.step(-1, data, lines),
            0x8 | 0x9 => self.start_read(data & 0x10 != 0, lines),
            0xA | 0xB => self.start_write_command(data & 0x10 != 0, lines),
            0xC => self.read_address(lines),
            _ => self.track_command(data, lines),
        }
    }

    fn is_type1(&self, command: u8) -> bool {
        command & 0x80 == 0 || command & 0xF0 == 0xD0
    }

    fn drive_status(&self) -> u8 {
        match &self.drives[self.drive] {
            None => STATUS_NOT_READY,
            Some(image) if image.is_write_protected() => STATUS_WRITE_PROTECT,
            Some(_) => 0,
        }
    }

    fn type1_status(&self) -> u8 {
        let mut status = self.drive_status();
        if self.cylinder() == 0 {
            status |= STATUS_TRACK0;
        }
        status
    }

    fn seek_to<L: FdcLines + ?Sized>(&mut self, target: u8, command: u8, restore: bool, lines: &mut L) {
        if restore {
            self.track = 0xFF;
        }
        let cylinder = &mut self.cylinders[self.drive];
        if target > self.track {
            self.direction = 1;
            *cylinder = cylinder.saturating_add(target - self.track);
        } else if target < self.track {
            self.direction = -1;
            *cylinder = cylinder.saturating_sub(self.track - target);
        }
        if restore {
            *cylinder = 0;
        }
        self.track = target;
        self.end_type1(command, lines);
    }

    fn step<L: FdcLines + ?Sized>(&mut self, direction: i8, command: u8, lines: &mut L) {
        self.direction = direction;
        let cylinder = &mut self.cylinders[self.drive];
        *cylinder = if direction > 0 {
            cylinder.saturating_add(1).min(83)
        } else {
            cylinder.saturating_sub(1)
        };
        // u flag: update the track register
        if command & 0x10 != 0 {
            self.track = if direction > 0 {
                self.track.wrapping_add(1)
            } else {
                self.track.wrapping_sub(1)
            };
        }
        self.end_type1(command, lines);
    }

    fn end_type1<L: FdcLines + ?Sized>(&mut self, command: u8, lines: &mut L) {
        let mut status = self.type1_status();
        if command & 0x08 != 0 {
            status |= STATUS_HEAD_LOADED;
        }
        // v flag: verify the track register against the head position
        if command & 0x04 != 0 {
            let found = self.drives[self.drive]
                .as_ref()
                .is_some_and(|image| image.has_track(self.cylinder(), self.side));
            if !found || self.track != self.cylinder() {
                status |= STATUS_SEEK_ERROR;
            }
        }
        self.status = status;
        self.phase = Phase::Idle;
        self.set_intrq(true, lines);
    }

    fn start_read<L: FdcLines + ?Sized>(&mut self, multi: bool, lines: &mut L) {
        self.transfer = Some(Transfer::ReadSector { multi });
        self.load_sector(false, lines);
    }

    /// Fetch the sector addressed by the sector register and present its
    /// first byte. `continuing` is set for the second and later sectors of a
    /// multi-sector read, which end cleanly when the track runs out.
    fn load_sector<L: FdcLines + ?Sized>(&mut self, continuing: bool, lines: &mut L) {
        let (track, side, sector) = (self.cylinder(), self.side, self.sector);
        let result = self.drives[self.drive]
            .as_ref()
            .map(|image| image.read_sector(track, side, sector).map(<[u8]>::to_vec));

        match result {
            None => self.finish(STATUS_NOT_READY, lines),
            Some(Ok(bytes)) => {
                self.buffer = bytes;
                self.position = 0;
                self.phase = Phase::DataTransfer;
                self.status = STATUS_BUSY;
                self.set_drq(true, lines);
            }
            Some(Err(err)) => {
                log(LogCategory::Fdc, LogLevel::Debug, || format!("WD17xx: {}", err));
                let status = if continuing { 0 } else { STATUS_RNF };
                self.finish(status, lines);
            }
        }
    }

    fn start_write_command<L: FdcLines + ?Sized>(&mut self, multi: bool, lines: &mut L) {
        match self.drive_status() {
            0 => {
                self.transfer = Some(Transfer::WriteSector { multi });
                self.start_write(lines);
            }
            status => self.finish(status, lines),
        }
    }

    fn start_write<L: FdcLines + ?Sized>(&mut self, lines: &mut L) {
        let (track, side, sector) = (self.cylinder(), self.side, self.sector);
        let exists = self.drives[self.drive]
            .as_ref()
            .is_some_and(|image| image.read_sector(track, side, sector).is_ok());
        if !exists {
            let multi_continue = self.buffer.len() == self.sector_size();
            self.finish(if multi_continue { 0 } else { STATUS_RNF }, lines);
            return;
        }
        self.buffer.clear();
        self.phase = Phase::DataTransfer;
        self.status = STATUS_BUSY;
        self.set_drq(true, lines);
    }

    fn read_address<L: FdcLines + ?Sized>(&mut self, lines: &mut L) {
        let (cylinder, side) = (self.cylinder(), self.side);
        let geometry = match &self.drives[self.drive] {
            None => None,
            Some(image) => Some(image.has_track(cylinder, side).then(|| *image.geometry())),
        };
        let geometry = match geometry {
            None => return self.finish(STATUS_NOT_READY, lines),
            Some(None) => return self.finish(STATUS_RNF, lines),
            Some(Some(geometry)) => geometry,
        };

        // ID field of the first sector under the head, with a dummy CRC
        self.buffer = vec![
            self.cylinder(),
            self.side,
            geometry.first_sector_id,
            geometry.size_code(),
            0x00,
            0x00,
        ];
        self.position = 0;
        self.transfer = Some(Transfer::ReadAddress);
        self.phase = Phase::DataTransfer;
        self.status = STATUS_BUSY;
        self.set_drq(true, lines);
    }

    fn track_command<L: FdcLines + ?Sized>(&mut self, command: u8, lines: &mut L) {
        if !self.track_command_logged {
            self.track_command_logged = true;
            log(LogCategory::Stubs, LogLevel::Warn, || {
                format!("WD17xx: track command {:#04x} not supported", command)
            });
        }
        self.finish(STATUS_RNF, lines);
    }

    fn force_interrupt<L: FdcLines + ?Sized>(&mut self, command: u8, lines: &mut L) {
        let was_busy = self.status & STATUS_BUSY != 0;
        self.abort_transfer();
        self.set_drq(false, lines);
        if was_busy {
            self.status &= !STATUS_BUSY;
        } else {
            self.command = command;
            self.status = self.type1_status();
        }
        // Only the immediate/index conditions raise INTRQ
        if command & 0x0F != 0 {
            self.set_intrq(true, lines);
        } else {
            self.set_intrq(false, lines);
        }
    }

    fn finish<L: FdcLines + ?Sized>(&mut self, status: u8, lines: &mut L) {
        self.abort_transfer();
        self.status = status;
        self.set_drq(false, lines);
        self.set_intrq(true, lines);
    }

    fn abort_transfer(&mut self) {
        self.transfer = None;
        self.buffer.clear();
        self.position = 0;
        self.phase = Phase::Idle;
    }

    fn sector_size(&self) -> usize {
        self.drives[self.drive]
            .as_ref()
            .map_or(512, |image| usize::from(image.geometry().sector_size))
    }

    fn set_intrq<L: FdcLines + ?Sized>(&mut self, state: bool, lines: &mut L) {
        if self.intrq != state {
            self.intrq = state;
            lines.intrq(state);
        }
    }

    fn set_drq<L: FdcLines + ?Sized>(&mut self, state: bool, lines: &mut L) {
        if self.drq != state {
            self.drq = state;
            if state {
                self.status |= STATUS_DRQ;
            } else {
                self.status &= !STATUS_DRQ;
            }
            lines.drq(state);
        }
    }
}
