//! Oric Microdisc controller: a WD1793 at 0x310-0x313 plus two latches.
//!
//! Control register at 0x314 (write):
//!
//! | Bit | Meaning                                   |
//! |-----|-------------------------------------------|
//! | 0   | FDC INTRQ reaches the CPU                 |
//! | 1   | /ROMDIS: 0 disables the OS ROM            |
//! | 3   | double density                            |
//! | 4   | side                                      |
//! | 5-6 | drive                                     |
//! | 7   | /EPROM: 0 enables the controller EPROM    |
//!
//! Reads of 0x314 and 0x318 return INTRQ and DRQ in bit 7, active low, with
//! the other bits pulled high.

use serde::{Deserialize, Serialize};

use crate::banking::{HighMemoryPlan, ReadPlan, Source, WindowPlan, WritePlan};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Microdisc {
    control: u8,
    intrq_status: u8,
    drq_status: u8,
    intrq: bool,
}

impl Default for Microdisc {
    fn default() -> Self {
        Self::new()
    }
}

impl Microdisc {
    /// OS ROM disabled, EPROM enabled, everything else set.
    pub const INSTALL_VALUE: u8 = 0xFF ^ 0x82;

    pub fn new() -> Self {
        Self {
            control: Self::INSTALL_VALUE,
            intrq_status: 0x80,
            drq_status: 0x80,
            intrq: false,
        }
    }

    pub fn control(&self) -> u8 {
        self.control
    }

    pub fn set_control(&mut self, data: u8) {
        self.control = data;
    }

    pub fn irq_enabled(&self) -> bool {
        self.control & 0x01 != 0
    }

    pub fn os_rom_enabled(&self) -> bool {
        self.control & 0x02 != 0
    }

    pub fn eprom_enabled(&self) -> bool {
        self.control & 0x80 == 0
    }

    pub fn mfm(&self) -> bool {
        self.control & 0x08 != 0
    }

    pub fn side(&self) -> u8 {
        (self.control >> 4) & 1
    }

    pub fn drive(&self) -> usize {
        usize::from((self.control >> 5) & 3)
    }

    pub fn intrq(&self) -> bool {
        self.intrq
    }

    pub fn set_intrq(&mut self, state: bool) {
        self.intrq = state;
        if state {
            self.intrq_status &= !0x80;
        } else {
            self.intrq_status |= 0x80;
        }
    }

    pub fn set_drq(&mut self, state: bool) {
        if state {
            self.drq_status &= !0x80;
        } else {
            self.drq_status |= 0x80;
        }
    }

    /// Register 0x314.
    pub fn intrq_r(&self) -> u8 {
        self.intrq_status | 0x7F
    }

    /// Register 0x318.
    pub fn drq_r(&self) -> u8 {
        self.drq_status | 0x7F
    }

    pub fn plan(&self) -> HighMemoryPlan {
        let low = if self.os_rom_enabled() {
            WindowPlan::new(ReadPlan::From(Source::Os), WritePlan::Unmapped)
        } else {
            WindowPlan::both(Source::Ram)
        };

        let (mid, top) = if self.os_rom_enabled() {
            (
                WindowPlan::new(ReadPlan::From(Source::Os), WritePlan::Unmapped),
                WindowPlan::both(Source::Os),
            )
        } else if self.eprom_enabled() {
            (
                WindowPlan::new(ReadPlan::From(Source::DiskRom), WritePlan::Unmapped),
                WindowPlan::new(ReadPlan::From(Source::DiskRom), WritePlan::Keep),
            )
        } else {
            (WindowPlan::both(Source::Ram), WindowPlan::both(Source::Ram))
        };

        HighMemoryPlan { low, mid, top }
    }
}
