//! Apple II disk interfaces.
//!
//! Both cards put the Apple drive controller at 0x310-0x31F and a page of
//! their ROM at 0x320-0x3FF (read only). The second version adds a
//! write-only register at 0x380-0x383 decoded purely from the address: bit 1
//! picks one of two ROM pages, bit 0 chooses between the OS ROM (writes fall
//! through to the overlay RAM) and the overlay RAM.

use emu_core::lines::Disconnected;
use serde::{Deserialize, Serialize};

use crate::banking::{HighMemoryPlan, ReadPlan, Source, WindowPlan, WritePlan};

/// The Apple II floppy controller, driven register by register.
pub trait AppleFdc {
    fn read(&mut self, offset: u8) -> u8;
    fn write(&mut self, offset: u8, data: u8);
}

impl AppleFdc for Disconnected {
    fn read(&mut self, _offset: u8) -> u8 {
        0xFF
    }

    fn write(&mut self, _offset: u8, _data: u8) {}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Apple2 {
    v2: bool,
    page: u8,
    ram: bool,
}

impl Apple2 {
    pub fn v1() -> Self {
        Self::default()
    }

    /// Second version, as left by the install-time write to offset 0.
    pub fn v2() -> Self {
        Self {
            v2: true,
            ..Self::default()
        }
    }

    pub fn is_v2(&self) -> bool {
        self.v2
    }

    /// Decode a write to 0x380-0x383. The data is ignored.
    pub fn latch(&mut self, offset: u32) {
        self.page = ((offset & 0x02) >> 1) as u8;
        self.ram = offset & 0x01 != 0;
    }

    pub fn page(&self) -> u8 {
        self.page
    }

    /// Entry of the ROM page slot to show at 0x320.
    pub fn page_entry(&self) -> usize {
        if self.v2 {
            usize::from(self.page)
        } else {
            0
        }
    }

    /// High memory for the second card. The first uses the plain OS layout.
    pub fn plan(&self) -> HighMemoryPlan {
        if !self.v2 {
            return HighMemoryPlan::OS_ROM;
        }
        if self.ram {
            HighMemoryPlan::RAM
        } else {
            let rom = WindowPlan::new(ReadPlan::From(Source::Os), WritePlan::To(Source::Ram));
            HighMemoryPlan {
                low: rom,
                mid: rom,
                top: rom,
            }
        }
    }
}

/// Offsets in the interface ROM of the byte shown at 0x320, by slot entry.
pub fn page_offsets(v2: bool) -> &'static [usize] {
    if v2 {
        &[0x0100, 0x0200]
    } else {
        &[0x0020]
    }
}
