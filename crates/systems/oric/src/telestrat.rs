//! Telestrat cartridge banking and second VIA.
//!
//! The whole of 0xC000-0xFFFF is one of eight 16K blocks, selected by bits
//! 0-2 of VIA2 port A. Blocks 0, 1, 2 and 4 are RAM; 3, 5, 6 and 7 are the
//! four 16K quarters of the cartridge image, in that order. ROM blocks drop
//! writes.
//!
//! VIA2 port B bits 6 and 7 select the left and right joystick; the selected
//! sticks are ANDed into bits 0-4 (active low).

use std::fmt;

use emu_core::logging::{log, LogCategory, LogLevel};
use emu_core::memory::{AddressSpace, BufferId, BufferView, SlotId, Target};
use serde::{Deserialize, Serialize};

pub const BLOCK_SIZE: usize = 0x4000;
const RAM_BLOCKS: [usize; 4] = [0, 1, 2, 4];
const ROM_BLOCKS: [usize; 4] = [3, 5, 6, 7];

/// Block at 0xC000 after reset.
pub const BOOT_BLOCK: u8 = 7;

#[derive(Debug, Clone)]
pub struct TelestratBanks {
    slot: SlotId,
}

impl TelestratBanks {
    /// Configure the block slot. `ram` must hold the four RAM blocks and
    /// `cartridges` the four ROM blocks.
    pub fn new<H: Copy + fmt::Debug>(
        space: &mut AddressSpace<H>,
        ram: BufferId,
        cartridges: BufferId,
    ) -> Self {
        let slot = space.add_slot("telestrat");
        for (index, block) in RAM_BLOCKS.into_iter().enumerate() {
            space.configure_entry(slot, block, BufferView::new(ram, index * BLOCK_SIZE));
        }
        for (index, block) in ROM_BLOCKS.into_iter().enumerate() {
            space.configure_entry(slot, block, BufferView::new(cartridges, index * BLOCK_SIZE));
        }
        Self { slot }
    }

    pub fn is_rom(block: u8) -> bool {
        ROM_BLOCKS.contains(&usize::from(block & 7))
    }

    /// Show `block` at 0xC000.
    pub fn select<H: Copy + fmt::Debug>(&self, space: &mut AddressSpace<H>, block: u8) {
        let block = block & 7;
        log(LogCategory::Banking, LogLevel::Debug, || {
            format!("telestrat: block {} at 0xC000", block)
        });
        space.select(self.slot, usize::from(block));
        space.install_read(0xC000..=0xFFFF, 0, Target::Bank(self.slot));
        let write = if Self::is_rom(block) {
            Target::Nop
        } else {
            Target::Bank(self.slot)
        };
        space.install_write(0xC000..=0xFFFF, 0, write);
    }
}

/// VIA2 port latches and the joystick inputs behind port B.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelestratPorts {
    pub selection: u8,
    pub port_a: u8,
    pub port_b: u8,
    /// Active low, bits 0-4.
    pub joysticks: [u8; 2],
}

impl Default for TelestratPorts {
    fn default() -> Self {
        Self {
            selection: BOOT_BLOCK,
            port_a: 0,
            port_b: 0,
            joysticks: [0x1F; 2],
        }
    }
}

impl TelestratPorts {
    /// Record a port A write. Returns the new block when bits 0-2 changed.
    pub fn write_a(&mut self, data: u8) -> Option<u8> {
        self.port_a = data;
        if (data ^ self.selection) & 0x07 != 0 {
            self.selection = data & 0x07;
            Some(self.selection)
        } else {
            None
        }
    }

    pub fn read_b(&self) -> u8 {
        let mut data = 0x1F;
        if self.port_b & 0x40 != 0 {
            data &= self.joysticks[0];
        }
        if self.port_b & 0x80 != 0 {
            data &= self.joysticks[1];
        }
        data | (self.port_b & 0xE0)
    }
}
