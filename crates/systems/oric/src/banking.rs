//! Banking of the 16K at 0xC000.
//!
//! The region is split into three windows, each read through its own bank
//! slot and written through another:
//!
//! | Window        | Read slot | Write slot |
//! |---------------|-----------|------------|
//! | 0xC000-0xDFFF | bank1     | bank5      |
//! | 0xE000-0xF7FF | bank2     | bank6      |
//! | 0xF800-0xFFFF | bank3     | bank7      |
//!
//! Disk interfaces describe what each window should show as a
//! [`HighMemoryPlan`]; [`HighMemory::apply`] turns the plan into slot
//! selections and window installs. The top window's write side is never
//! re-installed: it always goes through bank7, only the entry changes.

use std::fmt;
use std::ops::RangeInclusive;

use emu_core::logging::{log, LogCategory, LogLevel};
use emu_core::memory::{AddressSpace, BufferId, BufferView, SlotId, Target};

pub const LOW: RangeInclusive<u32> = 0xC000..=0xDFFF;
pub const MID: RangeInclusive<u32> = 0xE000..=0xF7FF;
pub const TOP: RangeInclusive<u32> = 0xF800..=0xFFFF;

/// Memory that can appear in the high windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Overlay RAM under the ROM.
    Ram,
    Os,
    /// Microdisc EPROM, mid and top windows only.
    DiskRom,
    /// Jasmin boot ROM, top window only.
    JasminRom,
}

impl Source {
    fn entry(self) -> usize {
        match self {
            Source::Ram => 0,
            Source::Os => 1,
            Source::DiskRom => 2,
            Source::JasminRom => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadPlan {
    /// Open bus, silently.
    Nothing,
    From(Source),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePlan {
    /// Leave the write side as it is.
    Keep,
    /// Drop writes and log them.
    Unmapped,
    To(Source),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPlan {
    pub read: ReadPlan,
    pub write: WritePlan,
}

impl WindowPlan {
    pub const fn new(read: ReadPlan, write: WritePlan) -> Self {
        Self { read, write }
    }

    /// Reads and writes both go to `source`.
    pub const fn both(source: Source) -> Self {
        Self::new(ReadPlan::From(source), WritePlan::To(source))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighMemoryPlan {
    pub low: WindowPlan,
    pub mid: WindowPlan,
    pub top: WindowPlan,
}

impl HighMemoryPlan {
    /// OS ROM everywhere, writes to the two lower windows unmapped. This is
    /// the layout without a disk interface.
    pub const OS_ROM: Self = Self {
        low: WindowPlan::new(ReadPlan::From(Source::Os), WritePlan::Unmapped),
        mid: WindowPlan::new(ReadPlan::From(Source::Os), WritePlan::Unmapped),
        top: WindowPlan::both(Source::Os),
    };

    /// Overlay RAM everywhere.
    pub const RAM: Self = Self {
        low: WindowPlan::both(Source::Ram),
        mid: WindowPlan::both(Source::Ram),
        top: WindowPlan::both(Source::Ram),
    };
}

/// The six slots behind the high windows.
#[derive(Debug, Clone)]
pub struct HighMemory {
    read_slots: [SlotId; 3],
    write_slots: [SlotId; 3],
}

/// Buffers that can be banked in.
#[derive(Debug, Clone, Copy)]
pub struct HighBuffers {
    pub ram: BufferId,
    pub os: BufferId,
    pub disk_rom: Option<BufferId>,
    pub jasmin_rom: Option<BufferId>,
}

impl HighMemory {
    /// Create bank1-3 and bank5-7 and their entries. Nothing is installed yet.
    pub fn new<H: Copy + fmt::Debug>(space: &mut AddressSpace<H>, buffers: HighBuffers) -> Self {
        let read_slots = [
            space.add_slot("bank1"),
            space.add_slot("bank2"),
            space.add_slot("bank3"),
        ];
        let write_slots = [
            space.add_slot("bank5"),
            space.add_slot("bank6"),
            space.add_slot("bank7"),
        ];

        let ram_offsets = [0xC000, 0xE000, 0xF800];
        let os_offsets = [0x0000, 0x2000, 0x3800];
        for window in 0..3 {
            for slot in [read_slots[window], write_slots[window]] {
                space.configure_entry(
                    slot,
                    Source::Ram.entry(),
                    BufferView::new(buffers.ram, ram_offsets[window]),
                );
                space.configure_entry(
                    slot,
                    Source::Os.entry(),
                    BufferView::new(buffers.os, os_offsets[window]),
                );
            }
        }

        if let Some(rom) = buffers.disk_rom {
            for (window, offset) in [(1, 0x0000), (2, 0x1800)] {
                for slot in [read_slots[window], write_slots[window]] {
                    space.configure_entry(slot, Source::DiskRom.entry(), BufferView::new(rom, offset));
                }
            }
        }
        if let Some(rom) = buffers.jasmin_rom {
            for slot in [read_slots[2], write_slots[2]] {
                space.configure_entry(slot, Source::JasminRom.entry(), BufferView::new(rom, 0));
            }
        }

        Self {
            read_slots,
            write_slots,
        }
    }

    /// Install the base windows: every read and write goes through its slot.
    pub fn install<H: Copy + fmt::Debug>(&self, space: &mut AddressSpace<H>) {
        for (window, range) in [LOW, MID, TOP].into_iter().enumerate() {
            space.install_read(range.clone(), 0, Target::Bank(self.read_slots[window]));
            space.install_write(range, 0, Target::Bank(self.write_slots[window]));
        }
    }

    pub fn apply<H: Copy + fmt::Debug>(&self, space: &mut AddressSpace<H>, plan: &HighMemoryPlan) {
        log(LogCategory::Banking, LogLevel::Debug, || format!("high memory: {:?}", plan));
        self.apply_window(space, 0, LOW, &plan.low);
        self.apply_window(space, 1, MID, &plan.mid);
        self.apply_window(space, 2, TOP, &plan.top);
    }

    fn apply_window<H: Copy + fmt::Debug>(
        &self,
        space: &mut AddressSpace<H>,
        window: usize,
        range: RangeInclusive<u32>,
        plan: &WindowPlan,
    ) {
        match plan.read {
            ReadPlan::Nothing => space.install_read(range.clone(), 0, Target::Nop),
            ReadPlan::From(source) => {
                let slot = self.read_slots[window];
                space.select(slot, source.entry());
                space.install_read(range.clone(), 0, Target::Bank(slot));
            }
        }

        let slot = self.write_slots[window];
        match plan.write {
            WritePlan::Keep => {}
            WritePlan::Unmapped if window == 2 => {}
            WritePlan::Unmapped => space.install_write(range, 0, Target::Unmapped),
            WritePlan::To(source) => {
                space.select(slot, source.entry());
                if window != 2 {
                    space.install_write(range, 0, Target::Bank(slot));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emu_core::memory::Access;

    fn space() -> (AddressSpace<()>, HighMemory) {
        let mut space = AddressSpace::new("test", 16);
        let ram = space.add_ram("ram", 0x10000);
        let os = space.add_rom("os", (0..0x4000).map(|i| (i >> 8) as u8).collect());
        let disk = space.add_rom("disk", vec![0xD0; 0x2000]);
        let high = HighMemory::new(
            &mut space,
            HighBuffers {
                ram,
                os,
                disk_rom: Some(disk),
                jasmin_rom: None,
            },
        );
        high.install(&mut space);
        (space, high)
    }

    #[test]
    fn test_os_plan_maps_rom_offsets() {
        let (mut space, high) = space();
        high.apply(&mut space, &HighMemoryPlan::OS_ROM);

        assert_eq!(space.read(0xC000), Access::Data(0x00));
        assert_eq!(space.read(0xE100), Access::Data(0x21));
        assert_eq!(space.read(0xF900), Access::Data(0x39));

        // Writes are either unmapped or land on ROM
        space.write(0xC000, 0x55);
        space.write(0xFFFF, 0x55);
        assert_eq!(space.read(0xC000), Access::Data(0x00));
        assert_eq!(space.read(0xFFFF), Access::Data(0x3F));
    }

    #[test]
    fn test_ram_plan_round_trips() {
        let (mut space, high) = space();
        high.apply(&mut space, &HighMemoryPlan::RAM);

        for addr in [0xC000, 0xDFFF, 0xE000, 0xF7FF, 0xF800, 0xFFFF] {
            space.write(addr, addr as u8 ^ 0xA5);
            assert_eq!(space.read(addr), Access::Data(addr as u8 ^ 0xA5));
        }
    }

    #[test]
    fn test_nothing_reads_open_bus() {
        let (mut space, high) = space();
        let plan = HighMemoryPlan {
            low: WindowPlan::new(ReadPlan::Nothing, WritePlan::Unmapped),
            mid: WindowPlan::new(ReadPlan::From(Source::DiskRom), WritePlan::Unmapped),
            top: WindowPlan::new(ReadPlan::From(Source::DiskRom), WritePlan::Keep),
        };
        high.apply(&mut space, &plan);

        assert_eq!(space.read(0xC123), Access::Data(0xFF));
        assert_eq!(space.read(0xE000), Access::Data(0xD0));
        assert_eq!(space.read(0xFFFC), Access::Data(0xD0));
    }

    #[test]
    fn test_top_write_keeps_previous_entry() {
        let (mut space, high) = space();
        high.apply(&mut space, &HighMemoryPlan::RAM);

        let plan = HighMemoryPlan {
            top: WindowPlan::new(ReadPlan::From(Source::Os), WritePlan::Keep),
            ..HighMemoryPlan::OS_ROM
        };
        high.apply(&mut space, &plan);

        // Reads show the ROM, writes still reach the overlay RAM underneath
        space.write(0xF800, 0x42);
        assert_eq!(space.read(0xF800), Access::Data(0x38));
        high.apply(&mut space, &HighMemoryPlan::RAM);
        assert_eq!(space.read(0xF800), Access::Data(0x42));
    }
}
