use std::fmt;
use std::ops::RangeInclusive;

use super::bank::{BankSlot, SlotId};
use super::{BufferId, BufferView, MapDirection, MapEntry, MemoryError};
use crate::logging::{log, LogCategory, LogLevel};

/// What a window is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target<H> {
    /// Nothing answers; reads return open bus and writes vanish silently.
    Nop,
    /// Explicitly unmapped; like `Nop` but the access is logged.
    Unmapped,
    /// Whatever entry of the slot is currently selected.
    Bank(SlotId),
    /// A fixed view into an arena buffer.
    Buffer(BufferView),
    /// A device handler owned by the machine.
    Device(H),
}

/// An address range bound to a target, optionally mirrored.
///
/// An address matches when clearing its mirror bits lands inside
/// `start..=end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window<H> {
    pub start: u32,
    pub end: u32,
    pub mirror: u32,
    pub target: Target<H>,
}

impl<H> Window<H> {
    /// Offset of `addr` inside this window after mirror folding.
    fn offset_of(&self, addr: u32) -> Option<u32> {
        let folded = addr & !self.mirror;
        (self.start..=self.end)
            .contains(&folded)
            .then(|| folded - self.start)
    }

    /// True when every address this window decodes is also decoded by `other`.
    fn covered_by(&self, other: &Window<H>) -> bool {
        self.mirror == other.mirror && other.start <= self.start && self.end <= other.end
    }
}

/// Result of a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access<H> {
    /// Served from memory (or open bus).
    Data(u8),
    /// A device must answer; carries the handler and the offset in its window.
    Device(H, u32),
}

#[derive(Debug, Clone)]
struct Buffer {
    name: String,
    data: Vec<u8>,
    writable: bool,
}

/// A CPU-visible address space.
///
/// Windows are resolved most-recent-first, so installing a window over an
/// existing one overrides it for the overlapping addresses.
#[derive(Debug, Clone)]
pub struct AddressSpace<H> {
    name: String,
    addr_mask: u32,
    open_bus: u8,
    buffers: Vec<Buffer>,
    slots: Vec<BankSlot>,
    read_map: Vec<Window<H>>,
    write_map: Vec<Window<H>>,
}

impl<H: Copy + fmt::Debug> AddressSpace<H> {
    /// Create an empty space decoding `address_bits` bits. Open bus is `0xFF`.
    pub fn new(name: &str, address_bits: u32) -> Self {
        let addr_mask = if address_bits >= 32 {
            u32::MAX
        } else {
            (1u32 << address_bits) - 1
        };
        Self {
            name: name.to_string(),
            addr_mask,
            open_bus: 0xFF,
            buffers: Vec::new(),
            slots: Vec::new(),
            read_map: Vec::new(),
            write_map: Vec::new(),
        }
    }

    pub fn with_open_bus(mut self, value: u8) -> Self {
        self.open_bus = value;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn open_bus(&self) -> u8 {
        self.open_bus
    }

    // Buffers

    /// Allocate a zero-filled RAM buffer.
    pub fn add_ram(&mut self, name: &str, size: usize) -> BufferId {
        self.add_buffer(name, vec![0; size], true)
    }

    /// Take ownership of a ROM image. Writes into it are dropped.
    pub fn add_rom(&mut self, name: &str, data: Vec<u8>) -> BufferId {
        self.add_buffer(name, data, false)
    }

    fn add_buffer(&mut self, name: &str, data: Vec<u8>, writable: bool) -> BufferId {
        self.buffers.push(Buffer {
            name: name.to_string(),
            data,
            writable,
        });
        BufferId(self.buffers.len() - 1)
    }

    /// Copy `data` into a buffer (RAM or ROM) at `offset`.
    pub fn load(&mut self, id: BufferId, offset: usize, data: &[u8]) -> Result<(), MemoryError> {
        let buffer = &mut self.buffers[id.0];
        let size = buffer.data.len();
        match offset.checked_add(data.len()) {
            Some(end) if end <= size => {
                buffer.data[offset..end].copy_from_slice(data);
                Ok(())
            }
            _ => Err(MemoryError::OutOfBounds {
                buffer: buffer.name.clone(),
                offset,
                len: data.len(),
                size,
            }),
        }
    }

    pub fn buffer(&self, id: BufferId) -> &[u8] {
        &self.buffers[id.0].data
    }

    pub fn buffer_mut(&mut self, id: BufferId) -> &mut [u8] {
        &mut self.buffers[id.0].data
    }

    pub fn buffer_name(&self, id: BufferId) -> &str {
        &self.buffers[id.0].name
    }

    // Bank slots

    pub fn add_slot(&mut self, name: &str) -> SlotId {
        self.slots.push(BankSlot::new(name));
        SlotId(self.slots.len() - 1)
    }

    pub fn configure_entry(&mut self, slot: SlotId, entry: usize, view: BufferView) {
        self.slots[slot.0].configure(entry, view);
    }

    pub fn slot(&self, slot: SlotId) -> &BankSlot {
        &self.slots[slot.0]
    }

    /// Switch `slot` to `entry`.
    ///
    /// # Panics
    ///
    /// Panics if the entry was never configured. An undefined entry is a
    /// wiring mistake in the machine, use [`Self::try_select`] where the entry
    /// comes from untrusted data.
    pub fn select(&mut self, slot: SlotId, entry: usize) {
        if let Err(err) = self.try_select(slot, entry) {
            panic!("{}: {}", self.name, err);
        }
    }

    pub fn try_select(&mut self, slot: SlotId, entry: usize) -> Result<(), MemoryError> {
        let bank = &mut self.slots[slot.0];
        bank.select(entry)?;
        log(LogCategory::Banking, LogLevel::Trace, || {
            format!("{}: {} -> entry {}", self.name, bank.name(), entry)
        });
        Ok(())
    }

    /// Selected entry of every slot, in creation order.
    pub fn selections(&self) -> Vec<Option<usize>> {
        self.slots.iter().map(BankSlot::current).collect()
    }

    /// Restore selections captured by [`Self::selections`].
    pub fn restore_selections(&mut self, selections: &[Option<usize>]) -> Result<(), MemoryError> {
        if selections.len() != self.slots.len() {
            return Err(MemoryError::SelectionCount {
                expected: self.slots.len(),
                actual: selections.len(),
            });
        }
        for (index, selection) in selections.iter().enumerate() {
            if let Some(entry) = *selection {
                self.slots[index].select(entry)?;
            }
        }
        Ok(())
    }

    // Window installation

    /// Install a read window.
    ///
    /// # Panics
    ///
    /// Panics if the range is reversed or if `mirror` shares bits with the
    /// range bounds.
    pub fn install_read(&mut self, range: RangeInclusive<u32>, mirror: u32, target: Target<H>) {
        let window = self.make_window(range, mirror, target);
        Self::push_window(&mut self.read_map, window);
    }

    /// Install a write window. Same rules as [`Self::install_read`].
    pub fn install_write(&mut self, range: RangeInclusive<u32>, mirror: u32, target: Target<H>) {
        let window = self.make_window(range, mirror, target);
        Self::push_window(&mut self.write_map, window);
    }

    /// Install the same target for reads and writes.
    pub fn install(&mut self, range: RangeInclusive<u32>, mirror: u32, target: Target<H>) {
        self.install_read(range.clone(), mirror, target);
        self.install_write(range, mirror, target);
    }

    /// Remove every window. Buffers and slots are kept.
    pub fn clear_windows(&mut self) {
        self.read_map.clear();
        self.write_map.clear();
    }

    fn make_window(&self, range: RangeInclusive<u32>, mirror: u32, target: Target<H>) -> Window<H> {
        let (start, end) = range.into_inner();
        let mirror = mirror & self.addr_mask;
        assert!(
            start <= end,
            "{}: reversed window {:#x}-{:#x}",
            self.name,
            start,
            end
        );
        assert!(
            (start | end) & mirror == 0,
            "{}: mirror {:#x} overlaps window {:#x}-{:#x}",
            self.name,
            mirror,
            start,
            end
        );
        Window {
            start: start & self.addr_mask,
            end: end & self.addr_mask,
            mirror,
            target,
        }
    }

    fn push_window(map: &mut Vec<Window<H>>, window: Window<H>) {
        map.retain(|existing| !existing.covered_by(&window));
        map.push(window);
    }

    pub fn read_windows(&self) -> &[Window<H>] {
        &self.read_map
    }

    pub fn write_windows(&self) -> &[Window<H>] {
        &self.write_map
    }

    /// Every window, highest priority first within each direction.
    pub fn listing(&self) -> Vec<MapEntry> {
        let read = self.read_map.iter().rev().map(|w| (MapDirection::Read, w));
        let write = self.write_map.iter().rev().map(|w| (MapDirection::Write, w));
        read.chain(write)
            .map(|(direction, window)| MapEntry {
                direction,
                start: window.start,
                end: window.end,
                mirror: window.mirror,
                target: self.describe(&window.target),
            })
            .collect()
    }

    fn lookup(map: &[Window<H>], addr: u32) -> Option<(&Window<H>, u32)> {
        map.iter()
            .rev()
            .find_map(|window| window.offset_of(addr).map(|offset| (window, offset)))
    }

    /// Window answering reads at `addr`, with the offset inside it.
    pub fn resolve_read(&self, addr: u32) -> Option<(&Window<H>, u32)> {
        Self::lookup(&self.read_map, addr & self.addr_mask)
    }

    /// Window answering writes at `addr`, with the offset inside it.
    pub fn resolve_write(&self, addr: u32) -> Option<(&Window<H>, u32)> {
        Self::lookup(&self.write_map, addr & self.addr_mask)
    }

    fn view_of(&self, target: &Target<H>) -> Option<BufferView> {
        match target {
            Target::Buffer(view) => Some(*view),
            Target::Bank(slot) => self.slots[slot.0].current_view(),
            _ => None,
        }
    }

    // Accesses

    /// Read a byte. Device windows are handed back to the caller.
    pub fn read(&self, addr: u32) -> Access<H> {
        let addr = addr & self.addr_mask;
        let Some((window, offset)) = Self::lookup(&self.read_map, addr) else {
            log(LogCategory::Bus, LogLevel::Debug, || {
                format!("{}: unmapped read at {:#06x}", self.name, addr)
            });
            return Access::Data(self.open_bus);
        };

        match window.target {
            Target::Device(handler) => Access::Device(handler, offset),
            Target::Nop => Access::Data(self.open_bus),
            Target::Unmapped => {
                log(LogCategory::Bus, LogLevel::Debug, || {
                    format!("{}: read from unmapped {:#06x}", self.name, addr)
                });
                Access::Data(self.open_bus)
            }
            Target::Bank(_) | Target::Buffer(_) => {
                Access::Data(self.read_view(&window.target, offset).unwrap_or(self.open_bus))
            }
        }
    }

    fn read_view(&self, target: &Target<H>, offset: u32) -> Option<u8> {
        let view = self.view_of(target)?;
        self.buffers[view.buffer.0]
            .data
            .get(view.offset + offset as usize)
            .copied()
    }

    /// Write a byte. Returns the handler and offset when a device must take it.
    pub fn write(&mut self, addr: u32, value: u8) -> Option<(H, u32)> {
        let addr = addr & self.addr_mask;
        let Some((window, offset)) = Self::lookup(&self.write_map, addr) else {
            log(LogCategory::Bus, LogLevel::Debug, || {
                format!("{}: unmapped write {:#04x} at {:#06x}", self.name, value, addr)
            });
            return None;
        };

        match window.target {
            Target::Device(handler) => Some((handler, offset)),
            Target::Nop => None,
            Target::Unmapped => {
                log(LogCategory::Bus, LogLevel::Debug, || {
                    format!("{}: write {:#04x} to unmapped {:#06x}", self.name, value, addr)
                });
                None
            }
            Target::Bank(_) | Target::Buffer(_) => {
                let target = window.target;
                self.write_view(&target, offset, addr, value);
                None
            }
        }
    }

    fn write_view(&mut self, target: &Target<H>, offset: u32, addr: u32, value: u8) {
        let Some(view) = self.view_of(target) else {
            log(LogCategory::Banking, LogLevel::Debug, || {
                format!("{}: write to unselected bank at {:#06x}", self.name, addr)
            });
            return;
        };
        let buffer = &mut self.buffers[view.buffer.0];
        if !buffer.writable {
            log(LogCategory::Bus, LogLevel::Trace, || {
                format!("{}: write {:#04x} to ROM at {:#06x} ignored", self.name, value, addr)
            });
            return;
        }
        if let Some(byte) = buffer.data.get_mut(view.offset + offset as usize) {
            *byte = value;
        }
    }

    /// Read memory without device side effects. `None` for device windows.
    pub fn peek(&self, addr: u32) -> Option<u8> {
        match self.read(addr) {
            Access::Data(value) => Some(value),
            Access::Device(..) => None,
        }
    }

    /// Human-readable description of a target, for memory map listings.
    pub fn describe(&self, target: &Target<H>) -> String {
        match target {
            Target::Nop => "nop".to_string(),
            Target::Unmapped => "unmapped".to_string(),
            Target::Device(handler) => format!("device {:?}", handler),
            Target::Buffer(view) => format!(
                "{}+{:#06x}",
                self.buffers[view.buffer.0].name, view.offset
            ),
            Target::Bank(slot) => {
                let bank = &self.slots[slot.0];
                match (bank.current(), bank.current_view()) {
                    (Some(entry), Some(view)) => format!(
                        "{}[{}] = {}+{:#06x}",
                        bank.name(),
                        entry,
                        self.buffers[view.buffer.0].name,
                        view.offset
                    ),
                    _ => format!("{}[unselected]", bank.name()),
                }
            }
        }
    }
}
