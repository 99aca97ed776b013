//! Core emulator primitives and traits.

pub mod chips;
pub mod floppy;
pub mod graphics;
pub mod irq;
pub mod lines;
pub mod logging;
pub mod memory;
pub mod types {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Frame {
        pub width: u32,
        pub height: u32,
        pub pixels: Vec<u32>,
    }

    impl Frame {
        pub fn new(width: u32, height: u32) -> Self {
            Self {
                width,
                height,
                pixels: vec![0; (width * height) as usize],
            }
        }
    }
}

use serde_json::Value;

use memory::MapEntry;

/// The CPU side of a machine: byte accesses, wider ones built little-endian.
pub trait Bus {
    fn read8(&mut self, addr: u32) -> u8;
    fn write8(&mut self, addr: u32, value: u8);

    fn read16(&mut self, addr: u32) -> u16 {
        let lo = self.read8(addr) as u16;
        let hi = self.read8(addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    fn read32(&mut self, addr: u32) -> u32 {
        let lo = self.read16(addr) as u32;
        let hi = self.read16(addr.wrapping_add(2)) as u32;
        (hi << 16) | lo
    }

    fn write16(&mut self, addr: u32, value: u16) {
        self.write8(addr, value as u8);
        self.write8(addr.wrapping_add(1), (value >> 8) as u8);
    }

    fn write32(&mut self, addr: u32, value: u32) {
        self.write16(addr, value as u16);
        self.write16(addr.wrapping_add(2), (value >> 16) as u16);
    }
}

/// Description of a mount point (media slot) that a machine supports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPointInfo {
    /// Unique identifier for this mount point (e.g., "Floppy0", "Hdd")
    pub id: String,
    /// User-friendly name for display (e.g., "Floppy drive 0")
    pub name: String,
    /// File extensions accepted by this mount point (e.g., ["dsk"])
    pub extensions: Vec<String>,
    /// Whether this mount point is required for the machine to function
    pub required: bool,
}

/// A whole board: address space, chips and their wiring.
pub trait Machine: Bus {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Reset to initial power-on state. RAM contents are kept.
    fn reset(&mut self);

    /// Resolved read and write windows, for inspection.
    fn memory_map(&self) -> Vec<MapEntry>;

    /// Return a JSON-serializable save state.
    /// Note: Save states do NOT include ROM or disk image data.
    fn save_state(&self) -> Value;

    /// Load a JSON save state.
    /// Returns error if the state is incompatible with this machine.
    fn load_state(&mut self, v: &Value) -> Result<(), serde_json::Error>;

    /// Check if this machine supports save/load state functionality
    fn supports_save_states(&self) -> bool {
        false
    }

    /// Get the list of mount points this machine supports
    fn mount_points(&self) -> Vec<MountPointInfo>;

    /// Load media into a specific mount point
    fn mount(&mut self, mount_point_id: &str, data: &[u8]) -> Result<(), Self::Error>;

    /// Unload media from a specific mount point
    fn unmount(&mut self, mount_point_id: &str) -> Result<(), Self::Error>;

    /// Check if a mount point has media loaded
    fn is_mounted(&self, mount_point_id: &str) -> bool;
}
