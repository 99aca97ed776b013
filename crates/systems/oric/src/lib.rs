//! Oric-1, Oric Atmos and Telestrat chipset
//!
//! The CPU is not emulated here: [`OricSystem`] is the board as a 6502 sees
//! it, an address space with a VIA, a PSG, an optional disk interface and the
//! banking logic for the 16K at 0xC000.

mod banking;
mod bus;
mod config;
mod interfaces;
mod keyboard;
mod telestrat;

pub use banking::{HighMemoryPlan, ReadPlan, Source, WindowPlan, WritePlan};
pub use bus::{OricBus, OricDevice, OricSpace, PsgLink, TAPE_SAMPLE_HZ};
pub use config::{DiskInterface, Model, OricConfig};
pub use interfaces::{Apple2, AppleFdc, Interface, Jasmin, Microdisc};
pub use keyboard::Keyboard;
pub use telestrat::TelestratPorts;

use emu_core::chips::{Ay8910, Via6522, Wd17xx};
use emu_core::floppy::{FloppyError, FloppyImage};
use emu_core::irq::InterruptAggregator;
use emu_core::memory::MapEntry;
use emu_core::{Bus, Machine, MountPointInfo};
use serde::de::Error as _;
use serde_json::Value;

#[derive(thiserror::Error, Debug)]
pub enum OricError {
    #[error("{name} ROM must be {expected:#x} bytes, got {actual:#x}")]
    RomSize {
        name: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("No ROM supplied for the {0:?} interface")]
    MissingInterfaceRom(DiskInterface),
    #[error("Invalid mount point")]
    InvalidMountPoint,
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
    #[error("Invalid disk image: {0}")]
    Floppy(#[from] FloppyError),
}

/// ROM images. The OS image is 16K, or 64K of cartridges on the Telestrat.
#[derive(Debug, Clone, Default)]
pub struct OricRoms {
    pub os: Vec<u8>,
    pub interface: Option<Vec<u8>>,
}

const DRIVES: usize = 4;

pub struct OricSystem {
    bus: OricBus,
}

impl OricSystem {
    pub fn new(config: OricConfig, roms: OricRoms) -> Result<Self, OricError> {
        Ok(Self {
            bus: OricBus::new(config, roms)?,
        })
    }

    pub fn bus(&self) -> &OricBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut OricBus {
        &mut self.bus
    }

    /// Press or release the key at `row`, `column` of the matrix.
    pub fn set_key(&mut self, row: usize, column: usize, pressed: bool) {
        self.bus.keyboard_mut().set_key(row, column, pressed);
    }

    fn drive_index(&self, mount_point_id: &str) -> Result<usize, OricError> {
        if !self.bus.has_disk_controller() {
            return Err(OricError::InvalidMountPoint);
        }
        mount_point_id
            .strip_prefix("Floppy")
            .and_then(|n| n.parse::<usize>().ok())
            .filter(|&n| n < DRIVES)
            .ok_or(OricError::InvalidMountPoint)
    }
}

impl Bus for OricSystem {
    fn read8(&mut self, addr: u32) -> u8 {
        self.bus.read8(addr)
    }

    fn write8(&mut self, addr: u32, value: u8) {
        self.bus.write8(addr, value);
    }
}

fn field<T: serde::de::DeserializeOwned>(v: &Value, name: &str) -> Result<T, serde_json::Error> {
    let value = v
        .get(name)
        .ok_or_else(|| serde_json::Error::custom(format!("missing field '{}'", name)))?;
    serde_json::from_value(value.clone())
}

impl Machine for OricSystem {
    type Error = OricError;

    fn reset(&mut self) {
        self.bus.reset();
    }

    fn memory_map(&self) -> Vec<MapEntry> {
        self.bus.memory_map()
    }

    fn save_state(&self) -> Value {
        let bus = &self.bus;
        serde_json::json!({
            "system": "oric",
            "version": 1,
            "config": bus.config,
            "ram": bus.space.buffer(bus.ram),
            "overlay": bus.overlay.map(|id| bus.space.buffer(id).to_vec()),
            "selections": bus.space.selections(),
            "via1": bus.via1,
            "via2": bus.via2,
            "psg": bus.psg,
            "psg_link": bus.psg_link,
            "keyboard": bus.keyboard,
            "fdc": bus.fdc,
            "interface": bus.interface,
            "telestrat": bus.telestrat_ports,
            "irqs": bus.irqs,
            "vsync": bus.vsync,
        })
    }

    fn load_state(&mut self, v: &Value) -> Result<(), serde_json::Error> {
        if v.get("system").and_then(Value::as_str) != Some("oric") {
            return Err(serde_json::Error::custom("not an Oric save state"));
        }
        let config: OricConfig = field(v, "config")?;
        if config != self.bus.config {
            return Err(serde_json::Error::custom(format!(
                "save state is for {:?}, machine is {:?}",
                config, self.bus.config
            )));
        }

        // Parse everything before touching the machine
        let ram: Vec<u8> = field(v, "ram")?;
        let overlay: Option<Vec<u8>> = field(v, "overlay")?;
        let selections: Vec<Option<usize>> = field(v, "selections")?;
        let via1: Via6522 = field(v, "via1")?;
        let via2: Via6522 = field(v, "via2")?;
        let psg: Ay8910 = field(v, "psg")?;
        let psg_link: PsgLink = field(v, "psg_link")?;
        let keyboard: Keyboard = field(v, "keyboard")?;
        let mut fdc: Wd17xx = field(v, "fdc")?;
        let interface: Interface = field(v, "interface")?;
        let telestrat: TelestratPorts = field(v, "telestrat")?;
        let irqs: InterruptAggregator = field(v, "irqs")?;
        let vsync: bool = field(v, "vsync")?;

        let bus = &mut self.bus;
        if ram.len() != bus.space.buffer(bus.ram).len() {
            return Err(serde_json::Error::custom("RAM size mismatch"));
        }
        match (bus.overlay, &overlay) {
            (Some(id), Some(data)) if data.len() == bus.space.buffer(id).len() => {}
            (None, None) => {}
            _ => return Err(serde_json::Error::custom("overlay RAM mismatch")),
        }
        if interface.kind() != config.effective_interface() {
            return Err(serde_json::Error::custom("interface mismatch"));
        }

        bus.space.buffer_mut(bus.ram).copy_from_slice(&ram);
        if let (Some(id), Some(data)) = (bus.overlay, overlay) {
            bus.space.buffer_mut(id).copy_from_slice(&data);
        }

        // Disk images are not part of the state
        for drive in 0..DRIVES {
            if let Some(image) = bus.fdc.eject(drive) {
                fdc.insert(drive, image);
            }
        }

        bus.via1 = via1;
        bus.via2 = via2;
        bus.psg = psg;
        bus.psg_link = psg_link;
        bus.keyboard = keyboard;
        bus.fdc = fdc;
        bus.interface = interface;
        bus.telestrat_ports = telestrat;
        bus.vsync = vsync;

        bus.map();
        bus.space
            .restore_selections(&selections)
            .map_err(serde_json::Error::custom)?;
        bus.irqs.restore(&irqs);
        Ok(())
    }

    fn supports_save_states(&self) -> bool {
        true
    }

    fn mount_points(&self) -> Vec<MountPointInfo> {
        if !self.bus.has_disk_controller() {
            return Vec::new();
        }
        (0..DRIVES)
            .map(|drive| MountPointInfo {
                id: format!("Floppy{}", drive),
                name: format!("Floppy drive {}", drive),
                extensions: vec!["dsk".to_string()],
                required: false,
            })
            .collect()
    }

    fn mount(&mut self, mount_point_id: &str, data: &[u8]) -> Result<(), Self::Error> {
        let drive = self.drive_index(mount_point_id)?;
        let image = FloppyImage::from_bytes(data)?;
        self.bus.insert_disk(drive, image);
        Ok(())
    }

    fn unmount(&mut self, mount_point_id: &str) -> Result<(), Self::Error> {
        let drive = self.drive_index(mount_point_id)?;
        self.bus.eject_disk(drive);
        Ok(())
    }

    fn is_mounted(&self, mount_point_id: &str) -> bool {
        self.drive_index(mount_point_id)
            .map(|drive| self.bus.disk(drive).is_some())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn microdisc() -> OricSystem {
        let config = OricConfig {
            interface: DiskInterface::Microdisc,
            ..OricConfig::default()
        };
        let roms = OricRoms {
            os: vec![0x4C; 0x4000],
            interface: Some(vec![0xD5; 0x2000]),
        };
        OricSystem::new(config, roms).unwrap()
    }

    #[test]
    fn test_mount_points_follow_interface() {
        let sys = OricSystem::new(
            OricConfig::default(),
            OricRoms {
                os: vec![0; 0x4000],
                interface: None,
            },
        )
        .unwrap();
        assert!(sys.mount_points().is_empty());

        let sys = microdisc();
        let points = sys.mount_points();
        assert_eq!(points.len(), 4);
        assert_eq!(points[0].id, "Floppy0");
        assert!(!sys.is_mounted("Floppy0"));
    }

    #[test]
    fn test_mount_and_unmount() {
        let mut sys = microdisc();
        let image = vec![0u8; 80 * 2 * 9 * 512];
        sys.mount("Floppy1", &image).unwrap();
        assert!(sys.is_mounted("Floppy1"));
        assert!(matches!(
            sys.mount("Floppy7", &image),
            Err(OricError::InvalidMountPoint)
        ));
        assert!(matches!(sys.mount("Floppy0", &[0; 100]), Err(OricError::Floppy(_))));

        sys.unmount("Floppy1").unwrap();
        assert!(!sys.is_mounted("Floppy1"));
    }

    #[test]
    fn test_load_rejects_other_systems() {
        let mut sys = microdisc();
        assert!(sys.load_state(&serde_json::json!({"system": "e01"})).is_err());

        let mut other = OricSystem::new(
            OricConfig::default(),
            OricRoms {
                os: vec![0; 0x4000],
                interface: None,
            },
        )
        .unwrap();
        assert!(other.load_state(&sys.save_state()).is_err());
    }
}
