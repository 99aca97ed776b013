//! Acorn FileStore E01 board
//!
//! An Econet file server built around a 65C02: 64K of RAM shadowed by a 64K
//! ROM at reset, an MC146818 RTC, a WD2793 for two floppy drives, a VIA for
//! the printer, a socket for the ADLC and a CPU-driven SCSI port.

mod bus;
mod config;
pub mod econet;
pub mod scsi;

pub use bus::{E01Bus, E01Device, E01Space, ROM_SIZE};
pub use config::E01Config;

use emu_core::chips::{Mc146818, Via6522, Wd17xx};
use emu_core::floppy::{FloppyError, FloppyImage};
use emu_core::irq::InterruptAggregator;
use emu_core::memory::MapEntry;
use emu_core::{Bus, Machine, MountPointInfo};
use serde::de::Error as _;
use serde_json::Value;

use crate::scsi::ScsiLines;

#[derive(thiserror::Error, Debug)]
pub enum E01Error {
    #[error("ROM must be {expected:#x} bytes, got {actual:#x}")]
    RomSize { expected: usize, actual: usize },
    #[error("Invalid mount point")]
    InvalidMountPoint,
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
    #[error("Invalid disk image: {0}")]
    Floppy(#[from] FloppyError),
}

const DRIVES: usize = 2;

pub struct E01System {
    bus: E01Bus,
}

impl E01System {
    pub fn new(config: E01Config, rom: Vec<u8>) -> Result<Self, E01Error> {
        Ok(Self {
            bus: E01Bus::new(config, rom)?,
        })
    }

    pub fn bus(&self) -> &E01Bus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut E01Bus {
        &mut self.bus
    }

    fn drive_index(mount_point_id: &str) -> Result<usize, E01Error> {
        mount_point_id
            .strip_prefix("Floppy")
            .and_then(|n| n.parse::<usize>().ok())
            .filter(|&n| n < DRIVES)
            .ok_or(E01Error::InvalidMountPoint)
    }
}

impl Bus for E01System {
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

impl Machine for E01System {
    type Error = E01Error;

    fn reset(&mut self) {
        self.bus.reset();
    }

    fn memory_map(&self) -> Vec<MapEntry> {
        self.bus.memory_map()
    }

    fn save_state(&self) -> Value {
        let bus = &self.bus;
        serde_json::json!({
            "system": "e01",
            "version": 1,
            "config": bus.config,
            "ram": bus.space.buffer(bus.ram),
            "selections": bus.space.selections(),
            "via": bus.via,
            "rtc": bus.rtc,
            "fdc": bus.fdc,
            "irqs": bus.irqs,
            "scsi": bus.scsi_lines,
            "mode_led": bus.mode_led,
            "front_flap_open": bus.front_flap_open,
        })
    }

    fn load_state(&mut self, v: &Value) -> Result<(), serde_json::Error> {
        if v.get("system").and_then(Value::as_str) != Some("e01") {
            return Err(serde_json::Error::custom("not an E01 save state"));
        }
        let config: E01Config = field(v, "config")?;
        let ram: Vec<u8> = field(v, "ram")?;
        let selections: Vec<Option<usize>> = field(v, "selections")?;
        let via: Via6522 = field(v, "via")?;
        let rtc: Mc146818 = field(v, "rtc")?;
        let mut fdc: Wd17xx = field(v, "fdc")?;
        let irqs: InterruptAggregator = field(v, "irqs")?;
        let scsi: ScsiLines = field(v, "scsi")?;
        let mode_led: bool = field(v, "mode_led")?;
        let front_flap_open: bool = field(v, "front_flap_open")?;

        let bus = &mut self.bus;
        if ram.len() != bus.space.buffer(bus.ram).len() {
            return Err(serde_json::Error::custom("RAM size mismatch"));
        }
        bus.space
            .restore_selections(&selections)
            .map_err(serde_json::Error::custom)?;
        bus.space.buffer_mut(bus.ram).copy_from_slice(&ram);

        for drive in 0..DRIVES {
            if let Some(image) = bus.fdc.eject(drive) {
                fdc.insert(drive, image);
            }
        }

        bus.config = config;
        bus.via = via;
        bus.rtc = rtc;
        bus.fdc = fdc;
        bus.scsi_lines = scsi;
        bus.mode_led = mode_led;
        bus.front_flap_open = front_flap_open;
        bus.irqs.restore(&irqs);
        Ok(())
    }

    fn supports_save_states(&self) -> bool {
        true
    }

    fn mount_points(&self) -> Vec<MountPointInfo> {
        (0..DRIVES)
            .map(|drive| MountPointInfo {
                id: format!("Floppy{}", drive),
                name: format!("Floppy drive {}", drive),
                extensions: vec!["img".to_string(), "dsk".to_string()],
                required: false,
            })
            .collect()
    }

    fn mount(&mut self, mount_point_id: &str, data: &[u8]) -> Result<(), Self::Error> {
        let drive = Self::drive_index(mount_point_id)?;
        let image = FloppyImage::from_bytes(data)?;
        self.bus.insert_disk(drive, image);
        Ok(())
    }

    fn unmount(&mut self, mount_point_id: &str) -> Result<(), Self::Error> {
        let drive = Self::drive_index(mount_point_id)?;
        self.bus.eject_disk(drive);
        Ok(())
    }

    fn is_mounted(&self, mount_point_id: &str) -> bool {
        Self::drive_index(mount_point_id)
            .map(|drive| self.bus.disk(drive).is_some())
            .unwrap_or(false)
    }
}
