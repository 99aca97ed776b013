//! Machine configuration.

use serde::{Deserialize, Serialize};

use crate::OricError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Model {
    Oric1,
    #[default]
    Atmos,
    /// Built-in Microdisc controller, second VIA and eight 16K blocks at 0xC000.
    Telestrat,
}

/// Disk interface plugged into the expansion port of an Oric-1 or Atmos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiskInterface {
    #[default]
    None,
    Microdisc,
    Jasmin,
    Apple2,
    #[serde(rename = "apple2_v2")]
    Apple2V2,
}

impl DiskInterface {
    /// Size the interface ROM must have, or at least have for the Apple II
    /// cards whose pages are addressed at fixed offsets.
    pub fn rom_size(self) -> Option<usize> {
        match self {
            DiskInterface::None => None,
            DiskInterface::Microdisc => Some(0x2000),
            DiskInterface::Jasmin => Some(0x800),
            DiskInterface::Apple2 => Some(0x100),
            DiskInterface::Apple2V2 => Some(0x300),
        }
    }

    pub fn has_wd17xx(self) -> bool {
        matches!(self, DiskInterface::Microdisc | DiskInterface::Jasmin)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OricConfig {
    pub model: Model,
    /// Ignored on the Telestrat, which always has a Microdisc.
    pub interface: DiskInterface,
    /// Vertical sync wired to VIA CB1 in place of the tape input.
    pub vsync_cable: bool,
}

impl OricConfig {
    pub fn from_json(text: &str) -> Result<Self, OricError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Interface that is actually present on the board.
    pub fn effective_interface(&self) -> DiskInterface {
        match self.model {
            Model::Telestrat => DiskInterface::Microdisc,
            _ => self.interface,
        }
    }

    /// Size of the OS image: 16K, or four 16K cartridge blocks on the Telestrat.
    pub fn os_rom_size(&self) -> usize {
        match self.model {
            Model::Telestrat => 0x10000,
            _ => 0x4000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OricConfig::from_json("{}").unwrap();
        assert_eq!(config.model, Model::Atmos);
        assert_eq!(config.interface, DiskInterface::None);
        assert!(!config.vsync_cable);
    }

    #[test]
    fn test_parse_names() {
        let config =
            OricConfig::from_json(r#"{"model": "oric1", "interface": "apple2_v2", "vsync_cable": true}"#)
                .unwrap();
        assert_eq!(config.model, Model::Oric1);
        assert_eq!(config.interface, DiskInterface::Apple2V2);
        assert!(config.vsync_cable);

        assert!(OricConfig::from_json(r#"{"interface": "floppy"}"#).is_err());
    }

    #[test]
    fn test_telestrat_always_has_microdisc() {
        let config = OricConfig {
            model: Model::Telestrat,
            interface: DiskInterface::Jasmin,
            vsync_cable: false,
        };
        assert_eq!(config.effective_interface(), DiskInterface::Microdisc);
        assert_eq!(config.os_rom_size(), 0x10000);
    }
}
