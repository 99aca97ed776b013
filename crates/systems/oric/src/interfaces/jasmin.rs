//! Jasmin controller at 0x3F0-0x3FF.
//!
//! `0x3F4-0x3F7` are the WD1773, `0x3F8` bit 0 the side, a write to `0x3F9`
//! resets the controller, `0x3FA` bit 0 enables the overlay RAM, `0x3FB`
//! bit 0 disables the OS ROM and `0x3FC-0x3FF` select the drive from the
//! address.
//!
//! With the OS ROM disabled the Jasmin boot ROM always sits at 0xF800, taking
//! priority over the overlay RAM there.

use serde::{Deserialize, Serialize};

use crate::banking::{HighMemoryPlan, ReadPlan, Source, WindowPlan, WritePlan};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jasmin {
    overlay: u8,
    romdis: u8,
}

impl Default for Jasmin {
    fn default() -> Self {
        Self::new()
    }
}

impl Jasmin {
    /// Boots with the OS ROM disabled.
    pub fn new() -> Self {
        Self {
            overlay: 0,
            romdis: 1,
        }
    }

    pub fn set_overlay(&mut self, data: u8) {
        self.overlay = data;
    }

    pub fn set_romdis(&mut self, data: u8) {
        self.romdis = data;
    }

    pub fn overlay_enabled(&self) -> bool {
        self.overlay & 1 != 0
    }

    pub fn os_rom_disabled(&self) -> bool {
        self.romdis & 1 != 0
    }

    pub fn plan(&self) -> HighMemoryPlan {
        if !self.os_rom_disabled() {
            return if self.overlay_enabled() {
                HighMemoryPlan::RAM
            } else {
                let os = WindowPlan::new(ReadPlan::From(Source::Os), WritePlan::Unmapped);
                HighMemoryPlan {
                    low: os,
                    mid: os,
                    top: WindowPlan::new(ReadPlan::From(Source::Os), WritePlan::Keep),
                }
            };
        }

        let lower = if self.overlay_enabled() {
            WindowPlan::both(Source::Ram)
        } else {
            WindowPlan::new(ReadPlan::Nothing, WritePlan::Unmapped)
        };
        HighMemoryPlan {
            low: lower,
            mid: lower,
            top: WindowPlan::both(Source::JasminRom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boot_plan() {
        let jasmin = Jasmin::new();
        let plan = jasmin.plan();
        assert_eq!(plan.low.read, ReadPlan::Nothing);
        assert_eq!(plan.mid.write, WritePlan::Unmapped);
        assert_eq!(plan.top, WindowPlan::both(Source::JasminRom));
    }

    #[test]
    fn test_boot_rom_wins_over_overlay() {
        let mut jasmin = Jasmin::new();
        jasmin.set_overlay(1);
        let plan = jasmin.plan();
        assert_eq!(plan.low, WindowPlan::both(Source::Ram));
        assert_eq!(plan.top, WindowPlan::both(Source::JasminRom));
    }

    #[test]
    fn test_os_rom_enabled() {
        let mut jasmin = Jasmin::new();
        jasmin.set_romdis(0);
        assert_eq!(jasmin.plan().top.read, ReadPlan::From(Source::Os));
        assert_eq!(jasmin.plan().top.write, WritePlan::Keep);

        jasmin.set_overlay(0xFF);
        assert_eq!(jasmin.plan(), HighMemoryPlan::RAM);
    }
}
