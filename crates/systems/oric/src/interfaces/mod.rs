//! Disk interfaces for the expansion port.
//!
//! Exactly one interface is present, chosen by configuration at reset. Each
//! one decides what the high 16K shows and what answers in the 0x300 page.

mod apple2;
mod jasmin;
mod microdisc;

pub use apple2::{page_offsets, Apple2, AppleFdc};
pub use jasmin::Jasmin;
pub use microdisc::Microdisc;

use serde::{Deserialize, Serialize};

use crate::banking::HighMemoryPlan;
use crate::config::DiskInterface;

/// Register state of the fitted interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interface {
    None,
    Microdisc(Microdisc),
    Jasmin(Jasmin),
    Apple2(Apple2),
}

impl Interface {
    /// Power-on state of `kind`.
    pub fn new(kind: DiskInterface) -> Self {
        match kind {
            DiskInterface::None => Interface::None,
            DiskInterface::Microdisc => Interface::Microdisc(Microdisc::new()),
            DiskInterface::Jasmin => Interface::Jasmin(Jasmin::new()),
            DiskInterface::Apple2 => Interface::Apple2(Apple2::v1()),
            DiskInterface::Apple2V2 => Interface::Apple2(Apple2::v2()),
        }
    }

    pub fn kind(&self) -> DiskInterface {
        match self {
            Interface::None => DiskInterface::None,
            Interface::Microdisc(_) => DiskInterface::Microdisc,
            Interface::Jasmin(_) => DiskInterface::Jasmin,
            Interface::Apple2(card) if card.is_v2() => DiskInterface::Apple2V2,
            Interface::Apple2(_) => DiskInterface::Apple2,
        }
    }

    /// What the high 16K should show in the current register state.
    pub fn plan(&self) -> HighMemoryPlan {
        match self {
            Interface::None => HighMemoryPlan::OS_ROM,
            Interface::Microdisc(microdisc) => microdisc.plan(),
            Interface::Jasmin(jasmin) => jasmin.plan(),
            Interface::Apple2(card) => card.plan(),
        }
    }
}
