//! Peripheral chips shared by the machines.
//!
//! Each chip owns its register file and reaches the rest of the board only
//! through a port trait passed in on every call.

pub mod ay8910;
pub mod mc146818;
pub mod via6522;
pub mod wd17xx;

pub use ay8910::{Ay8910, BusControl, PsgPorts};
pub use mc146818::{Mc146818, RtcLines, RtcTime};
pub use via6522::{Via6522, ViaPorts};
pub use wd17xx::{FdcLines, Phase, Wd17xx};
