//! External peripherals attached to chip pins.
//!
//! These are the devices a machine talks to but does not emulate: printers,
//! tape decks and the like. Each trait has a do-nothing implementation in
//! [`Disconnected`] so a machine can be built without any of them.

/// Centronics parallel printer port.
pub trait Centronics {
    /// Data lines, latched by the printer on strobe.
    fn write_data(&mut self, data: u8);

    /// Strobe line level.
    fn write_strobe(&mut self, state: bool);

    /// BUSY line, `false` when nothing is connected.
    fn busy(&self) -> bool {
        false
    }
}

/// Cassette recorder.
pub trait Cassette {
    fn set_motor(&mut self, on: bool);

    /// Output level in the range -1.0..=1.0.
    fn output(&mut self, level: f64);

    /// Current input level, sampled by the machine's tape timer.
    fn input(&mut self) -> f64 {
        0.0
    }
}

/// Nothing plugged in.
#[derive(Debug, Default, Clone, Copy)]
pub struct Disconnected;

impl Centronics for Disconnected {
    fn write_data(&mut self, _data: u8) {}
    fn write_strobe(&mut self, _state: bool) {}
}

impl Cassette for Disconnected {
    fn set_motor(&mut self, _on: bool) {}
    fn output(&mut self, _level: f64) {}
}
