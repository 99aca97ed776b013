//! General Instrument AY-3-8910 programmable sound generator.
//!
//! Only the bus side is modelled: the sixteen registers, the address latch
//! and the two I/O ports. Tone, noise and envelope generation are left to
//! whoever wants audio and can read the registers back.
//!
//! The chip has no chip-select in the usual sense. The BDIR and BC1 pins
//! decide what the data bus is doing, see [`BusControl`].

use serde::{Deserialize, Serialize};

use crate::logging::{log, LogCategory, LogLevel};

/// Implemented bits of each register.
const REGISTER_MASKS: [u8; 16] = [
    0xFF, 0x0F, 0xFF, 0x0F, 0xFF, 0x0F, // tone periods
    0x1F, // noise period
    0xFF, // mixer and port direction
    0x1F, 0x1F, 0x1F, // amplitudes
    0xFF, 0xFF, 0x0F, // envelope period, shape
    0xFF, 0xFF, // ports
];

pub const REG_ENABLE: usize = 7;
pub const REG_PORT_A: usize = 14;
pub const REG_PORT_B: usize = 15;

/// Bus operation selected by BDIR/BC1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BusControl {
    Inactive,
    ReadRegister,
    WriteRegister,
    LatchAddress,
}

impl BusControl {
    pub fn from_pins(bdir: bool, bc1: bool) -> Self {
        match (bdir, bc1) {
            (false, false) => BusControl::Inactive,
            (false, true) => BusControl::ReadRegister,
            (true, false) => BusControl::WriteRegister,
            (true, true) => BusControl::LatchAddress,
        }
    }
}

/// The two 8-bit I/O ports.
pub trait PsgPorts {
    fn read_a(&mut self) -> u8 {
        0xFF
    }

    fn read_b(&mut self) -> u8 {
        0xFF
    }

    fn write_a(&mut self, _data: u8) {}

    fn write_b(&mut self, _data: u8) {}
}

impl PsgPorts for () {}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ay8910 {
    registers: [u8; 16],
    address: u8,
}

impl Ay8910 {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn register(&self, index: usize) -> u8 {
        self.registers[index & 0x0F]
    }

    /// Port A is an output when bit 6 of the enable register is set.
    pub fn port_a_output(&self) -> bool {
        self.registers[REG_ENABLE] & 0x40 != 0
    }

    pub fn port_b_output(&self) -> bool {
        self.registers[REG_ENABLE] & 0x80 != 0
    }

    pub fn address_w(&mut self, data: u8) {
        if data & 0xF0 != 0 {
            log(LogCategory::Io, LogLevel::Trace, || {
                format!("AY8910: address {:#04x} outside chip", data)
            });
        }
        self.address = data & 0x0F;
    }

    pub fn data_w<P: PsgPorts + ?Sized>(&mut self, data: u8, ports: &mut P) {
        let index = usize::from(self.address);
        let old = self.registers[index];
        self.registers[index] = data & REGISTER_MASKS[index];

        match index {
            REG_PORT_A if self.port_a_output() => ports.write_a(data),
            REG_PORT_B if self.port_b_output() => ports.write_b(data),
            REG_ENABLE => {
                // A port turned into an output drives its latch immediately
                if (old ^ data) & data & 0x40 != 0 {
                    ports.write_a(self.registers[REG_PORT_A]);
                }
                if (old ^ data) & data & 0x80 != 0 {
                    ports.write_b(self.registers[REG_PORT_B]);
                }
            }
            _ => {}
        }
    }

    pub fn data_r<P: PsgPorts + ?Sized>(&mut self, ports: &mut P) -> u8 {
        let index = usize::from(self.address);
        match index {
            REG_PORT_A if !self.port_a_output() => ports.read_a(),
            REG_PORT_B if !self.port_b_output() => ports.read_b(),
            _ => self.registers[index],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Ports {
        a_in: u8,
        a_out: Vec<u8>,
    }

    impl PsgPorts for Ports {
        fn read_a(&mut self) -> u8 {
            self.a_in
        }
        fn write_a(&mut self, data: u8) {
            self.a_out.push(data);
        }
    }

    #[test]
    fn test_bus_control_from_pins() {
        assert_eq!(BusControl::from_pins(false, false), BusControl::Inactive);
        assert_eq!(BusControl::from_pins(false, true), BusControl::ReadRegister);
        assert_eq!(BusControl::from_pins(true, false), BusControl::WriteRegister);
        assert_eq!(BusControl::from_pins(true, true), BusControl::LatchAddress);
    }

    #[test]
    fn test_register_masks() {
        let mut psg = Ay8910::new();
        for (index, mask) in REGISTER_MASKS.iter().enumerate() {
            psg.address_w(index as u8);
            psg.data_w(0xFF, &mut ());
            assert_eq!(psg.register(index), *mask, "register {}", index);
        }
    }

    #[test]
    fn test_port_a_direction() {
        let mut psg = Ay8910::new();
        let mut ports = Ports {
            a_in: 0x3C,
            ..Default::default()
        };

        // Input: latch written but not driven, reads see the pins
        psg.address_w(14);
        psg.data_w(0x12, &mut ports);
        assert!(ports.a_out.is_empty());
        assert_eq!(psg.data_r(&mut ports), 0x3C);

        // Switching to output drives the latched value
        psg.address_w(7);
        psg.data_w(0x40, &mut ports);
        assert_eq!(ports.a_out, vec![0x12]);

        psg.address_w(14);
        psg.data_w(0xFE, &mut ports);
        assert_eq!(ports.a_out, vec![0x12, 0xFE]);
        assert_eq!(psg.data_r(&mut ports), 0xFE);
    }

    #[test]
    fn test_address_latch_keeps_low_nibble() {
        let mut psg = Ay8910::new();
        psg.address_w(0x1E);
        assert_eq!(psg.address(), 0x0E);
    }
}
