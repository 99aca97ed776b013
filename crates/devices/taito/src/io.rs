//! TC0220IOC, TC0510NIO and TC0640FIO input/output chips.
//!
//! All three share an eight byte register file:
//!
//! | Reg | Read              | Write                             |
//! |-----|-------------------|-----------------------------------|
//! | 0-3 | input ports 0-3   | 0: watchdog reset                 |
//! | 4   | last value written| coin lockout (bits 0-1, active low) and counters (bits 2-3) |
//! | 7   | input port 7      |                                   |
//!
//! The chips differ only in how a 16-bit CPU reaches the byte registers.

use emu_core::logging::{log, LogCategory, LogLevel};
use serde::{Deserialize, Serialize};

const REG_WATCHDOG: usize = 0;
const REG_COIN: usize = 4;

/// Board wiring behind the I/O chip.
pub trait InputPorts {
    /// Inputs on port 0-3 or 7. Unconnected ports read high.
    fn read_port(&mut self, _port: usize) -> u8 {
        0xFF
    }

    fn watchdog_reset(&mut self) {}

    fn coin_lockout(&mut self, _coin: usize, _locked: bool) {}

    fn coin_counter(&mut self, _coin: usize, _active: bool) {}
}

impl InputPorts for () {}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct IoRegisters {
    regs: [u8; 8],
    port: u8,
}

impl IoRegisters {
    fn read<P: InputPorts + ?Sized>(&self, chip: &str, offset: u32, ports: &mut P) -> u8 {
        let offset = offset as usize & 7;
        match offset {
            0..=3 | 7 => ports.read_port(offset),
            REG_COIN => self.regs[REG_COIN],
            _ => {
                log(LogCategory::Io, LogLevel::Warn, || {
                    format!("{chip}: read from unmapped register {offset}")
                });
                0xFF
            }
        }
    }

    fn write<P: InputPorts + ?Sized>(&mut self, chip: &str, offset: u32, data: u8, ports: &mut P) {
        let offset = offset as usize & 7;
        self.regs[offset] = data;
        match offset {
            REG_WATCHDOG => ports.watchdog_reset(),
            REG_COIN => {
                ports.coin_lockout(0, data & 0x01 == 0);
                ports.coin_lockout(1, data & 0x02 == 0);
                ports.coin_counter(0, data & 0x04 != 0);
                ports.coin_counter(1, data & 0x08 != 0);
            }
            _ => log(LogCategory::Io, LogLevel::Warn, || {
                format!("{chip}: write {data:#04x} to unmapped register {offset}")
            }),
        }
    }
}

/// Byte-wide chip, also reachable through a port select/data pair.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tc0220ioc {
    io: IoRegisters,
}

impl Tc0220ioc {
    const NAME: &'static str = "TC0220IOC";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn read<P: InputPorts + ?Sized>(&self, offset: u32, ports: &mut P) -> u8 {
        self.io.read(Self::NAME, offset, ports)
    }

    pub fn write<P: InputPorts + ?Sized>(&mut self, offset: u32, data: u8, ports: &mut P) {
        self.io.write(Self::NAME, offset, data, ports);
    }

    pub fn port_r(&self) -> u8 {
        self.io.port
    }

    pub fn port_w(&mut self, data: u8) {
        self.io.port = data;
    }

    pub fn portreg_r<P: InputPorts + ?Sized>(&self, ports: &mut P) -> u8 {
        self.read(u32::from(self.io.port), ports)
    }

    pub fn portreg_w<P: InputPorts + ?Sized>(&mut self, data: u8, ports: &mut P) {
        self.write(u32::from(self.io.port), data, ports);
    }
}

/// Registers on the low byte of each word. Some boards write the high byte
/// only; that lane is taken when the low one is not accessed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tc0510nio {
    io: IoRegisters,
}

impl Tc0510nio {
    const NAME: &'static str = "TC0510NIO";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn read<P: InputPorts + ?Sized>(&self, offset: u32, ports: &mut P) -> u8 {
        self.io.read(Self::NAME, offset, ports)
    }

    pub fn write<P: InputPorts + ?Sized>(&mut self, offset: u32, data: u8, ports: &mut P) {
        self.io.write(Self::NAME, offset, data, ports);
    }

    pub fn halfword_r<P: InputPorts + ?Sized>(&self, offset: u32, ports: &mut P) -> u16 {
        u16::from(self.read(offset, ports))
    }

    pub fn halfword_w<P: InputPorts + ?Sized>(&mut self, offset: u32, data: u16, mem_mask: u16, ports: &mut P) {
        if mem_mask & 0x00FF != 0 {
            self.write(offset, data as u8, ports);
        } else {
            self.write(offset, (data >> 8) as u8, ports);
        }
    }

    pub fn halfword_wordswap_r<P: InputPorts + ?Sized>(&self, offset: u32, ports: &mut P) -> u16 {
        self.halfword_r(offset ^ 1, ports)
    }

    pub fn halfword_wordswap_w<P: InputPorts + ?Sized>(
        &mut self,
        offset: u32,
        data: u16,
        mem_mask: u16,
        ports: &mut P,
    ) {
        self.halfword_w(offset ^ 1, data, mem_mask, ports);
    }
}

/// Like the TC0510NIO, with a byte-swapped variant for boards that put the
/// chip on the high lane.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tc0640fio {
    io: IoRegisters,
}

impl Tc0640fio {
    const NAME: &'static str = "TC0640FIO";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn read<P: InputPorts + ?Sized>(&self, offset: u32, ports: &mut P) -> u8 {
        self.io.read(Self::NAME, offset, ports)
    }

    pub fn write<P: InputPorts + ?Sized>(&mut self, offset: u32, data: u8, ports: &mut P) {
        self.io.write(Self::NAME, offset, data, ports);
    }

    pub fn halfword_r<P: InputPorts + ?Sized>(&self, offset: u32, ports: &mut P) -> u16 {
        u16::from(self.read(offset, ports))
    }

    pub fn halfword_w<P: InputPorts + ?Sized>(&mut self, offset: u32, data: u16, mem_mask: u16, ports: &mut P) {
        if mem_mask & 0x00FF != 0 {
            self.write(offset, data as u8, ports);
        } else {
            self.write(offset, (data >> 8) as u8, ports);
        }
    }

    pub fn halfword_byteswap_r<P: InputPorts + ?Sized>(&self, offset: u32, ports: &mut P) -> u16 {
        self.halfword_r(offset, ports) << 8
    }

    pub fn halfword_byteswap_w<P: InputPorts + ?Sized>(
        &mut self,
        offset: u32,
        data: u16,
        mem_mask: u16,
        ports: &mut P,
    ) {
        if mem_mask & 0xFF00 != 0 {
            self.write(offset, (data >> 8) as u8, ports);
        } else {
            self.write(offset, data as u8, ports);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Panel {
        inputs: [u8; 8],
        watchdog: usize,
        lockout: [bool; 2],
        counter: [bool; 2],
    }

    impl InputPorts for Panel {
        fn read_port(&mut self, port: usize) -> u8 {
            self.inputs[port]
        }

        fn watchdog_reset(&mut self) {
            self.watchdog += 1;
        }

        fn coin_lockout(&mut self, coin: usize, locked: bool) {
            self.lockout[coin] = locked;
        }

        fn coin_counter(&mut self, coin: usize, active: bool) {
            self.counter[coin] = active;
        }
    }

    fn panel() -> Panel {
        Panel {
            inputs: [0x10, 0x11, 0x12, 0x13, 0, 0, 0, 0x17],
            ..Default::default()
        }
    }

    #[test]
    fn test_input_ports() {
        let chip = Tc0220ioc::new();
        let mut panel = panel();
        for port in [0, 1, 2, 3, 7] {
            assert_eq!(chip.read(port, &mut panel), 0x10 + port as u8);
        }
        assert_eq!(chip.read(5, &mut panel), 0xFF);
        assert_eq!(chip.read(6, &mut ()), 0xFF);
        assert_eq!(chip.read(0, &mut ()), 0xFF);
    }

    #[test]
    fn test_watchdog_and_coin_register() {
        let mut chip = Tc0220ioc::new();
        let mut panel = panel();
        chip.write(0, 0, &mut panel);
        assert_eq!(panel.watchdog, 1);

        chip.write(4, 0x06, &mut panel);
        assert_eq!(panel.lockout, [true, false]);
        assert_eq!(panel.counter, [true, false]);
        assert_eq!(chip.read(4, &mut panel), 0x06);
    }

    #[test]
    fn test_port_select_pair() {
        let mut chip = Tc0220ioc::new();
        let mut panel = panel();
        chip.port_w(2);
        assert_eq!(chip.port_r(), 2);
        assert_eq!(chip.portreg_r(&mut panel), 0x12);
        chip.port_w(4);
        chip.portreg_w(0x0B, &mut panel);
        assert_eq!(panel.lockout, [false, true]);
        assert_eq!(panel.counter, [false, true]);
    }

    #[test]
    fn test_nio_lanes_and_wordswap() {
        let mut chip = Tc0510nio::new();
        let mut panel = panel();
        assert_eq!(chip.halfword_r(1, &mut panel), 0x0011);
        assert_eq!(chip.halfword_wordswap_r(1, &mut panel), 0x0010);

        chip.halfword_w(4, 0x0C00, 0xFF00, &mut panel);
        assert_eq!(panel.counter, [false, true]);
        chip.halfword_wordswap_w(5, 0x0004, 0x00FF, &mut panel);
        assert_eq!(chip.read(4, &mut panel), 0x04);
        assert_eq!(panel.counter, [true, false]);
    }

    #[test]
    fn test_fio_byteswap() {
        let mut chip = Tc0640fio::new();
        let mut panel = panel();
        assert_eq!(chip.halfword_byteswap_r(3, &mut panel), 0x1300);
        chip.halfword_byteswap_w(4, 0x0300, 0xFF00, &mut panel);
        assert_eq!(chip.halfword_r(4, &mut panel), 0x0003);
        assert_eq!(panel.lockout, [false, false]);
    }
}
