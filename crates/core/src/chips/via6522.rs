//! MOS 6522 Versatile Interface Adapter.
//!
//! Two 8-bit ports with data direction registers, two control lines per
//! port, two 16-bit timers and an interrupt controller. Everything the VIA
//! drives or samples outside the chip goes through a [`ViaPorts`]
//! implementation supplied by the machine on each call, so the same chip
//! serves the Oric keyboard/PSG wiring and the FileStore printer port.
//!
//! # Registers ($0-$F)
//!
//! | Reg | Name | Description                               |
//! |-----|------|-------------------------------------------|
//! | $0  | ORB  | Port B data, CB handshake                 |
//! | $1  | ORA  | Port A data, CA handshake                 |
//! | $2  | DDRB | Port B direction (1 = output)             |
//! | $3  | DDRA | Port A direction (1 = output)             |
//! | $4  | T1CL | Timer 1 counter low (read clears T1 flag) |
//! | $5  | T1CH | Timer 1 counter high (write starts T1)    |
//! | $6  | T1LL | Timer 1 latch low                         |
//! | $7  | T1LH | Timer 1 latch high                        |
//! | $8  | T2CL | Timer 2 counter low (read clears T2 flag) |
//! | $9  | T2CH | Timer 2 counter high (write starts T2)    |
//! | $A  | SR   | Shift register                            |
//! | $B  | ACR  | Auxiliary control                         |
//! | $C  | PCR  | Peripheral control                        |
//! | $D  | IFR  | Interrupt flags                           |
//! | $E  | IER  | Interrupt enable                          |
//! | $F  | ORA  | Port A data, no handshake                 |
//!
//! The shift register holds its value but does not shift.

use serde::{Deserialize, Serialize};

use crate::logging::{log, LogCategory, LogLevel};

const IFR_CA2: u8 = 0x01;
const IFR_CA1: u8 = 0x02;
const IFR_SR: u8 = 0x04;
const IFR_CB2: u8 = 0x08;
const IFR_CB1: u8 = 0x10;
const IFR_T2: u8 = 0x20;
const IFR_T1: u8 = 0x40;

/// Board wiring seen by a VIA.
///
/// Inputs default to pulled-up pins, outputs to nothing connected.
pub trait ViaPorts {
    fn read_a(&mut self) -> u8 {
        0xFF
    }

    fn read_b(&mut self) -> u8 {
        0xFF
    }

    /// Port A pins after a change of ORA or DDRA. Inputs read as 1.
    fn write_a(&mut self, _data: u8) {}

    /// Port B pins after a change of ORB or DDRB. Inputs read as 1.
    fn write_b(&mut self, _data: u8) {}

    fn write_ca2(&mut self, _state: bool) {}

    fn write_cb2(&mut self, _state: bool) {}

    /// IRQ output (active high here; the pin itself is open-drain, active low).
    fn irq(&mut self, _state: bool) {}
}

/// A VIA with nothing attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unconnected;

impl ViaPorts for Unconnected {}

/// Control line output modes, from the 3-bit PCR fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ControlMode {
    Input,
    Handshake,
    Pulse,
    Manual(bool),
}

impl ControlMode {
    fn from_bits(bits: u8) -> Self {
        match bits & 0x07 {
            0b100 => ControlMode::Handshake,
            0b101 => ControlMode::Pulse,
            0b110 => ControlMode::Manual(false),
            0b111 => ControlMode::Manual(true),
            _ => ControlMode::Input,
        }
    }

    /// Input modes 001 and 011 leave the flag alone on port accesses.
    fn independent(bits: u8) -> bool {
        bits & 0x05 == 0x01
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Via6522 {
    out_a: u8,
    out_b: u8,
    ddr_a: u8,
    ddr_b: u8,

    t1_counter: u16,
    t1_latch: u16,
    /// Armed until the next underflow in one-shot mode.
    t1_armed: bool,
    pb7: bool,

    t2_counter: u16,
    t2_latch_lo: u8,
    t2_armed: bool,

    shift: u8,
    acr: u8,
    pcr: u8,
    ifr: u8,
    ier: u8,

    ca1: bool,
    cb1: bool,
    ca2_out: bool,
    cb2_out: bool,
    irq_out: bool,
}

impl Via6522 {
    pub fn new() -> Self {
        Self {
            out_a: 0,
            out_b: 0,
            ddr_a: 0,
            ddr_b: 0,
            t1_counter: 0xFFFF,
            t1_latch: 0xFFFF,
            t1_armed: false,
            pb7: true,
            t2_counter: 0xFFFF,
            t2_latch_lo: 0xFF,
            t2_armed: false,
            shift: 0,
            acr: 0,
            pcr: 0,
            ifr: 0,
            ier: 0,
            ca1: false,
            cb1: false,
            ca2_out: true,
            cb2_out: true,
            irq_out: false,
        }
    }

    /// Power-on/reset state. Input line levels are kept; outputs are not
    /// reported since every pin becomes an input.
    pub fn reset(&mut self) {
        let (ca1, cb1) = (self.ca1, self.cb1);
        *self = Self {
            ca1,
            cb1,
            ..Self::new()
        };
    }

    /// Read register `offset & 0x0F`.
    pub fn read<P: ViaPorts + ?Sized>(&mut self, offset: u32, ports: &mut P) -> u8 {
        let value = match offset & 0x0F {
            0x0 => {
                self.clear_port_flags(IFR_CB1, IFR_CB2, self.pcr >> 5);
                self.input_b(ports)
            }
            0x1 => {
                self.clear_port_flags(IFR_CA1, IFR_CA2, self.pcr >> 1);
                self.ca2_handshake(ports);
                self.input_a(ports)
            }
            0x2 => self.ddr_b,
            0x3 => self.ddr_a,
            0x4 => {
                self.ifr &= !IFR_T1;
                self.t1_counter as u8
            }
            0x5 => (self.t1_counter >> 8) as u8,
            0x6 => self.t1_latch as u8,
            0x7 => (self.t1_latch >> 8) as u8,
            0x8 => {
                self.ifr &= !IFR_T2;
                self.t2_counter as u8
            }
            0x9 => (self.t2_counter >> 8) as u8,
            0xA => {
                self.ifr &= !IFR_SR;
                self.shift
            }
            0xB => self.acr,
            0xC => self.pcr,
            0xD => {
                let any = if self.irq_active() { 0x80 } else { 0 };
                (self.ifr & 0x7F) | any
            }
            0xE => self.ier | 0x80,
            _ => self.input_a(ports),
        };
        self.update_irq(ports);
        value
    }

    /// Write register `offset & 0x0F`.
    pub fn write<P: ViaPorts + ?Sized>(&mut self, offset: u32, data: u8, ports: &mut P) {
        match offset & 0x0F {
            0x0 => {
                self.out_b = data;
                self.clear_port_flags(IFR_CB1, IFR_CB2, self.pcr >> 5);
                ports.write_b(self.port_b_output());
                self.cb2_handshake(ports);
            }
            0x1 => {
                self.out_a = data;
                self.clear_port_flags(IFR_CA1, IFR_CA2, self.pcr >> 1);
                ports.write_a(self.port_a_output());
                self.ca2_handshake(ports);
            }
            0x2 => {
                self.ddr_b = data;
                ports.write_b(self.port_b_output());
            }
            0x3 => {
                self.ddr_a = data;
                ports.write_a(self.port_a_output());
            }
            0x4 | 0x6 => self.t1_latch = (self.t1_latch & 0xFF00) | u16::from(data),
            0x5 => {
                self.t1_latch = (self.t1_latch & 0x00FF) | (u16::from(data) << 8);
                self.t1_counter = self.t1_latch;
                self.t1_armed = true;
                self.ifr &= !IFR_T1;
                if self.acr & 0x80 != 0 {
                    self.pb7 = false;
                    ports.write_b(self.port_b_output());
                }
            }
            0x7 => {
                self.t1_latch = (self.t1_latch & 0x00FF) | (u16::from(data) << 8);
                self.ifr &= !IFR_T1;
            }
            0x8 => self.t2_latch_lo = data,
            0x9 => {
                self.t2_counter = u16::from(self.t2_latch_lo) | (u16::from(data) << 8);
                self.t2_armed = true;
                self.ifr &= !IFR_T2;
            }
            0xA => {
                self.shift = data;
                self.ifr &= !IFR_SR;
            }
            0xB => {
                self.acr = data;
                if data & 0x1C != 0 {
                    log(LogCategory::Stubs, LogLevel::Debug, || {
                        format!("VIA: shift register mode {:#x} not emulated", (data >> 2) & 7)
                    });
                }
                ports.write_b(self.port_b_output());
            }
            0xC => {
                self.pcr = data;
                self.apply_pcr(ports);
            }
            0xD => self.ifr &= !data,
            0xE => {
                if data & 0x80 != 0 {
                    self.ier |= data & 0x7F;
                } else {
                    self.ier &= !(data & 0x7F);
                }
            }
            _ => {
                self.out_a = data;
                ports.write_a(self.port_a_output());
            }
        }
        self.update_irq(ports);
    }

    /// Advance both timers by `cycles` clock cycles.
    pub fn clock<P: ViaPorts + ?Sized>(&mut self, cycles: u32, ports: &mut P) {
        self.clock_timer1(cycles, ports);
        if self.acr & 0x20 == 0 {
            self.clock_timer2(cycles);
        }
        self.update_irq(ports);
    }

    fn clock_timer1<P: ViaPorts + ?Sized>(&mut self, mut cycles: u32, ports: &mut P) {
        while cycles > 0 {
            let counter = u32::from(self.t1_counter);
            if cycles <= counter {
                self.t1_counter -= cycles as u16;
                return;
            }
            cycles -= counter + 1;

            let free_run = self.acr & 0x40 != 0;
            if self.t1_armed || free_run {
                self.ifr |= IFR_T1;
                if self.acr & 0x80 != 0 {
                    self.pb7 = !self.pb7;
                    ports.write_b(self.port_b_output());
                }
            }
            if free_run {
                self.t1_counter = self.t1_latch;
            } else {
                self.t1_armed = false;
                self.t1_counter = 0xFFFF;
            }
        }
    }

    fn clock_timer2(&mut self, cycles: u32) {
        let counter = u32::from(self.t2_counter);
        if cycles <= counter {
            self.t2_counter -= cycles as u16;
            return;
        }
        if self.t2_armed {
            self.ifr |= IFR_T2;
            self.t2_armed = false;
        }
        self.t2_counter = (counter + 0x10000 - (cycles % 0x10000)) as u16;
    }

    /// One falling edge on PB6 while timer 2 counts pulses.
    pub fn pulse_pb6<P: ViaPorts + ?Sized>(&mut self, ports: &mut P) {
        if self.acr & 0x20 == 0 {
            return;
        }
        self.t2_counter = self.t2_counter.wrapping_sub(1);
        if self.t2_counter == 0 && self.t2_armed {
            self.ifr |= IFR_T2;
            self.t2_armed = false;
        }
        self.update_irq(ports);
    }

    /// Drive the CA1 input.
    pub fn set_ca1<P: ViaPorts + ?Sized>(&mut self, state: bool, ports: &mut P) {
        if self.ca1 == state {
            return;
        }
        self.ca1 = state;
        let positive = self.pcr & 0x01 != 0;
        if state == positive {
            self.ifr |= IFR_CA1;
            if ControlMode::from_bits(self.pcr >> 1) == ControlMode::Handshake {
                self.set_ca2(true, ports);
            }
        }
        self.update_irq(ports);
    }

    /// Drive the CB1 input.
    pub fn set_cb1<P: ViaPorts + ?Sized>(&mut self, state: bool, ports: &mut P) {
        if self.cb1 == state {
            return;
        }
        self.cb1 = state;
        let positive = self.pcr & 0x10 != 0;
        if state == positive {
            self.ifr |= IFR_CB1;
            if ControlMode::from_bits(self.pcr >> 5) == ControlMode::Handshake {
                self.set_cb2(true, ports);
            }
        }
        self.update_irq(ports);
    }

    pub fn irq_active(&self) -> bool {
        self.ifr & self.ier & 0x7F != 0
    }

    /// Port A pins: output bits from ORA, input bits pulled high.
    pub fn port_a_output(&self) -> u8 {
        (self.out_a & self.ddr_a) | !self.ddr_a
    }

    /// Port B pins, with PB7 driven by timer 1 when ACR bit 7 is set.
    pub fn port_b_output(&self) -> u8 {
        let value = (self.out_b & self.ddr_b) | !self.ddr_b;
        self.with_pb7(value)
    }

    pub fn ca2_output(&self) -> bool {
        self.ca2_out
    }

    pub fn cb2_output(&self) -> bool {
        self.cb2_out
    }

    pub fn ifr(&self) -> u8 {
        self.ifr
    }

    pub fn ier(&self) -> u8 {
        self.ier
    }

    fn with_pb7(&self, value: u8) -> u8 {
        if self.acr & 0x80 != 0 {
            (value & 0x7F) | if self.pb7 { 0x80 } else { 0 }
        } else {
            value
        }
    }

    fn input_a<P: ViaPorts + ?Sized>(&mut self, ports: &mut P) -> u8 {
        (self.out_a & self.ddr_a) | (ports.read_a() & !self.ddr_a)
    }

    fn input_b<P: ViaPorts + ?Sized>(&mut self, ports: &mut P) -> u8 {
        let value = (self.out_b & self.ddr_b) | (ports.read_b() & !self.ddr_b);
        self.with_pb7(value)
    }

    fn clear_port_flags(&mut self, edge_flag: u8, control_flag: u8, control_bits: u8) {
        self.ifr &= !edge_flag;
        if !ControlMode::independent(control_bits) {
            self.ifr &= !control_flag;
        }
    }

    fn ca2_handshake<P: ViaPorts + ?Sized>(&mut self, ports: &mut P) {
        match ControlMode::from_bits(self.pcr >> 1) {
            ControlMode::Handshake => self.set_ca2(false, ports),
            ControlMode::Pulse => {
                self.set_ca2(false, ports);
                self.set_ca2(true, ports);
            }
            _ => {}
        }
    }

    fn cb2_handshake<P: ViaPorts + ?Sized>(&mut self, ports: &mut P) {
        match ControlMode::from_bits(self.pcr >> 5) {
            ControlMode::Handshake => self.set_cb2(false, ports),
            ControlMode::Pulse => {
                self.set_cb2(false, ports);
                self.set_cb2(true, ports);
            }
            _ => {}
        }
    }

    fn apply_pcr<P: ViaPorts + ?Sized>(&mut self, ports: &mut P) {
        match ControlMode::from_bits(self.pcr >> 1) {
            ControlMode::Manual(level) => self.set_ca2(level, ports),
            ControlMode::Handshake | ControlMode::Pulse => self.set_ca2(true, ports),
            ControlMode::Input => {}
        }
        match ControlMode::from_bits(self.pcr >> 5) {
            ControlMode::Manual(level) => self.set_cb2(level, ports),
            ControlMode::Handshake | ControlMode::Pulse => self.set_cb2(true, ports),
            ControlMode::Input => {}
        }
    }

    fn set_ca2<P: ViaPorts + ?Sized>(&mut self, state: bool, ports: &mut P) {
        if self.ca2_out != state {
            self.ca2_out = state;
            ports.write_ca2(state);
        }
    }

    fn set_cb2<P: ViaPorts + ?Sized>(&mut self, state: bool, ports: &mut P) {
        if self.cb2_out != state {
            self.cb2_out = state;
            ports.write_cb2(state);
        }
    }

    fn update_irq<P: ViaPorts + ?Sized>(&mut self, ports: &mut P) {
        let active = self.irq_active();
        if active != self.irq_out {
            self.irq_out = active;
            ports.irq(active);
        }
    }
}

impl Default for Via6522 {
    fn default() -> Self {
        Self::new()
    }
}
