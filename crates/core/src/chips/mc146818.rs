//! Motorola MC146818 real time clock with 50 bytes of battery-backed RAM.
//!
//! The CPU sees an address register (offset 0) and a data register
//! (offset 1). Registers 0x00-0x09 hold the time and alarm, 0x0A-0x0D are
//! control and status, the rest is RAM.
//!
//! Time only moves when the machine calls [`Mc146818::tick_second`]; the
//! periodic interrupt is raised by [`Mc146818::periodic_tick`] at whatever
//! rate the machine's scheduler derives from register A.

use serde::{Deserialize, Serialize};

use crate::logging::{log, LogCategory, LogLevel};

pub const REG_SECONDS: usize = 0x00;
pub const REG_SECONDS_ALARM: usize = 0x01;
pub const REG_MINUTES: usize = 0x02;
pub const REG_MINUTES_ALARM: usize = 0x03;
pub const REG_HOURS: usize = 0x04;
pub const REG_HOURS_ALARM: usize = 0x05;
pub const REG_DAY_OF_WEEK: usize = 0x06;
pub const REG_DAY: usize = 0x07;
pub const REG_MONTH: usize = 0x08;
pub const REG_YEAR: usize = 0x09;
pub const REG_A: usize = 0x0A;
pub const REG_B: usize = 0x0B;
pub const REG_C: usize = 0x0C;
pub const REG_D: usize = 0x0D;

/// Register A: update in progress.
const A_UIP: u8 = 0x80;
/// Register B bits.
const B_SET: u8 = 0x80;
const B_PIE: u8 = 0x40;
const B_AIE: u8 = 0x20;
const B_UIE: u8 = 0x10;
/// Binary rather than BCD.
const B_DM: u8 = 0x04;
const B_24H: u8 = 0x02;
/// Register C bits.
const C_IRQF: u8 = 0x80;
const C_PF: u8 = 0x40;
const C_AF: u8 = 0x20;
const C_UF: u8 = 0x10;
/// Register D: valid RAM and time.
const D_VRT: u8 = 0x80;

/// The /IRQ output.
pub trait RtcLines {
    fn irq(&mut self, state: bool);
}

impl RtcLines for () {
    fn irq(&mut self, _state: bool) {}
}

/// Calendar time in plain binary, converted to the register format on load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RtcTime {
    /// Two digit year.
    pub year: u8,
    pub month: u8,
    pub day: u8,
    /// 1 is Sunday.
    pub weekday: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl Default for RtcTime {
    fn default() -> Self {
        Self {
            year: 0,
            month: 1,
            day: 1,
            weekday: 1,
            hour: 0,
            minute: 0,
            second: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mc146818 {
    #[serde(with = "registers")]
    registers: [u8; 64],
    index: u8,
    irq: bool,
    twelve_hour_logged: bool,
}

/// serde only derives for arrays up to 32 elements.
mod registers {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(registers: &[u8; 64], s: S) -> Result<S::Ok, S::Error> {
        registers.as_slice().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; 64], D::Error> {
        let bytes = Vec::<u8>::deserialize(d)?;
        bytes
            .try_into()
            .map_err(|v: Vec<u8>| serde::de::Error::invalid_length(v.len(), &"64 registers"))
    }
}

impl Default for Mc146818 {
    fn default() -> Self {
        Self::new()
    }
}

fn days_in_month(month: u8, year: u8) -> u8 {
    match month {
        2 if year % 4 == 0 => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

impl Mc146818 {
    /// Clock at 00:00:00 on 1 January, 24 hour BCD mode.
    pub fn new() -> Self {
        let mut rtc = Self {
            registers: [0; 64],
            index: 0,
            irq: false,
            twelve_hour_logged: false,
        };
        rtc.registers[REG_A] = 0x26;
        rtc.registers[REG_B] = B_24H;
        rtc.registers[REG_D] = D_VRT;
        rtc.set_time(&RtcTime::default());
        rtc
    }

    /// /RESET input: clears the interrupt enables and flags. Time and RAM
    /// survive.
    pub fn reset<L: RtcLines + ?Sized>(&mut self, lines: &mut L) {
        self.registers[REG_B] &= !(B_PIE | B_AIE | B_UIE);
        self.registers[REG_C] = 0;
        self.update_irq(lines);
    }

    pub fn register(&self, index: usize) -> u8 {
        self.registers[index & 0x3F]
    }

    pub fn irq_active(&self) -> bool {
        self.irq
    }

    /// Battery-backed contents, for persisting between sessions.
    pub fn nvram(&self) -> &[u8; 64] {
        &self.registers
    }

    pub fn load_nvram(&mut self, data: &[u8; 64]) {
        self.registers = *data;
        self.registers[REG_C] = 0;
        self.irq = false;
    }

    fn binary(&self) -> bool {
        self.registers[REG_B] & B_DM != 0
    }

    fn encode(&self, value: u8) -> u8 {
        if self.binary() {
            value
        } else {
            ((value / 10) << 4) | (value % 10)
        }
    }

    fn decode(&self, value: u8) -> u8 {
        if self.binary() {
            value
        } else {
            (value >> 4) * 10 + (value & 0x0F)
        }
    }

    fn field(&self, index: usize) -> u8 {
        self.decode(self.registers[index])
    }

    fn set_field(&mut self, index: usize, value: u8) {
        self.registers[index] = self.encode(value);
    }

    pub fn set_time(&mut self, time: &RtcTime) {
        self.set_field(REG_SECONDS, time.second);
        self.set_field(REG_MINUTES, time.minute);
        self.set_field(REG_HOURS, time.hour);
        self.set_field(REG_DAY_OF_WEEK, time.weekday);
        self.set_field(REG_DAY, time.day);
        self.set_field(REG_MONTH, time.month);
        self.set_field(REG_YEAR, time.year);
    }

    pub fn time(&self) -> RtcTime {
        RtcTime {
            year: self.field(REG_YEAR),
            month: self.field(REG_MONTH),
            day: self.field(REG_DAY),
            weekday: self.field(REG_DAY_OF_WEEK),
            hour: self.field(REG_HOURS),
            minute: self.field(REG_MINUTES),
            second: self.field(REG_SECONDS),
        }
    }

    /// Offset 0 reads the address latch, offset 1 the addressed register.
    pub fn read<L: RtcLines + ?Sized>(&mut self, offset: u32, lines: &mut L) -> u8 {
        if offset & 1 == 0 {
            return self.index;
        }
        let index = usize::from(self.index);
        match index {
            // The update cycle is instantaneous
            REG_A => self.registers[REG_A] & !A_UIP,
            REG_C => {
                let value = self.registers[REG_C];
                self.registers[REG_C] = 0;
                self.update_irq(lines);
                value
            }
            _ => self.registers[index],
        }
    }

    pub fn write<L: RtcLines + ?Sized>(&mut self, offset: u32, data: u8, lines: &mut L) {
        if offset & 1 == 0 {
            self.index = data & 0x3F;
            return;
        }
        let index = usize::from(self.index);
        match index {
            REG_A => self.registers[REG_A] = data & !A_UIP,
            REG_B => {
                if data & B_24H == 0 && !self.twelve_hour_logged {
                    self.twelve_hour_logged = true;
                    log(LogCategory::Stubs, LogLevel::Info, || {
                        "MC146818: 12 hour mode not emulated, counting 0-23".to_string()
                    });
                }
                self.registers[REG_B] = data;
                self.update_irq(lines);
            }
            REG_C | REG_D => {
                log(LogCategory::Io, LogLevel::Debug, || {
                    format!("MC146818: write {:#04x} to read-only register {:#04x}", data, index)
                });
            }
            _ => self.registers[index] = data,
        }
    }

    /// Periodic interrupt source, called at the rate selected by register A.
    pub fn periodic_tick<L: RtcLines + ?Sized>(&mut self, lines: &mut L) {
        self.registers[REG_C] |= C_PF;
        self.update_irq(lines);
    }

    /// Advance the clock by one second and run the alarm comparison. Frozen
    /// while register B's SET bit is held.
    pub fn tick_second<L: RtcLines + ?Sized>(&mut self, lines: &mut L) {
        if self.registers[REG_B] & B_SET != 0 {
            return;
        }

        let mut time = self.time();
        time.second += 1;
        if time.second >= 60 {
            time.second = 0;
            time.minute += 1;
        }
        if time.minute >= 60 {
            time.minute = 0;
            time.hour += 1;
        }
        if time.hour >= 24 {
            time.hour = 0;
            time.weekday = time.weekday % 7 + 1;
            time.day += 1;
        }
        if time.day > days_in_month(time.month, time.year) {
            time.day = 1;
            time.month += 1;
        }
        if time.month > 12 {
            time.month = 1;
            time.year = (time.year + 1) % 100;
        }
        self.set_time(&time);

        self.registers[REG_C] |= C_UF;
        let alarm = [
            (REG_SECONDS_ALARM, REG_SECONDS),
            (REG_MINUTES_ALARM, REG_MINUTES),
            (REG_HOURS_ALARM, REG_HOURS),
        ]
        .iter()
        .all(|&(alarm, now)| {
            // 0xC0-0xFF in an alarm register matches anything
            self.registers[alarm] >= 0xC0 || self.registers[alarm] == self.registers[now]
        });
        if alarm {
            self.registers[REG_C] |= C_AF;
        }
        self.update_irq(lines);
    }

    fn update_irq<L: RtcLines + ?Sized>(&mut self, lines: &mut L) {
        let enables = self.registers[REG_B] & (B_PIE | B_AIE | B_UIE);
        if self.registers[REG_C] & enables != 0 {
            self.registers[REG_C] |= C_IRQF;
        }
        let irq = self.registers[REG_C] & C_IRQF != 0;
        if irq != self.irq {
            self.irq = irq;
            lines.irq(irq);
        }
    }
}
