//! E01 address decoding and board glue.
//!
//! | Range         | Read                      | Write                  |
//! |---------------|---------------------------|------------------------|
//! | 0x0000-0xFBFF | bank1: ROM, then RAM      | bank2: RAM             |
//! | 0xFC00        | RTC address               | RTC address            |
//! | 0xFC04        | RTC data                  | RTC data               |
//! | 0xFC08        | RAM select                | floppy control         |
//! | 0xFC0C-0xFC0F | WD2793                    | WD2793                 |
//! | 0xFC10-0xFC1F | VIA                       | VIA                    |
//! | 0xFC20-0xFC23 | ADLC                      | ADLC                   |
//! | 0xFC24        | network IRQ disable       | network IRQ disable    |
//! | 0xFC28        | network IRQ enable        | network IRQ enable     |
//! | 0xFC2C        | front flap and SW3        |                        |
//! | 0xFC30        | HDC data                  | HDC data               |
//! | 0xFC31        | HDC status                |                        |
//! | 0xFC32        |                           | HDC select             |
//! | 0xFC33        |                           | HDC IRQ enable         |
//! | 0xFD00-0xFFFF | bank3: ROM, then RAM      | bank4: RAM             |
//!
//! The I/O page repeats every 0x40 bytes; single-byte registers also ignore
//! address bits 0-1. Reset puts ROM under reads of both banked ranges and
//! any read of 0xFC08 switches them to RAM until the next reset.
//!
//! IRQ is VIA, RTC and the gated HDC line; NMI is floppy DRQ and the gated
//! ADLC line.

use emu_core::chips::{FdcLines, Mc146818, RtcLines, Via6522, ViaPorts, Wd17xx};
use emu_core::floppy::FloppyImage;
use emu_core::irq::{CpuLine, InterruptAggregator, InterruptLineSink, SourceId, SourceKind};
use emu_core::lines::{Centronics, Disconnected};
use emu_core::logging::{log, LogCategory, LogLevel};
use emu_core::memory::{Access, AddressSpace, BufferId, BufferView, MapEntry, SlotId, Target};

use crate::econet::Adlc;
use crate::scsi::{self, ScsiBus, ScsiEdges, ScsiLines};
use crate::{E01Config, E01Error};

pub const ROM_SIZE: usize = 0x10000;
const HIGH_BASE: usize = 0xFD00;
const ENTRY_RAM: usize = 0;
const ENTRY_ROM: usize = 1;
/// A target answering one handshake edge may move another line; a few
/// rounds are enough for any real device.
const SCSI_SETTLE_ROUNDS: usize = 4;

pub type E01Space = AddressSpace<E01Device>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum E01Device {
    RtcAddress,
    RtcData,
    RamSelect,
    FloppyControl,
    Fdc,
    Via,
    Adlc,
    NetIrqDisable,
    NetIrqEnable,
    Flap,
    HdcData,
    HdcStatus,
    HdcSelect,
    HdcIrqEnable,
}

#[derive(Debug, Clone, Copy)]
struct IrqSources {
    via: SourceId,
    hdc: SourceId,
    rtc: SourceId,
    fdc: SourceId,
    adlc: SourceId,
}

struct ViaWiring<'a> {
    printer: &'a mut dyn Centronics,
    irqs: &'a mut InterruptAggregator,
    source: SourceId,
}

impl ViaPorts for ViaWiring<'_> {
    fn write_a(&mut self, data: u8) {
        self.printer.write_data(data);
    }

    fn write_ca2(&mut self, state: bool) {
        self.printer.write_strobe(state);
    }

    fn irq(&mut self, state: bool) {
        self.irqs.set_level(self.source, state);
    }
}

/// A single interrupt output wired to one aggregator source.
struct IrqWire<'a> {
    irqs: &'a mut InterruptAggregator,
    source: SourceId,
}

impl RtcLines for IrqWire<'_> {
    fn irq(&mut self, state: bool) {
        self.irqs.set_level(self.source, state);
    }
}

/// Only DRQ is connected; INTRQ is polled through the status register.
impl FdcLines for IrqWire<'_> {
    fn intrq(&mut self, _state: bool) {}

    fn drq(&mut self, state: bool) {
        self.irqs.set_level(self.source, state);
    }
}

pub struct E01Bus {
    pub(crate) config: E01Config,
    pub(crate) space: E01Space,
    pub(crate) ram: BufferId,
    low_read: SlotId,
    high_read: SlotId,

    pub(crate) via: Via6522,
    pub(crate) rtc: Mc146818,
    pub(crate) fdc: Wd17xx,
    pub(crate) irqs: InterruptAggregator,
    sources: IrqSources,
    pub(crate) scsi_lines: ScsiLines,
    pub(crate) mode_led: bool,
    pub(crate) front_flap_open: bool,

    printer: Box<dyn Centronics>,
    scsi: Box<dyn ScsiBus>,
    adlc: Box<dyn Adlc>,
}

impl E01Bus {
    pub fn new(config: E01Config, rom: Vec<u8>) -> Result<Self, E01Error> {
        if rom.len() != ROM_SIZE {
            return Err(E01Error::RomSize {
                expected: ROM_SIZE,
                actual: rom.len(),
            });
        }

        let mut space = E01Space::new("e01", 16);
        let ram = space.add_ram("ram", 0x10000);
        let rom = space.add_rom("rom", rom);

        let low_read = space.add_slot("bank1");
        space.configure_entry(low_read, ENTRY_RAM, BufferView::new(ram, 0));
        space.configure_entry(low_read, ENTRY_ROM, BufferView::new(rom, 0));
        let low_write = space.add_slot("bank2");
        space.configure_entry(low_write, ENTRY_RAM, BufferView::new(ram, 0));
        space.select(low_write, ENTRY_RAM);

        let high_read = space.add_slot("bank3");
        space.configure_entry(high_read, ENTRY_RAM, BufferView::new(ram, HIGH_BASE));
        space.configure_entry(high_read, ENTRY_ROM, BufferView::new(rom, HIGH_BASE));
        let high_write = space.add_slot("bank4");
        space.configure_entry(high_write, ENTRY_RAM, BufferView::new(ram, HIGH_BASE));
        space.select(high_write, ENTRY_RAM);

        space.install_read(0x0000..=0xFBFF, 0, Target::Bank(low_read));
        space.install_write(0x0000..=0xFBFF, 0, Target::Bank(low_write));
        space.install_read(0xFD00..=0xFFFF, 0, Target::Bank(high_read));
        space.install_write(0xFD00..=0xFFFF, 0, Target::Bank(high_write));
        Self::install_io(&mut space);

        let mut irqs = InterruptAggregator::new();
        let sources = IrqSources {
            via: irqs.add_source("via", CpuLine::Irq0, SourceKind::Level),
            hdc: irqs.add_source("hdc", CpuLine::Irq0, SourceKind::Level),
            rtc: irqs.add_source("rtc", CpuLine::Irq0, SourceKind::Level),
            fdc: irqs.add_source("fdc", CpuLine::Nmi, SourceKind::Level),
            adlc: irqs.add_source("adlc", CpuLine::Nmi, SourceKind::Level),
        };

        let mut bus = Self {
            config,
            space,
            ram,
            low_read,
            high_read,
            via: Via6522::new(),
            rtc: Mc146818::new(),
            fdc: Wd17xx::new(),
            irqs,
            sources,
            scsi_lines: ScsiLines::default(),
            mode_led: false,
            front_flap_open: config.front_flap_open,
            printer: Box::new(Disconnected),
            scsi: Box::new(Disconnected),
            adlc: Box::new(Disconnected),
        };
        bus.reset();
        Ok(bus)
    }

    fn install_io(space: &mut E01Space) {
        use E01Device::*;

        space.install(0xFC00..=0xFC00, 0xC3, Target::Device(RtcAddress));
        space.install(0xFC04..=0xFC04, 0xC3, Target::Device(RtcData));
        space.install_read(0xFC08..=0xFC08, 0xC0, Target::Device(RamSelect));
        space.install_write(0xFC08..=0xFC08, 0xC0, Target::Device(FloppyControl));
        space.install(0xFC0C..=0xFC0F, 0xC0, Target::Device(Fdc));
        space.install(0xFC10..=0xFC1F, 0xC0, Target::Device(Via));
        space.install(0xFC20..=0xFC23, 0xC0, Target::Device(Adlc));
        space.install(0xFC24..=0xFC24, 0xC3, Target::Device(NetIrqDisable));
        space.install(0xFC28..=0xFC28, 0xC3, Target::Device(NetIrqEnable));
        space.install_read(0xFC2C..=0xFC2C, 0xC3, Target::Device(Flap));
        space.install(0xFC30..=0xFC30, 0xC0, Target::Device(HdcData));
        space.install_read(0xFC31..=0xFC31, 0xC0, Target::Device(HdcStatus));
        space.install_write(0xFC32..=0xFC32, 0xC0, Target::Device(HdcSelect));
        space.install_write(0xFC33..=0xFC33, 0xC0, Target::Device(HdcIrqEnable));
    }

    /// ROM back under the banked reads, chips to power-on state, both
    /// interrupt enable latches cleared. RAM, RTC time and disks are kept.
    pub fn reset(&mut self) {
        self.space.select(self.low_read, ENTRY_ROM);
        self.space.select(self.high_read, ENTRY_ROM);

        self.via.reset();
        self.fdc.reset(&mut ());
        self.irqs.reset();
        self.irqs.set_enabled(self.sources.hdc, false);
        self.irqs.set_enabled(self.sources.adlc, false);
        let mut wire = IrqWire {
            irqs: &mut self.irqs,
            source: self.sources.rtc,
        };
        self.rtc.reset(&mut wire);
        self.mode_led = false;

        self.scsi_lines = ScsiLines {
            bsy: self.scsi.bsy(),
            req: self.scsi.req(),
        };
        self.irqs.set_level(self.sources.hdc, !self.scsi_lines.req);
    }

    pub fn config(&self) -> &E01Config {
        &self.config
    }

    pub fn memory_map(&self) -> Vec<MapEntry> {
        self.space.listing()
    }

    pub fn space(&self) -> &E01Space {
        &self.space
    }

    pub fn read8(&mut self, addr: u32) -> u8 {
        match self.space.read(addr) {
            Access::Data(value) => value,
            Access::Device(device, offset) => self.read_device(device, offset),
        }
    }

    pub fn write8(&mut self, addr: u32, value: u8) {
        if let Some((device, offset)) = self.space.write(addr, value) {
            self.write_device(device, offset, value);
        }
    }

    pub fn peek(&self, addr: u32) -> Option<u8> {
        self.space.peek(addr)
    }

    fn read_device(&mut self, device: E01Device, offset: u32) -> u8 {
        match device {
            E01Device::RtcAddress | E01Device::RtcData => {
                let mut wire = IrqWire {
                    irqs: &mut self.irqs,
                    source: self.sources.rtc,
                };
                let register = u32::from(device == E01Device::RtcData);
                self.rtc.read(register, &mut wire)
            }
            E01Device::RamSelect => {
                log(LogCategory::Banking, LogLevel::Debug, || "e01: RAM select".to_string());
                self.space.select(self.low_read, ENTRY_RAM);
                self.space.select(self.high_read, ENTRY_RAM);
                0
            }
            E01Device::Fdc => {
                let mut wire = IrqWire {
                    irqs: &mut self.irqs,
                    source: self.sources.fdc,
                };
                self.fdc.read(offset, &mut wire)
            }
            E01Device::Via => {
                let mut wiring = ViaWiring {
                    printer: &mut *self.printer,
                    irqs: &mut self.irqs,
                    source: self.sources.via,
                };
                self.via.read(offset, &mut wiring)
            }
            E01Device::Adlc => self.adlc.read(offset as u8),
            E01Device::NetIrqDisable => {
                self.set_network_irq_enable(false);
                0
            }
            E01Device::NetIrqEnable => {
                self.set_network_irq_enable(true);
                0
            }
            E01Device::Flap => {
                let mut data = 0x3F;
                if self.front_flap_open {
                    data |= 0x40;
                }
                if self.config.sw3 {
                    data |= 0x80;
                }
                data
            }
            E01Device::HdcData => {
                let data = self.scsi.data();
                self.scsi.set_ack(false);
                self.settle_scsi();
                data
            }
            E01Device::HdcStatus => scsi::status(&*self.scsi),
            E01Device::FloppyControl | E01Device::HdcSelect | E01Device::HdcIrqEnable => {
                self.space.open_bus()
            }
        }
    }

    fn write_device(&mut self, device: E01Device, offset: u32, data: u8) {
        match device {
            E01Device::RtcAddress | E01Device::RtcData => {
                let mut wire = IrqWire {
                    irqs: &mut self.irqs,
                    source: self.sources.rtc,
                };
                let register = u32::from(device == E01Device::RtcData);
                self.rtc.write(register, data, &mut wire);
            }
            E01Device::FloppyControl => self.floppy_control(data),
            E01Device::Fdc => {
                let mut wire = IrqWire {
                    irqs: &mut self.irqs,
                    source: self.sources.fdc,
                };
                self.fdc.write(offset, data, &mut wire);
            }
            E01Device::Via => {
                let mut wiring = ViaWiring {
                    printer: &mut *self.printer,
                    irqs: &mut self.irqs,
                    source: self.sources.via,
                };
                self.via.write(offset, data, &mut wiring);
            }
            E01Device::Adlc => self.adlc.write(offset as u8, data),
            E01Device::NetIrqDisable => self.set_network_irq_enable(false),
            E01Device::NetIrqEnable => self.set_network_irq_enable(true),
            E01Device::HdcData => {
                self.scsi.set_data(data);
                self.scsi.set_ack(false);
                self.settle_scsi();
            }
            E01Device::HdcSelect => {
                self.scsi.set_sel(false);
                self.settle_scsi();
            }
            E01Device::HdcIrqEnable => {
                self.irqs.set_enabled(self.sources.hdc, data & 0x01 != 0);
            }
            E01Device::RamSelect | E01Device::Flap | E01Device::HdcStatus => {}
        }
    }

    /// 0xFC08 write: drive selects (active low), side, NVRAM select,
    /// density (/DDEN), /MR, test and the mode LED.
    fn floppy_control(&mut self, data: u8) {
        if data & 0x01 == 0 {
            self.fdc.set_drive(0);
        }
        if data & 0x02 == 0 {
            self.fdc.set_drive(1);
        }
        self.fdc.set_side((data >> 2) & 1);
        self.fdc.set_density(data & 0x10 == 0);

        let mut wire = IrqWire {
            irqs: &mut self.irqs,
            source: self.sources.fdc,
        };
        self.fdc.set_master_reset(data & 0x20 == 0, &mut wire);

        if data & 0x48 != 0 {
            log(LogCategory::Stubs, LogLevel::Trace, || {
                format!("e01: NVRAM select/floppy test bits {:#04x} ignored", data & 0x48)
            });
        }
        self.mode_led = data & 0x80 != 0;
    }

    fn set_network_irq_enable(&mut self, enabled: bool) {
        self.irqs.set_enabled(self.sources.adlc, enabled);
    }

    /// React to REQ and BSY edges from the target.
    fn settle_scsi(&mut self) {
        for _ in 0..SCSI_SETTLE_ROUNDS {
            let edges = self.scsi_lines.sync(&*self.scsi);
            if edges == ScsiEdges::default() {
                return;
            }
            if edges.bsy_fell {
                self.scsi.set_sel(true);
            }
            if let Some(req) = edges.req {
                if req {
                    self.scsi.set_ack(true);
                }
                self.irqs.set_level(self.sources.hdc, !req);
            }
        }
    }

    // External inputs

    /// The target changed REQ or BSY on its own.
    pub fn scsi_lines_changed(&mut self) {
        self.settle_scsi();
    }

    pub fn adlc_irq(&mut self, state: bool) {
        self.irqs.set_level(self.sources.adlc, state);
    }

    /// Printer ACK, on VIA CA1.
    pub fn printer_ack(&mut self, state: bool) {
        let mut wiring = ViaWiring {
            printer: &mut *self.printer,
            irqs: &mut self.irqs,
            source: self.sources.via,
        };
        self.via.set_ca1(state, &mut wiring);
    }

    pub fn clock(&mut self, cycles: u32) {
        let mut wiring = ViaWiring {
            printer: &mut *self.printer,
            irqs: &mut self.irqs,
            source: self.sources.via,
        };
        self.via.clock(cycles, &mut wiring);
    }

    pub fn rtc_periodic_tick(&mut self) {
        let mut wire = IrqWire {
            irqs: &mut self.irqs,
            source: self.sources.rtc,
        };
        self.rtc.periodic_tick(&mut wire);
    }

    pub fn rtc_tick_second(&mut self) {
        let mut wire = IrqWire {
            irqs: &mut self.irqs,
            source: self.sources.rtc,
        };
        self.rtc.tick_second(&mut wire);
    }

    pub fn rtc(&self) -> &Mc146818 {
        &self.rtc
    }

    pub fn rtc_mut(&mut self) -> &mut Mc146818 {
        &mut self.rtc
    }

    pub fn set_front_flap(&mut self, open: bool) {
        self.front_flap_open = open;
    }

    pub fn mode_led(&self) -> bool {
        self.mode_led
    }

    pub fn connect_printer(&mut self, printer: Box<dyn Centronics>) {
        self.printer = printer;
    }

    pub fn connect_scsi(&mut self, scsi: Box<dyn ScsiBus>) {
        self.scsi = scsi;
        self.settle_scsi();
    }

    pub fn connect_adlc(&mut self, adlc: Box<dyn Adlc>) {
        self.adlc = adlc;
    }

    pub fn set_interrupt_sink(&mut self, sink: Box<dyn InterruptLineSink>) {
        self.irqs.set_sink(sink);
    }

    pub fn irq_line(&self) -> bool {
        self.irqs.line(CpuLine::Irq0)
    }

    pub fn nmi_line(&self) -> bool {
        self.irqs.line(CpuLine::Nmi)
    }

    pub fn insert_disk(&mut self, drive: usize, image: FloppyImage) {
        self.fdc.insert(drive, image);
    }

    pub fn eject_disk(&mut self, drive: usize) -> Option<FloppyImage> {
        self.fdc.eject(drive)
    }

    pub fn disk(&self, drive: usize) -> Option<&FloppyImage> {
        self.fdc.image(drive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bus() -> E01Bus {
        let rom = (0..ROM_SIZE).map(|i| (i >> 8) as u8).collect();
        E01Bus::new(E01Config::default(), rom).unwrap()
    }

    #[test]
    fn test_rom_size_checked() {
        assert!(matches!(
            E01Bus::new(E01Config::default(), vec![0; 0x8000]),
            Err(E01Error::RomSize {
                expected: 0x10000,
                actual: 0x8000
            })
        ));
    }

    #[test]
    fn test_io_page_mirrors() {
        let mut bus = bus();
        bus.write8(0xFC00, 0x20);
        bus.write8(0xFC04, 0x77);
        for addr in [0xFC00, 0xFC03, 0xFC40, 0xFCC3] {
            assert_eq!(bus.read8(addr), 0x20, "{:#x}", addr);
        }
        assert_eq!(bus.read8(0xFCC7), 0x77);

        // Gaps in the page float
        assert_eq!(bus.read8(0xFC34), 0xFF);
        assert_eq!(bus.read8(0xFC09), 0xFF);
    }

    #[test]
    fn test_unused_flap_bits_read_high() {
        let mut bus = bus();
        assert_eq!(bus.read8(0xFC2C), 0x3F);
        bus.set_front_flap(true);
        assert_eq!(bus.read8(0xFCEF), 0x7F);
    }

    #[test]
    fn test_floppy_control_latch() {
        let mut bus = bus();
        bus.write8(0xFC08, 0xA5);
        assert!(bus.mode_led());
        assert_eq!(bus.fdc.drive(), 1);
        assert_eq!(bus.fdc.side(), 1);
        assert!(bus.fdc.is_mfm());
    }
}
