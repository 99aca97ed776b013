//! Oric address decoding and chip wiring.
//!
//! Memory map after reset:
//!
//! | Range         | Oric-1 / Atmos                  | Telestrat                |
//! |---------------|---------------------------------|--------------------------|
//! | 0x0000-0xBFFF | RAM                             | RAM                      |
//! | 0x0300-0x03FF | VIA, overridden by interfaces   | 0x300 VIA1, 0x310 FDC, 0x31C ACIA, 0x320 VIA2 |
//! | 0xC000-0xFFFF | banked, see [`crate::banking`]  | one of eight 16K blocks  |
//!
//! VIA1 wiring:
//!
//! | Pin     | Use                                         |
//! |---------|---------------------------------------------|
//! | PA0-7   | PSG data bus, printer data                  |
//! | CA1     | printer acknowledge                         |
//! | CA2     | PSG BC1                                     |
//! | PB0-2   | keyboard row                                |
//! | PB3     | keyboard sense (input)                      |
//! | PB4     | printer strobe                              |
//! | PB6     | tape motor                                  |
//! | PB7     | tape output                                 |
//! | CB1     | tape input, or vertical sync with the cable |
//! | CB2     | PSG BDIR                                    |
//!
//! Interrupt sources, all on IRQ: VIA1, the disk interface and VIA2.

use emu_core::chips::{Ay8910, BusControl, FdcLines, PsgPorts, Via6522, ViaPorts, Wd17xx};
use emu_core::floppy::FloppyImage;
use emu_core::irq::{CpuLine, InterruptAggregator, InterruptLineSink, SourceId, SourceKind};
use emu_core::lines::{Cassette, Centronics, Disconnected};
use emu_core::logging::{log, LogCategory, LogLevel};
use emu_core::memory::{Access, AddressSpace, BufferId, BufferView, MapEntry, SlotId, Target};
use serde::{Deserialize, Serialize};

use crate::banking::{HighBuffers, HighMemory, HighMemoryPlan};
use crate::config::{DiskInterface, Model, OricConfig};
use crate::interfaces::{page_offsets, AppleFdc, Interface};
use crate::keyboard::Keyboard;
use crate::telestrat::{TelestratBanks, TelestratPorts, BLOCK_SIZE};
use crate::{OricError, OricRoms};

/// Rate at which [`OricBus::tape_tick`] should be called.
pub const TAPE_SAMPLE_HZ: u32 = 4800;
/// Cassette input level above which CB1 reads high.
const TAPE_THRESHOLD: f64 = 0.0038;

pub type OricSpace = AddressSpace<OricDevice>;

/// Device windows of the 0x300 page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OricDevice {
    Via1,
    Microdisc,
    Jasmin,
    AppleFdc,
    /// Apple II v2 control register, write only.
    AppleLatch,
    Via2,
}

/// State of the VIA port A / PSG / keyboard connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PsgLink {
    /// Bit 0 is BC1 (CA2), bit 1 is BDIR (CB2).
    pub control: u8,
    /// Last value driven on VIA port A.
    pub port_a: u8,
    /// PSG port A: keyboard columns to sense, 0 selects.
    pub key_mask: u8,
    pub key_row: u8,
    /// Last value driven on VIA port B.
    pub port_b: u8,
}

impl PsgLink {
    fn new(bc1: bool, bdir: bool) -> Self {
        Self {
            control: u8::from(bc1) | (u8::from(bdir) << 1),
            port_a: 0,
            key_mask: 0,
            key_row: 0,
            port_b: 0,
        }
    }

    pub fn bus_control(&self) -> BusControl {
        BusControl::from_pins(self.control & 0x02 != 0, self.control & 0x01 != 0)
    }
}

#[derive(Debug, Clone, Copy)]
struct IrqSources {
    via1: SourceId,
    disk: SourceId,
    via2: SourceId,
}

/// PSG port A drives the keyboard column mask.
struct KeyColumns<'a>(&'a mut u8);

impl PsgPorts for KeyColumns<'_> {
    fn write_a(&mut self, data: u8) {
        *self.0 = data;
    }
}

struct Via1Wiring<'a> {
    psg: &'a mut Ay8910,
    link: &'a mut PsgLink,
    keyboard: &'a Keyboard,
    printer: &'a mut dyn Centronics,
    cassette: &'a mut dyn Cassette,
    irqs: &'a mut InterruptAggregator,
    source: SourceId,
}

impl Via1Wiring<'_> {
    fn refresh_psg(&mut self) {
        let data = self.link.port_a;
        match self.link.bus_control() {
            BusControl::WriteRegister => {
                self.psg.data_w(data, &mut KeyColumns(&mut self.link.key_mask))
            }
            BusControl::LatchAddress => self.psg.address_w(data),
            BusControl::Inactive | BusControl::ReadRegister => {}
        }
    }
}

impl ViaPorts for Via1Wiring<'_> {
    fn read_a(&mut self) -> u8 {
        match self.link.bus_control() {
            BusControl::Inactive => self.link.port_a,
            BusControl::ReadRegister => self.psg.data_r(&mut KeyColumns(&mut self.link.key_mask)),
            _ => 0xFF,
        }
    }

    fn read_b(&mut self) -> u8 {
        let row = self.link.key_row & 0x07;
        let sense = if self.keyboard.sense(usize::from(row), self.link.key_mask) {
            0x08
        } else {
            0
        };
        sense | row
    }

    fn write_a(&mut self, data: u8) {
        self.link.port_a = data;
        self.refresh_psg();
        if self.link.bus_control() == BusControl::Inactive {
            self.printer.write_data(data);
        }
    }

    fn write_b(&mut self, data: u8) {
        self.link.key_row = data & 0x07;

        let motor = data & 0x40 != 0;
        if (self.link.port_b ^ data) & 0x40 != 0 {
            log(LogCategory::Io, LogLevel::Debug, || {
                format!("tape motor {}", if motor { "on" } else { "off" })
            });
        }
        self.cassette.set_motor(motor);
        self.cassette.output(if data & 0x80 != 0 { -1.0 } else { 1.0 });
        self.printer.write_strobe(data & 0x10 != 0);

        self.refresh_psg();
        self.link.port_b = data;
    }

    fn write_ca2(&mut self, state: bool) {
        self.link.control = (self.link.control & !0x01) | u8::from(state);
        self.refresh_psg();
    }

    fn write_cb2(&mut self, state: bool) {
        self.link.control = (self.link.control & !0x02) | (u8::from(state) << 1);
        self.refresh_psg();
    }

    fn irq(&mut self, state: bool) {
        self.irqs.set_level(self.source, state);
    }
}

struct Via2Wiring<'a> {
    ports: &'a mut TelestratPorts,
    banks: Option<&'a TelestratBanks>,
    space: &'a mut OricSpace,
    irqs: &'a mut InterruptAggregator,
    source: SourceId,
}

impl ViaPorts for Via2Wiring<'_> {
    fn read_a(&mut self) -> u8 {
        self.ports.port_a
    }

    fn read_b(&mut self) -> u8 {
        self.ports.read_b()
    }

    fn write_a(&mut self, data: u8) {
        if let (Some(block), Some(banks)) = (self.ports.write_a(data), self.banks) {
            banks.select(&mut *self.space, block);
        }
    }

    fn write_b(&mut self, data: u8) {
        self.ports.port_b = data;
    }

    fn irq(&mut self, state: bool) {
        self.irqs.set_level(self.source, state);
    }
}

/// Where the floppy controller's INTRQ and DRQ go depends on the interface.
struct FdcWiring<'a> {
    interface: &'a mut Interface,
    irqs: &'a mut InterruptAggregator,
    source: SourceId,
}

impl FdcLines for FdcWiring<'_> {
    fn intrq(&mut self, state: bool) {
        if let Interface::Microdisc(microdisc) = &mut *self.interface {
            microdisc.set_intrq(state);
            self.irqs.set_level(self.source, state);
        }
    }

    fn drq(&mut self, state: bool) {
        match &mut *self.interface {
            Interface::Microdisc(microdisc) => microdisc.set_drq(state),
            // The Jasmin wires DRQ straight to the CPU interrupt
            Interface::Jasmin(_) => self.irqs.set_level(self.source, state),
            _ => {}
        }
    }
}

macro_rules! via1_wiring {
    ($bus:expr) => {
        Via1Wiring {
            psg: &mut $bus.psg,
            link: &mut $bus.psg_link,
            keyboard: &$bus.keyboard,
            printer: &mut *$bus.printer,
            cassette: &mut *$bus.cassette,
            irqs: &mut $bus.irqs,
            source: $bus.sources.via1,
        }
    };
}

macro_rules! via2_wiring {
    ($bus:expr) => {
        Via2Wiring {
            ports: &mut $bus.telestrat_ports,
            banks: $bus.telestrat.as_ref(),
            space: &mut $bus.space,
            irqs: &mut $bus.irqs,
            source: $bus.sources.via2,
        }
    };
}

macro_rules! fdc_wiring {
    ($bus:expr) => {
        FdcWiring {
            interface: &mut $bus.interface,
            irqs: &mut $bus.irqs,
            source: $bus.sources.disk,
        }
    };
}

/// Everything behind the CPU's address and interrupt pins.
pub struct OricBus {
    pub(crate) config: OricConfig,
    pub(crate) space: OricSpace,
    pub(crate) ram: BufferId,
    /// Telestrat RAM blocks 0, 1, 2 and 4.
    pub(crate) overlay: Option<BufferId>,
    high: Option<HighMemory>,
    telestrat: Option<TelestratBanks>,
    apple_page: Option<SlotId>,

    pub(crate) via1: Via6522,
    pub(crate) via2: Via6522,
    pub(crate) psg: Ay8910,
    pub(crate) psg_link: PsgLink,
    pub(crate) keyboard: Keyboard,
    pub(crate) fdc: Wd17xx,
    pub(crate) interface: Interface,
    pub(crate) telestrat_ports: TelestratPorts,
    pub(crate) irqs: InterruptAggregator,
    sources: IrqSources,
    pub(crate) vsync: bool,

    printer: Box<dyn Centronics>,
    cassette: Box<dyn Cassette>,
    apple_fdc: Box<dyn AppleFdc>,
}

impl OricBus {
    pub fn new(config: OricConfig, roms: OricRoms) -> Result<Self, OricError> {
        let expected = config.os_rom_size();
        if roms.os.len() != expected {
            return Err(OricError::RomSize {
                name: "os",
                expected,
                actual: roms.os.len(),
            });
        }

        let kind = config.effective_interface();
        let mut space = OricSpace::new("oric", 16);
        let ram = space.add_ram("ram", 0x10000);

        let mut high = None;
        let mut telestrat = None;
        let mut overlay = None;
        let mut apple_page = None;

        if config.model == Model::Telestrat {
            // The Microdisc EPROM is never banked in on the Telestrat
            let blocks = space.add_ram("overlay", 4 * BLOCK_SIZE);
            let cartridges = space.add_rom("cartridges", roms.os);
            telestrat = Some(TelestratBanks::new(&mut space, blocks, cartridges));
            overlay = Some(blocks);
        } else {
            let interface_rom = match kind.rom_size() {
                None => None,
                Some(size) => {
                    let rom = roms
                        .interface
                        .ok_or(OricError::MissingInterfaceRom(kind))?;
                    let fits = match kind {
                        DiskInterface::Apple2 | DiskInterface::Apple2V2 => rom.len() >= size,
                        _ => rom.len() == size,
                    };
                    if !fits {
                        return Err(OricError::RomSize {
                            name: "interface",
                            expected: size,
                            actual: rom.len(),
                        });
                    }
                    Some(space.add_rom("interface", rom))
                }
            };

            let os = space.add_rom("os", roms.os);
            let mut buffers = HighBuffers {
                ram,
                os,
                disk_rom: None,
                jasmin_rom: None,
            };
            match (kind, interface_rom) {
                (DiskInterface::Microdisc, rom) => buffers.disk_rom = rom,
                (DiskInterface::Jasmin, rom) => buffers.jasmin_rom = rom,
                (DiskInterface::Apple2 | DiskInterface::Apple2V2, Some(rom)) => {
                    let slot = space.add_slot("bank4");
                    let offsets = page_offsets(kind == DiskInterface::Apple2V2);
                    for (entry, offset) in offsets.iter().enumerate() {
                        space.configure_entry(slot, entry, BufferView::new(rom, *offset));
                    }
                    apple_page = Some(slot);
                }
                _ => {}
            }
            high = Some(HighMemory::new(&mut space, buffers));
        }

        let mut irqs = InterruptAggregator::new();
        let sources = IrqSources {
            via1: irqs.add_source("via1", CpuLine::Irq0, SourceKind::Level),
            disk: irqs.add_source("disk", CpuLine::Irq0, SourceKind::Level),
            via2: irqs.add_source("via2", CpuLine::Irq0, SourceKind::Level),
        };

        let via1 = Via6522::new();
        let psg_link = PsgLink::new(via1.ca2_output(), via1.cb2_output());
        let mut bus = Self {
            config,
            space,
            ram,
            overlay,
            high,
            telestrat,
            apple_page,
            via1,
            via2: Via6522::new(),
            psg: Ay8910::new(),
            psg_link,
            keyboard: Keyboard::new(),
            fdc: Wd17xx::new(),
            interface: Interface::new(kind),
            telestrat_ports: TelestratPorts::default(),
            irqs,
            sources,
            vsync: false,
            printer: Box::new(Disconnected),
            cassette: Box::new(Disconnected),
            apple_fdc: Box::new(Disconnected),
        };
        bus.reset();
        Ok(bus)
    }

    /// Chips back to power-on state, interface registers to their install
    /// values and the memory map rebuilt. RAM and disks are kept.
    pub fn reset(&mut self) {
        self.via1.reset();
        self.via2.reset();
        self.psg.reset();
        self.psg_link = PsgLink::new(self.via1.ca2_output(), self.via1.cb2_output());
        self.fdc.reset(&mut ());
        self.irqs.reset();
        self.interface = Interface::new(self.config.effective_interface());
        self.telestrat_ports = TelestratPorts::default();
        self.map();
    }

    /// Install every window for the configured board and bank in what the
    /// current register state selects.
    pub(crate) fn map(&mut self) {
        self.space.clear_windows();
        self.space
            .install(0x0000..=0xBFFF, 0, Target::Buffer(BufferView::new(self.ram, 0)));

        if let Some(banks) = &self.telestrat {
            self.space
                .install(0x0300..=0x030F, 0, Target::Device(OricDevice::Via1));
            self.space
                .install(0x0310..=0x031B, 0, Target::Device(OricDevice::Microdisc));
            // ACIA
            self.space.install(0x031C..=0x031F, 0, Target::Nop);
            self.space
                .install(0x0320..=0x032F, 0, Target::Device(OricDevice::Via2));
            banks.select(&mut self.space, self.telestrat_ports.selection);
        } else if let Some(high) = &self.high {
            high.install(&mut self.space);
            high.apply(&mut self.space, &HighMemoryPlan::OS_ROM);
            self.space
                .install(0x0300..=0x03FF, 0, Target::Device(OricDevice::Via1));

            match &self.interface {
                Interface::None => {}
                Interface::Microdisc(_) => {
                    self.space
                        .install(0x0310..=0x031F, 0, Target::Device(OricDevice::Microdisc));
                }
                Interface::Jasmin(_) => {
                    self.space
                        .install(0x03F0..=0x03FF, 0, Target::Device(OricDevice::Jasmin));
                }
                Interface::Apple2(card) => {
                    self.space
                        .install(0x0310..=0x031F, 0, Target::Device(OricDevice::AppleFdc));
                    if let Some(slot) = self.apple_page {
                        self.space.select(slot, card.page_entry());
                        self.space.install_read(0x0320..=0x03FF, 0, Target::Bank(slot));
                    }
                    if card.is_v2() {
                        self.space
                            .install_write(0x0380..=0x0383, 0, Target::Device(OricDevice::AppleLatch));
                    }
                }
            }
            high.apply(&mut self.space, &self.interface.plan());
        }

        let disk_enabled = match &self.interface {
            Interface::None => false,
            Interface::Microdisc(microdisc) => microdisc.irq_enabled(),
            _ => true,
        };
        self.irqs.set_enabled(self.sources.disk, disk_enabled);
    }

    pub fn config(&self) -> &OricConfig {
        &self.config
    }

    pub fn memory_map(&self) -> Vec<MapEntry> {
        self.space.listing()
    }

    pub fn space(&self) -> &OricSpace {
        &self.space
    }

    // CPU side

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

    /// Memory contents at `addr`, without device side effects.
    pub fn peek(&self, addr: u32) -> Option<u8> {
        self.space.peek(addr)
    }

    fn read_device(&mut self, device: OricDevice, offset: u32) -> u8 {
        match device {
            OricDevice::Via1 => self.via1_read(offset),
            OricDevice::Microdisc => match offset {
                0..=3 => {
                    let mut lines = fdc_wiring!(self);
                    self.fdc.read(offset, &mut lines)
                }
                4 | 8 => match &self.interface {
                    Interface::Microdisc(microdisc) if offset == 4 => microdisc.intrq_r(),
                    Interface::Microdisc(microdisc) => microdisc.drq_r(),
                    _ => self.space.open_bus(),
                },
                _ => self.via1_read(offset),
            },
            OricDevice::Jasmin => match offset & 0x0F {
                reg @ 4..=7 => {
                    let mut lines = fdc_wiring!(self);
                    self.fdc.read(reg - 4, &mut lines)
                }
                reg => {
                    let value = self.via1_read(reg);
                    log(LogCategory::Fdc, LogLevel::Debug, || {
                        format!("jasmin: unhandled read {:#05x} = {:#04x}", 0x3F0 + reg, value)
                    });
                    value
                }
            },
            OricDevice::AppleFdc => self.apple_fdc.read((offset & 0x0F) as u8),
            OricDevice::AppleLatch => self.space.open_bus(),
            OricDevice::Via2 => {
                let mut wiring = via2_wiring!(self);
                self.via2.read(offset & 0x0F, &mut wiring)
            }
        }
    }

    fn write_device(&mut self, device: OricDevice, offset: u32, data: u8) {
        match device {
            OricDevice::Via1 => self.via1_write(offset, data),
            OricDevice::Microdisc => match offset {
                0..=3 => {
                    let mut lines = fdc_wiring!(self);
                    self.fdc.write(offset, data, &mut lines);
                }
                4 => self.microdisc_control(data),
                _ => self.via1_write(offset, data),
            },
            OricDevice::Jasmin => self.jasmin_write(offset & 0x0F, data),
            OricDevice::AppleFdc => self.apple_fdc.write((offset & 0x0F) as u8, data),
            OricDevice::AppleLatch => self.apple_latch(offset),
            OricDevice::Via2 => {
                let mut wiring = via2_wiring!(self);
                self.via2.write(offset & 0x0F, data, &mut wiring);
            }
        }
    }

    /// VIA1 repeats every 16 bytes in its windows.
    fn via1_read(&mut self, offset: u32) -> u8 {
        let mut wiring = via1_wiring!(self);
        self.via1.read(offset & 0x0F, &mut wiring)
    }

    fn via1_write(&mut self, offset: u32, data: u8) {
        let mut wiring = via1_wiring!(self);
        self.via1.write(offset & 0x0F, data, &mut wiring);
    }

    fn microdisc_control(&mut self, data: u8) {
        let Interface::Microdisc(microdisc) = &mut self.interface else {
            return;
        };
        microdisc.set_control(data);
        log(LogCategory::Fdc, LogLevel::Debug, || {
            format!("microdisc: control {:#04x}", data)
        });

        self.fdc.set_drive(microdisc.drive());
        self.fdc.set_side(microdisc.side());
        self.fdc.set_density(microdisc.mfm());

        // Banking is fixed on the Telestrat, which has no HighMemory
        if let Some(high) = &self.high {
            high.apply(&mut self.space, &microdisc.plan());
        }
        self.irqs
            .set_enabled(self.sources.disk, microdisc.irq_enabled());
    }

    fn jasmin_write(&mut self, reg: u32, data: u8) {
        match reg {
            4..=7 => {
                let mut lines = fdc_wiring!(self);
                self.fdc.write(reg - 4, data, &mut lines);
            }
            8 => self.fdc.set_side(data & 0x01),
            9 => {
                let mut lines = fdc_wiring!(self);
                self.fdc.reset(&mut lines);
            }
            0x0A | 0x0B => {
                let Interface::Jasmin(jasmin) = &mut self.interface else {
                    return;
                };
                if reg == 0x0A {
                    jasmin.set_overlay(data);
                } else {
                    jasmin.set_romdis(data);
                }
                log(LogCategory::Banking, LogLevel::Debug, || {
                    let name = if reg == 0x0A { "overlay ram" } else { "romdis" };
                    format!("jasmin: {} {:#04x}", name, data)
                });
                if let Some(high) = &self.high {
                    high.apply(&mut self.space, &jasmin.plan());
                }
            }
            0x0C..=0x0F => self.fdc.set_drive((reg & 0x03) as usize),
            _ => self.via1_write(reg, data),
        }
    }

    fn apple_latch(&mut self, offset: u32) {
        let Interface::Apple2(card) = &mut self.interface else {
            return;
        };
        card.latch(offset);
        if let Some(slot) = self.apple_page {
            self.space.select(slot, card.page_entry());
        }
        if let Some(high) = &self.high {
            high.apply(&mut self.space, &card.plan());
        }
    }

    // Peripheral inputs

    /// Sample the tape input (or vertical sync) onto CB1. Call at
    /// [`TAPE_SAMPLE_HZ`].
    pub fn tape_tick(&mut self) {
        let level = if self.config.vsync_cable {
            self.vsync
        } else {
            self.cassette.input() > TAPE_THRESHOLD
        };
        let mut wiring = via1_wiring!(self);
        self.via1.set_cb1(level, &mut wiring);
    }

    pub fn set_vsync(&mut self, state: bool) {
        self.vsync = state;
    }

    /// Printer ACK line, on CA1.
    pub fn printer_ack(&mut self, state: bool) {
        let mut wiring = via1_wiring!(self);
        self.via1.set_ca1(state, &mut wiring);
    }

    /// Advance the VIA timers.
    pub fn clock(&mut self, cycles: u32) {
        let mut wiring = via1_wiring!(self);
        self.via1.clock(cycles, &mut wiring);
        if self.telestrat.is_some() {
            let mut wiring = via2_wiring!(self);
            self.via2.clock(cycles, &mut wiring);
        }
    }

    pub fn keyboard_mut(&mut self) -> &mut Keyboard {
        &mut self.keyboard
    }

    /// Telestrat joystick `index` (0 left, 1 right), bits 0-4 active low.
    pub fn set_joystick(&mut self, index: usize, state: u8) {
        self.telestrat_ports.joysticks[index & 1] = state & 0x1F;
    }

    pub fn connect_printer(&mut self, printer: Box<dyn Centronics>) {
        self.printer = printer;
    }

    pub fn connect_cassette(&mut self, cassette: Box<dyn Cassette>) {
        self.cassette = cassette;
    }

    pub fn connect_apple_fdc(&mut self, fdc: Box<dyn AppleFdc>) {
        self.apple_fdc = fdc;
    }

    pub fn set_interrupt_sink(&mut self, sink: Box<dyn InterruptLineSink>) {
        self.irqs.set_sink(sink);
    }

    pub fn irq_line(&self) -> bool {
        self.irqs.line(CpuLine::Irq0)
    }

    pub fn interface(&self) -> &Interface {
        &self.interface
    }

    pub fn psg(&self) -> &Ay8910 {
        &self.psg
    }

    pub fn has_disk_controller(&self) -> bool {
        self.config.effective_interface().has_wd17xx()
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

    fn atmos(interface: DiskInterface, rom: Option<Vec<u8>>) -> OricBus {
        let config = OricConfig {
            interface,
            ..OricConfig::default()
        };
        let roms = OricRoms {
            os: vec![0xEA; 0x4000],
            interface: rom,
        };
        OricBus::new(config, roms).unwrap()
    }

    #[test]
    fn test_via_mirrors_through_io_page() {
        let mut bus = atmos(DiskInterface::None, None);
        bus.write8(0x0303, 0xFF);
        assert_eq!(bus.read8(0x0303), 0xFF);
        assert_eq!(bus.read8(0x03F3), 0xFF);
        assert_eq!(bus.read8(0x0313), 0xFF);
    }

    #[test]
    fn test_missing_interface_rom() {
        let config = OricConfig {
            interface: DiskInterface::Jasmin,
            ..OricConfig::default()
        };
        let roms = OricRoms {
            os: vec![0; 0x4000],
            interface: None,
        };
        assert!(matches!(
            OricBus::new(config, roms),
            Err(OricError::MissingInterfaceRom(DiskInterface::Jasmin))
        ));
    }

    #[test]
    fn test_wrong_os_size() {
        let roms = OricRoms {
            os: vec![0; 0x2000],
            interface: None,
        };
        assert!(matches!(
            OricBus::new(OricConfig::default(), roms),
            Err(OricError::RomSize {
                name: "os",
                expected: 0x4000,
                actual: 0x2000
            })
        ));
    }

    #[test]
    fn test_apple2_rom_page() {
        let rom: Vec<u8> = (0..0x100).map(|i| i as u8).collect();
        let mut bus = atmos(DiskInterface::Apple2, Some(rom));
        assert_eq!(bus.read8(0x0320), 0x20);
        assert_eq!(bus.read8(0x03FF), 0xFF);
        // Drive controller with nothing attached
        assert_eq!(bus.read8(0x0310), 0xFF);
    }

    #[test]
    fn test_apple2_v2_latch() {
        let rom: Vec<u8> = (0..0x300).map(|i| (i >> 8) as u8).collect();
        let mut bus = atmos(DiskInterface::Apple2V2, Some(rom));
        assert_eq!(bus.read8(0x0320), 0x01);
        assert_eq!(bus.read8(0xC000), 0xEA);

        // ROM visible, writes reach the overlay RAM
        bus.write8(0xC000, 0x12);
        assert_eq!(bus.read8(0xC000), 0xEA);

        bus.write8(0x0383, 0x00);
        assert_eq!(bus.read8(0x0320), 0x02);
        assert_eq!(bus.read8(0xC000), 0x12);
    }
}
