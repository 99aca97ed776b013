use std::cell::{Cell, RefCell};
use std::rc::Rc;

use emu_core::floppy::{FloppyImage, Geometry};
use emu_core::lines::{Cassette, Centronics};
use emu_core::{Bus, Machine};
use emu_oric::{DiskInterface, Interface, Model, OricConfig, OricRoms, OricSystem};

const OS_BYTE: u8 = 0x4C;
const DISK_ROM_BYTE: u8 = 0xD5;

fn system(model: Model, interface: DiskInterface) -> OricSystem {
    let config = OricConfig {
        model,
        interface,
        vsync_cable: false,
    };
    let os = match model {
        // Each cartridge block filled with its block number
        Model::Telestrat => [3u8, 5, 6, 7]
            .iter()
            .flat_map(|&block| std::iter::repeat(block).take(0x4000))
            .collect(),
        _ => vec![OS_BYTE; 0x4000],
    };
    let interface = match config.effective_interface() {
        DiskInterface::Microdisc => Some(vec![DISK_ROM_BYTE; 0x2000]),
        DiskInterface::Jasmin => Some((0..0x800).map(|i| (i & 0xFF) as u8).collect()),
        _ => None,
    };
    OricSystem::new(config, OricRoms { os, interface }).unwrap()
}

fn atmos(interface: DiskInterface) -> OricSystem {
    system(Model::Atmos, interface)
}

// VIA1 register addresses
const ORB: u32 = 0x0300;
const ORA: u32 = 0x0301;
const DDRB: u32 = 0x0302;
const DDRA: u32 = 0x0303;
const PCR: u32 = 0x030C;
const IFR: u32 = 0x030D;
const IER: u32 = 0x030E;

// PCR values for the PSG control pins: CA2 is BC1, CB2 is BDIR
const PSG_INACTIVE: u8 = 0xCC;
const PSG_READ: u8 = 0xCE;
const PSG_WRITE: u8 = 0xEC;
const PSG_LATCH: u8 = 0xEE;

/// Port A must already be an output.
fn psg_write(sys: &mut OricSystem, register: u8, value: u8) {
    sys.write8(PCR, PSG_LATCH);
    sys.write8(ORA, register);
    sys.write8(PCR, PSG_WRITE);
    sys.write8(ORA, value);
    sys.write8(PCR, PSG_INACTIVE);
}

#[derive(Clone, Default)]
struct Printer {
    data: Rc<RefCell<Vec<u8>>>,
    strobe: Rc<Cell<bool>>,
}

impl Centronics for Printer {
    fn write_data(&mut self, data: u8) {
        self.data.borrow_mut().push(data);
    }

    fn write_strobe(&mut self, state: bool) {
        self.strobe.set(state);
    }
}

#[derive(Clone, Default)]
struct Tape {
    level: Rc<Cell<f64>>,
    motor: Rc<Cell<bool>>,
}

impl Cassette for Tape {
    fn set_motor(&mut self, on: bool) {
        self.motor.set(on);
    }

    fn output(&mut self, _level: f64) {}

    fn input(&mut self) -> f64 {
        self.level.get()
    }
}

#[test]
fn test_no_interface_shows_os_rom() {
    let mut sys = atmos(DiskInterface::None);
    for addr in [0xC000, 0xE000, 0xF800, 0xFFFF] {
        assert_eq!(sys.read8(addr), OS_BYTE);
    }
    sys.write8(0xC000, 0x12);
    assert_eq!(sys.read8(0xC000), OS_BYTE);

    sys.write8(0x1234, 0x12);
    assert_eq!(sys.read8(0x1234), 0x12);
}

#[test]
fn test_microdisc_romdis_selects_rom_or_ram() {
    let mut sys = atmos(DiskInterface::Microdisc);

    // Install value: OS ROM disabled, EPROM enabled
    assert_eq!(sys.read8(0xC000), 0x00);
    assert_eq!(sys.read8(0xE000), DISK_ROM_BYTE);
    assert_eq!(sys.read8(0xFFFC), DISK_ROM_BYTE);

    // ROM enabled: OS everywhere
    sys.write8(0x0314, 0x83);
    assert_eq!(sys.read8(0xC000), OS_BYTE);
    assert_eq!(sys.read8(0xE000), OS_BYTE);
    sys.write8(0xC000, 0x5A);
    assert_eq!(sys.read8(0xC000), OS_BYTE);

    // ROM disabled, EPROM disabled: overlay RAM everywhere
    sys.write8(0x0314, 0x81);
    sys.write8(0xC000, 0x5A);
    sys.write8(0xFFFF, 0xA5);
    assert_eq!(sys.read8(0xC000), 0x5A);
    assert_eq!(sys.read8(0xFFFF), 0xA5);

    sys.write8(0x0314, 0x83);
    assert_eq!(sys.read8(0xC000), OS_BYTE);
    sys.write8(0x0314, 0x81);
    assert_eq!(sys.read8(0xC000), 0x5A);
}

#[test]
fn test_microdisc_intrq_gated_by_enable_bit() {
    let mut sys = atmos(DiskInterface::Microdisc);
    assert!(!sys.bus().irq_line());

    // Disable, then restore: INTRQ rises but stays off the CPU line
    sys.write8(0x0314, 0x7C);
    sys.write8(0x0310, 0x08);
    assert_eq!(sys.read8(0x0314), 0x7F);
    assert!(!sys.bus().irq_line());

    sys.write8(0x0314, 0x7D);
    assert!(sys.bus().irq_line());

    // Status read acknowledges
    sys.read8(0x0310);
    assert!(!sys.bus().irq_line());
    assert_eq!(sys.read8(0x0314), 0xFF);
}

#[test]
fn test_jasmin_romdis_and_overlay() {
    let mut sys = atmos(DiskInterface::Jasmin);

    // ROMDIS set at install, overlay off: nothing below 0xF800
    for addr in [0xC000, 0xDFFF, 0xE000, 0xF7FF] {
        sys.write8(addr, 0x42);
        assert_eq!(sys.read8(addr), 0xFF);
    }
    assert_eq!(sys.read8(0xF800), 0x00);
    assert_eq!(sys.read8(0xF8FF), 0xFF);
    assert_eq!(sys.read8(0xF912), 0x12);

    // Overlay on: RAM below, boot ROM still on top
    sys.write8(0x03FA, 0x01);
    sys.write8(0xC000, 0x42);
    assert_eq!(sys.read8(0xC000), 0x42);
    assert_eq!(sys.read8(0xF912), 0x12);

    // ROMDIS clear: overlay chooses RAM for the whole window
    sys.write8(0x03FB, 0x00);
    assert_eq!(sys.read8(0xC000), 0x42);
    sys.write8(0xF912, 0x99);
    assert_eq!(sys.read8(0xF912), 0x99);

    sys.write8(0x03FA, 0x00);
    assert_eq!(sys.read8(0xC000), OS_BYTE);
    assert_eq!(sys.read8(0xF912), OS_BYTE);
}

#[test]
fn test_jasmin_drq_drives_irq() {
    let mut sys = atmos(DiskInterface::Jasmin);
    let mut image = FloppyImage::blank(Geometry::default());
    image.write_sector(0, 0, 1, &[0x11; 512]).unwrap();
    sys.bus_mut().insert_disk(0, image);

    sys.write8(0x03FC, 0x00);
    sys.write8(0x03F8, 0x00);
    sys.write8(0x03F6, 0x01);
    sys.write8(0x03F4, 0x80);
    assert!(sys.bus().irq_line());
    assert_eq!(sys.read8(0x03F7), 0x11);
}

#[test]
fn test_psg_multiplex() {
    let mut sys = atmos(DiskInterface::None);
    let printer = Printer::default();
    sys.bus_mut().connect_printer(Box::new(printer.clone()));
    sys.write8(DDRA, 0xFF);

    // Port A of the PSG as output, then a register value
    psg_write(&mut sys, 7, 0x40);
    psg_write(&mut sys, 14, 0x5E);
    assert_eq!(sys.bus().psg().register(14), 0x5E);
    assert_eq!(sys.bus().psg().register(7), 0x40);

    // Write register mode: the value goes to the PSG only
    sys.write8(PCR, PSG_LATCH);
    sys.write8(ORA, 2);
    sys.write8(PCR, PSG_WRITE);
    sys.write8(ORA, 0x0B);
    assert_eq!(sys.bus().psg().register(2), 0x0B);
    assert!(printer.data.borrow().is_empty());

    // Read register mode: port A shows the register, not the last write
    sys.write8(PCR, PSG_LATCH);
    sys.write8(ORA, 14);
    sys.write8(PCR, PSG_READ);
    sys.write8(DDRA, 0x00);
    assert_eq!(sys.read8(ORA), 0x5E);

    // Inactive: port A is the printer
    sys.write8(PCR, PSG_INACTIVE);
    sys.write8(DDRA, 0xFF);
    sys.write8(ORA, 0x41);
    assert_eq!(printer.data.borrow().last(), Some(&0x41));
    assert_eq!(sys.read8(ORA), 0x41);
    assert_eq!(sys.bus().psg().register(2), 0x0B);
}

#[test]
fn test_keyboard_sense() {
    let mut sys = atmos(DiskInterface::None);
    sys.set_key(2, 5, true);
    sys.write8(DDRB, 0xF7);
    sys.write8(DDRA, 0xFF);

    psg_write(&mut sys, 7, 0x40);
    psg_write(&mut sys, 14, !(1 << 5));
    sys.write8(ORB, 0x02);
    assert_eq!(sys.read8(ORB) & 0x08, 0x08);

    // Another row
    sys.write8(ORB, 0x03);
    assert_eq!(sys.read8(ORB) & 0x08, 0x00);

    // Column not selected
    sys.write8(ORB, 0x02);
    psg_write(&mut sys, 14, 0xFF);
    assert_eq!(sys.read8(ORB) & 0x08, 0x00);
}

#[test]
fn test_printer_strobe_and_ack() {
    let mut sys = atmos(DiskInterface::None);
    let printer = Printer::default();
    sys.bus_mut().connect_printer(Box::new(printer.clone()));

    sys.write8(DDRB, 0xFF);
    sys.write8(ORB, 0x10);
    assert!(printer.strobe.get());
    sys.write8(ORB, 0x00);
    assert!(!printer.strobe.get());

    // ACK on CA1, negative edge by default
    sys.write8(IER, 0x82);
    sys.bus_mut().printer_ack(true);
    assert!(!sys.bus().irq_line());
    sys.bus_mut().printer_ack(false);
    assert_eq!(sys.read8(IFR) & 0x02, 0x02);
    assert!(sys.bus().irq_line());
}

#[test]
fn test_tape_input_and_motor() {
    let mut sys = atmos(DiskInterface::None);
    let tape = Tape::default();
    sys.bus_mut().connect_cassette(Box::new(tape.clone()));

    sys.write8(DDRB, 0xFF);
    sys.write8(ORB, 0x40);
    assert!(tape.motor.get());

    sys.write8(IER, 0x90);
    tape.level.set(0.5);
    sys.bus_mut().tape_tick();
    assert!(!sys.bus().irq_line());

    tape.level.set(-0.5);
    sys.bus_mut().tape_tick();
    assert_eq!(sys.read8(IFR) & 0x10, 0x10);
    assert!(sys.bus().irq_line());
}

#[test]
fn test_vsync_cable_replaces_tape() {
    let config = OricConfig {
        vsync_cable: true,
        ..OricConfig::default()
    };
    let roms = OricRoms {
        os: vec![OS_BYTE; 0x4000],
        interface: None,
    };
    let mut sys = OricSystem::new(config, roms).unwrap();
    let tape = Tape::default();
    tape.level.set(1.0);
    sys.bus_mut().connect_cassette(Box::new(tape.clone()));

    sys.bus_mut().set_vsync(true);
    sys.bus_mut().tape_tick();
    sys.bus_mut().set_vsync(false);
    sys.bus_mut().tape_tick();
    assert_eq!(sys.read8(IFR) & 0x10, 0x10);
}

#[test]
fn test_telestrat_blocks() {
    let mut sys = system(Model::Telestrat, DiskInterface::None);
    assert_eq!(sys.read8(0xC000), 7);

    // Making port A an output drives 0 onto the block lines
    sys.write8(0x0323, 0xFF);
    assert_eq!(sys.read8(0xC000), 0x00);
    sys.write8(0xC000, 0x99);
    assert_eq!(sys.read8(0xC000), 0x99);

    sys.write8(0x0321, 0x05);
    assert_eq!(sys.read8(0xFFFF), 5);
    sys.write8(0xC000, 0x11);
    assert_eq!(sys.read8(0xC000), 5);

    sys.write8(0x0321, 0x04);
    assert_eq!(sys.read8(0xC000), 0x00);
    sys.write8(0x0321, 0x00);
    assert_eq!(sys.read8(0xC000), 0x99);

    // The built-in Microdisc answers at 0x310 and the page above VIA2 is RAM
    sys.write8(0x0310, 0x08);
    assert_eq!(sys.read8(0x0314), 0x7F);
    sys.write8(0x0340, 0x24);
    assert_eq!(sys.read8(0x0340), 0x24);
}

#[test]
fn test_telestrat_joysticks() {
    let mut sys = system(Model::Telestrat, DiskInterface::None);
    sys.bus_mut().set_joystick(0, 0x1E);
    sys.write8(0x0322, 0xC0);
    sys.write8(0x0320, 0x40);
    assert_eq!(sys.read8(0x0320) & 0x1F, 0x1E);
    sys.write8(0x0320, 0x80);
    assert_eq!(sys.read8(0x0320) & 0x1F, 0x1F);
}

#[test]
fn test_save_and_load_state() {
    let mut sys = atmos(DiskInterface::Microdisc);
    sys.write8(0x1234, 0x77);
    sys.write8(0x0314, 0x81);
    sys.write8(0xC000, 0x5A);
    sys.write8(DDRA, 0x3F);
    sys.set_key(1, 1, true);

    let text = serde_json::to_string(&sys.save_state()).unwrap();

    sys.write8(0x1234, 0x00);
    sys.write8(0x0314, 0x83);
    sys.set_key(1, 1, false);
    sys.reset();
    sys.write8(0x0314, 0x83);
    assert_eq!(sys.read8(DDRA), 0x00);
    assert_eq!(sys.read8(0xC000), OS_BYTE);

    let state: serde_json::Value = serde_json::from_str(&text).unwrap();
    sys.load_state(&state).unwrap();
    assert_eq!(sys.read8(0x1234), 0x77);
    assert_eq!(sys.read8(0xC000), 0x5A);
    assert_eq!(sys.read8(DDRA), 0x3F);
    match sys.bus().interface() {
        Interface::Microdisc(microdisc) => assert_eq!(microdisc.control(), 0x81),
        other => panic!("unexpected interface {:?}", other),
    }
}

#[test]
fn test_save_state_keeps_telestrat_block() {
    let mut sys = system(Model::Telestrat, DiskInterface::None);
    sys.write8(0x0323, 0xFF);
    sys.write8(0x0321, 0x06);
    assert_eq!(sys.read8(0xC000), 6);
    let state = sys.save_state();

    sys.reset();
    assert_eq!(sys.read8(0xC000), 7);
    sys.load_state(&state).unwrap();
    assert_eq!(sys.read8(0xC000), 6);
}

#[test]
fn test_memory_map_lists_io_page() {
    let sys = atmos(DiskInterface::Microdisc);
    let map = sys.memory_map();
    assert!(map
        .iter()
        .any(|entry| entry.start == 0x0310 && entry.end == 0x031F));
    assert!(map.iter().any(|entry| entry.start == 0xC000));
}
