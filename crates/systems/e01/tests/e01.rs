use std::cell::RefCell;
use std::rc::Rc;

use emu_core::floppy::{FloppyImage, Geometry};
use emu_core::{Bus, Machine};
use emu_e01::scsi::ScsiBus;
use emu_e01::{E01Config, E01System, ROM_SIZE};

const RTC_ADDRESS: u32 = 0xFC00;
const RTC_DATA: u32 = 0xFC04;
const RAM_SELECT: u32 = 0xFC08;
const FLOPPY_CONTROL: u32 = 0xFC08;
const FDC_COMMAND: u32 = 0xFC0C;
const FDC_SECTOR: u32 = 0xFC0E;
const FDC_DATA: u32 = 0xFC0F;
const NET_IRQ_DISABLE: u32 = 0xFC24;
const NET_IRQ_ENABLE: u32 = 0xFC28;
const FLAP: u32 = 0xFC2C;
const HDC_DATA: u32 = 0xFC30;
const HDC_STATUS: u32 = 0xFC31;
const HDC_SELECT: u32 = 0xFC32;
const HDC_IRQ_ENABLE: u32 = 0xFC33;

fn rom() -> Vec<u8> {
    (0..ROM_SIZE).map(|i| (i >> 8) as u8 ^ 0xA5).collect()
}

fn system(config: E01Config) -> E01System {
    E01System::new(config, rom()).unwrap()
}

fn rom_byte(addr: u32) -> u8 {
    (addr >> 8) as u8 ^ 0xA5
}

#[derive(Default)]
struct TargetState {
    bsy: bool,
    req: bool,
    data: u8,
    received: Vec<u8>,
    ack: Vec<bool>,
    sel: Vec<bool>,
}

/// A target that answers selection with BSY and releases REQ when ACK falls.
#[derive(Clone)]
struct Target(Rc<RefCell<TargetState>>);

impl Target {
    fn new() -> Self {
        Target(Rc::new(RefCell::new(TargetState {
            bsy: true,
            req: true,
            ..TargetState::default()
        })))
    }

    fn assert_req(&self, data: u8) {
        let mut state = self.0.borrow_mut();
        state.req = false;
        state.data = data;
    }
}

impl ScsiBus for Target {
    fn data(&mut self) -> u8 {
        self.0.borrow().data
    }

    fn set_data(&mut self, data: u8) {
        self.0.borrow_mut().received.push(data);
    }

    fn set_ack(&mut self, level: bool) {
        let mut state = self.0.borrow_mut();
        state.ack.push(level);
        if !level {
            state.req = true;
        }
    }

    fn set_sel(&mut self, level: bool) {
        let mut state = self.0.borrow_mut();
        state.sel.push(level);
        if !level {
            state.bsy = false;
        }
    }

    fn msg(&self) -> bool {
        true
    }

    fn bsy(&self) -> bool {
        self.0.borrow().bsy
    }

    fn req(&self) -> bool {
        self.0.borrow().req
    }

    fn io(&self) -> bool {
        true
    }

    fn cd(&self) -> bool {
        true
    }
}

#[test]
fn test_rom_shadows_ram_until_selected() {
    let mut sys = system(E01Config::default());
    assert_eq!(sys.read8(0x0000), rom_byte(0x0000));
    assert_eq!(sys.read8(0xFFFC), rom_byte(0xFFFC));

    // Writes always land in RAM
    sys.write8(0x1234, 0x42);
    sys.write8(0xFE00, 0x43);
    assert_eq!(sys.read8(0x1234), rom_byte(0x1234));

    assert_eq!(sys.read8(RAM_SELECT), 0);
    assert_eq!(sys.read8(0x1234), 0x42);
    assert_eq!(sys.read8(0xFE00), 0x43);

    sys.reset();
    assert_eq!(sys.read8(0x1234), rom_byte(0x1234));
    sys.read8(RAM_SELECT | 0x40);
    assert_eq!(sys.read8(0x1234), 0x42);
}

#[test]
fn test_hdc_irq_gated_by_enable_latch() {
    let mut sys = system(E01Config::default());
    let target = Target::new();
    sys.bus_mut().connect_scsi(Box::new(target.clone()));

    target.assert_req(0x5A);
    sys.bus_mut().scsi_lines_changed();
    assert_eq!(sys.read8(HDC_STATUS) & 0x20, 0x20);
    assert!(!sys.bus().irq_line());

    sys.write8(HDC_IRQ_ENABLE, 0x01);
    assert!(sys.bus().irq_line());
    sys.write8(HDC_IRQ_ENABLE | 0x80, 0x00);
    assert!(!sys.bus().irq_line());
    sys.write8(HDC_IRQ_ENABLE, 0x01);

    // Reading the data pulses ACK and the target drops REQ
    assert_eq!(sys.read8(HDC_DATA), 0x5A);
    assert_eq!(target.0.borrow().ack, vec![false, true]);
    assert!(!sys.bus().irq_line());
    assert_eq!(sys.read8(HDC_STATUS) & 0x20, 0);
}

#[test]
fn test_hdc_write_and_selection() {
    let mut sys = system(E01Config::default());
    let target = Target::new();
    sys.bus_mut().connect_scsi(Box::new(target.clone()));

    sys.write8(HDC_SELECT, 0x00);
    assert_eq!(target.0.borrow().sel, vec![false, true]);
    assert_eq!(sys.read8(HDC_STATUS) & 0x02, 0x02);

    target.assert_req(0);
    sys.bus_mut().scsi_lines_changed();
    sys.write8(HDC_DATA, 0x12);
    let state = target.0.borrow();
    assert_eq!(state.received, vec![0x12]);
    assert_eq!(state.ack, vec![false, true]);
}

#[test]
fn test_network_irq_gated_onto_nmi() {
    let mut sys = system(E01Config::default());
    sys.bus_mut().adlc_irq(true);
    assert!(!sys.bus().nmi_line());

    assert_eq!(sys.read8(NET_IRQ_ENABLE), 0);
    assert!(sys.bus().nmi_line());
    sys.write8(NET_IRQ_DISABLE | 0x03, 0);
    assert!(!sys.bus().nmi_line());

    sys.write8(NET_IRQ_ENABLE, 0);
    sys.bus_mut().adlc_irq(false);
    assert!(!sys.bus().nmi_line());

    // Reset clears the enable latch
    sys.bus_mut().adlc_irq(true);
    assert!(sys.bus().nmi_line());
    sys.reset();
    sys.bus_mut().adlc_irq(true);
    assert!(!sys.bus().nmi_line());
}

#[test]
fn test_rtc_periodic_irq() {
    let mut sys = system(E01Config::default());
    sys.write8(RTC_ADDRESS, 0x0B);
    sys.write8(RTC_DATA, 0x42);
    sys.bus_mut().rtc_periodic_tick();
    assert!(sys.bus().irq_line());

    sys.write8(RTC_ADDRESS, 0x0C);
    assert_eq!(sys.read8(RTC_DATA), 0xC0);
    assert!(!sys.bus().irq_line());
}

#[test]
fn test_rtc_nvram_through_ports() {
    let mut sys = system(E01Config::default());
    sys.write8(RTC_ADDRESS, 0x20);
    sys.write8(RTC_DATA, 0x99);
    sys.write8(RTC_ADDRESS, 0x00);
    sys.write8(RTC_ADDRESS, 0x20);
    assert_eq!(sys.read8(RTC_DATA), 0x99);
    assert_eq!(sys.bus().rtc().nvram()[0x20], 0x99);
}

#[test]
fn test_fdc_drq_drives_nmi() {
    let mut sys = system(E01Config::default());
    sys.bus_mut()
        .insert_disk(0, FloppyImage::blank(Geometry::default()));

    // Drive 0, side 0, MFM, controller out of reset, LED on
    sys.write8(FLOPPY_CONTROL, 0xA2);
    assert!(sys.bus().mode_led());

    sys.write8(FDC_SECTOR, 1);
    sys.write8(FDC_COMMAND, 0x80);
    assert!(sys.bus().nmi_line());
    // INTRQ is not wired to either CPU line
    assert!(!sys.bus().irq_line());

    for _ in 0..512 {
        assert!(sys.bus().nmi_line());
        assert_eq!(sys.read8(FDC_DATA), 0xE5);
    }
    assert!(!sys.bus().nmi_line());
}

#[test]
fn test_fdc_held_in_master_reset() {
    let mut sys = system(E01Config::default());
    sys.bus_mut()
        .insert_disk(0, FloppyImage::blank(Geometry::default()));

    sys.write8(FLOPPY_CONTROL, 0x02);
    sys.write8(FDC_SECTOR, 1);
    sys.write8(FDC_COMMAND, 0x80);
    assert!(!sys.bus().nmi_line());
}

#[test]
fn test_front_flap_and_switch() {
    let mut sys = system(E01Config {
        front_flap_open: false,
        sw3: true,
    });
    assert_eq!(sys.read8(FLAP), 0xBF);
    sys.bus_mut().set_front_flap(true);
    assert_eq!(sys.read8(FLAP), 0xFF);
}

#[test]
fn test_mount_points() {
    let mut sys = system(E01Config::default());
    let ids: Vec<_> = sys.mount_points().into_iter().map(|m| m.id).collect();
    assert_eq!(ids, ["Floppy0", "Floppy1"]);

    let image = vec![0u8; Geometry::default().image_size()];
    sys.mount("Floppy1", &image).unwrap();
    assert!(sys.is_mounted("Floppy1"));
    assert!(sys.mount("Floppy2", &image).is_err());
    sys.unmount("Floppy1").unwrap();
    assert!(!sys.is_mounted("Floppy1"));
}

#[test]
fn test_save_and_load() {
    let mut sys = system(E01Config::default());
    sys.bus_mut()
        .insert_disk(0, FloppyImage::blank(Geometry::default()));
    sys.write8(0x0200, 0x77);
    sys.read8(RAM_SELECT);
    sys.write8(RTC_ADDRESS, 0x30);
    sys.write8(RTC_DATA, 0x31);
    sys.write8(NET_IRQ_ENABLE, 0);
    let state = sys.save_state();

    sys.reset();
    sys.write8(0x0200, 0);
    assert_eq!(sys.read8(0x0200), rom_byte(0x0200));

    sys.load_state(&state).unwrap();
    assert_eq!(sys.read8(0x0200), 0x77);
    sys.write8(RTC_ADDRESS, 0x30);
    assert_eq!(sys.read8(RTC_DATA), 0x31);
    sys.bus_mut().adlc_irq(true);
    assert!(sys.bus().nmi_line());
    assert!(sys.bus().disk(0).is_some());

    assert!(sys
        .load_state(&serde_json::json!({"system": "oric"}))
        .is_err());
}
