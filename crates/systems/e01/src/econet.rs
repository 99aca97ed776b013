//! Econet module socket.
//!
//! The MC6854 ADLC and the network behind it are not part of the board. The
//! board decodes its four registers at 0xFC20 and gates its interrupt onto
//! NMI through the network interrupt enable latch.

use emu_core::lines::Disconnected;

pub trait Adlc {
    fn read(&mut self, offset: u8) -> u8;
    fn write(&mut self, offset: u8, data: u8);
}

/// Empty socket.
impl Adlc for Disconnected {
    fn read(&mut self, _offset: u8) -> u8 {
        0xFF
    }

    fn write(&mut self, _offset: u8, _data: u8) {}
}
