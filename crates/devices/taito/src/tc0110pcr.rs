//! TC0110PCR palette controller.
//!
//! 0x1000 color words behind an address register (offset 0) and a data
//! register (offset 1). Every data write also converts the word to ARGB in
//! the machine palette at `palette_offset + address`.

use emu_core::graphics::{ColorOps, IndexedPalette};
use emu_core::logging::{log, LogCategory, LogLevel};
use serde::{Deserialize, Serialize};

use crate::combine;

const RAM_WORDS: usize = 0x1000;

/// How the address register and color words are laid out on a given board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaletteFormat {
    /// Address written in steps of two, colors `xBBBBBGGGGGRRRRR`.
    Step2,
    /// Address in steps of one, colors `xBBBBBGGGGGRRRRR`.
    Step1,
    /// Address in steps of one, colors `xRRRRRGGGGGBBBBB`.
    Step1RbSwap,
    /// Address in steps of one, four bits per gun, red lowest.
    Step1FourBit,
}

impl PaletteFormat {
    fn address(self, data: u16) -> u16 {
        match self {
            PaletteFormat::Step2 => (data >> 1) & 0x0FFF,
            _ => data & 0x0FFF,
        }
    }

    fn to_argb(self, word: u16) -> u32 {
        match self {
            PaletteFormat::Step2 | PaletteFormat::Step1 => ColorOps::from_xbgr555(word),
            PaletteFormat::Step1RbSwap => ColorOps::from_xrgb555(word),
            PaletteFormat::Step1FourBit => ColorOps::from_rgb(
                ColorOps::pal4bit(word),
                ColorOps::pal4bit(word >> 4),
                ColorOps::pal4bit(word >> 8),
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tc0110pcr {
    format: PaletteFormat,
    palette_offset: usize,
    addr: u16,
    addr_latch: u16,
    ram: Vec<u16>,
}

impl Tc0110pcr {
    pub fn new(format: PaletteFormat, palette_offset: usize) -> Self {
        Self {
            format,
            palette_offset,
            addr: 0,
            addr_latch: 0,
            ram: vec![0; RAM_WORDS],
        }
    }

    pub fn format(&self) -> PaletteFormat {
        self.format
    }

    pub fn address(&self) -> u16 {
        self.addr
    }

    pub fn color_word(&self, index: usize) -> u16 {
        self.ram[index % RAM_WORDS]
    }

    pub fn read16(&self, offset: u32) -> u16 {
        match offset {
            1 => self.ram[usize::from(self.addr)],
            _ => {
                log(LogCategory::Video, LogLevel::Warn, || {
                    format!("TC0110PCR: read from offset {offset}")
                });
                0x00FF
            }
        }
    }

    pub fn write16<P: IndexedPalette + ?Sized>(&mut self, offset: u32, data: u16, mem_mask: u16, palette: &mut P) {
        match offset {
            0 => {
                self.addr_latch = combine(self.addr_latch, data, mem_mask);
                self.addr = self.format.address(self.addr_latch);
            }
            1 => {
                let index = usize::from(self.addr);
                self.ram[index] = combine(self.ram[index], data, mem_mask);
                palette.set_color(self.palette_offset + index, self.format.to_argb(self.ram[index]));
            }
            _ => log(LogCategory::Video, LogLevel::Warn, || {
                format!("TC0110PCR: write {data:#06x} to offset {offset}")
            }),
        }
    }

    /// Push every stored color to the palette, after a state load.
    pub fn restore_palette<P: IndexedPalette + ?Sized>(&self, palette: &mut P) {
        for (index, &word) in self.ram.iter().enumerate() {
            palette.set_color(self.palette_offset + index, self.format.to_argb(word));
        }
    }
}
