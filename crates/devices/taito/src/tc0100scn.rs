//! TC0100SCN tilemap generator.
//!
//! Two 8x8 tile layers (bg and fg) plus a text layer whose 256 2bpp
//! characters live in chip RAM. Control word 6 bit 4 switches between the
//! standard and double width RAM layouts:
//!
//! | Contents      | Standard (words) | Double width (words) |
//! |---------------|------------------|----------------------|
//! | bg tiles      | 0x0000           | 0x0000               |
//! | text tiles    | 0x2000           | 0x9000               |
//! | characters    | 0x3000           | 0x8800               |
//! | fg tiles      | 0x4000           | 0x4000               |
//! | bg row scroll | 0x6000           | 0x8000               |
//! | fg row scroll | 0x6200           | 0x8200               |
//! | fg col scroll | 0x7000           | 0x8400               |
//!
//! Tile layers are 64x64 (128x64 double width), two words per tile:
//! attribute (flip y, flip x, color in bits 0-7) then code. Text tiles are one word:
//! flip y, flip x, color in bits 8-13, character in bits 0-7.
//!
//! Control words 0-5 are the bg, fg and text x scrolls then y scrolls, all
//! stored negated. Word 6 bits 0-2 disable the bg, fg and text layers, word 7
//! bit 0 flips the screen and bit 3 puts fg at the bottom.

use emu_core::graphics::{GfxElement, Interleaved2Bpp, Rect, Screen, TileInfo, TilemapLayer};
use emu_core::logging::{log, LogCategory, LogLevel};
use serde::{Deserialize, Serialize};

use crate::{combine, split32, word_bytes, TaitoError, TilemapChip};

const RAM_WORDS: usize = 0xA000;
const CHAR_COUNT: usize = 256;
const CHAR_WORDS: usize = 8;
const SCROLL_LINES: usize = 256;

/// Layer numbers for [`TilemapChip::draw`].
pub const LAYER_BG: usize = 0;
pub const LAYER_FG: usize = 1;
pub const LAYER_TEXT: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Layout {
    bg: usize,
    fg: usize,
    text: usize,
    chars: usize,
    bg_scroll: usize,
    fg_scroll: usize,
    fg_colscroll: usize,
}

const STANDARD: Layout = Layout {
    bg: 0x0000,
    fg: 0x4000,
    text: 0x2000,
    chars: 0x3000,
    bg_scroll: 0x6000,
    fg_scroll: 0x6200,
    fg_colscroll: 0x7000,
};

const DOUBLE_WIDTH: Layout = Layout {
    bg: 0x0000,
    fg: 0x4000,
    text: 0x9000,
    chars: 0x8800,
    bg_scroll: 0x8000,
    fg_scroll: 0x8200,
    fg_colscroll: 0x8400,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Tc0100scnConfig {
    pub gfx: usize,
    pub x_offset: i32,
    pub y_offset: i32,
    /// Extra offsets for the tile layers while the screen is flipped.
    pub flip_x_offset: i32,
    pub flip_y_offset: i32,
    /// Extra offsets for the text layer while the screen is flipped.
    pub flip_text_x_offset: i32,
    pub flip_text_y_offset: i32,
}

impl Tc0100scnConfig {
    pub fn from_json(text: &str) -> Result<Self, TaitoError> {
        Ok(serde_json::from_str(text)?)
    }
}

pub struct Tc0100scn {
    config: Tc0100scnConfig,
    ram: Vec<u16>,
    ctrl: [u16; 8],
    double_width: bool,
    /// bg, fg, text
    layers: [TilemapLayer; 3],
    chars: GfxElement,
    chars_dirty: bool,
    colbanks: [u32; 3],
    tile_mask: u16,
    gfx_bank: u16,
    colscroll_logged: bool,
}

fn build_layers(double_width: bool) -> [TilemapLayer; 3] {
    let (cols, text_cols, text_rows) = if double_width { (128, 128, 32) } else { (64, 64, 64) };
    let tile_layer = || {
        let mut layer = TilemapLayer::new(cols, 64, 8, 8);
        layer.set_scroll_rows(64 * 8);
        layer
    };
    [tile_layer(), tile_layer(), TilemapLayer::new(text_cols, text_rows, 8, 8)]
}

impl Tc0100scn {
    pub fn new(config: Tc0100scnConfig) -> Self {
        Self {
            config,
            ram: vec![0; RAM_WORDS],
            ctrl: [0; 8],
            double_width: false,
            layers: build_layers(false),
            chars: GfxElement::new(8, 8, 4, CHAR_COUNT),
            chars_dirty: true,
            colbanks: [0; 3],
            tile_mask: 0xFFFF,
            gfx_bank: 0,
            colscroll_logged: false,
        }
    }

    fn layout(&self) -> &'static Layout {
        if self.double_width {
            &DOUBLE_WIDTH
        } else {
            &STANDARD
        }
    }

    pub fn read16(&self, offset: u32) -> u16 {
        self.ram[offset as usize % RAM_WORDS]
    }

    pub fn write16(&mut self, offset: u32, data: u16, mem_mask: u16) {
        let offset = offset as usize % RAM_WORDS;
        self.ram[offset] = combine(self.ram[offset], data, mem_mask);

        let layout = self.layout();
        if (layout.chars..layout.chars + CHAR_COUNT * CHAR_WORDS).contains(&offset) {
            self.chars_dirty = true;
        } else if (layout.fg_colscroll..layout.fg_colscroll + 0x100).contains(&offset)
            && !self.colscroll_logged
        {
            self.colscroll_logged = true;
            log(LogCategory::Stubs, LogLevel::Info, || {
                "TC0100SCN: fg column scroll not emulated".to_string()
            });
        }
    }

    pub fn read32(&self, offset: u32) -> u32 {
        (u32::from(self.read16(offset * 2)) << 16) | u32::from(self.read16(offset * 2 + 1))
    }

    pub fn write32(&mut self, offset: u32, data: u32, mem_mask: u32) {
        for (i, (word, mask)) in split32(data, mem_mask).into_iter().enumerate() {
            if mask != 0 {
                self.write16(offset * 2 + i as u32, word, mask);
            }
        }
    }

    pub fn ctrl_read16(&self, offset: u32) -> u16 {
        self.ctrl[offset as usize & 7]
    }

    pub fn ctrl_write16(&mut self, offset: u32, data: u16, mem_mask: u16) {
        let index = offset as usize & 7;
        self.ctrl[index] = combine(self.ctrl[index], data, mem_mask);
        match index {
            6 => {
                let double_width = self.ctrl[6] & 0x10 != 0;
                if double_width != self.double_width {
                    log(LogCategory::Video, LogLevel::Debug, || {
                        format!("TC0100SCN: double width {}", double_width)
                    });
                    self.double_width = double_width;
                    self.layers = build_layers(double_width);
                    self.chars_dirty = true;
                }
            }
            7 => {
                let flip = self.ctrl[7] & 0x01 != 0;
                for layer in &mut self.layers {
                    layer.set_flip(flip, flip);
                }
            }
            _ => {}
        }
    }

    pub fn ctrl_read32(&self, offset: u32) -> u32 {
        (u32::from(self.ctrl_read16(offset * 2)) << 16) | u32::from(self.ctrl_read16(offset * 2 + 1))
    }

    pub fn ctrl_write32(&mut self, offset: u32, data: u32, mem_mask: u32) {
        for (i, (word, mask)) in split32(data, mem_mask).into_iter().enumerate() {
            if mask != 0 {
                self.ctrl_write16(offset * 2 + i as u32, word, mask);
            }
        }
    }

    /// Color banks added to the bg, fg and text colors.
    pub fn set_colbanks(&mut self, bg: u32, fg: u32, text: u32) {
        self.colbanks = [bg, fg, text];
    }

    pub fn set_colbank(&mut self, bank: u32) {
        self.colbanks = [bank; 3];
    }

    /// Mask applied to tile codes, for boards with fewer address lines.
    pub fn set_tile_mask(&mut self, mask: u16) {
        self.tile_mask = mask;
    }

    /// Tile graphics bank select, bits 0-2.
    pub fn gfx_bank_write16(&mut self, data: u16) {
        self.gfx_bank = data & 0x07;
    }

    pub fn is_double_width(&self) -> bool {
        self.double_width
    }

    /// Layer drawn first of bg (0) and fg (1).
    pub fn bottom_layer(&self) -> usize {
        usize::from((self.ctrl[7] & 0x08) >> 3)
    }

    /// Draw order, bottom first. Text is always on top.
    pub fn layer_order(&self) -> [usize; 3] {
        let bottom = self.bottom_layer();
        [bottom, bottom ^ 1, LAYER_TEXT]
    }

    pub fn is_layer_enabled(&self, layer: usize) -> bool {
        layer < 3 && self.ctrl[6] & (1 << layer) == 0
    }

    fn scroll(&self, index: usize) -> i32 {
        -i32::from(self.ctrl[index])
    }

    fn tile_info(&self, layer: usize, index: usize) -> TileInfo {
        let layout = self.layout();
        if layer == LAYER_TEXT {
            let attr = self.ram[layout.text + index];
            return TileInfo {
                gfx: 0,
                code: u32::from(attr & 0x00FF),
                color: u32::from((attr & 0x3F00) >> 8) + self.colbanks[2],
                flipx: attr & 0x4000 != 0,
                flipy: attr & 0x8000 != 0,
            };
        }
        let base = if layer == LAYER_BG { layout.bg } else { layout.fg };
        let attr = self.ram[base + 2 * index];
        let code = u32::from(self.ram[base + 2 * index + 1] & self.tile_mask) + (u32::from(self.gfx_bank) << 15);
        TileInfo {
            gfx: self.config.gfx,
            code,
            color: u32::from(attr & 0x00FF) + self.colbanks[layer],
            flipx: attr & 0x4000 != 0,
            flipy: attr & 0x8000 != 0,
        }
    }
}

impl TilemapChip for Tc0100scn {
    fn name(&self) -> &'static str {
        "TC0100SCN"
    }

    fn gfx_sets(&self) -> Vec<usize> {
        vec![self.config.gfx]
    }

    fn layer_count(&self) -> usize {
        3
    }

    fn tilemap_update(&mut self, gfx: &[GfxElement]) {
        let layout = *self.layout();
        if std::mem::take(&mut self.chars_dirty) {
            let bytes = word_bytes(&self.ram[layout.chars..layout.chars + CHAR_COUNT * CHAR_WORDS]);
            self.chars = GfxElement::decode(&Interleaved2Bpp, &bytes, 4);
            self.layers[LAYER_TEXT].mark_all_dirty();
        }

        for layer in 0..3 {
            let cells = self.layers[layer].cols() * self.layers[layer].rows();
            for index in 0..cells {
                let info = self.tile_info(layer, index);
                self.layers[layer].set_tile(index, info);
            }
        }

        let flip = self.ctrl[7] & 0x01 != 0;
        let (dx, dy) = if flip {
            (
                self.config.x_offset + self.config.flip_x_offset,
                self.config.y_offset + self.config.flip_y_offset,
            )
        } else {
            (self.config.x_offset, self.config.y_offset)
        };

        for (layer, scroll_base) in [(LAYER_BG, layout.bg_scroll), (LAYER_FG, layout.fg_scroll)] {
            let scrollx = self.scroll(layer) + dx;
            let scrolly = self.scroll(layer + 3) + dy;
            let tiles = &mut self.layers[layer];
            let height = tiles.height() as i32;
            tiles.set_scrolly(0, scrolly);
            for row in 0..tiles.height() {
                tiles.set_scrollx(row, scrollx);
            }
            for (line, &shift) in self.ram[scroll_base..scroll_base + SCROLL_LINES].iter().enumerate() {
                let row = (line as i32 + scrolly).rem_euclid(height) as usize;
                tiles.set_scrollx(row, scrollx - i32::from(shift));
            }
            tiles.update(gfx);
        }

        let (tdx, tdy) = if flip {
            (
                self.config.x_offset + self.config.flip_text_x_offset,
                self.config.y_offset + self.config.flip_text_y_offset,
            )
        } else {
            (self.config.x_offset, self.config.y_offset)
        };
        let text = &mut self.layers[LAYER_TEXT];
        text.set_scrollx(0, -i32::from(self.ctrl[2]) + tdx);
        text.set_scrolly(0, -i32::from(self.ctrl[5]) + tdy);
        text.update(std::slice::from_ref(&self.chars));
    }

    fn draw(&self, screen: &mut Screen, clip: &Rect, layer: usize, flags: u32, priority: u8) {
        if self.is_layer_enabled(layer) {
            self.layers[layer].draw(screen, clip, flags, priority);
        }
    }
}
