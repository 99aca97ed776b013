//! PC080SN tilemap generator: two scrolling layers of 8x8 tiles.
//!
//! RAM is 0x8000 words. In the standard layout each layer is 64x64 tiles of
//! two words, attribute then code, with 256 row scroll words after it:
//!
//! | Words         | Contents            |
//! |---------------|---------------------|
//! | 0x0000-0x1FFF | layer 0 tiles       |
//! | 0x2000-0x20FF | layer 0 row scroll  |
//! | 0x4000-0x5FFF | layer 1 tiles       |
//! | 0x6000-0x60FF | layer 1 row scroll  |
//!
//! The double width layout makes each layer 128x64 with the attributes in
//! the first 0x2000 words and the codes in the next 0x2000, leaving no room
//! for row scroll.
//!
//! Attribute: bit 15 flip y, bit 14 flip x, bits 0-8 color. Code: bits 0-13.

use emu_core::graphics::{GfxElement, Rect, Screen, TileInfo, TilemapLayer};
use emu_core::logging::{log, LogCategory, LogLevel};
use serde::{Deserialize, Serialize};

use crate::{combine, TaitoError, TilemapChip};

const RAM_WORDS: usize = 0x8000;
const LAYER_WORDS: usize = 0x4000;
const ROW_SCROLL: usize = 0x2000;
/// Lines with their own row scroll entry.
const SCROLL_LINES: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Pc080snConfig {
    /// Machine graphics set holding the tiles.
    pub gfx: usize,
    /// Added to the layer scroll, in pixels.
    pub x_offset: i32,
    pub y_offset: i32,
    /// Y scroll registers count the other way.
    pub y_invert: bool,
    pub double_width: bool,
}

impl Pc080snConfig {
    pub fn from_json(text: &str) -> Result<Self, TaitoError> {
        Ok(serde_json::from_str(text)?)
    }
}

pub struct Pc080sn {
    config: Pc080snConfig,
    ram: Vec<u16>,
    ctrl: [u16; 8],
    scrollx: [i32; 2],
    scrolly: [i32; 2],
    layers: [TilemapLayer; 2],
}

impl Pc080sn {
    pub fn new(config: Pc080snConfig) -> Self {
        let cols = if config.double_width { 128 } else { 64 };
        let layer = || {
            let mut layer = TilemapLayer::new(cols, 64, 8, 8);
            if !config.double_width {
                layer.set_scroll_rows(64 * 8);
            }
            layer
        };
        Self {
            config,
            ram: vec![0; RAM_WORDS],
            ctrl: [0; 8],
            scrollx: [0; 2],
            scrolly: [0; 2],
            layers: [layer(), layer()],
        }
    }

    pub fn config(&self) -> &Pc080snConfig {
        &self.config
    }

    pub fn read16(&self, offset: u32) -> u16 {
        self.ram[offset as usize % RAM_WORDS]
    }

    pub fn write16(&mut self, offset: u32, data: u16, mem_mask: u16) {
        let word = &mut self.ram[offset as usize % RAM_WORDS];
        *word = combine(*word, data, mem_mask);
    }

    /// X scroll of layer `offset`, stored negated.
    pub fn xscroll_write16(&mut self, offset: u32, data: u16, mem_mask: u16) {
        let index = offset as usize & 1;
        self.ctrl[index] = combine(self.ctrl[index], data, mem_mask);
        self.scrollx[index] = -i32::from(self.ctrl[index]);
    }

    pub fn yscroll_write16(&mut self, offset: u32, data: u16, mem_mask: u16) {
        let index = offset as usize & 1;
        self.ctrl[index + 2] = combine(self.ctrl[index + 2], data, mem_mask);
        let mut value = self.ctrl[index + 2];
        if self.config.y_invert {
            value = value.wrapping_neg();
        }
        self.scrolly[index] = -i32::from(value);
    }

    /// Control word 0 bit 0 flips the screen; the rest are unused.
    pub fn ctrl_write16(&mut self, offset: u32, data: u16, mem_mask: u16) {
        let index = (offset as usize & 3) + 4;
        self.ctrl[index] = combine(self.ctrl[index], data, mem_mask);
        match index {
            4 => {
                let flip = self.ctrl[4] & 0x01 != 0;
                for layer in &mut self.layers {
                    layer.set_flip(flip, flip);
                }
            }
            _ => log(LogCategory::Video, LogLevel::Debug, || {
                format!("PC080SN: control word {} = {:#06x}", index - 4, self.ctrl[index])
            }),
        }
    }

    /// Override the scroll registers, for boards that latch them elsewhere.
    pub fn set_scroll(&mut self, layer: usize, scrollx: i32, scrolly: i32) {
        if layer < 2 {
            self.scrollx[layer] = scrollx;
            self.scrolly[layer] = scrolly;
        }
    }

    pub fn set_transparent_pen(&mut self, layer: usize, pen: Option<u8>) {
        if let Some(layer) = self.layers.get_mut(layer) {
            layer.set_transparent_pen(pen);
        }
    }

    /// [`TilemapChip::draw`] with an extra scroll offset for this draw only.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_offset(
        &self,
        screen: &mut Screen,
        clip: &Rect,
        layer: usize,
        flags: u32,
        priority: u8,
        dx: i32,
        dy: i32,
    ) {
        if let Some(layer) = self.layers.get(layer) {
            layer.draw_offset(screen, clip, flags, priority, dx, dy);
        }
    }

    fn tile(&self, layer: usize, index: usize) -> TileInfo {
        let base = layer * LAYER_WORDS;
        let (attr, code) = if self.config.double_width {
            (self.ram[base + index], self.ram[base + index + ROW_SCROLL])
        } else {
            (self.ram[base + 2 * index], self.ram[base + 2 * index + 1])
        };
        TileInfo {
            gfx: self.config.gfx,
            code: u32::from(code & 0x3FFF),
            color: u32::from(attr & 0x01FF),
            flipx: attr & 0x4000 != 0,
            flipy: attr & 0x8000 != 0,
        }
    }
}

impl TilemapChip for Pc080sn {
    fn name(&self) -> &'static str {
        "PC080SN"
    }

    fn gfx_sets(&self) -> Vec<usize> {
        vec![self.config.gfx]
    }

    fn layer_count(&self) -> usize {
        2
    }

    fn tilemap_update(&mut self, gfx: &[GfxElement]) {
        for layer in 0..2 {
            let cells = self.layers[layer].cols() * self.layers[layer].rows();
            for index in 0..cells {
                let info = self.tile(layer, index);
                self.layers[layer].set_tile(index, info);
            }

            let scrollx = self.scrollx[layer] + self.config.x_offset;
            let scrolly = self.scrolly[layer] + self.config.y_offset;
            let tiles = &mut self.layers[layer];
            tiles.set_scrolly(0, scrolly);
            if self.config.double_width {
                tiles.set_scrollx(0, scrollx);
            } else {
                let height = tiles.height() as i32;
                let row_scroll = &self.ram[layer * LAYER_WORDS + ROW_SCROLL..];
                for row in 0..tiles.height() {
                    tiles.set_scrollx(row, scrollx);
                }
                for (line, &shift) in row_scroll.iter().take(SCROLL_LINES).enumerate() {
                    let row = (line as i32 + scrolly).rem_euclid(height) as usize;
                    tiles.set_scrollx(row, scrollx - i32::from(shift));
                }
            }
            tiles.update(gfx);
        }
    }

    fn draw(&self, screen: &mut Screen, clip: &Rect, layer: usize, flags: u32, priority: u8) {
        self.draw_offset(screen, clip, layer, flags, priority, 0, 0);
    }
}
