//! TC0480SCP tilemap generator.
//!
//! Four 16x16 tile layers with per-layer zoom and row scroll, and on layers 2
//! and 3 a per-line source row offset ("column scroll") and row zoom, plus a
//! text layer of 4bpp characters held in chip RAM.
//!
//! | Contents          | Standard (words) | Double width (words) |
//! |-------------------|------------------|----------------------|
//! | bg layer n tiles  | 0x0800 * n       | 0x1000 * n           |
//! | row scroll        | 0x2000 + 0x200 n | 0x4000 + 0x200 n     |
//! | row scroll, low   | 0x2800 + 0x200 n | 0x4800 + 0x200 n     |
//! | row zoom          | 0x3000 + 0x200 n | 0x5000 + 0x200 n     |
//! | column scroll     | 0x3800 + 0x200 n | 0x5800 + 0x200 n     |
//! | text tiles        | 0x6000           | 0x6000               |
//! | characters        | 0x7000           | 0x7000               |
//!
//! Control words:
//!
//! - 0x00-0x03: bg x scroll, negated unless the screen is flipped
//! - 0x04-0x07: bg y scroll, negated while flipped
//! - 0x08-0x0B: bg zoom, x in the high byte (0 = none, expansion only),
//!   y in the low byte (0x7F = none)
//! - 0x0C, 0x0D: text x and y scroll
//! - 0x0F: bit 7 double width, bit 6 flip, bits 2-4 layer order, bits 0-1
//!   row zoom enable for layers 2 and 3
//! - 0x10-0x13, 0x14-0x17: bg x and y sub-pixel scroll

use emu_core::graphics::{GfxElement, Packed4Bpp, Rect, Scanline, Screen, TileInfo, TilemapLayer};
use emu_core::logging::{log, LogCategory, LogLevel};
use serde::{Deserialize, Serialize};

use crate::{combine, split32, word_bytes, TaitoError, TilemapChip};

const RAM_WORDS: usize = 0x8000;
const CTRL_WORDS: usize = 0x18;
const TEXT: usize = 0x6000;
const CHARS: usize = 0x7000;
const CHAR_COUNT: usize = 256;
const CHAR_WORDS: usize = 16;
const LINE_WORDS: usize = 0x200;
const NO_ZOOM: u16 = 0x007F;

pub const LAYER_TEXT: usize = 4;

/// Draw order of the four bg layers, indexed by control word 0x0F bits 2-4.
/// The most significant nibble is the bottom layer.
pub const PRIORITY_ORDERS: [u16; 8] = [0x0123, 0x1230, 0x2301, 0x3012, 0x3210, 0x2103, 0x1032, 0x0321];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Tc0480scpConfig {
    pub gfx: usize,
    pub x_offset: i32,
    pub y_offset: i32,
    pub text_x_offset: i32,
    pub text_y_offset: i32,
    /// Extra offsets while the screen is flipped.
    pub flip_x_offset: i32,
    pub flip_y_offset: i32,
    /// Added to every tile and text color.
    pub col_base: u32,
}

impl Tc0480scpConfig {
    pub fn from_json(text: &str) -> Result<Self, TaitoError> {
        Ok(serde_json::from_str(text)?)
    }
}

#[derive(Debug, Clone, Copy)]
struct Layout {
    tiles: usize,
    line_ram: usize,
}

impl Layout {
    fn new(double_width: bool) -> Self {
        if double_width {
            Self {
                tiles: 0x1000,
                line_ram: 0x4000,
            }
        } else {
            Self {
                tiles: 0x0800,
                line_ram: 0x2000,
            }
        }
    }

    fn tiles(&self, layer: usize) -> usize {
        self.tiles * layer
    }

    fn row_scroll(&self, layer: usize) -> usize {
        self.line_ram + LINE_WORDS * layer
    }

    fn row_scroll_low(&self, layer: usize) -> usize {
        self.line_ram + 0x800 + LINE_WORDS * layer
    }

    fn row_zoom(&self, layer: usize) -> usize {
        self.line_ram + 0x1000 + LINE_WORDS * layer
    }

    fn column_scroll(&self, layer: usize) -> usize {
        self.line_ram + 0x1800 + LINE_WORDS * layer
    }
}

pub struct Tc0480scp {
    config: Tc0480scpConfig,
    ram: Vec<u16>,
    ctrl: [u16; CTRL_WORDS],
    pri_reg: u16,
    scrollx: [i32; 4],
    scrolly: [i32; 4],
    text_scroll: (i32, i32),
    layers: [TilemapLayer; 5],
    chars: GfxElement,
    chars_dirty: bool,
}

fn build_layers(double_width: bool) -> [TilemapLayer; 5] {
    let cols = if double_width { 64 } else { 32 };
    let bg = || {
        let mut layer = TilemapLayer::new(cols, 32, 16, 16);
        layer.set_scroll_rows(32 * 16);
        layer
    };
    [bg(), bg(), bg(), bg(), TilemapLayer::new(64, 64, 8, 8)]
}

impl Tc0480scp {
    pub fn new(config: Tc0480scpConfig) -> Self {
        let mut ctrl = [0; CTRL_WORDS];
        ctrl[0x08..0x0C].fill(NO_ZOOM);
        Self {
            config,
            ram: vec![0; RAM_WORDS],
            ctrl,
            pri_reg: 0,
            scrollx: [0; 4],
            scrolly: [0; 4],
            text_scroll: (0, 0),
            layers: build_layers(false),
            chars: GfxElement::new(8, 8, 16, CHAR_COUNT),
            chars_dirty: true,
        }
    }

    fn double_width(&self) -> bool {
        self.pri_reg & 0x80 != 0
    }

    fn flipped(&self) -> bool {
        self.pri_reg & 0x40 != 0
    }

    fn layout(&self) -> Layout {
        Layout::new(self.double_width())
    }

    pub fn read16(&self, offset: u32) -> u16 {
        self.ram[offset as usize % RAM_WORDS]
    }

    pub fn write16(&mut self, offset: u32, data: u16, mem_mask: u16) {
        let offset = offset as usize % RAM_WORDS;
        self.ram[offset] = combine(self.ram[offset], data, mem_mask);
        if (CHARS..CHARS + CHAR_COUNT * CHAR_WORDS).contains(&offset) {
            self.chars_dirty = true;
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
        self.ctrl[offset as usize % CTRL_WORDS]
    }

    pub fn ctrl_write16(&mut self, offset: u32, data: u16, mem_mask: u16) {
        let index = offset as usize % CTRL_WORDS;
        self.ctrl[index] = combine(self.ctrl[index], data, mem_mask);
        let value = i32::from(self.ctrl[index]);
        let flip = self.flipped();

        match index {
            0x00..=0x03 => self.scrollx[index] = if flip { value } else { -value },
            0x04..=0x07 => self.scrolly[index - 4] = if flip { -value } else { value },
            0x0C => self.text_scroll.0 = if flip { value } else { -value },
            0x0D => self.text_scroll.1 = if flip { -value } else { value },
            0x0F => {
                let was_double = self.double_width();
                self.pri_reg = self.ctrl[index];
                let flip = self.flipped();
                if self.double_width() != was_double {
                    log(LogCategory::Video, LogLevel::Debug, || {
                        format!("TC0480SCP: double width {}", !was_double)
                    });
                    self.layers = build_layers(!was_double);
                }
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

    /// Draw order of the bg layers as four nibbles, bottom layer first.
    pub fn bg_priority(&self) -> u16 {
        PRIORITY_ORDERS[usize::from((self.pri_reg & 0x1C) >> 2)]
    }

    /// [`bg_priority`](Self::bg_priority) as layer numbers, bottom first.
    pub fn layer_order(&self) -> [usize; 4] {
        let order = self.bg_priority();
        [12, 8, 4, 0].map(|shift| usize::from((order >> shift) & 0x0F))
    }

    /// Raw control register, for boards that mix sprites against it.
    pub fn pri_reg(&self) -> u16 {
        self.pri_reg
    }

    fn offsets(&self) -> (i32, i32) {
        if self.flipped() {
            (
                self.config.x_offset + self.config.flip_x_offset,
                self.config.y_offset + self.config.flip_y_offset,
            )
        } else {
            (self.config.x_offset, self.config.y_offset)
        }
    }

    fn zoomed(&self, layer: usize) -> bool {
        self.ctrl[0x08 + layer] != NO_ZOOM
    }

    fn tile_info(&self, layer: usize, index: usize) -> TileInfo {
        if layer == LAYER_TEXT {
            let attr = self.ram[TEXT + index];
            return TileInfo {
                gfx: 0,
                code: u32::from(attr & 0x00FF),
                color: u32::from((attr & 0x3F00) >> 8) + self.config.col_base,
                flipx: attr & 0x4000 != 0,
                flipy: attr & 0x8000 != 0,
            };
        }
        let base = self.layout().tiles(layer);
        let attr = self.ram[base + 2 * index];
        TileInfo {
            gfx: self.config.gfx,
            code: u32::from(self.ram[base + 2 * index + 1] & 0x7FFF),
            color: u32::from(attr & 0x00FF) + self.config.col_base,
            flipx: attr & 0x4000 != 0,
            flipy: attr & 0x8000 != 0,
        }
    }

    /// Source position of screen line `y` for the line-by-line renderer.
    fn scanline(&self, layer: usize, y: i32) -> Scanline {
        let layout = self.layout();
        let (dx, dy) = self.offsets();
        let zoom = self.ctrl[0x08 + layer];
        let zoom_x = 0x10000 - i32::from(zoom & 0xFF00);
        let zoom_y = 0x10000 - (i32::from(zoom & 0x00FF) - 0x7F) * 512;
        let stagger = 15 + 4 * layer as i32;

        let y_index = (self.scrolly[layer] << 16)
            + (i32::from(self.ctrl[0x14 + layer] & 0xFF) << 8)
            + (y + dy) * zoom_y;
        let mut row = (y_index >> 16).rem_euclid(LINE_WORDS as i32) as usize;
        if layer >= 2 {
            let shift = self.ram[layout.column_scroll(layer) + (y as usize & (LINE_WORDS - 1))];
            row = (row + usize::from(shift)) & (LINE_WORDS - 1);
        }

        let mut step_x = zoom_x;
        if layer >= 2 && self.pri_reg & (layer as u16 - 1) != 0 {
            step_x -= i32::from(self.ram[layout.row_zoom(layer) + row] & 0xFF) << 8;
        }

        let start_x = ((self.scrollx[layer] + stagger) << 16)
            + (i32::from(self.ctrl[0x10 + layer] & 0xFF) << 8)
            + (dx - stagger) * zoom_x
            - (i32::from(self.ram[layout.row_scroll(layer) + row]) << 16)
            - ((i32::from(self.ram[layout.row_scroll_low(layer) + row]) << 8) & 0xFFFF);

        Scanline {
            start_x,
            step_x,
            y: row as i32,
        }
    }
}

impl TilemapChip for Tc0480scp {
    fn name(&self) -> &'static str {
        "TC0480SCP"
    }

    fn gfx_sets(&self) -> Vec<usize> {
        vec![self.config.gfx]
    }

    fn layer_count(&self) -> usize {
        5
    }

    fn tilemap_update(&mut self, gfx: &[GfxElement]) {
        if std::mem::take(&mut self.chars_dirty) {
            let bytes = word_bytes(&self.ram[CHARS..CHARS + CHAR_COUNT * CHAR_WORDS]);
            self.chars = GfxElement::decode(&Packed4Bpp::TILE_8X8, &bytes, 16);
            self.layers[LAYER_TEXT].mark_all_dirty();
        }

        for layer in 0..5 {
            let cells = self.layers[layer].cols() * self.layers[layer].rows();
            for index in 0..cells {
                let info = self.tile_info(layer, index);
                self.layers[layer].set_tile(index, info);
            }
        }

        let layout = self.layout();
        let (dx, dy) = self.offsets();
        let flip = self.flipped();
        for layer in 0..4 {
            let zoomed = self.zoomed(layer);
            let scrollx = self.scrollx[layer] + dx;
            let tiles = &mut self.layers[layer];
            tiles.set_scrolly(0, self.scrolly[layer] + dy);
            let row_scroll = &self.ram[layout.row_scroll(layer)..layout.row_scroll(layer) + LINE_WORDS];
            for (row, &shift) in row_scroll.iter().enumerate() {
                let shift = if zoomed { 0 } else { i32::from(shift) };
                tiles.set_scrollx(row, if flip { scrollx + shift } else { scrollx - shift });
            }
            tiles.update(gfx);
        }

        let text = &mut self.layers[LAYER_TEXT];
        text.set_scrollx(0, self.text_scroll.0 + self.config.text_x_offset);
        text.set_scrolly(0, self.text_scroll.1 + self.config.text_y_offset);
        text.update(std::slice::from_ref(&self.chars));
    }

    /// Layers 0-3 are the bg layers, 4 is text. Layers 0 and 1 take the
    /// plain scroll path unless zoomed; 2 and 3 are always drawn line by line.
    fn draw(&self, screen: &mut Screen, clip: &Rect, layer: usize, flags: u32, priority: u8) {
        match layer {
            0 | 1 if !self.zoomed(layer) => self.layers[layer].draw(screen, clip, flags, priority),
            0..=3 => self.layers[layer].draw_scanlines(screen, clip, flags, priority, |y| self.scanline(layer, y)),
            LAYER_TEXT => self.layers[LAYER_TEXT].draw(screen, clip, flags, priority),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emu_core::graphics::DRAW_OPAQUE;

    fn gfx() -> Vec<GfxElement> {
        let data: Vec<u8> = (0..16u8)
            .flat_map(|n| std::iter::repeat(n | (n << 4)).take(128))
            .collect();
        vec![GfxElement::decode(&Packed4Bpp::TILE_16X16, &data, 16)]
    }

    fn put(chip: &mut Tc0480scp, layer: usize, col: usize, row: usize, code: u16) {
        let index = layer * 0x800 + (row * 32 + col) * 2;
        chip.write16(index as u32 + 1, code, 0xFFFF);
    }

    #[test]
    fn test_priority_order_lookup() {
        let mut chip = Tc0480scp::new(Tc0480scpConfig::default());
        for (index, &order) in PRIORITY_ORDERS.iter().enumerate() {
            chip.ctrl_write16(0x0F, (index as u16) << 2, 0xFFFF);
            assert_eq!(chip.bg_priority(), order);
        }
        chip.ctrl_write16(0x0F, 0x00, 0xFFFF);
        assert_eq!(chip.layer_order(), [0, 1, 2, 3]);
        chip.ctrl_write16(0x0F, 0x10, 0xFFFF);
        assert_eq!(chip.layer_order(), [3, 2, 1, 0]);
        // Other bits do not disturb the order
        chip.ctrl_write16(0x0F, 0x63, 0xFFFF);
        assert_eq!(chip.bg_priority(), 0x0123);
    }

    #[test]
    fn test_scroll_sign_follows_flip() {
        let mut chip = Tc0480scp::new(Tc0480scpConfig::default());
        chip.ctrl_write16(0x00, 8, 0xFFFF);
        chip.ctrl_write16(0x04, 8, 0xFFFF);
        assert_eq!((chip.scrollx[0], chip.scrolly[0]), (-8, 8));

        chip.ctrl_write16(0x0F, 0x40, 0xFFFF);
        chip.ctrl_write16(0x00, 8, 0xFFFF);
        chip.ctrl_write16(0x04, 8, 0xFFFF);
        assert_eq!((chip.scrollx[0], chip.scrolly[0]), (8, -8));
    }

    #[test]
    fn test_plain_scroll_draw() {
        let mut chip = Tc0480scp::new(Tc0480scpConfig::default());
        put(&mut chip, 0, 0, 0, 5);
        chip.ctrl_write16(0x00, 8, 0xFFFF);
        chip.tilemap_update(&gfx());

        let mut screen = Screen::new(32, 16);
        let clip = screen.visible();
        chip.draw(&mut screen, &clip, 0, DRAW_OPAQUE, 0);
        assert_eq!(screen.bitmap.get(7, 0), 0);
        assert_eq!(screen.bitmap.get(8, 0), 5);
        assert_eq!(screen.bitmap.get(23, 0), 5);
    }

    #[test]
    fn test_x_zoom_expands() {
        let mut chip = Tc0480scp::new(Tc0480scpConfig::default());
        put(&mut chip, 1, 0, 0, 1);
        put(&mut chip, 1, 1, 0, 2);
        chip.ctrl_write16(0x09, 0x807F, 0xFFFF);
        chip.tilemap_update(&gfx());

        let mut screen = Screen::new(64, 1);
        let clip = screen.visible();
        chip.draw(&mut screen, &clip, 1, DRAW_OPAQUE, 0);
        // Expansion is anchored at screen column 19 for layer 1
        assert_eq!(screen.bitmap.get(0, 0), 1);
        assert_eq!(screen.bitmap.get(12, 0), 1);
        assert_eq!(screen.bitmap.get(13, 0), 2);
        assert_eq!(screen.bitmap.get(44, 0), 2);
        assert_eq!(screen.bitmap.get(45, 0), 0);
    }

    #[test]
    fn test_column_scroll_on_upper_layers() {
        let mut chip = Tc0480scp::new(Tc0480scpConfig::default());
        put(&mut chip, 2, 0, 1, 3);
        chip.write16(0x3800 + 0x400, 16, 0xFFFF);
        chip.tilemap_update(&gfx());

        let mut screen = Screen::new(16, 2);
        let clip = screen.visible();
        chip.draw(&mut screen, &clip, 2, DRAW_OPAQUE, 0);
        assert_eq!(screen.bitmap.get(0, 0), 3);
        assert_eq!(screen.bitmap.get(0, 1), 0);
    }

    #[test]
    fn test_row_zoom_needs_enable_bit() {
        let mut chip = Tc0480scp::new(Tc0480scpConfig::default());
        chip.write16(0x3000 + 0x600, 0x80, 0xFFFF);
        assert_eq!(chip.scanline(3, 0).step_x, 0x10000);
        chip.ctrl_write16(0x0F, 0x02, 0xFFFF);
        assert_eq!(chip.scanline(3, 0).step_x, 0x8000);
        assert_eq!(chip.scanline(2, 0).step_x, 0x10000);
    }

    #[test]
    fn test_text_layer_from_ram_characters() {
        let mut chip = Tc0480scp::new(Tc0480scpConfig {
            col_base: 2,
            ..Default::default()
        });
        chip.write16((CHARS + CHAR_WORDS) as u32, 0x0F00, 0xFFFF);
        chip.write16(TEXT as u32, 0x0101, 0xFFFF);
        chip.tilemap_update(&gfx());

        let mut screen = Screen::new(8, 8);
        let clip = screen.visible();
        chip.draw(&mut screen, &clip, LAYER_TEXT, 0, 0);
        assert_eq!(screen.bitmap.get(0, 0), 3 * 16 + 0xF);
        assert_eq!(screen.bitmap.get(1, 0), 0);
    }

    #[test]
    fn test_double_width_layout() {
        let mut chip = Tc0480scp::new(Tc0480scpConfig::default());
        chip.ctrl_write16(0x0F, 0x80, 0xFFFF);
        assert_eq!(chip.layers[0].cols(), 64);
        chip.write16(0x1000 + 1, 7, 0xFFFF);
        chip.tilemap_update(&gfx());
        assert_eq!(chip.layers[1].tile(0).code, 7);
    }
}
