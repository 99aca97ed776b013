//! TC0280GRD and TC0430GRW rotate/zoom layer.
//!
//! One 64x64 layer of 8x8 tiles, a word per tile: color in bits 14-15 on
//! top of the base color, code in bits 0-13. Eight control words set the
//! transform in 12.12 fixed point:
//!
//! - 0-1: start x, 24-bit signed (bits 0-7 of word 0 are the top byte)
//! - 2: x increment per screen column
//! - 3: x increment per screen row
//! - 4-5: start y
//! - 6: y increment per screen column
//! - 7: y increment per screen row
//!
//! The TC0430GRW is the same chip with the per-column increments doubled.

use emu_core::graphics::{GfxElement, Rect, RozParams, Screen, TileInfo, TilemapLayer};
use serde::{Deserialize, Serialize};

use crate::combine;

const RAM_WORDS: usize = 0x1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoomChip {
    Tc0280grd,
    Tc0430grw,
}

impl ZoomChip {
    fn column_multiplier(self) -> i32 {
        match self {
            ZoomChip::Tc0280grd => 1,
            ZoomChip::Tc0430grw => 2,
        }
    }
}

pub struct Tc0280grd {
    chip: ZoomChip,
    gfx: usize,
    ram: Vec<u16>,
    ctrl: [u16; 8],
    base_color: u32,
    layer: TilemapLayer,
}

impl Tc0280grd {
    pub fn new(chip: ZoomChip, gfx: usize) -> Self {
        Self {
            chip,
            gfx,
            ram: vec![0; RAM_WORDS],
            ctrl: [0; 8],
            base_color: 0,
            layer: TilemapLayer::new(64, 64, 8, 8),
        }
    }

    pub fn chip(&self) -> ZoomChip {
        self.chip
    }

    pub fn read16(&self, offset: u32) -> u16 {
        self.ram[offset as usize % RAM_WORDS]
    }

    pub fn write16(&mut self, offset: u32, data: u16, mem_mask: u16) {
        let offset = offset as usize % RAM_WORDS;
        self.ram[offset] = combine(self.ram[offset], data, mem_mask);
    }

    pub fn ctrl_write16(&mut self, offset: u32, data: u16, mem_mask: u16) {
        let index = offset as usize & 7;
        self.ctrl[index] = combine(self.ctrl[index], data, mem_mask);
    }

    pub fn tilemap_update(&mut self, gfx: &[GfxElement], base_color: u32) {
        self.base_color = base_color;
        for index in 0..RAM_WORDS {
            let attr = self.ram[index];
            self.layer.set_tile(
                index,
                TileInfo {
                    gfx: self.gfx,
                    code: u32::from(attr & 0x3FFF),
                    color: u32::from(attr >> 14) + base_color,
                    flipx: false,
                    flipy: false,
                },
            );
        }
        self.layer.update(gfx);
    }

    /// Transform with the screen origin moved to (`x_offset`, `y_offset`),
    /// converted to 16.16.
    pub fn roz_params(&self, x_offset: i32, y_offset: i32) -> RozParams {
        let start = |hi: u16, lo: u16| {
            let value = (i32::from(hi & 0xFF) << 16) | i32::from(lo);
            (value << 8) >> 8
        };
        let multiplier = self.chip.column_multiplier();
        let inc_xx = i32::from(self.ctrl[2] as i16) * multiplier;
        let inc_yx = i32::from(self.ctrl[3] as i16);
        let inc_xy = i32::from(self.ctrl[6] as i16) * multiplier;
        let inc_yy = i32::from(self.ctrl[7] as i16);

        let start_x = start(self.ctrl[0], self.ctrl[1]) - x_offset * inc_xx - y_offset * inc_yx;
        let start_y = start(self.ctrl[4], self.ctrl[5]) - x_offset * inc_xy - y_offset * inc_yy;
        RozParams {
            start_x: start_x << 4,
            start_y: start_y << 4,
            inc_xx: inc_xx << 4,
            inc_xy: inc_xy << 4,
            inc_yx: inc_yx << 4,
            inc_yy: inc_yy << 4,
            wrap: true,
        }
    }

    pub fn zoom_draw(&self, screen: &mut Screen, clip: &Rect, x_offset: i32, y_offset: i32, priority: u8) {
        let params = self.roz_params(x_offset, y_offset);
        self.layer.draw_roz(screen, clip, &params, 0, priority);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emu_core::graphics::Packed4Bpp;

    fn gfx() -> Vec<GfxElement> {
        let data: Vec<u8> = (0..16u8)
            .flat_map(|n| std::iter::repeat(n | (n << 4)).take(32))
            .collect();
        vec![GfxElement::decode(&Packed4Bpp::TILE_8X8, &data, 16)]
    }

    fn identity(chip: &mut Tc0280grd) {
        chip.ctrl_write16(2, 0x1000, 0xFFFF);
        chip.ctrl_write16(7, 0x1000, 0xFFFF);
    }

    #[test]
    fn test_start_is_24_bit_signed() {
        let mut chip = Tc0280grd::new(ZoomChip::Tc0280grd, 0);
        chip.ctrl_write16(0, 0x00FF, 0xFFFF);
        chip.ctrl_write16(1, 0xF000, 0xFFFF);
        assert_eq!(chip.roz_params(0, 0).start_x, -0x1000 << 4);
    }

    #[test]
    fn test_identity_transform_with_base_color() {
        let mut chip = Tc0280grd::new(ZoomChip::Tc0280grd, 0);
        identity(&mut chip);
        chip.write16(1, 0x4005, 0xFFFF);
        chip.tilemap_update(&gfx(), 0x10);

        let mut screen = Screen::new(24, 8);
        let clip = screen.visible();
        chip.zoom_draw(&mut screen, &clip, 0, 0, 0);
        assert_eq!(screen.bitmap.get(8, 0), (0x11 * 16 + 5) as u16);
        assert_eq!(screen.bitmap.get(0, 0), 0);

        // The screen origin moves the sampled point
        let mut screen = Screen::new(24, 8);
        chip.zoom_draw(&mut screen, &clip, 8, 0, 0);
        assert_eq!(screen.bitmap.get(16, 0), (0x11 * 16 + 5) as u16);
    }

    #[test]
    fn test_grw_doubles_column_step() {
        let mut grd = Tc0280grd::new(ZoomChip::Tc0280grd, 0);
        let mut grw = Tc0280grd::new(ZoomChip::Tc0430grw, 0);
        identity(&mut grd);
        identity(&mut grw);
        grw.ctrl_write16(6, 0x0100, 0xFFFF);
        assert_eq!(grd.roz_params(0, 0).inc_xx, 0x10000);
        assert_eq!(grw.roz_params(0, 0).inc_xx, 0x20000);
        assert_eq!(grw.roz_params(0, 0).inc_xy, 0x2000);
    }
}
