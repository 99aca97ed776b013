//! PC090OJ sprite generator.
//!
//! 256 16x16 sprites of four words each at the start of a 0x2000 word RAM:
//!
//! - word 0: bit 15 flip y, bit 14 flip x, bits 0-3 color
//! - word 1: y, 9 bits
//! - word 2: code, 13 bits
//! - word 3: x, 9 bits
//!
//! Word 0xDFF is the control register; bit 0 clear flips the screen. Boards
//! that buffer the sprite list only see RAM writes after the end of frame
//! copy.

use emu_core::graphics::{GfxElement, Rect, Screen};
use serde::{Deserialize, Serialize};

use crate::{combine, TaitoError};

const RAM_WORDS: usize = 0x2000;
const LIST_WORDS: usize = 0x400;
const CTRL_WORD: usize = 0xDFF;

const SCREEN_WIDTH: i32 = 320;
const SCREEN_HEIGHT: i32 = 256;
const SPRITE_SIZE: i32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Pc090ojConfig {
    pub gfx: usize,
    pub x_offset: i32,
    pub y_offset: i32,
    /// Sprite list is double buffered, copied by [`Pc090oj::end_of_frame`].
    pub use_buffer: bool,
}

impl Pc090ojConfig {
    pub fn from_json(text: &str) -> Result<Self, TaitoError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// How sprites sit against the tile layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpritePriority {
    /// Above the top tile layer.
    Over,
    /// Below the top tile layer.
    Under,
    /// Chosen by bit 15 of the sprite control value.
    Variable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pc090oj {
    config: Pc090ojConfig,
    ram: Vec<u16>,
    buffered: Vec<u16>,
    ctrl: u16,
    sprite_ctrl: u16,
}

impl Pc090oj {
    pub fn new(config: Pc090ojConfig) -> Self {
        Self {
            config,
            ram: vec![0; RAM_WORDS],
            buffered: vec![0; LIST_WORDS],
            ctrl: 0,
            sprite_ctrl: 0,
        }
    }

    pub fn read16(&self, offset: u32) -> u16 {
        self.ram[offset as usize % RAM_WORDS]
    }

    pub fn write16(&mut self, offset: u32, data: u16, mem_mask: u16) {
        let offset = offset as usize % RAM_WORDS;
        self.ram[offset] = combine(self.ram[offset], data, mem_mask);
        if !self.config.use_buffer && offset < LIST_WORDS {
            self.buffered[offset] = self.ram[offset];
        }
        if offset == CTRL_WORD {
            self.ctrl = self.ram[offset];
        }
    }

    /// Board-level color bank ORed into every sprite color, with the
    /// variable priority flag in bit 15.
    pub fn set_sprite_ctrl(&mut self, value: u16) {
        self.sprite_ctrl = value;
    }

    pub fn end_of_frame(&mut self) {
        if self.config.use_buffer {
            self.buffered.copy_from_slice(&self.ram[..LIST_WORDS]);
        }
    }

    /// Draw the whole list, first entry underneath. Sprites hide behind tile
    /// pixels whose priority is 4 or more (2 or more when under the top layer).
    pub fn draw(&self, screen: &mut Screen, clip: &Rect, gfx: &[GfxElement], priority: SpritePriority) {
        let Some(element) = gfx.get(self.config.gfx) else {
            return;
        };
        let under = match priority {
            SpritePriority::Over => false,
            SpritePriority::Under => true,
            SpritePriority::Variable => self.sprite_ctrl & 0x8000 != 0,
        };
        let pmask = if under { 0xFC } else { 0xF0 };
        let flip_screen = self.ctrl & 0x01 == 0;

        for sprite in self.buffered.chunks_exact(4) {
            let attr = sprite[0];
            let mut flipy = attr & 0x8000 != 0;
            let mut flipx = attr & 0x4000 != 0;
            let color = u32::from((attr & 0x000F) | self.sprite_ctrl);
            let code = u32::from(sprite[2] & 0x1FFF);
            let mut x = signed9(sprite[3]);
            let mut y = signed9(sprite[1]);

            if flip_screen {
                x = SCREEN_WIDTH - x - SPRITE_SIZE;
                y = SCREEN_HEIGHT - y - SPRITE_SIZE;
                flipx = !flipx;
                flipy = !flipy;
            }
            x += self.config.x_offset;
            y += self.config.y_offset;

            element.pdraw(screen, clip, code, color, flipx, flipy, x, y, pmask);
        }
    }
}

/// Coordinates past 0x140 are off the top or left edge.
fn signed9(value: u16) -> i32 {
    let value = i32::from(value & 0x1FF);
    if value > 0x140 {
        value - 0x200
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emu_core::graphics::Packed4Bpp;

    fn gfx() -> Vec<GfxElement> {
        let data: Vec<u8> = (0..4u8)
            .flat_map(|n| std::iter::repeat(n | (n << 4)).take(128))
            .collect();
        vec![GfxElement::decode(&Packed4Bpp::TILE_16X16, &data, 16)]
    }

    fn sprite(chip: &mut Pc090oj, index: u32, attr: u16, x: u16, y: u16, code: u16) {
        let base = index * 4;
        chip.write16(base, attr, 0xFFFF);
        chip.write16(base + 1, y, 0xFFFF);
        chip.write16(base + 2, code, 0xFFFF);
        chip.write16(base + 3, x, 0xFFFF);
    }

    fn unflipped(config: Pc090ojConfig) -> Pc090oj {
        let mut chip = Pc090oj::new(config);
        chip.write16(CTRL_WORD as u32, 1, 0xFFFF);
        chip
    }

    #[test]
    fn test_sprite_position_and_color() {
        let mut chip = unflipped(Pc090ojConfig::default());
        sprite(&mut chip, 0, 0x0002, 10, 20, 3);
        chip.set_sprite_ctrl(0x10);

        let mut screen = Screen::new(320, 256);
        let clip = screen.visible();
        chip.draw(&mut screen, &clip, &gfx(), SpritePriority::Over);
        assert_eq!(screen.bitmap.get(10, 20), (0x12 * 16 + 3) as u16);
        assert_eq!(screen.bitmap.get(9, 20), 0);
        assert_eq!(screen.priority.get(10, 20), 31);
    }

    #[test]
    fn test_negative_coordinates() {
        assert_eq!(signed9(0x1F8), -8);
        assert_eq!(signed9(0x140), 0x140);
        assert_eq!(signed9(0xFE05), 5);
    }

    #[test]
    fn test_screen_flip_when_bit_clear() {
        let mut chip = Pc090oj::new(Pc090ojConfig::default());
        sprite(&mut chip, 0, 0, 0, 0, 1);
        let mut screen = Screen::new(320, 256);
        let clip = screen.visible();
        chip.draw(&mut screen, &clip, &gfx(), SpritePriority::Over);
        assert_eq!(screen.bitmap.get(304, 240), 1);
        assert_eq!(screen.bitmap.get(0, 0), 0);
    }

    #[test]
    fn test_priority_masks() {
        let mut chip = unflipped(Pc090ojConfig::default());
        sprite(&mut chip, 0, 0, 0, 0, 1);
        let mut screen = Screen::new(32, 16);
        let clip = screen.visible();
        screen.priority.fill(2);

        chip.draw(&mut screen, &clip, &gfx(), SpritePriority::Over);
        assert_eq!(screen.bitmap.get(0, 0), 1);

        screen.clear(0);
        screen.priority.fill(2);
        chip.set_sprite_ctrl(0x8000);
        chip.draw(&mut screen, &clip, &gfx(), SpritePriority::Variable);
        assert_eq!(screen.bitmap.get(0, 0), 0);
    }

    #[test]
    fn test_buffered_list_waits_for_end_of_frame() {
        let mut chip = unflipped(Pc090ojConfig {
            use_buffer: true,
            ..Default::default()
        });
        sprite(&mut chip, 0, 0, 0, 0, 2);
        let mut screen = Screen::new(16, 16);
        let clip = screen.visible();
        chip.draw(&mut screen, &clip, &gfx(), SpritePriority::Over);
        assert_eq!(screen.bitmap.get(0, 0), 0);

        chip.end_of_frame();
        chip.draw(&mut screen, &clip, &gfx(), SpritePriority::Over);
        assert_eq!(screen.bitmap.get(0, 0), 2);
    }
}
