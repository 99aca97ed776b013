//! Tile graphics: decoding raw tile data and drawing decoded tiles.
//!
//! Tile chips address their graphics by code and color. A [`GfxElement`]
//! holds every tile of one graphics set decoded to pixel values, so drawing
//! never touches the raw format again. The pen written to the bitmap is
//! `color_base + color * granularity + pixel`.
//!
//! # Formats
//!
//! - **Planar 2bpp**: 16 bytes per 8x8 tile, low plane rows then high plane rows
//! - **Interleaved 2bpp**: 16 bytes per 8x8 tile, low/high plane byte per row
//! - **Packed 4bpp**: two pixels per byte, low nibble first, rows in order

use super::bitmap::{IndexedBitmap, Rect, Screen};

/// Decodes pixels out of raw tile data.
pub trait TileDecoder {
    fn width(&self) -> usize {
        8
    }

    fn height(&self) -> usize {
        8
    }

    /// Bytes per tile.
    fn tile_size(&self) -> usize;

    /// Pixel value at (`x`, `y`) of the tile starting at `tile_data[0]`.
    /// Coordinates outside the tile read as 0.
    fn decode_pixel(&self, tile_data: &[u8], x: usize, y: usize) -> u8;
}

#[derive(Debug, Clone, Copy)]
pub struct Planar2Bpp;

impl TileDecoder for Planar2Bpp {
    fn tile_size(&self) -> usize {
        16
    }

    fn decode_pixel(&self, tile_data: &[u8], x: usize, y: usize) -> u8 {
        if tile_data.len() < 16 || x > 7 || y > 7 {
            return 0;
        }
        let bit = 7 - x;
        let lo = (tile_data[y] >> bit) & 1;
        let hi = (tile_data[y + 8] >> bit) & 1;
        (hi << 1) | lo
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Interleaved2Bpp;

impl TileDecoder for Interleaved2Bpp {
    fn tile_size(&self) -> usize {
        16
    }

    fn decode_pixel(&self, tile_data: &[u8], x: usize, y: usize) -> u8 {
        if tile_data.len() < 16 || x > 7 || y > 7 {
            return 0;
        }
        let bit = 7 - x;
        let lo = (tile_data[y * 2] >> bit) & 1;
        let hi = (tile_data[y * 2 + 1] >> bit) & 1;
        (hi << 1) | lo
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Packed4Bpp {
    pub width: usize,
    pub height: usize,
}

impl Packed4Bpp {
    pub const TILE_8X8: Packed4Bpp = Packed4Bpp {
        width: 8,
        height: 8,
    };
    pub const TILE_16X16: Packed4Bpp = Packed4Bpp {
        width: 16,
        height: 16,
    };
}

impl TileDecoder for Packed4Bpp {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn tile_size(&self) -> usize {
        self.width * self.height / 2
    }

    fn decode_pixel(&self, tile_data: &[u8], x: usize, y: usize) -> u8 {
        if x >= self.width || y >= self.height {
            return 0;
        }
        let index = y * self.width + x;
        match tile_data.get(index / 2) {
            Some(&byte) if index % 2 == 0 => byte & 0x0F,
            Some(&byte) => byte >> 4,
            None => 0,
        }
    }
}

/// A decoded graphics set.
#[derive(Debug, Clone)]
pub struct GfxElement {
    width: usize,
    height: usize,
    granularity: u16,
    color_base: u16,
    count: usize,
    pixels: Vec<u8>,
}

impl GfxElement {
    /// `count` blank tiles, for sets decoded from RAM at run time.
    pub fn new(width: usize, height: usize, granularity: u16, count: usize) -> Self {
        Self {
            width,
            height,
            granularity,
            color_base: 0,
            count,
            pixels: vec![0; width * height * count],
        }
    }

    /// Decode every whole tile in `data`.
    pub fn decode(decoder: &dyn TileDecoder, data: &[u8], granularity: u16) -> Self {
        let count = data.len() / decoder.tile_size().max(1);
        let mut element = Self::new(decoder.width(), decoder.height(), granularity, count);
        for code in 0..count {
            let start = code * decoder.tile_size();
            element.decode_tile(code, decoder, &data[start..start + decoder.tile_size()]);
        }
        element
    }

    /// Re-decode one tile, typically after its RAM changed.
    pub fn decode_tile(&mut self, code: usize, decoder: &dyn TileDecoder, tile_data: &[u8]) {
        if code >= self.count {
            return;
        }
        let (w, h) = (self.width, self.height);
        let tile = &mut self.pixels[code * w * h..(code + 1) * w * h];
        for y in 0..h {
            for x in 0..w {
                tile[y * w + x] = decoder.decode_pixel(tile_data, x, y);
            }
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn granularity(&self) -> u16 {
        self.granularity
    }

    pub fn color_base(&self) -> u16 {
        self.color_base
    }

    pub fn set_color_base(&mut self, base: u16) {
        self.color_base = base;
    }

    /// Decoded pixels of `code`, which wraps at the element size.
    pub fn tile(&self, code: u32) -> &[u8] {
        let size = self.width * self.height;
        if self.count == 0 {
            return &[];
        }
        let code = code as usize % self.count;
        &self.pixels[code * size..(code + 1) * size]
    }

    pub fn pen(&self, color: u32, pixel: u8) -> u16 {
        self.color_base
            .wrapping_add((color as u16).wrapping_mul(self.granularity))
            .wrapping_add(u16::from(pixel))
    }

    /// Walk the visible pixels of a tile placed at (`sx`, `sy`), calling
    /// `plot(x, y, pixel)` for each.
    #[allow(clippy::too_many_arguments)]
    fn for_each_pixel(
        &self,
        clip: &Rect,
        code: u32,
        flipx: bool,
        flipy: bool,
        sx: i32,
        sy: i32,
        mut plot: impl FnMut(usize, usize, u8),
    ) {
        let tile = self.tile(code);
        if tile.is_empty() {
            return;
        }
        let (w, h) = (self.width as i32, self.height as i32);
        let x0 = sx.max(clip.min_x);
        let x1 = (sx + w - 1).min(clip.max_x);
        let y0 = sy.max(clip.min_y);
        let y1 = (sy + h - 1).min(clip.max_y);

        for y in y0..=y1 {
            let ty = if flipy { h - 1 - (y - sy) } else { y - sy };
            for x in x0..=x1 {
                let tx = if flipx { w - 1 - (x - sx) } else { x - sx };
                plot(x as usize, y as usize, tile[(ty * w + tx) as usize]);
            }
        }
    }

    /// Draw a tile, skipping `transparent` pixels when given.
    #[allow(clippy::too_many_arguments)]
    pub fn draw(
        &self,
        bitmap: &mut IndexedBitmap,
        clip: &Rect,
        code: u32,
        color: u32,
        flipx: bool,
        flipy: bool,
        sx: i32,
        sy: i32,
        transparent: Option<u8>,
    ) {
        let clip = clip.intersect(&bitmap.bounds());
        self.for_each_pixel(&clip, code, flipx, flipy, sx, sy, |x, y, pixel| {
            if Some(pixel) != transparent {
                bitmap.set(x, y, self.pen(color, pixel));
            }
        });
    }

    /// Draw a tile under the priority plane, pixel 0 transparent.
    ///
    /// A pixel is drawn where bit `priority & 0x1F` of `pmask` is clear. Every
    /// opaque pixel marks the priority plane with 31, drawn or not, so later
    /// sprites stay behind earlier ones.
    #[allow(clippy::too_many_arguments)]
    pub fn pdraw(
        &self,
        screen: &mut Screen,
        clip: &Rect,
        code: u32,
        color: u32,
        flipx: bool,
        flipy: bool,
        sx: i32,
        sy: i32,
        pmask: u32,
    ) {
        let clip = clip.intersect(&screen.visible());
        let Screen { bitmap, priority } = screen;
        self.for_each_pixel(&clip, code, flipx, flipy, sx, sy, |x, y, pixel| {
            if pixel == 0 {
                return;
            }
            let pri = priority.get(x, y);
            if (1u32 << (pri & 0x1F)) & pmask == 0 {
                bitmap.set(x, y, self.pen(color, pixel));
            }
            priority.set(x, y, 31);
        });
    }
}
