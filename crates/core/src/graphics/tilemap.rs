//! Scrollable tile layers.
//!
//! A [`TilemapLayer`] keeps a grid of [`TileInfo`] cells filled in by the
//! owning chip and a pixmap of the whole layer rendered from them. Only cells
//! whose info changed are re-rendered on [`TilemapLayer::update`]. Drawing
//! samples the pixmap with wrap-around, either with plain row/column scroll,
//! per-scanline start and step (zoom), or a full rotate/zoom transform.

use super::bitmap::{Bitmap, IndexedBitmap, Rect, Screen};
use super::gfx::GfxElement;

/// Draw transparent pixels too.
pub const DRAW_OPAQUE: u32 = 0x10;

/// What a cell shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TileInfo {
    /// Index into the graphics sets passed to `update`.
    pub gfx: usize,
    pub code: u32,
    pub color: u32,
    pub flipx: bool,
    pub flipy: bool,
}

/// Source position of one scanline, in 16.16 fixed point for x.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scanline {
    pub start_x: i32,
    pub step_x: i32,
    pub y: i32,
}

/// Rotate/zoom parameters, 16.16 fixed point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RozParams {
    pub start_x: i32,
    pub start_y: i32,
    pub inc_xx: i32,
    pub inc_xy: i32,
    pub inc_yx: i32,
    pub inc_yy: i32,
    pub wrap: bool,
}

#[derive(Debug, Clone)]
pub struct TilemapLayer {
    cols: usize,
    rows: usize,
    tile_width: usize,
    tile_height: usize,
    tiles: Vec<TileInfo>,
    dirty: Vec<bool>,
    pixmap: IndexedBitmap,
    opaque: Bitmap<u8>,
    transparent_pen: Option<u8>,
    scroll_rows: Vec<i32>,
    scroll_cols: Vec<i32>,
    flipx: bool,
    flipy: bool,
    enabled: bool,
}

impl TilemapLayer {
    pub fn new(cols: usize, rows: usize, tile_width: usize, tile_height: usize) -> Self {
        let (width, height) = (cols * tile_width, rows * tile_height);
        Self {
            cols,
            rows,
            tile_width,
            tile_height,
            tiles: vec![TileInfo::default(); cols * rows],
            dirty: vec![true; cols * rows],
            pixmap: Bitmap::new(width, height),
            opaque: Bitmap::new(width, height),
            transparent_pen: Some(0),
            scroll_rows: vec![0],
            scroll_cols: vec![0],
            flipx: false,
            flipy: false,
            enabled: true,
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Layer size in pixels.
    pub fn width(&self) -> usize {
        self.cols * self.tile_width
    }

    pub fn height(&self) -> usize {
        self.rows * self.tile_height
    }

    pub fn tile(&self, index: usize) -> TileInfo {
        self.tiles[index]
    }

    pub fn set_tile(&mut self, index: usize, info: TileInfo) {
        if let Some(cell) = self.tiles.get_mut(index) {
            if *cell != info {
                *cell = info;
                self.dirty[index] = true;
            }
        }
    }

    pub fn mark_all_dirty(&mut self) {
        self.dirty.fill(true);
    }

    pub fn set_transparent_pen(&mut self, pen: Option<u8>) {
        if self.transparent_pen != pen {
            self.transparent_pen = pen;
            self.mark_all_dirty();
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_flip(&mut self, flipx: bool, flipy: bool) {
        self.flipx = flipx;
        self.flipy = flipy;
    }

    /// Number of independently scrolled horizontal bands.
    pub fn set_scroll_rows(&mut self, count: usize) {
        self.scroll_rows = vec![0; count.max(1)];
    }

    /// Number of independently scrolled vertical bands.
    pub fn set_scroll_cols(&mut self, count: usize) {
        self.scroll_cols = vec![0; count.max(1)];
    }

    pub fn set_scrollx(&mut self, row: usize, value: i32) {
        if let Some(scroll) = self.scroll_rows.get_mut(row) {
            *scroll = value;
        }
    }

    pub fn set_scrolly(&mut self, col: usize, value: i32) {
        if let Some(scroll) = self.scroll_cols.get_mut(col) {
            *scroll = value;
        }
    }

    pub fn scrollx(&self, row: usize) -> i32 {
        self.scroll_rows.get(row).copied().unwrap_or(0)
    }

    pub fn scrolly(&self, col: usize) -> i32 {
        self.scroll_cols.get(col).copied().unwrap_or(0)
    }

    pub fn pixmap(&self) -> &IndexedBitmap {
        &self.pixmap
    }

    /// Render every dirty cell into the pixmap.
    pub fn update(&mut self, gfx: &[GfxElement]) {
        let (tw, th) = (self.tile_width, self.tile_height);
        for index in 0..self.tiles.len() {
            if !std::mem::take(&mut self.dirty[index]) {
                continue;
            }
            let info = self.tiles[index];
            let (ox, oy) = ((index % self.cols) * tw, (index / self.cols) * th);
            let Some(element) = gfx.get(info.gfx) else {
                for y in oy..oy + th {
                    self.opaque.row_mut(y)[ox..ox + tw].fill(0);
                }
                continue;
            };
            let tile = element.tile(info.code);
            let (ew, eh) = (element.width(), element.height());
            for y in 0..th {
                let ty = if info.flipy { th - 1 - y } else { y };
                for x in 0..tw {
                    let tx = if info.flipx { tw - 1 - x } else { x };
                    let pixel = if tx < ew && ty < eh {
                        tile.get(ty * ew + tx).copied().unwrap_or(0)
                    } else {
                        0
                    };
                    self.pixmap.set(ox + x, oy + y, element.pen(info.color, pixel));
                    let opaque = self.transparent_pen != Some(pixel);
                    self.opaque.set(ox + x, oy + y, u8::from(opaque));
                }
            }
        }
    }

    fn source(&self, sx: i32, sy: i32) -> (usize, usize) {
        let (w, h) = (self.width() as i32, self.height() as i32);
        let mut px = sx.rem_euclid(w);
        let mut py = sy.rem_euclid(h);
        if self.flipx {
            px = w - 1 - px;
        }
        if self.flipy {
            py = h - 1 - py;
        }
        (px as usize, py as usize)
    }

    fn plot(&self, screen: &mut Screen, x: i32, y: i32, src: (usize, usize), flags: u32, priority: u8) {
        let (px, py) = src;
        if flags & DRAW_OPAQUE != 0 || self.opaque.get(px, py) != 0 {
            let (x, y) = (x as usize, y as usize);
            screen.bitmap.set(x, y, self.pixmap.get(px, py));
            let pri = screen.priority.get(x, y) | priority;
            screen.priority.set(x, y, pri);
        }
    }

    /// Draw with the current row and column scroll.
    ///
    /// When column scroll has more than one band it is applied after a global
    /// x scroll; otherwise row scroll bands are looked up by source row.
    pub fn draw(&self, screen: &mut Screen, clip: &Rect, flags: u32, priority: u8) {
        self.draw_offset(screen, clip, flags, priority, 0, 0);
    }

    /// [`draw`](Self::draw) with `dx`, `dy` added to every scroll value.
    pub fn draw_offset(&self, screen: &mut Screen, clip: &Rect, flags: u32, priority: u8, dx: i32, dy: i32) {
        if !self.enabled || self.pixmap.width() == 0 {
            return;
        }
        let clip = clip.intersect(&screen.visible());
        let (w, h) = (self.width() as i32, self.height() as i32);
        let (nrows, ncols) = (self.scroll_rows.len() as i32, self.scroll_cols.len() as i32);

        for y in clip.min_y..=clip.max_y {
            for x in clip.min_x..=clip.max_x {
                let (sx, sy) = if ncols > 1 {
                    let sx = (x + dx + self.scroll_rows[0]).rem_euclid(w);
                    let band = (sx * ncols / w) as usize;
                    (sx, y + dy + self.scroll_cols[band])
                } else {
                    let sy = (y + dy + self.scroll_cols[0]).rem_euclid(h);
                    let band = (sy * nrows / h) as usize;
                    (x + dx + self.scroll_rows[band], sy)
                };
                let src = self.source(sx, sy);
                self.plot(screen, x, y, src, flags, priority);
            }
        }
    }

    /// Draw with a source position and x step chosen per screen row.
    pub fn draw_scanlines(
        &self,
        screen: &mut Screen,
        clip: &Rect,
        flags: u32,
        priority: u8,
        scanline: impl Fn(i32) -> Scanline,
    ) {
        if !self.enabled || self.pixmap.width() == 0 {
            return;
        }
        let clip = clip.intersect(&screen.visible());
        for y in clip.min_y..=clip.max_y {
            let line = scanline(y);
            let mut cx = line
                .start_x
                .wrapping_add(line.step_x.wrapping_mul(clip.min_x));
            for x in clip.min_x..=clip.max_x {
                let src = self.source(cx >> 16, line.y);
                self.plot(screen, x, y, src, flags, priority);
                cx = cx.wrapping_add(line.step_x);
            }
        }
    }

    /// Rotate/zoom draw. Without `wrap`, pixels outside the layer are skipped.
    pub fn draw_roz(&self, screen: &mut Screen, clip: &Rect, params: &RozParams, flags: u32, priority: u8) {
        if !self.enabled || self.pixmap.width() == 0 {
            return;
        }
        let clip = clip.intersect(&screen.visible());
        let (w, h) = (self.width() as i32, self.height() as i32);
        for y in clip.min_y..=clip.max_y {
            let row_x = params
                .start_x
                .wrapping_add(params.inc_yx.wrapping_mul(y))
                .wrapping_add(params.inc_xx.wrapping_mul(clip.min_x));
            let row_y = params
                .start_y
                .wrapping_add(params.inc_yy.wrapping_mul(y))
                .wrapping_add(params.inc_xy.wrapping_mul(clip.min_x));
            let (mut cx, mut cy) = (row_x, row_y);
            for x in clip.min_x..=clip.max_x {
                let (sx, sy) = (cx >> 16, cy >> 16);
                if params.wrap || ((0..w).contains(&sx) && (0..h).contains(&sy)) {
                    let src = self.source(sx, sy);
                    self.plot(screen, x, y, src, flags, priority);
                }
                cx = cx.wrapping_add(params.inc_xx);
                cy = cy.wrapping_add(params.inc_xy);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::gfx::Packed4Bpp;

    /// Tile n is solid pixel n.
    fn gfx() -> Vec<GfxElement> {
        let data: Vec<u8> = (0..16u8)
            .flat_map(|n| std::iter::repeat(n | (n << 4)).take(32))
            .collect();
        vec![GfxElement::decode(&Packed4Bpp::TILE_8X8, &data, 16)]
    }

    /// 4x4 layer, cell i shows tile (i % 15) + 1.
    fn layer() -> TilemapLayer {
        let mut layer = TilemapLayer::new(4, 4, 8, 8);
        for i in 0..16 {
            layer.set_tile(
                i,
                TileInfo {
                    code: (i as u32 % 15) + 1,
                    ..Default::default()
                },
            );
        }
        layer.update(&gfx());
        layer
    }

    #[test]
    fn test_plain_draw_and_scroll() {
        let mut layer = layer();
        let mut screen = Screen::new(16, 16);
        let clip = screen.visible();
        layer.draw(&mut screen, &clip, 0, 1);
        assert_eq!(screen.bitmap.get(0, 0), 1);
        assert_eq!(screen.bitmap.get(8, 0), 2);
        assert_eq!(screen.bitmap.get(0, 8), 5);
        assert_eq!(screen.priority.get(0, 0), 1);

        // Scrolling by one tile shifts the source, wrapping at 32 pixels
        layer.set_scrollx(0, 24);
        layer.set_scrolly(0, 8);
        layer.draw(&mut screen, &clip, 0, 0);
        assert_eq!(screen.bitmap.get(0, 0), 8);
        assert_eq!(screen.bitmap.get(8, 0), 5);
    }

    #[test]
    fn test_row_scroll_bands() {
        let mut layer = layer();
        layer.set_scroll_rows(32);
        layer.set_scrollx(9, 8);
        let mut screen = Screen::new(8, 16);
        let clip = screen.visible();
        layer.draw(&mut screen, &clip, 0, 0);
        assert_eq!(screen.bitmap.get(0, 8), 5);
        assert_eq!(screen.bitmap.get(0, 9), 6);
    }

    #[test]
    fn test_column_scroll_bands() {
        let mut layer = layer();
        layer.set_scroll_cols(4);
        layer.set_scrolly(1, 8);
        let mut screen = Screen::new(16, 8);
        let clip = screen.visible();
        layer.draw(&mut screen, &clip, 0, 0);
        assert_eq!(screen.bitmap.get(0, 0), 1);
        assert_eq!(screen.bitmap.get(8, 0), 6);
    }

    #[test]
    fn test_transparency_and_opaque_flag() {
        let mut layer = TilemapLayer::new(1, 1, 8, 8);
        layer.update(&gfx());
        let mut screen = Screen::new(8, 8);
        screen.bitmap.fill(0x55);
        let clip = screen.visible();

        layer.draw(&mut screen, &clip, 0, 0);
        assert_eq!(screen.bitmap.get(3, 3), 0x55);
        layer.draw(&mut screen, &clip, DRAW_OPAQUE, 0);
        assert_eq!(screen.bitmap.get(3, 3), 0);
    }

    #[test]
    fn test_dirty_tracking() {
        let mut layer = layer();
        let before = layer.pixmap().get(0, 0);
        layer.set_tile(
            0,
            TileInfo {
                code: 9,
                color: 1,
                ..Default::default()
            },
        );
        assert_eq!(layer.pixmap().get(0, 0), before);
        layer.update(&gfx());
        assert_eq!(layer.pixmap().get(0, 0), 16 + 9);
    }

    #[test]
    fn test_scanline_zoom() {
        let layer = layer();
        let mut screen = Screen::new(16, 1);
        let clip = screen.visible();
        // Half step: every source pixel is drawn twice
        layer.draw_scanlines(&mut screen, &clip, 0, 0, |_| Scanline {
            start_x: 0,
            step_x: 0x8000,
            y: 0,
        });
        assert_eq!(screen.bitmap.get(15, 0), 1);
    }

    #[test]
    fn test_roz_identity_and_clipping() {
        let layer = layer();
        let mut screen = Screen::new(40, 8);
        let clip = screen.visible();
        let params = RozParams {
            inc_xx: 0x10000,
            inc_yy: 0x10000,
            ..Default::default()
        };
        layer.draw_roz(&mut screen, &clip, &params, 0, 0);
        assert_eq!(screen.bitmap.get(8, 0), 2);
        assert_eq!(screen.bitmap.get(35, 0), 0, "outside without wrap");

        let wrapped = RozParams { wrap: true, ..params };
        layer.draw_roz(&mut screen, &clip, &wrapped, 0, 0);
        assert_eq!(screen.bitmap.get(35, 0), 1);
    }
}
