//! Pen bitmaps and the render target handed to video devices.

use super::palette::IndexedPalette;
use crate::types::Frame;

/// Inclusive pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub min_x: i32,
    pub max_x: i32,
    pub min_y: i32,
    pub max_y: i32,
}

impl Rect {
    pub fn new(min_x: i32, max_x: i32, min_y: i32, max_y: i32) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    pub fn width(&self) -> i32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> i32 {
        self.max_y - self.min_y + 1
    }

    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        (self.min_x..=self.max_x).contains(&x) && (self.min_y..=self.max_y).contains(&y)
    }

    pub fn intersect(&self, other: &Rect) -> Rect {
        Rect {
            min_x: self.min_x.max(other.min_x),
            max_x: self.max_x.min(other.max_x),
            min_y: self.min_y.max(other.min_y),
            max_y: self.max_y.min(other.max_y),
        }
    }
}

/// A 2D grid of pixels of type `T`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap<T> {
    width: usize,
    height: usize,
    pixels: Vec<T>,
}

impl<T: Copy + Default> Bitmap<T> {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![T::default(); width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0, self.width as i32 - 1, 0, self.height as i32 - 1)
    }

    pub fn fill(&mut self, value: T) {
        self.pixels.fill(value);
    }

    pub fn fill_rect(&mut self, rect: &Rect, value: T) {
        let rect = rect.intersect(&self.bounds());
        for y in rect.min_y..=rect.max_y {
            self.row_mut(y as usize)[rect.min_x as usize..=rect.max_x as usize].fill(value);
        }
    }

    pub fn get(&self, x: usize, y: usize) -> T {
        self.pixels[y * self.width + x]
    }

    pub fn set(&mut self, x: usize, y: usize, value: T) {
        self.pixels[y * self.width + x] = value;
    }

    pub fn row(&self, y: usize) -> &[T] {
        &self.pixels[y * self.width..(y + 1) * self.width]
    }

    pub fn row_mut(&mut self, y: usize) -> &mut [T] {
        &mut self.pixels[y * self.width..(y + 1) * self.width]
    }

    pub fn pixels(&self) -> &[T] {
        &self.pixels
    }
}

/// Palette pens, as produced by tile and sprite chips.
pub type IndexedBitmap = Bitmap<u16>;

/// Per-pixel priority codes written by tilemap draws and tested by sprites.
pub type PriorityBitmap = Bitmap<u8>;

/// What a video device draws into: pens plus the priority plane.
#[derive(Debug, Clone)]
pub struct Screen {
    pub bitmap: IndexedBitmap,
    pub priority: PriorityBitmap,
}

impl Screen {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            bitmap: Bitmap::new(width, height),
            priority: Bitmap::new(width, height),
        }
    }

    pub fn width(&self) -> usize {
        self.bitmap.width()
    }

    pub fn height(&self) -> usize {
        self.bitmap.height()
    }

    pub fn visible(&self) -> Rect {
        self.bitmap.bounds()
    }

    /// Start of frame: fill the pens and zero the priority plane.
    pub fn clear(&mut self, pen: u16) {
        self.bitmap.fill(pen);
        self.priority.fill(0);
    }

    /// Resolve pens to ARGB through `palette`.
    pub fn to_frame(&self, palette: &dyn IndexedPalette) -> Frame {
        let mut frame = Frame::new(self.width() as u32, self.height() as u32);
        for (out, &pen) in frame.pixels.iter_mut().zip(self.bitmap.pixels()) {
            *out = palette.get_color(usize::from(pen));
        }
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::palette::RamPalette;

    #[test]
    fn test_rect_intersection() {
        let a = Rect::new(0, 319, 0, 239);
        let b = Rect::new(300, 400, -10, 10);
        assert_eq!(a.intersect(&b), Rect::new(300, 319, 0, 10));
        assert!(Rect::new(5, 4, 0, 0).is_empty());
        assert_eq!(a.width(), 320);
    }

    #[test]
    fn test_fill_rect_clips_to_bitmap() {
        let mut bitmap: IndexedBitmap = Bitmap::new(4, 4);
        bitmap.fill_rect(&Rect::new(2, 10, -3, 1), 7);
        assert_eq!(bitmap.row(0), &[0, 0, 7, 7]);
        assert_eq!(bitmap.row(1), &[0, 0, 7, 7]);
        assert_eq!(bitmap.row(2), &[0, 0, 0, 0]);
    }

    #[test]
    fn test_screen_to_frame() {
        let mut screen = Screen::new(2, 1);
        screen.bitmap.set(1, 0, 3);
        let palette = RamPalette::from_colors(vec![0xFF000000, 0, 0, 0xFF123456]);
        let frame = screen.to_frame(&palette);
        assert_eq!(frame.pixels, vec![0xFF000000, 0xFF123456]);
    }
}
