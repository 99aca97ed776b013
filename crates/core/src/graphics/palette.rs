//! Indexed palettes.
//!
//! Video chips produce pens; a palette turns a pen into ARGB. Palette chips
//! such as the TC0110PCR write into a [`RamPalette`], the display side reads
//! through [`IndexedPalette`].

use serde::{Deserialize, Serialize};

/// Maps pens to ARGB colors.
pub trait IndexedPalette {
    /// Get the RGB color for a palette index.
    /// Returns a 32-bit ARGB color (0xAARRGGBB).
    fn get_color(&self, index: usize) -> u32;

    /// Set the RGB color for a palette index.
    fn set_color(&mut self, index: usize, color: u32);

    /// Get the number of colors in this palette.
    fn len(&self) -> usize;

    /// Check if the palette is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Palette held in RAM, one ARGB word per pen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RamPalette {
    colors: Vec<u32>,
}

impl RamPalette {
    /// Create a new palette with the specified number of colors.
    pub fn new(size: usize) -> Self {
        Self {
            colors: vec![0xFF000000; size], // Default to opaque black
        }
    }

    /// Create a palette from a list of colors.
    pub fn from_colors(colors: Vec<u32>) -> Self {
        Self { colors }
    }

    /// Get a slice of all colors.
    pub fn colors(&self) -> &[u32] {
        &self.colors
    }

    /// Get a mutable slice of all colors.
    pub fn colors_mut(&mut self) -> &mut [u32] {
        &mut self.colors
    }
}

impl IndexedPalette for RamPalette {
    fn get_color(&self, index: usize) -> u32 {
        self.colors.get(index).copied().unwrap_or(0xFF000000)
    }

    fn set_color(&mut self, index: usize, color: u32) {
        if index < self.colors.len() {
            self.colors[index] = color;
        }
    }

    fn len(&self) -> usize {
        self.colors.len()
    }
}
