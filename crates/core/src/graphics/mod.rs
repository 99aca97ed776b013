//! Graphics primitives shared by the video chips.
//!
//! Chips render palette pens into a [`Screen`]; the display side turns the
//! pens into ARGB through an [`IndexedPalette`].

pub mod bitmap;
pub mod color;
pub mod gfx;
pub mod palette;
pub mod tilemap;

pub use bitmap::{Bitmap, IndexedBitmap, PriorityBitmap, Rect, Screen};
pub use color::ColorOps;
pub use gfx::{GfxElement, Interleaved2Bpp, Packed4Bpp, Planar2Bpp, TileDecoder};
pub use palette::{IndexedPalette, RamPalette};
pub use tilemap::{RozParams, Scanline, TileInfo, TilemapLayer, DRAW_OPAQUE};
