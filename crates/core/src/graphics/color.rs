//! ARGB color helpers.
//!
//! Colors are ARGB8888 (0xAARRGGBB). Palette chips store fewer bits per gun
//! and expand them by replicating the top bits into the bottom ones, so full
//! scale always maps to 0xFF.

pub struct ColorOps;

impl ColorOps {
    #[inline]
    pub fn red(color: u32) -> u8 {
        ((color >> 16) & 0xFF) as u8
    }

    #[inline]
    pub fn green(color: u32) -> u8 {
        ((color >> 8) & 0xFF) as u8
    }

    #[inline]
    pub fn blue(color: u32) -> u8 {
        (color & 0xFF) as u8
    }

    #[inline]
    pub fn alpha(color: u32) -> u8 {
        ((color >> 24) & 0xFF) as u8
    }

    #[inline]
    pub fn from_argb(a: u8, r: u8, g: u8, b: u8) -> u32 {
        ((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | (b as u32)
    }

    /// Opaque color from 8-bit guns.
    #[inline]
    pub fn from_rgb(r: u8, g: u8, b: u8) -> u32 {
        0xFF000000 | ((r as u32) << 16) | ((g as u32) << 8) | (b as u32)
    }

    /// Expand a 4-bit gun.
    #[inline]
    pub fn pal4bit(bits: u16) -> u8 {
        let bits = (bits & 0x0F) as u8;
        (bits << 4) | bits
    }

    /// Expand a 5-bit gun.
    #[inline]
    pub fn pal5bit(bits: u16) -> u8 {
        let bits = (bits & 0x1F) as u8;
        (bits << 3) | (bits >> 2)
    }

    /// Opaque color from three 5-bit guns packed red lowest: `xBBBBBGGGGGRRRRR`.
    #[inline]
    pub fn from_xbgr555(word: u16) -> u32 {
        Self::from_rgb(
            Self::pal5bit(word),
            Self::pal5bit(word >> 5),
            Self::pal5bit(word >> 10),
        )
    }

    /// Opaque color from three 5-bit guns packed red highest: `xRRRRRGGGGGBBBBB`.
    #[inline]
    pub fn from_xrgb555(word: u16) -> u32 {
        Self::from_rgb(
            Self::pal5bit(word >> 10),
            Self::pal5bit(word >> 5),
            Self::pal5bit(word),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_extraction() {
        let color = 0xAABBCCDD;
        assert_eq!(ColorOps::alpha(color), 0xAA);
        assert_eq!(ColorOps::red(color), 0xBB);
        assert_eq!(ColorOps::green(color), 0xCC);
        assert_eq!(ColorOps::blue(color), 0xDD);
        assert_eq!(ColorOps::from_argb(0xAA, 0xBB, 0xCC, 0xDD), color);
    }

    #[test]
    fn test_gun_expansion_reaches_full_scale() {
        assert_eq!(ColorOps::pal4bit(0x0F), 0xFF);
        assert_eq!(ColorOps::pal4bit(0x08), 0x88);
        assert_eq!(ColorOps::pal5bit(0x1F), 0xFF);
        assert_eq!(ColorOps::pal5bit(0x10), 0x84);
        assert_eq!(ColorOps::pal5bit(0), 0);
    }

    #[test]
    fn test_555_packings() {
        assert_eq!(ColorOps::from_xbgr555(0x001F), 0xFFFF0000);
        assert_eq!(ColorOps::from_xbgr555(0x7C00), 0xFF0000FF);
        assert_eq!(ColorOps::from_xrgb555(0x7C00), 0xFFFF0000);
        assert_eq!(ColorOps::from_xrgb555(0x03E0), 0xFF00FF00);
    }
}
