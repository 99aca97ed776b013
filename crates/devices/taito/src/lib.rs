//! Taito custom video and I/O chips
//!
//! Each chip is a standalone device: the machine maps its RAM and register
//! handlers into the CPU address space, calls `tilemap_update` once per frame
//! and then draws layers back to front into a [`Screen`]. Graphics sets are
//! owned by the machine and passed in as decoded [`GfxElement`]s; characters
//! decoded from chip RAM are owned by the chip.
//!
//! 16-bit handlers take the CPU's byte lane mask; 32-bit handlers put the
//! lower-addressed word in the high half.

pub mod io;
pub mod pc080sn;
pub mod pc090oj;
pub mod tc0100scn;
pub mod tc0110pcr;
pub mod tc0280grd;
pub mod tc0360pri;
pub mod tc0480scp;

pub use io::{InputPorts, Tc0220ioc, Tc0510nio, Tc0640fio};
pub use pc080sn::{Pc080sn, Pc080snConfig};
pub use pc090oj::{Pc090oj, Pc090ojConfig, SpritePriority};
pub use tc0100scn::{Tc0100scn, Tc0100scnConfig};
pub use tc0110pcr::{PaletteFormat, Tc0110pcr};
pub use tc0280grd::{Tc0280grd, ZoomChip};
pub use tc0360pri::Tc0360pri;
pub use tc0480scp::{Tc0480scp, Tc0480scpConfig};

use emu_core::graphics::{GfxElement, Rect, Screen};

#[derive(thiserror::Error, Debug)]
pub enum TaitoError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
    #[error("{chip}: graphics set {index} not present ({available} decoded)")]
    MissingGfx {
        chip: &'static str,
        index: usize,
        available: usize,
    },
}

/// Chips with scrolling tile layers drawn through a common entry point.
pub trait TilemapChip {
    fn name(&self) -> &'static str;

    /// Indices of the machine graphics sets the chip draws from.
    fn gfx_sets(&self) -> Vec<usize>;

    /// Setup-time check that every graphics set the chip uses was decoded.
    fn check_gfx(&self, gfx: &[GfxElement]) -> Result<(), TaitoError> {
        match self.gfx_sets().into_iter().find(|&index| index >= gfx.len()) {
            Some(index) => Err(TaitoError::MissingGfx {
                chip: self.name(),
                index,
                available: gfx.len(),
            }),
            None => Ok(()),
        }
    }

    fn layer_count(&self) -> usize;

    /// Rebuild the tile layout and scroll state from RAM and registers.
    /// Calling it again without intervening writes changes nothing.
    fn tilemap_update(&mut self, gfx: &[GfxElement]);

    /// Draw one layer. Unknown or disabled layers draw nothing.
    fn draw(&self, screen: &mut Screen, clip: &Rect, layer: usize, flags: u32, priority: u8);
}

/// Merge `data` into `old` on the byte lanes set in `mem_mask`.
#[inline]
pub(crate) fn combine(old: u16, data: u16, mem_mask: u16) -> u16 {
    (old & !mem_mask) | (data & mem_mask)
}

/// Split a 32-bit access into the two word accesses it covers.
#[inline]
pub(crate) fn split32(data: u32, mem_mask: u32) -> [(u16, u16); 2] {
    [
        ((data >> 16) as u16, (mem_mask >> 16) as u16),
        (data as u16, mem_mask as u16),
    ]
}

/// Big-endian byte image of a run of words, the order tile decoders expect.
pub(crate) fn word_bytes(words: &[u16]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_be_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combine_lanes() {
        assert_eq!(combine(0x1234, 0xABCD, 0xFFFF), 0xABCD);
        assert_eq!(combine(0x1234, 0xABCD, 0x00FF), 0x12CD);
        assert_eq!(combine(0x1234, 0xABCD, 0xFF00), 0xAB34);
    }

    #[test]
    fn test_split32_high_word_first() {
        let [hi, lo] = split32(0x1122_3344, 0xFFFF_0000);
        assert_eq!(hi, (0x1122, 0xFFFF));
        assert_eq!(lo, (0x3344, 0x0000));
    }

    #[test]
    fn test_missing_gfx_reported() {
        let config = Pc080snConfig {
            gfx: 2,
            ..Default::default()
        };
        let chip = Pc080sn::new(config);
        let gfx = vec![GfxElement::new(8, 8, 16, 1)];
        assert!(matches!(
            chip.check_gfx(&gfx),
            Err(TaitoError::MissingGfx {
                chip: "PC080SN",
                index: 2,
                available: 1
            })
        ));
    }
}
