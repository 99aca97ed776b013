//! Raw sector floppy images.
//!
//! A raw image is every sector of every track laid out back to back in
//! track, head, sector order with no ID fields. The geometry has to be known
//! up front; [`Geometry::default`] is the 80 track, double sided, 9 x 512
//! byte layout used when nothing better is known.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FloppyError {
    #[error("image is {actual} bytes, geometry needs {expected}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("no known geometry for a {0} byte image")]
    UnknownGeometry(usize),
    #[error("disk is write protected")]
    WriteProtected,
    #[error("sector {sector} not found on track {track} side {head}")]
    SectorNotFound { track: u8, head: u8, sector: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    pub tracks: u8,
    pub heads: u8,
    pub sectors: u8,
    pub sector_size: u16,
    pub first_sector_id: u8,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            tracks: 80,
            heads: 2,
            sectors: 9,
            sector_size: 512,
            first_sector_id: 1,
        }
    }
}

impl Geometry {
    pub fn track_size(&self) -> usize {
        usize::from(self.sectors) * usize::from(self.sector_size)
    }

    pub fn image_size(&self) -> usize {
        usize::from(self.tracks) * usize::from(self.heads) * self.track_size()
    }

    /// Size code stored in sector ID fields: 0 = 128 bytes ... 3 = 1024.
    pub fn size_code(&self) -> u8 {
        match self.sector_size {
            128 => 0,
            256 => 1,
            512 => 2,
            _ => 3,
        }
    }

    /// Pick a geometry for an image from its size, keeping the default
    /// sector layout and varying track and side counts.
    pub fn guess(size: usize) -> Result<Self, FloppyError> {
        let base = Geometry::default();
        for heads in [2u8, 1] {
            for tracks in [80u8, 40, 81, 82, 83, 84, 41, 42] {
                let candidate = Geometry {
                    tracks,
                    heads,
                    ..base
                };
                if candidate.image_size() == size {
                    return Ok(candidate);
                }
            }
        }
        Err(FloppyError::UnknownGeometry(size))
    }
}

#[derive(Debug, Clone)]
pub struct FloppyImage {
    geometry: Geometry,
    data: Vec<u8>,
    write_protected: bool,
}

impl FloppyImage {
    pub fn new(geometry: Geometry, data: Vec<u8>) -> Result<Self, FloppyError> {
        if data.len() != geometry.image_size() {
            return Err(FloppyError::SizeMismatch {
                expected: geometry.image_size(),
                actual: data.len(),
            });
        }
        Ok(Self {
            geometry,
            data,
            write_protected: false,
        })
    }

    /// Build an image whose geometry is guessed from its size.
    pub fn from_bytes(data: &[u8]) -> Result<Self, FloppyError> {
        let geometry = Geometry::guess(data.len())?;
        Self::new(geometry, data.to_vec())
    }

    /// A freshly formatted image filled with 0xE5.
    pub fn blank(geometry: Geometry) -> Self {
        Self {
            geometry,
            data: vec![0xE5; geometry.image_size()],
            write_protected: false,
        }
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn is_write_protected(&self) -> bool {
        self.write_protected
    }

    pub fn set_write_protected(&mut self, protected: bool) {
        self.write_protected = protected;
    }

    pub fn has_track(&self, track: u8, head: u8) -> bool {
        track < self.geometry.tracks && head < self.geometry.heads
    }

    fn sector_offset(&self, track: u8, head: u8, sector: u8) -> Option<usize> {
        let g = &self.geometry;
        let index = sector.checked_sub(g.first_sector_id)?;
        if !self.has_track(track, head) || index >= g.sectors {
            return None;
        }
        let track_index = usize::from(track) * usize::from(g.heads) + usize::from(head);
        Some(track_index * g.track_size() + usize::from(index) * usize::from(g.sector_size))
    }

    pub fn read_sector(&self, track: u8, head: u8, sector: u8) -> Result<&[u8], FloppyError> {
        let offset = self
            .sector_offset(track, head, sector)
            .ok_or(FloppyError::SectorNotFound {
                track,
                head,
                sector,
            })?;
        Ok(&self.data[offset..offset + usize::from(self.geometry.sector_size)])
    }

    pub fn write_sector(
        &mut self,
        track: u8,
        head: u8,
        sector: u8,
        bytes: &[u8],
    ) -> Result<(), FloppyError> {
        if self.write_protected {
            return Err(FloppyError::WriteProtected);
        }
        let offset = self
            .sector_offset(track, head, sector)
            .ok_or(FloppyError::SectorNotFound {
                track,
                head,
                sector,
            })?;
        let len = usize::from(self.geometry.sector_size).min(bytes.len());
        self.data[offset..offset + len].copy_from_slice(&bytes[..len]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_geometry_size() {
        assert_eq!(Geometry::default().image_size(), 737_280);
        assert_eq!(Geometry::default().size_code(), 2);
    }

    #[test]
    fn test_guess_geometry() {
        let single = Geometry::guess(40 * 9 * 512).unwrap();
        assert_eq!((single.tracks, single.heads), (40, 1));
        assert_eq!(Geometry::guess(1234), Err(FloppyError::UnknownGeometry(1234)));
    }

    #[test]
    fn test_sector_layout() {
        let mut image = FloppyImage::blank(Geometry::default());
        image.write_sector(1, 1, 3, &[0xAB; 512]).unwrap();

        // Track 1 side 1 is the fourth track in the file, sector 3 the third slot
        let offset = 3 * 9 * 512 + 2 * 512;
        assert_eq!(image.data()[offset], 0xAB);
        assert_eq!(image.data()[offset - 1], 0xE5);
        assert_eq!(image.read_sector(1, 1, 3).unwrap()[511], 0xAB);
    }

    #[test]
    fn test_missing_sectors() {
        let image = FloppyImage::blank(Geometry::default());
        assert!(image.read_sector(0, 0, 0).is_err());
        assert!(image.read_sector(0, 0, 10).is_err());
        assert!(image.read_sector(80, 0, 1).is_err());
        assert!(image.read_sector(0, 2, 1).is_err());
    }

    #[test]
    fn test_write_protect() {
        let mut image = FloppyImage::blank(Geometry::default());
        image.set_write_protected(true);
        assert_eq!(
            image.write_sector(0, 0, 1, &[0; 512]),
            Err(FloppyError::WriteProtected)
        );
    }
}
