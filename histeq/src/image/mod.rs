pub(crate) mod color;
pub mod io;
#[cfg(test)]
mod tests;

use std::fmt;

use crate::common::{Error, Result};

/// Width and height of a single-channel plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PlaneDesc {
    pub width: usize,
    pub height: usize,
}

impl PlaneDesc {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// Rejects planes whose pixel count does not fit the 32-bit counters
    /// used by the histogram buffers.
    pub fn validate(&self) -> Result<()> {
        let count = self
            .width
            .checked_mul(self.height)
            .ok_or_else(|| Error::InvalidImage(format!("{} overflows", self)))?;
        if count > u32::MAX as usize {
            return Err(Error::InvalidImage(format!(
                "{} has {} pixels, at most {} are supported",
                self,
                count,
                u32::MAX
            )));
        }
        Ok(())
    }
}

impl fmt::Display for PlaneDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Row-major plane of 8-bit intensities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntensityPlane {
    desc: PlaneDesc,
    pixels: Vec<u8>,
}

impl IntensityPlane {
    pub fn new(width: usize, height: usize, pixels: Vec<u8>) -> Result<Self> {
        let desc = PlaneDesc::new(width, height);
        desc.validate()?;
        if pixels.len() != desc.pixel_count() {
            return Err(Error::InvalidImage(format!(
                "{} plane needs {} samples, got {}",
                desc,
                desc.pixel_count(),
                pixels.len()
            )));
        }
        Ok(Self { desc, pixels })
    }

    /// Plane with every sample set to `value`.
    pub fn filled(width: usize, height: usize, value: u8) -> Result<Self> {
        Self::new(width, height, vec![value; width * height])
    }

    pub fn desc(&self) -> PlaneDesc {
        self.desc
    }

    pub fn width(&self) -> usize {
        self.desc.width
    }

    pub fn height(&self) -> usize {
        self.desc.height
    }

    pub fn pixel_count(&self) -> usize {
        self.pixels.len()
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.pixels[y * self.desc.width + x]
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }
}

/// Cb and Cr planes cached while the luma plane is equalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChromaPlanes {
    pub cb: IntensityPlane,
    pub cr: IntensityPlane,
}

/// Channel layout of an interleaved 8-bit raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelLayout {
    Gray,
    Rgb,
}

impl ChannelLayout {
    pub fn channels(self) -> usize {
        match self {
            ChannelLayout::Gray => 1,
            ChannelLayout::Rgb => 3,
        }
    }
}

/// Interleaved 8-bit image as handed to and from the codec boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    pub desc: PlaneDesc,
    pub layout: ChannelLayout,
    pub bytes: Vec<u8>,
}

/// Image entering the pipeline.
///
/// Colour images are split into luma plus cached chroma; only the luma
/// plane is equalized, the chroma planes are reattached by [`recombine`].
///
/// [`recombine`]: SourceImage::recombine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceImage {
    Grayscale(IntensityPlane),
    ColorWithCachedChroma {
        luma: IntensityPlane,
        chroma: ChromaPlanes,
    },
}

impl SourceImage {
    pub fn from_gray8(width: usize, height: usize, bytes: Vec<u8>) -> Result<Self> {
        Ok(SourceImage::Grayscale(IntensityPlane::new(
            width, height, bytes,
        )?))
    }

    pub fn from_rgb8(width: usize, height: usize, bytes: &[u8]) -> Result<Self> {
        let desc = PlaneDesc::new(width, height);
        desc.validate()?;
        if bytes.len() != desc.pixel_count() * 3 {
            return Err(Error::InvalidImage(format!(
                "{} RGB image needs {} bytes, got {}",
                desc,
                desc.pixel_count() * 3,
                bytes.len()
            )));
        }

        let (y, cb, cr) = color::rgb_to_ycbcr(bytes);
        Ok(SourceImage::ColorWithCachedChroma {
            luma: IntensityPlane::new(width, height, y)?,
            chroma: ChromaPlanes {
                cb: IntensityPlane::new(width, height, cb)?,
                cr: IntensityPlane::new(width, height, cr)?,
            },
        })
    }

    pub fn luma(&self) -> &IntensityPlane {
        match self {
            SourceImage::Grayscale(plane) => plane,
            SourceImage::ColorWithCachedChroma { luma, .. } => luma,
        }
    }

    pub fn desc(&self) -> PlaneDesc {
        self.luma().desc()
    }

    pub fn is_color(&self) -> bool {
        matches!(self, SourceImage::ColorWithCachedChroma { .. })
    }

    /// Combines an equalized luma plane with whatever this image cached.
    pub fn recombine(&self, equalized: &IntensityPlane) -> Result<Raster> {
        if equalized.desc() != self.desc() {
            return Err(Error::InvalidImage(format!(
                "equalized plane is {}, source is {}",
                equalized.desc(),
                self.desc()
            )));
        }

        Ok(match self {
            SourceImage::Grayscale(_) => Raster {
                desc: equalized.desc(),
                layout: ChannelLayout::Gray,
                bytes: equalized.pixels().to_vec(),
            },
            SourceImage::ColorWithCachedChroma { chroma, .. } => Raster {
                desc: equalized.desc(),
                layout: ChannelLayout::Rgb,
                bytes: color::ycbcr_to_rgb(
                    equalized.pixels(),
                    chroma.cb.pixels(),
                    chroma.cr.pixels(),
                ),
            },
        })
    }
}
