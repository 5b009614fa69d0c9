//! Loading and saving through the `image` crate.

use std::path::Path;

use super::{ChannelLayout, Raster, SourceImage};
use crate::common::{Error, Result};

/// Decodes `path` into a [`SourceImage`].
///
/// Luma images (with or without alpha) load as grayscale; everything else
/// is converted to RGB8 and split into luma plus cached chroma.
pub fn load<P: AsRef<Path>>(path: P) -> Result<SourceImage> {
    let path = path.as_ref();
    let img = image::open(path).map_err(|e| Error::ImageDecode {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let width = img.width() as usize;
    let height = img.height() as usize;

    match img.color() {
        image::ColorType::L8
        | image::ColorType::L16
        | image::ColorType::La8
        | image::ColorType::La16 => {
            SourceImage::from_gray8(width, height, img.into_luma8().into_raw())
        }
        _ => SourceImage::from_rgb8(width, height, img.into_rgb8().as_raw()),
    }
}

/// Encodes `raster` to `path`; the format follows the file extension.
pub fn save<P: AsRef<Path>>(path: P, raster: &Raster) -> Result<()> {
    let color_type = match raster.layout {
        ChannelLayout::Gray => image::ExtendedColorType::L8,
        ChannelLayout::Rgb => image::ExtendedColorType::Rgb8,
    };

    image::save_buffer(
        path.as_ref(),
        &raster.bytes,
        raster.desc.width as u32,
        raster.desc.height as u32,
        color_type,
    )
    .map_err(|e| Error::ImageEncode(format!("{}: {}", path.as_ref().display(), e)))
}
