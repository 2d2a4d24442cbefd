use std::path::Path;

use mesmerise_core::layer::SourceImage;
use mesmerise_core::raster::Raster;
use tracing::debug;

use crate::error::{ImageIoError, Result};
use crate::probe::open_reader;

/// Decode an image file into an RGBA raster.
pub fn load_raster(path: &Path) -> Result<Raster> {
    let reader = open_reader(path)?;
    if reader.format().is_none() {
        return Err(ImageIoError::UnknownFormat(path.display().to_string()));
    }
    let image = reader.decode()?;
    let raster = Raster::from_rgba_image(image.into_rgba8());
    debug!(path = %path.display(), width = raster.width, height = raster.height, "image decoded");
    Ok(raster)
}

/// Decode an in-memory encoded image.
pub fn decode_raster(bytes: &[u8]) -> Result<Raster> {
    let image = image::load_from_memory(bytes)?;
    Ok(Raster::from_rgba_image(image.into_rgba8()))
}

/// Decode an image file into a layer source. Decoded files are always
/// readable.
pub fn load_source(path: &Path) -> Result<SourceImage> {
    Ok(SourceImage::new(load_raster(path)?))
}
