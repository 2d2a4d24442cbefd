use std::path::Path;

use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder};
use mesmerise_core::raster::Raster;
use mesmerise_core::session::{EditorSession, Rejection};
use tracing::info;

use crate::error::{ImageIoError, Result};

/// Encode a raster as PNG bytes.
pub fn encode_png(raster: &Raster) -> Result<Vec<u8>> {
    if raster.is_empty() {
        return Err(ImageIoError::NothingToExport(Rejection::NoLayers));
    }
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes).write_image(
        &raster.data,
        raster.width,
        raster.height,
        ColorType::Rgba8,
    )?;
    Ok(bytes)
}

/// Flatten the session and encode the result as PNG bytes.
///
/// Renders first so the export reflects every committed change, including
/// ones still waiting on a debounce.
pub fn export_png_bytes(session: &mut EditorSession) -> Result<Vec<u8>> {
    if session.layers().is_empty() {
        return Err(ImageIoError::NothingToExport(Rejection::NoLayers));
    }
    session.render();
    encode_png(session.surface())
}

/// Flatten the session and write it to `path` as PNG.
pub fn export_png(session: &mut EditorSession, path: &Path) -> Result<()> {
    let bytes = export_png_bytes(session)?;
    std::fs::write(path, &bytes)?;
    let surface = session.surface();
    info!(
        path = %path.display(),
        width = surface.width,
        height = surface.height,
        bytes = bytes.len(),
        "export written"
    );
    Ok(())
}
