use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use image::ImageFormat;
use image::io::Reader;

use crate::error::{ImageIoError, Result};

/// Header-level facts about an image file, read without decoding pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    pub name: String,
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
}

pub(crate) fn open_reader(path: &Path) -> Result<Reader<BufReader<File>>> {
    let file = File::open(path).map_err(|source| ImageIoError::OpenFailed {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Reader::new(BufReader::new(file)).with_guessed_format()?)
}

/// Display name for a layer loaded from `path`: the file stem.
pub fn layer_name(path: &Path) -> String {
    path.file_stem()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "layer".into())
}

/// Probe an image file for its format and dimensions.
pub fn probe(path: &Path) -> Result<ImageInfo> {
    let reader = open_reader(path)?;
    let format = reader
        .format()
        .ok_or_else(|| ImageIoError::UnknownFormat(path.display().to_string()))?;
    let (width, height) = reader.into_dimensions()?;
    Ok(ImageInfo {
        name: layer_name(path),
        path: path.to_path_buf(),
        width,
        height,
        format,
    })
}
