use std::path::{Path, PathBuf};

use image::RgbaImage;
use mesmerise_core::raster::Raster;
use tempfile::TempDir;

/// Fresh temporary directory for on-disk fixtures. Removed on drop.
pub fn fixture_dir() -> TempDir {
    TempDir::new().expect("failed to create fixture dir")
}

/// Write `raster` as a PNG named `{name}.png` inside `dir`.
pub fn write_test_png(dir: &Path, name: &str, raster: &Raster) -> PathBuf {
    let path = dir.join(format!("{name}.png"));
    let image = RgbaImage::from_raw(raster.width, raster.height, raster.data.clone())
        .expect("raster data should match its dimensions");
    image.save(&path).expect("failed to write test png");
    assert!(path.exists(), "test png was not created: {name}");
    path
}

/// Write a file whose contents are not a decodable image.
pub fn write_garbage_file(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"definitely not an image").expect("failed to write garbage file");
    path
}

/// Write a JSON document to `{name}` inside `dir`.
pub fn write_json(dir: &Path, name: &str, json: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, json).expect("failed to write json fixture");
    path
}
