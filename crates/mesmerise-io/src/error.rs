use std::path::PathBuf;

use mesmerise_core::error::CoreError;
use mesmerise_core::session::Rejection;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageIoError {
    #[error("failed to open {}: {source}", path.display())]
    OpenFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("unrecognized image format: {0}")]
    UnknownFormat(String),

    #[error("image codec error: {0}")]
    Codec(#[from] image::ImageError),

    #[error("nothing to export: {0}")]
    NothingToExport(Rejection),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ImageIoError>;
