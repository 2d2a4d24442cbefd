use thiserror::Error;
use uuid::Uuid;

use crate::effects::EffectKind;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("layer not found: {0}")]
    LayerNotFound(Uuid),

    #[error("effect instance not found: {0}")]
    EffectNotFound(Uuid),

    #[error("value does not fit effect {kind:?}: {reason}")]
    ValueMismatch { kind: EffectKind, reason: String },

    #[error("invalid hex color: {0:?}")]
    InvalidColor(String),

    #[error("RGBA data length {len} doesn't match {width}x{height}x4")]
    BufferSize { width: u32, height: u32, len: usize },

    #[error("raster has no pixels ({width}x{height})")]
    EmptyRaster { width: u32, height: u32 },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
