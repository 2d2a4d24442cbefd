use std::fs;
use std::path::Path;
use std::time::Duration;

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Filter used when a resize or crop is baked into new source pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResampleFilter {
    Nearest,
    #[default]
    Triangle,
    CatmullRom,
    Lanczos3,
}

impl ResampleFilter {
    pub fn to_filter_type(self) -> FilterType {
        match self {
            Self::Nearest => FilterType::Nearest,
            Self::Triangle => FilterType::Triangle,
            Self::CatmullRom => FilterType::CatmullRom,
            Self::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Editor tuning. Every field has a default so partial JSON files are valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Quiet period after a slider change before pixels are reprocessed.
    pub render_debounce_ms: u64,
    /// Quiet period after a color picker change.
    pub color_debounce_ms: u64,
    /// Quiet period after a mix slider or mode change on a custom effect.
    pub mix_debounce_ms: u64,
    /// Smallest width/height a corner-handle resize may produce.
    pub min_resize_dimension: u32,
    /// Largest width/height a corner-handle resize may produce.
    pub max_resize_dimension: u32,
    pub resample_filter: ResampleFilter,
    /// Fixed grain seed for reproducible output. Fresh noise per rebuild when unset.
    pub grain_seed: Option<u64>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            render_debounce_ms: 16,
            color_debounce_ms: 120,
            mix_debounce_ms: 60,
            min_resize_dimension: 10,
            max_resize_dimension: 10_000,
            resample_filter: ResampleFilter::default(),
            grain_seed: None,
        }
    }
}

impl EditorConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_resize_dimension == 0 {
            return Err(CoreError::InvalidConfig(
                "min_resize_dimension must be at least 1".into(),
            ));
        }
        if self.min_resize_dimension > self.max_resize_dimension {
            return Err(CoreError::InvalidConfig(format!(
                "min_resize_dimension {} exceeds max_resize_dimension {}",
                self.min_resize_dimension, self.max_resize_dimension
            )));
        }
        Ok(())
    }

    pub fn render_debounce(&self) -> Duration {
        Duration::from_millis(self.render_debounce_ms)
    }

    pub fn color_debounce(&self) -> Duration {
        Duration::from_millis(self.color_debounce_ms)
    }

    pub fn mix_debounce(&self) -> Duration {
        Duration::from_millis(self.mix_debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EditorConfig::default();
        assert_eq!(config.render_debounce_ms, 16);
        assert_eq!(config.min_resize_dimension, 10);
        assert_eq!(config.resample_filter, ResampleFilter::Triangle);
        assert!(config.grain_seed.is_none());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = EditorConfig::from_json_str(r#"{ "grain_seed": 7 }"#).unwrap();
        assert_eq!(config.grain_seed, Some(7));
        assert_eq!(config.color_debounce_ms, 120);
    }

    #[test]
    fn test_filter_snake_case() {
        let config =
            EditorConfig::from_json_str(r#"{ "resample_filter": "catmull_rom" }"#).unwrap();
        assert_eq!(config.resample_filter, ResampleFilter::CatmullRom);
    }

    #[test]
    fn test_validate_rejects_inverted_bounds() {
        let err = EditorConfig::from_json_str(
            r#"{ "min_resize_dimension": 50, "max_resize_dimension": 20 }"#,
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfig(_)));
    }

    #[test]
    fn test_save_load_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("editor.json");
        let config = EditorConfig {
            mix_debounce_ms: 42,
            ..EditorConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(EditorConfig::load(&path).unwrap(), config);
    }
}
