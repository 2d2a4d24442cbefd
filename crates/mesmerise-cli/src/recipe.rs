//! JSON edit recipes applied to a freshly loaded session.
//!
//! ```json
//! {
//!   "layers": [
//!     { "layer": 0, "effects": [{ "kind": "sepia", "value": 40 }] },
//!     { "layer": 1, "move": [12, 30], "resize": { "width": 200 },
//!       "effects": [{ "kind": "tint", "value": { "color": "#f00", "mix": 30 } }] }
//!   ],
//!   "crop": { "x": 10, "y": 10, "width": 300, "height": 200 }
//! }
//! ```

use std::path::Path;

use anyhow::{Context, Result, bail};
use mesmerise_core::effects::{EffectKind, EffectValue};
use mesmerise_core::geometry::Rect;
use mesmerise_core::session::{Command, EditorSession, Outcome};
use serde::Deserialize;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Recipe {
    pub layers: Vec<LayerStep>,
    pub crop: Option<CropStep>,
}

/// Edits for one layer, run in the order move, resize, effects.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayerStep {
    /// Stack index, 0 being the base.
    pub layer: usize,
    #[serde(default, rename = "move")]
    pub position: Option<[i64; 2]>,
    #[serde(default)]
    pub resize: Option<ResizeStep>,
    #[serde(default)]
    pub effects: Vec<EffectStep>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EffectStep {
    pub kind: EffectKind,
    /// Catalog default when omitted.
    #[serde(default)]
    pub value: Option<EffectValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResizeStep {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Crop rectangle in canvas pixels. Without `layer` the base is cropped and
/// the canvas shrinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CropStep {
    #[serde(default)]
    pub layer: Option<usize>,
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

/// What happened while applying a recipe.
#[derive(Debug, Default, PartialEq)]
pub struct RecipeReport {
    pub applied: usize,
    /// User-facing refusals, one per refused step.
    pub refused: Vec<String>,
}

impl RecipeReport {
    fn record(&mut self, step: &str, outcome: Outcome) {
        match outcome.rejection() {
            Some(reason) => {
                warn!(step, %reason, "recipe step refused");
                self.refused.push(format!("{step}: {reason}"));
            }
            None => {
                debug!(step, "recipe step applied");
                self.applied += 1;
            }
        }
    }
}

impl Recipe {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("invalid recipe")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read recipe {}", path.display()))?;
        Self::from_json_str(&json).with_context(|| format!("in {}", path.display()))
    }

    /// Apply every step to `session`, whose layers are `ids` in stack order.
    ///
    /// Refused steps are reported and skipped. Structural problems (an
    /// unknown layer index, a value of the wrong shape) abort with an error.
    pub fn apply(&self, session: &mut EditorSession, ids: &[Uuid]) -> Result<RecipeReport> {
        let mut report = RecipeReport::default();

        for step in &self.layers {
            let layer_id = layer_id(ids, step.layer)?;
            if let Some([x, y]) = step.position {
                let outcome = session.execute(Command::MoveLayer { layer_id, x, y })?;
                report.record(&format!("layer {} move", step.layer), outcome);
            }
            if let Some(resize) = step.resize {
                let outcome = session.execute(Command::ResizeLayer {
                    layer_id,
                    width: resize.width,
                    height: resize.height,
                })?;
                report.record(&format!("layer {} resize", step.layer), outcome);
            }
            for effect in &step.effects {
                let outcome = session
                    .execute(Command::AddEffect {
                        layer_id,
                        kind: effect.kind,
                        value: effect.value.clone(),
                    })
                    .with_context(|| {
                        format!("layer {} effect {:?}", step.layer, effect.kind)
                    })?;
                report.record(
                    &format!("layer {} {}", step.layer, effect.kind.display_name()),
                    outcome,
                );
            }
        }

        if let Some(crop) = self.crop {
            let target = layer_id(ids, crop.layer.unwrap_or(0))?;
            let rect = Rect::from_xywh(crop.x, crop.y, crop.width.max(1), crop.height.max(1));
            let step = match crop.layer {
                Some(i) => format!("layer {i} crop"),
                None => "canvas crop".to_string(),
            };
            let opened = session.start_crop(Some(target))?;
            if opened.is_applied() {
                session.set_crop_rect(rect)?;
                report.record(&step, session.apply_crop()?);
            } else {
                report.record(&step, opened);
            }
        }
        Ok(report)
    }
}

fn layer_id(ids: &[Uuid], index: usize) -> Result<Uuid> {
    match ids.get(index) {
        Some(id) => Ok(*id),
        None => bail!(
            "recipe references layer {index} but only {} were loaded",
            ids.len()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_recipe() {
        let recipe = Recipe::from_json_str(
            r##"{
                "layers": [
                    { "layer": 1, "move": [5, 6], "resize": { "height": 20 },
                      "effects": [{ "kind": "grain" }, { "kind": "tint", "value": { "color": "#f00", "mix": 10 } }] }
                ],
                "crop": { "x": 1, "y": 2, "width": 3, "height": 4 }
            }"##,
        )
        .unwrap();
        let step = &recipe.layers[0];
        assert_eq!(step.position, Some([5, 6]));
        assert_eq!(step.resize, Some(ResizeStep { width: None, height: Some(20) }));
        assert_eq!(step.effects[0].kind, EffectKind::Grain);
        assert!(step.effects[0].value.is_none());
        assert_eq!(recipe.crop.unwrap().layer, None);
    }

    #[test]
    fn test_empty_recipe_is_valid() {
        assert_eq!(Recipe::from_json_str("{}").unwrap(), Recipe::default());
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        assert!(Recipe::from_json_str(r#"{ "layerz": [] }"#).is_err());
    }

    #[test]
    fn test_unknown_layer_index() {
        let err = layer_id(&[Uuid::new_v4()], 3).unwrap_err();
        assert!(err.to_string().contains("layer 3"));
    }
}
