use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, Result};

/// The kind of effect applied to a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    Brightness,
    Contrast,
    Saturation,
    Vignette,
    Grain,
    Resolution,
    Invert,
    Duotone,
    Sharpen,
    Sepia,
    Tint,
    Halftone,
}

impl EffectKind {
    /// Human-readable display name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Brightness => "Brightness",
            Self::Contrast => "Contrast",
            Self::Saturation => "Saturation",
            Self::Vignette => "Vignette",
            Self::Grain => "Camera Grain",
            Self::Resolution => "Resolution",
            Self::Invert => "Invert",
            Self::Duotone => "Duotone",
            Self::Sharpen => "Sharpen",
            Self::Sepia => "Sepia",
            Self::Tint => "Color Tint",
            Self::Halftone => "Halftone",
        }
    }

    /// The value domain this kind accepts.
    pub fn domain(&self) -> ValueDomain {
        let slider = |min, max, default, step| {
            ValueDomain::Slider(SliderDomain {
                min,
                max,
                default,
                step,
            })
        };
        match self {
            Self::Brightness | Self::Contrast | Self::Saturation => slider(-100.0, 100.0, 0.0, 1.0),
            Self::Vignette | Self::Grain | Self::Invert | Self::Sepia => {
                slider(0.0, 100.0, 0.0, 1.0)
            }
            Self::Resolution => slider(10.0, 100.0, 100.0, 5.0),
            Self::Sharpen => slider(0.0, 200.0, 0.0, 1.0),
            Self::Tint => ValueDomain::Custom(EffectValue::Tint {
                color: Rgb::new(0xff, 0x00, 0x00),
                mix: 30.0,
            }),
            Self::Duotone => ValueDomain::Custom(EffectValue::Duotone {
                color_a: Rgb::new(0x0b, 0x3d, 0x91),
                color_b: Rgb::new(0xff, 0xd1, 0x66),
                mix: 100.0,
                mode: BlendMode::Replace,
            }),
            Self::Halftone => ValueDomain::Custom(EffectValue::Halftone(HalftoneParams::default())),
        }
    }

    pub fn default_value(&self) -> EffectValue {
        match self.domain() {
            ValueDomain::Slider(d) => EffectValue::Scalar(d.default),
            ValueDomain::Custom(v) => v,
        }
    }

    /// Check `value` has the right shape for this kind and pull numeric
    /// fields into their domain.
    pub fn normalize(&self, value: EffectValue) -> Result<EffectValue> {
        let mismatch = |reason: &str| CoreError::ValueMismatch {
            kind: *self,
            reason: reason.to_string(),
        };
        match (self.domain(), value) {
            (ValueDomain::Slider(d), EffectValue::Scalar(v)) => {
                if v.is_nan() {
                    return Err(mismatch("value is NaN"));
                }
                Ok(EffectValue::Scalar(v.clamp(d.min, d.max)))
            }
            (ValueDomain::Slider(_), _) => Err(mismatch("expected a scalar value")),
            (ValueDomain::Custom(_), EffectValue::Tint { color, mix }) if *self == Self::Tint => {
                Ok(EffectValue::Tint {
                    color,
                    mix: clamp_mix(mix).ok_or_else(|| mismatch("mix is NaN"))?,
                })
            }
            (
                ValueDomain::Custom(_),
                EffectValue::Duotone {
                    color_a,
                    color_b,
                    mix,
                    mode,
                },
            ) if *self == Self::Duotone => Ok(EffectValue::Duotone {
                color_a,
                color_b,
                mix: clamp_mix(mix).ok_or_else(|| mismatch("mix is NaN"))?,
                mode,
            }),
            (ValueDomain::Custom(_), EffectValue::Halftone(params)) if *self == Self::Halftone => {
                Ok(EffectValue::Halftone(params))
            }
            (ValueDomain::Custom(_), _) => Err(mismatch("wrong value record for this effect")),
        }
    }

    /// All built-in effect kinds, in catalog order.
    pub fn all_builtin() -> Vec<EffectKind> {
        vec![
            Self::Brightness,
            Self::Contrast,
            Self::Saturation,
            Self::Vignette,
            Self::Grain,
            Self::Resolution,
            Self::Invert,
            Self::Duotone,
            Self::Sharpen,
            Self::Sepia,
            Self::Tint,
            Self::Halftone,
        ]
    }
}

fn clamp_mix(mix: f64) -> Option<f64> {
    (!mix.is_nan()).then(|| mix.clamp(0.0, 100.0))
}

/// Slider range for a scalar effect.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SliderDomain {
    pub min: f64,
    pub max: f64,
    pub default: f64,
    pub step: f64,
}

/// What a control for this effect edits: a slider, or a structured record
/// whose default is given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValueDomain {
    Slider(SliderDomain),
    Custom(EffectValue),
}

// =============================================================================
// Colors
// =============================================================================

/// An opaque 8-bit color, written as `#rrggbb` (or `#rgb`) in JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb`, `rrggbb`, `#rgb` or `rgb`.
    pub fn parse_hex(hex: &str) -> Result<Self> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        let expanded: String = match digits.len() {
            3 => digits.chars().flat_map(|c| [c, c]).collect(),
            6 => digits.to_string(),
            _ => return Err(CoreError::InvalidColor(hex.to_string())),
        };
        let packed = u32::from_str_radix(&expanded, 16)
            .map_err(|_| CoreError::InvalidColor(hex.to_string()))?;
        Ok(Self::new(
            ((packed >> 16) & 0xff) as u8,
            ((packed >> 8) & 0xff) as u8,
            (packed & 0xff) as u8,
        ))
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.r as f64, self.g as f64, self.b as f64]
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Rgb {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_hex(s)
    }
}

impl TryFrom<String> for Rgb {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse_hex(&s)
    }
}

impl From<Rgb> for String {
    fn from(c: Rgb) -> String {
        c.to_string()
    }
}

// =============================================================================
// Values
// =============================================================================

/// How duotone output is combined with the original pixels.
///
/// Both modes currently blend identically; the choice is carried so saved
/// recipes keep the user's selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    #[default]
    Replace,
    Overlay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HalftoneShape {
    #[default]
    Circle,
    Square,
    Triangle,
    Line,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HalftoneSize {
    Small,
    #[default]
    Medium,
    Large,
}

impl HalftoneSize {
    /// Edge length in pixels of one halftone cell.
    pub fn dot_size(self) -> u32 {
        match self {
            Self::Small => 4,
            Self::Medium => 8,
            Self::Large => 12,
        }
    }
}

/// Ink used for halftone dots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HalftoneMode {
    /// Solid black dots.
    #[default]
    Monochrome,
    /// Dots take the sampled cell color.
    Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct HalftoneParams {
    #[serde(default)]
    pub shape: HalftoneShape,
    #[serde(default)]
    pub size: HalftoneSize,
    #[serde(default)]
    pub mode: HalftoneMode,
}

/// A concrete effect value: a slider position or a structured record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EffectValue {
    Scalar(f64),
    Tint {
        color: Rgb,
        mix: f64,
    },
    Duotone {
        color_a: Rgb,
        color_b: Rgb,
        mix: f64,
        #[serde(default)]
        mode: BlendMode,
    },
    Halftone(HalftoneParams),
}

impl EffectValue {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Self::Scalar(v) => Some(*v),
            _ => None,
        }
    }

    /// True when the colors differ between two records of the same shape.
    /// Used to pick the longer debounce for color-picker drags.
    pub fn color_changed(&self, other: &EffectValue) -> bool {
        match (self, other) {
            (Self::Tint { color: a, .. }, Self::Tint { color: b, .. }) => a != b,
            (
                Self::Duotone {
                    color_a: a1,
                    color_b: b1,
                    ..
                },
                Self::Duotone {
                    color_a: a2,
                    color_b: b2,
                    ..
                },
            ) => a1 != a2 || b1 != b2,
            _ => false,
        }
    }
}

// =============================================================================
// Instances
// =============================================================================

/// One configured application of an effect kind to one layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectInstance {
    pub id: Uuid,
    pub kind: EffectKind,
    pub value: EffectValue,
}

impl EffectInstance {
    /// Create a new effect instance with the catalog default value.
    pub fn new(kind: EffectKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            value: kind.default_value(),
        }
    }

    /// Create a new instance with a caller-supplied value.
    pub fn with_value(kind: EffectKind, value: EffectValue) -> Result<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            kind,
            value: kind.normalize(value)?,
        })
    }

    pub fn scalar(&self) -> Option<f64> {
        self.value.as_scalar()
    }

    /// Replace the value, normalized into this kind's domain.
    pub fn set_value(&mut self, value: EffectValue) -> Result<()> {
        self.value = self.kind.normalize(value)?;
        Ok(())
    }
}
