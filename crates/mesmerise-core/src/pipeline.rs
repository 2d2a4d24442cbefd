use std::collections::HashMap;

use tracing::trace;

use crate::effects::{EffectInstance, EffectKind, EffectValue};
use crate::kernels;
use crate::raster::Raster;

// =============================================================================
// PixelEffect trait and EffectContext
// =============================================================================

/// Per-run context handed to every effect in a pipeline pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectContext {
    /// Seed for effects that draw random numbers. The pipeline derives a
    /// distinct seed per stack position from this value.
    pub seed: u64,
}

impl EffectContext {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Context carrying a fresh random seed.
    pub fn random() -> Self {
        Self::new(rand::random())
    }

    fn for_position(&self, position: usize) -> Self {
        Self::new(
            self.seed
                .wrapping_add((position as u64).wrapping_mul(0xA076_1D64_78BD_642F)),
        )
    }
}

/// A pixel-processing stage. Receives a layer's pixels at the layer's natural
/// size and returns a buffer of the same dimensions.
pub trait PixelEffect: Send + Sync {
    /// Process the buffer, returning the modified buffer. Takes ownership so
    /// in-place effects avoid allocating.
    fn process(&self, input: Raster, value: &EffectValue, ctx: &EffectContext) -> Raster;

    /// Returns true if `value` leaves every pixel unchanged. Identity stages
    /// are skipped by the pipeline.
    fn is_identity(&self, value: &EffectValue) -> bool {
        let _ = value;
        false
    }
}

// =============================================================================
// Built-in effects
// =============================================================================

fn scalar(value: &EffectValue) -> f64 {
    value.as_scalar().unwrap_or(0.0)
}

/// Shifts RGB channels by `value * 2.55`. Preserves alpha.
pub struct BrightnessEffect;

impl PixelEffect for BrightnessEffect {
    fn process(&self, mut input: Raster, value: &EffectValue, _ctx: &EffectContext) -> Raster {
        kernels::brightness(&mut input, scalar(value));
        input
    }

    fn is_identity(&self, value: &EffectValue) -> bool {
        scalar(value) == 0.0
    }
}

pub struct ContrastEffect;

impl PixelEffect for ContrastEffect {
    fn process(&self, mut input: Raster, value: &EffectValue, _ctx: &EffectContext) -> Raster {
        kernels::contrast(&mut input, scalar(value));
        input
    }

    fn is_identity(&self, value: &EffectValue) -> bool {
        scalar(value) == 0.0
    }
}

pub struct SaturationEffect;

impl PixelEffect for SaturationEffect {
    fn process(&self, mut input: Raster, value: &EffectValue, _ctx: &EffectContext) -> Raster {
        kernels::saturation(&mut input, scalar(value));
        input
    }

    fn is_identity(&self, value: &EffectValue) -> bool {
        scalar(value) == 0.0
    }
}

pub struct VignetteEffect;

impl PixelEffect for VignetteEffect {
    fn process(&self, mut input: Raster, value: &EffectValue, _ctx: &EffectContext) -> Raster {
        kernels::vignette(&mut input, scalar(value));
        input
    }

    fn is_identity(&self, value: &EffectValue) -> bool {
        scalar(value) <= 0.0
    }
}

/// Random luminance noise. The only stage that reads the context seed.
pub struct GrainEffect;

impl PixelEffect for GrainEffect {
    fn process(&self, mut input: Raster, value: &EffectValue, ctx: &EffectContext) -> Raster {
        kernels::grain(&mut input, scalar(value), ctx.seed);
        input
    }

    fn is_identity(&self, value: &EffectValue) -> bool {
        scalar(value) <= 0.0
    }
}

/// Pixelates by a nearest-neighbor round trip through a smaller buffer.
pub struct ResolutionEffect;

impl PixelEffect for ResolutionEffect {
    fn process(&self, mut input: Raster, value: &EffectValue, _ctx: &EffectContext) -> Raster {
        kernels::resolution(&mut input, scalar(value));
        input
    }

    fn is_identity(&self, value: &EffectValue) -> bool {
        value.as_scalar().unwrap_or(100.0) >= 100.0
    }
}

pub struct InvertEffect;

impl PixelEffect for InvertEffect {
    fn process(&self, mut input: Raster, value: &EffectValue, _ctx: &EffectContext) -> Raster {
        kernels::invert(&mut input, scalar(value));
        input
    }

    fn is_identity(&self, value: &EffectValue) -> bool {
        scalar(value) <= 0.0
    }
}

pub struct SharpenEffect;

impl PixelEffect for SharpenEffect {
    fn process(&self, mut input: Raster, value: &EffectValue, _ctx: &EffectContext) -> Raster {
        kernels::sharpen(&mut input, scalar(value));
        input
    }

    fn is_identity(&self, value: &EffectValue) -> bool {
        scalar(value) <= 0.0
    }
}

pub struct SepiaEffect;

impl PixelEffect for SepiaEffect {
    fn process(&self, mut input: Raster, value: &EffectValue, _ctx: &EffectContext) -> Raster {
        kernels::sepia(&mut input, scalar(value));
        input
    }

    fn is_identity(&self, value: &EffectValue) -> bool {
        scalar(value) <= 0.0
    }
}

/// Luminance-weighted color wash.
pub struct TintEffect;

impl PixelEffect for TintEffect {
    fn process(&self, mut input: Raster, value: &EffectValue, _ctx: &EffectContext) -> Raster {
        if let EffectValue::Tint { color, mix } = value {
            kernels::tint(&mut input, *color, *mix);
        }
        input
    }

    fn is_identity(&self, value: &EffectValue) -> bool {
        match value {
            EffectValue::Tint { mix, .. } => *mix <= 0.0,
            _ => true,
        }
    }
}

/// Two-color luminance ramp. Replace and overlay modes blend the same way.
pub struct DuotoneEffect;

impl PixelEffect for DuotoneEffect {
    fn process(&self, mut input: Raster, value: &EffectValue, _ctx: &EffectContext) -> Raster {
        if let EffectValue::Duotone {
            color_a,
            color_b,
            mix,
            ..
        } = value
        {
            kernels::duotone(&mut input, *color_a, *color_b, *mix);
        }
        input
    }

    fn is_identity(&self, value: &EffectValue) -> bool {
        match value {
            EffectValue::Duotone { mix, .. } => *mix <= 0.0,
            _ => true,
        }
    }
}

pub struct HalftoneEffect;

impl PixelEffect for HalftoneEffect {
    fn process(&self, mut input: Raster, value: &EffectValue, _ctx: &EffectContext) -> Raster {
        if let EffectValue::Halftone(params) = value {
            kernels::halftone(&mut input, params);
        }
        input
    }

    fn is_identity(&self, value: &EffectValue) -> bool {
        !matches!(value, EffectValue::Halftone(_))
    }
}

// =============================================================================
// Effect Registry
// =============================================================================

/// Maps each [`EffectKind`] to the stage that implements it.
pub struct EffectRegistry {
    effects: HashMap<EffectKind, Box<dyn PixelEffect>>,
}

impl EffectRegistry {
    /// Create a registry with every built-in kind registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self {
            effects: HashMap::new(),
        };
        registry.register(EffectKind::Brightness, Box::new(BrightnessEffect));
        registry.register(EffectKind::Contrast, Box::new(ContrastEffect));
        registry.register(EffectKind::Saturation, Box::new(SaturationEffect));
        registry.register(EffectKind::Vignette, Box::new(VignetteEffect));
        registry.register(EffectKind::Grain, Box::new(GrainEffect));
        registry.register(EffectKind::Resolution, Box::new(ResolutionEffect));
        registry.register(EffectKind::Invert, Box::new(InvertEffect));
        registry.register(EffectKind::Duotone, Box::new(DuotoneEffect));
        registry.register(EffectKind::Sharpen, Box::new(SharpenEffect));
        registry.register(EffectKind::Sepia, Box::new(SepiaEffect));
        registry.register(EffectKind::Tint, Box::new(TintEffect));
        registry.register(EffectKind::Halftone, Box::new(HalftoneEffect));
        registry
    }

    pub fn get(&self, kind: &EffectKind) -> Option<&dyn PixelEffect> {
        self.effects.get(kind).map(|e| e.as_ref())
    }

    /// Register or replace the stage for `kind`.
    pub fn register(&mut self, kind: EffectKind, effect: Box<dyn PixelEffect>) {
        self.effects.insert(kind, effect);
    }
}

impl Default for EffectRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl std::fmt::Debug for EffectRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectRegistry")
            .field("kinds", &self.effects.keys().collect::<Vec<_>>())
            .finish()
    }
}

// =============================================================================
// Pipeline
// =============================================================================

/// Output of one pipeline pass.
pub struct PipelineResult {
    pub raster: Raster,
    /// Number of stages that actually touched pixels.
    pub applied: usize,
}

/// Run `effects` in stack order over `input`.
///
/// Each stage sees the previous stage's output. Identity stages and kinds
/// missing from the registry are skipped.
pub fn run_effect_pipeline(
    input: Raster,
    effects: &[EffectInstance],
    registry: &EffectRegistry,
    ctx: &EffectContext,
) -> PipelineResult {
    let mut raster = input;
    let mut applied = 0;

    for (position, effect) in effects.iter().enumerate() {
        let Some(stage) = registry.get(&effect.kind) else {
            trace!(kind = ?effect.kind, "no stage registered, skipping");
            continue;
        };
        if stage.is_identity(&effect.value) {
            continue;
        }
        raster = stage.process(raster, &effect.value, &ctx.for_position(position));
        applied += 1;
    }

    PipelineResult { raster, applied }
}

// =============================================================================
// Tests
// =============================================================================
