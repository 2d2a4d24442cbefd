use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::effects::{EffectInstance, EffectKind};
use crate::error::{CoreError, Result};
use crate::geometry::Rect;
use crate::pipeline::{EffectContext, EffectRegistry, run_effect_pipeline};
use crate::raster::Raster;

// =============================================================================
// Source image
// =============================================================================

/// Whether the pixels behind a source image may be read back for processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelAccess {
    #[default]
    Readable,
    /// Pixels can be drawn but not read (e.g. a cross-origin image in a
    /// browser host). Effects are skipped for such layers.
    Tainted,
}

/// Decoded image backing a layer. Treated as immutable; geometry commits
/// replace it with a new one.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pixels: Arc<Raster>,
    access: PixelAccess,
}

impl SourceImage {
    pub fn new(pixels: Raster) -> Self {
        Self {
            pixels: Arc::new(pixels),
            access: PixelAccess::Readable,
        }
    }

    pub fn with_access(mut self, access: PixelAccess) -> Self {
        self.access = access;
        self
    }

    pub fn pixels(&self) -> &Raster {
        &self.pixels
    }

    pub fn access(&self) -> PixelAccess {
        self.access
    }

    pub fn width(&self) -> u32 {
        self.pixels.width
    }

    pub fn height(&self) -> u32 {
        self.pixels.height
    }
}

// =============================================================================
// Layer
// =============================================================================

#[derive(Debug, Clone)]
struct CacheEntry {
    raster: Arc<Raster>,
    width: u32,
    height: u32,
}

/// One raster in the stack: source pixels, placement, effect chain and the
/// memoized processed result.
///
/// Geometry and effect fields are only mutable inside the crate so every
/// change goes through the session, which dirties the layer afterwards.
#[derive(Debug, Clone)]
pub struct Layer {
    id: Uuid,
    name: String,
    source: SourceImage,
    natural_width: u32,
    natural_height: u32,
    x: i64,
    y: i64,
    placed: bool,
    effects: Vec<EffectInstance>,
    cache: Option<CacheEntry>,
    dirty: bool,
}

impl Layer {
    /// Create an unplaced layer whose natural size is the source size.
    pub fn new(name: impl Into<String>, source: SourceImage) -> Result<Self> {
        if source.pixels.is_empty() {
            return Err(CoreError::EmptyRaster {
                width: source.width(),
                height: source.height(),
            });
        }
        Ok(Self {
            id: Uuid::new_v4(),
            name: name.into(),
            natural_width: source.width(),
            natural_height: source.height(),
            source,
            x: 0,
            y: 0,
            placed: false,
            effects: Vec::new(),
            cache: None,
            dirty: true,
        })
    }

    pub fn from_raster(name: impl Into<String>, raster: Raster) -> Result<Self> {
        Self::new(name, SourceImage::new(raster))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &SourceImage {
        &self.source
    }

    pub fn natural_width(&self) -> u32 {
        self.natural_width
    }

    pub fn natural_height(&self) -> u32 {
        self.natural_height
    }

    pub fn natural_size(&self) -> (u32, u32) {
        (self.natural_width, self.natural_height)
    }

    pub fn position(&self) -> (i64, i64) {
        (self.x, self.y)
    }

    /// Footprint on the canvas.
    pub fn bounds(&self) -> Rect {
        Rect::from_xywh(
            self.x,
            self.y,
            self.natural_width as i64,
            self.natural_height as i64,
        )
    }

    pub fn is_placed(&self) -> bool {
        self.placed
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn effects(&self) -> &[EffectInstance] {
        &self.effects
    }

    pub fn effect(&self, effect_id: Uuid) -> Option<&EffectInstance> {
        self.effects.iter().find(|e| e.id == effect_id)
    }

    pub fn has_effect(&self, kind: EffectKind) -> bool {
        self.effects.iter().any(|e| e.kind == kind)
    }

    // ---- crate-internal mutation -------------------------------------------

    pub(crate) fn set_position(&mut self, x: i64, y: i64) {
        self.x = x;
        self.y = y;
        self.placed = true;
    }

    /// Change the on-canvas size without touching the source. The cache
    /// rescales the source until the next resample commit.
    pub(crate) fn set_natural_size(&mut self, width: u32, height: u32) {
        self.natural_width = width.max(1);
        self.natural_height = height.max(1);
    }

    pub(crate) fn effects_mut(&mut self) -> &mut Vec<EffectInstance> {
        &mut self.effects
    }

    /// Swap in new source pixels. Natural size follows the new source.
    pub(crate) fn replace_source(&mut self, pixels: Raster) {
        self.natural_width = pixels.width;
        self.natural_height = pixels.height;
        self.source = SourceImage {
            pixels: Arc::new(pixels),
            access: self.source.access,
        };
    }

    /// Map a canvas-space rectangle inside this layer's footprint onto the
    /// source image, which may be larger or smaller than the natural size.
    pub(crate) fn canvas_to_source(&self, rect: Rect) -> Rect {
        let sx = self.source.width() as f64 / self.natural_width as f64;
        let sy = self.source.height() as f64 / self.natural_height as f64;
        let left = ((rect.left - self.x) as f64 * sx).round() as i64;
        let top = ((rect.top - self.y) as f64 * sy).round() as i64;
        let width = ((rect.width() as f64 * sx).round() as i64).max(1);
        let height = ((rect.height() as f64 * sy).round() as i64).max(1);
        Rect::from_xywh(left, top, width, height)
    }

    /// Mark the cached pixels stale. Only the session's invalidation pass
    /// calls this.
    pub(crate) fn invalidate(&mut self) {
        self.dirty = true;
    }

    // ---- cache --------------------------------------------------------------

    /// Processed pixels at natural size, rebuilding when stale.
    ///
    /// A tainted source, or a source that cannot be scaled to natural size,
    /// degrades to the unprocessed pixels with a warning. Only a source that
    /// cannot be drawn at all is an error.
    pub fn processed_raster(
        &mut self,
        registry: &EffectRegistry,
        ctx: &EffectContext,
    ) -> Result<Arc<Raster>> {
        if !self.dirty {
            if let Some(entry) = &self.cache {
                if (entry.width, entry.height) == self.natural_size() {
                    return Ok(Arc::clone(&entry.raster));
                }
            }
        }

        let scaled = match self
            .source
            .pixels
            .scaled_nearest(self.natural_width, self.natural_height)
        {
            Ok(scaled) => scaled,
            Err(err) if !self.source.pixels.is_empty() => {
                warn!(layer = %self.id, error = %err, "scaling to natural size failed, drawing raw source");
                (*self.source.pixels).clone()
            }
            Err(err) => return Err(err),
        };

        let processed = if self.effects.is_empty() {
            scaled
        } else if self.source.access == PixelAccess::Tainted {
            warn!(layer = %self.id, "pixel read-back refused, effects skipped");
            scaled
        } else {
            let result = run_effect_pipeline(scaled, &self.effects, registry, ctx);
            debug!(layer = %self.id, stages = result.applied, "effect chain applied");
            result.raster
        };

        let entry = CacheEntry {
            width: processed.width,
            height: processed.height,
            raster: Arc::new(processed),
        };
        let raster = Arc::clone(&entry.raster);
        self.cache = Some(entry);
        self.dirty = false;
        debug!(layer = %self.id, width = raster.width, height = raster.height, "layer cache rebuilt");
        Ok(raster)
    }
}
