use std::fmt;
use std::time::{Duration, Instant};

use tracing::{debug, info};
use uuid::Uuid;

use crate::compositor::{RenderStats, render_all};
use crate::config::EditorConfig;
use crate::effects::{EffectInstance, EffectKind, EffectValue};
use crate::error::{CoreError, Result};
use crate::geometry::{
    DisplayMapping, Edge, Handle, Point, Rect, center_offset, clamp_position,
};
use crate::interaction::{
    CropSession, CropTarget, DragSession, EdgeDrag, EdgeOffsets, InteractionMode, ResizeGesture,
    ResizeRect, ResizeSession,
};
use crate::layer::{Layer, SourceImage};
use crate::pipeline::{EffectContext, EffectRegistry};
use crate::raster::Raster;
use crate::scheduler::RenderScheduler;

// =============================================================================
// Commands and outcomes
// =============================================================================

/// A state change requested by the host.
#[derive(Debug, Clone)]
pub enum Command {
    /// Append a layer on top and select it. The first layer becomes the base.
    AddLayer { name: String, source: SourceImage },
    RemoveLayer(Uuid),
    SelectLayer(Uuid),
    /// Move a non-base layer to another non-base stack index.
    ReorderLayer { layer_id: Uuid, to_index: usize },
    /// Append an effect to a layer's chain, with the catalog default when
    /// `value` is `None`.
    AddEffect {
        layer_id: Uuid,
        kind: EffectKind,
        value: Option<EffectValue>,
    },
    RemoveEffect(Uuid),
    UpdateEffect { effect_id: Uuid, value: EffectValue },
    /// Place a non-base layer, clamped so it keeps overlapping the canvas.
    MoveLayer { layer_id: Uuid, x: i64, y: i64 },
    /// Resample a non-base layer. A missing dimension follows the aspect ratio.
    ResizeLayer {
        layer_id: Uuid,
        width: Option<u32>,
        height: Option<u32>,
    },
    /// Drop every layer and return to idle.
    Reset,
}

/// Which layers a change touched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Affected {
    /// Layers whose processed pixels are stale.
    pub dirty: Vec<Uuid>,
    /// Whether the composite (or an overlay) needs repainting.
    pub redraw: bool,
    /// Id of a layer or effect created by the change.
    pub created: Option<Uuid>,
    /// Quiet period before reprocessing. `None` renders on the next frame.
    pub debounce: Option<Duration>,
}

impl Affected {
    fn nothing() -> Self {
        Self::default()
    }

    fn redraw() -> Self {
        Self {
            redraw: true,
            ..Self::default()
        }
    }

    fn layer(id: Uuid) -> Self {
        Self {
            dirty: vec![id],
            redraw: true,
            ..Self::default()
        }
    }

    fn with_created(mut self, id: Uuid) -> Self {
        self.created = Some(id);
        self
    }
}

/// A guarded no-op. Carries the refusal shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    ModalSessionActive { mode: &'static str },
    NotInMode { expected: &'static str },
    ResolutionAlreadyApplied,
    BaseLayerLocked,
    EmptyIntersection,
    NoLayers,
    NoSelection,
    NoDimensions,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ModalSessionActive { mode } => {
                write!(f, "Finish the current {mode} session first.")
            }
            Self::NotInMode { expected } => write!(f, "No {expected} session is active."),
            Self::ResolutionAlreadyApplied => f.write_str("Resolution can only be applied once."),
            Self::BaseLayerLocked => {
                f.write_str("The base layer cannot be moved, resized or pixelated.")
            }
            Self::EmptyIntersection => f.write_str("The crop area does not overlap the layer."),
            Self::NoLayers => f.write_str("Please add at least one layer/image first!"),
            Self::NoSelection => f.write_str("Select a layer first."),
            Self::NoDimensions => f.write_str("Enter a width or a height."),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Applied(Affected),
    Rejected(Rejection),
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            Self::Rejected(r) => Some(*r),
            Self::Applied(_) => None,
        }
    }

    /// Id of the layer or effect this outcome created, if any.
    pub fn created(&self) -> Option<Uuid> {
        match self {
            Self::Applied(a) => a.created,
            Self::Rejected(_) => None,
        }
    }
}

// =============================================================================
// EditorSession
// =============================================================================

/// All editor state: the layer stack, selection, the active interaction and
/// the output surface.
///
/// Every mutation runs through [`EditorSession::apply`], which is the only
/// place layers are marked dirty and renders are scheduled.
#[derive(Debug)]
pub struct EditorSession {
    layers: Vec<Layer>,
    selected: Option<Uuid>,
    mode: InteractionMode,
    surface: Raster,
    registry: EffectRegistry,
    config: EditorConfig,
    display_size: Option<(f64, f64)>,
    scheduler: RenderScheduler,
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorSession {
    pub fn new() -> Self {
        Self {
            layers: Vec::new(),
            selected: None,
            mode: InteractionMode::Idle,
            surface: Raster::new(0, 0),
            registry: EffectRegistry::with_builtins(),
            config: EditorConfig::default(),
            display_size: None,
            scheduler: RenderScheduler::new(),
        }
    }

    pub fn with_config(config: EditorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new()
        })
    }

    // ---- queries -------------------------------------------------------------

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, id: Uuid) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id() == id)
    }

    pub fn base(&self) -> Option<&Layer> {
        self.layers.first()
    }

    pub fn selected(&self) -> Option<Uuid> {
        self.selected
    }

    pub fn mode(&self) -> &InteractionMode {
        &self.mode
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &RenderScheduler {
        &self.scheduler
    }

    /// The flattened output of the last render pass.
    pub fn surface(&self) -> &Raster {
        &self.surface
    }

    /// Output size, fixed by the base layer.
    pub fn canvas_size(&self) -> Option<(u32, u32)> {
        self.base().map(Layer::natural_size)
    }

    /// Total resolution instances across the stack. Never exceeds one.
    pub fn resolution_count(&self) -> usize {
        self.layers
            .iter()
            .flat_map(|l| l.effects())
            .filter(|e| e.kind == EffectKind::Resolution)
            .count()
    }

    /// Current crop rectangle in canvas pixels, while cropping.
    pub fn crop_rect(&self) -> Option<Rect> {
        match (&self.mode, self.canvas_size()) {
            (InteractionMode::Cropping(crop), Some(canvas)) => Some(crop.rect(canvas)),
            _ => None,
        }
    }

    /// Current resize rectangle, while a rectangle resize is open.
    pub fn resize_rect(&self) -> Option<ResizeRect> {
        match &self.mode {
            InteractionMode::Resizing(ResizeSession {
                gesture: ResizeGesture::Rectangle { rect, .. },
                ..
            }) => Some(*rect),
            _ => None,
        }
    }

    /// Set the size the canvas is displayed at, for pointer mapping.
    pub fn set_display_size(&mut self, width: f64, height: f64) {
        self.display_size = Some((width, height));
    }

    pub fn display_mapping(&self) -> Option<DisplayMapping> {
        let (cw, ch) = self.canvas_size()?;
        Some(match self.display_size {
            Some((dw, dh)) => DisplayMapping::new(cw, ch, dw, dh),
            None => DisplayMapping::identity(cw, ch),
        })
    }

    /// Topmost layer under a display-space point. Non-base layers win; the
    /// base is reported only when nothing else covers the point.
    pub fn layer_at(&self, point: Point) -> Option<Uuid> {
        let (x, y) = self.display_mapping()?.to_canvas_px(point);
        self.movable_layer_at(x, y).or_else(|| {
            self.base()
                .filter(|b| b.bounds().hit_test(x, y))
                .map(Layer::id)
        })
    }

    fn movable_layer_at(&self, x: i64, y: i64) -> Option<Uuid> {
        self.layers
            .iter()
            .skip(1)
            .rev()
            .find(|l| l.bounds().hit_test(x, y))
            .map(Layer::id)
    }

    fn index_of(&self, id: Uuid) -> Result<usize> {
        self.layers
            .iter()
            .position(|l| l.id() == id)
            .ok_or(CoreError::LayerNotFound(id))
    }

    fn effect_owner(&self, effect_id: Uuid) -> Result<usize> {
        self.layers
            .iter()
            .position(|l| l.effect(effect_id).is_some())
            .ok_or(CoreError::EffectNotFound(effect_id))
    }

    fn require_idle(&self) -> Option<Rejection> {
        (!self.mode.is_idle()).then(|| Rejection::ModalSessionActive {
            mode: self.mode.name(),
        })
    }

    // ---- rendering -----------------------------------------------------------

    fn effect_context(&self) -> EffectContext {
        self.config
            .grain_seed
            .map(EffectContext::new)
            .unwrap_or_else(EffectContext::random)
    }

    /// Composite every layer onto the surface now.
    pub fn render(&mut self) -> RenderStats {
        let ctx = self.effect_context();
        self.scheduler.mark_rendered();
        render_all(&mut self.layers, &mut self.surface, &self.registry, &ctx)
    }

    /// Render if the scheduler says a frame or debounced pass is due.
    pub fn tick(&mut self, now: Instant) -> Option<RenderStats> {
        if self.scheduler.is_idle() {
            return None;
        }
        self.scheduler.poll(now).then(|| self.render())
    }

    // ---- mutation core -------------------------------------------------------

    /// Run one mutation and settle its effects: dirty the affected layers
    /// and schedule a render.
    fn apply<F>(&mut self, now: Instant, f: F) -> Result<Outcome>
    where
        F: FnOnce(&mut Self) -> Result<Outcome>,
    {
        self.place_unplaced();
        let outcome = f(self)?;
        self.place_unplaced();
        match &outcome {
            Outcome::Applied(affected) => {
                self.invalidate(affected);
                match affected.debounce {
                    Some(delay) => self.scheduler.value_changed(now, delay),
                    None if affected.redraw || !affected.dirty.is_empty() => {
                        self.scheduler.request_frame();
                    }
                    None => {}
                }
            }
            Outcome::Rejected(reason) => debug!(%reason, "change rejected"),
        }
        Ok(outcome)
    }

    /// Pin the base to the origin and center every layer that has never been
    /// positioned, so geometry reads real footprints before the first render.
    fn place_unplaced(&mut self) {
        let Some((canvas_w, canvas_h)) = self.canvas_size() else {
            return;
        };
        for (idx, layer) in self.layers.iter_mut().enumerate() {
            if idx == 0 {
                if layer.position() != (0, 0) || !layer.is_placed() {
                    layer.set_position(0, 0);
                }
            } else if !layer.is_placed() {
                let (lw, lh) = layer.natural_size();
                layer.set_position(center_offset(canvas_w, lw), center_offset(canvas_h, lh));
            }
        }
    }

    /// The single writer of layer dirty flags.
    fn invalidate(&mut self, affected: &Affected) {
        for layer in self
            .layers
            .iter_mut()
            .filter(|l| affected.dirty.contains(&l.id()))
        {
            layer.invalidate();
        }
    }

    pub fn execute(&mut self, command: Command) -> Result<Outcome> {
        self.execute_at(command, Instant::now())
    }

    /// Execute with an explicit clock, for debounce timing.
    pub fn execute_at(&mut self, command: Command, now: Instant) -> Result<Outcome> {
        self.apply(now, |session| session.run(command))
    }

    fn run(&mut self, command: Command) -> Result<Outcome> {
        let gated = !matches!(command, Command::UpdateEffect { .. } | Command::Reset);
        if gated {
            if let Some(rejection) = self.require_idle() {
                return Ok(Outcome::Rejected(rejection));
            }
        }

        match command {
            Command::AddLayer { name, source } => {
                let layer = Layer::new(name, source)?;
                let id = layer.id();
                debug!(layer = %id, width = layer.natural_width(), height = layer.natural_height(), "layer added");
                self.layers.push(layer);
                self.selected = Some(id);
                Ok(Outcome::Applied(Affected::layer(id).with_created(id)))
            }
            Command::RemoveLayer(id) => {
                let idx = self.index_of(id)?;
                self.layers.remove(idx);
                if self.selected == Some(id) {
                    self.selected = self.base().map(Layer::id);
                }
                Ok(Outcome::Applied(Affected::redraw()))
            }
            Command::SelectLayer(id) => {
                self.index_of(id)?;
                self.selected = Some(id);
                Ok(Outcome::Applied(Affected::redraw()))
            }
            Command::ReorderLayer { layer_id, to_index } => {
                let from = self.index_of(layer_id)?;
                if from == 0 || to_index == 0 {
                    return Ok(Outcome::Rejected(Rejection::BaseLayerLocked));
                }
                let to = to_index.min(self.layers.len() - 1);
                let layer = self.layers.remove(from);
                self.layers.insert(to, layer);
                Ok(Outcome::Applied(Affected::redraw()))
            }
            Command::AddEffect {
                layer_id,
                kind,
                value,
            } => self.add_effect(layer_id, kind, value),
            Command::RemoveEffect(effect_id) => {
                let idx = self.effect_owner(effect_id)?;
                let layer = &mut self.layers[idx];
                layer.effects_mut().retain(|e| e.id != effect_id);
                Ok(Outcome::Applied(Affected::layer(layer.id())))
            }
            Command::UpdateEffect { effect_id, value } => self.update_effect(effect_id, value),
            Command::MoveLayer { layer_id, x, y } => {
                let idx = self.index_of(layer_id)?;
                if idx == 0 {
                    return Ok(Outcome::Rejected(Rejection::BaseLayerLocked));
                }
                let canvas = self.canvas_size().unwrap_or_default();
                let layer = &mut self.layers[idx];
                let (x, y) = clamp_position(x, y, layer.natural_size(), canvas);
                layer.set_position(x, y);
                Ok(Outcome::Applied(Affected::redraw()))
            }
            Command::ResizeLayer {
                layer_id,
                width,
                height,
            } => self.resize_layer(layer_id, width, height),
            Command::Reset => {
                self.layers.clear();
                self.selected = None;
                self.mode = InteractionMode::Idle;
                info!("session reset");
                Ok(Outcome::Applied(Affected::redraw()))
            }
        }
    }

    fn add_effect(
        &mut self,
        layer_id: Uuid,
        kind: EffectKind,
        value: Option<EffectValue>,
    ) -> Result<Outcome> {
        let idx = self.index_of(layer_id)?;
        if kind == EffectKind::Resolution {
            if idx == 0 {
                return Ok(Outcome::Rejected(Rejection::BaseLayerLocked));
            }
            if self.resolution_count() > 0 {
                return Ok(Outcome::Rejected(Rejection::ResolutionAlreadyApplied));
            }
        }
        let instance = match value {
            Some(value) => EffectInstance::with_value(kind, value)?,
            None => EffectInstance::new(kind),
        };
        let effect_id = instance.id;
        self.layers[idx].effects_mut().push(instance);
        debug!(layer = %layer_id, effect = %effect_id, ?kind, "effect added");
        Ok(Outcome::Applied(
            Affected::layer(layer_id).with_created(effect_id),
        ))
    }

    fn update_effect(&mut self, effect_id: Uuid, value: EffectValue) -> Result<Outcome> {
        let idx = self.effect_owner(effect_id)?;
        let layer = &mut self.layers[idx];
        let layer_id = layer.id();
        let Some(effect) = layer.effects_mut().iter_mut().find(|e| e.id == effect_id) else {
            return Err(CoreError::EffectNotFound(effect_id));
        };
        let before = effect.value.clone();
        effect.set_value(value)?;

        let debounce = if before.color_changed(&effect.value) {
            self.config.color_debounce()
        } else if before.as_scalar().is_some() {
            self.config.render_debounce()
        } else {
            self.config.mix_debounce()
        };
        Ok(Outcome::Applied(Affected {
            debounce: Some(debounce),
            ..Affected::layer(layer_id)
        }))
    }

    fn resize_layer(
        &mut self,
        layer_id: Uuid,
        width: Option<u32>,
        height: Option<u32>,
    ) -> Result<Outcome> {
        let idx = self.index_of(layer_id)?;
        if idx == 0 {
            return Ok(Outcome::Rejected(Rejection::BaseLayerLocked));
        }
        let (cur_w, cur_h) = self.layers[idx].natural_size();
        let (new_w, new_h) = match (width, height) {
            (None, None) => return Ok(Outcome::Rejected(Rejection::NoDimensions)),
            (Some(w), Some(h)) => (w, h),
            (Some(w), None) => (w, scale_dim(cur_h, w, cur_w)),
            (None, Some(h)) => (scale_dim(cur_w, h, cur_h), h),
        };
        let (new_w, new_h) = (new_w.max(1), new_h.max(1));

        let canvas = self.canvas_size().unwrap_or_default();
        let filter = self.config.resample_filter;
        let layer = &mut self.layers[idx];
        let resampled = layer.source().pixels().resample(new_w, new_h, filter)?;
        layer.replace_source(resampled);
        let (x, y) = layer.position();
        let (x, y) = clamp_position(x, y, (new_w, new_h), canvas);
        layer.set_position(x, y);
        info!(layer = %layer_id, width = new_w, height = new_h, "layer resized");
        Ok(Outcome::Applied(Affected::layer(layer_id)))
    }

    // ---- pointer interaction -------------------------------------------------

    fn pointer_px(&self, point: Point) -> Option<(i64, i64)> {
        self.display_mapping().map(|m| m.to_canvas_px(point))
    }

    /// Press on the canvas: select and start dragging the topmost non-base
    /// layer under the pointer.
    pub fn pointer_down(&mut self, point: Point) -> Result<Outcome> {
        self.apply(Instant::now(), |s| {
            if let Some(rejection) = s.require_idle() {
                return Ok(Outcome::Rejected(rejection));
            }
            let Some(pointer) = s.pointer_px(point) else {
                return Ok(Outcome::Rejected(Rejection::NoLayers));
            };
            let Some(id) = s.movable_layer_at(pointer.0, pointer.1) else {
                return Ok(Outcome::Applied(Affected::nothing()));
            };
            let idx = s.index_of(id)?;
            s.selected = Some(id);
            s.mode = InteractionMode::Dragging(DragSession {
                layer_id: id,
                start: pointer,
                origin: s.layers[idx].position(),
            });
            Ok(Outcome::Applied(Affected::redraw()))
        })
    }

    /// Press on a corner handle of the selected layer.
    pub fn begin_handle_resize(&mut self, handle: Handle, point: Point) -> Result<Outcome> {
        self.apply(Instant::now(), |s| {
            if let Some(rejection) = s.require_idle() {
                return Ok(Outcome::Rejected(rejection));
            }
            let Some(id) = s.selected else {
                return Ok(Outcome::Rejected(Rejection::NoSelection));
            };
            let idx = s.index_of(id)?;
            if idx == 0 {
                return Ok(Outcome::Rejected(Rejection::BaseLayerLocked));
            }
            let Some(pointer) = s.pointer_px(point) else {
                return Ok(Outcome::Rejected(Rejection::NoLayers));
            };
            s.mode = InteractionMode::Resizing(ResizeSession {
                layer_id: id,
                gesture: ResizeGesture::Handle {
                    handle,
                    start_pointer: pointer,
                    start: s.layers[idx].bounds(),
                },
            });
            Ok(Outcome::Applied(Affected::nothing()))
        })
    }

    pub fn pointer_move(&mut self, point: Point) -> Result<Outcome> {
        self.apply(Instant::now(), |s| s.track_pointer(point))
    }

    fn track_pointer(&mut self, point: Point) -> Result<Outcome> {
        let (Some(mapping), Some(canvas)) = (self.display_mapping(), self.canvas_size()) else {
            return Ok(Outcome::Applied(Affected::nothing()));
        };
        let pointer = mapping.to_canvas_px(point);

        match &mut self.mode {
            InteractionMode::Idle => Ok(Outcome::Applied(Affected::nothing())),
            InteractionMode::Dragging(drag) => {
                let drag = *drag;
                let idx = self.index_of(drag.layer_id)?;
                let layer = &mut self.layers[idx];
                let (x, y) = drag.position_for(pointer, layer.natural_size(), canvas);
                layer.set_position(x, y);
                Ok(Outcome::Applied(Affected::redraw()))
            }
            InteractionMode::Resizing(ResizeSession {
                layer_id,
                gesture:
                    ResizeGesture::Handle {
                        handle,
                        start_pointer,
                        start,
                    },
            }) => {
                let footprint = ResizeGesture::handle_footprint(
                    *handle,
                    *start,
                    *start_pointer,
                    pointer,
                    canvas,
                    self.config.min_resize_dimension,
                    self.config.max_resize_dimension,
                );
                let layer_id = *layer_id;
                let idx = self.index_of(layer_id)?;
                let layer = &mut self.layers[idx];
                layer.set_natural_size(footprint.width() as u32, footprint.height() as u32);
                layer.set_position(footprint.left, footprint.top);
                Ok(Outcome::Applied(Affected::layer(layer_id)))
            }
            InteractionMode::Resizing(ResizeSession {
                gesture: ResizeGesture::Rectangle { rect, active },
                ..
            }) => {
                if let Some(drag) = active {
                    let start = mapping.to_canvas(drag.start_pointer);
                    let now = mapping.to_canvas(point);
                    let delta = match drag.edge {
                        Edge::Left | Edge::Right => now.x - start.x,
                        Edge::Top | Edge::Bottom => now.y - start.y,
                    };
                    rect.drag_edge(drag.edge, drag.start_value, delta);
                }
                Ok(Outcome::Applied(Affected::redraw()))
            }
            InteractionMode::Cropping(crop) => {
                let Some(drag) = crop.active else {
                    return Ok(Outcome::Applied(Affected::nothing()));
                };
                let start = mapping.to_canvas(drag.start_pointer);
                let now = mapping.to_canvas(point);
                let delta = match drag.edge {
                    Edge::Left | Edge::Right => now.x - start.x,
                    Edge::Top | Edge::Bottom => now.y - start.y,
                };
                let bounds = match crop.target {
                    CropTarget::Base => None,
                    CropTarget::Layer(id) => self
                        .layers
                        .iter()
                        .find(|l| l.id() == id)
                        .map(Layer::bounds),
                };
                crop.drag_edge(
                    drag.edge,
                    drag.start_value as i64,
                    delta.round() as i64,
                    canvas,
                    bounds,
                );
                Ok(Outcome::Applied(Affected::redraw()))
            }
        }
    }

    /// Release the pointer. Ends a drag, commits a handle resize by
    /// resampling, and releases any held crop or resize edge.
    pub fn pointer_up(&mut self) -> Result<Outcome> {
        self.apply(Instant::now(), |s| {
            match std::mem::take(&mut s.mode) {
                InteractionMode::Idle => Ok(Outcome::Applied(Affected::nothing())),
                InteractionMode::Dragging(_) => Ok(Outcome::Applied(Affected::redraw())),
                InteractionMode::Resizing(ResizeSession {
                    layer_id,
                    gesture: ResizeGesture::Handle { .. },
                }) => s.resample_to_natural(layer_id),
                InteractionMode::Resizing(mut session) => {
                    if let ResizeGesture::Rectangle { active, .. } = &mut session.gesture {
                        *active = None;
                    }
                    s.mode = InteractionMode::Resizing(session);
                    Ok(Outcome::Applied(Affected::nothing()))
                }
                InteractionMode::Cropping(mut crop) => {
                    crop.active = None;
                    s.mode = InteractionMode::Cropping(crop);
                    Ok(Outcome::Applied(Affected::nothing()))
                }
            }
        })
    }

    fn resample_to_natural(&mut self, layer_id: Uuid) -> Result<Outcome> {
        let idx = self.index_of(layer_id)?;
        let filter = self.config.resample_filter;
        let layer = &mut self.layers[idx];
        let (w, h) = layer.natural_size();
        let resampled = layer.source().pixels().resample(w, h, filter)?;
        layer.replace_source(resampled);
        info!(layer = %layer_id, width = w, height = h, "handle resize committed");
        Ok(Outcome::Applied(Affected::layer(layer_id)))
    }

    // ---- resize rectangle ----------------------------------------------------

    /// Open the rectangle resize for `target`, or the selected layer.
    pub fn start_resize_session(&mut self, target: Option<Uuid>) -> Result<Outcome> {
        self.apply(Instant::now(), |s| {
            if let Some(rejection) = s.require_idle() {
                return Ok(Outcome::Rejected(rejection));
            }
            let Some(id) = target.or(s.selected) else {
                return Ok(Outcome::Rejected(Rejection::NoSelection));
            };
            let idx = s.index_of(id)?;
            if idx == 0 {
                return Ok(Outcome::Rejected(Rejection::BaseLayerLocked));
            }
            s.mode = InteractionMode::Resizing(ResizeSession {
                layer_id: id,
                gesture: ResizeGesture::Rectangle {
                    rect: ResizeRect::from_rect(s.layers[idx].bounds()),
                    active: None,
                },
            });
            Ok(Outcome::Applied(Affected::redraw()))
        })
    }

    /// Press on one edge bar of the resize rectangle.
    pub fn begin_resize_edge(&mut self, edge: Edge, point: Point) -> Result<Outcome> {
        self.apply(Instant::now(), |s| match &mut s.mode {
            InteractionMode::Resizing(ResizeSession {
                gesture: ResizeGesture::Rectangle { rect, active },
                ..
            }) => {
                *active = Some(EdgeDrag {
                    edge,
                    start_pointer: point,
                    start_value: rect.edge_value(edge),
                });
                Ok(Outcome::Applied(Affected::nothing()))
            }
            _ => Ok(Outcome::Rejected(Rejection::NotInMode {
                expected: "resize",
            })),
        })
    }

    /// Replace the resize rectangle directly. Each edge keeps at least one
    /// pixel from its opposite.
    pub fn set_resize_rect(&mut self, target: Rect) -> Result<Outcome> {
        self.apply(Instant::now(), |s| match &mut s.mode {
            InteractionMode::Resizing(ResizeSession {
                gesture: ResizeGesture::Rectangle { rect, .. },
                ..
            }) => {
                let t = ResizeRect::from_rect(target);
                for (edge, value) in [
                    (Edge::Left, t.left),
                    (Edge::Top, t.top),
                    (Edge::Right, t.right),
                    (Edge::Bottom, t.bottom),
                ] {
                    rect.drag_edge(edge, value, 0.0);
                }
                Ok(Outcome::Applied(Affected::redraw()))
            }
            _ => Ok(Outcome::Rejected(Rejection::NotInMode {
                expected: "resize",
            })),
        })
    }

    /// Resample the layer to the rectangle and move it to the rectangle's
    /// top-left corner.
    pub fn apply_resize(&mut self) -> Result<Outcome> {
        self.apply(Instant::now(), |s| {
            let InteractionMode::Resizing(ResizeSession {
                layer_id,
                gesture: ResizeGesture::Rectangle { rect, .. },
            }) = &s.mode
            else {
                return Ok(Outcome::Rejected(Rejection::NotInMode {
                    expected: "resize",
                }));
            };
            let (layer_id, target) = (*layer_id, rect.committed());
            s.mode = InteractionMode::Idle;

            let idx = s.index_of(layer_id)?;
            let canvas = s.canvas_size().unwrap_or_default();
            let filter = s.config.resample_filter;
            let (w, h) = (target.width() as u32, target.height() as u32);
            let layer = &mut s.layers[idx];
            let resampled = layer.source().pixels().resample(w, h, filter)?;
            layer.replace_source(resampled);
            let (x, y) = clamp_position(target.left, target.top, (w, h), canvas);
            layer.set_position(x, y);
            info!(layer = %layer_id, width = w, height = h, x, y, "resize applied");
            Ok(Outcome::Applied(Affected::layer(layer_id)))
        })
    }

    pub fn cancel_resize(&mut self) -> Result<Outcome> {
        self.apply(Instant::now(), |s| match s.mode {
            InteractionMode::Resizing(ResizeSession {
                gesture: ResizeGesture::Rectangle { .. },
                ..
            }) => {
                s.mode = InteractionMode::Idle;
                Ok(Outcome::Applied(Affected::redraw()))
            }
            _ => Ok(Outcome::Rejected(Rejection::NotInMode {
                expected: "resize",
            })),
        })
    }

    // ---- crop ----------------------------------------------------------------

    /// Open a crop on `target`, else the selected layer, else the base.
    pub fn start_crop(&mut self, target: Option<Uuid>) -> Result<Outcome> {
        self.apply(Instant::now(), |s| {
            if let Some(rejection) = s.require_idle() {
                return Ok(Outcome::Rejected(rejection));
            }
            let (Some(base), Some(canvas)) = (s.base().map(Layer::id), s.canvas_size()) else {
                return Ok(Outcome::Rejected(Rejection::NoLayers));
            };
            let id = target.or(s.selected).unwrap_or(base);
            let idx = s.index_of(id)?;
            let crop = if idx == 0 {
                CropSession::for_base()
            } else {
                CropSession::for_layer(id, s.layers[idx].bounds(), canvas)
            };
            s.mode = InteractionMode::Cropping(crop);
            Ok(Outcome::Applied(Affected::redraw()))
        })
    }

    /// Press on one crop edge bar.
    pub fn begin_crop_edge(&mut self, edge: Edge, point: Point) -> Result<Outcome> {
        self.apply(Instant::now(), |s| match &mut s.mode {
            InteractionMode::Cropping(crop) => {
                crop.active = Some(EdgeDrag {
                    edge,
                    start_pointer: point,
                    start_value: crop.offsets.get(edge) as f64,
                });
                Ok(Outcome::Applied(Affected::nothing()))
            }
            _ => Ok(Outcome::Rejected(Rejection::NotInMode { expected: "crop" })),
        })
    }

    /// Set the crop rectangle in canvas pixels, clamped like an edge drag.
    pub fn set_crop_rect(&mut self, rect: Rect) -> Result<Outcome> {
        self.apply(Instant::now(), |s| {
            let Some(canvas) = s.canvas_size() else {
                return Ok(Outcome::Rejected(Rejection::NoLayers));
            };
            let bounds = match &s.mode {
                InteractionMode::Cropping(CropSession {
                    target: CropTarget::Layer(id),
                    ..
                }) => s.layer(*id).map(Layer::bounds),
                _ => None,
            };
            match &mut s.mode {
                InteractionMode::Cropping(crop) => {
                    crop.set_rect(rect, canvas, bounds);
                    Ok(Outcome::Applied(Affected::redraw()))
                }
                _ => Ok(Outcome::Rejected(Rejection::NotInMode { expected: "crop" })),
            }
        })
    }

    /// Commit the crop. The session closes even when the commit is refused.
    pub fn apply_crop(&mut self) -> Result<Outcome> {
        self.apply(Instant::now(), |s| {
            let InteractionMode::Cropping(crop) = std::mem::take(&mut s.mode) else {
                return Ok(Outcome::Rejected(Rejection::NotInMode { expected: "crop" }));
            };
            let Some(canvas) = s.canvas_size() else {
                return Ok(Outcome::Rejected(Rejection::NoLayers));
            };
            let rect = crop.rect(canvas);
            match crop.target {
                CropTarget::Base => s.crop_base(rect),
                CropTarget::Layer(id) => s.crop_layer(id, rect),
            }
        })
    }

    pub fn cancel_crop(&mut self) -> Result<Outcome> {
        self.apply(Instant::now(), |s| {
            if !matches!(s.mode, InteractionMode::Cropping(_)) {
                return Ok(Outcome::Rejected(Rejection::NotInMode { expected: "crop" }));
            }
            s.mode = InteractionMode::Idle;
            Ok(Outcome::Applied(Affected::redraw()))
        })
    }

    fn crop_base(&mut self, rect: Rect) -> Result<Outcome> {
        let filter = self.config.resample_filter;
        let (new_w, new_h) = (rect.width() as u32, rect.height() as u32);
        let Some(base) = self.layers.first_mut() else {
            return Ok(Outcome::Rejected(Rejection::NoLayers));
        };
        let region = base.canvas_to_source(rect);
        let cropped = base
            .source()
            .pixels()
            .resample_region(region, new_w, new_h, filter)?;
        base.replace_source(cropped);
        let base_id = base.id();

        // keep the other layers where they were relative to the image
        for layer in self.layers.iter_mut().skip(1) {
            let (x, y) = layer.position();
            let (x, y) = clamp_position(
                x - rect.left,
                y - rect.top,
                layer.natural_size(),
                (new_w, new_h),
            );
            layer.set_position(x, y);
        }
        info!(x = rect.left, y = rect.top, width = new_w, height = new_h, "base crop applied");
        Ok(Outcome::Applied(Affected::layer(base_id)))
    }

    fn crop_layer(&mut self, layer_id: Uuid, rect: Rect) -> Result<Outcome> {
        let idx = self.index_of(layer_id)?;
        let filter = self.config.resample_filter;
        let layer = &mut self.layers[idx];
        let Some(overlap) = rect.intersect(&layer.bounds()) else {
            return Ok(Outcome::Rejected(Rejection::EmptyIntersection));
        };
        let region = layer.canvas_to_source(overlap);
        let (w, h) = (overlap.width() as u32, overlap.height() as u32);
        let cropped = layer
            .source()
            .pixels()
            .resample_region(region, w, h, filter)?;
        layer.replace_source(cropped);
        layer.set_position(overlap.left, overlap.top);
        info!(layer = %layer_id, x = overlap.left, y = overlap.top, width = w, height = h, "layer crop applied");
        Ok(Outcome::Applied(Affected::layer(layer_id)))
    }

    /// Replace crop edges with explicit inward offsets from the canvas edges.
    pub fn set_crop_offsets(&mut self, offsets: EdgeOffsets) -> Result<Outcome> {
        let Some(canvas) = self.canvas_size() else {
            return Ok(Outcome::Rejected(Rejection::NoLayers));
        };
        self.set_crop_rect(offsets.to_rect(canvas))
    }
}

/// `other * target / current`, rounded.
fn scale_dim(other: u32, target: u32, current: u32) -> u32 {
    if current == 0 {
        return target;
    }
    (other as f64 * target as f64 / current as f64).round() as u32
}
