//! Modal pointer interactions: drag, resize and crop.
//!
//! The session owns exactly one [`InteractionMode`] at a time. The types here
//! hold the transient state of each mode and the pure geometry that turns
//! pointer deltas into rectangles; the session applies the results to layers.

use uuid::Uuid;

use crate::geometry::{Edge, Handle, Point, Rect, clamp_position, corner_resize, round_half_up};

/// What the pointer is currently doing. Anything other than `Idle` blocks
/// every other modal entry point.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum InteractionMode {
    #[default]
    Idle,
    Dragging(DragSession),
    Resizing(ResizeSession),
    Cropping(CropSession),
}

impl InteractionMode {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Dragging(_) => "dragging",
            Self::Resizing(_) => "resizing",
            Self::Cropping(_) => "cropping",
        }
    }
}

/// An edge being dragged, with the pointer position and edge value at press.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeDrag {
    pub edge: Edge,
    /// Pointer at press, in display coordinates.
    pub start_pointer: Point,
    pub start_value: f64,
}

// =============================================================================
// Drag
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragSession {
    pub layer_id: Uuid,
    /// Pointer at press, in canvas pixels.
    pub start: (i64, i64),
    /// Layer position at press.
    pub origin: (i64, i64),
}

impl DragSession {
    /// Layer position for the pointer at `pointer` (canvas pixels).
    pub fn position_for(
        &self,
        pointer: (i64, i64),
        layer_size: (u32, u32),
        canvas_size: (u32, u32),
    ) -> (i64, i64) {
        let x = self.origin.0 + (pointer.0 - self.start.0);
        let y = self.origin.1 + (pointer.1 - self.start.1);
        clamp_position(x, y, layer_size, canvas_size)
    }
}

// =============================================================================
// Resize
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ResizeSession {
    pub layer_id: Uuid,
    pub gesture: ResizeGesture,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResizeGesture {
    /// Aspect-locked drag of a corner handle. The footprint is updated live
    /// and resampled on release.
    Handle {
        handle: Handle,
        /// Pointer at press, in canvas pixels.
        start_pointer: (i64, i64),
        start: Rect,
    },
    /// Free rectangle with four edge bars, committed by an explicit apply.
    Rectangle {
        rect: ResizeRect,
        active: Option<EdgeDrag>,
    },
}

impl ResizeGesture {
    /// Footprint for a corner-handle drag with the pointer at `pointer`.
    /// Width and height are limited to `[min_dim, max_dim]` and the position
    /// is clamped the same way as a drag.
    pub fn handle_footprint(
        handle: Handle,
        start: Rect,
        start_pointer: (i64, i64),
        pointer: (i64, i64),
        canvas_size: (u32, u32),
        min_dim: u32,
        max_dim: u32,
    ) -> Rect {
        let dx = pointer.0 - start_pointer.0;
        let r = corner_resize(start, handle, dx, min_dim as i64, max_dim as i64);
        let size = (r.width() as u32, r.height() as u32);
        let (x, y) = clamp_position(r.left, r.top, size, canvas_size);
        Rect::from_xywh(x, y, r.width(), r.height())
    }
}

/// Resize rectangle in canvas pixels. Edges are fractional while dragging
/// and rounded on apply.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeRect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl ResizeRect {
    pub fn from_rect(r: Rect) -> Self {
        Self {
            left: r.left as f64,
            top: r.top as f64,
            right: r.right as f64,
            bottom: r.bottom as f64,
        }
    }

    pub fn edge_value(&self, edge: Edge) -> f64 {
        match edge {
            Edge::Left => self.left,
            Edge::Top => self.top,
            Edge::Right => self.right,
            Edge::Bottom => self.bottom,
        }
    }

    /// Move `edge` to `start_value + delta`, keeping it at least one pixel
    /// from the opposite edge.
    pub fn drag_edge(&mut self, edge: Edge, start_value: f64, delta: f64) {
        let target = start_value + delta;
        match edge {
            Edge::Left => self.left = target.min(self.right - 1.0),
            Edge::Right => self.right = target.max(self.left + 1.0),
            Edge::Top => self.top = target.min(self.bottom - 1.0),
            Edge::Bottom => self.bottom = target.max(self.top + 1.0),
        }
    }

    /// Whole-pixel footprint the rectangle commits to.
    pub fn committed(&self) -> Rect {
        let width = round_half_up(self.right - self.left).max(1);
        let height = round_half_up(self.bottom - self.top).max(1);
        Rect::from_xywh(
            round_half_up(self.left),
            round_half_up(self.top),
            width,
            height,
        )
    }
}

// =============================================================================
// Crop
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropTarget {
    /// Crop the base layer, shrinking the canvas.
    Base,
    /// Crop a single non-base layer to the rectangle.
    Layer(Uuid),
}

/// Crop rectangle stored as inward distances from each canvas edge. Values
/// may be negative when a targeted layer hangs off the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EdgeOffsets {
    pub left: i64,
    pub top: i64,
    pub right: i64,
    pub bottom: i64,
}

impl EdgeOffsets {
    pub fn from_rect(r: Rect, canvas: (u32, u32)) -> Self {
        Self {
            left: r.left,
            top: r.top,
            right: canvas.0 as i64 - r.right,
            bottom: canvas.1 as i64 - r.bottom,
        }
    }

    /// Rectangle in canvas pixels, never narrower or shorter than one pixel.
    pub fn to_rect(&self, canvas: (u32, u32)) -> Rect {
        let width = (canvas.0 as i64 - self.left - self.right).max(1);
        let height = (canvas.1 as i64 - self.top - self.bottom).max(1);
        Rect::from_xywh(self.left, self.top, width, height)
    }

    pub fn get(&self, edge: Edge) -> i64 {
        match edge {
            Edge::Left => self.left,
            Edge::Top => self.top,
            Edge::Right => self.right,
            Edge::Bottom => self.bottom,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CropSession {
    pub target: CropTarget,
    pub offsets: EdgeOffsets,
    pub active: Option<EdgeDrag>,
}

impl CropSession {
    /// Start cropping the whole canvas.
    pub fn for_base() -> Self {
        Self {
            target: CropTarget::Base,
            offsets: EdgeOffsets::default(),
            active: None,
        }
    }

    /// Start cropping a layer, with the rectangle on the layer's outline.
    pub fn for_layer(layer_id: Uuid, footprint: Rect, canvas: (u32, u32)) -> Self {
        Self {
            target: CropTarget::Layer(layer_id),
            offsets: EdgeOffsets::from_rect(footprint, canvas),
            active: None,
        }
    }

    pub fn rect(&self, canvas: (u32, u32)) -> Rect {
        self.offsets.to_rect(canvas)
    }

    /// Move one edge by `delta` canvas pixels from `start_value`, then clamp.
    ///
    /// `start_value` is the edge's offset at press. With `bounds` the
    /// rectangle is kept inside that footprint, otherwise inside the canvas.
    /// Either way it keeps at least one pixel of width and height.
    pub fn drag_edge(
        &mut self,
        edge: Edge,
        start_value: i64,
        delta: i64,
        canvas: (u32, u32),
        bounds: Option<Rect>,
    ) {
        let (cw, ch) = (canvas.0 as i64, canvas.1 as i64);
        let mut left = self.offsets.left;
        let mut top = self.offsets.top;
        let mut right = cw - self.offsets.right;
        let mut bottom = ch - self.offsets.bottom;

        match edge {
            Edge::Left => left = start_value + delta,
            Edge::Top => top = start_value + delta,
            Edge::Right => right = cw - (start_value - delta),
            Edge::Bottom => bottom = ch - (start_value - delta),
        }

        self.offsets = Self::clamped(left, top, right, bottom, canvas, bounds);
    }

    /// Set all four edges at once from a canvas rectangle, with the same
    /// clamping as an edge drag.
    pub fn set_rect(&mut self, rect: Rect, canvas: (u32, u32), bounds: Option<Rect>) {
        self.offsets = Self::clamped(rect.left, rect.top, rect.right, rect.bottom, canvas, bounds);
    }

    fn clamped(
        mut left: i64,
        mut top: i64,
        mut right: i64,
        mut bottom: i64,
        canvas: (u32, u32),
        bounds: Option<Rect>,
    ) -> EdgeOffsets {
        let limits = bounds.unwrap_or_else(|| Rect::from_size(canvas.0, canvas.1));
        left = left.min(limits.right - 1).max(limits.left);
        right = right.min(limits.right).max(limits.left + 1);
        top = top.min(limits.bottom - 1).max(limits.top);
        bottom = bottom.min(limits.bottom).max(limits.top + 1);

        if right <= left {
            right = left + 1;
        }
        if bottom <= top {
            bottom = top + 1;
        }
        EdgeOffsets::from_rect(Rect::new(left, top, right, bottom), canvas)
    }
}
