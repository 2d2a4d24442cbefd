use serde::{Deserialize, Serialize};

/// A position in display or canvas space. Which space is implied by the API
/// receiving it: pointer events carry display coordinates, everything stored
/// on layers and sessions is in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in canvas pixels. `right` and `bottom` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub left: i64,
    pub top: i64,
    pub right: i64,
    pub bottom: i64,
}

impl Rect {
    pub fn new(left: i64, top: i64, right: i64, bottom: i64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn from_xywh(x: i64, y: i64, width: i64, height: i64) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    pub fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width as i64, height as i64)
    }

    pub fn width(&self) -> i64 {
        self.right - self.left
    }

    pub fn height(&self) -> i64 {
        self.bottom - self.top
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    /// Overlapping area of both rectangles, or `None` when it has no area.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let r = Rect::new(
            self.left.max(other.left),
            self.top.max(other.top),
            self.right.min(other.right),
            self.bottom.min(other.bottom),
        );
        (!r.is_empty()).then_some(r)
    }

    /// Hit test with inclusive edges, matching how pointer presses on the
    /// outline of a layer still grab it.
    pub fn hit_test(&self, x: i64, y: i64) -> bool {
        x >= self.left && x <= self.right && y >= self.top && y <= self.bottom
    }
}

/// Corner handles of a layer's selection outline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Handle {
    NorthWest,
    NorthEast,
    SouthWest,
    SouthEast,
}

impl Handle {
    /// The corner that stays fixed while this handle is dragged.
    pub fn anchor(self) -> Handle {
        match self {
            Handle::NorthWest => Handle::SouthEast,
            Handle::NorthEast => Handle::SouthWest,
            Handle::SouthWest => Handle::NorthEast,
            Handle::SouthEast => Handle::NorthWest,
        }
    }

    fn is_east(self) -> bool {
        matches!(self, Handle::NorthEast | Handle::SouthEast)
    }

    fn is_south(self) -> bool {
        matches!(self, Handle::SouthWest | Handle::SouthEast)
    }
}

/// Edges of a crop or resize rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Edge {
    Left,
    Top,
    Right,
    Bottom,
}

/// Maps pointer positions from the CSS-scaled display box onto canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayMapping {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub display_width: f64,
    pub display_height: f64,
}

impl DisplayMapping {
    pub fn new(canvas_width: u32, canvas_height: u32, display_width: f64, display_height: f64) -> Self {
        Self {
            canvas_width,
            canvas_height,
            display_width,
            display_height,
        }
    }

    /// Canvas displayed at its native size.
    pub fn identity(canvas_width: u32, canvas_height: u32) -> Self {
        Self::new(
            canvas_width,
            canvas_height,
            canvas_width as f64,
            canvas_height as f64,
        )
    }

    pub fn scale_x(&self) -> f64 {
        if self.display_width > 0.0 {
            self.canvas_width as f64 / self.display_width
        } else {
            1.0
        }
    }

    pub fn scale_y(&self) -> f64 {
        if self.display_height > 0.0 {
            self.canvas_height as f64 / self.display_height
        } else {
            1.0
        }
    }

    /// Convert a display-space point (relative to the displayed canvas origin)
    /// into canvas pixels.
    pub fn to_canvas(&self, display: Point) -> Point {
        Point::new(display.x * self.scale_x(), display.y * self.scale_y())
    }

    /// Convert a display-space point into whole canvas pixels.
    pub fn to_canvas_px(&self, display: Point) -> (i64, i64) {
        let p = self.to_canvas(display);
        (round_half_up(p.x), round_half_up(p.y))
    }
}

/// Round to nearest, with halves going towards positive infinity.
pub fn round_half_up(v: f64) -> i64 {
    (v + 0.5).floor() as i64
}

/// Allowed range for a layer offset along one axis: the footprint may hang
/// off the canvas only as far as it is larger than the canvas.
pub fn offset_range(canvas_dim: i64, layer_dim: i64) -> (i64, i64) {
    let slack = canvas_dim - layer_dim;
    (slack.min(0), slack.max(0))
}

pub fn clamp_axis(pos: i64, canvas_dim: i64, layer_dim: i64) -> i64 {
    let (lo, hi) = offset_range(canvas_dim, layer_dim);
    pos.clamp(lo, hi)
}

/// Clamp a layer position so its footprint keeps overlapping the canvas.
pub fn clamp_position(
    x: i64,
    y: i64,
    layer_size: (u32, u32),
    canvas_size: (u32, u32),
) -> (i64, i64) {
    (
        clamp_axis(x, canvas_size.0 as i64, layer_size.0 as i64),
        clamp_axis(y, canvas_size.1 as i64, layer_size.1 as i64),
    )
}

/// Offset that centers a layer on the canvas along one axis.
pub fn center_offset(canvas_dim: u32, layer_dim: u32) -> i64 {
    (canvas_dim as i64 - layer_dim as i64 + 1).div_euclid(2)
}

/// Footprint of an aspect-locked corner drag.
///
/// `start` is the footprint at drag start, `dx` the horizontal pointer delta
/// in canvas pixels. Width follows the pointer, height follows the width via
/// the starting aspect ratio, and the corner opposite `handle` stays put.
pub fn corner_resize(start: Rect, handle: Handle, dx: i64, min_dim: i64, max_dim: i64) -> Rect {
    let start_w = start.width();
    let start_h = start.height();
    let aspect = if start_h > 0 {
        start_w as f64 / start_h as f64
    } else {
        1.0
    };

    // dragging right grows east handles and shrinks west ones
    let raw_w = if handle.is_east() {
        start_w + dx
    } else {
        start_w - dx
    };
    let width = raw_w.clamp(min_dim, max_dim);
    let height = round_half_up(width as f64 / aspect).clamp(min_dim, max_dim);

    let anchor = handle.anchor();
    let left = if anchor.is_east() {
        start.right - width
    } else {
        start.left
    };
    let top = if anchor.is_south() {
        start.bottom - height
    } else {
        start.top
    };
    Rect::from_xywh(left, top, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_intersect() {
        let a = Rect::from_xywh(10, 10, 50, 50);
        let b = Rect::new(0, 0, 40, 40);
        assert_eq!(a.intersect(&b), Some(Rect::new(10, 10, 40, 40)));
    }

    #[test]
    fn test_rect_intersect_disjoint() {
        let a = Rect::from_xywh(0, 0, 10, 10);
        let b = Rect::from_xywh(10, 0, 10, 10);
        assert_eq!(a.intersect(&b), None);
    }

    #[test]
    fn test_hit_test_inclusive_edges() {
        let r = Rect::from_xywh(5, 5, 10, 10);
        assert!(r.hit_test(15, 15));
        assert!(r.hit_test(5, 5));
        assert!(!r.hit_test(16, 10));
    }

    #[test]
    fn test_display_mapping_scales() {
        let m = DisplayMapping::new(1000, 500, 500.0, 250.0);
        assert_eq!(m.to_canvas(Point::new(10.0, 20.0)), Point::new(20.0, 40.0));
        assert_eq!(m.to_canvas_px(Point::new(10.25, 0.0)), (21, 0));
    }

    #[test]
    fn test_display_mapping_zero_display_falls_back_to_identity() {
        let m = DisplayMapping::new(100, 100, 0.0, 0.0);
        assert_eq!(m.to_canvas(Point::new(3.0, 4.0)), Point::new(3.0, 4.0));
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(2.5), 3);
        assert_eq!(round_half_up(-2.5), -2);
        assert_eq!(round_half_up(-2.6), -3);
    }

    #[test]
    fn test_offset_range_smaller_layer() {
        assert_eq!(offset_range(100, 40), (0, 60));
    }

    #[test]
    fn test_offset_range_larger_layer_allows_negative() {
        assert_eq!(offset_range(100, 140), (-40, 0));
        assert_eq!(clamp_axis(-100, 100, 140), -40);
        assert_eq!(clamp_axis(10, 100, 140), 0);
    }

    #[test]
    fn test_center_offset_matches_rounding() {
        assert_eq!(center_offset(100, 50), 25);
        assert_eq!(center_offset(100, 95), 3);
        assert_eq!(center_offset(100, 105), -2);
    }

    #[test]
    fn test_corner_resize_south_east_anchors_north_west() {
        let start = Rect::from_xywh(10, 10, 40, 20);
        let r = corner_resize(start, Handle::SouthEast, 20, 10, 10_000);
        assert_eq!(r, Rect::from_xywh(10, 10, 60, 30));
    }

    #[test]
    fn test_corner_resize_north_west_anchors_south_east() {
        let start = Rect::from_xywh(10, 10, 40, 20);
        let r = corner_resize(start, Handle::NorthWest, 20, 10, 10_000);
        assert_eq!(r.width(), 20);
        assert_eq!(r.height(), 10);
        assert_eq!((r.right, r.bottom), (50, 30));
    }

    #[test]
    fn test_corner_resize_respects_minimum() {
        let start = Rect::from_xywh(0, 0, 40, 40);
        let r = corner_resize(start, Handle::SouthEast, -100, 10, 10_000);
        assert_eq!((r.width(), r.height()), (10, 10));
    }

    #[test]
    fn test_corner_resize_mixed_handles_keep_opposite_corner() {
        let start = Rect::from_xywh(10, 10, 40, 20);
        let ne = corner_resize(start, Handle::NorthEast, 20, 10, 10_000);
        assert_eq!((ne.left, ne.bottom), (10, 30));
        assert_eq!((ne.width(), ne.height()), (60, 30));
        let sw = corner_resize(start, Handle::SouthWest, 20, 10, 10_000);
        assert_eq!((sw.right, sw.top), (50, 10));
        assert_eq!((sw.width(), sw.height()), (20, 10));
    }

    #[test]
    fn test_handle_anchor() {
        assert_eq!(Handle::SouthEast.anchor(), Handle::NorthWest);
        assert_eq!(Handle::NorthEast.anchor(), Handle::SouthWest);
    }
}
