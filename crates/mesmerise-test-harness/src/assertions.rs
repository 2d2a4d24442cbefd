use mesmerise_core::geometry::offset_range;
use mesmerise_core::layer::Layer;
use mesmerise_core::raster::Raster;

/// Assert that every channel of every pixel is within `[lo, hi]`.
pub fn assert_channels_in_range(raster: &Raster, lo: u8, hi: u8) {
    for (i, &c) in raster.data.iter().enumerate() {
        assert!(
            (lo..=hi).contains(&c),
            "channel {} of pixel {} is {}, outside [{}, {}]",
            i % 4,
            i / 4,
            c,
            lo,
            hi
        );
    }
}

/// Assert a layer's position is inside the drag clamp for `canvas`.
pub fn assert_within_drag_clamp(layer: &Layer, canvas: (u32, u32)) {
    let (x, y) = layer.position();
    let (lw, lh) = layer.natural_size();
    let (min_x, max_x) = offset_range(canvas.0 as i64, lw as i64);
    let (min_y, max_y) = offset_range(canvas.1 as i64, lh as i64);
    assert!(
        (min_x..=max_x).contains(&x),
        "x={x} outside [{min_x}, {max_x}] for {lw}px layer on {}px canvas",
        canvas.0
    );
    assert!(
        (min_y..=max_y).contains(&y),
        "y={y} outside [{min_y}, {max_y}] for {lh}px layer on {}px canvas",
        canvas.1
    );
}

/// Assert two rasters have the same size and differ in at least one byte.
pub fn assert_rasters_differ(a: &Raster, b: &Raster) {
    assert_eq!(
        (a.width, a.height),
        (b.width, b.height),
        "rasters have different dimensions"
    );
    assert!(
        a.data != b.data,
        "expected rasters to differ, but all {} pixels match",
        a.pixel_count()
    );
}

/// Assert two rasters match within `tolerance` per channel.
pub fn assert_rasters_close(a: &Raster, b: &Raster, tolerance: u8) {
    assert_eq!((a.width, a.height), (b.width, b.height));
    for (i, (x, y)) in a.data.iter().zip(b.data.iter()).enumerate() {
        assert!(
            x.abs_diff(*y) <= tolerance,
            "byte {i} differs: {x} vs {y} (tolerance {tolerance})"
        );
    }
}

/// Assert a layer sits at `pos` with natural size `size`.
pub fn assert_layer_geometry(layer: &Layer, pos: (i64, i64), size: (u32, u32)) {
    assert_eq!(layer.position(), pos, "layer {} position", layer.name());
    assert_eq!(layer.natural_size(), size, "layer {} size", layer.name());
}
