//! Per-pixel and neighborhood color math.
//!
//! Every function here mutates an RGBA [`Raster`] in place, leaves alpha
//! untouched, and rounds and clamps each written channel to `[0, 255]`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::effects::{HalftoneMode, HalftoneParams, HalftoneShape, Rgb};
use crate::raster::Raster;

/// Luma weights used by the saturation slider.
const SATURATION_LUMA: [f64; 3] = [0.2989, 0.5870, 0.1140];

/// Luma weights used by tint, duotone and halftone.
const LUMA: [f64; 3] = [0.299, 0.587, 0.114];

const SEPIA_MATRIX: [[f64; 3]; 3] = [
    [0.393, 0.769, 0.189],
    [0.349, 0.686, 0.168],
    [0.272, 0.534, 0.131],
];

const SHARPEN_KERNEL: [f64; 9] = [-1.0, -1.0, -1.0, -1.0, 9.0, -1.0, -1.0, -1.0, -1.0];
const IDENTITY_KERNEL: [f64; 9] = [0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0];

/// Smallest dot radius drawn for a cell that has any darkness at all, in pixels.
const HALFTONE_MIN_RADIUS: f64 = 0.5;
const HALFTONE_GAMMA: f64 = 0.9;

#[inline]
pub fn clamp_channel(v: f64) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

#[inline]
fn luma(rgb: [f64; 3], weights: [f64; 3]) -> f64 {
    rgb[0] * weights[0] + rgb[1] * weights[1] + rgb[2] * weights[2]
}

/// Run `f` over every pixel's RGB with its (x, y) position, writing the
/// clamped result back. Rows are processed in parallel.
fn map_rgb<F>(raster: &mut Raster, f: F)
where
    F: Fn(u32, u32, [f64; 3]) -> [f64; 3] + Send + Sync,
{
    if raster.is_empty() {
        return;
    }
    let row_bytes = raster.width as usize * 4;
    raster
        .data
        .par_chunks_exact_mut(row_bytes)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                let out = f(
                    x as u32,
                    y as u32,
                    [px[0] as f64, px[1] as f64, px[2] as f64],
                );
                px[0] = clamp_channel(out[0]);
                px[1] = clamp_channel(out[1]);
                px[2] = clamp_channel(out[2]);
            }
        });
}

/// Adds `value * 2.55` to every channel. `value` in `[-100, 100]`.
pub fn brightness(raster: &mut Raster, value: f64) {
    let shift = value * 2.55;
    map_rgb(raster, |_, _, [r, g, b]| [r + shift, g + shift, b + shift]);
}

/// Classic contrast curve around mid-gray. `value` in `[-100, 100]`.
pub fn contrast(raster: &mut Raster, value: f64) {
    let factor = (259.0 * (value + 255.0)) / (255.0 * (259.0 - value));
    let curve = |c: f64| factor * (c - 128.0) + 128.0;
    map_rgb(raster, |_, _, [r, g, b]| [curve(r), curve(g), curve(b)]);
}

/// Pushes channels away from (or toward) their luma. `value` in `[-100, 100]`.
pub fn saturation(raster: &mut Raster, value: f64) {
    let factor = 1.0 + value / 100.0;
    map_rgb(raster, |_, _, rgb| {
        let gray = luma(rgb, SATURATION_LUMA);
        rgb.map(|c| gray + factor * (c - gray))
    });
}

/// Blends the sepia matrix result with the original by `value / 100`.
pub fn sepia(raster: &mut Raster, value: f64) {
    if value <= 0.0 {
        return;
    }
    let t = (value / 100.0).clamp(0.0, 1.0);
    map_rgb(raster, |_, _, rgb| {
        let toned = SEPIA_MATRIX.map(|row| luma(rgb, row));
        [0, 1, 2].map(|c| rgb[c] * (1.0 - t) + toned[c] * t)
    });
}

/// Moves each channel toward its negative by `value / 100`.
pub fn invert(raster: &mut Raster, value: f64) {
    if value <= 0.0 {
        return;
    }
    let t = value / 100.0;
    map_rgb(raster, |_, _, rgb| rgb.map(|c| c + (255.0 - 2.0 * c) * t));
}

/// Radial darkening growing with distance from the center.
pub fn vignette(raster: &mut Raster, value: f64) {
    if value <= 0.0 || raster.is_empty() {
        return;
    }
    let cx = raster.width as f64 / 2.0;
    let cy = raster.height as f64 / 2.0;
    let max_distance = (cx * cx + cy * cy).sqrt();
    let strength = value / 100.0;
    map_rgb(raster, |x, y, rgb| {
        let dx = x as f64 - cx;
        let dy = y as f64 - cy;
        let distance = (dx * dx + dy * dy).sqrt();
        let factor = 1.0 - (distance / max_distance) * strength;
        rgb.map(|c| c * factor)
    });
}

/// Uniform noise in `[-value * 2.55 / 2, value * 2.55 / 2]`, one sample per
/// pixel shared by r, g and b. Each row draws from its own generator derived
/// from `seed`, so output is reproducible for a fixed seed regardless of
/// how rows are scheduled.
pub fn grain(raster: &mut Raster, value: f64, seed: u64) {
    if value <= 0.0 || raster.is_empty() {
        return;
    }
    let strength = value * 2.55;
    let row_bytes = raster.width as usize * 4;
    raster
        .data
        .par_chunks_exact_mut(row_bytes)
        .enumerate()
        .for_each(|(y, row)| {
            let mut rng = StdRng::seed_from_u64(
                seed ^ (y as u64).wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15),
            );
            for px in row.chunks_exact_mut(4) {
                let noise = (rng.random::<f64>() - 0.5) * strength;
                for c in &mut px[..3] {
                    *c = clamp_channel(*c as f64 + noise);
                }
            }
        });
}

/// Replaces chrominance with `color`, scaled by the pixel's luminance.
/// `mix` in `[0, 100]`.
pub fn tint(raster: &mut Raster, color: Rgb, mix: f64) {
    let m = mix / 100.0;
    if m <= 0.0 {
        return;
    }
    let tc = color.to_array();
    map_rgb(raster, |_, _, rgb| {
        let lum = luma(rgb, LUMA) / 255.0;
        [0, 1, 2].map(|c| rgb[c] * (1.0 - m) + tc[c] * lum * m)
    });
}

/// Maps luminance onto the `color_a` (shadows) to `color_b` (highlights)
/// ramp, then mixes back toward the original by `1 - mix / 100`.
pub fn duotone(raster: &mut Raster, color_a: Rgb, color_b: Rgb, mix: f64) {
    let m = mix / 100.0;
    let a = color_a.to_array();
    let b = color_b.to_array();
    map_rgb(raster, |_, _, rgb| {
        let lum = (luma(rgb, LUMA) / 255.0).clamp(0.0, 1.0);
        [0, 1, 2].map(|c| {
            let ramp = a[c] + (b[c] - a[c]) * lum;
            rgb[c] * (1.0 - m) + ramp * m
        })
    });
}

/// Square-kernel convolution over RGB with edge clamping. Weights are divided
/// by their sum (or by 1 when they sum to zero). Alpha is copied through.
pub fn convolve(raster: &mut Raster, kernel: &[f64]) {
    let size = (kernel.len() as f64).sqrt() as usize;
    if size == 0 || size * size != kernel.len() || raster.is_empty() {
        return;
    }
    let half = (size / 2) as i64;
    let sum: f64 = kernel.iter().sum();
    let norm = if sum == 0.0 { 1.0 } else { sum };

    let w = raster.width as i64;
    let h = raster.height as i64;
    let src = raster.data.clone();
    let row_bytes = raster.width as usize * 4;

    raster
        .data
        .par_chunks_exact_mut(row_bytes)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                let mut acc = [0.0f64; 3];
                for ky in 0..size {
                    let sy = (y as i64 + ky as i64 - half).clamp(0, h - 1);
                    for kx in 0..size {
                        let sx = (x as i64 + kx as i64 - half).clamp(0, w - 1);
                        let si = ((sy * w + sx) * 4) as usize;
                        let k = kernel[ky * size + kx];
                        acc[0] += src[si] as f64 * k;
                        acc[1] += src[si + 1] as f64 * k;
                        acc[2] += src[si + 2] as f64 * k;
                    }
                }
                px[0] = clamp_channel(acc[0] / norm);
                px[1] = clamp_channel(acc[1] / norm);
                px[2] = clamp_channel(acc[2] / norm);
            }
        });
}

/// Interpolates between identity and a 3x3 unsharp kernel.
/// `value` in `[0, 200]`; full strength is reached at 100.
pub fn sharpen(raster: &mut Raster, value: f64) {
    if value <= 0.0 {
        return;
    }
    let strength = (value / 100.0).clamp(0.0, 1.0);
    let kernel: Vec<f64> = IDENTITY_KERNEL
        .iter()
        .zip(SHARPEN_KERNEL.iter())
        .map(|(i, s)| i * (1.0 - strength) + s * strength)
        .collect();
    convolve(raster, &kernel);
}

/// Pixelate: shrink to `value`% of the size and blow back up with
/// nearest-neighbor sampling. `value` in `[10, 100]`; 100 is a no-op.
pub fn resolution(raster: &mut Raster, value: f64) {
    if value >= 100.0 || raster.is_empty() {
        return;
    }
    let pct = value.clamp(1.0, 100.0) / 100.0;
    let small_w = ((raster.width as f64 * pct).round() as u32).max(1);
    let small_h = ((raster.height as f64 * pct).round() as u32).max(1);
    let restored = raster
        .scaled_nearest(small_w, small_h)
        .and_then(|small| small.scaled_nearest(raster.width, raster.height));
    if let Ok(restored) = restored {
        *raster = restored;
    }
}

/// Tile into `dot_size` cells, and in each cell draw a shape sized by the
/// darkness of the cell-center pixel over a white background.
pub fn halftone(raster: &mut Raster, params: &HalftoneParams) {
    if raster.is_empty() {
        return;
    }
    let dot = params.size.dot_size();
    let half = dot as f64 / 2.0;
    let src = raster.data.clone();
    let w = raster.width;
    let h = raster.height;
    let row_bytes = w as usize * 4;

    raster
        .data
        .par_chunks_exact_mut(row_bytes)
        .enumerate()
        .for_each(|(y, row)| {
            let y = y as u32;
            let cell_y = y / dot * dot;
            let sample_y = (cell_y + dot / 2).min(h - 1);
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                let x = x as u32;
                let cell_x = x / dot * dot;
                let sample_x = (cell_x + dot / 2).min(w - 1);
                let si = (sample_y as usize * w as usize + sample_x as usize) * 4;
                let sample = [src[si] as f64, src[si + 1] as f64, src[si + 2] as f64];

                let brightness = luma(sample, LUMA);
                let darkness = (1.0 - brightness / 255.0).clamp(0.0, 1.0).powf(HALFTONE_GAMMA);

                let mut out = [255.0; 3];
                if darkness > 0.0 {
                    let radius = (darkness * half).max(HALFTONE_MIN_RADIUS);
                    // offsets of this pixel's center from the cell center
                    let dx = (x - cell_x) as f64 + 0.5 - half;
                    let dy = (y - cell_y) as f64 + 0.5 - half;
                    if inside_shape(params.shape, dx, dy, radius) {
                        out = match params.mode {
                            HalftoneMode::Monochrome => [0.0; 3],
                            HalftoneMode::Color => sample,
                        };
                    }
                }
                px[0] = clamp_channel(out[0]);
                px[1] = clamp_channel(out[1]);
                px[2] = clamp_channel(out[2]);
            }
        });
}

fn inside_shape(shape: HalftoneShape, dx: f64, dy: f64, radius: f64) -> bool {
    match shape {
        HalftoneShape::Circle => dx * dx + dy * dy <= radius * radius,
        HalftoneShape::Square => dx.abs() <= radius && dy.abs() <= radius,
        // apex up, base at dy = +radius spanning [-radius, radius]
        HalftoneShape::Triangle => dy >= -radius && dy <= radius && dx.abs() <= (dy + radius) / 2.0,
        HalftoneShape::Line => dy.abs() <= radius / 2.0,
    }
}
