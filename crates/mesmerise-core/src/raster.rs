use image::RgbaImage;
use image::imageops;
use rayon::prelude::*;

use crate::config::ResampleFilter;
use crate::error::{CoreError, Result};
use crate::geometry::Rect;

// =============================================================================
// Raster
// =============================================================================

/// An owned RGBA pixel buffer. 4 bytes per pixel, row-major, 8 bits per channel.
///
/// Used for layer sources, processed layer caches and the shared output surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Raster {
    /// Create a new transparent black buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0u8; width as usize * height as usize * 4],
        }
    }

    /// Create a buffer where every pixel is `rgba`.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let data = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self {
            width,
            height,
            data,
        }
    }

    /// Create from existing RGBA data.
    pub fn from_rgba_vec(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        if data.len() != width as usize * height as usize * 4 {
            return Err(CoreError::BufferSize {
                width,
                height,
                len: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn from_rgba_image(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            data: image.into_raw(),
        }
    }

    pub fn to_rgba_image(&self) -> Result<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.data.clone()).ok_or(
            CoreError::BufferSize {
                width: self.width,
                height: self.height,
                len: self.data.len(),
            },
        )
    }

    /// Get pixel RGBA at (x, y). Panics if out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        &self.data[idx..idx + 4]
    }

    /// Get mutable pixel RGBA at (x, y). Panics if out of bounds.
    pub fn pixel_mut(&mut self, x: u32, y: u32) -> &mut [u8] {
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        &mut self.data[idx..idx + 4]
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_size(self.width, self.height)
    }

    // ---- output surface operations -----------------------------------------

    /// Resize the surface. Like a canvas, resizing discards the content.
    pub fn resize_to(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.data.clear();
        self.data.resize(width as usize * height as usize * 4, 0);
    }

    /// Reset every pixel to transparent black.
    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    /// Draw `src` with its top-left corner at (x, y), at its own size.
    /// Pixels falling outside this buffer are clipped. Uses Porter-Duff
    /// "over" so transparent source pixels leave the destination untouched.
    pub fn draw_at(&mut self, src: &Raster, x: i64, y: i64) {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + src.width as i64).min(self.width as i64);
        let y1 = (y + src.height as i64).min(self.height as i64);
        if x0 >= x1 || y0 >= y1 {
            return;
        }

        let dst_stride = self.width as usize * 4;
        let src_stride = src.width as usize * 4;
        let span = (x1 - x0) as usize * 4;
        let src_col = (x0 - x) as usize * 4;
        let dst_col = x0 as usize * 4;

        // Row-based parallelism to avoid rayon per-pixel scheduling overhead
        self.data
            .par_chunks_exact_mut(dst_stride)
            .enumerate()
            .skip(y0 as usize)
            .take((y1 - y0) as usize)
            .for_each(|(row, dst_row)| {
                let src_start = (row as i64 - y) as usize * src_stride + src_col;
                blend_over(
                    &src.data[src_start..src_start + span],
                    &mut dst_row[dst_col..dst_col + span],
                );
            });
    }

    // ---- resampling ---------------------------------------------------------

    /// Nearest-neighbor scale to `width` x `height` using integer math.
    pub fn scaled_nearest(&self, width: u32, height: u32) -> Result<Raster> {
        if self.is_empty() {
            return Err(CoreError::EmptyRaster {
                width: self.width,
                height: self.height,
            });
        }
        if width == 0 || height == 0 {
            return Err(CoreError::EmptyRaster { width, height });
        }
        if width == self.width && height == self.height {
            return Ok(self.clone());
        }

        let mut out = Raster::new(width, height);
        let src_stride = self.width as usize * 4;
        let dst_stride = width as usize * 4;
        let src_w = self.width as u64;
        let src_h = self.height as u64;

        out.data
            .par_chunks_exact_mut(dst_stride)
            .enumerate()
            .for_each(|(dy, dst_row)| {
                let sy = ((dy as u64 * src_h) / height as u64).min(src_h - 1) as usize;
                let src_row = &self.data[sy * src_stride..(sy + 1) * src_stride];
                for (dx, px) in dst_row.chunks_exact_mut(4).enumerate() {
                    let sx = ((dx as u64 * src_w) / width as u64).min(src_w - 1) as usize;
                    px.copy_from_slice(&src_row[sx * 4..sx * 4 + 4]);
                }
            });
        Ok(out)
    }

    /// Smoothed resample of the whole buffer to `width` x `height`.
    pub fn resample(&self, width: u32, height: u32, filter: ResampleFilter) -> Result<Raster> {
        self.resample_region(self.bounds(), width, height, filter)
    }

    /// Resample the `region` of this buffer (clipped to its bounds) into a new
    /// buffer of `width` x `height`.
    pub fn resample_region(
        &self,
        region: Rect,
        width: u32,
        height: u32,
        filter: ResampleFilter,
    ) -> Result<Raster> {
        if width == 0 || height == 0 {
            return Err(CoreError::EmptyRaster { width, height });
        }
        let region = region
            .intersect(&self.bounds())
            .ok_or(CoreError::EmptyRaster {
                width: region.width().max(0) as u32,
                height: region.height().max(0) as u32,
            })?;

        let image = self.to_rgba_image()?;
        let cropped = imageops::crop_imm(
            &image,
            region.left as u32,
            region.top as u32,
            region.width() as u32,
            region.height() as u32,
        )
        .to_image();

        if cropped.dimensions() == (width, height) {
            return Ok(Raster::from_rgba_image(cropped));
        }
        let resized = imageops::resize(&cropped, width, height, filter.to_filter_type());
        Ok(Raster::from_rgba_image(resized))
    }
}

/// Source-over blend of one row span onto another of the same length.
fn blend_over(src: &[u8], dst: &mut [u8]) {
    for (s, d) in src.chunks_exact(4).zip(dst.chunks_exact_mut(4)) {
        let sa = s[3] as u32;
        if sa == 255 {
            d.copy_from_slice(s);
        } else if sa > 0 {
            let da = d[3] as u32;
            let inv_sa = 255 - sa;
            let out_a = sa + ((da * inv_sa + 127) / 255);
            if out_a > 0 {
                for c in 0..3 {
                    let sc = s[c] as u32;
                    let dc = d[c] as u32;
                    let num = sc * sa + ((dc * da * inv_sa + 127) / 255);
                    d[c] = ((num + out_a / 2) / out_a).min(255) as u8;
                }
                d[3] = out_a.min(255) as u8;
            }
        }
        // sa == 0: destination unchanged
    }
}

// =============================================================================
// Tests
// =============================================================================
