use tracing::{debug, warn};

use crate::geometry::center_offset;
use crate::layer::Layer;
use crate::pipeline::{EffectContext, EffectRegistry};
use crate::raster::Raster;

/// Counters from one compositing pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderStats {
    pub drawn: usize,
    pub skipped: usize,
    /// Layers whose cache was stale going into the pass.
    pub rebuilt: usize,
}

/// Flatten `layers` onto `surface`, back to front.
///
/// The base layer (index 0) fixes the surface size. Layers that have never
/// been positioned are centered on the base first. A layer whose pixels
/// cannot be produced is skipped for this pass only.
pub fn render_all(
    layers: &mut [Layer],
    surface: &mut Raster,
    registry: &EffectRegistry,
    ctx: &EffectContext,
) -> RenderStats {
    let mut stats = RenderStats::default();

    let Some((canvas_w, canvas_h)) = layers.first().map(Layer::natural_size) else {
        surface.clear();
        return stats;
    };

    if (surface.width, surface.height) != (canvas_w, canvas_h) {
        surface.resize_to(canvas_w, canvas_h);
    } else {
        surface.clear();
    }

    for layer in layers.iter_mut() {
        if !layer.is_placed() {
            let (lw, lh) = layer.natural_size();
            layer.set_position(center_offset(canvas_w, lw), center_offset(canvas_h, lh));
        }
        if layer.is_dirty() {
            stats.rebuilt += 1;
        }
        match layer.processed_raster(registry, ctx) {
            Ok(pixels) => {
                let (x, y) = layer.position();
                surface.draw_at(&pixels, x, y);
                stats.drawn += 1;
            }
            Err(err) => {
                warn!(layer = %layer.id(), error = %err, "layer skipped for this pass");
                stats.skipped += 1;
            }
        }
    }

    debug!(
        width = canvas_w,
        height = canvas_h,
        drawn = stats.drawn,
        skipped = stats.skipped,
        rebuilt = stats.rebuilt,
        "render pass complete"
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> EffectContext {
        EffectContext::new(0)
    }

    #[test]
    fn test_empty_stack_clears_surface() {
        let mut surface = Raster::filled(3, 3, [9, 9, 9, 9]);
        let stats = render_all(&mut [], &mut surface, &EffectRegistry::with_builtins(), &ctx());
        assert_eq!(stats, RenderStats::default());
        assert_eq!((surface.width, surface.height), (3, 3));
        assert!(surface.data.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_surface_takes_base_size() {
        let mut layers = vec![Layer::from_raster("base", Raster::filled(8, 6, [0, 0, 255, 255])).unwrap()];
        let mut surface = Raster::new(1, 1);
        let stats = render_all(&mut layers, &mut surface, &EffectRegistry::with_builtins(), &ctx());
        assert_eq!((surface.width, surface.height), (8, 6));
        assert_eq!(stats.drawn, 1);
        assert_eq!(stats.rebuilt, 1);
        assert_eq!(surface.pixel(7, 5), &[0, 0, 255, 255]);
    }

    #[test]
    fn test_unplaced_layer_is_centered_and_drawn_on_top() {
        let mut layers = vec![
            Layer::from_raster("base", Raster::filled(10, 10, [0, 0, 0, 255])).unwrap(),
            Layer::from_raster("top", Raster::filled(4, 4, [255, 0, 0, 255])).unwrap(),
        ];
        let mut surface = Raster::new(0, 0);
        render_all(&mut layers, &mut surface, &EffectRegistry::with_builtins(), &ctx());
        assert_eq!(layers[1].position(), (3, 3));
        assert!(layers[1].is_placed());
        assert_eq!(surface.pixel(3, 3), &[255, 0, 0, 255]);
        assert_eq!(surface.pixel(2, 2), &[0, 0, 0, 255]);
    }

    #[test]
    fn test_second_pass_hits_cache() {
        let mut layers = vec![Layer::from_raster("base", Raster::filled(2, 2, [1, 1, 1, 255])).unwrap()];
        let mut surface = Raster::new(0, 0);
        let registry = EffectRegistry::with_builtins();
        render_all(&mut layers, &mut surface, &registry, &ctx());
        let stats = render_all(&mut layers, &mut surface, &registry, &ctx());
        assert_eq!(stats.rebuilt, 0);
        assert_eq!(stats.drawn, 1);
    }
}
