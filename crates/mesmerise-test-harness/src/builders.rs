use mesmerise_core::config::EditorConfig;
use mesmerise_core::effects::{EffectKind, EffectValue};
use mesmerise_core::layer::{PixelAccess, SourceImage};
use mesmerise_core::raster::Raster;
use mesmerise_core::session::{Command, EditorSession};
use uuid::Uuid;

/// Builder for synthetic test rasters.
pub struct RasterBuilder {
    width: u32,
    height: u32,
    fill: [u8; 4],
    gradient: bool,
}

impl RasterBuilder {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            fill: [128, 128, 128, 255],
            gradient: false,
        }
    }

    pub fn fill(mut self, rgba: [u8; 4]) -> Self {
        self.fill = rgba;
        self
    }

    /// Horizontal red ramp, vertical green ramp, fixed blue. Alpha comes from
    /// the fill color.
    pub fn gradient(mut self) -> Self {
        self.gradient = true;
        self
    }

    pub fn build(self) -> Raster {
        let mut raster = Raster::filled(self.width, self.height, self.fill);
        if self.gradient {
            let w = self.width.max(2) - 1;
            let h = self.height.max(2) - 1;
            for y in 0..self.height {
                for x in 0..self.width {
                    let px = raster.pixel_mut(x, y);
                    px[0] = (x * 255 / w) as u8;
                    px[1] = (y * 255 / h) as u8;
                    px[2] = 96;
                }
            }
        }
        raster
    }
}

struct PendingLayer {
    name: String,
    raster: Raster,
    access: PixelAccess,
    position: Option<(i64, i64)>,
    effects: Vec<(EffectKind, Option<EffectValue>)>,
}

/// Builder for an [`EditorSession`] pre-loaded with layers and effects.
///
/// Built sessions have been rendered once, so every layer is placed and
/// every cache is warm.
pub struct SessionBuilder {
    config: EditorConfig,
    layers: Vec<PendingLayer>,
}

impl SessionBuilder {
    pub fn new() -> Self {
        Self {
            config: EditorConfig {
                grain_seed: Some(7),
                ..EditorConfig::default()
            },
            layers: Vec::new(),
        }
    }

    pub fn config(mut self, config: EditorConfig) -> Self {
        self.config = config;
        self
    }

    /// Add a gradient layer of the given size.
    pub fn layer(self, width: u32, height: u32) -> Self {
        self.raster_layer(RasterBuilder::new(width, height).gradient().build())
    }

    pub fn raster_layer(mut self, raster: Raster) -> Self {
        let name = format!("layer{}", self.layers.len() + 1);
        self.layers.push(PendingLayer {
            name,
            raster,
            access: PixelAccess::Readable,
            position: None,
            effects: Vec::new(),
        });
        self
    }

    /// Mark the most recently added layer as unreadable.
    pub fn tainted(mut self) -> Self {
        if let Some(layer) = self.layers.last_mut() {
            layer.access = PixelAccess::Tainted;
        }
        self
    }

    /// Place the most recently added layer.
    pub fn at(mut self, x: i64, y: i64) -> Self {
        if let Some(layer) = self.layers.last_mut() {
            layer.position = Some((x, y));
        }
        self
    }

    /// Append an effect to the most recently added layer.
    pub fn effect(mut self, kind: EffectKind, value: Option<EffectValue>) -> Self {
        if let Some(layer) = self.layers.last_mut() {
            layer.effects.push((kind, value));
        }
        self
    }

    /// Build the session, returning it with the layer ids in stack order.
    pub fn build(self) -> (EditorSession, Vec<Uuid>) {
        let mut session =
            EditorSession::with_config(self.config).expect("test config should be valid");
        let mut ids = Vec::new();
        let mut placements = Vec::new();

        for pending in self.layers {
            let id = session
                .execute(Command::AddLayer {
                    name: pending.name,
                    source: SourceImage::new(pending.raster).with_access(pending.access),
                })
                .expect("add layer")
                .created()
                .expect("layer id");
            for (kind, value) in pending.effects {
                session
                    .execute(Command::AddEffect {
                        layer_id: id,
                        kind,
                        value,
                    })
                    .expect("add effect");
            }
            if let Some((x, y)) = pending.position {
                placements.push((id, x, y));
            }
            ids.push(id);
        }

        for (layer_id, x, y) in placements {
            session
                .execute(Command::MoveLayer { layer_id, x, y })
                .expect("move layer");
        }
        session.render();
        (session, ids)
    }
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
