use crate::layer::WorldLayer;

/// Maximum number of layers one level may define.
pub const MAX_WORLD_LAYERS: usize = 4;

/// The layers of the loaded level, back to front.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerStack {
    layers: Vec<WorldLayer>,
}

impl LayerStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard every layer and install `layers` in their place. Layers past
    /// [`MAX_WORLD_LAYERS`] are dropped with a warning.
    pub fn replace(&mut self, mut layers: Vec<WorldLayer>) {
        if layers.len() > MAX_WORLD_LAYERS {
            tracing::warn!(
                count = layers.len(),
                max = MAX_WORLD_LAYERS,
                "too many world layers, dropping the extra ones"
            );
            layers.truncate(MAX_WORLD_LAYERS);
        }
        self.clear();
        self.layers = layers;
    }

    pub fn clear(&mut self) {
        for layer in &mut self.layers {
            layer.free();
        }
        self.layers.clear();
    }

    /// The layer objects collide against: the last one loaded.
    pub fn foreground(&self) -> Option<&WorldLayer> {
        let layer = self.layers.last();
        if layer.is_none() {
            tracing::warn!("requested the foreground world layer but no layers are loaded");
        }
        layer
    }

    pub fn get(&self, index: usize) -> Option<&WorldLayer> {
        self.layers.get(index)
    }

    pub fn layers(&self) -> &[WorldLayer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.layers.len() >= MAX_WORLD_LAYERS
    }
}
