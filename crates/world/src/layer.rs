use glam::Vec2;
use thiserror::Error;
use tilespace_common::MapRemap;

use crate::collision::{self, HBlock, Segment};

/// Tile id as authored in the map. `0` is empty, everything else is solid.
pub type TileId = u32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayerError {
    #[error("tile data holds {got} ids, expected {expected} for a {width}x{height} grid")]
    SizeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        got: usize,
    },
}

/// One tile grid plus the geometry derived from it.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldLayer {
    width: u32,
    height: u32,
    tiles: Vec<TileId>,
    segments: Vec<Segment>,
    blocks: Vec<HBlock>,
}

impl WorldLayer {
    /// An empty 0x0 layer.
    pub fn new() -> Self {
        Self {
            width: 0,
            height: 0,
            tiles: Vec::new(),
            segments: Vec::new(),
            blocks: Vec::new(),
        }
    }

    /// Reallocate the grid as `width` x `height` empty tiles, dropping derived geometry.
    pub fn init(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.tiles = vec![0; width as usize * height as usize];
        self.segments.clear();
        self.blocks.clear();
    }

    /// Copy `ids` (row-major, row 0 at the bottom) into the grid and rebuild collision data.
    pub fn load(&mut self, ids: &[TileId], width: u32, height: u32) -> Result<(), LayerError> {
        let expected = width as usize * height as usize;
        if ids.len() != expected {
            return Err(LayerError::SizeMismatch {
                width,
                height,
                expected,
                got: ids.len(),
            });
        }

        self.init(width, height);
        self.tiles.copy_from_slice(ids);
        self.rebuild();
        tracing::debug!(
            width,
            height,
            segments = self.segments.len(),
            blocks = self.blocks.len(),
            "world layer loaded"
        );
        Ok(())
    }

    /// Build a layer straight from tile data.
    pub fn from_tiles(ids: &[TileId], width: u32, height: u32) -> Result<Self, LayerError> {
        let mut layer = Self::new();
        layer.load(ids, width, height)?;
        Ok(layer)
    }

    /// Release grid storage; the layer becomes 0x0.
    pub fn free(&mut self) {
        self.width = 0;
        self.height = 0;
        self.tiles = Vec::new();
        self.segments = Vec::new();
        self.blocks = Vec::new();
    }

    fn rebuild(&mut self) {
        let remap = self.remap();
        self.segments = collision::segments(&self.tiles, self.width, self.height, &remap);
        self.blocks = collision::hblocks(&self.tiles, self.width, self.height, &remap);
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Tile at column `x` and row `row` (row 0 = bottom). `None` outside the grid.
    pub fn tile(&self, x: u32, row: u32) -> Option<TileId> {
        if x >= self.width || row >= self.height {
            return None;
        }
        self.tiles
            .get(row as usize * self.width as usize + x as usize)
            .copied()
    }

    pub fn is_solid(&self, x: u32, row: u32) -> bool {
        self.tile(x, row).is_some_and(|id| id != 0)
    }

    pub fn tiles(&self) -> &[TileId] {
        &self.tiles
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Horizontal runs of identical solid tiles, for batching draws.
    pub fn blocks(&self) -> &[HBlock] {
        &self.blocks
    }

    pub fn solid_count(&self) -> usize {
        self.tiles.iter().filter(|&&id| id != 0).count()
    }

    /// Coordinate remap for a map the size of this layer.
    pub fn remap(&self) -> MapRemap {
        MapRemap::new(self.width, self.height)
    }

    /// Whether an axis-aligned box (world units) overlaps any solid tile.
    /// Touching edges do not count.
    pub fn overlaps_solid(&self, center: Vec2, size: Vec2) -> bool {
        if self.width == 0 || self.height == 0 {
            return false;
        }
        let remap = self.remap();
        let unit = remap.tile_unit();
        let origin = remap.cell_corner(0, 0);
        let min = (center - size / 2.0 - origin) / unit;
        let max = (center + size / 2.0 - origin) / unit;

        let x0 = min.x.floor().max(0.0) as u32;
        let y0 = min.y.floor().max(0.0) as u32;
        let x1 = (max.x.ceil().min(self.width as f32)).max(0.0) as u32;
        let y1 = (max.y.ceil().min(self.height as f32)).max(0.0) as u32;

        (y0..y1).any(|row| (x0..x1).any(|x| self.is_solid(x, row)))
    }
}

impl Default for WorldLayer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_layer_is_empty() {
        let layer = WorldLayer::new();
        assert_eq!((layer.width(), layer.height()), (0, 0));
        assert!(layer.tiles().is_empty());
        assert!(layer.segments().is_empty());
        assert_eq!(layer.tile(0, 0), None);
    }

    #[test]
    fn init_allocates_empty_grid() {
        let mut layer = WorldLayer::new();
        layer.init(3, 2);
        assert_eq!(layer.tiles().len(), 6);
        assert_eq!(layer.tile(2, 1), Some(0));
        assert_eq!(layer.tile(3, 0), None);
    }

    #[test]
    fn load_rejects_wrong_length() {
        let mut layer = WorldLayer::new();
        let err = layer.load(&[1, 2, 3], 2, 2).unwrap_err();
        assert_eq!(
            err,
            LayerError::SizeMismatch {
                width: 2,
                height: 2,
                expected: 4,
                got: 3
            }
        );
    }

    #[test]
    fn load_indexes_bottom_row_first() {
        let layer = WorldLayer::from_tiles(&[2, 3, 0, 1], 2, 2).unwrap();
        assert_eq!(layer.tile(0, 0), Some(2));
        assert_eq!(layer.tile(1, 0), Some(3));
        assert_eq!(layer.tile(0, 1), Some(0));
        assert_eq!(layer.tile(1, 1), Some(1));
        assert_eq!(layer.solid_count(), 3);
    }

    #[test]
    fn reload_replaces_derived_geometry() {
        let mut layer = WorldLayer::from_tiles(&[1, 1, 1, 1], 2, 2).unwrap();
        assert_eq!(layer.segments().len(), 4);
        layer.load(&[0, 0, 0, 0], 2, 2).unwrap();
        assert!(layer.segments().is_empty());
        assert!(layer.blocks().is_empty());
    }

    #[test]
    fn free_releases_storage() {
        let mut layer = WorldLayer::from_tiles(&[1], 1, 1).unwrap();
        layer.free();
        assert_eq!(layer, WorldLayer::new());
    }

    #[test]
    fn overlap_query() {
        // 2x2 grid at unit 0.5 spans [-0.5, 0.5] on both axes; only the bottom-left tile is solid.
        let layer = WorldLayer::from_tiles(&[1, 0, 0, 0], 2, 2).unwrap();
        assert!(layer.overlaps_solid(Vec2::new(-0.25, -0.25), Vec2::splat(0.1)));
        assert!(!layer.overlaps_solid(Vec2::new(0.25, 0.25), Vec2::splat(0.1)));
        // Touching the solid tile's right edge only.
        assert!(!layer.overlaps_solid(Vec2::new(0.1, -0.25), Vec2::new(0.2, 0.1)));
        assert!(!layer.overlaps_solid(Vec2::new(5.0, 5.0), Vec2::ONE));
    }
}
