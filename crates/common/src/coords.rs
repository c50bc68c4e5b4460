//! Conversions between map space and world space.
//!
//! Map space is what level files are authored in: pixels, origin at the top-left corner,
//! y growing downward. World space is what objects live in: tile units, origin at the
//! center of the grid, y growing upward.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::types::{MAP_PIXELS_PER_TILE, TILE_UNIT};

/// An axis-aligned rectangle in map pixels, anchored at its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MapRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Remaps rectangles between map pixels and world units for a grid of
/// `width_tiles` by `height_tiles` cells.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapRemap {
    tile_unit: f32,
    width_tiles: u32,
    height_tiles: u32,
}

impl MapRemap {
    /// Remap for a grid of the given size using the engine tile unit.
    pub fn new(width_tiles: u32, height_tiles: u32) -> Self {
        Self::with_tile_unit(width_tiles, height_tiles, TILE_UNIT)
    }

    pub fn with_tile_unit(width_tiles: u32, height_tiles: u32, tile_unit: f32) -> Self {
        Self {
            tile_unit,
            width_tiles,
            height_tiles,
        }
    }

    pub fn tile_unit(&self) -> f32 {
        self.tile_unit
    }

    pub fn width_tiles(&self) -> u32 {
        self.width_tiles
    }

    pub fn height_tiles(&self) -> u32 {
        self.height_tiles
    }

    /// Size of the whole map in pixels.
    pub fn map_size(&self) -> Vec2 {
        let block = self.tile_unit * MAP_PIXELS_PER_TILE;
        Vec2::new(
            block * self.width_tiles as f32,
            block * self.height_tiles as f32,
        )
    }

    /// Size of the whole grid in world units.
    pub fn world_size(&self) -> Vec2 {
        Vec2::new(
            self.tile_unit * self.width_tiles as f32,
            self.tile_unit * self.height_tiles as f32,
        )
    }

    /// Convert a map rectangle into a world-space `(center, size)` pair.
    pub fn to_world(&self, rect: MapRect) -> (Vec2, Vec2) {
        let map = self.map_size();
        let game = self.world_size();

        let size = Vec2::new(
            (rect.width / map.x) * game.x,
            (rect.height / map.y) * game.y,
        );
        let center = Vec2::new(
            -game.x / 2.0 + (game.x * (rect.x / map.x) + size.x / 2.0),
            game.y / 2.0 - (game.y * (rect.y / map.y) + size.y / 2.0),
        );

        (center, size)
    }

    /// Inverse of [`MapRemap::to_world`].
    pub fn to_map(&self, center: Vec2, size: Vec2) -> MapRect {
        let map = self.map_size();
        let game = self.world_size();

        MapRect {
            x: (center.x + game.x / 2.0 - size.x / 2.0) / game.x * map.x,
            y: (game.y / 2.0 - center.y - size.y / 2.0) / game.y * map.y,
            width: size.x / game.x * map.x,
            height: size.y / game.y * map.y,
        }
    }

    /// World position of the bottom-left corner of grid cell `(column, row)`, row 0 at the bottom.
    /// Accepts `column == width` and `row == height` to address the far edges.
    pub fn cell_corner(&self, column: u32, row: u32) -> Vec2 {
        let game = self.world_size();
        Vec2::new(
            -game.x / 2.0 + column as f32 * self.tile_unit,
            -game.y / 2.0 + row as f32 * self.tile_unit,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec2, b: Vec2) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn map_and_world_sizes() {
        let remap = MapRemap::with_tile_unit(4, 2, 0.5);
        assert_eq!(remap.map_size(), Vec2::new(64.0, 32.0));
        assert_eq!(remap.world_size(), Vec2::new(2.0, 1.0));
    }

    #[test]
    fn top_left_tile_maps_to_top_left_of_world() {
        let remap = MapRemap::with_tile_unit(2, 2, 0.5);
        let (center, size) = remap.to_world(MapRect {
            x: 0.0,
            y: 0.0,
            width: 16.0,
            height: 16.0,
        });
        assert!(approx(size, Vec2::new(0.5, 0.5)));
        assert!(approx(center, Vec2::new(-0.25, 0.25)));
    }

    #[test]
    fn bottom_right_tile_maps_to_bottom_right_of_world() {
        let remap = MapRemap::with_tile_unit(2, 2, 0.5);
        let (center, _) = remap.to_world(MapRect {
            x: 16.0,
            y: 16.0,
            width: 16.0,
            height: 16.0,
        });
        assert!(approx(center, Vec2::new(0.25, -0.25)));
    }

    #[test]
    fn whole_map_maps_to_centered_origin() {
        let remap = MapRemap::new(10, 6);
        let map = remap.map_size();
        let (center, size) = remap.to_world(MapRect {
            x: 0.0,
            y: 0.0,
            width: map.x,
            height: map.y,
        });
        assert!(approx(center, Vec2::ZERO));
        assert!(approx(size, remap.world_size()));
    }

    #[test]
    fn to_map_inverts_to_world() {
        let remap = MapRemap::new(20, 15);
        let rect = MapRect {
            x: 37.0,
            y: 112.5,
            width: 24.0,
            height: 40.0,
        };
        let (center, size) = remap.to_world(rect);
        let back = remap.to_map(center, size);
        assert!((back.x - rect.x).abs() < 1e-3);
        assert!((back.y - rect.y).abs() < 1e-3);
        assert!((back.width - rect.width).abs() < 1e-3);
        assert!((back.height - rect.height).abs() < 1e-3);
    }

    #[test]
    fn cell_corners_span_the_grid() {
        let remap = MapRemap::with_tile_unit(4, 2, 1.0);
        assert_eq!(remap.cell_corner(0, 0), Vec2::new(-2.0, -1.0));
        assert_eq!(remap.cell_corner(4, 2), Vec2::new(2.0, 1.0));
    }
}
