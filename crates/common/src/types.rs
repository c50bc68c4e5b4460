/// World-space edge length of one tile.
pub const TILE_UNIT: f32 = 0.5;

/// Map-space (pixel) edge length of one tile, per world tile unit.
pub const MAP_PIXELS_PER_TILE: f32 = 32.0;
