use glam::Vec2;
use serde::Serialize;
use tilespace_common::MapRemap;

use crate::layer::TileId;

/// A boundary between solid and empty tiles, in world units.
/// `normal` points from the solid side toward the empty side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Segment {
    pub a: Vec2,
    pub b: Vec2,
    pub normal: Vec2,
}

impl Segment {
    pub fn length(&self) -> f32 {
        self.a.distance(self.b)
    }
}

/// A horizontal run of identical solid tiles, in world units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HBlock {
    pub id: TileId,
    /// Center of the run.
    pub position: Vec2,
    pub size: Vec2,
}

fn solid(tiles: &[TileId], width: u32, height: u32, x: i64, row: i64) -> bool {
    if x < 0 || row < 0 || x >= width as i64 || row >= height as i64 {
        return false;
    }
    tiles
        .get(row as usize * width as usize + x as usize)
        .is_some_and(|&id| id != 0)
}

/// Every solid/empty edge of the grid, merged into maximal straight runs.
/// Cells outside the grid count as empty.
pub(crate) fn segments(tiles: &[TileId], width: u32, height: u32, remap: &MapRemap) -> Vec<Segment> {
    let mut out = Vec::new();

    // Horizontal edges: line `y` separates row `y - 1` (below) from row `y` (above).
    for y in 0..=height {
        let mut run: Option<(u32, Vec2)> = None;
        for x in 0..=width {
            let normal = if x < width {
                let below = solid(tiles, width, height, x as i64, y as i64 - 1);
                let above = solid(tiles, width, height, x as i64, y as i64);
                match (below, above) {
                    (true, false) => Some(Vec2::Y),
                    (false, true) => Some(Vec2::NEG_Y),
                    _ => None,
                }
            } else {
                None
            };

            match (run, normal) {
                (Some((_, n)), Some(m)) if n == m => {}
                _ => {
                    if let Some((start, n)) = run.take() {
                        out.push(Segment {
                            a: remap.cell_corner(start, y),
                            b: remap.cell_corner(x, y),
                            normal: n,
                        });
                    }
                    run = normal.map(|n| (x, n));
                }
            }
        }
    }

    // Vertical edges: line `x` separates column `x - 1` (left) from column `x` (right).
    for x in 0..=width {
        let mut run: Option<(u32, Vec2)> = None;
        for row in 0..=height {
            let normal = if row < height {
                let left = solid(tiles, width, height, x as i64 - 1, row as i64);
                let right = solid(tiles, width, height, x as i64, row as i64);
                match (left, right) {
                    (true, false) => Some(Vec2::X),
                    (false, true) => Some(Vec2::NEG_X),
                    _ => None,
                }
            } else {
                None
            };

            match (run, normal) {
                (Some((_, n)), Some(m)) if n == m => {}
                _ => {
                    if let Some((start, n)) = run.take() {
                        out.push(Segment {
                            a: remap.cell_corner(x, start),
                            b: remap.cell_corner(x, row),
                            normal: n,
                        });
                    }
                    run = normal.map(|n| (row, n));
                }
            }
        }
    }

    out
}

pub(crate) fn hblocks(tiles: &[TileId], width: u32, height: u32, remap: &MapRemap) -> Vec<HBlock> {
    let unit = remap.tile_unit();
    let mut out = Vec::new();

    if width == 0 {
        return out;
    }

    let rows = tiles.chunks_exact(width as usize).take(height as usize);
    for (row, cells) in (0u32..).zip(rows) {
        let mut x = 0;
        while x < cells.len() {
            let id = cells[x];
            if id == 0 {
                x += 1;
                continue;
            }
            let start = x;
            while x < cells.len() && cells[x] == id {
                x += 1;
            }
            // `start` is below `width`, so it fits a u32.
            let corner = remap.cell_corner(start as u32, row);
            let size = Vec2::new((x - start) as f32 * unit, unit);
            out.push(HBlock {
                id,
                position: corner + size / 2.0,
                size,
            });
        }
    }

    out
}
