//! World layers: the tile grids a level is made of, and the collision geometry derived from them.
//!
//! # Invariants
//! - Row 0 of a layer is the bottom row of the map.
//! - Collision segments are derived data; they are recomputed on every load, never patched.
//! - A level holds at most [`MAX_WORLD_LAYERS`] layers; the last one is the foreground.

mod collision;
mod layer;
mod stack;

pub use collision::{HBlock, Segment};
pub use layer::{LayerError, TileId, WorldLayer};
pub use stack::{LayerStack, MAX_WORLD_LAYERS};

pub fn crate_info() -> &'static str {
    "tilespace-world v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("world"));
    }
}
