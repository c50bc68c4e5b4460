//! Shared types and coordinate-space helpers for the tilespace engine.
//!
//! # Invariants
//! - World space is centered on the origin with y growing upward.
//! - Map space has its origin at the top-left corner with y growing downward.

pub mod coords;
pub mod numeric;
pub mod types;

pub use coords::{MapRemap, MapRect};
pub use numeric::{leading_float, leading_int};
pub use types::{MAP_PIXELS_PER_TILE, TILE_UNIT};

pub fn crate_info() -> &'static str {
    "tilespace-common v0.1.0"
}
