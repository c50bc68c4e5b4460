//! Level loading: turns a level file into world layers and object spawn requests.
//!
//! # Invariants
//! - Parsing is single pass over a byte stream; input may arrive in chunks of any size.
//! - Parsing never touches engine state. A failed parse yields an error and nothing else.
//! - Recoverable problems (unknown types, unsupported encodings, oversized values) skip or
//!   clip the offending element with a warning; only malformed markup and IO fail the load.

mod error;
pub mod level;
pub mod markup;

pub use error::LoadError;
pub use level::{
    ATTR_CAPACITY, LevelData, LevelLoader, LoadStats, MAX_LAYER_CELLS, load_file, parse_level,
};
pub use markup::{MarkupError, MarkupErrorKind, Token, Tokenizer};

pub fn crate_info() -> &'static str {
    "tilespace-loader v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("loader"));
    }
}
