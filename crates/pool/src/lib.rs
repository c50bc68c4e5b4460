//! Handle Manager: a generational slot pool that stores every live object.
//!
//! # Invariants
//! - A handle resolves to exactly the value it was issued for, until that value is released.
//! - Releasing a slot bumps its generation, so stale handles resolve to nothing.
//! - `max_index` is the smallest bound such that every occupied slot lies in `[0, max_index)`.
//! - Storage grows by doubling and is never compacted; indices are stable.

pub mod handle;
pub mod manager;

pub use handle::{Generation, Handle, SlotIndex};
pub use manager::{HandleManager, Iter, IterMut};

pub fn crate_info() -> &'static str {
    "tilespace-pool v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("pool"));
    }
}
