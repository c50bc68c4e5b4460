//! Engine kernel: the main loop, fixed-step clock, deferred level loads and the facade that
//! ties objects, layers and modules together.
//!
//! # Invariants
//! - At most one [`Engine`] is alive per thread.
//! - Simulation advances only in whole fixed steps; leftover time carries into the next frame.
//! - Level loads requested during a frame run after that frame is presented, last request wins.
//! - A failed load leaves the current level, objects and layers untouched.
//! - Objects spawned by hooks appear after the pass that spawned them.

pub mod clock;
pub mod config;
pub mod engine;
pub mod modules;
pub mod pending;
pub mod platform;

pub use clock::{FixedStep, FrameTimer};
pub use config::{ConfigError, DisplayConfig, EngineConfig, NO_MAP, RenderConfig};
pub use engine::{Engine, EngineBuilder, EngineError};
pub use modules::{Module, ModuleContainer};
pub use pending::PendingLoad;
pub use platform::{Frame, Headless, Platform};

pub fn crate_info() -> &'static str {
    "tilespace-kernel v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("kernel"));
    }
}
