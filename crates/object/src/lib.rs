//! Object runtime: every live game object is a pooled [`Object`] whose behaviour comes from
//! the [`ObjectType`] it was created from.
//!
//! # Invariants
//! - Objects live only inside a [`HandleManager`]; everything else refers to them by handle.
//! - A constructor receives its parameter list by value and owns it from then on.
//! - Hooks never touch the pool directly; they queue [`Command`]s on a [`Context`].

pub mod context;
pub mod draw;
pub mod message;
pub mod object;
pub mod params;
pub mod registry;
pub mod resources;

pub use context::{Command, Context, SpawnRequest};
pub use draw::{DrawList, Sprite};
pub use message::{Message, MessageId, Payload};
pub use object::{Behavior, Object, ObjectCore, SpawnArgs};
pub use params::{ObjectParam, ObjectParams, PARAM_STRING_CAPACITY, ParamValue};
pub use registry::{AcceptAll, FnObjectType, ObjectType, ObjectTypeRegistry, TypeCatalog};
pub use resources::Resources;
pub use tilespace_pool::{Handle, HandleManager};

pub fn crate_info() -> &'static str {
    "tilespace-object v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("object"));
    }
}
