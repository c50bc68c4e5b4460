use std::collections::BTreeMap;
use std::rc::Rc;

use crate::object::{Behavior, ObjectCore};
use crate::params::ObjectParams;
use crate::resources::Resources;

/// An object type descriptor: a name plus a constructor producing the behaviour.
pub trait ObjectType {
    fn name(&self) -> &str;

    /// Build the behaviour for a freshly allocated object. Owns `params`.
    fn create(
        &self,
        core: &mut ObjectCore,
        params: ObjectParams,
        resources: &Resources,
    ) -> Box<dyn Behavior>;
}

/// An [`ObjectType`] backed by a closure.
pub struct FnObjectType<F> {
    name: String,
    build: F,
}

impl<F> FnObjectType<F>
where
    F: Fn(&mut ObjectCore, ObjectParams, &Resources) -> Box<dyn Behavior>,
{
    pub fn new(name: impl Into<String>, build: F) -> Self {
        Self {
            name: name.into(),
            build,
        }
    }
}

impl<F> ObjectType for FnObjectType<F>
where
    F: Fn(&mut ObjectCore, ObjectParams, &Resources) -> Box<dyn Behavior>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn create(
        &self,
        core: &mut ObjectCore,
        params: ObjectParams,
        resources: &Resources,
    ) -> Box<dyn Behavior> {
        (self.build)(core, params, resources)
    }
}

/// Answers whether a type name can be instantiated.
pub trait TypeCatalog {
    fn contains_type(&self, name: &str) -> bool;
}

/// Catalog that knows every name. Used by tooling that inspects levels without a game.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl TypeCatalog for AcceptAll {
    fn contains_type(&self, _name: &str) -> bool {
        true
    }
}

/// Name → type descriptor mapping. BTreeMap keeps listings in a stable order.
#[derive(Clone, Default)]
pub struct ObjectTypeRegistry {
    types: BTreeMap<String, Rc<dyn ObjectType>>,
}

impl ObjectTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type under its own name, replacing any previous type of that name.
    pub fn register<T: ObjectType + 'static>(&mut self, ty: T) {
        let name = ty.name().to_owned();
        if self.types.insert(name.clone(), Rc::new(ty)).is_some() {
            tracing::warn!(type_name = %name, "object type registered twice, replacing");
        } else {
            tracing::debug!(type_name = %name, "registered object type");
        }
    }

    /// Register a closure-backed type.
    pub fn register_fn<F>(&mut self, name: impl Into<String>, build: F)
    where
        F: Fn(&mut ObjectCore, ObjectParams, &Resources) -> Box<dyn Behavior> + 'static,
    {
        self.register(FnObjectType::new(name, build));
    }

    pub fn get(&self, name: &str) -> Option<Rc<dyn ObjectType>> {
        self.types.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl TypeCatalog for ObjectTypeRegistry {
    fn contains_type(&self, name: &str) -> bool {
        self.contains(name)
    }
}

impl std::fmt::Debug for ObjectTypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.types.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Inert;
    impl Behavior for Inert {}

    fn inert(_: &mut ObjectCore, _: ObjectParams, _: &Resources) -> Box<dyn Behavior> {
        Box::new(Inert)
    }

    #[test]
    fn lookup_by_name() {
        let mut registry = ObjectTypeRegistry::new();
        registry.register_fn("door", inert);
        registry.register_fn("coin", inert);

        assert!(registry.get("door").is_some());
        assert!(registry.get("unknown_type").is_none());
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["coin", "door"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn reregistering_replaces() {
        let mut registry = ObjectTypeRegistry::new();
        registry.register_fn("door", inert);
        registry.register_fn("door", inert);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn catalogs() {
        let mut registry = ObjectTypeRegistry::new();
        registry.register(FnObjectType::new("player", inert));
        assert!(registry.contains_type("player"));
        assert!(!registry.contains_type("ghost"));
        assert!(AcceptAll.contains_type("ghost"));
    }
}
