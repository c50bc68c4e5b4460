use std::any::{Any, TypeId};
use std::collections::HashMap;

/// Type-keyed bag of shared collaborators (sprite caches, texture caches, ...) that object
/// constructors may read. The runtime never looks inside.
#[derive(Default)]
pub struct Resources {
    entries: HashMap<TypeId, Box<dyn Any>>,
}

impl Resources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a resource, returning the previous one of the same type.
    pub fn insert<T: Any>(&mut self, value: T) -> Option<T> {
        self.entries
            .insert(TypeId::of::<T>(), Box::new(value))
            .and_then(|old| old.downcast().ok())
            .map(|old| *old)
    }

    pub fn get<T: Any>(&self) -> Option<&T> {
        self.entries.get(&TypeId::of::<T>())?.downcast_ref()
    }

    pub fn get_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.entries.get_mut(&TypeId::of::<T>())?.downcast_mut()
    }

    pub fn contains<T: Any>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for Resources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resources")
            .field("entries", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SpriteCache(Vec<&'static str>);

    #[test]
    fn insert_and_get_by_type() {
        let mut res = Resources::new();
        assert!(res.insert(SpriteCache(vec!["player"])).is_none());
        assert_eq!(res.get::<SpriteCache>().map(|c| c.0.len()), Some(1));
        assert!(res.get::<u32>().is_none());
    }

    #[test]
    fn insert_replaces_and_returns_previous() {
        let mut res = Resources::new();
        res.insert(1u32);
        assert_eq!(res.insert(2u32), Some(1));
        assert_eq!(res.get::<u32>(), Some(&2));
        assert_eq!(res.len(), 1);
    }

    #[test]
    fn get_mut_allows_updates() {
        let mut res = Resources::new();
        res.insert(SpriteCache(Vec::new()));
        if let Some(cache) = res.get_mut::<SpriteCache>() {
            cache.0.push("coin");
        }
        assert!(res.contains::<SpriteCache>());
        assert_eq!(res.get::<SpriteCache>().map(|c| c.0.clone()), Some(vec!["coin"]));
    }
}
