use glam::Vec2;
use serde::Serialize;
use tilespace_pool::Handle;

use crate::object::ObjectCore;

/// A textured quad requested by a draw hook, in world units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sprite {
    pub source: Option<Handle>,
    pub sprite: String,
    pub position: Vec2,
    pub size: Vec2,
    pub angle: f32,
    pub depth: i32,
}

impl Sprite {
    /// A sprite covering the collision box of `core`.
    pub fn for_object(core: &ObjectCore, sprite: impl Into<String>) -> Self {
        Self {
            source: Some(core.handle()),
            sprite: sprite.into(),
            position: core.position,
            size: core.cbox,
            angle: core.angle,
            depth: 0,
        }
    }

    pub fn at_depth(mut self, depth: i32) -> Self {
        self.depth = depth;
        self
    }
}

/// Everything drawn in one frame. Cleared by the engine before the draw pass and handed to
/// the renderer after it.
#[derive(Debug, Clone, Default)]
pub struct DrawList {
    sprites: Vec<Sprite>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sprite: Sprite) {
        self.sprites.push(sprite);
    }

    pub fn clear(&mut self) {
        self.sprites.clear();
    }

    pub fn sprites(&self) -> &[Sprite] {
        &self.sprites
    }

    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }

    /// Stable sort back-to-front by depth.
    pub fn sort_by_depth(&mut self) {
        self.sprites.sort_by_key(|s| s.depth);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sprite(name: &str, depth: i32) -> Sprite {
        Sprite {
            source: None,
            sprite: name.into(),
            position: Vec2::ZERO,
            size: Vec2::ONE,
            angle: 0.0,
            depth,
        }
    }

    #[test]
    fn push_and_clear() {
        let mut list = DrawList::new();
        list.push(sprite("a", 0));
        assert_eq!(list.len(), 1);
        list.clear();
        assert!(list.is_empty());
    }

    #[test]
    fn depth_sort_is_stable() {
        let mut list = DrawList::new();
        list.push(sprite("front", 2));
        list.push(sprite("back1", 0));
        list.push(sprite("back2", 0));
        list.sort_by_depth();
        let names: Vec<_> = list.sprites().iter().map(|s| s.sprite.as_str()).collect();
        assert_eq!(names, vec!["back1", "back2", "front"]);
    }
}
