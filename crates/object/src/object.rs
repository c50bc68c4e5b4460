use glam::Vec2;
use serde::Serialize;
use std::rc::Rc;
use tilespace_pool::{Handle, HandleManager};

use crate::context::Context;
use crate::draw::DrawList;
use crate::message::Message;
use crate::params::ObjectParams;
use crate::registry::ObjectType;
use crate::resources::Resources;

/// Where and how a new object starts out, in world units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpawnArgs {
    pub position: Vec2,
    pub angle: f32,
    pub size: Vec2,
    pub visible: bool,
}

impl SpawnArgs {
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            position: Vec2::new(x, y),
            ..Self::default()
        }
    }
}

impl Default for SpawnArgs {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            angle: 0.0,
            size: Vec2::ZERO,
            visible: true,
        }
    }
}

/// State every object carries regardless of its type.
#[derive(Debug, Clone)]
pub struct ObjectCore {
    type_name: Rc<str>,
    handle: Handle,
    pub position: Vec2,
    /// Radians.
    pub angle: f32,
    /// Collision box width and height.
    pub cbox: Vec2,
    pub visible: bool,
}

impl ObjectCore {
    fn new(type_name: Rc<str>, handle: Handle, args: SpawnArgs) -> Self {
        Self {
            type_name,
            handle,
            position: args.position,
            angle: args.angle,
            cbox: args.size,
            visible: args.visible,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }
}

/// Type-specific hooks. Every hook has a no-op default.
pub trait Behavior {
    /// Called once per simulation step.
    fn update(&mut self, _core: &mut ObjectCore, _ctx: &mut Context) {}

    /// Called once per rendered frame.
    fn draw(&mut self, _core: &ObjectCore, _out: &mut DrawList) {}

    /// Called for every message addressed or broadcast to this object.
    fn message(
        &mut self,
        _core: &mut ObjectCore,
        _ctx: &mut Context,
        _sender: Option<Handle>,
        _message: &Message,
    ) {
    }

    /// Called right before the object leaves the pool.
    fn free(&mut self, _core: &mut ObjectCore) {}
}

/// A live object: shared core state plus its type's behaviour.
pub struct Object {
    core: ObjectCore,
    behavior: Box<dyn Behavior>,
}

impl Object {
    /// Allocate an object of type `ty` in `pool` and run the type's constructor on it.
    ///
    /// The constructor sees the core already populated from `args` and may adjust it.
    pub fn create(
        ty: &dyn ObjectType,
        pool: &mut HandleManager<Object>,
        args: SpawnArgs,
        params: ObjectParams,
        resources: &Resources,
    ) -> Handle {
        let type_name: Rc<str> = Rc::from(ty.name());
        let handle = pool.acquire_with(|handle| {
            let mut core = ObjectCore::new(type_name, handle, args);
            let behavior = ty.create(&mut core, params, resources);
            Object { core, behavior }
        });
        tracing::trace!(%handle, type_name = ty.name(), "object created");
        handle
    }

    /// Run the free hook of the object behind `handle` and release its slot.
    /// Returns `false` for stale handles.
    pub fn free(pool: &mut HandleManager<Object>, handle: Handle) -> bool {
        let Some(object) = pool.resolve_mut(handle) else {
            return false;
        };
        object.behavior.free(&mut object.core);
        tracing::trace!(%handle, type_name = object.core.type_name(), "object freed");
        pool.release(handle).is_some()
    }

    pub fn core(&self) -> &ObjectCore {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    pub fn handle(&self) -> Handle {
        self.core.handle
    }

    pub fn type_name(&self) -> &str {
        self.core.type_name()
    }

    pub fn update(&mut self, ctx: &mut Context) {
        self.behavior.update(&mut self.core, ctx);
    }

    pub fn draw(&mut self, out: &mut DrawList) {
        self.behavior.draw(&self.core, out);
    }

    pub fn message(&mut self, ctx: &mut Context, sender: Option<Handle>, message: &Message) {
        self.behavior.message(&mut self.core, ctx, sender, message);
    }
}

impl std::fmt::Debug for Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Object").field("core", &self.core).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::Sprite;
    use crate::message::MessageId;
    use crate::params::ParamValue;
    use crate::registry::FnObjectType;
    use std::cell::RefCell;

    type Log = Rc<RefCell<Vec<String>>>;

    struct Tracer {
        log: Log,
        speed: f32,
    }

    impl Behavior for Tracer {
        fn update(&mut self, core: &mut ObjectCore, _ctx: &mut Context) {
            core.position.x += self.speed;
            self.log.borrow_mut().push("update".into());
        }

        fn draw(&mut self, core: &ObjectCore, out: &mut DrawList) {
            out.push(Sprite::for_object(core, "tracer"));
        }

        fn message(
            &mut self,
            _core: &mut ObjectCore,
            ctx: &mut Context,
            _sender: Option<Handle>,
            message: &Message,
        ) {
            self.log.borrow_mut().push(format!("msg {}", message.id.0));
            ctx.destroy_self();
        }

        fn free(&mut self, _core: &mut ObjectCore) {
            self.log.borrow_mut().push("free".into());
        }
    }

    fn tracer_type(log: Log) -> impl ObjectType {
        FnObjectType::new("tracer", move |core, params, _res| {
            core.cbox = Vec2::splat(2.0);
            Box::new(Tracer {
                log: log.clone(),
                speed: params.float(1).unwrap_or(1.0),
            })
        })
    }

    #[test]
    fn create_runs_constructor_with_params() {
        let log: Log = Rc::default();
        let ty = tracer_type(log.clone());
        let mut pool = HandleManager::with_capacity(4);
        let params = ObjectParams::new().with(1, ParamValue::Float(0.5));

        let h = Object::create(&ty, &mut pool, SpawnArgs::at(1.0, 2.0), params, &Resources::new());

        let object = pool.resolve_mut(h).expect("object exists");
        assert_eq!(object.type_name(), "tracer");
        assert_eq!(object.handle(), h);
        assert_eq!(object.core().position, Vec2::new(1.0, 2.0));
        assert_eq!(object.core().cbox, Vec2::splat(2.0));

        let mut ctx = Context::new(Some(h), 0);
        object.update(&mut ctx);
        assert_eq!(object.core().position.x, 1.5);
        assert_eq!(*log.borrow(), vec!["update"]);
    }

    #[test]
    fn free_runs_hook_then_releases_slot() {
        let log: Log = Rc::default();
        let ty = tracer_type(log.clone());
        let mut pool = HandleManager::with_capacity(4);
        let h = Object::create(&ty, &mut pool, SpawnArgs::default(), ObjectParams::new(), &Resources::new());

        assert!(Object::free(&mut pool, h));
        assert!(pool.resolve(h).is_none());
        assert_eq!(*log.borrow(), vec!["free"]);
        assert!(!Object::free(&mut pool, h));
    }

    #[test]
    fn draw_and_message_reach_behavior() {
        let log: Log = Rc::default();
        let ty = tracer_type(log.clone());
        let mut pool = HandleManager::with_capacity(4);
        let h = Object::create(&ty, &mut pool, SpawnArgs::default(), ObjectParams::new(), &Resources::new());
        let object = pool.resolve_mut(h).expect("object exists");

        let mut out = DrawList::new();
        object.draw(&mut out);
        assert_eq!(out.sprites()[0].source, Some(h));

        let mut ctx = Context::new(Some(h), 0);
        object.message(&mut ctx, None, &Message::new(MessageId::user(1)));
        assert_eq!(log.borrow().last().map(String::as_str), Some("msg 257"));
        assert_eq!(ctx.commands().len(), 1);
    }

    #[test]
    fn spawn_args_default_is_visible() {
        let args = SpawnArgs::default();
        assert!(args.visible);
        assert_eq!(args.size, Vec2::ZERO);
    }
}
