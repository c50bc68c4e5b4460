use std::any::Any;
use std::cell::Cell;
use std::marker::PhantomData;

use thiserror::Error;
use tilespace_loader::{LevelData, LoadError, load_file};
use tilespace_object::{
    Behavior, Command, Context, DrawList, Handle, HandleManager, Message, MessageId, Object,
    ObjectCore, ObjectParams, ObjectType, ObjectTypeRegistry, Resources, SpawnRequest,
};
use tilespace_world::{LayerStack, WorldLayer};

use crate::clock::{FixedStep, FrameTimer};
use crate::config::{ConfigError, EngineConfig};
use crate::modules::{Module, ModuleContainer};
use crate::pending::PendingLoad;
use crate::platform::{Frame, Platform};

/// Frames kept for the average framerate.
const FRAME_HISTORY: usize = 32;

/// Nesting limit for messages sent from message handlers.
const MAX_DISPATCH_DEPTH: usize = 64;

/// Deliveries one top-level hook, send or broadcast may cause, nested ones included.
const MAX_DELIVERIES: usize = 4096;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("an engine is already alive on this thread")]
    AlreadyRunning,

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

thread_local! {
    static ENGINE_ALIVE: Cell<bool> = const { Cell::new(false) };
}

/// Holds the per-thread engine slot while the engine lives.
struct InstanceGuard {
    _not_send: PhantomData<*const ()>,
}

impl InstanceGuard {
    fn acquire() -> Result<Self, EngineError> {
        ENGINE_ALIVE.with(|alive| {
            if alive.replace(true) {
                return Err(EngineError::AlreadyRunning);
            }
            Ok(Self {
                _not_send: PhantomData,
            })
        })
    }
}

impl Drop for InstanceGuard {
    fn drop(&mut self) {
        ENGINE_ALIVE.with(|alive| alive.set(false));
    }
}

/// Work collected while the commands of hooks are applied.
struct Dispatch {
    spawns: Vec<SpawnRequest>,
    remaining: usize,
    exhausted: bool,
}

impl Dispatch {
    fn new() -> Self {
        Self {
            spawns: Vec::new(),
            remaining: MAX_DELIVERIES,
            exhausted: false,
        }
    }

    /// Restore the delivery budget for the next top-level hook.
    fn refill(&mut self) {
        self.remaining = MAX_DELIVERIES;
        self.exhausted = false;
    }

    /// Take one delivery from the budget. Warns once when it runs out.
    fn take(&mut self, id: MessageId) -> bool {
        if self.remaining == 0 {
            if !self.exhausted {
                self.exhausted = true;
                tracing::warn!(
                    id = id.0,
                    limit = MAX_DELIVERIES,
                    "message fan-out over budget, dropping the rest"
                );
            }
            return false;
        }
        self.remaining -= 1;
        true
    }
}

/// Collects object types, resources and modules before the engine exists.
pub struct EngineBuilder {
    config: EngineConfig,
    registry: ObjectTypeRegistry,
    resources: Resources,
    modules: ModuleContainer,
}

impl EngineBuilder {
    pub fn register<T: ObjectType + 'static>(mut self, ty: T) -> Self {
        self.registry.register(ty);
        self
    }

    pub fn register_fn<F>(mut self, name: impl Into<String>, build: F) -> Self
    where
        F: Fn(&mut ObjectCore, ObjectParams, &Resources) -> Box<dyn Behavior> + 'static,
    {
        self.registry.register_fn(name, build);
        self
    }

    /// Replace the whole type registry.
    pub fn registry(mut self, registry: ObjectTypeRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn resource<T: Any>(mut self, value: T) -> Self {
        self.resources.insert(value);
        self
    }

    pub fn module<M: Module + 'static>(mut self, module: M) -> Self {
        self.modules.push(Box::new(module));
        self
    }

    /// Create the engine and load the configured initial map.
    ///
    /// Fails if the config is invalid or another engine is alive on this thread. A missing or
    /// broken initial map is logged and leaves the engine without a level.
    pub fn build(self) -> Result<Engine, EngineError> {
        self.config.validate()?;
        let step = self.config.step()?;
        let guard = InstanceGuard::acquire()?;

        let mut engine = Engine {
            objects: HandleManager::with_capacity(self.config.object_capacity),
            clock: FixedStep::new(step),
            config: self.config,
            registry: self.registry,
            resources: self.resources,
            modules: self.modules,
            layers: LayerStack::new(),
            draw_list: DrawList::new(),
            timer: FrameTimer::new(FRAME_HISTORY),
            pending: PendingLoad::new(),
            map_name: None,
            running: false,
            update_enabled: true,
            draw_enabled: true,
            fps: 0.0,
            frame_count: 0,
            entity_max_index: 0,
            type_cache: Vec::new(),
            _guard: guard,
        };
        tracing::info!(
            object_types = engine.registry.len(),
            modules = engine.modules.len(),
            object_capacity = engine.config.object_capacity,
            tick_rate = engine.config.tick_rate,
            "engine created"
        );

        if let Some(name) = engine.config.initial_map().map(str::to_owned) {
            // Failures are logged by load.
            let _ = engine.load(&name);
        }
        Ok(engine)
    }
}

/// The engine: owns every subsystem and drives the main loop.
///
/// One engine may be alive per thread. Objects live in a generational pool and are only
/// reachable by [`Handle`]; hooks talk back to the engine by queueing [`Command`]s, which are
/// applied as soon as the hook returns, except spawns, which wait for the end of the pass.
pub struct Engine {
    config: EngineConfig,
    registry: ObjectTypeRegistry,
    resources: Resources,
    modules: ModuleContainer,
    objects: HandleManager<Object>,
    layers: LayerStack,
    draw_list: DrawList,
    clock: FixedStep,
    timer: FrameTimer,
    pending: PendingLoad,
    map_name: Option<String>,
    running: bool,
    update_enabled: bool,
    draw_enabled: bool,
    fps: f32,
    frame_count: u64,
    entity_max_index: usize,
    type_cache: Vec<Handle>,
    _guard: InstanceGuard,
}

impl Engine {
    pub fn builder(config: EngineConfig) -> EngineBuilder {
        EngineBuilder {
            config,
            registry: ObjectTypeRegistry::new(),
            resources: Resources::new(),
            modules: ModuleContainer::new(),
        }
    }

    // --- main loop ---

    /// Run frames until the platform asks to close or [`terminate`](Self::terminate) is called.
    pub fn run<P: Platform + ?Sized>(&mut self, platform: &mut P) {
        tracing::info!(map = self.map_name.as_deref().unwrap_or("-"), "starting main loop");
        self.running = true;
        let first_frame = self.frame_count;

        while self.running {
            if platform.should_close() {
                tracing::info!("display requested close");
                break;
            }
            self.frame(platform);
        }

        self.running = false;
        tracing::info!(
            frames = self.frame_count - first_frame,
            average_fps = self.timer.average_fps(),
            "main loop finished"
        );
    }

    /// Run exactly one frame: drain whole simulation steps, draw once, present, then honour a
    /// pending load.
    pub fn frame<P: Platform + ?Sized>(&mut self, platform: &mut P) {
        let _span = tracing::info_span!("frame", index = self.frame_count).entered();

        let delta = platform.frame_delta();
        self.timer.record(delta);
        self.fps = if delta.is_zero() {
            0.0
        } else {
            1.0 / delta.as_secs_f32()
        };
        self.clock.accumulate(delta);
        self.entity_max_index = self.objects.max_index();

        platform.poll_events();

        let mut steps = 0u32;
        while self.clock.try_step() {
            platform.sample_input();
            // Disabled updates still run the accumulator down.
            if self.update_enabled {
                self.update_pass();
            }
            steps += 1;
        }
        tracing::trace!(steps, remainder = ?self.clock.remainder(), "simulation advanced");

        self.draw_list.clear();
        if self.draw_enabled {
            for (_, object) in self.objects.iter_mut() {
                object.draw(&mut self.draw_list);
            }
        }
        self.modules.draw(&mut self.draw_list);

        platform.present(&Frame {
            index: self.frame_count,
            fps: self.fps,
            draw_list: &self.draw_list,
            layers: &self.layers,
        });
        self.frame_count += 1;

        if let Some(name) = self.pending.take() {
            tracing::debug!(map = %name, "acknowledging deferred load");
            // Failures are logged by load and keep the current level.
            let _ = self.load(&name);
        }
    }

    /// Leave the main loop once the current frame completes.
    pub fn terminate(&mut self) {
        if self.running {
            tracing::info!("engine terminate requested");
        }
        self.running = false;
    }

    fn update_pass(&mut self) {
        let mut dispatch = Dispatch::new();
        let tick = self.tick();

        let mut index = 0;
        while index < self.objects.max_index() {
            if let Some(handle) = self.objects.handle_at(index) {
                let mut ctx = Context::new(Some(handle), tick);
                if let Some(object) = self.objects.resolve_mut(handle) {
                    object.update(&mut ctx);
                }
                dispatch.refill();
                self.dispatch(ctx, &mut dispatch, 0);
            }
            index += 1;
        }

        let mut ctx = Context::new(None, tick);
        self.modules.update(&mut ctx);
        dispatch.refill();
        self.dispatch(ctx, &mut dispatch, 0);

        self.spawn_all(dispatch.spawns);
    }

    // --- levels ---

    /// Queue a level load for the end of the current frame. A later request replaces an
    /// earlier one.
    pub fn request_load(&mut self, name: impl Into<String>) {
        self.pending.request(name);
    }

    pub fn pending_load(&self) -> Option<&str> {
        self.pending.peek()
    }

    /// Load a level right now. On failure the current level stays in place.
    pub fn load(&mut self, name: &str) -> Result<(), LoadError> {
        let path = self.config.map_path(name);
        match load_file(&path, &self.registry) {
            Ok(level) => {
                self.load_level(name, level);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(map = name, %err, "level load failed, keeping current level");
                Err(err)
            }
        }
    }

    /// Replace the current level with already parsed level data: every object is freed, every
    /// layer replaced, the new objects created, then [`MessageId::MAP_READY`] is broadcast.
    pub fn load_level(&mut self, name: &str, level: LevelData) {
        let _span = tracing::info_span!("commit_level", map = name).entered();

        self.flush_objects();
        self.layers.replace(level.layers);

        let requested = level.objects.len();
        let created = level
            .objects
            .into_iter()
            .filter_map(|request| self.spawn(request))
            .count();

        self.map_name = Some(name.to_owned());
        tracing::info!(
            map = name,
            layers = self.layers.len(),
            objects = created,
            skipped_objects = requested - created + level.stats.skipped_objects,
            skipped_layers = level.stats.skipped_layers,
            "level loaded"
        );

        self.broadcast(Message::new(MessageId::MAP_READY));
    }

    /// The layer objects collide against, if a level is loaded.
    pub fn foreground_world(&self) -> Option<&WorldLayer> {
        self.layers.foreground()
    }

    pub fn layers(&self) -> &LayerStack {
        &self.layers
    }

    pub fn map_name(&self) -> Option<&str> {
        self.map_name.as_deref()
    }

    // --- objects ---

    /// Create an object right away. Unknown types are logged and yield `None`.
    pub fn spawn(&mut self, request: SpawnRequest) -> Option<Handle> {
        let Some(ty) = self.registry.get(&request.type_name) else {
            tracing::warn!(type_name = %request.type_name, "cannot spawn unknown object type");
            return None;
        };
        Some(Object::create(
            ty.as_ref(),
            &mut self.objects,
            request.args,
            request.params,
            &self.resources,
        ))
    }

    fn spawn_all(&mut self, spawns: Vec<SpawnRequest>) {
        for request in spawns {
            self.spawn(request);
        }
    }

    /// Free one object. Stale handles return `false`.
    pub fn destroy(&mut self, handle: Handle) -> bool {
        Object::free(&mut self.objects, handle)
    }

    /// Free every live object.
    pub fn flush_objects(&mut self) {
        let handles = self.objects.handles();
        let count = handles.len();
        for handle in handles {
            Object::free(&mut self.objects, handle);
        }
        if count > 0 {
            tracing::debug!(count, "objects flushed");
        }
    }

    /// Free every live object of one type, returning how many went.
    pub fn destroy_objects_of_type(&mut self, type_name: &str) -> usize {
        let doomed: Vec<Handle> = self
            .objects
            .iter()
            .filter(|(_, object)| object.type_name() == type_name)
            .map(|(handle, _)| handle)
            .collect();
        for &handle in &doomed {
            Object::free(&mut self.objects, handle);
        }
        doomed.len()
    }

    /// First live object of a type, in slot order.
    pub fn get_object_by_type(&self, type_name: &str) -> Option<Handle> {
        self.objects
            .iter()
            .find(|(_, object)| object.type_name() == type_name)
            .map(|(handle, _)| handle)
    }

    /// Every live object of a type, in slot order. The list is rebuilt by the next call.
    pub fn get_object_list_by_type(&mut self, type_name: &str) -> &[Handle] {
        self.type_cache.clear();
        self.type_cache.extend(
            self.objects
                .iter()
                .filter(|(_, object)| object.type_name() == type_name)
                .map(|(handle, _)| handle),
        );
        &self.type_cache
    }

    /// Visit every live object in slot order.
    pub fn foreach_object(&mut self, mut f: impl FnMut(Handle, &mut Object)) {
        for (handle, object) in self.objects.iter_mut() {
            f(handle, object);
        }
    }

    pub fn object(&self, handle: Handle) -> Option<&Object> {
        self.objects.resolve(handle)
    }

    pub fn object_mut(&mut self, handle: Handle) -> Option<&mut Object> {
        self.objects.resolve_mut(handle)
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    // --- messages ---

    /// Deliver a message to every module, then to every live object in slot order.
    pub fn broadcast(&mut self, message: Message) {
        let mut dispatch = Dispatch::new();
        self.deliver_all(None, &message, &mut dispatch, 0);
        self.spawn_all(dispatch.spawns);
    }

    /// Deliver a message to one object. Returns `false` if the handle is stale.
    pub fn send(&mut self, target: Handle, message: Message) -> bool {
        if !self.objects.contains(target) {
            return false;
        }
        let mut dispatch = Dispatch::new();
        self.deliver(None, target, &message, &mut dispatch, 0);
        self.spawn_all(dispatch.spawns);
        true
    }

    /// Apply what a hook queued. Spawns are collected for the caller to create later.
    fn dispatch(&mut self, ctx: Context, dispatch: &mut Dispatch, depth: usize) {
        let origin = ctx.origin();
        for command in ctx.into_commands() {
            match command {
                Command::Destroy(target) => {
                    self.destroy(target);
                }
                Command::Send { target, message } => {
                    self.deliver(origin, target, &message, dispatch, depth + 1)
                }
                Command::Broadcast(message) => {
                    self.deliver_all(origin, &message, dispatch, depth + 1)
                }
                Command::Spawn(request) => dispatch.spawns.push(request),
                Command::RequestLoad(name) => self.request_load(name),
                Command::Terminate => self.terminate(),
            }
        }
    }

    fn deliver(
        &mut self,
        sender: Option<Handle>,
        target: Handle,
        message: &Message,
        dispatch: &mut Dispatch,
        depth: usize,
    ) {
        if depth > MAX_DISPATCH_DEPTH {
            tracing::error!(%target, id = message.id.0, "message chain too deep, dropping");
            return;
        }
        if !self.objects.contains(target) {
            tracing::trace!(%target, "message to stale handle dropped");
            return;
        }
        if !dispatch.take(message.id) {
            return;
        }
        let Some(object) = self.objects.resolve_mut(target) else {
            return;
        };
        let mut ctx = Context::new(Some(target), self.clock.total_steps());
        object.message(&mut ctx, sender, message);
        self.dispatch(ctx, dispatch, depth);
    }

    fn deliver_all(
        &mut self,
        sender: Option<Handle>,
        message: &Message,
        dispatch: &mut Dispatch,
        depth: usize,
    ) {
        if depth > MAX_DISPATCH_DEPTH {
            tracing::error!(id = message.id.0, "broadcast chain too deep, dropping");
            return;
        }
        if !self.modules.is_empty() && dispatch.take(message.id) {
            let mut ctx = Context::new(None, self.tick());
            self.modules.broadcast(&mut ctx, sender, message);
            self.dispatch(ctx, dispatch, depth);
        }

        let mut index = 0;
        while index < self.objects.max_index() {
            if let Some(handle) = self.objects.handle_at(index) {
                self.deliver(sender, handle, message, dispatch, depth);
            }
            index += 1;
        }
    }

    // --- state ---

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &ObjectTypeRegistry {
        &self.registry
    }

    pub fn resources(&self) -> &Resources {
        &self.resources
    }

    pub fn resources_mut(&mut self) -> &mut Resources {
        &mut self.resources
    }

    /// Draw list of the last frame.
    pub fn draw_list(&self) -> &DrawList {
        &self.draw_list
    }

    pub fn frame_timer(&self) -> &FrameTimer {
        &self.timer
    }

    /// Framerate implied by the last frame's delta.
    pub fn fps(&self) -> f32 {
        self.fps
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Simulation steps taken so far.
    pub fn tick(&self) -> u64 {
        self.clock.total_steps()
    }

    /// Object pool scan bound sampled at the start of the last frame.
    pub fn entity_max_index(&self) -> usize {
        self.entity_max_index
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn update_enabled(&self) -> bool {
        self.update_enabled
    }

    pub fn set_update_enabled(&mut self, enabled: bool) {
        self.update_enabled = enabled;
    }

    pub fn draw_enabled(&self) -> bool {
        self.draw_enabled
    }

    pub fn set_draw_enabled(&mut self, enabled: bool) {
        self.draw_enabled = enabled;
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.flush_objects();
        self.layers.clear();
        tracing::info!(frames = self.frame_count, "engine shut down");
    }
}
