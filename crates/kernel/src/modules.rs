use tilespace_object::{Context, DrawList, Handle, Message};

/// An engine-wide subsystem that is not an object: HUDs, cameras, scripting bridges.
pub trait Module {
    fn name(&self) -> &str;

    /// Called once per simulation step, after the object update pass.
    fn update(&mut self, _ctx: &mut Context) {}

    /// Called once per frame, after the object draw pass.
    fn draw(&mut self, _out: &mut DrawList) {}

    /// Called for every broadcast, before any object sees it.
    fn message(&mut self, _ctx: &mut Context, _sender: Option<Handle>, _message: &Message) {}
}

/// Ordered set of modules.
#[derive(Default)]
pub struct ModuleContainer {
    modules: Vec<Box<dyn Module>>,
}

impl ModuleContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, module: Box<dyn Module>) {
        tracing::debug!(module = module.name(), "module added");
        self.modules.push(module);
    }

    pub fn update(&mut self, ctx: &mut Context) {
        for module in &mut self.modules {
            module.update(ctx);
        }
    }

    pub fn draw(&mut self, out: &mut DrawList) {
        for module in &mut self.modules {
            module.draw(out);
        }
    }

    pub fn broadcast(&mut self, ctx: &mut Context, sender: Option<Handle>, message: &Message) {
        for module in &mut self.modules {
            module.message(ctx, sender, message);
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(|m| m.name())
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl std::fmt::Debug for ModuleContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
