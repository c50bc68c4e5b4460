use serde::Serialize;
use tilespace_pool::Handle;

use crate::message::Message;
use crate::object::SpawnArgs;
use crate::params::ObjectParams;

/// A request to create an object of a registered type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpawnRequest {
    pub type_name: String,
    pub args: SpawnArgs,
    pub params: ObjectParams,
}

impl SpawnRequest {
    pub fn new(type_name: impl Into<String>, args: SpawnArgs) -> Self {
        Self {
            type_name: type_name.into(),
            args,
            params: ObjectParams::new(),
        }
    }

    pub fn with_params(mut self, params: ObjectParams) -> Self {
        self.params = params;
        self
    }
}

/// Something a hook asks the engine to do once the hook returns.
#[derive(Debug, Clone)]
pub enum Command {
    /// Free an object. Stale handles are ignored.
    Destroy(Handle),
    /// Deliver a message to one object.
    Send { target: Handle, message: Message },
    /// Deliver a message to every module and every live object.
    Broadcast(Message),
    /// Create an object after the current pass.
    Spawn(SpawnRequest),
    /// Load a level at the end of the current frame.
    RequestLoad(String),
    /// Leave the main loop after the current frame.
    Terminate,
}

/// Per-hook context: who is running, at which tick, and what it asked for.
#[derive(Debug, Default)]
pub struct Context {
    origin: Option<Handle>,
    tick: u64,
    commands: Vec<Command>,
}

impl Context {
    pub fn new(origin: Option<Handle>, tick: u64) -> Self {
        Self {
            origin,
            tick,
            commands: Vec::new(),
        }
    }

    /// Handle of the object whose hook is running; `None` for modules.
    pub fn origin(&self) -> Option<Handle> {
        self.origin
    }

    /// Simulation steps run since the engine started.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn destroy(&mut self, target: Handle) {
        self.commands.push(Command::Destroy(target));
    }

    pub fn destroy_self(&mut self) {
        if let Some(origin) = self.origin {
            self.destroy(origin);
        }
    }

    pub fn send(&mut self, target: Handle, message: Message) {
        self.commands.push(Command::Send { target, message });
    }

    pub fn broadcast(&mut self, message: Message) {
        self.commands.push(Command::Broadcast(message));
    }

    pub fn spawn(&mut self, request: SpawnRequest) {
        self.commands.push(Command::Spawn(request));
    }

    pub fn request_load(&mut self, map_name: impl Into<String>) {
        self.commands.push(Command::RequestLoad(map_name.into()));
    }

    pub fn terminate(&mut self) {
        self.commands.push(Command::Terminate);
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn into_commands(self) -> Vec<Command> {
        self.commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageId;
    use tilespace_pool::HandleManager;

    #[test]
    fn commands_are_queued_in_order() {
        let mut ctx = Context::new(None, 7);
        ctx.broadcast(Message::new(MessageId::USER));
        ctx.request_load("level2.tmx");
        ctx.terminate();

        assert_eq!(ctx.tick(), 7);
        let commands = ctx.into_commands();
        assert_eq!(commands.len(), 3);
        assert!(matches!(commands[0], Command::Broadcast(_)));
        assert!(matches!(&commands[1], Command::RequestLoad(name) if name == "level2.tmx"));
        assert!(matches!(commands[2], Command::Terminate));
    }

    #[test]
    fn destroy_self_uses_origin() {
        let mut pool = HandleManager::with_capacity(1);
        let me = pool.acquire(());
        let mut ctx = Context::new(Some(me), 0);
        ctx.destroy_self();
        assert!(matches!(ctx.commands(), [Command::Destroy(h)] if *h == me));
    }

    #[test]
    fn destroy_self_without_origin_is_noop() {
        let mut ctx = Context::new(None, 0);
        ctx.destroy_self();
        assert!(ctx.commands().is_empty());
    }
}
