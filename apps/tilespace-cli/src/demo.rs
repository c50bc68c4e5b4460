//! Object types and a module for running levels from the command line.

use glam::Vec2;
use tilespace_kernel::{EngineBuilder, Module};
use tilespace_object::{
    Behavior, Context, DrawList, Handle, Message, MessageId, ObjectCore, Payload, Sprite,
};

/// Broadcast by the player with its x position; coins behind it are collected.
pub const PLAYER_PASSED: MessageId = MessageId::user(1);

/// Param key of a player's speed, in world units per step.
const SPEED: i32 = 0;
/// Param key of the map an exit leads to.
const TARGET: i32 = 0;

const DEFAULT_SPEED: f32 = 0.05;

struct Player {
    speed: f32,
}

impl Behavior for Player {
    fn update(&mut self, core: &mut ObjectCore, ctx: &mut Context) {
        core.position.x += self.speed;
        if ctx.tick() % 30 == 0 {
            ctx.broadcast(Message::with_payload(
                PLAYER_PASSED,
                Payload::Float(f64::from(core.position.x)),
            ));
        }
    }

    fn draw(&mut self, core: &ObjectCore, out: &mut DrawList) {
        out.push(Sprite::for_object(core, "player").at_depth(10));
    }
}

struct Coin;

impl Behavior for Coin {
    fn draw(&mut self, core: &ObjectCore, out: &mut DrawList) {
        if core.visible {
            out.push(Sprite::for_object(core, "coin"));
        }
    }

    fn message(
        &mut self,
        core: &mut ObjectCore,
        ctx: &mut Context,
        _sender: Option<Handle>,
        message: &Message,
    ) {
        if message.id != PLAYER_PASSED {
            return;
        }
        if let Some(x) = message.payload.as_float() {
            if x as f32 > core.position.x {
                tracing::info!(handle = %core.handle(), "coin collected");
                ctx.destroy_self();
            }
        }
    }
}

/// Loads its target map once the player has passed it.
struct Exit {
    target: Option<String>,
    triggered: bool,
}

impl Behavior for Exit {
    fn message(
        &mut self,
        core: &mut ObjectCore,
        ctx: &mut Context,
        _sender: Option<Handle>,
        message: &Message,
    ) {
        if message.id == MessageId::MAP_READY {
            tracing::info!(
                x = core.position.x,
                y = core.position.y,
                target = self.target.as_deref().unwrap_or("-"),
                "exit placed"
            );
            return;
        }
        if message.id != PLAYER_PASSED || self.triggered {
            return;
        }
        let passed = message
            .payload
            .as_float()
            .is_some_and(|x| x as f32 > core.position.x);
        if let (true, Some(target)) = (passed, &self.target) {
            tracing::info!(target = %target, "exit reached");
            self.triggered = true;
            ctx.request_load(target.clone());
        }
    }
}

/// Counts simulation steps and level changes, and draws a banner once a level is up.
#[derive(Default)]
pub struct Hud {
    steps: u64,
    levels: u32,
}

impl Hud {
    fn banner(&self) -> String {
        format!("hud:level{}", self.levels)
    }
}

impl Module for Hud {
    fn name(&self) -> &str {
        "hud"
    }

    fn update(&mut self, _ctx: &mut Context) {
        self.steps += 1;
    }

    fn draw(&mut self, out: &mut DrawList) {
        if self.levels == 0 {
            return;
        }
        out.push(Sprite {
            source: None,
            sprite: self.banner(),
            position: Vec2::ZERO,
            size: Vec2::ONE,
            angle: 0.0,
            depth: 100,
        });
    }

    fn message(&mut self, _ctx: &mut Context, _sender: Option<Handle>, message: &Message) {
        if message.id == MessageId::MAP_READY {
            self.levels += 1;
            tracing::debug!(steps = self.steps, levels = self.levels, "hud saw level change");
        }
    }
}

/// Register the demo object types and module.
pub fn install(builder: EngineBuilder) -> EngineBuilder {
    builder
        .register_fn("player", |_core, params, _res| {
            Box::new(Player {
                speed: params.float(SPEED).unwrap_or(DEFAULT_SPEED),
            })
        })
        .register_fn("coin", |_core, _params, _res| Box::new(Coin))
        .register_fn("exit", |_core, params, _res| {
            Box::new(Exit {
                target: params.string(TARGET).map(str::to_owned),
                triggered: false,
            })
        })
        .module(Hud::default())
}
