//! Shared, handle-based access to an [`Engine`].
//!
//! Hosts that hand the engine to several callbacks (a frame scheduler, UI
//! buttons, collision listeners) hold cheap clones of an [`EngineHandle`].
//! Every call borrows the engine for its duration; a call that arrives while
//! another one still holds it, typically a listener calling `step` from
//! inside a step, fails with [`PhysicsError::Reentrancy`] instead of
//! corrupting the pipeline.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::error;

use crate::body::{Body, ShapeSpec};
use crate::engine::{CollisionEvent, Engine, RunState, StepReport};
use crate::error::{PhysicsError, Result};
use crate::types::{BodyId, Vec2};
use crate::world::{BodySnapshot, World};

#[derive(Debug, Clone)]
pub struct EngineHandle {
    inner: Rc<RefCell<Engine>>,
}

impl EngineHandle {
    pub fn new(engine: Engine) -> Self {
        Self {
            inner: Rc::new(RefCell::new(engine)),
        }
    }

    /// Handle to a fresh engine around an empty world.
    pub fn create(gravity: Vec2, time_scale: f64) -> Result<Self> {
        Engine::create(gravity, time_scale).map(Self::new)
    }

    /// Tears the engine down and returns its world.
    ///
    /// Fails, handing the handle back, while other clones are alive.
    pub fn destroy(self) -> std::result::Result<World, Self> {
        match Rc::try_unwrap(self.inner) {
            Ok(cell) => Ok(cell.into_inner().destroy()),
            Err(inner) => Err(Self { inner }),
        }
    }

    fn with<R>(&self, op: &str, f: impl FnOnce(&Engine) -> R) -> Result<R> {
        match self.inner.try_borrow() {
            Ok(engine) => Ok(f(&*engine)),
            Err(_) => Err(reentrancy(op)),
        }
    }

    fn with_mut<R>(&self, op: &str, f: impl FnOnce(&mut Engine) -> R) -> Result<R> {
        match self.inner.try_borrow_mut() {
            Ok(mut engine) => Ok(f(&mut *engine)),
            Err(_) => Err(reentrancy(op)),
        }
    }

    // ===== Stepping and lifecycle =====

    pub fn step(&self, dt: f64) -> Result<StepReport> {
        self.with_mut("step", |e| e.step(dt))?
    }

    pub fn advance(&self, elapsed: f64) -> Result<Vec<StepReport>> {
        self.with_mut("advance", |e| e.advance(elapsed))?
    }

    pub fn start(&self) -> Result<bool> {
        self.with_mut("start", Engine::start)
    }

    pub fn stop(&self) -> Result<bool> {
        self.with_mut("stop", Engine::stop)
    }

    pub fn pause(&self) -> Result<bool> {
        self.with_mut("pause", Engine::pause)
    }

    pub fn resume(&self) -> Result<bool> {
        self.with_mut("resume", Engine::resume)
    }

    pub fn state(&self) -> Result<RunState> {
        self.with("state", Engine::state)
    }

    pub fn on_collision<F>(&self, listener: F) -> Result<()>
    where
        F: FnMut(&CollisionEvent, &mut World) + 'static,
    {
        self.with_mut("on_collision", |e| e.on_collision(listener))
    }

    // ===== World access =====

    pub fn add_body(&self, body: Body) -> Result<BodyId> {
        self.with_mut("add_body", |e| e.world_mut().add_body(body))
    }

    pub fn spawn(&self, spec: &ShapeSpec) -> Result<BodyId> {
        self.with_mut("spawn", |e| e.world_mut().spawn(spec))?
    }

    pub fn remove_body(&self, id: BodyId) -> Result<()> {
        self.with_mut("remove_body", |e| e.world_mut().remove_body(id))?
    }

    pub fn clear(&self, keep_statics: bool) -> Result<()> {
        self.with_mut("clear", |e| e.world_mut().clear(keep_statics))
    }

    pub fn set_gravity(&self, gravity: Vec2) -> Result<()> {
        self.with_mut("set_gravity", |e| e.world_mut().set_gravity(gravity))?
    }

    pub fn set_time_scale(&self, time_scale: f64) -> Result<()> {
        self.with_mut("set_time_scale", |e| e.world_mut().set_time_scale(time_scale))?
    }

    pub fn query_state(&self) -> Result<Vec<BodySnapshot>> {
        self.with("query_state", |e| e.world().query_state())
    }

    /// Runs `f` against the world, e.g. to read a body between steps.
    pub fn with_world<R>(&self, f: impl FnOnce(&World) -> R) -> Result<R> {
        self.with("with_world", |e| f(e.world()))
    }
}

fn reentrancy(op: &str) -> PhysicsError {
    error!(op, "engine is busy: reentrant call while a step is in progress");
    PhysicsError::Reentrancy
}
