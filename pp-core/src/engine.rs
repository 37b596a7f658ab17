//! The engine: run-state machine and the fixed-step pipeline.
//!
//! ## State machine
//!
//! ```text
//!            start()            pause()
//!  Stopped ──────────► Running ─────────► Paused
//!     ▲                  ▲  │               │
//!     │     stop()       │  └──── resume() ─┘
//!     └──────────────────┴───────────────────
//! ```
//!
//! `step` and `advance` do nothing unless the engine is Running. Rejected
//! transitions leave the state unchanged and return `false`.
//!
//! ## One step
//!
//! 1. apply the world's pending mutations
//! 2. integrate velocities (gravity, applied forces, air friction)
//! 3. broad-phase over bounding boxes
//! 4. narrow-phase contact generation
//! 5. sequential-impulse solve
//! 6. integrate positions
//! 7. emit collision events, clear accumulated forces
//!
//! Every stage walks the bodies in id order, so identical inputs produce
//! bit-identical results.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, info, warn};

use crate::collision::{collide, sweep_and_prune, Contact, ContactSolver, Proxy};
use crate::config::EngineConfig;
use crate::error::{PhysicsError, Result};
use crate::forces::PlaygroundForces;
use crate::integrator::SemiImplicitEuler;
use crate::types::{BodyId, Vec2};
use crate::world::World;

// =============================================================================
// Public types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Stopped,
    Running,
    Paused,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Stopped => write!(f, "stopped"),
            RunState::Running => write!(f, "running"),
            RunState::Paused => write!(f, "paused"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionPhase {
    /// The pair touches this step but did not on the previous one.
    Started,
    /// The pair touched on the previous step but no longer does.
    Ended,
}

/// A change in contact between two bodies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionEvent {
    pub phase: CollisionPhase,
    /// Lower id of the pair
    pub body_a: BodyId,
    pub body_b: BodyId,
    /// Normal from `body_a` to `body_b`; for `Ended`, the last one seen
    pub normal: Vec2,
    pub depth: f64,
}

/// What one call to [`Engine::step`] did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepReport {
    /// Tick counter after the step
    pub tick: u64,
    /// Effective (time-scaled) step size
    pub dt: f64,
    pub candidate_pairs: usize,
    pub contacts: usize,
    pub added: usize,
    pub removed: usize,
    /// Bodies frozen during this step
    pub degenerated: Vec<BodyId>,
    /// Non-fatal conditions raised during the step
    pub warnings: Vec<PhysicsError>,
    /// True when the engine was not running and nothing happened
    pub skipped: bool,
}

type CollisionListener = Box<dyn FnMut(&CollisionEvent, &mut World)>;

// =============================================================================
// Engine
// =============================================================================

/// Owns a [`World`] and advances it in time.
pub struct Engine {
    world: World,
    config: EngineConfig,
    solver: ContactSolver,
    state: RunState,
    tick: u64,
    accumulator: f64,
    contacts: Vec<Contact>,
    /// Touching pairs from the previous step with their last normal and depth
    touching: BTreeMap<(BodyId, BodyId), (Vec2, f64)>,
    listeners: Vec<CollisionListener>,
}

impl Engine {
    /// Engine around an empty world, with default configuration.
    pub fn create(gravity: Vec2, time_scale: f64) -> Result<Self> {
        Self::new(World::new(gravity, time_scale)?, EngineConfig::default())
    }

    /// Engine around an existing world. Starts in [`RunState::Stopped`].
    pub fn new(world: World, config: EngineConfig) -> Result<Self> {
        config.check()?;
        info!(bodies = world.body_count(), "engine created");
        Ok(Self {
            world,
            solver: ContactSolver::new(config.solver),
            config,
            state: RunState::Stopped,
            tick: 0,
            accumulator: 0.0,
            contacts: Vec::new(),
            touching: BTreeMap::new(),
            listeners: Vec::new(),
        })
    }

    /// Tears the engine down and hands back its world.
    pub fn destroy(self) -> World {
        info!(tick = self.tick, "engine destroyed");
        self.world
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == RunState::Running
    }

    /// Number of steps executed so far.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Contacts resolved by the last step.
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    /// Registers a listener for collision events.
    ///
    /// Listeners run after the step's pipeline has finished. Structural
    /// mutations they make through the `World` are applied at the next step.
    pub fn on_collision<F>(&mut self, listener: F)
    where
        F: FnMut(&CollisionEvent, &mut World) + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    // ===== Lifecycle =====

    pub fn start(&mut self) -> bool {
        self.transition("start", RunState::Stopped, RunState::Running)
    }

    pub fn pause(&mut self) -> bool {
        self.transition("pause", RunState::Running, RunState::Paused)
    }

    pub fn resume(&mut self) -> bool {
        self.transition("resume", RunState::Paused, RunState::Running)
    }

    /// Stops from any state. The world is kept as-is.
    pub fn stop(&mut self) -> bool {
        if self.state == RunState::Stopped {
            debug!("stop: already stopped");
            return false;
        }
        info!(from = %self.state, "engine stopped");
        self.state = RunState::Stopped;
        self.accumulator = 0.0;
        true
    }

    fn transition(&mut self, op: &str, from: RunState, to: RunState) -> bool {
        if self.state != from {
            warn!(op, state = %self.state, "rejected engine transition");
            return false;
        }
        info!(op, %from, %to, "engine state changed");
        self.state = to;
        true
    }

    // ===== Stepping =====

    /// Advances the world by `dt` seconds (before time scaling).
    ///
    /// A no-op returning a `skipped` report unless the engine is Running.
    pub fn step(&mut self, dt: f64) -> Result<StepReport> {
        if !(dt >= 0.0 && dt.is_finite()) {
            return Err(PhysicsError::config(format!("dt must be finite and >= 0, got {dt}")));
        }
        if !self.is_running() {
            debug!(state = %self.state, "step ignored");
            return Ok(StepReport {
                tick: self.tick,
                skipped: true,
                ..StepReport::default()
            });
        }

        let commit = self.world.commit_pending();
        let dt_eff = dt * self.world.time_scale();
        let forces = PlaygroundForces::new(self.world.gravity(), self.config.gravity_scale);
        let mut report = StepReport {
            dt: dt_eff,
            added: commit.added,
            removed: commit.removed,
            ..StepReport::default()
        };

        let bodies = self.world.bodies_mut();

        for body in bodies.iter_mut() {
            if let Err(err) = SemiImplicitEuler::integrate_velocity(body, &forces, dt_eff) {
                report.record_degenerate(err);
            }
        }

        let proxies: Vec<Proxy> = bodies
            .iter()
            .map(|b| Proxy {
                aabb: b.aabb(),
                fixed: b.is_fixed(),
            })
            .collect();
        let pairs = sweep_and_prune(&proxies);
        report.candidate_pairs = pairs.len();

        let mut contacts: Vec<Contact> = pairs
            .iter()
            .filter_map(|&(i, k)| collide(i, &bodies[i], k, &bodies[k]))
            .collect();
        report.contacts = contacts.len();

        self.solver
            .solve(bodies, &mut contacts, forces.effective_gravity(), dt_eff);

        for body in bodies.iter_mut() {
            if let Err(err) = SemiImplicitEuler::integrate_position(body, dt_eff) {
                report.record_degenerate(err);
            }
            body.clear_forces();
        }

        self.tick += 1;
        report.tick = self.tick;
        self.contacts = contacts;

        for id in &report.degenerated {
            warn!(%id, tick = self.tick, "non-finite state, body frozen");
        }
        debug!(
            tick = self.tick,
            dt = dt_eff,
            pairs = report.candidate_pairs,
            contacts = report.contacts,
            "step complete"
        );

        let events = self.collision_events();
        self.dispatch(&events);
        Ok(report)
    }

    /// Runs as many fixed steps as `elapsed` real seconds allow.
    ///
    /// At most `max_substeps` steps run per call; time beyond that is
    /// dropped. Returns the reports of the steps that ran.
    pub fn advance(&mut self, elapsed: f64) -> Result<Vec<StepReport>> {
        if !(elapsed >= 0.0 && elapsed.is_finite()) {
            return Err(PhysicsError::config(format!(
                "elapsed time must be finite and >= 0, got {elapsed}"
            )));
        }
        if !self.is_running() {
            return Ok(Vec::new());
        }

        let fixed_dt = self.config.fixed_dt;
        self.accumulator += elapsed;
        let mut reports = Vec::new();
        while self.accumulator >= fixed_dt && reports.len() < self.config.max_substeps as usize {
            reports.push(self.step(fixed_dt)?);
            self.accumulator -= fixed_dt;
        }
        if self.accumulator >= fixed_dt {
            let dropped = self.accumulator - self.accumulator % fixed_dt;
            debug!(dropped, "accumulator clamped");
            self.accumulator %= fixed_dt;
        }
        Ok(reports)
    }

    /// Fraction of a fixed step left in the accumulator, for interpolation.
    pub fn alpha(&self) -> f64 {
        self.accumulator / self.config.fixed_dt
    }

    fn collision_events(&mut self) -> Vec<CollisionEvent> {
        let mut events = Vec::new();
        let mut now = BTreeMap::new();

        for c in &self.contacts {
            if !self.touching.contains_key(&c.pair()) {
                events.push(CollisionEvent {
                    phase: CollisionPhase::Started,
                    body_a: c.body_a,
                    body_b: c.body_b,
                    normal: c.normal,
                    depth: c.depth,
                });
            }
            now.insert(c.pair(), (c.normal, c.depth));
        }
        for (&(body_a, body_b), &(normal, depth)) in &self.touching {
            if !now.contains_key(&(body_a, body_b)) {
                events.push(CollisionEvent {
                    phase: CollisionPhase::Ended,
                    body_a,
                    body_b,
                    normal,
                    depth,
                });
            }
        }

        self.touching = now;
        events
    }

    fn dispatch(&mut self, events: &[CollisionEvent]) {
        for event in events {
            for listener in self.listeners.iter_mut() {
                listener(event, &mut self.world);
            }
        }
    }
}

impl StepReport {
    fn record_degenerate(&mut self, err: PhysicsError) {
        if let PhysicsError::DegenerateState { id } = err {
            self.degenerated.push(id);
        }
        self.warnings.push(err);
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("state", &self.state)
            .field("tick", &self.tick)
            .field("bodies", &self.world.body_count())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
