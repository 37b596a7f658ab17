//! # PP Core
//!
//! A deterministic 2D rigid-body engine for the physics playground.
//!
//! ## Architecture
//!
//! - `types`: Core data structures (Vec2, ids, constants)
//! - `error`: Error taxonomy shared by every operation
//! - `shape` / `body`: Circles and convex polygons, mass properties, factories
//! - `world`: Body storage, gravity, time scale and the pending-mutation queue
//! - `collision`: Sort-and-sweep broad-phase, SAT narrow-phase, impulse solver
//! - `integrator` / `forces`: Semi-implicit Euler and the force model
//! - `engine`: Run-state machine, step pipeline, accumulator, collision events
//! - `handle`: Shared engine handle that rejects reentrant calls
//! - `config` / `materials`: YAML-backed tuning and material presets
//! - `playground`: The demo scene (canvas boundaries, random spawners, sliders)
//!
//! ## Example
//!
//! ```
//! use pp_core::{make_circle, make_rectangle, BodyOptions, Engine, Vec2};
//!
//! let mut engine = Engine::create(Vec2::new(0.0, 1.0), 1.0).unwrap();
//! let world = engine.world_mut();
//! world.add_body(make_rectangle(Vec2::new(400.0, 650.0), 900.0, 100.0, BodyOptions::fixed()).unwrap());
//! let ball = world.add_body(make_circle(Vec2::new(400.0, 0.0), 20.0, BodyOptions::default()).unwrap());
//!
//! engine.start();
//! for _ in 0..60 {
//!     engine.step(1.0 / 60.0).unwrap();
//! }
//! assert!(engine.world().body(ball).unwrap().position().y > 0.0);
//! ```

pub mod body;
pub mod collision;
pub mod config;
pub mod engine;
pub mod error;
pub mod forces;
pub mod handle;
pub mod integrator;
pub mod materials;
pub mod playground;
pub mod shape;
pub mod types;
pub mod world;

pub use body::{make_circle, make_polygon, make_rectangle, Body, BodyOptions, ShapeSpec};
pub use collision::{Contact, ContactPoint};
pub use config::{ConfigError, EngineConfig, SolverConfig};
pub use engine::{CollisionEvent, CollisionPhase, Engine, RunState, StepReport};
pub use error::{PhysicsError, Result};
pub use handle::EngineHandle;
pub use materials::{Material, MaterialError, MaterialLoader};
pub use playground::Playground;
pub use shape::{Polygon, Shape};
pub use types::{BodyId, ShapeKind, Vec2};
pub use world::{BodySnapshot, World};
