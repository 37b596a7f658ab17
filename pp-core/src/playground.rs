//! The physics playground scene.
//!
//! An 800×600 canvas closed by a floor and two side walls, into which the
//! user drops random circles and rectangles. Slider ranges are enforced
//! here; the world itself accepts any finite value.
//!
//! ```text
//!  (-50, h/2)                               (w+50, h/2)
//!     ┌──┐ ┌────────────── canvas ─────────────┐ ┌──┐
//!     │  │ │                                   │ │  │
//!     │  │ │   ●      ■                        │ │  │
//!     │  │ │                                   │ │  │
//!     └──┘ └───────────────────────────────────┘ └──┘
//!        ┌─────────────── floor (w/2, h+50) ──────────┐
//!        └────────────────────────────────────────────┘
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::body::{make_circle, make_rectangle, Body, BodyOptions};
use crate::config::EngineConfig;
use crate::engine::{Engine, RunState, StepReport};
use crate::error::Result;
use crate::materials::Material;
use crate::types::{constants, BodyId, Vec2};
use crate::world::World;

pub const CANVAS_WIDTH: f64 = 800.0;
pub const CANVAS_HEIGHT: f64 = 600.0;

/// Thickness of the floor and walls
const WALL_THICKNESS: f64 = 100.0;

pub const GRAVITY_SLIDER_RANGE: (f64, f64) = (-2.0, 2.0);
pub const TIME_SCALE_SLIDER_RANGE: (f64, f64) = (0.0, 2.0);

/// Margin kept between spawned bodies and the canvas edge
const SPAWN_MARGIN: f64 = 10.0;
const CIRCLE_RADIUS_RANGE: (f64, f64) = (10.0, 30.0);
const RECT_SIDE_RANGE: (f64, f64) = (10.0, 60.0);
const SPAWN_RESTITUTION: f64 = 0.8;

/// The three static boundary bodies for a `width × height` canvas:
/// floor, left wall, right wall.
pub fn boundaries(width: f64, height: f64, material: &Material) -> Result<[Body; 3]> {
    let opts = BodyOptions::from_material(material).with_static(true);
    let half = WALL_THICKNESS / 2.0;
    Ok([
        make_rectangle(
            Vec2::new(width / 2.0, height + half),
            width + WALL_THICKNESS,
            WALL_THICKNESS,
            opts,
        )?,
        make_rectangle(
            Vec2::new(-half, height / 2.0),
            WALL_THICKNESS,
            height + WALL_THICKNESS,
            opts,
        )?,
        make_rectangle(
            Vec2::new(width + half, height / 2.0),
            WALL_THICKNESS,
            height + WALL_THICKNESS,
            opts,
        )?,
    ])
}

/// Engine plus the demo's controls.
#[derive(Debug)]
pub struct Playground {
    engine: Engine,
    rng: StdRng,
    width: f64,
    height: f64,
    body_material: Material,
    boundary_material: Material,
    gravity_slider: f64,
    time_scale_slider: f64,
}

impl Playground {
    /// Standard canvas with default materials, already running.
    pub fn new(config: EngineConfig, seed: u64) -> Result<Self> {
        Self::with_materials(config, seed, Material::playground(), Material::boundary())
    }

    pub fn with_materials(
        config: EngineConfig,
        seed: u64,
        body_material: Material,
        boundary_material: Material,
    ) -> Result<Self> {
        BodyOptions::from_material(&body_material).validate()?;
        let world = World::new(Vec2::new(0.0, constants::DEFAULT_GRAVITY_Y), 1.0)?;
        let mut engine = Engine::new(world, config)?;
        for body in boundaries(CANVAS_WIDTH, CANVAS_HEIGHT, &boundary_material)? {
            engine.world_mut().add_body(body);
        }
        engine.start();
        info!(seed, width = CANVAS_WIDTH, height = CANVAS_HEIGHT, "playground ready");

        Ok(Self {
            engine,
            rng: StdRng::seed_from_u64(seed),
            width: CANVAS_WIDTH,
            height: CANVAS_HEIGHT,
            body_material,
            boundary_material,
            gravity_slider: constants::DEFAULT_GRAVITY_Y,
            time_scale_slider: 1.0,
        })
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    pub fn world(&self) -> &World {
        self.engine.world()
    }

    pub fn into_engine(self) -> Engine {
        self.engine
    }

    fn spawn_options(&self) -> BodyOptions {
        BodyOptions::from_material(&self.body_material).with_restitution(SPAWN_RESTITUTION)
    }

    fn random_point(&mut self) -> Vec2 {
        Vec2::new(
            self.rng.gen_range(SPAWN_MARGIN..=self.width - SPAWN_MARGIN),
            self.rng.gen_range(SPAWN_MARGIN..=self.height - SPAWN_MARGIN),
        )
    }

    // ===== Buttons =====

    /// "Add Circle": random position and radius.
    pub fn add_random_circle(&mut self) -> Result<BodyId> {
        let center = self.random_point();
        let radius = self.rng.gen_range(CIRCLE_RADIUS_RANGE.0..=CIRCLE_RADIUS_RANGE.1);
        let body = make_circle(center, radius, self.spawn_options())?;
        Ok(self.engine.world_mut().add_body(body))
    }

    /// "Add Rectangle": random position and side lengths.
    pub fn add_random_rectangle(&mut self) -> Result<BodyId> {
        let center = self.random_point();
        let width = self.rng.gen_range(RECT_SIDE_RANGE.0..=RECT_SIDE_RANGE.1);
        let height = self.rng.gen_range(RECT_SIDE_RANGE.0..=RECT_SIDE_RANGE.1);
        let body = make_rectangle(center, width, height, self.spawn_options())?;
        Ok(self.engine.world_mut().add_body(body))
    }

    /// "Reset": removes everything and rebuilds the boundaries.
    pub fn reset(&mut self) -> Result<()> {
        let walls = boundaries(self.width, self.height, &self.boundary_material)?;
        let world = self.engine.world_mut();
        world.clear(false);
        for body in walls {
            world.add_body(body);
        }
        info!("playground reset");
        Ok(())
    }

    /// "Pause" / "Resume". Returns the new state.
    pub fn toggle_pause(&mut self) -> RunState {
        match self.engine.state() {
            RunState::Running => {
                self.engine.pause();
            }
            RunState::Paused => {
                self.engine.resume();
            }
            RunState::Stopped => {
                self.engine.start();
            }
        }
        self.engine.state()
    }

    // ===== Sliders =====

    /// Gravity slider, applied to the y component. Returns the clamped value.
    pub fn set_gravity_slider(&mut self, value: f64) -> Result<f64> {
        let clamped = value.clamp(GRAVITY_SLIDER_RANGE.0, GRAVITY_SLIDER_RANGE.1);
        let x = self.engine.world().gravity().x;
        self.engine.world_mut().set_gravity(Vec2::new(x, clamped))?;
        self.gravity_slider = clamped;
        Ok(clamped)
    }

    /// Time scale slider. Returns the clamped value.
    pub fn set_time_scale_slider(&mut self, value: f64) -> Result<f64> {
        let clamped = value.clamp(TIME_SCALE_SLIDER_RANGE.0, TIME_SCALE_SLIDER_RANGE.1);
        self.engine.world_mut().set_time_scale(clamped)?;
        self.time_scale_slider = clamped;
        Ok(clamped)
    }

    pub fn gravity_slider(&self) -> f64 {
        self.gravity_slider
    }

    pub fn time_scale_slider(&self) -> f64 {
        self.time_scale_slider
    }

    // ===== Driving =====

    pub fn step(&mut self, dt: f64) -> Result<StepReport> {
        self.engine.step(dt)
    }

    /// Feeds real frame time through the fixed-step accumulator.
    pub fn advance(&mut self, elapsed: f64) -> Result<Vec<StepReport>> {
        self.engine.advance(elapsed)
    }
}
