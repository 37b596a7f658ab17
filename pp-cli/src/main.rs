use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser};
use pp_core::{
    BodySnapshot, CollisionPhase, EngineConfig, MaterialLoader, Playground, ShapeSpec, StepReport,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pp", version, about = "Run the physics playground headless and print body transforms")]
struct Opts {
    /// Number of frames to simulate
    #[arg(long, default_value_t = 600)]
    steps: usize,

    /// Seconds per frame (default: the config's fixed_dt)
    #[arg(long)]
    dt: Option<f64>,

    /// Feed frames through the fixed-step accumulator instead of stepping directly
    #[arg(long, action = ArgAction::SetTrue)]
    accumulate: bool,

    /// Gravity slider value, clamped to [-2, 2]
    #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
    gravity: f64,

    /// Time scale slider value, clamped to [0, 2]
    #[arg(long, default_value_t = 1.0)]
    time_scale: f64,

    /// Random circles to drop at the start
    #[arg(long, default_value_t = 10)]
    circles: usize,

    /// Random rectangles to drop at the start
    #[arg(long, default_value_t = 10)]
    rects: usize,

    /// RNG seed for spawn positions and sizes
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Engine configuration YAML
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding material presets
    #[arg(long, default_value = "materials")]
    materials: PathBuf,

    /// List the presets in the materials directory and exit
    #[arg(long, action = ArgAction::SetTrue)]
    list_materials: bool,

    /// Material for spawned bodies
    #[arg(long, default_value = "playground")]
    body_material: String,

    /// Extra bodies to add, as a YAML list of shape specs
    #[arg(long)]
    scene: Option<PathBuf>,

    /// Print a progress line every N frames (0 disables)
    #[arg(long, default_value_t = 60)]
    print_every: usize,

    /// Print collision start/end events
    #[arg(long, action = ArgAction::SetTrue)]
    events: bool,

    /// Dump the final state as YAML instead of a table
    #[arg(long, action = ArgAction::SetTrue)]
    yaml: bool,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn build_playground(opts: &Opts) -> Result<Playground> {
    let config = match &opts.config {
        Some(path) => EngineConfig::load(path).with_context(|| format!("load config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    let loader = MaterialLoader::new(&opts.materials);
    let body = loader
        .load_or_builtin(&opts.body_material)
        .with_context(|| format!("load material {:?} from {}", opts.body_material, opts.materials.display()))?;
    let boundary = loader
        .load_or_builtin("boundary")
        .context("load boundary material")?;
    info!(body = %body.name, boundary = %boundary.name, "materials selected");

    let mut pg = Playground::with_materials(config, opts.seed, body, boundary)?;
    pg.set_gravity_slider(opts.gravity)?;
    pg.set_time_scale_slider(opts.time_scale)?;

    for _ in 0..opts.circles {
        pg.add_random_circle()?;
    }
    for _ in 0..opts.rects {
        pg.add_random_rectangle()?;
    }

    if let Some(path) = &opts.scene {
        let text = fs::read_to_string(path).with_context(|| format!("read scene {}", path.display()))?;
        let specs: Vec<ShapeSpec> =
            serde_yaml::from_str(&text).with_context(|| format!("parse scene {}", path.display()))?;
        for spec in &specs {
            pg.engine_mut().world_mut().spawn(spec)?;
        }
        info!(bodies = specs.len(), "scene loaded");
    }

    if opts.events {
        pg.engine_mut().on_collision(|event, _| {
            let phase = match event.phase {
                CollisionPhase::Started => "start",
                CollisionPhase::Ended => "end",
            };
            println!("  {phase:<5} {} <-> {} depth={:.3}", event.body_a, event.body_b, event.depth);
        });
    }

    Ok(pg)
}

fn print_table(state: &[BodySnapshot]) {
    println!("{:>6}  {:<8}  {:>10}  {:>10}  {:>8}", "id", "kind", "x", "y", "angle");
    for s in state {
        println!(
            "{:>6}  {:<8}  {:>10.3}  {:>10.3}  {:>8.4}",
            s.id.0,
            s.kind.to_string(),
            s.position.x,
            s.position.y,
            s.angle
        );
    }
}

fn report_line(frame: usize, reports: &[StepReport], pg: &Playground) {
    let contacts: usize = reports.iter().map(|r| r.contacts).sum();
    let energy: f64 = pg.world().bodies().iter().map(|b| b.kinetic_energy()).sum();
    println!(
        "frame {frame:>5}  tick {:>5}  bodies {:>3}  contacts {:>3}  energy {:>12.3}",
        pg.engine().tick(),
        pg.world().body_count(),
        contacts,
        energy
    );
}

fn main() -> Result<()> {
    let opts = Opts::parse();
    init_tracing(&opts.log_level);

    if opts.list_materials {
        let loader = MaterialLoader::new(&opts.materials);
        for name in loader.list().with_context(|| format!("list {}", opts.materials.display()))? {
            let m = loader.load(&name)?;
            println!(
                "{name:<12} density={:<8} restitution={:<5} friction={:<5} air_friction={}",
                m.density, m.restitution, m.friction, m.air_friction
            );
        }
        return Ok(());
    }

    let dt = opts.dt.unwrap_or(EngineConfig::default().fixed_dt);
    if !(dt > 0.0 && dt.is_finite()) {
        bail!("--dt must be positive, got {dt}");
    }

    let mut pg = build_playground(&opts)?;
    info!(steps = opts.steps, dt, accumulate = opts.accumulate, "simulation started");

    let mut frozen = 0;
    for frame in 1..=opts.steps {
        let reports = if opts.accumulate {
            pg.advance(dt)?
        } else {
            vec![pg.step(dt)?]
        };

        for report in &reports {
            for id in &report.degenerated {
                warn!(%id, tick = report.tick, "body frozen");
                frozen += 1;
            }
        }
        if opts.print_every > 0 && frame % opts.print_every == 0 {
            report_line(frame, &reports, &pg);
        }
    }

    let state = pg.world().query_state();
    if opts.yaml {
        print!("{}", serde_yaml::to_string(&state).context("serialize final state")?);
    } else {
        print_table(&state);
    }
    info!(tick = pg.engine().tick(), frozen, "simulation finished");
    Ok(())
}
