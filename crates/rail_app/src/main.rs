//! # rail_app: headless frame driver
//!
//! Loads the game configuration, a directory of prototypes and an entity
//! list, then runs the world at a fixed tick rate with scripted input.
//!
//! ## Startup sequence
//!
//! 1. Read `GameConfig` from `--config` (defaults when absent).
//! 2. Build the world over `--prototypes/<name>.proto`.
//! 3. Load `--entities` and attach the autofire controller to the player.
//! 4. Run `--ticks` ticks at `--tick-rate`.

mod autofire;
mod tick;

use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result, ensure};
use clap::Parser;
use rail_ecs::DirectoryPrototypes;
use rail_game::{FixedCamera, GameConfig, GameServices, HeadlessRenderer, World};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use autofire::Autofire;
use tick::{TickConfig, TickLoop};

#[derive(Debug, Parser)]
#[command(name = "rail_app", about = "Headless rail-shooter frame driver")]
struct Args {
    /// JSON game configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory containing .proto files
    #[arg(short, long, default_value = "prototypes")]
    prototypes: PathBuf,

    /// JSON entity list to load at startup
    #[arg(short, long)]
    entities: Option<PathBuf>,

    /// Ticks per second
    #[arg(long, default_value_t = 60.0)]
    tick_rate: f64,

    /// Ticks to run (0 runs until killed)
    #[arg(short, long, default_value_t = 600)]
    ticks: u64,

    /// Press fire every this many ticks (0 never fires)
    #[arg(long, default_value_t = 30)]
    autofire_period: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("rail_app=info".parse()?))
        .init();

    let args = Args::parse();
    info!(?args, "rail_app starting");

    let tick_config = TickConfig {
        tick_rate: args.tick_rate,
        max_ticks: args.ticks,
    };
    ensure!(
        tick_config.tick_duration().is_some(),
        "tick rate must be positive and large enough for a representable tick, got {}",
        args.tick_rate
    );

    let config = match &args.config {
        Some(path) => GameConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => GameConfig::default(),
    };

    let services = GameServices::new()
        .with_camera(Rc::new(FixedCamera::default()))
        .with_renderer(Rc::new(HeadlessRenderer::default()));
    let mut world = World::new(config, DirectoryPrototypes::new(&args.prototypes), services)
        .context("initialising world")?;

    if let Some(path) = &args.entities {
        let report = world
            .load_entity_file(path)
            .with_context(|| format!("loading entities {}", path.display()))?;
        if !report.is_clean() {
            warn!(failures = report.failures.len(), "entity list loaded with failures");
        }
    }

    let autofire = Autofire::new(args.autofire_period);
    world
        .set_active_controller(autofire.handle())
        .context("attaching controller to the player")?;
    if world.active_player().is_none() {
        warn!("no player in the entity list; autofire has nothing to drive");
    }

    let mut tick_loop = TickLoop::new(tick_config, world);
    tick_loop.set_autofire(autofire);
    tick_loop.run();

    info!(
        ticks = tick_loop.tick_id(),
        entities = tick_loop.world().manager().entity_count(),
        "rail_app shut down"
    );
    Ok(())
}
