use std::path::PathBuf;

use anyhow::Result;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    config::{ConfigError, SimulationConfig},
    daisy::DaisyColor,
    rng::{DaisyRng, RngManager},
    scenario::ScenarioController,
    snapshot::{SnapshotError, SnapshotWriter},
    systems::{
        apply_local_heating, BookkeepingSystem, DiffusionSystem, ReproductionSystem,
        TemperatureSystem,
    },
    world::{GlobalStats, World},
};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("simulation has not been set up")]
    NotSetUp,
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("system '{name}' failed: {source}")]
    System {
        name: String,
        #[source]
        source: anyhow::Error,
    },
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

pub struct EngineSettings {
    pub snapshot_dir: PathBuf,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            snapshot_dir: PathBuf::from("snapshots"),
        }
    }
}

pub struct EngineBuilder {
    settings: EngineSettings,
    systems: Vec<Box<dyn System>>,
}

impl EngineBuilder {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            systems: Vec::new(),
        }
    }

    pub fn with_system(mut self, system: impl System + 'static) -> Self {
        self.systems.push(Box::new(system));
        self
    }

    /// Temperature, diffusion, reproduction and bookkeeping, in tick order.
    pub fn with_daisyworld_systems(self) -> Self {
        self.with_system(TemperatureSystem::new())
            .with_system(DiffusionSystem::new())
            .with_system(ReproductionSystem::new())
            .with_system(BookkeepingSystem::new())
    }

    pub fn build(self) -> Engine {
        Engine {
            snapshot_writer: SnapshotWriter::new(&self.settings.snapshot_dir, 0),
            systems: self.systems,
            run: None,
        }
    }
}

struct RunState {
    name: String,
    world: World,
    rng: RngManager,
    controller: ScenarioController,
}

/// Owns the tick counter and sequences each tick's phases.
pub struct Engine {
    systems: Vec<Box<dyn System>>,
    snapshot_writer: SnapshotWriter,
    run: Option<RunState>,
}

impl Engine {
    /// Discard any previous run and initialise a fresh world from `config`.
    pub fn setup(&mut self, config: &SimulationConfig) -> Result<(), EngineError> {
        config.validate()?;

        let controller =
            ScenarioController::new(config.scenario, config.initial_solar_luminosity);
        let mut rng = RngManager::new(config.seed);
        let mut world = World::new(
            config.grid.width,
            config.grid.height,
            config.albedos(),
            controller.initial_luminosity(),
        );

        let patches = world.grid().cell_count() as f64;
        let blacks = (config.start_percent_blacks * patches / 100.0).round() as usize;
        let whites = (config.start_percent_whites * patches / 100.0).floor() as usize;
        {
            let stream = rng.stream("setup");
            world.seed_randomly(DaisyColor::Black, blacks, stream);
            world.seed_randomly(DaisyColor::White, whites, stream);
        }
        apply_local_heating(&mut world);
        world.refresh_stats();

        self.snapshot_writer
            .set_interval(config.snapshot_interval_ticks);

        let stats = world.global_stats();
        info!(
            run = %config.name,
            scenario = %config.scenario,
            width = config.grid.width,
            height = config.grid.height,
            blacks = stats.black_count,
            whites = stats.white_count,
            "simulation set up"
        );

        self.run = Some(RunState {
            name: config.name.clone(),
            world,
            rng,
            controller,
        });
        Ok(())
    }

    /// Advance exactly one tick.
    pub fn step(&mut self) -> Result<TickSummary, EngineError> {
        let run = self.run.as_mut().ok_or(EngineError::NotSetUp)?;
        let ctx = SystemContext {
            tick: run.world.tick() + 1,
        };

        for system in &mut self.systems {
            let rng = run.rng.stream(system.name());
            system
                .run(&ctx, &mut run.world, rng)
                .map_err(|source| EngineError::System {
                    name: system.name().to_string(),
                    source,
                })?;
        }

        run.world.advance_time();
        let luminosity = run
            .controller
            .next_luminosity(run.world.tick(), run.world.solar_luminosity());
        run.world.set_solar_luminosity(luminosity);

        let snapshot_path = self.snapshot_writer.maybe_write(&run.world, &run.name)?;
        let stats = run.world.global_stats();
        debug!(
            tick = stats.tick,
            mean_temperature = stats.mean_temperature,
            blacks = stats.black_count,
            whites = stats.white_count,
            luminosity,
            "tick complete"
        );

        Ok(TickSummary {
            stats,
            solar_luminosity: luminosity,
            snapshot_path,
        })
    }

    pub fn run(&mut self, ticks: u64) -> Result<(), EngineError> {
        self.run_with_hook(ticks, |_| {})
    }

    pub fn run_with_hook<F>(&mut self, ticks: u64, mut hook: F) -> Result<(), EngineError>
    where
        F: FnMut(&TickSummary),
    {
        for _ in 0..ticks {
            let summary = self.step()?;
            hook(&summary);
        }
        Ok(())
    }

    pub fn is_set_up(&self) -> bool {
        self.run.is_some()
    }

    pub fn name(&self) -> Option<&str> {
        self.run.as_ref().map(|run| run.name.as_str())
    }

    pub fn world(&self) -> Option<&World> {
        self.run.as_ref().map(|run| &run.world)
    }

    /// Mutable access for the manual placement and removal surface.
    pub fn world_mut(&mut self) -> Option<&mut World> {
        self.run.as_mut().map(|run| &mut run.world)
    }
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct TickSummary {
    pub stats: GlobalStats,
    pub solar_luminosity: f64,
    pub snapshot_path: Option<PathBuf>,
}

pub struct SystemContext {
    /// Tick being computed; the world counter advances after the last system.
    pub tick: u64,
}

/// One phase of a tick. Systems run in registration order, each with its own
/// deterministic random stream.
pub trait System: Send {
    fn name(&self) -> &str;
    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        rng: &mut DaisyRng,
    ) -> Result<()>;
}
