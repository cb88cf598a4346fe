use std::{path::PathBuf, time::Duration};

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use daisyworld::{
    config::{ConfigLoader, SimulationConfig},
    engine::{EngineBuilder, EngineSettings},
    scenario::Scenario,
    web::{self, WebServerConfig},
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Daisyworld simulation runner")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run headless for a fixed number of ticks
    Run {
        #[command(flatten)]
        sim: SimArgs,

        /// Override tick count (uses the config value, else 1000)
        #[arg(long)]
        ticks: Option<u64>,
    },
    /// Step the simulation continuously behind a JSON/SSE web surface
    Serve {
        #[command(flatten)]
        sim: SimArgs,

        /// Stop stepping after this many ticks (runs until Ctrl+C when omitted)
        #[arg(long)]
        ticks: Option<u64>,

        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        #[arg(long, default_value_t = 8080)]
        port: u16,

        /// Wall-clock delay between ticks
        #[arg(long, default_value_t = 100)]
        tick_interval_ms: u64,
    },
}

#[derive(Debug, Args)]
struct SimArgs {
    /// Path to the simulation YAML file
    #[arg(long, default_value = "scenarios/ramp.yaml")]
    config: PathBuf,

    /// Override the random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Override the luminosity scenario (low, nominal, high, ramp)
    #[arg(long)]
    scenario: Option<String>,

    /// Override snapshot interval in ticks (0 disables)
    #[arg(long)]
    snapshot_interval: Option<u64>,

    /// Directory for snapshots
    #[arg(long, default_value = "snapshots")]
    snapshot_dir: PathBuf,
}

impl SimArgs {
    fn load(&self) -> Result<SimulationConfig> {
        let mut config = ConfigLoader::new(".").load(&self.config)?;
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(name) = &self.scenario {
            config.scenario = name.parse::<Scenario>()?;
        }
        if let Some(interval) = self.snapshot_interval {
            config.snapshot_interval_ticks = interval;
        }
        Ok(config)
    }
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run { sim, ticks } => {
            let config = sim.load()?;
            init_tracing(&config.logging.level);
            let ticks = config.ticks(ticks);

            let mut engine = EngineBuilder::new(EngineSettings {
                snapshot_dir: sim.snapshot_dir,
            })
            .with_daisyworld_systems()
            .build();
            engine.setup(&config)?;
            engine.run(ticks)?;

            if let Some(world) = engine.world() {
                let stats = world.global_stats();
                println!(
                    "Run '{}' ({}) completed {} ticks. Mean temperature {:.2}, blacks {}, whites {}, solar luminosity {:.4}",
                    config.name,
                    config.scenario,
                    stats.tick,
                    stats.mean_temperature,
                    stats.black_count,
                    stats.white_count,
                    world.solar_luminosity()
                );
            }
        }
        Command::Serve {
            sim,
            ticks,
            host,
            port,
            tick_interval_ms,
        } => {
            let config = sim.load()?;
            init_tracing(&config.logging.level);
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(web::run(WebServerConfig {
                config,
                ticks,
                tick_interval: Duration::from_millis(tick_interval_ms.max(1)),
                snapshot_dir: sim.snapshot_dir,
                host,
                port,
            }))?;
        }
    }
    Ok(())
}
