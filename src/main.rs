use anyhow::Context;
use clap::Parser;
use pursuit_evasion::{
    config::{Config, CONFIG_PATH},
    PerformanceReport, Simulation,
};
use std::path::PathBuf;

#[cfg(feature = "viewer")]
mod viewer;

#[derive(Parser)]
#[command(name = "pursuit-evasion", about = "Pursuit and evasion simulation")]
struct Cli {
    /// Path to the TOML config
    #[arg(long, default_value = CONFIG_PATH)]
    config: PathBuf,

    /// Ticks to simulate when running headless
    #[arg(long, default_value_t = 3600)]
    ticks: u64,

    /// Random seed, overrides the config
    #[arg(long)]
    seed: Option<u64>,

    /// Initial strategy id (direct, intercept, proportional), overrides the config
    #[arg(long)]
    strategy: Option<String>,

    /// Write the final report to this file
    #[arg(long)]
    output: Option<PathBuf>,

    /// Open a window instead of running headless
    #[cfg(feature = "viewer")]
    #[arg(long)]
    viewer: bool,
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let mut config = if cli.config.exists() {
        Config::load(&cli.config)
            .with_context(|| format!("loading {}", cli.config.display()))?
    } else {
        log::warn!("{} not found, using defaults", cli.config.display());
        Config::default()
    };
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    if let Some(strategy) = cli.strategy {
        config.strategy = strategy;
    }

    let mut sim = Simulation::new(config);

    #[cfg(feature = "viewer")]
    let windowed = cli.viewer;
    #[cfg(not(feature = "viewer"))]
    let windowed = false;

    if windowed {
        #[cfg(feature = "viewer")]
        {
            let watcher = match pursuit_evasion::config::ConfigWatcher::new(&cli.config) {
                Ok(watcher) => Some(watcher),
                Err(e) => {
                    log::warn!("Config hot reload disabled: {}", e);
                    None
                }
            };
            viewer::run(&mut sim, watcher);
        }
    } else {
        run_headless(&mut sim, cli.ticks);
    }

    let report = PerformanceReport::from_simulation(&sim);
    print!("{}", report);
    if let Some(path) = cli.output {
        report.save(&path)?;
    }
    Ok(())
}

fn run_headless(sim: &mut Simulation, ticks: u64) {
    for _ in 0..ticks {
        sim.tick();
    }
    log::info!(
        "Ran {} ticks: {} frames, {} captures",
        ticks,
        sim.frame_count(),
        sim.capture_count()
    );
}
