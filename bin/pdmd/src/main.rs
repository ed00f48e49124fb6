//! ---
//! pdm_section: "01-core-functionality"
//! pdm_subsection: "binary"
//! pdm_type: "source"
//! pdm_scope: "code"
//! pdm_description: "Binary entrypoint for the maintenance simulator daemon."
//! pdm_version: "v0.1.0"
//! pdm_owner: "tbd"
//! ---
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pdm_api::{spawn_api_server, ApiServer, ApiState};
use pdm_common::{init_tracing, AppConfig, SystemClock};
use pdm_core::{timed_tick, SimulationOrchestrator};
use pdm_metrics::{new_registry, spawn_http_server, DaemonMetrics, SharedRegistry};
use pdm_sim::FleetEngine;
use tokio::signal;
use tracing::{info, warn};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Parser)]
#[command(
    author,
    version = VERSION,
    about = "Predictive-maintenance fleet simulator daemon",
    long_about = None
)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(long, help = "Override the fleet random seed")]
    seed: Option<u64>,

    #[arg(long, help = "Disable the periodic tick loop")]
    no_auto_tick: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Run the simulator with API and metrics until interrupted")]
    Run,
    #[command(about = "Advance a fresh fleet offline and print the resulting summary")]
    Tick {
        #[arg(long, default_value_t = 1, help = "Number of ticks to apply")]
        count: u64,
    },
    #[command(about = "Print the summary of the freshly seeded fleet")]
    Summary,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut candidates = Vec::new();
    if let Some(path) = &cli.config {
        candidates.push(path.clone());
    }
    candidates.push(PathBuf::from("configs/fleet.toml"));
    candidates.push(PathBuf::from("configs/fleet.example.toml"));

    let load_started = Instant::now();
    let loaded = AppConfig::load_with_source(&candidates)?;
    let mut config = loaded.config;
    let load_duration = load_started.elapsed();
    if let Some(seed) = cli.seed {
        config.fleet.seed = seed;
    }
    if cli.no_auto_tick {
        config.simulation.auto_tick = false;
    }

    init_tracing("pdmd", &config.logging)?;
    match &loaded.source {
        Some(path) => info!(config_path = %path.display(), "configuration loaded"),
        None => info!("configuration loaded from built-in defaults"),
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let registry = new_registry();
            let daemon_metrics = DaemonMetrics::new(registry.clone())?;
            daemon_metrics.observe_config_load(load_duration.as_secs_f64());
            daemon_metrics.inc_start();
            daemon_metrics.set_build_info(VERSION, build_profile());
            run_daemon(config, registry).await?
        }
        Commands::Tick { count } => {
            let engine = build_engine(&config)?;
            for _ in 0..count {
                timed_tick(&engine, None);
            }
            info!(ticks = count, "offline ticks applied");
            print_json(&engine.summary())?;
        }
        Commands::Summary => {
            let engine = build_engine(&config)?;
            print_json(&engine.summary())?;
        }
    }

    Ok(())
}

async fn run_daemon(config: AppConfig, registry: SharedRegistry) -> Result<()> {
    let metrics_settings = config.metrics.clone();
    let api_settings = config.api.clone();

    let (metrics_server, metrics_registry) = if metrics_settings.enabled {
        info!(address = %metrics_settings.listen, "metrics exporter enabled");
        (
            Some(spawn_http_server(registry.clone(), metrics_settings.listen)?),
            Some(registry),
        )
    } else {
        info!("metrics exporter disabled by configuration");
        (None, None)
    };

    let engine = build_engine(&config)?;
    let orchestrator =
        SimulationOrchestrator::new(engine.clone(), config.simulation.clone(), metrics_registry);
    let handle = orchestrator.start().await?;

    let mut api_server: Option<ApiServer> = None;
    if api_settings.enabled {
        let state =
            Arc::new(ApiState::new(engine.clone(), VERSION).with_metrics(handle.fleet_metrics()));
        match spawn_api_server(state, api_settings.listen) {
            Ok(server) => api_server = Some(server),
            Err(err) => warn!(error = %err, "failed to start api server"),
        }
    } else {
        info!("api server disabled by configuration");
    }

    info!(
        equipment = engine.equipment_count(),
        "daemon running; waiting for termination signal"
    );
    signal::ctrl_c().await?;
    info!("ctrl-c received; shutting down");
    handle.shutdown().await?;

    if let Some(server) = metrics_server {
        server.shutdown().await?;
    }

    if let Some(server) = api_server {
        server.shutdown().await?;
    }

    Ok(())
}

fn build_engine(config: &AppConfig) -> Result<Arc<FleetEngine>> {
    let engine = FleetEngine::new(config.fleet.clone(), SystemClock::shared())
        .context("failed to seed equipment fleet")?;
    Ok(Arc::new(engine))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render json")?;
    println!("{rendered}");
    Ok(())
}

fn build_profile() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "release"
    }
}
