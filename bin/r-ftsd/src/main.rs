//! ---
//! fts_section: "01-core-functionality"
//! fts_subsection: "binary"
//! fts_type: "source"
//! fts_scope: "code"
//! fts_description: "Binary entrypoint for the R-FTS daemon."
//! fts_version: "v0.0.0-prealpha"
//! fts_owner: "tbd"
//! ---
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use r_fts_common::config::AppConfig;
use r_fts_common::logging::init_tracing;
use r_fts_core::SimulationDriver;
use r_fts_fleet::{
    AlertDraft, AlertStore, MemoryAlertStore, MemoryVehicleStore, SharedAlertStore,
    SharedVehicleStore, Vehicle,
};
use r_fts_metrics::{new_registry, BroadcastMetrics, DriverMetrics};
use r_fts_net::{RestApiBuilder, SessionRegistry, UpdateBroadcaster, WsServerBuilder};
use tokio::signal;
use tracing::info;

#[derive(Debug, Parser)]
#[command(
    author,
    version = concat!("R-FTS ", env!("CARGO_PKG_VERSION")),
    about = "R-FTS daemon",
    long_about = None
)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(
        long,
        value_name = "SECONDS",
        help = "Override the simulation tick interval"
    )]
    tick_interval: Option<u64>,

    #[arg(long, value_name = "SEED", help = "Override the simulation RNG seed")]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Run the fleet tracking daemon")]
    Run,
    #[command(about = "Load and validate configuration, then exit")]
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut candidates = Vec::new();
    if let Some(path) = &cli.config {
        candidates.push(path.clone());
    }
    candidates.push(PathBuf::from("configs/example.prod.toml"));
    candidates.push(PathBuf::from("configs/example.dev.toml"));

    let loaded = AppConfig::load_with_source(&candidates)?;
    let mut config = loaded.config;
    let config_path = loaded.source;

    if let Some(secs) = cli.tick_interval {
        config.simulation.tick_interval = Duration::from_secs(secs);
    }
    if let Some(seed) = cli.seed {
        config.simulation.random_seed = Some(seed);
    }
    config.validate()?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_daemon(config, config_path).await?,
        Commands::CheckConfig => {
            println!(
                "configuration {} is valid ({} seed vehicles)",
                config_path.display(),
                config.fleet.len()
            );
        }
    }

    Ok(())
}

async fn run_daemon(config: AppConfig, config_path: PathBuf) -> Result<()> {
    init_tracing("r-ftsd", &config.logging)?;
    info!(config_path = %config_path.display(), "configuration loaded");

    let metrics_registry = new_registry();
    let driver_metrics = DriverMetrics::new(metrics_registry.clone())?;
    let broadcast_metrics = BroadcastMetrics::new(metrics_registry.clone())?;

    let store: SharedVehicleStore = Arc::new(MemoryVehicleStore::with_vehicles(seed_fleet(
        &config,
    )?));
    info!(vehicles = config.fleet.len(), "vehicle store seeded");

    let alert_store: SharedAlertStore = Arc::new(MemoryAlertStore::new());
    for seed in &config.alerts {
        let draft = AlertDraft::from_seed(seed)
            .with_context(|| format!("invalid alert seed for '{}'", seed.vehicle_id))?;
        alert_store.create(draft).await?;
    }
    info!(alerts = config.alerts.len(), "alert store seeded");

    let registry = Arc::new(SessionRegistry::new());
    let broadcaster =
        UpdateBroadcaster::new(Arc::clone(&registry)).with_metrics(broadcast_metrics.clone());

    let ws_server = if config.websocket.enabled {
        let handle = WsServerBuilder::new(config.websocket.listen, Arc::clone(&registry))
            .with_metrics(broadcast_metrics)
            .spawn()
            .await?;
        Some(handle)
    } else {
        info!("websocket server disabled by configuration");
        None
    };

    let rest_server = if config.api.enabled {
        let handle = RestApiBuilder::new(config.api.listen, Arc::clone(&store), broadcaster.clone())
            .with_alert_store(Arc::clone(&alert_store))
            .with_metrics_registry(metrics_registry)
            .with_tick_interval(config.simulation.tick_interval)
            .spawn()
            .await?;
        Some(handle)
    } else {
        info!("rest api disabled by configuration");
        None
    };

    let driver = if config.simulation.enabled {
        let driver = SimulationDriver::new(store, broadcaster, config.simulation.clone())
            .with_metrics(driver_metrics);
        info!(
            tick_interval_secs = config.simulation.tick_interval.as_secs(),
            "simulation driver started"
        );
        Some(driver.start())
    } else {
        info!("simulation driver disabled by configuration");
        None
    };

    info!("daemon running; waiting for termination signal");
    signal::ctrl_c().await?;
    info!("ctrl-c received; shutting down");

    if let Some(handle) = driver {
        handle.shutdown().await?;
    }
    if let Some(server) = ws_server {
        server.shutdown().await?;
    }
    if let Some(server) = rest_server {
        server.shutdown().await?;
    }
    info!("daemon shutdown complete");

    Ok(())
}

fn seed_fleet(config: &AppConfig) -> Result<Vec<Vehicle>> {
    config
        .fleet
        .iter()
        .map(|(id, seed)| {
            Vehicle::from_seed(id, seed)
                .with_context(|| format!("invalid fleet seed entry '{}'", id))
        })
        .collect()
}
