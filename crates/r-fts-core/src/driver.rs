//! ---
//! fts_section: "01-core-functionality"
//! fts_subsection: "module"
//! fts_type: "source"
//! fts_scope: "code"
//! fts_description: "Primary simulation driver and lifecycle management."
//! fts_version: "v0.0.0-prealpha"
//! fts_owner: "tbd"
//! ---
use std::time::Instant;

use r_fts_common::config::SimulationConfig;
use r_fts_fleet::SharedVehicleStore;
use r_fts_metrics::DriverMetrics;
use r_fts_net::UpdateBroadcaster;
use r_fts_sim::{PerturberConfig, TelemetryPerturber};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Advances the simulated fleet state on a fixed interval.
///
/// Selection policy: every active vehicle is perturbed on every tick. Each
/// vehicle is read, perturbed, written back, and broadcast independently;
/// a failure on one vehicle never stops the rest of the tick.
pub struct SimulationDriver {
    store: SharedVehicleStore,
    broadcaster: UpdateBroadcaster,
    perturber: TelemetryPerturber,
    config: SimulationConfig,
    metrics: Option<DriverMetrics>,
}

impl SimulationDriver {
    /// Build a driver over the shared store and broadcaster.
    pub fn new(
        store: SharedVehicleStore,
        broadcaster: UpdateBroadcaster,
        config: SimulationConfig,
    ) -> Self {
        let perturber = TelemetryPerturber::new(
            PerturberConfig {
                geo_jitter: config.geo_jitter,
                speed_jitter: config.speed_jitter,
            },
            config.random_seed,
        );
        Self {
            store,
            broadcaster,
            perturber,
            config,
            metrics: None,
        }
    }

    /// Record tick counters on the supplied metrics family.
    pub fn with_metrics(mut self, metrics: DriverMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Spawn the periodic tick loop and return a handle for lifecycle
    /// control. The first tick runs immediately; later ticks are paced by
    /// the configured interval, delaying rather than bursting after a stall.
    pub fn start(self) -> DriverHandle {
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(16);
        let tick_interval = self.config.tick_interval;

        let task = tokio::spawn(async move {
            let mut driver = self;
            let mut interval = tokio::time::interval(tick_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        debug!("simulation driver shutdown signal received");
                        break;
                    }
                    _ = interval.tick() => {
                        driver.run_tick().await;
                    }
                }
            }
        });

        DriverHandle {
            shutdown: shutdown_tx,
            task,
        }
    }

    /// Execute one simulation step.
    ///
    /// Never fails: a store read failure skips the whole tick (state simply
    /// does not advance until the next one), and per-vehicle write failures
    /// are logged and isolated.
    pub async fn run_tick(&mut self) {
        let started = Instant::now();
        if let Some(metrics) = &self.metrics {
            metrics.inc_tick();
        }

        let vehicles = match self.store.find_all().await {
            Ok(vehicles) => vehicles,
            Err(err) => {
                warn!(error = %err, "skipping simulation tick; vehicle store read failed");
                return;
            }
        };

        let mut updated = 0u64;
        for mut vehicle in vehicles.into_iter().filter(|v| v.is_active()) {
            self.perturber.perturb(&mut vehicle);
            let vehicle_id = vehicle.id.clone();
            match self.store.save(vehicle).await {
                Ok(_) => {
                    updated += 1;
                    self.broadcaster.broadcast_update(&vehicle_id).await;
                }
                Err(err) => {
                    warn!(vehicle_id = %vehicle_id, error = %err, "failed to persist perturbed vehicle");
                    if let Some(metrics) = &self.metrics {
                        metrics.inc_update_failure();
                    }
                }
            }
        }

        if let Some(metrics) = &self.metrics {
            metrics.inc_vehicles_updated(updated);
            metrics.observe_tick_duration(started.elapsed().as_secs_f64());
        }
        debug!(updated, "simulation tick complete");
    }
}

/// Handle returned from [`SimulationDriver::start`].
pub struct DriverHandle {
    shutdown: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

impl DriverHandle {
    /// Signal shutdown and await the tick loop. In-flight broadcasts are not
    /// waited for; ticks are independent.
    pub async fn shutdown(self) -> anyhow::Result<()> {
        let _ = self.shutdown.send(());
        match self.task.await {
            Ok(()) => Ok(()),
            Err(err) => Err(anyhow::anyhow!(err)),
        }
    }
}
