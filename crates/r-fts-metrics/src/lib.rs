//! ---
//! fts_section: "03-persistence-logging"
//! fts_subsection: "module"
//! fts_type: "source"
//! fts_scope: "code"
//! fts_description: "Metrics collection and export utilities."
//! fts_version: "v0.0.0-prealpha"
//! fts_owner: "tbd"
//! ---
use std::sync::Arc;

use anyhow::{Context, Result};
use prometheus::{Histogram, HistogramOpts, IntCounter, IntGauge, Opts, Registry};

/// Shared registry type used across services.
pub type SharedRegistry = Arc<Registry>;

/// Produce a new shared registry.
pub fn new_registry() -> SharedRegistry {
    Arc::new(Registry::new())
}

/// Metrics recorded by the simulation driver.
#[derive(Clone)]
pub struct DriverMetrics {
    registry: SharedRegistry,
    ticks_total: IntCounter,
    vehicles_updated_total: IntCounter,
    vehicle_update_failures_total: IntCounter,
    tick_duration_seconds: Histogram,
}

impl DriverMetrics {
    /// Register the driver metric family on `registry`.
    pub fn new(registry: SharedRegistry) -> Result<Self> {
        let ticks_total = IntCounter::with_opts(Opts::new(
            "r_fts_simulation_ticks_total",
            "Total number of simulation ticks executed",
        ))?;
        registry.register(Box::new(ticks_total.clone()))?;

        let vehicles_updated_total = IntCounter::with_opts(Opts::new(
            "r_fts_vehicles_updated_total",
            "Total number of vehicle records perturbed and persisted",
        ))?;
        registry.register(Box::new(vehicles_updated_total.clone()))?;

        let vehicle_update_failures_total = IntCounter::with_opts(Opts::new(
            "r_fts_vehicle_update_failures_total",
            "Total number of per-vehicle persistence failures during ticks",
        ))?;
        registry.register(Box::new(vehicle_update_failures_total.clone()))?;

        let buckets = prometheus::exponential_buckets(0.0001, 2.0, 16)
            .context("failed to construct histogram buckets")?;
        let tick_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "r_fts_tick_duration_seconds",
                "Wall-clock time spent executing one simulation tick",
            )
            .buckets(buckets),
        )?;
        registry.register(Box::new(tick_duration_seconds.clone()))?;

        Ok(Self {
            registry,
            ticks_total,
            vehicles_updated_total,
            vehicle_update_failures_total,
            tick_duration_seconds,
        })
    }

    pub fn registry(&self) -> SharedRegistry {
        self.registry.clone()
    }

    pub fn inc_tick(&self) {
        self.ticks_total.inc();
    }

    pub fn inc_vehicles_updated(&self, count: u64) {
        self.vehicles_updated_total.inc_by(count);
    }

    pub fn inc_update_failure(&self) {
        self.vehicle_update_failures_total.inc();
    }

    pub fn observe_tick_duration(&self, seconds: f64) {
        self.tick_duration_seconds.observe(seconds);
    }
}

/// Metrics recorded by the broadcast fan-out and session registry.
#[derive(Clone)]
pub struct BroadcastMetrics {
    registry: SharedRegistry,
    broadcasts_total: IntCounter,
    send_failures_total: IntCounter,
    connected_clients: IntGauge,
}

impl BroadcastMetrics {
    /// Register the broadcast metric family on `registry`.
    pub fn new(registry: SharedRegistry) -> Result<Self> {
        let broadcasts_total = IntCounter::with_opts(Opts::new(
            "r_fts_broadcasts_total",
            "Total number of broadcast fan-out invocations",
        ))?;
        registry.register(Box::new(broadcasts_total.clone()))?;

        let send_failures_total = IntCounter::with_opts(Opts::new(
            "r_fts_broadcast_send_failures_total",
            "Total number of per-connection sends dropped during broadcasts",
        ))?;
        registry.register(Box::new(send_failures_total.clone()))?;

        let connected_clients = IntGauge::with_opts(Opts::new(
            "r_fts_connected_clients",
            "Number of WebSocket clients currently registered",
        ))?;
        registry.register(Box::new(connected_clients.clone()))?;

        Ok(Self {
            registry,
            broadcasts_total,
            send_failures_total,
            connected_clients,
        })
    }

    pub fn registry(&self) -> SharedRegistry {
        self.registry.clone()
    }

    pub fn inc_broadcast(&self) {
        self.broadcasts_total.inc();
    }

    pub fn inc_send_failure(&self) {
        self.send_failures_total.inc();
    }

    pub fn set_connected_clients(&self, count: usize) {
        self.connected_clients.set(count as i64);
    }
}

pub use prometheus;
