//! ---
//! fts_section: "01-core-functionality"
//! fts_subsection: "module"
//! fts_type: "source"
//! fts_scope: "code"
//! fts_description: "Shared primitives and utilities for the fleet runtime."
//! fts_version: "v0.0.0-prealpha"
//! fts_owner: "tbd"
//! ---
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use tracing::debug;

use crate::logging::LogFormat;

fn default_tick_interval() -> Duration {
    Duration::from_secs(10)
}

fn default_geo_jitter() -> f64 {
    0.001
}

fn default_speed_jitter() -> f64 {
    5.0
}

fn default_simulation_enabled() -> bool {
    true
}

fn default_seed_fuel() -> i64 {
    100
}

fn default_seed_status() -> String {
    "active".to_owned()
}

fn default_alert_active() -> bool {
    true
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

fn default_websocket_enabled() -> bool {
    true
}

fn default_websocket_listen() -> SocketAddr {
    "0.0.0.0:8081"
        .parse()
        .expect("valid default websocket address")
}

fn default_api_enabled() -> bool {
    true
}

fn default_api_listen() -> SocketAddr {
    "0.0.0.0:8080".parse().expect("valid default api address")
}

/// Primary configuration object for the R-FTS runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub fleet: IndexMap<String, VehicleSeed>,
    #[serde(default)]
    pub alerts: Vec<AlertSeed>,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub websocket: WebSocketConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: PathBuf,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "R_FTS_CONFIG";

    /// Load configuration from disk, respecting the `R_FTS_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    fn from_path(path: PathBuf) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        for (vehicle_id, seed) in &self.fleet {
            seed.validate(vehicle_id)?;
        }
        for (index, seed) in self.alerts.iter().enumerate() {
            seed.validate(index)?;
        }
        self.simulation.validate()?;
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            fleet: IndexMap::new(),
            alerts: Vec::new(),
            simulation: SimulationConfig::default(),
            websocket: WebSocketConfig::default(),
            api: ApiConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Seed record describing one vehicle loaded into the store at startup.
///
/// Keyed by vehicle ID inside `[fleet]`; status is free text here and parsed
/// case-insensitively when the store is seeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleSeed {
    pub driver_name: String,
    pub corridor: String,
    pub vehicle_type: String,
    #[serde(default)]
    pub speed: f64,
    #[serde(default = "default_seed_fuel")]
    pub fuel: i64,
    #[serde(default = "default_seed_status")]
    pub status: String,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
}

impl VehicleSeed {
    pub fn validate(&self, vehicle_id: &str) -> Result<()> {
        if vehicle_id.trim().is_empty() {
            return Err(anyhow!("fleet entries must use a non-empty vehicle id"));
        }
        if self.driver_name.trim().is_empty() {
            return Err(anyhow!("vehicle '{}' must name a driver", vehicle_id));
        }
        if self.vehicle_type.trim().is_empty() {
            return Err(anyhow!("vehicle '{}' must declare a type", vehicle_id));
        }
        if !(0..=100).contains(&self.fuel) {
            return Err(anyhow!(
                "vehicle '{}' fuel must be between 0 and 100",
                vehicle_id
            ));
        }
        if !self.speed.is_finite() || self.speed < 0.0 {
            return Err(anyhow!(
                "vehicle '{}' speed must be a non-negative number",
                vehicle_id
            ));
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(anyhow!(
                "vehicle '{}' latitude must be within -90 and 90 degrees",
                vehicle_id
            ));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(anyhow!(
                "vehicle '{}' longitude must be within -180 and 180 degrees",
                vehicle_id
            ));
        }
        Ok(())
    }
}

/// Seed record describing one alert raised at startup.
///
/// Declared as `[[alerts]]` entries; `type` and `severity` are free text
/// here and parsed when the alert store is seeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertSeed {
    pub vehicle_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub severity: String,
    #[serde(default = "default_alert_active")]
    pub is_active: bool,
}

impl AlertSeed {
    pub fn validate(&self, index: usize) -> Result<()> {
        if self.vehicle_id.trim().is_empty() {
            return Err(anyhow!("alert entry {} must reference a vehicle id", index));
        }
        if self.message.trim().is_empty() {
            return Err(anyhow!("alert entry {} must carry a message", index));
        }
        Ok(())
    }
}

/// Settings for the periodic telemetry simulation driver.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_simulation_enabled")]
    pub enabled: bool,
    #[serde(default = "default_tick_interval")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub tick_interval: Duration,
    /// Full width of the uniform position delta in degrees per tick.
    #[serde(default = "default_geo_jitter")]
    pub geo_jitter: f64,
    /// Full width of the uniform speed delta per tick.
    #[serde(default = "default_speed_jitter")]
    pub speed_jitter: f64,
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval.is_zero() {
            return Err(anyhow!("simulation tick_interval must be greater than zero"));
        }
        if !self.geo_jitter.is_finite() || self.geo_jitter < 0.0 {
            return Err(anyhow!("simulation geo_jitter must be a non-negative number"));
        }
        if !self.speed_jitter.is_finite() || self.speed_jitter < 0.0 {
            return Err(anyhow!(
                "simulation speed_jitter must be a non-negative number"
            ));
        }
        Ok(())
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            enabled: default_simulation_enabled(),
            tick_interval: default_tick_interval(),
            geo_jitter: default_geo_jitter(),
            speed_jitter: default_speed_jitter(),
            random_seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSocketConfig {
    #[serde(default = "default_websocket_enabled")]
    pub enabled: bool,
    #[serde(default = "default_websocket_listen")]
    pub listen: SocketAddr,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            enabled: default_websocket_enabled(),
            listen: default_websocket_listen(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_enabled")]
    pub enabled: bool,
    #[serde(default = "default_api_listen")]
    pub listen: SocketAddr,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: default_api_enabled(),
            listen: default_api_listen(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}
