//! ---
//! fts_section: "03-persistence-logging"
//! fts_subsection: "module"
//! fts_type: "source"
//! fts_scope: "code"
//! fts_description: "Vehicle data model and store abstractions."
//! fts_version: "v0.0.0-prealpha"
//! fts_owner: "tbd"
//! ---
use anyhow::anyhow;
use chrono::{DateTime, Utc};
use r_fts_common::config::VehicleSeed;
use serde::{Deserialize, Serialize};

/// Operational status of a vehicle.
///
/// Stored data and configuration may carry any casing ("active", "ACTIVE",
/// "Active"); parsing is case-insensitive and serialization is lowercase.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum VehicleStatus {
    /// Vehicle is on the road; the simulation perturbs its telemetry.
    #[default]
    Active,
    /// Vehicle is stopped with the engine running; telemetry is left alone.
    Idle,
    /// Vehicle is in the workshop.
    Maintenance,
    /// Vehicle is not reporting.
    Offline,
}

impl VehicleStatus {
    /// Whether the simulation driver should perturb this vehicle.
    pub fn is_active(&self) -> bool {
        matches!(self, VehicleStatus::Active)
    }
}

impl std::str::FromStr for VehicleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(VehicleStatus::Active),
            "idle" => Ok(VehicleStatus::Idle),
            "maintenance" => Ok(VehicleStatus::Maintenance),
            "offline" => Ok(VehicleStatus::Offline),
            other => Err(format!("unknown vehicle status: {}", other)),
        }
    }
}

impl std::fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            VehicleStatus::Active => "active",
            VehicleStatus::Idle => "idle",
            VehicleStatus::Maintenance => "maintenance",
            VehicleStatus::Offline => "offline",
        };
        f.write_str(label)
    }
}

impl<'de> Deserialize<'de> for VehicleStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One tracked vehicle. Serialized with camelCase keys on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    /// Stable unique identifier (e.g. `V-001`).
    pub id: String,
    /// Name of the assigned driver.
    pub driver_name: String,
    /// Corridor the vehicle serves (free text, e.g. `North`).
    pub corridor: String,
    /// Current speed; never negative.
    pub speed: f64,
    /// Fuel level in percent.
    pub fuel: i64,
    /// Operational status.
    pub status: VehicleStatus,
    /// Vehicle class (free text, e.g. `truck`).
    pub vehicle_type: String,
    /// Position latitude in degrees.
    pub latitude: f64,
    /// Position longitude in degrees.
    pub longitude: f64,
    /// Timestamp of the last store write for this record.
    pub last_update: DateTime<Utc>,
}

impl Vehicle {
    /// Whether the simulation driver should perturb this vehicle.
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Build a vehicle record from a configuration seed entry.
    pub fn from_seed(id: impl Into<String>, seed: &VehicleSeed) -> anyhow::Result<Self> {
        let id = id.into();
        let status = seed
            .status
            .parse::<VehicleStatus>()
            .map_err(|err| anyhow!("vehicle '{}': {}", id, err))?;
        Ok(Self {
            id,
            driver_name: seed.driver_name.clone(),
            corridor: seed.corridor.clone(),
            speed: seed.speed,
            fuel: seed.fuel,
            status,
            vehicle_type: seed.vehicle_type.clone(),
            latitude: seed.latitude,
            longitude: seed.longitude,
            last_update: Utc::now(),
        })
    }
}

/// Partial vehicle mutation; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehiclePatch {
    /// Replacement driver name.
    #[serde(default)]
    pub driver_name: Option<String>,
    /// Replacement corridor.
    #[serde(default)]
    pub corridor: Option<String>,
    /// Replacement speed.
    #[serde(default)]
    pub speed: Option<f64>,
    /// Replacement fuel level.
    #[serde(default)]
    pub fuel: Option<i64>,
    /// Replacement status.
    #[serde(default)]
    pub status: Option<VehicleStatus>,
    /// Replacement vehicle class.
    #[serde(default)]
    pub vehicle_type: Option<String>,
    /// Replacement latitude.
    #[serde(default)]
    pub latitude: Option<f64>,
    /// Replacement longitude.
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl VehiclePatch {
    /// Merge the present fields into `vehicle`, leaving the rest untouched.
    pub fn apply(&self, vehicle: &mut Vehicle) {
        if let Some(driver_name) = &self.driver_name {
            vehicle.driver_name = driver_name.clone();
        }
        if let Some(corridor) = &self.corridor {
            vehicle.corridor = corridor.clone();
        }
        if let Some(speed) = self.speed {
            vehicle.speed = speed;
        }
        if let Some(fuel) = self.fuel {
            vehicle.fuel = fuel;
        }
        if let Some(status) = self.status {
            vehicle.status = status;
        }
        if let Some(vehicle_type) = &self.vehicle_type {
            vehicle.vehicle_type = vehicle_type.clone();
        }
        if let Some(latitude) = self.latitude {
            vehicle.latitude = latitude;
        }
        if let Some(longitude) = self.longitude {
            vehicle.longitude = longitude;
        }
    }
}
