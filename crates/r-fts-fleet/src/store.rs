//! ---
//! fts_section: "03-persistence-logging"
//! fts_subsection: "module"
//! fts_type: "source"
//! fts_scope: "code"
//! fts_description: "Vehicle data model and store abstractions."
//! fts_version: "v0.0.0-prealpha"
//! fts_owner: "tbd"
//! ---
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::vehicle::{Vehicle, VehiclePatch};
use crate::{Result, StoreError};

/// Shared trait-object handle used to inject a store into servers and the
/// simulation driver.
pub type SharedVehicleStore = Arc<dyn VehicleStore>;

/// Asynchronous collection of vehicle records keyed by vehicle ID.
///
/// The simulation driver only needs [`VehicleStore::find_all`] and
/// [`VehicleStore::save`]; the remaining operations back the REST surface.
#[async_trait]
pub trait VehicleStore: Send + Sync + 'static {
    /// Return every stored vehicle, ordered by ID.
    async fn find_all(&self) -> Result<Vec<Vehicle>>;

    /// Fetch a single vehicle by ID.
    async fn get(&self, id: &str) -> Result<Vehicle>;

    /// Upsert a vehicle by ID and stamp its `last_update` timestamp.
    async fn save(&self, vehicle: Vehicle) -> Result<Vehicle>;

    /// Insert a new vehicle; fails with [`StoreError::Conflict`] when the ID
    /// is already taken.
    async fn create(&self, vehicle: Vehicle) -> Result<Vehicle>;

    /// Merge a partial mutation into an existing vehicle.
    async fn update(&self, id: &str, patch: &VehiclePatch) -> Result<Vehicle>;

    /// Remove a vehicle. Returns `false` when the ID was not present.
    async fn delete(&self, id: &str) -> Result<bool>;
}

/// In-memory reference store backed by a read/write locked map.
///
/// Every mutation takes the write guard for the duration of a single
/// read-modify-write, which gives the per-record atomicity the driver and the
/// REST handlers rely on without any cross-record transaction.
#[derive(Debug, Default)]
pub struct MemoryVehicleStore {
    vehicles: RwLock<HashMap<String, Vehicle>>,
}

impl MemoryVehicleStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with the supplied vehicles.
    pub fn with_vehicles(vehicles: impl IntoIterator<Item = Vehicle>) -> Self {
        let map = vehicles
            .into_iter()
            .map(|vehicle| (vehicle.id.clone(), vehicle))
            .collect();
        Self {
            vehicles: RwLock::new(map),
        }
    }
}

#[async_trait]
impl VehicleStore for MemoryVehicleStore {
    async fn find_all(&self) -> Result<Vec<Vehicle>> {
        let guard = self.vehicles.read().await;
        let mut all: Vec<Vehicle> = guard.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }

    async fn get(&self, id: &str) -> Result<Vehicle> {
        let guard = self.vehicles.read().await;
        guard
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_owned()))
    }

    async fn save(&self, mut vehicle: Vehicle) -> Result<Vehicle> {
        vehicle.last_update = Utc::now();
        let mut guard = self.vehicles.write().await;
        guard.insert(vehicle.id.clone(), vehicle.clone());
        Ok(vehicle)
    }

    async fn create(&self, mut vehicle: Vehicle) -> Result<Vehicle> {
        let mut guard = self.vehicles.write().await;
        if guard.contains_key(&vehicle.id) {
            return Err(StoreError::Conflict(vehicle.id));
        }
        vehicle.last_update = Utc::now();
        guard.insert(vehicle.id.clone(), vehicle.clone());
        Ok(vehicle)
    }

    async fn update(&self, id: &str, patch: &VehiclePatch) -> Result<Vehicle> {
        let mut guard = self.vehicles.write().await;
        let vehicle = guard
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_owned()))?;
        patch.apply(vehicle);
        vehicle.last_update = Utc::now();
        Ok(vehicle.clone())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut guard = self.vehicles.write().await;
        Ok(guard.remove(id).is_some())
    }
}
