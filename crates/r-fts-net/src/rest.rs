//! ---
//! fts_section: "05-networking-external-interfaces"
//! fts_subsection: "module"
//! fts_type: "source"
//! fts_scope: "code"
//! fts_description: "REST surface for vehicle CRUD, status, and metrics."
//! fts_version: "v0.0.0-prealpha"
//! fts_owner: "tbd"
//! ---
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use prometheus::{Registry, TextEncoder};
use r_fts_fleet::{
    AlertDraft, MemoryAlertStore, SharedAlertStore, SharedVehicleStore, StoreError, Vehicle,
    VehiclePatch, VehicleStatus,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::websocket::UpdateBroadcaster;

/// Snapshot of system health returned by the status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusSnapshot {
    /// Service identifier.
    pub service: String,
    /// Running workspace version.
    pub version: String,
    /// Total number of stored vehicles.
    pub vehicles_total: usize,
    /// Number of vehicles with active status.
    pub vehicles_active: usize,
    /// Number of WebSocket clients currently registered.
    pub connected_clients: usize,
    /// Configured simulation tick period in seconds.
    pub tick_interval_secs: u64,
}

/// Request body accepted by `POST /vehicles`.
///
/// The ID is optional; when absent a fresh UUID is assigned.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVehicle {
    /// Vehicle identifier; generated when omitted.
    #[serde(default)]
    pub id: Option<String>,
    /// Name of the assigned driver.
    pub driver_name: String,
    /// Corridor the vehicle serves.
    pub corridor: String,
    /// Vehicle class (free text).
    pub vehicle_type: String,
    /// Initial speed.
    #[serde(default)]
    pub speed: f64,
    /// Initial fuel level in percent.
    #[serde(default = "default_fuel")]
    pub fuel: i64,
    /// Initial operational status.
    #[serde(default)]
    pub status: VehicleStatus,
    /// Initial latitude in degrees.
    #[serde(default)]
    pub latitude: f64,
    /// Initial longitude in degrees.
    #[serde(default)]
    pub longitude: f64,
}

fn default_fuel() -> i64 {
    100
}

impl NewVehicle {
    /// Apply the same telemetry rules the config seed path enforces.
    fn validate(&self) -> std::result::Result<(), String> {
        if self.driver_name.trim().is_empty() {
            return Err("driverName must be non-empty".to_owned());
        }
        if self.vehicle_type.trim().is_empty() {
            return Err("vehicleType must be non-empty".to_owned());
        }
        if !(0..=100).contains(&self.fuel) {
            return Err("fuel must be between 0 and 100".to_owned());
        }
        if !self.speed.is_finite() || self.speed < 0.0 {
            return Err("speed must be a non-negative number".to_owned());
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err("latitude must be within -90 and 90 degrees".to_owned());
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err("longitude must be within -180 and 180 degrees".to_owned());
        }
        Ok(())
    }

    fn into_vehicle(self) -> Vehicle {
        Vehicle {
            id: self
                .id
                .unwrap_or_else(|| format!("V-{}", Uuid::new_v4().simple())),
            driver_name: self.driver_name,
            corridor: self.corridor,
            speed: self.speed,
            fuel: self.fuel,
            status: self.status,
            vehicle_type: self.vehicle_type,
            latitude: self.latitude,
            longitude: self.longitude,
            last_update: Utc::now(),
        }
    }
}

/// Telemetry rules for partial updates; only present fields are checked.
fn validate_patch(patch: &VehiclePatch) -> std::result::Result<(), String> {
    if let Some(driver_name) = &patch.driver_name {
        if driver_name.trim().is_empty() {
            return Err("driverName must be non-empty".to_owned());
        }
    }
    if let Some(fuel) = patch.fuel {
        if !(0..=100).contains(&fuel) {
            return Err("fuel must be between 0 and 100".to_owned());
        }
    }
    if let Some(speed) = patch.speed {
        if !speed.is_finite() || speed < 0.0 {
            return Err("speed must be a non-negative number".to_owned());
        }
    }
    if let Some(latitude) = patch.latitude {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err("latitude must be within -90 and 90 degrees".to_owned());
        }
    }
    if let Some(longitude) = patch.longitude {
        if !(-180.0..=180.0).contains(&longitude) {
            return Err("longitude must be within -180 and 180 degrees".to_owned());
        }
    }
    Ok(())
}

/// Shared state injected into the axum handlers.
struct RestState {
    store: SharedVehicleStore,
    alerts: SharedAlertStore,
    broadcaster: UpdateBroadcaster,
    metrics: Option<Arc<Registry>>,
    tick_interval: Duration,
}

/// Builder used to configure and spawn the REST API server.
#[derive(Clone)]
pub struct RestApiBuilder {
    listen: SocketAddr,
    store: SharedVehicleStore,
    alerts: SharedAlertStore,
    broadcaster: UpdateBroadcaster,
    metrics: Option<Arc<Registry>>,
    tick_interval: Duration,
}

impl RestApiBuilder {
    /// Construct a new builder from mandatory components.
    pub fn new(
        listen: SocketAddr,
        store: SharedVehicleStore,
        broadcaster: UpdateBroadcaster,
    ) -> Self {
        Self {
            listen,
            store,
            alerts: Arc::new(MemoryAlertStore::new()),
            broadcaster,
            metrics: None,
            tick_interval: Duration::from_secs(10),
        }
    }

    /// Serve `/alerts` from the supplied store instead of an empty one.
    pub fn with_alert_store(mut self, alerts: SharedAlertStore) -> Self {
        self.alerts = alerts;
        self
    }

    /// Attach a Prometheus registry exposed at `/metrics`.
    pub fn with_metrics_registry(mut self, registry: Arc<Registry>) -> Self {
        self.metrics = Some(registry);
        self
    }

    /// Report the configured tick period through `/status`.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Spawn the REST API server and return a handle that can be awaited for shutdown.
    pub async fn spawn(self) -> anyhow::Result<RestApiHandle> {
        let listener = TcpListener::bind(self.listen).await?;
        let local_addr = listener.local_addr()?;
        info!(address = %local_addr, "rest api listening");

        let state = RestState {
            store: self.store,
            alerts: self.alerts,
            broadcaster: self.broadcaster,
            metrics: self.metrics,
            tick_interval: self.tick_interval,
        };
        let router = Router::new()
            .route("/vehicles", get(list_vehicles).post(create_vehicle))
            .route(
                "/vehicles/:id",
                get(get_vehicle).patch(patch_vehicle).delete(delete_vehicle),
            )
            .route("/alerts", get(list_alerts).post(create_alert))
            .route("/status", get(get_status))
            .route("/metrics", get(get_metrics))
            .with_state(Arc::new(state));

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let server = axum::serve(listener, router).with_graceful_shutdown(async move {
            let _ = shutdown_rx.changed().await;
        });
        let task = tokio::spawn(async move {
            if let Err(err) = server.await {
                warn!(error = %err, "rest api server exited with error");
            }
        });

        Ok(RestApiHandle {
            address: local_addr,
            task,
            shutdown: shutdown_tx,
        })
    }
}

/// Handle returned from [`RestApiBuilder::spawn`] allowing the caller to await server completion.
pub struct RestApiHandle {
    address: SocketAddr,
    task: JoinHandle<()>,
    shutdown: watch::Sender<bool>,
}

impl RestApiHandle {
    /// Retrieve the socket address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.address
    }

    /// Request graceful shutdown and wait for the server task to finish.
    pub async fn shutdown(self) -> anyhow::Result<()> {
        let _ = self.shutdown.send(true);
        match self.task.await {
            Ok(()) => Ok(()),
            Err(join) => Err(anyhow::anyhow!(join)),
        }
    }
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}

fn store_error_response(err: StoreError) -> Response {
    match err {
        StoreError::NotFound(id) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": format!("vehicle '{}' not found", id) })),
        )
            .into_response(),
        StoreError::Conflict(id) => (
            StatusCode::CONFLICT,
            Json(serde_json::json!({ "error": format!("vehicle '{}' already exists", id) })),
        )
            .into_response(),
        StoreError::Io(err) => {
            warn!(error = %err, "vehicle store io failure");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn list_vehicles(State(state): State<Arc<RestState>>) -> Response {
    match state.store.find_all().await {
        Ok(vehicles) => Json(vehicles).into_response(),
        Err(err) => store_error_response(err),
    }
}

async fn get_vehicle(State(state): State<Arc<RestState>>, Path(id): Path<String>) -> Response {
    match state.store.get(&id).await {
        Ok(vehicle) => Json(vehicle).into_response(),
        Err(err) => store_error_response(err),
    }
}

async fn create_vehicle(
    State(state): State<Arc<RestState>>,
    Json(request): Json<NewVehicle>,
) -> Response {
    if let Err(message) = request.validate() {
        return bad_request(&message);
    }
    match state.store.create(request.into_vehicle()).await {
        Ok(vehicle) => {
            state.broadcaster.broadcast_update(&vehicle.id).await;
            (StatusCode::CREATED, Json(vehicle)).into_response()
        }
        Err(err) => store_error_response(err),
    }
}

async fn patch_vehicle(
    State(state): State<Arc<RestState>>,
    Path(id): Path<String>,
    Json(patch): Json<VehiclePatch>,
) -> Response {
    if let Err(message) = validate_patch(&patch) {
        return bad_request(&message);
    }
    match state.store.update(&id, &patch).await {
        Ok(vehicle) => {
            state.broadcaster.broadcast_update(&vehicle.id).await;
            Json(vehicle).into_response()
        }
        Err(err) => store_error_response(err),
    }
}

async fn delete_vehicle(State(state): State<Arc<RestState>>, Path(id): Path<String>) -> Response {
    match state.store.delete(&id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => store_error_response(StoreError::NotFound(id)),
        Err(err) => store_error_response(err),
    }
}

async fn list_alerts(State(state): State<Arc<RestState>>) -> Response {
    match state.alerts.active().await {
        Ok(alerts) => Json(alerts).into_response(),
        Err(err) => store_error_response(err),
    }
}

async fn create_alert(
    State(state): State<Arc<RestState>>,
    Json(draft): Json<AlertDraft>,
) -> Response {
    if draft.vehicle_id.trim().is_empty() {
        return bad_request("vehicleId must be non-empty");
    }
    if draft.message.trim().is_empty() {
        return bad_request("message must be non-empty");
    }
    match state.alerts.create(draft).await {
        Ok(alert) => (StatusCode::CREATED, Json(alert)).into_response(),
        Err(err) => store_error_response(err),
    }
}

async fn get_status(State(state): State<Arc<RestState>>) -> Response {
    let vehicles = match state.store.find_all().await {
        Ok(vehicles) => vehicles,
        Err(err) => return store_error_response(err),
    };
    let snapshot = StatusSnapshot {
        service: "r-fts".to_owned(),
        version: env!("CARGO_PKG_VERSION").to_owned(),
        vehicles_total: vehicles.len(),
        vehicles_active: vehicles.iter().filter(|v| v.is_active()).count(),
        connected_clients: state.broadcaster.registry().len().await,
        tick_interval_secs: state.tick_interval.as_secs(),
    };
    Json(snapshot).into_response()
}

async fn get_metrics(State(state): State<Arc<RestState>>) -> Response {
    let Some(registry) = &state.metrics else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics registry unavailable",
        )
            .into_response();
    };

    let encoder = TextEncoder::new();
    let families = registry.gather();
    match encoder.encode_to_string(&families) {
        Ok(body) => (StatusCode::OK, body).into_response(),
        Err(err) => {
            warn!(error = %err, "failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::{ClientHandle, SessionRegistry};
    use r_fts_fleet::{Alert, AlertKind, AlertSeverity, AlertStore, MemoryVehicleStore};
    use r_fts_metrics::{new_registry, BroadcastMetrics};
    use reqwest::Client;
    use serde_json::json;
    use tokio::sync::mpsc;

    async fn spawn_api(
        store: SharedVehicleStore,
    ) -> (RestApiHandle, Arc<SessionRegistry>, Client, String) {
        let registry = Arc::new(SessionRegistry::new());
        let metrics_registry = new_registry();
        let broadcaster = UpdateBroadcaster::new(Arc::clone(&registry))
            .with_metrics(BroadcastMetrics::new(metrics_registry.clone()).unwrap());
        let handle = RestApiBuilder::new("127.0.0.1:0".parse().unwrap(), store, broadcaster)
            .with_metrics_registry(metrics_registry)
            .with_tick_interval(Duration::from_secs(10))
            .spawn()
            .await
            .unwrap();
        let base = format!("http://{}", handle.local_addr());
        (handle, registry, Client::new(), base)
    }

    fn body(id: &str) -> serde_json::Value {
        json!({
            "id": id,
            "driverName": "John Smith",
            "corridor": "North",
            "vehicleType": "truck",
            "speed": 45.0,
            "fuel": 78,
            "status": "Active",
            "latitude": 40.7589,
            "longitude": -73.9851
        })
    }

    #[tokio::test]
    async fn crud_round_trip_with_broadcasts() {
        let store: SharedVehicleStore = Arc::new(MemoryVehicleStore::new());
        let (handle, registry, client, base) = spawn_api(store).await;

        // Observe broadcasts through a directly registered client handle.
        let (tx, mut rx) = mpsc::channel(16);
        registry.register(ClientHandle::new(tx)).await;

        let created = client
            .post(format!("{base}/vehicles"))
            .json(&body("V-001"))
            .send()
            .await
            .unwrap();
        assert_eq!(created.status(), StatusCode::CREATED);
        let vehicle: Vehicle = created.json().await.unwrap();
        assert_eq!(vehicle.id, "V-001");
        assert_eq!(vehicle.status, VehicleStatus::Active);

        let update: serde_json::Value =
            serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(update["type"], "vehicle_update");
        assert_eq!(update["vehicleId"], "V-001");

        let duplicate = client
            .post(format!("{base}/vehicles"))
            .json(&body("V-001"))
            .send()
            .await
            .unwrap();
        assert_eq!(duplicate.status(), StatusCode::CONFLICT);

        let patched = client
            .patch(format!("{base}/vehicles/V-001"))
            .json(&json!({ "speed": 12.5, "status": "idle" }))
            .send()
            .await
            .unwrap();
        assert_eq!(patched.status(), StatusCode::OK);
        let vehicle: Vehicle = patched.json().await.unwrap();
        assert_eq!(vehicle.speed, 12.5);
        assert_eq!(vehicle.status, VehicleStatus::Idle);
        assert_eq!(vehicle.driver_name, "John Smith");
        let update: serde_json::Value =
            serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(update["vehicleId"], "V-001");

        let listed: Vec<Vehicle> = client
            .get(format!("{base}/vehicles"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);

        let deleted = client
            .delete(format!("{base}/vehicles/V-001"))
            .send()
            .await
            .unwrap();
        assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

        let missing = client
            .get(format!("{base}/vehicles/V-001"))
            .send()
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn post_without_id_generates_one() {
        let store: SharedVehicleStore = Arc::new(MemoryVehicleStore::new());
        let (handle, _registry, client, base) = spawn_api(store).await;

        let mut request = body("ignored");
        request.as_object_mut().unwrap().remove("id");
        let created = client
            .post(format!("{base}/vehicles"))
            .json(&request)
            .send()
            .await
            .unwrap();
        assert_eq!(created.status(), StatusCode::CREATED);
        let vehicle: Vehicle = created.json().await.unwrap();
        assert!(vehicle.id.starts_with("V-"));
        assert!(vehicle.id.len() > 2);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn status_and_metrics_endpoints_report_runtime_state() {
        let store: SharedVehicleStore = Arc::new(MemoryVehicleStore::new());
        let (handle, registry, client, base) = spawn_api(Arc::clone(&store)).await;

        client
            .post(format!("{base}/vehicles"))
            .json(&body("V-001"))
            .send()
            .await
            .unwrap();
        let mut offline = body("V-002");
        offline["status"] = json!("offline");
        client
            .post(format!("{base}/vehicles"))
            .json(&offline)
            .send()
            .await
            .unwrap();

        let (tx, _rx) = mpsc::channel(4);
        registry.register(ClientHandle::new(tx)).await;

        let status: StatusSnapshot = client
            .get(format!("{base}/status"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(status.service, "r-fts");
        assert_eq!(status.vehicles_total, 2);
        assert_eq!(status.vehicles_active, 1);
        assert_eq!(status.connected_clients, 1);
        assert_eq!(status.tick_interval_secs, 10);

        let metrics = client
            .get(format!("{base}/metrics"))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(metrics.contains("r_fts_broadcasts_total"));

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn invalid_telemetry_in_post_body_is_rejected() {
        let store: SharedVehicleStore = Arc::new(MemoryVehicleStore::new());
        let (handle, _registry, client, base) = spawn_api(Arc::clone(&store)).await;

        for (field, value) in [
            ("speed", json!(-5.0)),
            ("latitude", json!(95.0)),
            ("longitude", json!(190.0)),
            ("fuel", json!(150)),
            ("driverName", json!("   ")),
        ] {
            let mut request = body("V-001");
            request[field] = value;
            let rejected = client
                .post(format!("{base}/vehicles"))
                .json(&request)
                .send()
                .await
                .unwrap();
            assert_eq!(
                rejected.status(),
                StatusCode::BAD_REQUEST,
                "field {field} should be rejected"
            );
        }

        // Nothing was stored.
        assert!(store.find_all().await.unwrap().is_empty());
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn invalid_patch_values_are_rejected() {
        let store: SharedVehicleStore = Arc::new(MemoryVehicleStore::new());
        let (handle, _registry, client, base) = spawn_api(Arc::clone(&store)).await;

        client
            .post(format!("{base}/vehicles"))
            .json(&body("V-001"))
            .send()
            .await
            .unwrap();

        let rejected = client
            .patch(format!("{base}/vehicles/V-001"))
            .json(&json!({ "speed": -1.0 }))
            .send()
            .await
            .unwrap();
        assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);

        let rejected = client
            .patch(format!("{base}/vehicles/V-001"))
            .json(&json!({ "fuel": 120 }))
            .send()
            .await
            .unwrap();
        assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);

        // The record keeps its original telemetry.
        let stored = store.get("V-001").await.unwrap();
        assert_eq!(stored.speed, 45.0);
        assert_eq!(stored.fuel, 78);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn alerts_surface_lists_active_and_accepts_new() {
        let store: SharedVehicleStore = Arc::new(MemoryVehicleStore::new());
        let alerts: SharedAlertStore = Arc::new(MemoryAlertStore::new());
        alerts
            .create(AlertDraft {
                vehicle_id: "V-002".to_owned(),
                kind: AlertKind::LowFuel,
                message: "V-002 - 15% remaining".to_owned(),
                severity: AlertSeverity::High,
                is_active: true,
            })
            .await
            .unwrap();
        alerts
            .create(AlertDraft {
                vehicle_id: "V-001".to_owned(),
                kind: AlertKind::Offline,
                message: "V-001 - resolved".to_owned(),
                severity: AlertSeverity::Low,
                is_active: false,
            })
            .await
            .unwrap();

        let registry = Arc::new(SessionRegistry::new());
        let broadcaster = UpdateBroadcaster::new(Arc::clone(&registry));
        let handle = RestApiBuilder::new("127.0.0.1:0".parse().unwrap(), store, broadcaster)
            .with_alert_store(Arc::clone(&alerts))
            .spawn()
            .await
            .unwrap();
        let base = format!("http://{}", handle.local_addr());
        let client = Client::new();

        let listed: Vec<Alert> = client
            .get(format!("{base}/alerts"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].vehicle_id, "V-002");
        assert_eq!(listed[0].kind, AlertKind::LowFuel);

        let created = client
            .post(format!("{base}/alerts"))
            .json(&json!({
                "vehicleId": "V-003",
                "type": "speeding",
                "message": "V-003 - 92 in a 60 corridor",
                "severity": "critical"
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(created.status(), StatusCode::CREATED);
        let alert: Alert = created.json().await.unwrap();
        assert!(!alert.id.is_empty());
        assert!(alert.is_active);

        let listed: Vec<Alert> = client
            .get(format!("{base}/alerts"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(listed.len(), 2);

        let rejected = client
            .post(format!("{base}/alerts"))
            .json(&json!({
                "vehicleId": "V-003",
                "type": "speeding",
                "message": "   ",
                "severity": "critical"
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);

        let unknown_severity = client
            .post(format!("{base}/alerts"))
            .json(&json!({
                "vehicleId": "V-003",
                "type": "speeding",
                "message": "V-003 - again",
                "severity": "urgent"
            }))
            .send()
            .await
            .unwrap();
        assert!(unknown_severity.status().is_client_error());

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn unknown_status_in_body_is_rejected() {
        let store: SharedVehicleStore = Arc::new(MemoryVehicleStore::new());
        let (handle, _registry, client, base) = spawn_api(store).await;

        let mut request = body("V-001");
        request["status"] = json!("cruising");
        let rejected = client
            .post(format!("{base}/vehicles"))
            .json(&request)
            .send()
            .await
            .unwrap();
        assert!(rejected.status().is_client_error());

        handle.shutdown().await.unwrap();
    }
}
