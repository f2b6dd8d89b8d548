//! ---
//! fts_section: "05-networking-external-interfaces"
//! fts_subsection: "module"
//! fts_type: "source"
//! fts_scope: "code"
//! fts_description: "WebSocket session registry and broadcast fan-out."
//! fts_version: "v0.0.0-prealpha"
//! fts_owner: "tbd"
//! ---
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::routing::get;
use axum::Router;
use r_fts_metrics::BroadcastMetrics;
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::watch;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Depth of each connection's outbound queue. A client that stops draining
/// its socket loses messages once this fills; it never stalls the producer.
const OUTBOUND_QUEUE_DEPTH: usize = 64;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Change notification pushed to every connected client after a vehicle's
/// telemetry moves.
///
/// Wire form: `{"type":"vehicle_update","vehicleId":"<id>"}`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VehicleUpdate {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(rename = "vehicleId")]
    vehicle_id: String,
}

impl VehicleUpdate {
    /// Build a notification for the given vehicle.
    pub fn new(vehicle_id: impl Into<String>) -> Self {
        Self {
            kind: "vehicle_update",
            vehicle_id: vehicle_id.into(),
        }
    }

    /// ID of the affected vehicle.
    pub fn vehicle_id(&self) -> &str {
        &self.vehicle_id
    }
}

/// Handle to one connected client held by the [`SessionRegistry`].
///
/// The handle owns only the outbound queue; the socket itself belongs to the
/// per-connection task, which is also responsible for unregistering when the
/// connection closes or errors.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    id: u64,
    outbound: mpsc::Sender<Arc<str>>,
}

impl ClientHandle {
    /// Wrap an outbound queue in a handle with a fresh connection ID.
    pub fn new(outbound: mpsc::Sender<Arc<str>>) -> Self {
        Self {
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            outbound,
        }
    }

    /// Process-local connection identifier.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether the connection's receiving task is still alive.
    pub fn is_open(&self) -> bool {
        !self.outbound.is_closed()
    }

    /// Enqueue a payload without blocking.
    pub fn try_send(&self, payload: Arc<str>) -> Result<(), TrySendError<Arc<str>>> {
        self.outbound.try_send(payload)
    }
}

/// Concurrency-safe set of live client connections.
///
/// All lifecycle paths funnel into `register`/`unregister`; both are defined
/// as no-ops when the connection is already in the requested state, so the
/// close and error handlers may race freely.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    clients: RwLock<HashMap<u64, ClientHandle>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to the live set. Re-registering an already-present
    /// connection has no additional effect.
    pub async fn register(&self, client: ClientHandle) {
        let mut clients = self.clients.write().await;
        clients.insert(client.id(), client);
    }

    /// Remove a connection if present. Unknown IDs are ignored.
    pub async fn unregister(&self, id: u64) {
        let mut clients = self.clients.write().await;
        clients.remove(&id);
    }

    /// Point-in-time copy of the registered connections.
    ///
    /// Connections registered after the snapshot was taken are not included;
    /// no connection appears twice.
    pub async fn snapshot(&self) -> Vec<ClientHandle> {
        let clients = self.clients.read().await;
        clients.values().cloned().collect()
    }

    /// Current number of registered connections.
    pub async fn len(&self) -> usize {
        self.clients.read().await.len()
    }
}

/// Best-effort fan-out of serialized payloads to every registered client.
#[derive(Clone)]
pub struct UpdateBroadcaster {
    registry: Arc<SessionRegistry>,
    metrics: Option<BroadcastMetrics>,
}

impl UpdateBroadcaster {
    /// Create a broadcaster over `registry`.
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self {
            registry,
            metrics: None,
        }
    }

    /// Record broadcast counters on the supplied metrics family.
    pub fn with_metrics(mut self, metrics: BroadcastMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Registry this broadcaster fans out over.
    pub fn registry(&self) -> Arc<SessionRegistry> {
        self.registry.clone()
    }

    /// Serialize and broadcast a [`VehicleUpdate`] for `vehicle_id`.
    pub async fn broadcast_update(&self, vehicle_id: &str) {
        let update = VehicleUpdate::new(vehicle_id);
        let Ok(text) = serde_json::to_string(&update) else {
            warn!(vehicle_id, "failed to serialise vehicle update");
            return;
        };
        self.broadcast(Arc::from(text.as_str())).await;
    }

    /// Deliver `payload` to every currently-registered, still-open
    /// connection.
    ///
    /// Delivery is at-most-once per connection with no retry. A full queue or
    /// a connection that closed mid-call only drops that one send; cleanup of
    /// the dead connection is left to its own task's close/error path.
    pub async fn broadcast(&self, payload: Arc<str>) {
        let snapshot = self.registry.snapshot().await;
        let mut delivered = 0usize;
        let mut dropped = 0usize;

        for client in &snapshot {
            if !client.is_open() {
                continue;
            }
            match client.try_send(Arc::clone(&payload)) {
                Ok(()) => delivered += 1,
                Err(err) => {
                    dropped += 1;
                    debug!(connection_id = client.id(), error = %err, "dropped broadcast send");
                    if let Some(metrics) = &self.metrics {
                        metrics.inc_send_failure();
                    }
                }
            }
        }

        if let Some(metrics) = &self.metrics {
            metrics.inc_broadcast();
        }
        debug!(
            recipients = snapshot.len(),
            delivered, dropped, "broadcast fan-out complete"
        );
    }
}

struct WsState {
    registry: Arc<SessionRegistry>,
    metrics: Option<BroadcastMetrics>,
    shutdown: watch::Receiver<bool>,
}

/// Builder for the WebSocket server that streams vehicle updates.
#[derive(Clone)]
pub struct WsServerBuilder {
    listen: SocketAddr,
    registry: Arc<SessionRegistry>,
    metrics: Option<BroadcastMetrics>,
}

impl WsServerBuilder {
    /// Create a builder bound to `listen` over the shared registry.
    pub fn new(listen: SocketAddr, registry: Arc<SessionRegistry>) -> Self {
        Self {
            listen,
            registry,
            metrics: None,
        }
    }

    /// Track the connected-client gauge on the supplied metrics family.
    pub fn with_metrics(mut self, metrics: BroadcastMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Spawn the WebSocket server and return a shutdown handle.
    pub async fn spawn(self) -> anyhow::Result<WsServerHandle> {
        let listener = TcpListener::bind(self.listen).await?;
        let local_addr = listener.local_addr()?;
        info!(address = %local_addr, "websocket server listening");

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let state = Arc::new(WsState {
            registry: self.registry,
            metrics: self.metrics,
            shutdown: shutdown_rx.clone(),
        });

        let app = Router::new()
            .route("/ws", get(upgrade_handler))
            .with_state(state);
        let task = tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.changed().await;
            });
            if let Err(err) = server.await {
                warn!(error = %err, "websocket server exited with error");
            }
        });

        Ok(WsServerHandle {
            address: local_addr,
            shutdown: shutdown_tx,
            task,
        })
    }
}

/// Handle for the running WebSocket server.
pub struct WsServerHandle {
    address: SocketAddr,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl WsServerHandle {
    /// Return the bound listening address.
    pub fn local_addr(&self) -> SocketAddr {
        self.address
    }

    /// Trigger graceful shutdown and await completion. Live client sockets
    /// receive a close frame and their connection tasks exit.
    pub async fn shutdown(self) -> anyhow::Result<()> {
        let _ = self.shutdown.send(true);
        match self.task.await {
            Ok(()) => Ok(()),
            Err(err) => Err(anyhow::anyhow!(err)),
        }
    }
}

async fn upgrade_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<WsState>>,
) -> axum::response::Response {
    ws.on_upgrade(|socket| client_loop(socket, state))
}

async fn client_loop(mut socket: WebSocket, state: Arc<WsState>) {
    let (tx, mut outbound) = mpsc::channel::<Arc<str>>(OUTBOUND_QUEUE_DEPTH);
    let client = ClientHandle::new(tx);
    let connection_id = client.id();

    state.registry.register(client).await;
    if let Some(metrics) = &state.metrics {
        metrics.set_connected_clients(state.registry.len().await);
    }
    debug!(connection_id, "websocket client registered");

    let mut shutdown = state.shutdown.clone();
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                let _ = socket.send(Message::Close(None)).await;
                break;
            }
            payload = outbound.recv() => {
                let Some(payload) = payload else {
                    break;
                };
                if socket.send(Message::Text(payload.to_string())).await.is_err() {
                    break;
                }
            }
            message = socket.recv() => {
                let Some(Ok(message)) = message else {
                    break;
                };
                match message {
                    Message::Ping(payload) => {
                        if socket.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Message::Close(_) => break,
                    Message::Text(_) | Message::Binary(_) | Message::Pong(_) => {}
                }
            }
        }
    }

    // Close and send-error paths both land here; double unregister is safe.
    state.registry.unregister(connection_id).await;
    if let Some(metrics) = &state.metrics {
        metrics.set_connected_clients(state.registry.len().await);
    }
    debug!(connection_id, "websocket client unregistered");
}
