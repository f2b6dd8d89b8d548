//! ---
//! fts_section: "05-networking-external-interfaces"
//! fts_subsection: "module"
//! fts_type: "source"
//! fts_scope: "code"
//! fts_description: "Network surfaces for the fleet tracking runtime."
//! fts_version: "v0.0.0-prealpha"
//! fts_owner: "tbd"
//! ---
#![warn(missing_docs)]

//! WebSocket broadcast and REST surfaces.
//!
//! `websocket` carries the live-update core: the session registry, the
//! fan-out broadcaster, and the `/ws` server feeding both. `rest` exposes
//! the vehicle CRUD surface plus `/status` and `/metrics`.

pub mod rest;
pub mod websocket;

pub use rest::{NewVehicle, RestApiBuilder, RestApiHandle, StatusSnapshot};
pub use websocket::{
    ClientHandle, SessionRegistry, UpdateBroadcaster, VehicleUpdate, WsServerBuilder,
    WsServerHandle,
};
