//! ---
//! fts_section: "01-core-functionality"
//! fts_subsection: "module"
//! fts_type: "source"
//! fts_scope: "code"
//! fts_description: "Shared primitives and utilities for the fleet runtime."
//! fts_version: "v0.0.0-prealpha"
//! fts_owner: "tbd"
//! ---
//! Core shared primitives for the R-FTS fleet tracking workspace.
//! This crate exposes configuration loading and logging setup utilities
//! consumed across the workspace.

pub mod config;
pub mod logging;

pub use config::{
    AlertSeed, ApiConfig, AppConfig, LoadedAppConfig, LoggingConfig, SimulationConfig, VehicleSeed,
    WebSocketConfig,
};
pub use logging::{init_tracing, LogFormat};
