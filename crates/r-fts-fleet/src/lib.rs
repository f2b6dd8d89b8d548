//! ---
//! fts_section: "03-persistence-logging"
//! fts_subsection: "module"
//! fts_type: "source"
//! fts_scope: "code"
//! fts_description: "Vehicle data model and store abstractions."
//! fts_version: "v0.0.0-prealpha"
//! fts_owner: "tbd"
//! ---
#![warn(missing_docs)]

//! Vehicle records and the asynchronous store they live in.
//!
//! The rest of the workspace reads and writes vehicles exclusively through
//! the [`VehicleStore`] trait; [`MemoryVehicleStore`] is the reference
//! implementation used by the daemon and the test suites.

/// Result alias used throughout the fleet crate.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Error type for vehicle store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Lookup or mutation referenced a vehicle ID that is not present.
    #[error("vehicle '{0}' not found")]
    NotFound(String),
    /// Creation referenced a vehicle ID that already exists.
    #[error("vehicle '{0}' already exists")]
    Conflict(String),
    /// Wrapper for IO errors raised by disk-backed store implementations.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub mod alert;
pub mod store;
pub mod vehicle;

pub use alert::{
    Alert, AlertDraft, AlertKind, AlertSeverity, AlertStore, MemoryAlertStore, SharedAlertStore,
};
pub use store::{MemoryVehicleStore, SharedVehicleStore, VehicleStore};
pub use vehicle::{Vehicle, VehiclePatch, VehicleStatus};
