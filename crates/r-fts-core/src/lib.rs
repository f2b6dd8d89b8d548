//! ---
//! fts_section: "01-core-functionality"
//! fts_subsection: "module"
//! fts_type: "source"
//! fts_scope: "code"
//! fts_description: "Primary simulation driver and lifecycle management."
//! fts_version: "v0.0.0-prealpha"
//! fts_owner: "tbd"
//! ---
#![warn(missing_docs)]

//! Periodic simulation driver.
//!
//! [`SimulationDriver`] advances the telemetry of every active vehicle on a
//! fixed interval and fans a change notification out to connected clients
//! after each successful write.

pub mod driver;

pub use driver::{DriverHandle, SimulationDriver};
