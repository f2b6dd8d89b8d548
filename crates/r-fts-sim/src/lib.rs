//! ---
//! fts_section: "11-simulation-test-harness"
//! fts_subsection: "module"
//! fts_type: "source"
//! fts_scope: "code"
//! fts_description: "Telemetry perturbation engine for the simulation driver."
//! fts_version: "v0.0.0-prealpha"
//! fts_owner: "tbd"
//! ---
#![warn(missing_docs)]

//! Bounded random telemetry perturbation.
//!
//! The simulation driver uses [`TelemetryPerturber`] once per tick to nudge
//! the position and speed of every active vehicle by a uniform delta drawn
//! from the configured jitter widths.

pub mod perturb;

pub use perturb::{PerturberConfig, TelemetryPerturber};
