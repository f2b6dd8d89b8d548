//! ---
//! fts_section: "11-simulation-test-harness"
//! fts_subsection: "module"
//! fts_type: "source"
//! fts_scope: "code"
//! fts_description: "Telemetry perturbation engine for the simulation driver."
//! fts_version: "v0.0.0-prealpha"
//! fts_owner: "tbd"
//! ---
use r_fts_fleet::Vehicle;
use rand::prelude::*;

/// Jitter widths applied per tick.
///
/// Each field is the full width of the uniform distribution: a vehicle's
/// latitude and longitude move by at most `geo_jitter / 2` degrees per tick,
/// its speed by at most `speed_jitter / 2`.
#[derive(Debug, Clone, Copy)]
pub struct PerturberConfig {
    /// Full width of the uniform position delta in degrees.
    pub geo_jitter: f64,
    /// Full width of the uniform speed delta.
    pub speed_jitter: f64,
}

impl Default for PerturberConfig {
    fn default() -> Self {
        Self {
            geo_jitter: 0.001,
            speed_jitter: 5.0,
        }
    }
}

/// Applies bounded random deltas to a vehicle's telemetry.
#[derive(Debug)]
pub struct TelemetryPerturber {
    config: PerturberConfig,
    rng: StdRng,
}

impl TelemetryPerturber {
    /// Create a perturber, seeding the RNG when `seed` is given so test runs
    /// are reproducible.
    pub fn new(config: PerturberConfig, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { config, rng }
    }

    /// Advance one vehicle's telemetry by one simulated step.
    ///
    /// Speed is clamped to zero afterwards; it never goes negative no matter
    /// which delta was drawn.
    pub fn perturb(&mut self, vehicle: &mut Vehicle) {
        vehicle.latitude += self.delta(self.config.geo_jitter);
        vehicle.longitude += self.delta(self.config.geo_jitter);
        vehicle.speed = (vehicle.speed + self.delta(self.config.speed_jitter)).max(0.0);
    }

    fn delta(&mut self, width: f64) -> f64 {
        if width <= 0.0 {
            return 0.0;
        }
        let half = width / 2.0;
        self.rng.gen_range(-half..=half)
    }
}
