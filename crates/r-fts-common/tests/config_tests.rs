//! ---
//! fts_section: "01-core-functionality"
//! fts_subsection: "module"
//! fts_type: "source"
//! fts_scope: "code"
//! fts_description: "Shared primitives and utilities for the fleet runtime."
//! fts_version: "v0.0.0-prealpha"
//! fts_owner: "tbd"
//! ---
use std::io::Write;
use std::time::Duration;

use r_fts_common::config::AppConfig;

const FULL_DOCUMENT: &str = r#"
[simulation]
enabled = true
tick_interval = 3
geo_jitter = 0.01
speed_jitter = 8.0
random_seed = 42

[websocket]
listen = "127.0.0.1:9101"

[api]
listen = "127.0.0.1:9100"

[fleet.V-001]
driver_name = "John Smith"
corridor = "North"
vehicle_type = "truck"
speed = 45.0
fuel = 78
status = "ACTIVE"
latitude = 40.7589
longitude = -73.9851

[fleet.V-002]
driver_name = "Sarah Johnson"
corridor = "South"
vehicle_type = "van"

[[alerts]]
vehicle_id = "V-002"
type = "low_fuel"
message = "V-002 - 15% remaining"
severity = "high"

[[alerts]]
vehicle_id = "V-001"
type = "maintenance"
message = "V-001 - Service required"
severity = "medium"
is_active = false
"#;

#[test]
fn empty_document_yields_defaults() {
    let config: AppConfig = "".parse().expect("empty config should parse");
    assert!(config.fleet.is_empty());
    assert!(config.simulation.enabled);
    assert_eq!(config.simulation.tick_interval, Duration::from_secs(10));
    assert_eq!(config.simulation.geo_jitter, 0.001);
    assert_eq!(config.simulation.speed_jitter, 5.0);
    assert!(config.simulation.random_seed.is_none());
    assert_eq!(config.api.listen.port(), 8080);
    assert_eq!(config.websocket.listen.port(), 8081);
    assert!(config.api.enabled);
    assert!(config.websocket.enabled);
}

#[test]
fn full_document_parses_with_field_defaults() {
    let config: AppConfig = FULL_DOCUMENT.parse().expect("document should parse");
    assert_eq!(config.simulation.tick_interval, Duration::from_secs(3));
    assert_eq!(config.simulation.random_seed, Some(42));
    assert_eq!(config.fleet.len(), 2);

    let first = &config.fleet["V-001"];
    assert_eq!(first.driver_name, "John Smith");
    assert_eq!(first.status, "ACTIVE");
    assert_eq!(first.fuel, 78);

    // Omitted telemetry fields fall back to their column defaults.
    let second = &config.fleet["V-002"];
    assert_eq!(second.speed, 0.0);
    assert_eq!(second.fuel, 100);
    assert_eq!(second.status, "active");
    assert_eq!(second.latitude, 0.0);

    assert_eq!(config.alerts.len(), 2);
    assert_eq!(config.alerts[0].kind, "low_fuel");
    assert!(config.alerts[0].is_active);
    assert!(!config.alerts[1].is_active);
}

#[test]
fn zero_tick_interval_is_rejected() {
    let err = "[simulation]\ntick_interval = 0\n"
        .parse::<AppConfig>()
        .expect_err("zero interval should fail validation");
    assert!(err.to_string().contains("tick_interval"));
}

#[test]
fn out_of_range_fuel_is_rejected() {
    let doc = r#"
[fleet.V-009]
driver_name = "Pat Lee"
corridor = "East"
vehicle_type = "sedan"
fuel = 150
"#;
    let err = doc
        .parse::<AppConfig>()
        .expect_err("fuel beyond 100 should fail validation");
    assert!(err.to_string().contains("fuel"));
}

#[test]
fn blank_driver_name_is_rejected() {
    let doc = r#"
[fleet.V-010]
driver_name = "  "
corridor = "West"
vehicle_type = "van"
"#;
    let err = doc
        .parse::<AppConfig>()
        .expect_err("blank driver should fail validation");
    assert!(err.to_string().contains("driver"));
}

#[test]
fn alert_entry_without_message_is_rejected() {
    let doc = r#"
[[alerts]]
vehicle_id = "V-001"
type = "low_fuel"
message = "  "
severity = "high"
"#;
    let err = doc
        .parse::<AppConfig>()
        .expect_err("blank alert message should fail validation");
    assert!(err.to_string().contains("message"));
}

#[test]
fn load_honours_env_override_then_candidates() {
    std::env::remove_var(AppConfig::ENV_CONFIG_PATH);

    let mut candidate = tempfile::NamedTempFile::new().expect("temp candidate");
    candidate
        .write_all(b"[simulation]\ntick_interval = 7\n")
        .expect("write candidate");

    let missing = std::path::PathBuf::from("configs/does-not-exist.toml");
    let loaded = AppConfig::load_with_source(&[missing.clone(), candidate.path().to_path_buf()])
        .expect("candidate fallback should load");
    assert_eq!(loaded.source, candidate.path());
    assert_eq!(
        loaded.config.simulation.tick_interval,
        Duration::from_secs(7)
    );

    let mut override_file = tempfile::NamedTempFile::new().expect("temp override");
    override_file
        .write_all(b"[simulation]\ntick_interval = 2\n")
        .expect("write override");
    std::env::set_var(AppConfig::ENV_CONFIG_PATH, override_file.path());

    let loaded = AppConfig::load_with_source(&[missing, candidate.path().to_path_buf()])
        .expect("env override should load");
    assert_eq!(loaded.source, override_file.path());
    assert_eq!(
        loaded.config.simulation.tick_interval,
        Duration::from_secs(2)
    );

    std::env::remove_var(AppConfig::ENV_CONFIG_PATH);
}
