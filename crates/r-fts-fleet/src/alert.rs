//! ---
//! fts_section: "03-persistence-logging"
//! fts_subsection: "module"
//! fts_type: "source"
//! fts_scope: "code"
//! fts_description: "Fleet alert records and their asynchronous store."
//! fts_version: "v0.0.0-prealpha"
//! fts_owner: "tbd"
//! ---
use std::collections::HashMap;
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use r_fts_common::config::AlertSeed;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::Result;

/// Category of a raised alert.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// Fuel level has fallen below the operational threshold.
    LowFuel,
    /// Vehicle is due for service.
    Maintenance,
    /// Vehicle exceeded its corridor speed limit.
    Speeding,
    /// Vehicle stopped reporting telemetry.
    Offline,
}

impl std::str::FromStr for AlertKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low_fuel" => Ok(AlertKind::LowFuel),
            "maintenance" => Ok(AlertKind::Maintenance),
            "speeding" => Ok(AlertKind::Speeding),
            "offline" => Ok(AlertKind::Offline),
            other => Err(format!("unknown alert type: {}", other)),
        }
    }
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            AlertKind::LowFuel => "low_fuel",
            AlertKind::Maintenance => "maintenance",
            AlertKind::Speeding => "speeding",
            AlertKind::Offline => "offline",
        };
        f.write_str(label)
    }
}

impl<'de> Deserialize<'de> for AlertKind {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// How urgent an alert is.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    /// Informational.
    Low,
    /// Needs attention within the shift.
    Medium,
    /// Needs attention now.
    High,
    /// Vehicle must be taken off the road.
    Critical,
}

impl std::str::FromStr for AlertSeverity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(AlertSeverity::Low),
            "medium" => Ok(AlertSeverity::Medium),
            "high" => Ok(AlertSeverity::High),
            "critical" => Ok(AlertSeverity::Critical),
            other => Err(format!("unknown alert severity: {}", other)),
        }
    }
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            AlertSeverity::Low => "low",
            AlertSeverity::Medium => "medium",
            AlertSeverity::High => "high",
            AlertSeverity::Critical => "critical",
        };
        f.write_str(label)
    }
}

impl<'de> Deserialize<'de> for AlertSeverity {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One raised alert. Serialized with camelCase keys on the wire; the kind
/// travels under the `type` key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    /// Store-assigned unique identifier.
    pub id: String,
    /// Vehicle this alert refers to.
    pub vehicle_id: String,
    /// Alert category.
    #[serde(rename = "type")]
    pub kind: AlertKind,
    /// Operator-facing description.
    pub message: String,
    /// Urgency.
    pub severity: AlertSeverity,
    /// Whether the alert is still open.
    pub is_active: bool,
    /// When the alert was raised.
    pub created_at: DateTime<Utc>,
}

/// Payload for raising a new alert; the store assigns ID and timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertDraft {
    /// Vehicle this alert refers to.
    pub vehicle_id: String,
    /// Alert category.
    #[serde(rename = "type")]
    pub kind: AlertKind,
    /// Operator-facing description.
    pub message: String,
    /// Urgency.
    pub severity: AlertSeverity,
    /// Whether the alert starts open. Defaults to true.
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl AlertDraft {
    /// Build a draft from a configuration seed entry.
    pub fn from_seed(seed: &AlertSeed) -> anyhow::Result<Self> {
        let kind = seed
            .kind
            .parse::<AlertKind>()
            .map_err(|err| anyhow!("alert for '{}': {}", seed.vehicle_id, err))?;
        let severity = seed
            .severity
            .parse::<AlertSeverity>()
            .map_err(|err| anyhow!("alert for '{}': {}", seed.vehicle_id, err))?;
        Ok(Self {
            vehicle_id: seed.vehicle_id.clone(),
            kind,
            message: seed.message.clone(),
            severity,
            is_active: seed.is_active,
        })
    }
}

/// Shared trait-object handle for the alert store.
pub type SharedAlertStore = Arc<dyn AlertStore>;

/// Asynchronous collection of alert records.
#[async_trait]
pub trait AlertStore: Send + Sync + 'static {
    /// Return currently-open alerts, newest first.
    async fn active(&self) -> Result<Vec<Alert>>;

    /// Insert a new alert, assigning its ID and creation timestamp.
    async fn create(&self, draft: AlertDraft) -> Result<Alert>;
}

/// In-memory reference alert store.
#[derive(Debug, Default)]
pub struct MemoryAlertStore {
    alerts: RwLock<HashMap<String, Alert>>,
}

impl MemoryAlertStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AlertStore for MemoryAlertStore {
    async fn active(&self) -> Result<Vec<Alert>> {
        let guard = self.alerts.read().await;
        let mut active: Vec<Alert> = guard.values().filter(|a| a.is_active).cloned().collect();
        active.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(active)
    }

    async fn create(&self, draft: AlertDraft) -> Result<Alert> {
        let alert = Alert {
            id: Uuid::new_v4().to_string(),
            vehicle_id: draft.vehicle_id,
            kind: draft.kind,
            message: draft.message,
            severity: draft.severity,
            is_active: draft.is_active,
            created_at: Utc::now(),
        };
        let mut guard = self.alerts.write().await;
        guard.insert(alert.id.clone(), alert.clone());
        Ok(alert)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(vehicle_id: &str, kind: AlertKind, active: bool) -> AlertDraft {
        AlertDraft {
            vehicle_id: vehicle_id.to_owned(),
            kind,
            message: format!("{vehicle_id} - check"),
            severity: AlertSeverity::High,
            is_active: active,
        }
    }

    #[test]
    fn kind_and_severity_parse_case_insensitively() {
        assert_eq!("LOW_FUEL".parse::<AlertKind>(), Ok(AlertKind::LowFuel));
        assert_eq!("Speeding".parse::<AlertKind>(), Ok(AlertKind::Speeding));
        assert!("engine_fire".parse::<AlertKind>().is_err());

        assert_eq!(
            "Critical".parse::<AlertSeverity>(),
            Ok(AlertSeverity::Critical)
        );
        assert!("urgent".parse::<AlertSeverity>().is_err());
    }

    #[test]
    fn alert_serializes_with_type_key_and_camel_case() {
        let alert = Alert {
            id: "a-1".to_owned(),
            vehicle_id: "V-002".to_owned(),
            kind: AlertKind::LowFuel,
            message: "V-002 - 15% remaining".to_owned(),
            severity: AlertSeverity::High,
            is_active: true,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&alert).unwrap();
        assert_eq!(json["type"], "low_fuel");
        assert_eq!(json["vehicleId"], "V-002");
        assert_eq!(json["severity"], "high");
        assert_eq!(json["isActive"], true);
        assert!(json.get("kind").is_none());
    }

    #[test]
    fn draft_defaults_to_active() {
        let draft: AlertDraft = serde_json::from_str(
            r#"{"vehicleId":"V-005","type":"maintenance","message":"V-005 - Service required","severity":"medium"}"#,
        )
        .unwrap();
        assert!(draft.is_active);
        assert_eq!(draft.kind, AlertKind::Maintenance);
    }

    #[test]
    fn from_seed_rejects_unknown_kind_and_severity() {
        let mut seed = AlertSeed {
            vehicle_id: "V-001".to_owned(),
            kind: "low_fuel".to_owned(),
            message: "V-001 - 10% remaining".to_owned(),
            severity: "high".to_owned(),
            is_active: true,
        };
        assert!(AlertDraft::from_seed(&seed).is_ok());

        seed.kind = "engine_fire".to_owned();
        assert!(AlertDraft::from_seed(&seed).is_err());

        seed.kind = "low_fuel".to_owned();
        seed.severity = "urgent".to_owned();
        let err = AlertDraft::from_seed(&seed).unwrap_err();
        assert!(err.to_string().contains("V-001"));
    }

    #[tokio::test]
    async fn active_filters_and_orders_newest_first() {
        let store = MemoryAlertStore::new();
        let first = store
            .create(draft("V-001", AlertKind::LowFuel, true))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = store
            .create(draft("V-002", AlertKind::Maintenance, true))
            .await
            .unwrap();
        store
            .create(draft("V-003", AlertKind::Offline, false))
            .await
            .unwrap();

        let active = store.active().await.unwrap();
        assert_eq!(active.len(), 2);
        assert_eq!(active[0].id, second.id);
        assert_eq!(active[1].id, first.id);
    }

    #[tokio::test]
    async fn create_assigns_unique_ids_and_timestamps() {
        let store = MemoryAlertStore::new();
        let a = store
            .create(draft("V-001", AlertKind::Speeding, true))
            .await
            .unwrap();
        let b = store
            .create(draft("V-001", AlertKind::Speeding, true))
            .await
            .unwrap();
        assert_ne!(a.id, b.id);
        assert!(!a.id.is_empty());
    }
}
