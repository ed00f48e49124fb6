//! ---
//! pdm_section: "11-simulation"
//! pdm_subsection: "module"
//! pdm_type: "source"
//! pdm_scope: "code"
//! pdm_description: "Threshold alert rules with per-type deduplication."
//! pdm_version: "v0.1.0"
//! pdm_owner: "tbd"
//! ---
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;
use tracing::warn;

use crate::equipment::Equipment;

pub const CRITICAL_HEALTH_THRESHOLD: f64 = 30.0;
pub const LOW_RUL_THRESHOLD: f64 = 100.0;
pub const MAINTENANCE_LEAD_DAYS: i64 = 7;
pub const DEDUP_WINDOW_HOURS: i64 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AlertKind {
    CriticalHealth,
    LowRul,
    MaintenanceDue,
}

impl AlertKind {
    pub fn severity(&self) -> Severity {
        match self {
            AlertKind::CriticalHealth | AlertKind::LowRul => Severity::Critical,
            AlertKind::MaintenanceDue => Severity::Warning,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub message: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
}

/// Stateless rule evaluator over a machine's post-tick state.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlertManager;

impl AlertManager {
    pub fn dedup_window() -> Duration {
        Duration::hours(DEDUP_WINDOW_HOURS)
    }

    /// Drop alerts that fell out of the trailing window.
    pub fn prune(alerts: &mut Vec<Alert>, now: DateTime<Utc>) {
        let cutoff = now - Self::dedup_window();
        alerts.retain(|alert| alert.timestamp > cutoff);
    }

    /// Rules that fire for the given state, in evaluation order.
    pub fn fired_rules(
        health: f64,
        rul: f64,
        next_maintenance: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Vec<AlertKind> {
        let mut fired = Vec::with_capacity(3);
        if health < CRITICAL_HEALTH_THRESHOLD {
            fired.push(AlertKind::CriticalHealth);
        }
        if rul < LOW_RUL_THRESHOLD {
            fired.push(AlertKind::LowRul);
        }
        if next_maintenance < now + Duration::days(MAINTENANCE_LEAD_DAYS) {
            fired.push(AlertKind::MaintenanceDue);
        }
        fired
    }

    /// Prune, evaluate, and append deduplicated alerts. Returns the alerts raised.
    pub fn evaluate(equipment: &mut Equipment, now: DateTime<Utc>) -> Vec<Alert> {
        Self::prune(&mut equipment.alerts, now);
        let fired = Self::fired_rules(
            equipment.health,
            equipment.rul,
            equipment.next_maintenance,
            now,
        );
        let mut raised = Vec::new();
        for kind in fired {
            if equipment.alerts.iter().any(|alert| alert.kind == kind) {
                continue;
            }
            let alert = Alert {
                kind,
                message: Self::message(kind, equipment),
                severity: kind.severity(),
                timestamp: now,
            };
            warn!(
                equipment_id = %equipment.id(),
                alert = %kind,
                severity = %alert.severity,
                "alert raised"
            );
            equipment.alerts.push(alert.clone());
            raised.push(alert);
        }
        raised
    }

    fn message(kind: AlertKind, equipment: &Equipment) -> String {
        match kind {
            AlertKind::CriticalHealth => format!(
                "Equipment {} health critically low: {:.1}%",
                equipment.id(),
                equipment.health
            ),
            AlertKind::LowRul => format!(
                "Equipment {} RUL critically low: {:.1} cycles",
                equipment.id(),
                equipment.rul
            ),
            AlertKind::MaintenanceDue => {
                format!("Equipment {} maintenance due soon", equipment.id())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equipment::EquipmentSeed;
    use chrono::TimeZone;
    use pdm_common::{EquipmentCategory, EquipmentSpec};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn equipment(health: f64, rul: f64, next_maintenance_days: i64) -> Equipment {
        Equipment::from_seed(EquipmentSeed {
            spec: EquipmentSpec::new("E2", EquipmentCategory::Generic),
            health,
            degradation_rate: 0.1,
            rul,
            last_maintenance: now() - Duration::days(60),
            next_maintenance: now() + Duration::days(next_maintenance_days),
        })
        .unwrap()
    }

    #[test]
    fn critical_health_fires_once() {
        let mut eq = equipment(25.0, 900.0, 60);
        let raised = AlertManager::evaluate(&mut eq, now());
        assert_eq!(raised.len(), 1);
        assert_eq!(raised[0].kind, AlertKind::CriticalHealth);
        assert_eq!(raised[0].severity, Severity::Critical);
        assert!(raised[0].message.contains("25.0%"));

        let again = AlertManager::evaluate(&mut eq, now() + Duration::minutes(5));
        assert!(again.is_empty());
        assert_eq!(eq.alerts().len(), 1);
    }

    #[test]
    fn rules_are_independent_and_ordered() {
        let mut eq = equipment(10.0, 20.0, 2);
        let raised = AlertManager::evaluate(&mut eq, now());
        let kinds: Vec<AlertKind> = raised.iter().map(|a| a.kind).collect();
        assert_eq!(
            kinds,
            vec![
                AlertKind::CriticalHealth,
                AlertKind::LowRul,
                AlertKind::MaintenanceDue
            ]
        );
        assert_eq!(raised[2].severity, Severity::Warning);
    }

    #[test]
    fn overdue_maintenance_still_fires() {
        let fired = AlertManager::fired_rules(90.0, 900.0, now() - Duration::days(3), now());
        assert_eq!(fired, vec![AlertKind::MaintenanceDue]);
    }

    #[test]
    fn expired_alert_is_pruned_and_refires() {
        let mut eq = equipment(25.0, 900.0, 60);
        AlertManager::evaluate(&mut eq, now());
        let later = now() + Duration::hours(DEDUP_WINDOW_HOURS) + Duration::seconds(1);
        let raised = AlertManager::evaluate(&mut eq, later);
        assert_eq!(raised.len(), 1);
        assert_eq!(eq.alerts().len(), 1);
        assert_eq!(eq.alerts()[0].timestamp, later);
    }

    #[test]
    fn recovered_condition_leaves_alert_until_expiry() {
        let mut eq = equipment(25.0, 900.0, 60);
        AlertManager::evaluate(&mut eq, now());
        eq.health = 95.0;
        AlertManager::evaluate(&mut eq, now() + Duration::hours(1));
        assert_eq!(eq.alerts().len(), 1);
        AlertManager::evaluate(&mut eq, now() + Duration::hours(25));
        assert!(eq.alerts().is_empty());
    }

    #[test]
    fn alert_serializes_with_type_field() {
        let alert = Alert {
            kind: AlertKind::LowRul,
            message: "m".into(),
            severity: Severity::Critical,
            timestamp: now(),
        };
        let value = serde_json::to_value(&alert).unwrap();
        assert_eq!(value["type"], "low_rul");
        assert_eq!(value["severity"], "critical");
    }
}
