//! ---
//! pdm_section: "11-simulation"
//! pdm_subsection: "module"
//! pdm_type: "source"
//! pdm_scope: "code"
//! pdm_description: "Read-only fleet statistics."
//! pdm_version: "v0.1.0"
//! pdm_owner: "tbd"
//! ---
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::alerts::Severity;
use crate::degradation::Status;
use crate::equipment::Equipment;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetSummary {
    pub total_equipment: usize,
    pub healthy_count: usize,
    pub warning_count: usize,
    pub critical_count: usize,
    pub total_alerts: usize,
    pub critical_alerts: usize,
    pub average_health: f64,
    pub average_rul: f64,
    pub timestamp: DateTime<Utc>,
}

impl FleetSummary {
    pub fn from_equipment<'a, I>(equipment: I, timestamp: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = &'a Equipment>,
    {
        let mut summary = FleetSummary {
            total_equipment: 0,
            healthy_count: 0,
            warning_count: 0,
            critical_count: 0,
            total_alerts: 0,
            critical_alerts: 0,
            average_health: 0.0,
            average_rul: 0.0,
            timestamp,
        };
        let mut health_sum = 0.0;
        let mut rul_sum = 0.0;
        for eq in equipment {
            summary.total_equipment += 1;
            match eq.status() {
                Status::Healthy => summary.healthy_count += 1,
                Status::Warning => summary.warning_count += 1,
                Status::Critical => summary.critical_count += 1,
            }
            summary.total_alerts += eq.alerts().len();
            summary.critical_alerts += eq
                .alerts()
                .iter()
                .filter(|alert| alert.severity == Severity::Critical)
                .count();
            health_sum += eq.health();
            rul_sum += eq.rul();
        }
        if summary.total_equipment > 0 {
            let count = summary.total_equipment as f64;
            summary.average_health = health_sum / count;
            summary.average_rul = rul_sum / count;
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn empty_fleet_reports_zero_averages() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let summary = FleetSummary::from_equipment(std::iter::empty(), at);
        assert_eq!(summary.total_equipment, 0);
        assert_eq!(summary.average_health, 0.0);
        assert_eq!(summary.average_rul, 0.0);
        assert_eq!(summary.total_alerts, 0);
        assert_eq!(summary.timestamp, at);
    }
}
