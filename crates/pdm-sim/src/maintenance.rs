//! ---
//! pdm_section: "11-simulation"
//! pdm_subsection: "module"
//! pdm_type: "source"
//! pdm_scope: "code"
//! pdm_description: "Rule-based maintenance task planning per equipment category."
//! pdm_version: "v0.1.0"
//! pdm_owner: "tbd"
//! ---
use chrono::{DateTime, Utc};
use pdm_common::EquipmentCategory;
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::equipment::Equipment;

/// Wear-critical tasks are escalated below this many remaining cycles.
pub const URGENT_RUL_THRESHOLD: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TaskPriority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceTask {
    pub task: String,
    pub priority: TaskPriority,
    pub estimated_duration: String,
    pub required_tools: Vec<String>,
    pub description: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityDistribution {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenancePlan {
    pub equipment_id: String,
    pub maintenance_tasks: Vec<MaintenanceTask>,
    pub total_tasks: usize,
    pub priority_distribution: PriorityDistribution,
    pub generated_at: DateTime<Utc>,
}

impl MaintenancePlan {
    pub fn for_equipment(equipment: &Equipment, generated_at: DateTime<Utc>) -> Self {
        Self::new(
            equipment.id(),
            plan_tasks(equipment.category(), equipment.rul()),
            generated_at,
        )
    }

    pub fn new(
        equipment_id: impl Into<String>,
        tasks: Vec<MaintenanceTask>,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let mut distribution = PriorityDistribution::default();
        for task in &tasks {
            match task.priority {
                TaskPriority::High => distribution.high += 1,
                TaskPriority::Medium => distribution.medium += 1,
                TaskPriority::Low => distribution.low += 1,
            }
        }
        Self {
            equipment_id: equipment_id.into(),
            total_tasks: tasks.len(),
            maintenance_tasks: tasks,
            priority_distribution: distribution,
            generated_at,
        }
    }
}

struct TaskTemplate {
    task: &'static str,
    priority: TaskPriority,
    escalate_on_low_rul: bool,
    duration: &'static str,
    tools: &'static [&'static str],
    description: &'static str,
}

const OVEN_TASKS: &[TaskTemplate] = &[
    TaskTemplate {
        task: "Check heating elements for wear",
        priority: TaskPriority::Medium,
        escalate_on_low_rul: true,
        duration: "2 hours",
        tools: &["Multimeter", "Thermal camera", "Cleaning supplies"],
        description: "Inspect heating elements for signs of degradation and clean any buildup",
    },
    TaskTemplate {
        task: "Calibrate temperature sensors",
        priority: TaskPriority::Medium,
        escalate_on_low_rul: false,
        duration: "1 hour",
        tools: &["Calibration kit", "Reference thermometer"],
        description: "Verify temperature sensor accuracy and recalibrate if necessary",
    },
];

const MIXER_TASKS: &[TaskTemplate] = &[
    TaskTemplate {
        task: "Inspect motor bearings",
        priority: TaskPriority::Medium,
        escalate_on_low_rul: true,
        duration: "3 hours",
        tools: &["Bearing puller", "Grease gun", "Vibration meter"],
        description: "Check bearing condition and replace if showing signs of wear",
    },
    TaskTemplate {
        task: "Lubricate moving parts",
        priority: TaskPriority::Medium,
        escalate_on_low_rul: false,
        duration: "1 hour",
        tools: &["Food-grade lubricant", "Cleaning cloth"],
        description: "Apply appropriate lubrication to all moving components",
    },
];

const CONVEYOR_TASKS: &[TaskTemplate] = &[
    TaskTemplate {
        task: "Check belt tension and alignment",
        priority: TaskPriority::Medium,
        escalate_on_low_rul: false,
        duration: "2 hours",
        tools: &["Tension gauge", "Straight edge", "Wrenches"],
        description: "Adjust belt tension and ensure proper alignment for smooth operation",
    },
    TaskTemplate {
        task: "Inspect drive motor and gearbox",
        priority: TaskPriority::Medium,
        escalate_on_low_rul: false,
        duration: "2 hours",
        tools: &["Multimeter", "Gear oil", "Cleaning supplies"],
        description: "Check motor performance and gearbox oil level",
    },
];

const GENERAL_TASKS: &[TaskTemplate] = &[
    TaskTemplate {
        task: "Clean equipment thoroughly",
        priority: TaskPriority::Medium,
        escalate_on_low_rul: false,
        duration: "1 hour",
        tools: &["Cleaning supplies", "Sanitizer", "Safety equipment"],
        description: "Perform thorough cleaning following food safety protocols",
    },
    TaskTemplate {
        task: "Update maintenance log",
        priority: TaskPriority::Low,
        escalate_on_low_rul: false,
        duration: "15 minutes",
        tools: &["Maintenance log", "Computer/tablet"],
        description: "Document all maintenance activities and update digital records",
    },
];

fn category_tasks(category: EquipmentCategory) -> &'static [TaskTemplate] {
    match category {
        EquipmentCategory::Oven => OVEN_TASKS,
        EquipmentCategory::Mixer => MIXER_TASKS,
        EquipmentCategory::Conveyor => CONVEYOR_TASKS,
        EquipmentCategory::Dispenser | EquipmentCategory::Generic => &[],
    }
}

/// Category-specific tasks followed by the general housekeeping tasks.
pub fn plan_tasks(category: EquipmentCategory, rul: f64) -> Vec<MaintenanceTask> {
    category_tasks(category)
        .iter()
        .chain(GENERAL_TASKS)
        .map(|template| MaintenanceTask {
            task: template.task.to_owned(),
            priority: if template.escalate_on_low_rul && rul < URGENT_RUL_THRESHOLD {
                TaskPriority::High
            } else {
                template.priority
            },
            estimated_duration: template.duration.to_owned(),
            required_tools: template.tools.iter().map(|t| (*t).to_owned()).collect(),
            description: template.description.to_owned(),
        })
        .collect()
}
