//! Allocation plan artifact

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::model::{TimeModel, WorkBatch, WorkerRegistry};

/// Items and load assigned to one worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerAssignment {
    pub name: String,
    /// Assigned item ids, ascending
    pub items: Vec<String>,
    pub assigned_minutes: f64,
    pub capacity_minutes: f64,
    pub remaining_minutes: f64,
    /// Assigned minutes per variant label
    #[serde(default)]
    pub type_breakdown: BTreeMap<String, f64>,
}

impl WorkerAssignment {
    pub fn hours_committed(&self) -> f64 {
        self.assigned_minutes / 60.0
    }

    pub fn hours_remaining(&self) -> f64 {
        self.remaining_minutes / 60.0
    }
}

/// One item moved by the repair pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairMove {
    pub item: String,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanTotals {
    pub item_count: usize,
    pub required_minutes: f64,
    pub capacity_minutes: f64,
}

/// Worker to items mapping produced by one allocation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationPlan {
    /// Digest of the inputs the plan was computed from
    pub fingerprint: String,
    /// Every registry worker, keyed by id
    pub assignments: BTreeMap<String, WorkerAssignment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub repairs: Vec<RepairMove>,
    pub totals: PlanTotals,
}

impl AllocationPlan {
    /// Worker id holding `item_id`, if any
    pub fn worker_for(&self, item_id: &str) -> Option<&str> {
        self.assignments
            .iter()
            .find(|(_, a)| a.items.iter().any(|i| i == item_id))
            .map(|(id, _)| id.as_str())
    }

    pub fn assigned_item_count(&self) -> usize {
        self.assignments.values().map(|a| a.items.len()).sum()
    }

    pub fn assigned_minutes(&self) -> f64 {
        self.assignments.values().map(|a| a.assigned_minutes).sum()
    }

    /// Short human summary, one line per worker
    pub fn summary(&self) -> String {
        let mut lines = Vec::with_capacity(self.assignments.len() + 1);
        lines.push(format!(
            "{} items, {} of {} committed",
            self.totals.item_count,
            crate::utils::format_minutes(self.totals.required_minutes),
            crate::utils::format_minutes(self.totals.capacity_minutes),
        ));
        for (id, assignment) in &self.assignments {
            lines.push(format!(
                "  {} ({}): {} items, {:.1}h committed, {:.1}h remaining",
                id,
                assignment.name,
                assignment.items.len(),
                assignment.hours_committed(),
                assignment.hours_remaining(),
            ));
        }
        lines.join("\n")
    }
}

/// SHA-256 over a canonical rendering of the three inputs.
///
/// Workers and items are hashed in id order, so permuting either input
/// yields the same fingerprint.
pub fn fingerprint(time_model: &TimeModel, registry: &WorkerRegistry, batch: &WorkBatch) -> String {
    let mut hasher = Sha256::new();

    for (variant, minutes) in time_model.entries() {
        hasher.update(format!("time:{}={}\n", variant.label(), minutes));
    }

    for worker in registry.workers() {
        let skills: Vec<&str> = worker.skills.iter().map(|s| s.as_str()).collect();
        hasher.update(format!(
            "worker:{}:{:?}:{}:{}\n",
            worker.id,
            worker.name,
            worker.available_hours,
            skills.join(",")
        ));
    }

    let mut items: Vec<_> = batch.items().iter().collect();
    items.sort_by(|a, b| a.id.cmp(&b.id));
    for item in items {
        hasher.update(format!("item:{}:{}\n", item.id, item.variant().label()));
    }

    format!("{:x}", hasher.finalize())
}
