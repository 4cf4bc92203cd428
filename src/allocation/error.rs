//! Allocation failures

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::model::{ItemType, Variant};

/// Plan invariant checked by the validator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Invariant {
    Coverage,
    Capacity,
    Routing,
    Fairness,
}

impl fmt::Display for Invariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Invariant::Coverage => "coverage",
            Invariant::Capacity => "capacity",
            Invariant::Routing => "routing",
            Invariant::Fairness => "fairness",
        };
        f.write_str(name)
    }
}

/// Errors returned by an allocation run. The first three are input problems;
/// `InvariantViolation` means the allocator produced a bad plan.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AllocationError {
    /// The time model has no entry for an item's variant
    #[error("no time model entry for {variant}{}", item_suffix(.item_id))]
    UnknownItemType {
        item_id: Option<String>,
        variant: Variant,
    },

    /// No worker's skill set covers a type present in the batch
    #[error("no qualified worker for item type {item_type} ({items} items)")]
    NoQualifiedWorker { item_type: ItemType, items: usize },

    /// Required effort cannot fit in the available hours
    #[error(
        "capacity exceeded{}: {shortfall_minutes:.1} additional minutes needed (workers: {})",
        type_suffix(.item_type),
        .workers.join(", ")
    )]
    CapacityExceeded {
        shortfall_minutes: f64,
        workers: Vec<String>,
        item_type: Option<ItemType>,
    },

    /// The produced plan failed an independent post-condition check
    #[error("internal error: plan violates {invariant} invariant: {detail}")]
    InvariantViolation { invariant: Invariant, detail: String },
}

impl AllocationError {
    /// True when the failure points at a bug rather than at the inputs
    pub fn is_defect(&self) -> bool {
        matches!(self, AllocationError::InvariantViolation { .. })
    }

    pub(crate) fn violation(invariant: Invariant, detail: impl Into<String>) -> Self {
        AllocationError::InvariantViolation {
            invariant,
            detail: detail.into(),
        }
    }
}

fn item_suffix(item_id: &Option<String>) -> String {
    item_id
        .as_ref()
        .map(|id| format!(" (item {})", id))
        .unwrap_or_default()
}

fn type_suffix(item_type: &Option<ItemType>) -> String {
    item_type
        .map(|t| format!(" for type {}", t))
        .unwrap_or_default()
}
