//! Post-condition checks on a finished plan
//!
//! Everything here is recomputed from the plan and the raw inputs. Nothing is
//! taken from the allocator's working state, so a bug there shows up as an
//! `InvariantViolation` instead of a bad plan on disk.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::apportion::capacity_weights;
use super::error::{AllocationError, Invariant};
use super::types::AllocationPlan;
use crate::model::{TimeModel, Variant, WorkBatch, WorkerRegistry};
use crate::utils::MINUTE_EPSILON;

/// Check coverage, capacity, routing and fairness of `plan` against the inputs
pub fn validate_plan(
    plan: &AllocationPlan,
    time_model: &TimeModel,
    registry: &WorkerRegistry,
    batch: &WorkBatch,
) -> Result<(), AllocationError> {
    let mut efforts: HashMap<&str, (Variant, f64)> = HashMap::with_capacity(batch.len());
    for item in batch.items() {
        let minutes = time_model
            .effort_minutes(item.item_type, item.extended)
            .map_err(|_| AllocationError::UnknownItemType {
                item_id: Some(item.id.clone()),
                variant: item.variant(),
            })?;
        efforts.insert(item.id.as_str(), (item.variant(), minutes));
    }

    check_coverage(plan, registry, batch, &efforts)?;
    check_routing(plan, registry, &efforts)?;
    check_capacity(plan, registry, &efforts)?;
    check_fairness(plan, registry, &efforts)
}

fn check_coverage(
    plan: &AllocationPlan,
    registry: &WorkerRegistry,
    batch: &WorkBatch,
    efforts: &HashMap<&str, (Variant, f64)>,
) -> Result<(), AllocationError> {
    let mut seen: HashMap<&str, usize> = HashMap::with_capacity(batch.len());

    for (worker_id, assignment) in &plan.assignments {
        if registry.get(worker_id).is_none() {
            return Err(AllocationError::violation(
                Invariant::Coverage,
                format!("plan assigns work to unknown worker {}", worker_id),
            ));
        }
        for item in &assignment.items {
            if !efforts.contains_key(item.as_str()) {
                return Err(AllocationError::violation(
                    Invariant::Coverage,
                    format!("worker {} holds item {} which is not in the batch", worker_id, item),
                ));
            }
            *seen.entry(item.as_str()).or_insert(0) += 1;
        }
    }

    for item in batch.items() {
        match seen.get(item.id.as_str()).copied().unwrap_or(0) {
            1 => {}
            0 => {
                return Err(AllocationError::violation(
                    Invariant::Coverage,
                    format!("item {} is not assigned", item.id),
                ))
            }
            n => {
                return Err(AllocationError::violation(
                    Invariant::Coverage,
                    format!("item {} is assigned {} times", item.id, n),
                ))
            }
        }
    }
    Ok(())
}

fn check_routing(
    plan: &AllocationPlan,
    registry: &WorkerRegistry,
    efforts: &HashMap<&str, (Variant, f64)>,
) -> Result<(), AllocationError> {
    for (worker_id, assignment) in &plan.assignments {
        let Some(worker) = registry.get(worker_id) else {
            continue;
        };
        for item in &assignment.items {
            let Some((variant, _)) = efforts.get(item.as_str()) else {
                continue;
            };
            if !worker.can_take(variant.item_type) {
                return Err(AllocationError::violation(
                    Invariant::Routing,
                    format!(
                        "item {} of type {} assigned to {} who lacks that skill",
                        item, variant.item_type, worker_id
                    ),
                ));
            }
        }
    }
    Ok(())
}

fn check_capacity(
    plan: &AllocationPlan,
    registry: &WorkerRegistry,
    efforts: &HashMap<&str, (Variant, f64)>,
) -> Result<(), AllocationError> {
    for (worker_id, assignment) in &plan.assignments {
        let Some(worker) = registry.get(worker_id) else {
            continue;
        };
        let minutes: f64 = assignment
            .items
            .iter()
            .filter_map(|item| efforts.get(item.as_str()))
            .map(|(_, m)| m)
            .sum();

        if (minutes - assignment.assigned_minutes).abs() > MINUTE_EPSILON {
            return Err(AllocationError::violation(
                Invariant::Capacity,
                format!(
                    "worker {} records {} minutes but holds {} minutes of work",
                    worker_id, assignment.assigned_minutes, minutes
                ),
            ));
        }
        if minutes > worker.capacity_minutes() + MINUTE_EPSILON {
            return Err(AllocationError::violation(
                Invariant::Capacity,
                format!(
                    "worker {} holds {} minutes against {} available",
                    worker_id,
                    minutes,
                    worker.capacity_minutes()
                ),
            ));
        }
    }
    Ok(())
}

/// Undo recorded repair moves, then check every variant's split against the
/// largest-remainder bound using remaining-capacity weights.
fn check_fairness(
    plan: &AllocationPlan,
    registry: &WorkerRegistry,
    efforts: &HashMap<&str, (Variant, f64)>,
) -> Result<(), AllocationError> {
    let mut provisional: BTreeMap<&str, Vec<&str>> = plan
        .assignments
        .iter()
        .map(|(id, a)| (id.as_str(), a.items.iter().map(String::as_str).collect()))
        .collect();

    for repair in plan.repairs.iter().rev() {
        let holder = provisional.get_mut(repair.to.as_str());
        let Some(position) = holder
            .as_ref()
            .and_then(|items| items.iter().position(|i| *i == repair.item))
        else {
            return Err(AllocationError::violation(
                Invariant::Fairness,
                format!(
                    "repair log moves {} to {} but it is not held there",
                    repair.item, repair.to
                ),
            ));
        };
        if let Some(items) = holder {
            items.remove(position);
        }
        provisional
            .entry(repair.from.as_str())
            .or_default()
            .push(repair.item.as_str());
    }

    let workers = registry.workers();
    let mut loads = vec![0.0; workers.len()];
    let variants: BTreeSet<Variant> = efforts.values().map(|(v, _)| *v).collect();

    for variant in variants {
        let (total, effort) = efforts
            .values()
            .filter(|(v, _)| *v == variant)
            .fold((0.0, 0.0), |(total, _), (_, m)| (total + m, *m));

        let per_worker: Vec<f64> = workers
            .iter()
            .map(|w| {
                provisional
                    .get(w.id.as_str())
                    .map(|items| {
                        items
                            .iter()
                            .filter_map(|i| efforts.get(i))
                            .filter(|(v, _)| *v == variant)
                            .map(|(_, m)| m)
                            .sum()
                    })
                    .unwrap_or(0.0)
            })
            .collect();

        let candidates: Vec<usize> = (0..workers.len())
            .filter(|&w| workers[w].can_take(variant.item_type) && workers[w].capacity_minutes() > 0.0)
            .collect();
        let capacities: Vec<f64> = candidates.iter().map(|&w| workers[w].capacity_minutes()).collect();
        let candidate_loads: Vec<f64> = candidates.iter().map(|&w| loads[w]).collect();
        let weights = capacity_weights(&capacities, &candidate_loads);
        let weight_total: f64 = weights.iter().sum();

        if weight_total > 0.0 {
            for (&w, weight) in candidates.iter().zip(&weights) {
                let ideal = weight / weight_total * total;
                let actual = per_worker[w];
                if (actual - ideal).abs() > effort + MINUTE_EPSILON {
                    return Err(AllocationError::violation(
                        Invariant::Fairness,
                        format!(
                            "worker {} has {:.1} minutes of {} against an ideal share of {:.1}",
                            workers[w].id, actual, variant, ideal
                        ),
                    ));
                }
            }
        }

        for (load, minutes) in loads.iter_mut().zip(&per_worker) {
            *load += minutes;
        }
    }
    Ok(())
}
