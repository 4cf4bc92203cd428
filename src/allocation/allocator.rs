//! Proportional allocation of work items to workers
//!
//! Items are grouped by variant and each variant is split across its
//! qualified workers in proportion to their remaining minutes, using
//! largest-remainder rounding. A bounded repair pass then fixes any
//! capacity overrun left by rounding.

use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use super::apportion::{apportion, capacity_weights};
use super::error::AllocationError;
use super::repair::repair;
use super::types::{fingerprint, AllocationPlan, PlanTotals, RepairMove, WorkerAssignment};
use super::validator::validate_plan;
use crate::model::{ItemType, TimeModel, Variant, WorkBatch, Worker, WorkerRegistry};
use crate::utils::MINUTE_EPSILON;

/// Work item with its effort resolved against the time model
#[derive(Debug, Clone)]
pub(super) struct ResolvedItem<'b> {
    pub id: &'b str,
    pub variant: Variant,
    pub minutes: f64,
}

/// Running load for one worker, indexed like `WorkerRegistry::workers`
#[derive(Debug, Clone)]
pub(super) struct Slot {
    pub capacity: f64,
    pub load: f64,
    /// Indices into the resolved item list
    pub items: Vec<usize>,
}

#[derive(Debug, Clone)]
pub(super) struct Ledger {
    pub slots: Vec<Slot>,
}

impl Ledger {
    fn new(registry: &WorkerRegistry) -> Self {
        let slots = registry
            .workers()
            .iter()
            .map(|w| Slot {
                capacity: w.capacity_minutes(),
                load: 0.0,
                items: Vec::new(),
            })
            .collect();
        Self { slots }
    }

    fn assign(&mut self, worker: usize, item: usize, minutes: f64) {
        let slot = &mut self.slots[worker];
        slot.items.push(item);
        slot.load += minutes;
    }

    pub fn move_item(&mut self, from: usize, to: usize, item: usize, minutes: f64) {
        let source = &mut self.slots[from];
        source.items.retain(|&i| i != item);
        source.load -= minutes;
        self.assign(to, item, minutes);
    }

    pub fn slack(&self, worker: usize) -> f64 {
        self.slots[worker].capacity - self.slots[worker].load
    }

    pub fn excess(&self, worker: usize) -> f64 {
        self.slots[worker].load - self.slots[worker].capacity
    }

    /// Slot indices over capacity, ascending
    pub fn overloaded(&self) -> Vec<usize> {
        (0..self.slots.len())
            .filter(|&w| self.excess(w) > MINUTE_EPSILON)
            .collect()
    }
}

/// Computes allocation plans for one roster and time model
#[derive(Debug, Clone, Copy)]
pub struct Allocator<'a> {
    time_model: &'a TimeModel,
    registry: &'a WorkerRegistry,
    max_repair_moves: Option<usize>,
}

impl<'a> Allocator<'a> {
    pub fn new(time_model: &'a TimeModel, registry: &'a WorkerRegistry) -> Self {
        Self {
            time_model,
            registry,
            max_repair_moves: None,
        }
    }

    /// Cap the repair pass. Defaults to the batch size.
    pub fn with_max_repair_moves(mut self, moves: usize) -> Self {
        self.max_repair_moves = Some(moves);
        self
    }

    /// Allocate the batch and check the result against every plan invariant
    pub fn allocate(&self, batch: &WorkBatch) -> Result<AllocationPlan, AllocationError> {
        let plan = self.allocate_unchecked(batch)?;
        validate_plan(&plan, self.time_model, self.registry, batch)?;
        Ok(plan)
    }

    /// Allocate without running the plan validator
    pub fn allocate_unchecked(&self, batch: &WorkBatch) -> Result<AllocationPlan, AllocationError> {
        let items = self.resolve(batch)?;
        let types: BTreeSet<ItemType> = items.iter().map(|i| i.variant.item_type).collect();

        self.check_qualified(&items, &types)?;
        self.check_capacity(&items, &types)?;

        let mut ledger = Ledger::new(self.registry);
        let variants: BTreeSet<Variant> = items.iter().map(|i| i.variant).collect();
        for variant in variants {
            self.apportion_variant(variant, &items, &mut ledger)?;
        }

        let max_moves = self.max_repair_moves.unwrap_or(items.len());
        let repairs = repair(&mut ledger, &items, self.registry, max_moves)?;

        Ok(self.build_plan(batch, &items, ledger, repairs))
    }

    /// Resolve efforts in canonical (ascending id) order
    fn resolve<'b>(&self, batch: &'b WorkBatch) -> Result<Vec<ResolvedItem<'b>>, AllocationError> {
        let mut sorted: Vec<_> = batch.items().iter().collect();
        sorted.sort_by(|a, b| a.id.cmp(&b.id));

        sorted
            .into_iter()
            .map(|item| {
                let minutes = self
                    .time_model
                    .effort_minutes(item.item_type, item.extended)
                    .map_err(|_| AllocationError::UnknownItemType {
                        item_id: Some(item.id.clone()),
                        variant: item.variant(),
                    })?;
                Ok(ResolvedItem {
                    id: item.id.as_str(),
                    variant: item.variant(),
                    minutes,
                })
            })
            .collect()
    }

    fn check_qualified(
        &self,
        items: &[ResolvedItem<'_>],
        types: &BTreeSet<ItemType>,
    ) -> Result<(), AllocationError> {
        for &item_type in types {
            if self.registry.qualified_for(item_type).next().is_none() {
                return Err(AllocationError::NoQualifiedWorker {
                    item_type,
                    items: items.iter().filter(|i| i.variant.item_type == item_type).count(),
                });
            }
        }
        Ok(())
    }

    /// Reject batches that cannot fit, overall or for any single type
    fn check_capacity(
        &self,
        items: &[ResolvedItem<'_>],
        types: &BTreeSet<ItemType>,
    ) -> Result<(), AllocationError> {
        let contributing: Vec<&Worker> = self
            .registry
            .workers()
            .iter()
            .filter(|w| types.iter().any(|t| w.can_take(*t)))
            .collect();
        let required: f64 = items.iter().map(|i| i.minutes).sum();
        let capacity: f64 = contributing.iter().map(|w| w.capacity_minutes()).sum();
        if required > capacity + MINUTE_EPSILON {
            return Err(AllocationError::CapacityExceeded {
                shortfall_minutes: required - capacity,
                workers: contributing.iter().map(|w| w.id.clone()).collect(),
                item_type: None,
            });
        }

        for &item_type in types {
            let required: f64 = items
                .iter()
                .filter(|i| i.variant.item_type == item_type)
                .map(|i| i.minutes)
                .sum();
            let qualified: Vec<&Worker> = self.registry.qualified_for(item_type).collect();
            let capacity: f64 = qualified.iter().map(|w| w.capacity_minutes()).sum();
            if required > capacity + MINUTE_EPSILON {
                return Err(AllocationError::CapacityExceeded {
                    shortfall_minutes: required - capacity,
                    workers: qualified.iter().map(|w| w.id.clone()).collect(),
                    item_type: Some(item_type),
                });
            }
        }
        Ok(())
    }

    fn apportion_variant(
        &self,
        variant: Variant,
        items: &[ResolvedItem<'_>],
        ledger: &mut Ledger,
    ) -> Result<(), AllocationError> {
        let members: Vec<usize> = (0..items.len())
            .filter(|&i| items[i].variant == variant)
            .collect();
        let Some(&first) = members.first() else {
            return Ok(());
        };
        let effort = items[first].minutes;

        let workers = self.registry.workers();
        let candidates: Vec<usize> = (0..workers.len())
            .filter(|&w| workers[w].can_take(variant.item_type) && ledger.slots[w].capacity > 0.0)
            .collect();
        if candidates.is_empty() {
            return Err(AllocationError::CapacityExceeded {
                shortfall_minutes: effort * members.len() as f64,
                workers: self
                    .registry
                    .qualified_for(variant.item_type)
                    .map(|w| w.id.clone())
                    .collect(),
                item_type: Some(variant.item_type),
            });
        }

        let capacities: Vec<f64> = candidates.iter().map(|&w| ledger.slots[w].capacity).collect();
        let loads: Vec<f64> = candidates.iter().map(|&w| ledger.slots[w].load).collect();
        let weights = capacity_weights(&capacities, &loads);
        let counts = apportion(&weights, members.len());

        debug!(
            variant = %variant,
            items = members.len(),
            effort,
            ?counts,
            "Apportioned variant"
        );

        let mut pending = members.iter();
        for (&worker, &count) in candidates.iter().zip(&counts) {
            for &item in pending.by_ref().take(count) {
                ledger.assign(worker, item, effort);
            }
        }
        Ok(())
    }

    fn build_plan(
        &self,
        batch: &WorkBatch,
        items: &[ResolvedItem<'_>],
        ledger: Ledger,
        repairs: Vec<RepairMove>,
    ) -> AllocationPlan {
        let mut assignments = BTreeMap::new();

        for (worker, slot) in self.registry.workers().iter().zip(ledger.slots) {
            let mut indices = slot.items;
            // Resolved items are id-sorted, so index order is id order
            indices.sort_unstable();

            let mut assigned_minutes = 0.0;
            let mut type_breakdown = BTreeMap::new();
            for &idx in &indices {
                let item = &items[idx];
                assigned_minutes += item.minutes;
                *type_breakdown.entry(item.variant.label()).or_insert(0.0) += item.minutes;
            }

            let capacity_minutes = worker.capacity_minutes();
            assignments.insert(
                worker.id.clone(),
                WorkerAssignment {
                    name: worker.name.clone(),
                    items: indices.iter().map(|&i| items[i].id.to_string()).collect(),
                    assigned_minutes,
                    capacity_minutes,
                    remaining_minutes: capacity_minutes - assigned_minutes,
                    type_breakdown,
                },
            );
        }

        AllocationPlan {
            fingerprint: fingerprint(self.time_model, self.registry, batch),
            assignments,
            repairs,
            totals: PlanTotals {
                item_count: items.len(),
                required_minutes: items.iter().map(|i| i.minutes).sum(),
                capacity_minutes: self.registry.total_capacity_minutes(),
            },
        }
    }
}
