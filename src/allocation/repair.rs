//! Bounded local repair of capacity overruns
//!
//! Rounding can leave a near-saturated worker slightly over capacity. Each
//! move takes the smallest movable item off the most overloaded worker and
//! gives it to the qualified worker with the most slack, provided it fits.
//! A move never creates a new overload, so total excess strictly shrinks.

use tracing::debug;

use super::allocator::{Ledger, ResolvedItem};
use super::error::AllocationError;
use super::types::RepairMove;
use crate::model::WorkerRegistry;
use crate::utils::MINUTE_EPSILON;

pub(super) fn repair(
    ledger: &mut Ledger,
    items: &[ResolvedItem<'_>],
    registry: &WorkerRegistry,
    max_moves: usize,
) -> Result<Vec<RepairMove>, AllocationError> {
    let workers = registry.workers();
    let mut moves = Vec::new();

    loop {
        let overloaded = ledger.overloaded();
        if overloaded.is_empty() {
            return Ok(moves);
        }
        if moves.len() >= max_moves {
            break;
        }

        // Largest excess, lowest id on ties
        let Some(source) = overloaded
            .iter()
            .copied()
            .max_by(|&a, &b| ledger.excess(a).total_cmp(&ledger.excess(b)).then(b.cmp(&a)))
        else {
            break;
        };

        let Some((item, target)) = find_move(ledger, items, registry, source) else {
            break;
        };

        debug!(
            item = items[item].id,
            from = %workers[source].id,
            to = %workers[target].id,
            excess = ledger.excess(source),
            "Repair move"
        );
        ledger.move_item(source, target, item, items[item].minutes);
        moves.push(RepairMove {
            item: items[item].id.to_string(),
            from: workers[source].id.clone(),
            to: workers[target].id.clone(),
        });
    }

    let overloaded = ledger.overloaded();
    Err(AllocationError::CapacityExceeded {
        shortfall_minutes: overloaded.iter().map(|&w| ledger.excess(w)).sum(),
        workers: overloaded.iter().map(|&w| workers[w].id.clone()).collect(),
        item_type: None,
    })
}

/// Smallest item on `source` that fits whole into another qualified worker
fn find_move(
    ledger: &Ledger,
    items: &[ResolvedItem<'_>],
    registry: &WorkerRegistry,
    source: usize,
) -> Option<(usize, usize)> {
    let workers = registry.workers();
    let mut candidates = ledger.slots[source].items.clone();
    candidates.sort_by(|&a, &b| items[a].minutes.total_cmp(&items[b].minutes).then(a.cmp(&b)));

    for item in candidates {
        let minutes = items[item].minutes;
        let item_type = items[item].variant.item_type;
        let target = (0..workers.len())
            .filter(|&w| {
                w != source
                    && ledger.slots[w].capacity > 0.0
                    && workers[w].can_take(item_type)
                    && ledger.slack(w) + MINUTE_EPSILON >= minutes
            })
            .max_by(|&a, &b| ledger.slack(a).total_cmp(&ledger.slack(b)).then(b.cmp(&a)));
        if let Some(target) = target {
            return Some((item, target));
        }
    }
    None
}
