//! Largest-remainder apportionment
//!
//! Turns real-valued shares into whole item counts whose sum is exactly the
//! number of items, with each count within one of its exact quota.

use crate::utils::MINUTE_EPSILON;

/// Capacity weights for a variant: each worker's remaining minutes, clamped
/// at zero. When nobody has time left, full capacity is used instead so the
/// items still land somewhere for the repair pass to fix.
pub fn capacity_weights(capacities: &[f64], loads: &[f64]) -> Vec<f64> {
    let remaining: Vec<f64> = capacities
        .iter()
        .zip(loads)
        .map(|(capacity, load)| (capacity - load).max(0.0))
        .collect();
    if remaining.iter().sum::<f64>() > MINUTE_EPSILON {
        remaining
    } else {
        capacities.to_vec()
    }
}

/// Split `seats` whole units across `weights`.
///
/// Each entry first receives `floor(quota)`; leftover units go one at a time
/// in descending fractional remainder, ties to the lower index. Callers pass
/// weights in ascending worker-id order so index ties are id ties.
/// Zero weights never receive a unit.
pub fn apportion(weights: &[f64], seats: usize) -> Vec<usize> {
    let mut counts = vec![0usize; weights.len()];
    let total: f64 = weights.iter().filter(|w| **w > 0.0).sum();
    if seats == 0 || total <= 0.0 {
        return counts;
    }

    let quotas: Vec<f64> = weights
        .iter()
        .map(|w| if *w > 0.0 { w / total * seats as f64 } else { 0.0 })
        .collect();
    let remainders: Vec<f64> = quotas.iter().map(|q| q - q.floor()).collect();

    for (count, quota) in counts.iter_mut().zip(&quotas) {
        *count = quota.floor() as usize;
    }

    // Candidates for leftover units, best remainder first
    let mut order: Vec<usize> = (0..weights.len()).filter(|&i| weights[i] > 0.0).collect();
    order.sort_by(|&a, &b| remainders[b].total_cmp(&remainders[a]).then(a.cmp(&b)));

    // Float noise can push the floors one past the seat count
    let mut assigned: usize = counts.iter().sum();
    while assigned > seats {
        if let Some(&idx) = order.iter().rev().find(|&&i| counts[i] > 0) {
            counts[idx] -= 1;
            assigned -= 1;
        } else {
            break;
        }
    }

    for &idx in order.iter().cycle().take(seats - assigned) {
        counts[idx] += 1;
    }

    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_split() {
        assert_eq!(apportion(&[600.0, 300.0], 30), vec![20, 10]);
    }

    #[test]
    fn test_leftovers_follow_remainder() {
        // quotas 4.375, 1.75, 0.875 -> floors 4, 1, 0 with two leftovers
        assert_eq!(apportion(&[5.0, 2.0, 1.0], 7), vec![4, 2, 1]);
        // quotas 3.75, 1.5, 0.75 -> the two .75 remainders win, lower index first
        assert_eq!(apportion(&[5.0, 2.0, 1.0], 6), vec![4, 1, 1]);
    }

    #[test]
    fn test_ties_go_to_lower_index() {
        assert_eq!(apportion(&[1.0, 1.0], 3), vec![2, 1]);
        assert_eq!(apportion(&[1.0, 1.0, 1.0], 4), vec![2, 1, 1]);
    }

    #[test]
    fn test_zero_weights_get_nothing() {
        assert_eq!(apportion(&[0.0, 5.0, 0.0], 7), vec![0, 7, 0]);
        assert_eq!(apportion(&[0.0, 0.0], 3), vec![0, 0]);
        assert_eq!(apportion(&[1.0, 2.0], 0), vec![0, 0]);
    }

    #[test]
    fn test_capacity_weights() {
        assert_eq!(capacity_weights(&[600.0, 300.0], &[100.0, 400.0]), vec![500.0, 0.0]);
        // Everyone saturated: fall back to full capacity
        assert_eq!(capacity_weights(&[600.0, 300.0], &[600.0, 300.0]), vec![600.0, 300.0]);
    }

    #[test]
    fn test_sum_is_exact() {
        let weights = [0.1, 0.2, 0.3, 0.15, 0.25];
        for seats in 0..200 {
            let counts = apportion(&weights, seats);
            assert_eq!(counts.iter().sum::<usize>(), seats);
            let total: f64 = weights.iter().sum();
            for (count, weight) in counts.iter().zip(weights) {
                let quota = weight / total * seats as f64;
                assert!((*count as f64 - quota).abs() < 1.0 + 1e-9);
            }
        }
    }
}
