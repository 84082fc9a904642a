//! Least-load-random policy — balanced placement, randomized pick.
//!
//! Same balance objective as least-load, but the final pick among the
//! best `(load, remaining)` bucket is uniform random. When many
//! schedulers decide simultaneously against nearly-stale views, the
//! randomization keeps them from stampeding the same node.

use rand::seq::IndexedRandom;
use rand::Rng;

use crate::error::SelectError;
use crate::view::NodeSnapshot;

use super::batch_capacity_check;

/// Pick uniformly among the least-loaded, largest-remaining nodes.
pub fn choose<'a, R: Rng>(
    eligible: &[&'a NodeSnapshot],
    rng: &mut R,
) -> Result<&'a NodeSnapshot, SelectError> {
    if eligible.is_empty() {
        return Err(SelectError::Capacity);
    }

    let min_load = eligible.iter().map(|n| n.load).min().unwrap_or(0);
    let at_min_load: Vec<&NodeSnapshot> = eligible
        .iter()
        .filter(|n| n.load == min_load)
        .copied()
        .collect();

    let max_remaining = at_min_load.iter().map(|n| n.remaining()).max().unwrap_or(0);
    let best: Vec<&NodeSnapshot> = at_min_load
        .into_iter()
        .filter(|n| n.remaining() == max_remaining)
        .collect();

    best.choose(rng).copied().ok_or(SelectError::Capacity)
}

/// Assign a batch by repeated best-bucket draws with live tracking.
///
/// Each draw sees the loads produced by the draws before it, so the
/// batch spreads exactly as `task_count` sequential least-load-random
/// decisions would against a store that applied each binding.
pub fn choose_batch<'a, R: Rng>(
    eligible: &[&'a NodeSnapshot],
    task_count: usize,
    rng: &mut R,
) -> Result<Vec<&'a NodeSnapshot>, SelectError> {
    if task_count == 0 {
        return Ok(Vec::new());
    }
    batch_capacity_check(eligible, task_count)?;

    // (node, extra load assigned by this batch).
    let mut tracked: Vec<(&NodeSnapshot, u32)> = eligible.iter().map(|n| (*n, 0)).collect();
    let mut result = Vec::with_capacity(task_count);

    for _ in 0..task_count {
        let open = tracked
            .iter()
            .enumerate()
            .filter(|(_, (n, extra))| n.remaining() > *extra)
            .map(|(idx, (n, extra))| (idx, n.load + extra, n.remaining() - extra))
            .collect::<Vec<_>>();

        let min_load = open
            .iter()
            .map(|(_, load, _)| *load)
            .min()
            .ok_or(SelectError::Capacity)?;
        let max_remaining = open
            .iter()
            .filter(|(_, load, _)| *load == min_load)
            .map(|(_, _, rem)| *rem)
            .max()
            .unwrap_or(0);
        let bucket: Vec<usize> = open
            .iter()
            .filter(|(_, load, rem)| *load == min_load && *rem == max_remaining)
            .map(|(idx, _, _)| *idx)
            .collect();

        let idx = *bucket.choose(rng).ok_or(SelectError::Capacity)?;
        tracked[idx].1 += 1;
        result.push(tracked[idx].0);
    }

    Ok(result)
}
