//! Load-weighted-random policy — bias strongly toward empty nodes.
//!
//! Each eligible node gets weight `remaining² · (1 + ε·h(hostname))`,
//! where `h` maps the hostname onto `[0, 1)` (see [`crate::weight`])
//! and `ε` is the configured perturbation strength. Squaring
//! `remaining` favors emptier nodes without forbidding loaded ones;
//! the perturbation keeps nodes with identical remaining capacity
//! from carrying identical weights across independent scheduler
//! processes.

use rand::Rng;

use crate::error::SelectError;
use crate::view::NodeSnapshot;
use crate::weight::{hostname_unit, weighted_pick};

use super::batch_capacity_check;

/// Pick a node with probability proportional to its perturbed weight.
pub fn choose<'a, R: Rng>(
    eligible: &[&'a NodeSnapshot],
    epsilon: f64,
    rng: &mut R,
) -> Result<&'a NodeSnapshot, SelectError> {
    let weights: Vec<f64> = eligible
        .iter()
        .map(|n| {
            let base = f64::from(n.remaining());
            base * base * (1.0 + epsilon * hostname_unit(&n.hostname))
        })
        .collect();

    let idx = weighted_pick(&weights, rng).ok_or(SelectError::Capacity)?;
    Ok(eligible[idx])
}

/// Draw a batch sequentially with live remaining tracking.
///
/// Weights are recomputed per draw as `(remaining + 1)²` under
/// multiplicative noise in `[0.95, 1.05)`; the noise decorrelates
/// concurrent batch schedulers the same way the hostname term does
/// for single picks, while the live `remaining` already separates
/// nodes within one batch.
pub fn choose_batch<'a, R: Rng>(
    eligible: &[&'a NodeSnapshot],
    task_count: usize,
    rng: &mut R,
) -> Result<Vec<&'a NodeSnapshot>, SelectError> {
    if task_count == 0 {
        return Ok(Vec::new());
    }
    batch_capacity_check(eligible, task_count)?;

    let mut remaining: Vec<u32> = eligible.iter().map(|n| n.remaining()).collect();
    let mut result = Vec::with_capacity(task_count);

    for _ in 0..task_count {
        let candidates: Vec<usize> = remaining
            .iter()
            .enumerate()
            .filter(|(_, rem)| **rem > 0)
            .map(|(idx, _)| idx)
            .collect();
        if candidates.is_empty() {
            return Err(SelectError::Capacity);
        }

        let weights: Vec<f64> = candidates
            .iter()
            .map(|&idx| {
                let base = f64::from(remaining[idx] + 1);
                base * base * rng.random_range(0.95..1.05)
            })
            .collect();

        let picked = weighted_pick(&weights, rng).ok_or(SelectError::Capacity)?;
        let idx = candidates[picked];
        remaining[idx] -= 1;
        result.push(eligible[idx]);
    }

    Ok(result)
}
