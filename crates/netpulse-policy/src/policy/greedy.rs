//! Greedy policy — deterministic "first available".
//!
//! Single-node or strongly-affine deployments want the earliest node
//! filled before any other is touched. "Earliest" is the smallest
//! hostname in lexicographic order, which keeps the choice stable no
//! matter how the store happens to order its listing.

use crate::error::SelectError;
use crate::view::NodeSnapshot;

use super::batch_capacity_check;

/// Pick the eligible node with the smallest hostname.
pub fn choose<'a>(eligible: &[&'a NodeSnapshot]) -> Result<&'a NodeSnapshot, SelectError> {
    eligible
        .iter()
        .min_by(|a, b| a.hostname.cmp(&b.hostname))
        .copied()
        .ok_or(SelectError::Capacity)
}

/// Pack a batch onto as few nodes as possible.
///
/// Most-loaded nodes are drained first (then larger remaining, then
/// hostname), so the batch tops off partially-used nodes before
/// opening fresh ones.
pub fn choose_batch<'a>(
    eligible: &[&'a NodeSnapshot],
    task_count: usize,
) -> Result<Vec<&'a NodeSnapshot>, SelectError> {
    if task_count == 0 {
        return Ok(Vec::new());
    }
    batch_capacity_check(eligible, task_count)?;

    let mut ordered: Vec<&NodeSnapshot> = eligible.to_vec();
    ordered.sort_by(|a, b| {
        b.load
            .cmp(&a.load)
            .then(b.remaining().cmp(&a.remaining()))
            .then(a.hostname.cmp(&b.hostname))
    });

    let mut result = Vec::with_capacity(task_count);
    for node in ordered {
        if result.len() == task_count {
            break;
        }
        let take = (task_count - result.len()).min(node.remaining() as usize);
        result.extend(std::iter::repeat_n(node, take));
    }

    Ok(result)
}
