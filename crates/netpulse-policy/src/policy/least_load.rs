//! Least-load policy — spread work evenly, deterministically.
//!
//! Priorities: fewest bound tasks, then largest remaining capacity,
//! then smallest hostname. The final hostname tie-break makes the
//! policy a pure function of the view.

use std::collections::BTreeMap;

use crate::error::SelectError;
use crate::view::NodeSnapshot;

use super::batch_capacity_check;

/// Pick the least-loaded eligible node.
pub fn choose<'a>(eligible: &[&'a NodeSnapshot]) -> Result<&'a NodeSnapshot, SelectError> {
    eligible
        .iter()
        .min_by(|a, b| {
            a.load
                .cmp(&b.load)
                .then(b.remaining().cmp(&a.remaining()))
                .then(a.hostname.cmp(&b.hostname))
        })
        .copied()
        .ok_or(SelectError::Capacity)
}

/// Fill load levels from least to most loaded.
///
/// Nodes are grouped by current load; within a level, larger remaining
/// capacity goes first and hostname breaks ties. Each node absorbs as
/// many tasks as it has free slots before the next is touched.
pub fn choose_batch<'a>(
    eligible: &[&'a NodeSnapshot],
    task_count: usize,
) -> Result<Vec<&'a NodeSnapshot>, SelectError> {
    if task_count == 0 {
        return Ok(Vec::new());
    }
    batch_capacity_check(eligible, task_count)?;

    let mut levels: BTreeMap<u32, Vec<&NodeSnapshot>> = BTreeMap::new();
    for node in eligible {
        levels.entry(node.load).or_default().push(node);
    }

    let mut result = Vec::with_capacity(task_count);
    for nodes in levels.values_mut() {
        if result.len() == task_count {
            break;
        }
        nodes.sort_by(|a, b| {
            b.remaining()
                .cmp(&a.remaining())
                .then(a.hostname.cmp(&b.hostname))
        });
        for node in nodes.iter() {
            if result.len() == task_count {
                break;
            }
            let take = (task_count - result.len()).min(node.remaining() as usize);
            result.extend(std::iter::repeat_n(*node, take));
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::test_support::node;

    #[test]
    fn prefers_emptier_node() {
        let a = node("a", 4, 3);
        let b = node("b", 4, 1);

        assert_eq!(choose(&[&a, &b]).unwrap().hostname, "b");
    }

    #[test]
    fn load_tie_breaks_toward_larger_remaining() {
        let a = node("z", 4, 2); // remaining 2.
        let b = node("y", 8, 2); // remaining 6.

        assert_eq!(choose(&[&a, &b]).unwrap().hostname, "y");
    }

    #[test]
    fn full_tie_breaks_by_hostname() {
        let a = node("b", 4, 2);
        let b = node("a", 4, 2);

        assert_eq!(choose(&[&a, &b]).unwrap().hostname, "a");
    }

    #[test]
    fn is_a_pure_function_of_the_view() {
        let a = node("a", 4, 1);
        let b = node("b", 6, 1);
        let c = node("c", 6, 0);
        let eligible = vec![&a, &b, &c];

        let first = choose(&eligible).unwrap();
        for _ in 0..10 {
            assert_eq!(choose(&eligible).unwrap().id, first.id);
        }
    }

    #[test]
    fn empty_set_is_a_capacity_error() {
        assert_eq!(choose(&[]).unwrap_err(), SelectError::Capacity);
    }

    #[test]
    fn batch_fills_lowest_level_first() {
        let a = node("a", 4, 2); // Level 2.
        let b = node("b", 4, 0); // Level 0, 4 free.
        let eligible = vec![&a, &b];

        let picks = choose_batch(&eligible, 5).unwrap();

        assert_eq!(picks.iter().filter(|n| n.hostname == "b").count(), 4);
        assert_eq!(picks.iter().filter(|n| n.hostname == "a").count(), 1);
    }

    #[test]
    fn batch_level_orders_by_remaining_then_hostname() {
        let a = node("a", 4, 1); // remaining 3.
        let b = node("b", 8, 1); // remaining 7 — first in level.
        let eligible = vec![&a, &b];

        let picks = choose_batch(&eligible, 8).unwrap();

        assert_eq!(picks.iter().filter(|n| n.hostname == "b").count(), 7);
        assert_eq!(picks.iter().filter(|n| n.hostname == "a").count(), 1);
        assert_eq!(picks[0].hostname, "b");
    }

    #[test]
    fn batch_over_capacity_fails_up_front() {
        let a = node("a", 1, 0);
        let b = node("b", 1, 0);

        assert_eq!(
            choose_batch(&[&a, &b], 3).unwrap_err(),
            SelectError::Capacity
        );
    }
}
