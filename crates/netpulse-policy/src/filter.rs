//! Two-phase eligibility filtering.
//!
//! Phase 1 keeps alive nodes whose capability set covers the task's
//! requirements; phase 2 keeps nodes with a free slot. Both phases are
//! pure, and filter order does not affect the outcome — the split
//! exists so each phase can be asserted on its own.

use std::collections::BTreeSet;

use crate::view::{ClusterView, NodeSnapshot, TaskSpec};

/// Phase 1: alive nodes whose capabilities are a superset of the
/// task's requirements.
pub fn filter_eligible<'a>(view: &'a ClusterView, task: &TaskSpec) -> Vec<&'a NodeSnapshot> {
    filter_capable(view, &task.requirements)
}

/// Phase 1 against a bare requirement set.
///
/// Batch scheduling filters once with the union of all tasks'
/// requirements, so any node in the result can host any task.
pub fn filter_capable<'a>(
    view: &'a ClusterView,
    requirements: &BTreeSet<String>,
) -> Vec<&'a NodeSnapshot> {
    view.nodes
        .iter()
        .filter(|n| n.alive && requirements.is_subset(&n.capabilities))
        .collect()
}

/// Phase 2: nodes with at least one free slot.
pub fn filter_capacity<'a>(nodes: &[&'a NodeSnapshot]) -> Vec<&'a NodeSnapshot> {
    nodes.iter().filter(|n| n.remaining() > 0).copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn make_node(id: &str, capacity: u32, load: u32, alive: bool) -> NodeSnapshot {
        NodeSnapshot {
            id: id.to_string(),
            hostname: format!("host-{id}"),
            capacity,
            load,
            capabilities: BTreeSet::new(),
            alive,
        }
    }

    #[test]
    fn dead_nodes_are_invisible() {
        let view = ClusterView::new(vec![
            make_node("n1", 4, 0, true),
            make_node("n2", 4, 0, false),
        ]);
        let task = TaskSpec::new("t1");

        let eligible = filter_eligible(&view, &task);
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].id, "n1");
    }

    #[test]
    fn requirements_must_be_covered() {
        let mut capable = make_node("n1", 4, 0, true);
        capable.capabilities = ["netmiko".to_string(), "napalm".to_string()]
            .into_iter()
            .collect();
        let view = ClusterView::new(vec![capable, make_node("n2", 4, 0, true)]);

        let task = TaskSpec::with_requirements("t1", ["netmiko"]);
        let eligible = filter_eligible(&view, &task);

        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].id, "n1");
    }

    #[test]
    fn no_requirements_accepts_any_alive_node() {
        let view = ClusterView::new(vec![
            make_node("n1", 4, 0, true),
            make_node("n2", 4, 0, true),
        ]);
        let task = TaskSpec::new("t1");

        assert_eq!(filter_eligible(&view, &task).len(), 2);
    }

    #[test]
    fn capacity_phase_drops_full_nodes() {
        let view = ClusterView::new(vec![
            make_node("n1", 4, 4, true),
            make_node("n2", 4, 3, true),
        ]);
        let task = TaskSpec::new("t1");

        let eligible = filter_eligible(&view, &task);
        let with_room = filter_capacity(&eligible);

        assert_eq!(with_room.len(), 1);
        assert_eq!(with_room[0].id, "n2");
    }

    #[test]
    fn empty_fleet_filters_to_empty() {
        let view = ClusterView::default();
        let task = TaskSpec::new("t1");

        let eligible = filter_eligible(&view, &task);
        assert!(eligible.is_empty());
        assert!(filter_capacity(&eligible).is_empty());
    }

    #[test]
    fn zero_capacity_node_never_has_room() {
        let view = ClusterView::new(vec![make_node("n1", 0, 0, true)]);
        let task = TaskSpec::new("t1");

        let eligible = filter_eligible(&view, &task);
        assert_eq!(eligible.len(), 1);
        assert!(filter_capacity(&eligible).is_empty());
    }
}
