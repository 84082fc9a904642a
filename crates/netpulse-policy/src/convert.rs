//! Bridge from persisted state records to selection snapshots.
//!
//! Liveness is derived here, not stored: a node is alive iff its last
//! heartbeat is no older than the configured dead timeout at the
//! moment the view is captured.

use netpulse_state::WorkerNode;

use crate::view::{ClusterView, NodeSnapshot};

/// Convert one persisted [`WorkerNode`] to a [`NodeSnapshot`].
pub fn node_snapshot(node: &WorkerNode, now: u64, dead_timeout_secs: u64) -> NodeSnapshot {
    NodeSnapshot {
        id: node.id.clone(),
        hostname: node.hostname.clone(),
        capacity: node.capacity,
        load: node.load,
        capabilities: node.capabilities.clone(),
        alive: now.saturating_sub(node.last_heartbeat) <= dead_timeout_secs,
    }
}

/// Capture a [`ClusterView`] from a fleet listing.
pub fn cluster_view(nodes: &[WorkerNode], now: u64, dead_timeout_secs: u64) -> ClusterView {
    ClusterView::new(
        nodes
            .iter()
            .map(|n| node_snapshot(n, now, dead_timeout_secs))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn sample_node(last_heartbeat: u64) -> WorkerNode {
        WorkerNode {
            id: "n1".to_string(),
            hostname: "worker-a".to_string(),
            capacity: 8,
            load: 3,
            capabilities: ["netmiko".to_string()].into_iter().collect(),
            last_heartbeat,
        }
    }

    #[test]
    fn converts_fields() {
        let snap = node_snapshot(&sample_node(1000), 1010, 30);

        assert_eq!(snap.id, "n1");
        assert_eq!(snap.hostname, "worker-a");
        assert_eq!(snap.capacity, 8);
        assert_eq!(snap.load, 3);
        assert_eq!(snap.remaining(), 5);
        assert!(snap.capabilities.contains("netmiko"));
    }

    #[test]
    fn fresh_heartbeat_is_alive() {
        let snap = node_snapshot(&sample_node(1000), 1030, 30);
        assert!(snap.alive);
    }

    #[test]
    fn stale_heartbeat_is_dead() {
        let snap = node_snapshot(&sample_node(1000), 1031, 30);
        assert!(!snap.alive);
    }

    #[test]
    fn heartbeat_from_the_future_is_alive() {
        // Clock skew between workers and the store must not kill nodes.
        let snap = node_snapshot(&sample_node(2000), 1000, 30);
        assert!(snap.alive);
    }

    #[test]
    fn view_preserves_fleet_size() {
        let nodes = vec![sample_node(1000), {
            let mut n = sample_node(1000);
            n.id = "n2".to_string();
            n.hostname = "worker-b".to_string();
            n.capabilities = BTreeSet::new();
            n
        }];

        let view = cluster_view(&nodes, 1010, 30);
        assert_eq!(view.nodes.len(), 2);
    }
}
