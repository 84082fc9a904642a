//! Domain types for the NetPulse state store.
//!
//! These types represent the persisted state of the worker fleet and
//! of task assignments. All types are serializable to/from JSON for
//! storage in redb tables.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Unique identifier for a worker node in the fleet.
pub type NodeId = String;

/// Unique identifier for a task.
pub type TaskId = String;

// ── Worker node ───────────────────────────────────────────────────

/// Persisted record of a worker node.
///
/// `load` counts tasks currently assigned (queued or running) on the
/// node and never exceeds `capacity`. Liveness is not stored: it is
/// derived from `last_heartbeat` age at snapshot time, so a node that
/// died without deregistering fades out of scheduling on its own.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkerNode {
    pub id: NodeId,
    /// Printable hostname; deterministic tie-break key for policies.
    pub hostname: String,
    /// Maximum number of concurrently-assigned tasks.
    pub capacity: u32,
    /// Number of tasks currently assigned.
    pub load: u32,
    /// Capability tags advertised by the node's drivers.
    pub capabilities: BTreeSet<String>,
    /// Unix timestamp (seconds) of the last heartbeat.
    pub last_heartbeat: u64,
}

impl WorkerNode {
    /// Free slot count.
    pub fn remaining(&self) -> u32 {
        self.capacity.saturating_sub(self.load)
    }
}

// ── Assignment ────────────────────────────────────────────────────

/// A published task → node binding.
///
/// Keyed by `task_id`, which makes publication idempotent: the first
/// binding for a task wins and re-publication is a no-op.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Assignment {
    pub task_id: TaskId,
    pub node_id: NodeId,
    /// Unix timestamp (seconds) when the binding was published.
    pub assigned_at: u64,
}
