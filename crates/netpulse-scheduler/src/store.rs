//! Store and queue trait seams, plus the embedded-store adapter.
//!
//! The scheduler only ever talks to the cluster through these two
//! traits. Production deployments back them with the shared store the
//! worker fleet heartbeats into; tests back them with counting mocks
//! to pin down the binder's retry accounting.

use async_trait::async_trait;

use netpulse_state::{IncrementOutcome, StateStore, WorkerNode};

use crate::error::StoreError;

/// Read and mutate the worker fleet.
///
/// `list_nodes` and `try_increment_load` are the scheduler's only two
/// blocking points; both must be safe to call from many concurrent
/// scheduling attempts.
#[async_trait]
pub trait ClusterStore: Send + Sync {
    /// Atomic snapshot of all known nodes. Per-node records must be
    /// internally consistent; cross-node staleness is tolerated.
    async fn list_nodes(&self) -> Result<Vec<WorkerNode>, StoreError>;

    /// Atomic "increment load iff `load < capacity`".
    async fn try_increment_load(&self, node_id: &str) -> Result<IncrementOutcome, StoreError>;

    /// Decrement load after a task finishes on a node.
    async fn release_load(&self, node_id: &str) -> Result<bool, StoreError>;
}

/// Publish task → node bindings for workers to pick up.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Publish a binding; idempotent with respect to `task_id`.
    async fn publish(&self, task_id: &str, node_id: &str) -> Result<(), StoreError>;

    /// Look up the node a task was bound to, if any.
    async fn lookup(&self, task_id: &str) -> Result<Option<String>, StoreError>;

    /// Drop a task's binding once the task is done.
    async fn retire(&self, task_id: &str) -> Result<bool, StoreError>;
}

// ── Embedded-store adapter ─────────────────────────────────────────

#[async_trait]
impl ClusterStore for StateStore {
    async fn list_nodes(&self) -> Result<Vec<WorkerNode>, StoreError> {
        StateStore::list_nodes(self).map_err(|e| StoreError(e.to_string()))
    }

    async fn try_increment_load(&self, node_id: &str) -> Result<IncrementOutcome, StoreError> {
        StateStore::try_increment_load(self, node_id).map_err(|e| StoreError(e.to_string()))
    }

    async fn release_load(&self, node_id: &str) -> Result<bool, StoreError> {
        StateStore::release_load(self, node_id).map_err(|e| StoreError(e.to_string()))
    }
}

#[async_trait]
impl TaskQueue for StateStore {
    async fn publish(&self, task_id: &str, node_id: &str) -> Result<(), StoreError> {
        self.publish_assignment(task_id, node_id)
            .map_err(|e| StoreError(e.to_string()))
    }

    async fn lookup(&self, task_id: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .get_assignment(task_id)
            .map_err(|e| StoreError(e.to_string()))?
            .map(|a| a.node_id))
    }

    async fn retire(&self, task_id: &str) -> Result<bool, StoreError> {
        self.remove_assignment(task_id)
            .map_err(|e| StoreError(e.to_string()))
    }
}
