//! StateStore — redb-backed fleet state persistence for NetPulse.
//!
//! Provides typed CRUD over worker nodes and task assignments, plus
//! the two primitives the scheduler leans on:
//!
//! - [`StateStore::try_increment_load`] — atomic "increment load iff
//!   `load < capacity`", the sole cross-scheduler synchronization
//!   point for bind races
//! - [`StateStore::publish_assignment`] — idempotent task → node
//!   binding, keyed by task id
//!
//! The store supports both on-disk and in-memory backends (the latter
//! for testing).

use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use redb::{Database, ReadableTable};
use tracing::{debug, warn};

use crate::error::{StateError, StateResult};
use crate::tables::*;
use crate::types::*;

/// Shorthand for folding a backend error into one `StateError` case.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Outcome of the atomic bounded load increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncrementOutcome {
    /// The increment was accepted; the node had a free slot.
    Applied,
    /// The node is already at capacity — the caller lost a bind race.
    AtCapacity,
    /// No node with that id exists (deregistered or reaped).
    NotFound,
}

/// Thread-safe state store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) the registry file at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "node registry ready");
        Ok(store)
    }

    /// Create an ephemeral store with no file behind it (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("ephemeral node registry ready");
        Ok(store)
    }

    /// Touch every table once so later reads never race table creation.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Backend))?;
        // redb creates a table the first time a write transaction opens it.
        txn.open_table(NODES).map_err(map_err!(Backend))?;
        txn.open_table(ASSIGNMENTS).map_err(map_err!(Backend))?;
        txn.commit().map_err(map_err!(Backend))?;
        Ok(())
    }

    // ── Nodes ──────────────────────────────────────────────────────

    /// Register a worker node (insert or replace its record).
    ///
    /// Rejects records that violate the fleet invariants: empty
    /// hostname or `load > capacity`.
    pub fn register_node(&self, node: &WorkerNode) -> StateResult<()> {
        if node.hostname.is_empty() {
            return Err(StateError::InvalidNode(format!(
                "node {} has an empty hostname",
                node.id
            )));
        }
        if node.load > node.capacity {
            return Err(StateError::InvalidNode(format!(
                "node {} has load {} > capacity {}",
                node.id, node.load, node.capacity
            )));
        }

        let value = serde_json::to_vec(node).map_err(map_err!(Codec))?;
        let txn = self.db.begin_write().map_err(map_err!(Backend))?;
        {
            let mut table = txn.open_table(NODES).map_err(map_err!(Backend))?;
            table
                .insert(node.id.as_str(), value.as_slice())
                .map_err(map_err!(Backend))?;
        }
        txn.commit().map_err(map_err!(Backend))?;
        debug!(node_id = %node.id, hostname = %node.hostname, "node registered");
        Ok(())
    }

    /// Get a node by ID.
    pub fn get_node(&self, node_id: &str) -> StateResult<Option<WorkerNode>> {
        let txn = self.db.begin_read().map_err(map_err!(Backend))?;
        let table = txn.open_table(NODES).map_err(map_err!(Backend))?;
        match table.get(node_id).map_err(map_err!(Backend))? {
            Some(guard) => {
                let node: WorkerNode =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Codec))?;
                Ok(Some(node))
            }
            None => Ok(None),
        }
    }

    /// List all nodes.
    ///
    /// The list is read inside a single read transaction, so every
    /// record is internally consistent (no torn `(capacity, load)`
    /// pairs) even while writers run concurrently.
    pub fn list_nodes(&self) -> StateResult<Vec<WorkerNode>> {
        let txn = self.db.begin_read().map_err(map_err!(Backend))?;
        let table = txn.open_table(NODES).map_err(map_err!(Backend))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Backend))? {
            let (_, value) = entry.map_err(map_err!(Backend))?;
            let node: WorkerNode =
                serde_json::from_slice(value.value()).map_err(map_err!(Codec))?;
            results.push(node);
        }
        Ok(results)
    }

    /// Deregister a node. Returns true if it existed.
    pub fn deregister_node(&self, node_id: &str) -> StateResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Backend))?;
        let existed;
        {
            let mut table = txn.open_table(NODES).map_err(map_err!(Backend))?;
            existed = table.remove(node_id).map_err(map_err!(Backend))?.is_some();
        }
        txn.commit().map_err(map_err!(Backend))?;
        Ok(existed)
    }

    /// Atomically increment a node's load iff it has a free slot.
    ///
    /// The read-check-write runs inside one redb write transaction;
    /// write transactions are serialized, so two schedulers racing for
    /// a node's last slot see a total order and exactly one wins.
    pub fn try_increment_load(&self, node_id: &str) -> StateResult<IncrementOutcome> {
        let txn = self.db.begin_write().map_err(map_err!(Backend))?;
        let outcome;
        {
            let mut table = txn.open_table(NODES).map_err(map_err!(Backend))?;
            let current = match table.get(node_id).map_err(map_err!(Backend))? {
                Some(guard) => {
                    let node: WorkerNode =
                        serde_json::from_slice(guard.value()).map_err(map_err!(Codec))?;
                    Some(node)
                }
                None => None,
            };

            match current {
                None => outcome = IncrementOutcome::NotFound,
                Some(node) if node.load >= node.capacity => {
                    outcome = IncrementOutcome::AtCapacity;
                }
                Some(mut node) => {
                    node.load += 1;
                    let value = serde_json::to_vec(&node).map_err(map_err!(Codec))?;
                    table
                        .insert(node_id, value.as_slice())
                        .map_err(map_err!(Backend))?;
                    outcome = IncrementOutcome::Applied;
                }
            }
        }
        txn.commit().map_err(map_err!(Backend))?;
        debug!(%node_id, ?outcome, "load increment attempted");
        Ok(outcome)
    }

    /// Decrement a node's load after a task completes.
    ///
    /// Returns false if the node is unknown or its load was already
    /// zero (e.g. the node re-registered with a fresh record).
    pub fn release_load(&self, node_id: &str) -> StateResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Backend))?;
        let released;
        {
            let mut table = txn.open_table(NODES).map_err(map_err!(Backend))?;
            let current = match table.get(node_id).map_err(map_err!(Backend))? {
                Some(guard) => {
                    let node: WorkerNode =
                        serde_json::from_slice(guard.value()).map_err(map_err!(Codec))?;
                    Some(node)
                }
                None => None,
            };

            match current {
                Some(mut node) if node.load > 0 => {
                    node.load -= 1;
                    let value = serde_json::to_vec(&node).map_err(map_err!(Codec))?;
                    table
                        .insert(node_id, value.as_slice())
                        .map_err(map_err!(Backend))?;
                    released = true;
                }
                Some(_) => {
                    warn!(%node_id, "release on node with zero load");
                    released = false;
                }
                None => {
                    warn!(%node_id, "release on unknown node");
                    released = false;
                }
            }
        }
        txn.commit().map_err(map_err!(Backend))?;
        Ok(released)
    }

    /// Record a heartbeat from a node. Returns false for unknown nodes.
    pub fn heartbeat(&self, node_id: &str) -> StateResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Backend))?;
        let known;
        {
            let mut table = txn.open_table(NODES).map_err(map_err!(Backend))?;
            let current = match table.get(node_id).map_err(map_err!(Backend))? {
                Some(guard) => {
                    let node: WorkerNode =
                        serde_json::from_slice(guard.value()).map_err(map_err!(Codec))?;
                    Some(node)
                }
                None => None,
            };

            match current {
                Some(mut node) => {
                    node.last_heartbeat = epoch_secs();
                    let value = serde_json::to_vec(&node).map_err(map_err!(Codec))?;
                    table
                        .insert(node_id, value.as_slice())
                        .map_err(map_err!(Backend))?;
                    known = true;
                }
                None => {
                    warn!(%node_id, "heartbeat from unknown node");
                    known = false;
                }
            }
        }
        txn.commit().map_err(map_err!(Backend))?;
        Ok(known)
    }

    /// Remove nodes whose last heartbeat is older than `dead_timeout_secs`.
    ///
    /// Returns the IDs of reaped nodes. Only force-killed nodes leave
    /// stale records behind; well-behaved workers deregister.
    pub fn reap_dead_nodes(&self, dead_timeout_secs: u64) -> StateResult<Vec<NodeId>> {
        let now = epoch_secs();
        let dead: Vec<NodeId> = self
            .list_nodes()?
            .into_iter()
            .filter(|n| now.saturating_sub(n.last_heartbeat) > dead_timeout_secs)
            .map(|n| n.id)
            .collect();

        for node_id in &dead {
            self.deregister_node(node_id)?;
            warn!(%node_id, "reaped dead node");
        }
        Ok(dead)
    }

    // ── Assignments ────────────────────────────────────────────────

    /// Publish a task → node binding. Idempotent per task id: the
    /// first publication wins and later calls are no-ops.
    pub fn publish_assignment(&self, task_id: &str, node_id: &str) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Backend))?;
        {
            let mut table = txn.open_table(ASSIGNMENTS).map_err(map_err!(Backend))?;
            let exists = table.get(task_id).map_err(map_err!(Backend))?.is_some();
            if !exists {
                let assignment = Assignment {
                    task_id: task_id.to_string(),
                    node_id: node_id.to_string(),
                    assigned_at: epoch_secs(),
                };
                let value = serde_json::to_vec(&assignment).map_err(map_err!(Codec))?;
                table
                    .insert(task_id, value.as_slice())
                    .map_err(map_err!(Backend))?;
            }
        }
        txn.commit().map_err(map_err!(Backend))?;
        debug!(%task_id, %node_id, "assignment published");
        Ok(())
    }

    /// Look up the node a task is bound to.
    pub fn get_assignment(&self, task_id: &str) -> StateResult<Option<Assignment>> {
        let txn = self.db.begin_read().map_err(map_err!(Backend))?;
        let table = txn.open_table(ASSIGNMENTS).map_err(map_err!(Backend))?;
        match table.get(task_id).map_err(map_err!(Backend))? {
            Some(guard) => {
                let assignment: Assignment =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Codec))?;
                Ok(Some(assignment))
            }
            None => Ok(None),
        }
    }

    /// Remove a task's binding. Returns true if it existed.
    pub fn remove_assignment(&self, task_id: &str) -> StateResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Backend))?;
        let existed;
        {
            let mut table = txn.open_table(ASSIGNMENTS).map_err(map_err!(Backend))?;
            existed = table.remove(task_id).map_err(map_err!(Backend))?.is_some();
        }
        txn.commit().map_err(map_err!(Backend))?;
        Ok(existed)
    }
}

/// Current Unix epoch in seconds.
fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn test_store() -> StateStore {
        StateStore::open_in_memory().unwrap()
    }

    fn test_node(id: &str, capacity: u32, load: u32) -> WorkerNode {
        WorkerNode {
            id: id.to_string(),
            hostname: format!("host-{id}"),
            capacity,
            load,
            capabilities: BTreeSet::new(),
            last_heartbeat: epoch_secs(),
        }
    }

    // ── Node CRUD ──────────────────────────────────────────────────

    #[test]
    fn register_and_get_node() {
        let store = test_store();
        let node = test_node("n1", 4, 0);

        store.register_node(&node).unwrap();
        let retrieved = store.get_node("n1").unwrap();

        assert_eq!(retrieved, Some(node));
    }

    #[test]
    fn get_nonexistent_returns_none() {
        let store = test_store();
        assert!(store.get_node("nope").unwrap().is_none());
    }

    #[test]
    fn list_nodes_returns_all() {
        let store = test_store();
        store.register_node(&test_node("n1", 4, 0)).unwrap();
        store.register_node(&test_node("n2", 8, 2)).unwrap();

        let nodes = store.list_nodes().unwrap();
        assert_eq!(nodes.len(), 2);
    }

    #[test]
    fn deregister_removes_node() {
        let store = test_store();
        store.register_node(&test_node("n1", 4, 0)).unwrap();

        assert!(store.deregister_node("n1").unwrap());
        assert!(store.get_node("n1").unwrap().is_none());
        assert!(!store.deregister_node("n1").unwrap());
    }

    #[test]
    fn register_rejects_empty_hostname() {
        let store = test_store();
        let mut node = test_node("n1", 4, 0);
        node.hostname = String::new();

        let result = store.register_node(&node);
        assert!(matches!(result, Err(StateError::InvalidNode(_))));
    }

    #[test]
    fn register_rejects_load_above_capacity() {
        let store = test_store();
        let mut node = test_node("n1", 4, 0);
        node.load = 5;

        let result = store.register_node(&node);
        assert!(matches!(result, Err(StateError::InvalidNode(_))));
    }

    // ── Bounded increment ──────────────────────────────────────────

    #[test]
    fn increment_applies_when_slot_free() {
        let store = test_store();
        store.register_node(&test_node("n1", 2, 0)).unwrap();

        assert_eq!(
            store.try_increment_load("n1").unwrap(),
            IncrementOutcome::Applied
        );
        assert_eq!(store.get_node("n1").unwrap().unwrap().load, 1);
    }

    #[test]
    fn increment_stops_at_capacity() {
        let store = test_store();
        store.register_node(&test_node("n1", 2, 0)).unwrap();

        assert_eq!(
            store.try_increment_load("n1").unwrap(),
            IncrementOutcome::Applied
        );
        assert_eq!(
            store.try_increment_load("n1").unwrap(),
            IncrementOutcome::Applied
        );
        assert_eq!(
            store.try_increment_load("n1").unwrap(),
            IncrementOutcome::AtCapacity
        );
        assert_eq!(store.get_node("n1").unwrap().unwrap().load, 2);
    }

    #[test]
    fn increment_unknown_node_is_not_found() {
        let store = test_store();
        assert_eq!(
            store.try_increment_load("ghost").unwrap(),
            IncrementOutcome::NotFound
        );
    }

    #[test]
    fn concurrent_increments_never_exceed_capacity() {
        use std::thread;

        let store = test_store();
        store.register_node(&test_node("n1", 5, 0)).unwrap();

        let mut handles = vec![];
        for _ in 0..4 {
            let store = store.clone();
            handles.push(thread::spawn(move || {
                let mut applied = 0;
                for _ in 0..5 {
                    if store.try_increment_load("n1").unwrap() == IncrementOutcome::Applied {
                        applied += 1;
                    }
                }
                applied
            }));
        }

        let total: u32 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, 5);
        assert_eq!(store.get_node("n1").unwrap().unwrap().load, 5);
    }

    #[test]
    fn release_decrements_load() {
        let store = test_store();
        store.register_node(&test_node("n1", 4, 2)).unwrap();

        assert!(store.release_load("n1").unwrap());
        assert_eq!(store.get_node("n1").unwrap().unwrap().load, 1);
    }

    #[test]
    fn release_at_zero_is_refused() {
        let store = test_store();
        store.register_node(&test_node("n1", 4, 0)).unwrap();

        assert!(!store.release_load("n1").unwrap());
        assert_eq!(store.get_node("n1").unwrap().unwrap().load, 0);
    }

    #[test]
    fn release_unknown_node_returns_false() {
        let store = test_store();
        assert!(!store.release_load("ghost").unwrap());
    }

    // ── Heartbeats ─────────────────────────────────────────────────

    #[test]
    fn heartbeat_refreshes_timestamp() {
        let store = test_store();
        let mut node = test_node("n1", 4, 0);
        node.last_heartbeat = 1000;
        store.register_node(&node).unwrap();

        assert!(store.heartbeat("n1").unwrap());
        let refreshed = store.get_node("n1").unwrap().unwrap();
        assert!(refreshed.last_heartbeat > 1000);
    }

    #[test]
    fn heartbeat_unknown_node_returns_false() {
        let store = test_store();
        assert!(!store.heartbeat("ghost").unwrap());
    }

    #[test]
    fn reap_removes_only_stale_nodes() {
        let store = test_store();
        let mut stale = test_node("n1", 4, 0);
        stale.last_heartbeat = 1000; // Long dead.
        store.register_node(&stale).unwrap();
        store.register_node(&test_node("n2", 4, 0)).unwrap();

        let reaped = store.reap_dead_nodes(30).unwrap();
        assert_eq!(reaped, vec!["n1".to_string()]);
        assert!(store.get_node("n1").unwrap().is_none());
        assert!(store.get_node("n2").unwrap().is_some());
    }

    // ── Assignments ────────────────────────────────────────────────

    #[test]
    fn publish_and_lookup_assignment() {
        let store = test_store();
        store.publish_assignment("task-1", "n1").unwrap();

        let assignment = store.get_assignment("task-1").unwrap().unwrap();
        assert_eq!(assignment.node_id, "n1");
    }

    #[test]
    fn publish_is_idempotent_per_task() {
        let store = test_store();
        store.publish_assignment("task-1", "n1").unwrap();
        store.publish_assignment("task-1", "n2").unwrap();

        // First publication wins.
        let assignment = store.get_assignment("task-1").unwrap().unwrap();
        assert_eq!(assignment.node_id, "n1");
    }

    #[test]
    fn remove_assignment_clears_binding() {
        let store = test_store();
        store.publish_assignment("task-1", "n1").unwrap();

        assert!(store.remove_assignment("task-1").unwrap());
        assert!(store.get_assignment("task-1").unwrap().is_none());
        assert!(!store.remove_assignment("task-1").unwrap());
    }
}
