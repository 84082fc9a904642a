//! Snapshot types for one scheduling attempt.
//!
//! A `ClusterView` is captured once per attempt and never mutated; the
//! store remains the sole authority on `load`. Policies only ever see
//! these snapshots, which keeps them pure and trivially testable.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Point-in-time snapshot of a single worker node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeSnapshot {
    pub id: String,
    /// Deterministic tie-break key and perturbation seed.
    pub hostname: String,
    pub capacity: u32,
    pub load: u32,
    /// Capability tags the node's drivers advertise.
    pub capabilities: BTreeSet<String>,
    /// Derived from heartbeat age at snapshot time; dead nodes are
    /// invisible to every policy.
    pub alive: bool,
}

impl NodeSnapshot {
    /// Free slot count observed at snapshot time.
    pub fn remaining(&self) -> u32 {
        self.capacity.saturating_sub(self.load)
    }
}

/// Immutable view of the worker fleet for one scheduling attempt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterView {
    pub nodes: Vec<NodeSnapshot>,
}

impl ClusterView {
    pub fn new(nodes: Vec<NodeSnapshot>) -> Self {
        Self { nodes }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// The scheduler-relevant slice of a task.
///
/// Requirements are opaque capability tags; the scheduler checks set
/// inclusion against node capabilities and nothing more.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskSpec {
    pub id: String,
    #[serde(default)]
    pub requirements: BTreeSet<String>,
}

impl TaskSpec {
    /// A task with no capability requirements.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            requirements: BTreeSet::new(),
        }
    }

    pub fn with_requirements<I, S>(id: impl Into<String>, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            requirements: tags.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_never_underflows() {
        let node = NodeSnapshot {
            id: "n1".to_string(),
            hostname: "a".to_string(),
            capacity: 1,
            load: 1,
            capabilities: BTreeSet::new(),
            alive: true,
        };
        assert_eq!(node.remaining(), 0);
    }

    #[test]
    fn task_requirements_default_empty() {
        let task = TaskSpec::new("t1");
        assert!(task.requirements.is_empty());

        let parsed: TaskSpec = serde_json::from_str(r#"{"id":"t2"}"#).unwrap();
        assert!(parsed.requirements.is_empty());
    }

    #[test]
    fn with_requirements_collects_tags() {
        let task = TaskSpec::with_requirements("t1", ["netmiko", "napalm"]);
        assert!(task.requirements.contains("netmiko"));
        assert!(task.requirements.contains("napalm"));
    }
}
