//! Decision binder — publishes a scheduling decision to the queue.
//!
//! The interval between snapshot and bind is where bind races live:
//! another scheduler may have consumed the chosen node's last free
//! slot against the same stale view. The store's atomic bounded
//! increment resolves the race; this module reports the outcome so
//! the facade can rerun the whole attempt.

use serde::{Deserialize, Serialize};
use tracing::debug;

use netpulse_policy::PolicyKind;
use netpulse_state::IncrementOutcome;

use crate::error::ScheduleResult;
use crate::store::{ClusterStore, TaskQueue};

/// A binding decision produced by one scheduling attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Decision {
    pub task_id: String,
    pub node_id: String,
    /// Policy that made the pick.
    pub policy: PolicyKind,
    /// Free slots the node showed in the snapshot the pick was made
    /// against — diagnostic only, the store re-checks at bind time.
    pub observed_remaining: u32,
}

/// What happened when a decision hit the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindOutcome {
    /// The store accepted the increment and the binding is published.
    Bound,
    /// The node filled up (or vanished) between snapshot and bind.
    LostRace,
}

/// Attempt to publish `decision`.
///
/// On `Applied` the task → node binding goes to the queue and the
/// outcome is [`BindOutcome::Bound`]. `AtCapacity` and `NotFound`
/// both surface as [`BindOutcome::LostRace`]: either way the snapshot
/// was stale and the attempt must rerun against a fresh view. Store
/// failures propagate unchanged.
pub async fn bind<S, Q>(store: &S, queue: &Q, decision: &Decision) -> ScheduleResult<BindOutcome>
where
    S: ClusterStore,
    Q: TaskQueue,
{
    match store.try_increment_load(&decision.node_id).await? {
        IncrementOutcome::Applied => {
            queue.publish(&decision.task_id, &decision.node_id).await?;
            debug!(
                task_id = %decision.task_id,
                node_id = %decision.node_id,
                policy = %decision.policy,
                "decision bound"
            );
            Ok(BindOutcome::Bound)
        }
        IncrementOutcome::AtCapacity => {
            debug!(
                task_id = %decision.task_id,
                node_id = %decision.node_id,
                "lost bind race: node at capacity"
            );
            Ok(BindOutcome::LostRace)
        }
        IncrementOutcome::NotFound => {
            debug!(
                task_id = %decision.task_id,
                node_id = %decision.node_id,
                "lost bind race: node vanished"
            );
            Ok(BindOutcome::LostRace)
        }
    }
}
