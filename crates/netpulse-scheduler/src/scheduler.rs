//! Scheduler facade — one stateless coordinator per fleet.
//!
//! `schedule` runs the snapshot → filter → policy → bind pipeline for
//! a single task; `schedule_batch` amortizes one snapshot over many
//! tasks. The facade holds configuration only: every scheduling
//! attempt reads fresh state from the store, so concurrent callers
//! never contend on scheduler-internal locks.

use std::collections::BTreeSet;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use netpulse_policy::{
    cluster_view, filter_capable, filter_capacity, filter_eligible, ClusterView, PolicyKind,
    TaskSpec,
};
use netpulse_state::TaskId;

use crate::binder::{bind, BindOutcome, Decision};
use crate::config::SchedulerConfig;
use crate::error::{ScheduleError, ScheduleResult};
use crate::store::{ClusterStore, TaskQueue};

/// Per-task outcomes of a batch scheduling call.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Successfully bound decisions, in task order.
    pub bound: Vec<Decision>,
    /// Tasks whose bind lost its race; resubmit individually.
    pub failed: Vec<TaskId>,
}

/// Stateless scheduling coordinator.
///
/// Safe to share across concurrent callers: all mutable cluster state
/// lives behind the store, and randomized policies draw from a fresh
/// OS-seeded generator per attempt. Dropping a `schedule` future
/// cancels the attempt at the next store boundary; no cleanup is
/// needed because an unbound attempt acquired nothing.
pub struct Scheduler<S, Q> {
    store: S,
    queue: Q,
    policy: PolicyKind,
    bind_retries: u32,
    weight_perturbation: f64,
    dead_timeout: Duration,
}

impl<S, Q> Scheduler<S, Q>
where
    S: ClusterStore,
    Q: TaskQueue,
{
    pub fn new(store: S, queue: Q, config: &SchedulerConfig) -> Self {
        Self {
            store,
            queue,
            policy: config.worker.scheduler,
            bind_retries: config.worker.bind_retries,
            weight_perturbation: config.worker.weight_perturbation,
            dead_timeout: Duration::from_secs(config.worker.dead_timeout_secs),
        }
    }

    /// The configured selection policy.
    pub fn policy(&self) -> PolicyKind {
        self.policy
    }

    /// Schedule one task onto the fleet.
    ///
    /// A lost bind race reruns the entire attempt — fresh snapshot,
    /// fresh filter, fresh pick — up to `bind_retries` additional
    /// times, so the store sees at most `bind_retries + 1` increment
    /// attempts per call. Exhaustion surfaces as a capacity error.
    pub async fn schedule(&self, task: &TaskSpec) -> ScheduleResult<Decision> {
        let mut lost_races = 0u32;
        loop {
            let view = self.snapshot().await?;
            let decision = self.decide(&view, task)?;

            match bind(&self.store, &self.queue, &decision).await? {
                BindOutcome::Bound => {
                    info!(
                        task_id = %task.id,
                        node_id = %decision.node_id,
                        policy = %decision.policy,
                        observed_remaining = decision.observed_remaining,
                        "task scheduled"
                    );
                    return Ok(decision);
                }
                BindOutcome::LostRace => {
                    lost_races += 1;
                    if lost_races > self.bind_retries {
                        warn!(
                            task_id = %task.id,
                            retries = self.bind_retries,
                            "bind retries exhausted"
                        );
                        return Err(ScheduleError::Capacity);
                    }
                    debug!(task_id = %task.id, attempt = lost_races, "rescheduling after lost race");
                }
            }
        }
    }

    /// Schedule a batch of tasks against one shared snapshot.
    ///
    /// Picks are positional, so eligibility is filtered against the
    /// union of all tasks' requirements — any selected node can host
    /// any task in the batch. Individual binds that lose their race
    /// are reported in [`BatchOutcome::failed`] rather than retried;
    /// resubmitting those through [`Scheduler::schedule`] gets them
    /// the full retry treatment.
    pub async fn schedule_batch(&self, tasks: &[TaskSpec]) -> ScheduleResult<BatchOutcome> {
        if tasks.is_empty() {
            return Ok(BatchOutcome::default());
        }

        let view = self.snapshot().await?;

        let merged: BTreeSet<String> = tasks
            .iter()
            .flat_map(|t| t.requirements.iter().cloned())
            .collect();
        let eligible = filter_capable(&view, &merged);
        if eligible.is_empty() {
            return Err(empty_phase_one_error(&view));
        }
        let open = filter_capacity(&eligible);
        if open.is_empty() {
            return Err(ScheduleError::Capacity);
        }

        let mut rng = StdRng::from_os_rng();
        let picks = self.policy.choose_batch(&open, tasks.len(), &mut rng)?;

        let mut outcome = BatchOutcome::default();
        for (task, node) in tasks.iter().zip(picks) {
            let decision = Decision {
                task_id: task.id.clone(),
                node_id: node.id.clone(),
                policy: self.policy,
                observed_remaining: node.remaining(),
            };
            match bind(&self.store, &self.queue, &decision).await? {
                BindOutcome::Bound => outcome.bound.push(decision),
                BindOutcome::LostRace => {
                    warn!(task_id = %task.id, node_id = %node.id, "batch bind lost race");
                    outcome.failed.push(task.id.clone());
                }
            }
        }

        info!(
            bound = outcome.bound.len(),
            failed = outcome.failed.len(),
            policy = %self.policy,
            "batch scheduled"
        );
        Ok(outcome)
    }

    /// Release a finished task: decrement the node's load and retire
    /// the queue binding. Returns false for unknown tasks.
    pub async fn complete(&self, task_id: &str) -> ScheduleResult<bool> {
        match self.queue.lookup(task_id).await? {
            Some(node_id) => {
                self.store.release_load(&node_id).await?;
                self.queue.retire(task_id).await?;
                debug!(%task_id, %node_id, "task completed");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Capture an immutable fleet view, deriving per-node liveness
    /// from heartbeat age.
    async fn snapshot(&self) -> ScheduleResult<ClusterView> {
        let nodes = self.store.list_nodes().await?;
        Ok(cluster_view(
            &nodes,
            epoch_secs(),
            self.dead_timeout.as_secs(),
        ))
    }

    /// Pure decision step: filter the view, run the policy.
    fn decide(&self, view: &ClusterView, task: &TaskSpec) -> ScheduleResult<Decision> {
        let eligible = filter_eligible(view, task);
        if eligible.is_empty() {
            return Err(empty_phase_one_error(view));
        }
        let open = filter_capacity(&eligible);
        if open.is_empty() {
            return Err(ScheduleError::Capacity);
        }

        let mut rng = StdRng::from_os_rng();
        let chosen = self
            .policy
            .choose(&open, self.weight_perturbation, &mut rng)?;

        Ok(Decision {
            task_id: task.id.clone(),
            node_id: chosen.id.clone(),
            policy: self.policy,
            observed_remaining: chosen.remaining(),
        })
    }
}

/// Map an empty phase-1 filter result onto the right error.
///
/// `NoEligibleNode` is reserved for requirement mismatches: alive
/// nodes exist but none qualify. An empty or all-dead fleet is plain
/// capacity exhaustion — dead nodes are invisible, not ineligible.
fn empty_phase_one_error(view: &ClusterView) -> ScheduleError {
    if view.nodes.iter().any(|n| n.alive) {
        ScheduleError::NoEligibleNode
    } else {
        ScheduleError::Capacity
    }
}

/// Current Unix epoch in seconds.
fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
