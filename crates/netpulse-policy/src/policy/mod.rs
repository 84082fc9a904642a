//! The closed policy registry.
//!
//! Each policy module exposes pure `choose` / `choose_batch` functions
//! over an already-filtered candidate slice; [`PolicyKind`] is the
//! closed tagged registry keyed by the configuration string. New
//! policies are added by extending the enum, not by runtime discovery.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::SelectError;
use crate::view::NodeSnapshot;

pub mod greedy;
pub mod least_load;
pub mod least_load_random;
pub mod load_weighted_random;

/// The configuration string named an unknown policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown scheduler policy: {0}")]
pub struct UnknownPolicy(pub String);

/// The four node-selection strategies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// Deterministic "first available": smallest hostname wins.
    Greedy,
    /// Spread evenly, tie-break toward larger nodes, then by hostname.
    LeastLoad,
    /// Least-load balance with a uniform random final pick.
    LeastLoadRandom,
    /// Probability proportional to squared remaining capacity, with a
    /// hostname perturbation.
    #[default]
    LoadWeightedRandom,
}

impl PolicyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyKind::Greedy => "greedy",
            PolicyKind::LeastLoad => "least_load",
            PolicyKind::LeastLoadRandom => "least_load_random",
            PolicyKind::LoadWeightedRandom => "load_weighted_random",
        }
    }

    /// Select one node from the eligible set.
    ///
    /// `eligible` must already be filtered for liveness, requirements,
    /// and capacity; `epsilon` is the weighted policy's perturbation
    /// strength and is ignored by the other three.
    pub fn choose<'a, R: Rng>(
        &self,
        eligible: &[&'a NodeSnapshot],
        epsilon: f64,
        rng: &mut R,
    ) -> Result<&'a NodeSnapshot, SelectError> {
        match self {
            PolicyKind::Greedy => greedy::choose(eligible),
            PolicyKind::LeastLoad => least_load::choose(eligible),
            PolicyKind::LeastLoadRandom => least_load_random::choose(eligible, rng),
            PolicyKind::LoadWeightedRandom => {
                load_weighted_random::choose(eligible, epsilon, rng)
            }
        }
    }

    /// Select a node per task for a batch of `task_count` tasks.
    ///
    /// The result is positional (entry `i` hosts task `i`) and draws
    /// each node at most `remaining` times; fails up-front when the
    /// eligible set's total remaining capacity cannot cover the batch.
    /// Batch weighted selection tracks `remaining` live and perturbs
    /// with per-draw noise, so no ε is taken here.
    pub fn choose_batch<'a, R: Rng>(
        &self,
        eligible: &[&'a NodeSnapshot],
        task_count: usize,
        rng: &mut R,
    ) -> Result<Vec<&'a NodeSnapshot>, SelectError> {
        match self {
            PolicyKind::Greedy => greedy::choose_batch(eligible, task_count),
            PolicyKind::LeastLoad => least_load::choose_batch(eligible, task_count),
            PolicyKind::LeastLoadRandom => {
                least_load_random::choose_batch(eligible, task_count, rng)
            }
            PolicyKind::LoadWeightedRandom => {
                load_weighted_random::choose_batch(eligible, task_count, rng)
            }
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyKind {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "greedy" => Ok(PolicyKind::Greedy),
            "least_load" => Ok(PolicyKind::LeastLoad),
            "least_load_random" => Ok(PolicyKind::LeastLoadRandom),
            "load_weighted_random" => Ok(PolicyKind::LoadWeightedRandom),
            other => Err(UnknownPolicy(other.to_string())),
        }
    }
}

/// Shared up-front capacity check for batch selection.
pub(crate) fn batch_capacity_check(
    eligible: &[&NodeSnapshot],
    task_count: usize,
) -> Result<(), SelectError> {
    let total: u64 = eligible.iter().map(|n| u64::from(n.remaining())).sum();
    if (task_count as u64) > total {
        return Err(SelectError::Capacity);
    }
    Ok(())
}
