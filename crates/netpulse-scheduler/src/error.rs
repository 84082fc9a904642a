//! Scheduler error types.

use thiserror::Error;

use netpulse_policy::SelectError;

/// Result type alias for scheduling operations.
pub type ScheduleResult<T> = Result<T, ScheduleError>;

/// A transient failure inside the store or queue backend.
///
/// Callers may retry the whole scheduling attempt at their own
/// discretion; the scheduler itself never retries these.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct StoreError(pub String);

/// Errors surfaced by scheduling operations.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// No eligible node has a free slot, or every bind retry lost its
    /// race.
    #[error("no worker node with free capacity")]
    Capacity,

    /// The requirements/liveness filter left no candidate at all —
    /// distinct from capacity exhaustion for observability.
    #[error("no eligible worker node for task requirements")]
    NoEligibleNode,

    /// Snapshot or bind failed transiently; retry at the caller's
    /// discretion.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    /// Malformed configuration; fatal at startup.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<SelectError> for ScheduleError {
    fn from(err: SelectError) -> Self {
        match err {
            SelectError::Capacity => ScheduleError::Capacity,
            SelectError::NoEligibleNode => ScheduleError::NoEligibleNode,
        }
    }
}
