//! Selection error types.

use thiserror::Error;

/// Why a selection could not produce a node.
///
/// The scheduler maps both variants onto its caller-facing errors; the
/// distinction is kept so capacity exhaustion and requirement
/// mismatches stay observable as separate subcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SelectError {
    /// Every candidate node is at capacity, or none were offered.
    #[error("insufficient capacity in node selection")]
    Capacity,

    /// No alive node satisfies the task's capability requirements.
    #[error("no eligible node for task requirements")]
    NoEligibleNode,
}
