//! Failure modes of the fleet state store.
//!
//! Callers rarely care which redb primitive tripped, so backend
//! failures collapse into one variant; what they do care about is
//! whether a record was unreadable (corruption) or unacceptable
//! (invariant violation), which get their own cases.

use thiserror::Error;

/// Result type alias for state store operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur during state store operations.
#[derive(Debug, Error)]
pub enum StateError {
    /// The node registry could not be opened or created.
    #[error("failed to open node registry: {0}")]
    Open(String),

    /// A transaction, table, read, or write failed mid-flight.
    /// Transient from the scheduler's point of view: the attempt can
    /// be retried against a healthy backend.
    #[error("registry backend error: {0}")]
    Backend(String),

    /// A stored record could not be encoded or decoded. Not
    /// retryable; the record itself is bad.
    #[error("corrupt registry record: {0}")]
    Codec(String),

    /// A node record offered for registration violates a fleet
    /// invariant (empty hostname, `load > capacity`).
    #[error("invalid node record: {0}")]
    InvalidNode(String),
}
