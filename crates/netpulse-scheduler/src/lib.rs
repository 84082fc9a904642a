//! netpulse-scheduler — task scheduling facade and decision binder.
//!
//! Glues the pure selection core (`netpulse-policy`) to the durable
//! fleet state (`netpulse-state`). Per task the scheduler:
//!
//! - Snapshots the fleet into an immutable `ClusterView`
//! - Runs the two-phase eligibility filter
//! - Delegates the pick to the configured policy
//! - Binds the decision through the store's atomic bounded increment,
//!   retrying the whole attempt a bounded number of times on races
//!
//! # Architecture
//!
//! ```text
//! Scheduler
//!   ├── ClusterStore (list_nodes, try_increment_load, release_load)
//!   ├── TaskQueue (publish / lookup / retire assignments)
//!   └── per attempt
//!       ├── ClusterView snapshot (liveness derived from heartbeats)
//!       ├── PolicyKind::choose with an OS-seeded per-attempt RNG
//!       └── binder::bind → Bound | LostRace
//! ```
//!
//! The scheduler holds no mutable cluster state of its own; the store
//! is the single authority on `load`.

pub mod binder;
pub mod config;
pub mod error;
pub mod scheduler;
pub mod store;

pub use binder::{bind, BindOutcome, Decision};
pub use config::{SchedulerConfig, WorkerConfig};
pub use error::{ScheduleError, ScheduleResult, StoreError};
pub use scheduler::{BatchOutcome, Scheduler};
pub use store::{ClusterStore, TaskQueue};

pub use netpulse_policy::{ClusterView, NodeSnapshot, PolicyKind, TaskSpec};
pub use netpulse_state::IncrementOutcome;
