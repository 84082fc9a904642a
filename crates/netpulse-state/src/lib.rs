//! netpulse-state — embedded fleet state store for NetPulse.
//!
//! Backed by [redb](https://docs.rs/redb), holds the durable state the
//! scheduler reads and updates: worker-node records (capacity, load,
//! heartbeats) and task assignments. The store is the single authority
//! on `load`; schedulers never cache it across attempts.
//!
//! # Architecture
//!
//! All domain types are JSON-serialized into redb's `&[u8]` value
//! columns. redb write transactions are serialized, which is what makes
//! [`StateStore::try_increment_load`] an atomic bounded increment: two
//! schedulers racing for a node's last free slot cannot both win.
//!
//! The `StateStore` is `Clone` + `Send` + `Sync` (backed by
//! `Arc<Database>`) and can be shared across async tasks.

pub mod error;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StateError, StateResult};
pub use store::{IncrementOutcome, StateStore};
pub use types::*;
