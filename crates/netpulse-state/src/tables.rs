//! redb table definitions for the NetPulse state store.
//!
//! Each table uses `&str` keys and `&[u8]` values (JSON-serialized
//! domain types).

use redb::TableDefinition;

/// Worker node records keyed by `{node_id}`.
pub const NODES: TableDefinition<&str, &[u8]> = TableDefinition::new("nodes");

/// Task assignments keyed by `{task_id}`.
pub const ASSIGNMENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("assignments");
