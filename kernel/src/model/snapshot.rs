//! `Snapshot` — an advisory, periodic checkpoint (spec.md §3, §4.9).
//!
//! Snapshots are never consulted during replay; `verify_determinism`
//! replays from event 0 regardless of what snapshots exist. They exist
//! purely to let an external reader materialize state without replaying
//! the full log.

use crate::canon::hash::Digest;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub sequence: u64,
    pub canonical_state_json: Vec<u8>,
    pub state_hash: Digest,
    /// Advisory only, taken from the triggering event's `timestamp` field
    /// if present; the kernel never reads the wall clock.
    pub created_at: Option<String>,
}
