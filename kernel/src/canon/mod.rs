//! Canonical JSON, SHA-256, and the `OrgState` hashing protocol (spec.md §4.1).
//!
//! The single parser in `json` decodes both incoming event envelopes and
//! the kernel's own state bytes — there is one constitutional grammar, not
//! two.

pub mod hash;
pub mod json;
pub mod state_hash;

pub use hash::{sha256, to_hex, Digest};
pub use state_hash::{canonical_bytes, state_hash};
