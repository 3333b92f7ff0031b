//! The canonical error type for the kernel.
//!
//! INVARIANTS:
//! 1. Every public operation returns `Result<_, KernelError>`. No panics on
//!    untrusted input; `unwrap`/`expect` are confined to `#[cfg(test)]`.
//! 2. Variants map 1:1 onto the typed error surface (no free-form messages).
//!    `detail` fields carry the offending field path or a short explanation,
//!    never a message meant to replace the typed code.
//! 3. Tiers (see module docs on `session`): Rejection variants abort a single
//!    `append` without mutating state; Fatal variants poison the session;
//!    Transient variants (`IOError`) are safe to retry with the same
//!    `event_uuid`.

use std::fmt;

/// The canonical error type for all kernel operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KernelError {
    /// Rejection. `schema_version` missing or not equal to the current version,
    /// or the canonical-JSON wire payload violated the JCS grammar (duplicate
    /// key, non-string number, bad key format, depth/size ceiling).
    BadSchema { detail: String },
    /// Rejection. `sequence` skipped ahead of the next expected value.
    SequenceGap { expected: u64, got: u64 },
    /// Rejection. `sequence` (or `event_uuid`) reused with a different payload
    /// than the one already committed at that position.
    SequenceDuplicate { sequence: u64 },
    /// Rejection. The first event was not `initialize_constants`, or a second
    /// `initialize_constants` was submitted.
    ConstantsUnset,
    /// Rejection. A role id failed the format grammar, or collided with an
    /// existing (possibly deactivated) role.
    BadRoleId { role_id: String, detail: String },
    /// Rejection. A dependency references a `role_id` that does not exist.
    DanglingDependency { role_id: String },
    /// Rejection. Adding the dependency would close a cycle in the
    /// critical-edge subgraph.
    CriticalCycle { detail: String },
    /// Rejection. A role's responsibilities list is empty after the
    /// `add_role` default-substitution step (should not occur in practice;
    /// surfaced by `validate` as a defense-in-depth check).
    EmptyResponsibilities { role_id: String },
    /// Rejection. An active role requires an input with no active producer,
    /// and the role is not flagged as explicitly isolated.
    OrphanedInput { role_id: String, input: String },
    /// Rejection. A fixed-point value over/underflowed signed 64-bit range,
    /// failed the canonical numeric-string grammar, or exceeded a saturation
    /// cap that is not allowed to saturate (internal kernel bug, never
    /// expected from valid input).
    OutOfRangeFixedPoint { detail: String },
    /// Rejection. `compress_roles` attempted beyond `compression_limit`.
    CompressionLimit,
    /// Rejection. The referenced role does not exist (e.g. `remove_role`,
    /// `differentiate_role`, `compress_roles` on an unknown id).
    UnknownRole { role_id: String },
    /// Fatal. `verify_determinism` found a replay hash that disagrees with
    /// the stored hash. The session is poisoned until re-verified.
    DeterminismError { detail: String },
    /// Transient. Persistence I/O failed or timed out. Safe to retry with
    /// the same `event_uuid`.
    IOError { detail: String },
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelError::BadSchema { detail } => write!(f, "BadSchema: {detail}"),
            KernelError::SequenceGap { expected, got } => {
                write!(f, "SequenceGap: expected {expected}, got {got}")
            }
            KernelError::SequenceDuplicate { sequence } => {
                write!(f, "SequenceDuplicate: sequence {sequence} already committed")
            }
            KernelError::ConstantsUnset => write!(f, "ConstantsUnset"),
            KernelError::BadRoleId { role_id, detail } => {
                write!(f, "BadRoleId({role_id}): {detail}")
            }
            KernelError::DanglingDependency { role_id } => {
                write!(f, "DanglingDependency: {role_id}")
            }
            KernelError::CriticalCycle { detail } => write!(f, "CriticalCycle: {detail}"),
            KernelError::EmptyResponsibilities { role_id } => {
                write!(f, "EmptyResponsibilities: {role_id}")
            }
            KernelError::OrphanedInput { role_id, input } => {
                write!(f, "OrphanedInput: {role_id} requires {input}")
            }
            KernelError::OutOfRangeFixedPoint { detail } => {
                write!(f, "OutOfRangeFixedPoint: {detail}")
            }
            KernelError::CompressionLimit => write!(f, "CompressionLimit"),
            KernelError::UnknownRole { role_id } => write!(f, "UnknownRole: {role_id}"),
            KernelError::DeterminismError { detail } => write!(f, "DeterminismError: {detail}"),
            KernelError::IOError { detail } => write!(f, "IOError: {detail}"),
        }
    }
}

impl std::error::Error for KernelError {}
