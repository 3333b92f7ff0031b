//! The event wire format (spec.md §6): envelope plus the tagged payload
//! variant per `event_type`. Decoding canonical JSON into these types is
//! `engine`'s job; everything downstream (`transition`) only ever sees
//! already-typed values.

use crate::math::fixed::Fixed;
use crate::model::dependency::DependencyType;

pub const SCHEMA_VERSION: i64 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventPayload {
    InitializeConstants {
        capital: Fixed,
        talent: Fixed,
        time: Fixed,
        political_cost: Fixed,
        differentiation_threshold: i64,
        compression_limit: u32,
    },
    AddRole {
        id: String,
        name: String,
        purpose: String,
        responsibilities: Vec<String>,
    },
    RemoveRole {
        role_id: String,
    },
    AddDependency {
        from_role_id: String,
        to_role_id: String,
        dep_type: DependencyType,
        critical: bool,
    },
    InjectShock {
        target_role_id: String,
        magnitude: i64,
    },
    ApplyConstraintChange {
        capital_delta: i64,
        talent_delta: i64,
        time_delta: i64,
        political_cost_delta: i64,
    },
    DifferentiateRole {
        role_id: String,
    },
    CompressRoles {
        source_role_id: String,
        target_role_id: String,
    },
}

impl EventPayload {
    /// The `event_type` string this payload was decoded from (or will be
    /// encoded as, in a future wire-format writer).
    pub fn event_type(&self) -> &'static str {
        match self {
            EventPayload::InitializeConstants { .. } => "initialize_constants",
            EventPayload::AddRole { .. } => "add_role",
            EventPayload::RemoveRole { .. } => "remove_role",
            EventPayload::AddDependency { .. } => "add_dependency",
            EventPayload::InjectShock { .. } => "inject_shock",
            EventPayload::ApplyConstraintChange { .. } => "apply_constraint_change",
            EventPayload::DifferentiateRole { .. } => "differentiate_role",
            EventPayload::CompressRoles { .. } => "compress_roles",
        }
    }
}

/// A decoded event, ready for dispatch. `event_uuid` and `timestamp` are
/// carried through for idempotency and snapshot bookkeeping but never
/// inspected by a transition function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub schema_version: i64,
    pub sequence: u64,
    pub event_uuid: Option<String>,
    pub timestamp: Option<String>,
    pub payload: EventPayload,
}
