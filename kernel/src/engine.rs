//! The event engine (spec.md §4.4): parse → schema check → sequence check →
//! transition → invariant validate → canonical serialize → SHA update →
//! append. This module implements everything except "append" itself, which
//! belongs to `session` (it owns the log).

use crate::canon::hash::Digest;
use crate::canon::json::{self, Value};
use crate::canon::state_hash::state_hash;
use crate::error::KernelError;
use crate::math::fixed::Fixed;
use crate::model::dependency::DependencyType;
use crate::model::event::{Event, EventPayload, SCHEMA_VERSION};
use crate::model::result::TransitionResult;
use crate::model::state::OrgState;
use crate::validate::validate;

fn field<'a>(value: &'a Value, key: &str) -> Result<&'a Value, KernelError> {
    value.get(key).ok_or_else(|| KernelError::BadSchema { detail: format!("missing field '{key}'") })
}

fn str_field<'a>(value: &'a Value, key: &str) -> Result<&'a str, KernelError> {
    field(value, key)?
        .as_str()
        .ok_or_else(|| KernelError::BadSchema { detail: format!("field '{key}' must be a string") })
}

fn bool_field(value: &Value, key: &str) -> Result<bool, KernelError> {
    field(value, key)?
        .as_bool()
        .ok_or_else(|| KernelError::BadSchema { detail: format!("field '{key}' must be a bool") })
}

fn numeric_str<'a>(value: &'a Value, key: &str) -> Result<&'a str, KernelError> {
    let s = str_field(value, key)?;
    json::validate_numeric_string(s)?;
    Ok(s)
}

fn i64_field(value: &Value, key: &str) -> Result<i64, KernelError> {
    let s = numeric_str(value, key)?;
    s.parse::<i64>().map_err(|_| KernelError::BadSchema { detail: format!("field '{key}' does not fit in i64") })
}

fn optional_i64_field(value: &Value, key: &str) -> Result<i64, KernelError> {
    match value.get(key) {
        None => Ok(0),
        Some(_) => i64_field(value, key),
    }
}

fn fixed_field(value: &Value, key: &str) -> Result<Fixed, KernelError> {
    let s = numeric_str(value, key)?;
    Fixed::from_canonical_str(s)
}

fn string_array_field(value: &Value, key: &str) -> Result<Vec<String>, KernelError> {
    let items = field(value, key)?
        .as_array()
        .ok_or_else(|| KernelError::BadSchema { detail: format!("field '{key}' must be an array") })?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| KernelError::BadSchema { detail: format!("field '{key}' must contain strings") })
        })
        .collect()
}

fn decode_payload(event_type: &str, payload: &Value) -> Result<EventPayload, KernelError> {
    match event_type {
        "initialize_constants" => {
            json::validate_schema_partial(
                payload,
                &["capital", "talent", "time", "political_cost", "differentiation_threshold", "compression_limit"],
                &[],
            )?;
            let compression_limit = i64_field(payload, "compression_limit")?;
            if compression_limit < 0 {
                return Err(KernelError::BadSchema { detail: "compression_limit must be non-negative".into() });
            }
            Ok(EventPayload::InitializeConstants {
                capital: fixed_field(payload, "capital")?,
                talent: fixed_field(payload, "talent")?,
                time: fixed_field(payload, "time")?,
                political_cost: fixed_field(payload, "political_cost")?,
                differentiation_threshold: i64_field(payload, "differentiation_threshold")?,
                compression_limit: compression_limit as u32,
            })
        }
        "add_role" => {
            json::validate_schema_partial(payload, &["id", "name", "purpose", "responsibilities"], &[])?;
            Ok(EventPayload::AddRole {
                id: str_field(payload, "id")?.to_string(),
                name: str_field(payload, "name")?.to_string(),
                purpose: str_field(payload, "purpose")?.to_string(),
                responsibilities: string_array_field(payload, "responsibilities")?,
            })
        }
        "remove_role" => {
            json::validate_schema_partial(payload, &["role_id"], &[])?;
            Ok(EventPayload::RemoveRole { role_id: str_field(payload, "role_id")?.to_string() })
        }
        "add_dependency" => {
            json::validate_schema_partial(
                payload,
                &["from_role_id", "to_role_id", "dep_type", "critical"],
                &[],
            )?;
            let dep_type_str = str_field(payload, "dep_type")?;
            let dep_type = DependencyType::parse(dep_type_str).ok_or_else(|| KernelError::BadSchema {
                detail: format!("unknown dep_type '{dep_type_str}'"),
            })?;
            Ok(EventPayload::AddDependency {
                from_role_id: str_field(payload, "from_role_id")?.to_string(),
                to_role_id: str_field(payload, "to_role_id")?.to_string(),
                dep_type,
                critical: bool_field(payload, "critical")?,
            })
        }
        "inject_shock" => {
            json::validate_schema_partial(payload, &["target_role_id", "magnitude"], &[])?;
            Ok(EventPayload::InjectShock {
                target_role_id: str_field(payload, "target_role_id")?.to_string(),
                magnitude: i64_field(payload, "magnitude")?,
            })
        }
        "apply_constraint_change" => {
            json::validate_schema_partial(
                payload,
                &[],
                &["capital_delta", "talent_delta", "time_delta", "political_cost_delta"],
            )?;
            Ok(EventPayload::ApplyConstraintChange {
                capital_delta: optional_i64_field(payload, "capital_delta")?,
                talent_delta: optional_i64_field(payload, "talent_delta")?,
                time_delta: optional_i64_field(payload, "time_delta")?,
                political_cost_delta: optional_i64_field(payload, "political_cost_delta")?,
            })
        }
        "differentiate_role" => {
            json::validate_schema_partial(payload, &["role_id"], &[])?;
            Ok(EventPayload::DifferentiateRole { role_id: str_field(payload, "role_id")?.to_string() })
        }
        "compress_roles" => {
            json::validate_schema_partial(payload, &["source_role_id", "target_role_id"], &[])?;
            Ok(EventPayload::CompressRoles {
                source_role_id: str_field(payload, "source_role_id")?.to_string(),
                target_role_id: str_field(payload, "target_role_id")?.to_string(),
            })
        }
        other => Err(KernelError::BadSchema { detail: format!("unknown event_type '{other}'") }),
    }
}

/// Decode a wire event into a typed `Event`. `expected_sequence` is the
/// orchestrator's next-expected sequence number; if the wire event omits
/// `sequence`, it is assigned here.
pub fn parse_event(bytes: &[u8], expected_sequence: u64) -> Result<Event, KernelError> {
    let root = json::parse(bytes)?;
    json::validate_schema_partial(
        &root,
        &["schema_version", "event_type", "payload"],
        &["sequence", "event_uuid", "timestamp"],
    )?;

    let schema_version = i64_field(&root, "schema_version")?;
    if schema_version != SCHEMA_VERSION {
        return Err(KernelError::BadSchema {
            detail: format!("schema_version {schema_version} != {SCHEMA_VERSION}"),
        });
    }

    let sequence = match root.get("sequence") {
        None => expected_sequence,
        Some(_) => i64_field(&root, "sequence")?.try_into().map_err(|_| KernelError::BadSchema {
            detail: "sequence must be non-negative".into(),
        })?,
    };
    if sequence != expected_sequence {
        return Err(KernelError::SequenceGap { expected: expected_sequence, got: sequence });
    }

    let event_type = str_field(&root, "event_type")?;
    let payload_value = field(&root, "payload")?;
    let payload = decode_payload(event_type, payload_value)?;

    let event_uuid = match root.get("event_uuid") {
        None => None,
        Some(v) => Some(
            v.as_str()
                .ok_or_else(|| KernelError::BadSchema { detail: "event_uuid must be a string".into() })?
                .to_string(),
        ),
    };
    let timestamp = match root.get("timestamp") {
        None => None,
        Some(v) => Some(
            v.as_str()
                .ok_or_else(|| KernelError::BadSchema { detail: "timestamp must be a string".into() })?
                .to_string(),
        ),
    };

    Ok(Event { schema_version, sequence, event_uuid, timestamp, payload })
}

/// Apply one decoded event to `state`. Enforces that the first event ever
/// applied to a session is `initialize_constants` (spec.md §4.4); beyond
/// that, dispatches to `transition::apply`, validates the result, and
/// returns the new state alongside its freshly computed hash.
pub fn apply_event(state: OrgState, event: Event) -> Result<(OrgState, TransitionResult, Digest), KernelError> {
    if state.constants.is_none() && !matches!(event.payload, EventPayload::InitializeConstants { .. }) {
        return Err(KernelError::ConstantsUnset);
    }

    let prev_hash = state_hash(&state);
    let (mut new_state, result) = crate::transition::apply(state, event.payload)?;
    new_state.event_count += 1;
    new_state.prev_state_hash = prev_hash;

    validate(&new_state)?;

    let hash = state_hash(&new_state);
    Ok((new_state, result, hash))
}
