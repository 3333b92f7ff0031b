//! Canonical serialization and hashing of `OrgState` (spec.md §4.1).
//!
//! # Frozen field set
//!
//! The serialized object's fields, alphabetically (which is what the
//! emitter enforces regardless of construction order):
//!
//! 1. `compression_count` — decimal string
//! 2. `constants` — object or `null` before `initialize_constants`
//! 3. `constraints` — object of four numeric strings
//! 4. `dependencies` — array, canonical order already guaranteed by the model
//! 5. `event_count` — decimal string
//! 6. `prev_state_hash` — 64-char lowercase hex string
//! 7. `roles` — object keyed by role id (already sorted: `BTreeMap`)
//! 8. `structural_debt` — decimal string
//!
//! Any field outside this set is a serialization bug, not a data error —
//! there is no untrusted input at this layer, only `OrgState` values
//! produced by transitions that have already passed `validate`.

use crate::canon::hash::{sha256, to_hex, Digest};
use crate::canon::json::Value;
use crate::model::dependency::Dependency;
use crate::model::role::{Role, ScaleStage};
use crate::model::state::OrgState;

fn scale_stage_str(stage: ScaleStage) -> &'static str {
    match stage {
        ScaleStage::Seed => "seed",
        ScaleStage::Growth => "growth",
        ScaleStage::Structured => "structured",
        ScaleStage::Mature => "mature",
    }
}

fn string_array(items: &[String]) -> Value {
    Value::Array(items.iter().map(|s| Value::str(s.clone())).collect())
}

fn role_value(role: &Role) -> Value {
    Value::object(vec![
        ("active", Value::Bool(role.active)),
        ("id", Value::str(role.id.clone())),
        ("name", Value::str(role.name.clone())),
        ("produced_outputs", string_array(&role.produced_outputs)),
        ("purpose", Value::str(role.purpose.clone())),
        ("required_inputs", string_array(&role.required_inputs)),
        ("responsibilities", string_array(&role.responsibilities)),
        ("scale_stage", Value::str(scale_stage_str(role.scale_stage))),
    ])
}

fn dependency_value(dep: &Dependency) -> Value {
    Value::object(vec![
        ("critical", Value::Bool(dep.critical)),
        ("dependency_type", Value::str(dep.dependency_type.as_str())),
        ("from_role_id", Value::str(dep.from_role_id.clone())),
        ("to_role_id", Value::str(dep.to_role_id.clone())),
    ])
}

/// Build the canonical `Value` tree for `state`. Exposed so `engine`/`session`
/// can embed it inside a `Snapshot` without re-parsing the emitted bytes.
pub fn to_canonical_value(state: &OrgState) -> Value {
    let constants = match &state.constants {
        None => Value::Null,
        Some(c) => Value::object(vec![
            ("capital", Value::str(c.capital.to_canonical_string())),
            ("compression_limit", Value::str(c.compression_limit.to_string())),
            ("differentiation_threshold", Value::str(c.differentiation_threshold.to_string())),
            ("political_cost", Value::str(c.political_cost.to_canonical_string())),
            ("shock_base_multiplier", Value::str(c.shock_base_multiplier.to_canonical_string())),
            ("shock_density_weight", Value::str(c.shock_density_weight.to_canonical_string())),
            ("talent", Value::str(c.talent.to_canonical_string())),
            ("time", Value::str(c.time.to_canonical_string())),
        ]),
    };

    let constraints = Value::object(vec![
        ("capital", Value::str(state.constraints.capital.to_canonical_string())),
        ("political_cost", Value::str(state.constraints.political_cost.to_canonical_string())),
        ("talent", Value::str(state.constraints.talent.to_canonical_string())),
        ("time", Value::str(state.constraints.time.to_canonical_string())),
    ]);

    let roles = Value::Object(
        state
            .roles
            .values()
            .map(|r| (r.id.clone(), role_value(r)))
            .collect(),
    );

    let dependencies = Value::Array(state.dependencies.iter().map(dependency_value).collect());

    Value::object(vec![
        ("compression_count", Value::str(state.compression_count.to_string())),
        ("constants", constants),
        ("constraints", constraints),
        ("dependencies", dependencies),
        ("event_count", Value::str(state.event_count.to_string())),
        ("prev_state_hash", Value::str(to_hex(&state.prev_state_hash))),
        ("roles", roles),
        ("structural_debt", Value::str(state.structural_debt.to_canonical_string())),
    ])
}

/// Serialize `state` to canonical bytes.
pub fn canonical_bytes(state: &OrgState) -> Vec<u8> {
    crate::canon::json::serialize(&to_canonical_value(state))
}

/// Compute the state's SHA-256 digest over its canonical bytes.
pub fn state_hash(state: &OrgState) -> Digest {
    sha256(&canonical_bytes(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;

    #[test]
    fn genesis_hash_is_deterministic() {
        let s = OrgState::genesis();
        assert_eq!(state_hash(&s), state_hash(&s));
    }

    #[test]
    fn adding_a_role_changes_the_hash() {
        let before = OrgState::genesis();
        let mut after = before.clone();
        after.roles.insert(
            "a".into(),
            Role::new("a".into(), "A".into(), "".into(), vec!["x".into()]).unwrap(),
        );
        assert_ne!(state_hash(&before), state_hash(&after));
    }

    #[test]
    fn role_field_order_does_not_affect_hash() {
        // Two states built differently but logically identical must hash equal.
        let mut s1 = OrgState::genesis();
        let mut s2 = OrgState::genesis();
        s1.roles.insert(
            "a".into(),
            Role::new("a".into(), "A".into(), "p".into(), vec!["r1".into(), "r2".into()]).unwrap(),
        );
        s2.roles.insert(
            "a".into(),
            Role::new("a".into(), "A".into(), "p".into(), vec!["r1".into(), "r2".into()]).unwrap(),
        );
        assert_eq!(state_hash(&s1), state_hash(&s2));
    }

    #[test]
    fn canonical_bytes_contain_no_unescaped_whitespace() {
        let s = OrgState::genesis();
        let bytes = canonical_bytes(&s);
        assert!(!bytes.contains(&b' '));
        assert!(!bytes.contains(&b'\n'));
    }
}
