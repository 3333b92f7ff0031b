//! `add_dependency` (spec.md §4.3). Self-loops and exact-duplicate
//! `(from, to, dependency_type)` triples are rejected as `BadSchema` — the
//! closed error surface (spec.md §6) has no dedicated code for either, so
//! both are treated as malformed payload, same as a schema violation.
//!
//! Committing an edge also applies the `Seed -> Growth` scale-stage rule
//! (see `model::role::ScaleStage`): both endpoints gain fan-in by
//! definition, so any endpoint still at `Seed` is bumped to `Growth`. Roles
//! already past `Seed` (`Structured`/`Mature`) are left alone — the rule is
//! a one-way floor, not a reset.

use crate::error::KernelError;
use crate::model::dependency::{insert_sorted, Dependency, DependencyType};
use crate::model::result::TransitionResult;
use crate::model::role::ScaleStage;
use crate::model::state::OrgState;

pub fn add_dependency(
    mut state: OrgState,
    from_role_id: String,
    to_role_id: String,
    dep_type: DependencyType,
    critical: bool,
) -> Result<(OrgState, TransitionResult), KernelError> {
    if from_role_id == to_role_id {
        return Err(KernelError::BadSchema { detail: "self-loop dependencies are forbidden".into() });
    }
    if !state.roles.contains_key(&from_role_id) {
        return Err(KernelError::DanglingDependency { role_id: from_role_id });
    }
    if !state.roles.contains_key(&to_role_id) {
        return Err(KernelError::DanglingDependency { role_id: to_role_id });
    }
    let duplicate = state.dependencies.iter().any(|d| {
        d.from_role_id == from_role_id && d.to_role_id == to_role_id && d.dependency_type == dep_type
    });
    if duplicate {
        return Err(KernelError::BadSchema { detail: "duplicate dependency".into() });
    }

    if critical {
        let mut probe = state.clone();
        insert_sorted(
            &mut probe.dependencies,
            Dependency {
                from_role_id: from_role_id.clone(),
                to_role_id: to_role_id.clone(),
                dependency_type: dep_type,
                critical: true,
            },
        );
        crate::validate::check_critical_acyclic(&probe)?;
    }

    insert_sorted(
        &mut state.dependencies,
        Dependency { from_role_id: from_role_id.clone(), to_role_id: to_role_id.clone(), dependency_type: dep_type, critical },
    );

    for role_id in [&from_role_id, &to_role_id] {
        if let Some(role) = state.roles.get_mut(role_id) {
            if role.scale_stage == ScaleStage::Seed {
                role.scale_stage = ScaleStage::Growth;
            }
        }
    }

    let debt = state.structural_debt;
    let result = TransitionResult::plain(
        "add_dependency",
        format!("dependency '{from_role_id}' -> '{to_role_id}' added"),
        debt,
    );
    Ok((state, result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transition::roles::add_role;

    fn with_two_roles() -> OrgState {
        let state = OrgState::genesis();
        let (state, _) = add_role(state, "a".into(), "A".into(), "".into(), vec!["x".into()]).unwrap();
        let (state, _) = add_role(state, "b".into(), "B".into(), "".into(), vec!["x".into()]).unwrap();
        state
    }

    #[test]
    fn self_loop_is_rejected() {
        let state = with_two_roles();
        let result = add_dependency(state, "a".into(), "a".into(), DependencyType::Operational, false);
        assert!(matches!(result, Err(KernelError::BadSchema { .. })));
    }

    #[test]
    fn dangling_endpoint_is_rejected() {
        let state = with_two_roles();
        let result = add_dependency(state, "a".into(), "ghost".into(), DependencyType::Operational, false);
        assert!(matches!(result, Err(KernelError::DanglingDependency { .. })));
    }

    #[test]
    fn duplicate_triple_is_rejected() {
        let state = with_two_roles();
        let (state, _) =
            add_dependency(state, "a".into(), "b".into(), DependencyType::Operational, false).unwrap();
        let result = add_dependency(state, "a".into(), "b".into(), DependencyType::Operational, false);
        assert!(matches!(result, Err(KernelError::BadSchema { .. })));
    }

    #[test]
    fn three_cycle_of_critical_edges_rejects_the_closing_edge() {
        let state = with_two_roles();
        let (state, _) = add_role(state, "c".into(), "C".into(), "".into(), vec!["x".into()]).unwrap();
        let (state, _) =
            add_dependency(state, "a".into(), "b".into(), DependencyType::Operational, true).unwrap();
        let (state, _) =
            add_dependency(state, "b".into(), "c".into(), DependencyType::Operational, true).unwrap();
        let result = add_dependency(state, "c".into(), "a".into(), DependencyType::Operational, true);
        assert!(matches!(result, Err(KernelError::CriticalCycle { .. })));
    }

    #[test]
    fn non_critical_cycle_is_accepted() {
        let state = with_two_roles();
        let (state, _) =
            add_dependency(state, "a".into(), "b".into(), DependencyType::Operational, false).unwrap();
        let result = add_dependency(state, "b".into(), "a".into(), DependencyType::Operational, false);
        assert!(result.is_ok());
    }

    #[test]
    fn seed_endpoints_advance_to_growth_on_first_edge() {
        let state = with_two_roles();
        assert_eq!(state.roles["a"].scale_stage, crate::model::role::ScaleStage::Seed);
        let (state, _) =
            add_dependency(state, "a".into(), "b".into(), DependencyType::Operational, false).unwrap();
        assert_eq!(state.roles["a"].scale_stage, crate::model::role::ScaleStage::Growth);
        assert_eq!(state.roles["b"].scale_stage, crate::model::role::ScaleStage::Growth);
    }
}
