//! The invariant validator (spec.md §4.2). A pure function over `OrgState`;
//! runs after every transition. A failure is fatal to the *event*, not the
//! kernel: the engine discards the candidate state and the log is untouched.
//!
//! Checks, in a fixed order so the first violation reported is deterministic:
//! 1. `ConstantsUnset` — constants must be set.
//! 2. `BadRoleId` — every role id still matches the format grammar.
//! 3. `EmptyResponsibilities` — every active role has ≥1 responsibility.
//! 4. `DanglingDependency` — every dependency's endpoints exist.
//! 5. `OrphanedInput` — every active role's required_input has an active
//!    producer. The data model has no reachable "explicitly isolated" flag
//!    (no event sets one — see DESIGN.md), so this check is unconditional.
//! 6. `CriticalCycle` — the critical-edge subgraph is acyclic.
//! 7. `OutOfRangeFixedPoint` — constraint vector components and
//!    `structural_debt` are non-negative and within the saturation cap.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::KernelError;
use crate::model::constraints::SATURATION_CAP_RAW;
use crate::model::role::validate_role_id;
use crate::model::state::OrgState;

pub fn validate(state: &OrgState) -> Result<(), KernelError> {
    if state.constants.is_none() {
        return Err(KernelError::ConstantsUnset);
    }

    for role in state.roles.values() {
        validate_role_id(&role.id)?;
        if role.active && role.responsibilities.is_empty() {
            return Err(KernelError::EmptyResponsibilities { role_id: role.id.clone() });
        }
    }

    for dep in &state.dependencies {
        if !state.roles.contains_key(&dep.from_role_id) {
            return Err(KernelError::DanglingDependency { role_id: dep.from_role_id.clone() });
        }
        if !state.roles.contains_key(&dep.to_role_id) {
            return Err(KernelError::DanglingDependency { role_id: dep.to_role_id.clone() });
        }
    }

    let mut producers: BTreeSet<&str> = BTreeSet::new();
    for role in state.roles.values() {
        if role.active {
            for output in &role.produced_outputs {
                producers.insert(output.as_str());
            }
        }
    }
    for role in state.roles.values() {
        if !role.active {
            continue;
        }
        for input in &role.required_inputs {
            if !producers.contains(input.as_str()) {
                return Err(KernelError::OrphanedInput {
                    role_id: role.id.clone(),
                    input: input.clone(),
                });
            }
        }
    }

    check_critical_acyclic(state)?;

    let cv = &state.constraints;
    for (name, v) in [
        ("capital", cv.capital),
        ("talent", cv.talent),
        ("time", cv.time),
        ("political_cost", cv.political_cost),
    ] {
        if v.is_negative() || v.raw() > SATURATION_CAP_RAW {
            return Err(KernelError::OutOfRangeFixedPoint {
                detail: format!("constraint '{name}' out of range"),
            });
        }
    }
    if state.structural_debt.is_negative() {
        return Err(KernelError::OutOfRangeFixedPoint {
            detail: "structural_debt must be non-negative".into(),
        });
    }

    Ok(())
}

/// DFS gray/black cycle check over the subgraph of `critical=true` edges,
/// visiting roles in canonical (lexicographic) id order for deterministic
/// error location (spec.md §4.3 `add_dependency`).
pub(crate) fn check_critical_acyclic(state: &OrgState) -> Result<(), KernelError> {
    let mut adjacency: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for dep in &state.dependencies {
        if dep.critical {
            adjacency
                .entry(dep.from_role_id.as_str())
                .or_default()
                .push(dep.to_role_id.as_str());
        }
    }
    for edges in adjacency.values_mut() {
        edges.sort_unstable();
    }

    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Mark {
        Gray,
        Black,
    }
    let mut marks: BTreeMap<&str, Mark> = BTreeMap::new();

    fn visit<'a>(
        node: &'a str,
        adjacency: &BTreeMap<&'a str, Vec<&'a str>>,
        marks: &mut BTreeMap<&'a str, Mark>,
    ) -> Result<(), KernelError> {
        marks.insert(node, Mark::Gray);
        if let Some(neighbors) = adjacency.get(node) {
            for &next in neighbors {
                match marks.get(next) {
                    Some(Mark::Gray) => {
                        return Err(KernelError::CriticalCycle {
                            detail: format!("cycle through '{next}'"),
                        });
                    }
                    Some(Mark::Black) => continue,
                    None => visit(next, adjacency, marks)?,
                }
            }
        }
        marks.insert(node, Mark::Black);
        Ok(())
    }

    let mut role_ids: Vec<&str> = state.roles.keys().map(|s| s.as_str()).collect();
    role_ids.sort_unstable();
    for role_id in role_ids {
        if !marks.contains_key(role_id) {
            visit(role_id, &adjacency, &mut marks)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::fixed::Fixed;
    use crate::model::constants::DomainConstants;
    use crate::model::dependency::{Dependency, DependencyType};
    use crate::model::role::Role;

    fn initialized_state() -> OrgState {
        let mut s = OrgState::genesis();
        s.constants = Some(
            DomainConstants::new(
                Fixed::from_whole(5).unwrap(),
                Fixed::from_whole(5).unwrap(),
                Fixed::from_whole(5).unwrap(),
                Fixed::from_whole(5).unwrap(),
                3,
                5,
            )
            .unwrap(),
        );
        s
    }

    #[test]
    fn unset_constants_is_rejected() {
        let s = OrgState::genesis();
        assert_eq!(validate(&s), Err(KernelError::ConstantsUnset));
    }

    #[test]
    fn valid_minimal_state_passes() {
        let s = initialized_state();
        assert!(validate(&s).is_ok());
    }

    #[test]
    fn empty_responsibilities_on_active_role_rejected() {
        let mut s = initialized_state();
        let mut r = Role::new("a".into(), "A".into(), "".into(), vec!["x".into()]).unwrap();
        r.responsibilities.clear();
        s.roles.insert("a".into(), r);
        assert!(matches!(validate(&s), Err(KernelError::EmptyResponsibilities { .. })));
    }

    #[test]
    fn inactive_role_may_have_empty_responsibilities() {
        let mut s = initialized_state();
        let mut r = Role::new("a".into(), "A".into(), "".into(), vec!["x".into()]).unwrap();
        r.responsibilities.clear();
        r.active = false;
        s.roles.insert("a".into(), r);
        assert!(validate(&s).is_ok());
    }

    #[test]
    fn dependency_to_missing_role_is_dangling() {
        let mut s = initialized_state();
        s.roles.insert(
            "a".into(),
            Role::new("a".into(), "A".into(), "".into(), vec!["x".into()]).unwrap(),
        );
        s.dependencies.push(Dependency {
            from_role_id: "a".into(),
            to_role_id: "ghost".into(),
            dependency_type: DependencyType::Operational,
            critical: false,
        });
        assert!(matches!(validate(&s), Err(KernelError::DanglingDependency { .. })));
    }

    #[test]
    fn required_input_with_no_producer_is_orphaned() {
        let mut s = initialized_state();
        let mut r = Role::new("a".into(), "A".into(), "".into(), vec!["x".into()]).unwrap();
        r.required_inputs.push("widget".into());
        s.roles.insert("a".into(), r);
        assert!(matches!(validate(&s), Err(KernelError::OrphanedInput { .. })));
    }

    #[test]
    fn required_input_with_active_producer_passes() {
        let mut s = initialized_state();
        let mut a = Role::new("a".into(), "A".into(), "".into(), vec!["x".into()]).unwrap();
        a.required_inputs.push("widget".into());
        let mut b = Role::new("b".into(), "B".into(), "".into(), vec!["x".into()]).unwrap();
        b.produced_outputs.push("widget".into());
        s.roles.insert("a".into(), a);
        s.roles.insert("b".into(), b);
        assert!(validate(&s).is_ok());
    }

    #[test]
    fn three_cycle_of_critical_edges_is_rejected() {
        let mut s = initialized_state();
        for id in ["a", "b", "c"] {
            s.roles.insert(
                id.into(),
                Role::new(id.into(), id.to_uppercase(), "".into(), vec!["x".into()]).unwrap(),
            );
        }
        for (from, to) in [("a", "b"), ("b", "c"), ("c", "a")] {
            s.dependencies.push(Dependency {
                from_role_id: from.into(),
                to_role_id: to.into(),
                dependency_type: DependencyType::Operational,
                critical: true,
            });
        }
        assert!(matches!(validate(&s), Err(KernelError::CriticalCycle { .. })));
    }

    #[test]
    fn non_critical_cycle_is_permitted() {
        let mut s = initialized_state();
        for id in ["a", "b"] {
            s.roles.insert(
                id.into(),
                Role::new(id.into(), id.to_uppercase(), "".into(), vec!["x".into()]).unwrap(),
            );
        }
        for (from, to) in [("a", "b"), ("b", "a")] {
            s.dependencies.push(Dependency {
                from_role_id: from.into(),
                to_role_id: to.into(),
                dependency_type: DependencyType::Operational,
                critical: false,
            });
        }
        assert!(validate(&s).is_ok());
    }

    #[test]
    fn negative_constraint_component_is_out_of_range() {
        let mut s = initialized_state();
        s.constraints.capital = Fixed::from_raw(-1);
        assert!(matches!(validate(&s), Err(KernelError::OutOfRangeFixedPoint { .. })));
    }

    #[test]
    fn negative_structural_debt_is_out_of_range() {
        let mut s = initialized_state();
        s.structural_debt = Fixed::from_raw(-1);
        assert!(matches!(validate(&s), Err(KernelError::OutOfRangeFixedPoint { .. })));
    }
}
