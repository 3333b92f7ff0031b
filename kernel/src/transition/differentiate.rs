//! `differentiate_role` (spec.md §4.3, scenario 5).
//!
//! Decisions not pinned numerically by the specification (recorded in
//! DESIGN.md):
//! - "cost" for the capital/talent gate is
//!   `Fixed::from_whole(differentiation_threshold)` — reusing the already
//!   configured threshold rather than an unconfigurable magic constant.
//! - On an odd-length responsibilities list, the lower half (which stays
//!   with the original role) keeps the extra element.
//! - The new role's id is `<id>_d<n>`, the smallest `n ≥ 1` not already in
//!   use.
//! - Differentiation does not debit capital/talent; the constraint check is
//!   a pure gate, not a spend (the spec states the gate but never a delta
//!   to apply afterward).

use crate::error::KernelError;
use crate::math::fixed::Fixed;
use crate::model::dependency::insert_sorted;
use crate::model::result::TransitionResult;
use crate::model::role::ScaleStage;
use crate::model::state::OrgState;

pub fn differentiate_role(
    mut state: OrgState,
    role_id: String,
) -> Result<(OrgState, TransitionResult), KernelError> {
    let constants = state.constants.clone().ok_or(KernelError::ConstantsUnset)?;
    let role = state
        .roles
        .get(&role_id)
        .filter(|r| r.active)
        .ok_or_else(|| KernelError::UnknownRole { role_id: role_id.clone() })?
        .clone();

    let (fan_in, _) = state.degree(&role_id);
    let threshold = constants.differentiation_threshold;

    if (fan_in as i64) < threshold {
        let debt = state.structural_debt;
        let mut result =
            TransitionResult::plain("differentiate_role", "fan-in below threshold, skipped", debt);
        result.differentiation_skipped = true;
        return Ok((state, result));
    }

    let cost = Fixed::from_whole(threshold)?;
    let capacity_allows = state.constraints.capital >= cost && state.constraints.talent >= cost;

    if !capacity_allows {
        let secondary_debt = Fixed::from_whole((fan_in as i64) - threshold)?;
        state.structural_debt = state.structural_debt.checked_add(secondary_debt)?;
        let mut result = TransitionResult::plain(
            "differentiate_role",
            "threshold met but constraints refused; suppressed",
            state.structural_debt,
        );
        result.suppressed_differentiation = true;
        result.secondary_debt = secondary_debt;
        return Ok((state, result));
    }

    let mut n = 1u32;
    let new_id = loop {
        let candidate = format!("{role_id}_d{n}");
        if !state.roles.contains_key(&candidate) {
            break candidate;
        }
        n += 1;
    };

    let mut sorted_responsibilities = role.responsibilities.clone();
    sorted_responsibilities.sort();
    let mid = sorted_responsibilities.len().div_ceil(2);
    let (lower, upper) = sorted_responsibilities.split_at(mid);

    let mut original = role.clone();
    original.responsibilities = lower.to_vec();
    original.scale_stage = ScaleStage::Structured;

    let mut fresh = role.clone();
    fresh.id = new_id.clone();
    fresh.responsibilities = upper.to_vec();
    fresh.scale_stage = ScaleStage::Structured;

    state.roles.insert(role_id.clone(), original);
    state.roles.insert(new_id.clone(), fresh);

    // Re-point incoming dependencies round-robin, in canonical order.
    let incoming_positions: Vec<usize> = state
        .dependencies
        .iter()
        .enumerate()
        .filter(|(_, d)| d.to_role_id == role_id)
        .map(|(i, _)| i)
        .collect();

    let mut repointed = Vec::new();
    for (slot, &idx) in incoming_positions.iter().enumerate() {
        if slot % 2 == 1 {
            let mut dep = state.dependencies[idx].clone();
            dep.to_role_id = new_id.clone();
            repointed.push((idx, dep));
        }
    }
    for &(idx, _) in repointed.iter().rev() {
        state.dependencies.remove(idx);
    }
    for (_, dep) in repointed {
        let exists = state.dependencies.iter().any(|d| {
            d.from_role_id == dep.from_role_id
                && d.to_role_id == dep.to_role_id
                && d.dependency_type == dep.dependency_type
        });
        if exists {
            // Re-pointing collided with an existing edge; collapse by OR-ing
            // the critical flag instead of inserting a duplicate.
            if let Some(existing) = state.dependencies.iter_mut().find(|d| {
                d.from_role_id == dep.from_role_id
                    && d.to_role_id == dep.to_role_id
                    && d.dependency_type == dep.dependency_type
            }) {
                existing.critical = existing.critical || dep.critical;
            }
        } else {
            insert_sorted(&mut state.dependencies, dep);
        }
    }

    let debt = state.structural_debt;
    let mut result = TransitionResult::plain(
        "differentiate_role",
        format!("role '{role_id}' differentiated into '{new_id}'"),
        debt,
    );
    result.differentiation_executed = true;
    Ok((state, result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::constants::DomainConstants;
    use crate::model::dependency::{Dependency, DependencyType};
    use crate::transition::roles::add_role;

    fn setup(fan_in_targets: usize, capital: i64, talent: i64, threshold: i64) -> OrgState {
        let mut state = OrgState::genesis();
        state.constants = Some(
            DomainConstants::new(
                Fixed::from_whole(capital).unwrap(),
                Fixed::from_whole(talent).unwrap(),
                Fixed::zero(),
                Fixed::zero(),
                threshold,
                5,
            )
            .unwrap(),
        );
        state.constraints = crate::model::constraints::ConstraintVector::from_constants(
            Fixed::from_whole(capital).unwrap(),
            Fixed::from_whole(talent).unwrap(),
            Fixed::zero(),
            Fixed::zero(),
        );
        let (mut state, _) =
            add_role(state.clone(), "target".into(), "T".into(), "".into(), vec!["r1".into(), "r2".into()])
                .unwrap();
        for i in 0..fan_in_targets {
            let id = format!("src{i}");
            let (s, _) = add_role(state, id.clone(), id.clone(), "".into(), vec!["x".into()]).unwrap();
            state = s;
            state.dependencies.push(Dependency {
                from_role_id: id,
                to_role_id: "target".into(),
                dependency_type: DependencyType::Operational,
                critical: false,
            });
        }
        state
    }

    #[test]
    fn below_threshold_is_skipped_not_an_error() {
        let state = setup(1, 100, 100, 3);
        let (_, result) = differentiate_role(state, "target".into()).unwrap();
        assert!(result.differentiation_skipped);
        assert!(!result.differentiation_executed);
    }

    #[test]
    fn scenario_5_suppressed_when_constraints_refuse() {
        let state = setup(5, 1, 1, 3);
        let (state, result) = differentiate_role(state, "target".into()).unwrap();
        assert!(result.suppressed_differentiation);
        assert_eq!(result.secondary_debt, Fixed::from_whole(2).unwrap());
        assert!(!state.roles.contains_key("target_d1"));
    }

    #[test]
    fn executes_split_when_threshold_met_and_capacity_allows() {
        let state = setup(4, 100, 100, 3);
        let (state, result) = differentiate_role(state, "target".into()).unwrap();
        assert!(result.differentiation_executed);
        assert!(state.roles.contains_key("target_d1"));
        assert_eq!(state.roles["target"].responsibilities, vec!["r1".to_string()]);
        assert_eq!(state.roles["target_d1"].responsibilities, vec!["r2".to_string()]);
    }

    #[test]
    fn unknown_role_is_rejected() {
        let state = setup(0, 10, 10, 3);
        assert!(matches!(
            differentiate_role(state, "ghost".into()),
            Err(KernelError::UnknownRole { .. })
        ));
    }
}
