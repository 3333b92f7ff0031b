//! `compress_roles` (spec.md §4.3). Merges `source_role_id` into
//! `target_role_id`, deactivates the source, rewrites dependencies, and
//! collapses any duplicates the rewrite produces (including self-loops
//! created when both endpoints of a rewritten edge land on `target`).

use crate::error::KernelError;
use crate::model::result::TransitionResult;
use crate::model::role::ScaleStage;
use crate::model::state::OrgState;

fn union_stable(base: &[String], incoming: &[String]) -> Vec<String> {
    let mut out = base.to_vec();
    for item in incoming {
        if !out.contains(item) {
            out.push(item.clone());
        }
    }
    out
}

pub fn compress_roles(
    mut state: OrgState,
    source_role_id: String,
    target_role_id: String,
) -> Result<(OrgState, TransitionResult), KernelError> {
    if source_role_id == target_role_id {
        return Err(KernelError::BadRoleId {
            role_id: source_role_id,
            detail: "cannot compress a role into itself".into(),
        });
    }
    let compression_limit = state
        .constants
        .as_ref()
        .ok_or(KernelError::ConstantsUnset)?
        .compression_limit;
    if state.compression_count >= compression_limit {
        return Err(KernelError::CompressionLimit);
    }

    let source = state
        .roles
        .get(&source_role_id)
        .filter(|r| r.active)
        .cloned()
        .ok_or_else(|| KernelError::UnknownRole { role_id: source_role_id.clone() })?;
    {
        let target = state
            .roles
            .get(&target_role_id)
            .filter(|r| r.active)
            .ok_or_else(|| KernelError::UnknownRole { role_id: target_role_id.clone() })?;
        let _ = target;
    }

    {
        let target = state.roles.get_mut(&target_role_id).unwrap();
        target.responsibilities = union_stable(&target.responsibilities, &source.responsibilities);
        target.required_inputs = union_stable(&target.required_inputs, &source.required_inputs);
        target.produced_outputs = union_stable(&target.produced_outputs, &source.produced_outputs);
        target.scale_stage = ScaleStage::Mature;
    }
    state.roles.get_mut(&source_role_id).unwrap().active = false;

    for dep in state.dependencies.iter_mut() {
        if dep.from_role_id == source_role_id {
            dep.from_role_id = target_role_id.clone();
        }
        if dep.to_role_id == source_role_id {
            dep.to_role_id = target_role_id.clone();
        }
    }
    state.dependencies.retain(|dep| dep.from_role_id != dep.to_role_id);

    let mut deduped: Vec<crate::model::dependency::Dependency> = Vec::new();
    for dep in state.dependencies.drain(..) {
        if let Some(existing) = deduped.iter_mut().find(|d: &&mut crate::model::dependency::Dependency| {
            d.from_role_id == dep.from_role_id
                && d.to_role_id == dep.to_role_id
                && d.dependency_type == dep.dependency_type
        }) {
            existing.critical = existing.critical || dep.critical;
        } else {
            deduped.push(dep);
        }
    }
    deduped.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    state.dependencies = deduped;

    state.compression_count += 1;

    let debt = state.structural_debt;
    let mut result = TransitionResult::plain(
        "compress_roles",
        format!("role '{source_role_id}' compressed into '{target_role_id}'"),
        debt,
    );
    result.compression_executed = true;
    result.deactivated.push(source_role_id);
    Ok((state, result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::fixed::Fixed;
    use crate::model::constants::DomainConstants;
    use crate::model::dependency::{Dependency, DependencyType};
    use crate::transition::roles::add_role;

    fn setup(compression_limit: u32) -> OrgState {
        let mut state = OrgState::genesis();
        state.constants = Some(
            DomainConstants::new(Fixed::zero(), Fixed::zero(), Fixed::zero(), Fixed::zero(), 3, compression_limit)
                .unwrap(),
        );
        let (state, _) =
            add_role(state, "a".into(), "A".into(), "".into(), vec!["r1".into()]).unwrap();
        let (state, _) =
            add_role(state, "b".into(), "B".into(), "".into(), vec!["r2".into()]).unwrap();
        state
    }

    #[test]
    fn merges_responsibilities_and_deactivates_source() {
        let state = setup(5);
        let (state, result) = compress_roles(state, "a".into(), "b".into()).unwrap();
        assert!(!state.roles["a"].active);
        assert!(state.roles["b"].responsibilities.contains(&"r1".to_string()));
        assert!(state.roles["b"].responsibilities.contains(&"r2".to_string()));
        assert_eq!(result.deactivated, vec!["a".to_string()]);
    }

    #[test]
    fn rewritten_self_loop_is_dropped() {
        let mut state = setup(5);
        state.dependencies.push(Dependency {
            from_role_id: "a".into(),
            to_role_id: "b".into(),
            dependency_type: DependencyType::Operational,
            critical: false,
        });
        let (state, _) = compress_roles(state, "a".into(), "b".into()).unwrap();
        assert!(state.dependencies.is_empty());
    }

    #[test]
    fn compression_limit_is_enforced() {
        let state = setup(0);
        assert!(matches!(
            compress_roles(state, "a".into(), "b".into()),
            Err(KernelError::CompressionLimit)
        ));
    }

    #[test]
    fn self_compress_is_rejected() {
        let state = setup(5);
        assert!(matches!(
            compress_roles(state, "a".into(), "a".into()),
            Err(KernelError::BadRoleId { .. })
        ));
    }
}
