//! `add_role` and `remove_role` (spec.md §4.3).

use crate::error::KernelError;
use crate::model::result::TransitionResult;
use crate::model::role::Role;
use crate::model::state::OrgState;

pub fn add_role(
    mut state: OrgState,
    id: String,
    name: String,
    purpose: String,
    responsibilities: Vec<String>,
) -> Result<(OrgState, TransitionResult), KernelError> {
    if state.roles.contains_key(&id) {
        return Err(KernelError::BadRoleId { role_id: id, detail: "already_exists".into() });
    }
    let role = Role::new(id.clone(), name, purpose, responsibilities)?;
    state.roles.insert(id.clone(), role);

    let debt = state.structural_debt;
    let result = TransitionResult::plain("add_role", format!("role '{id}' added"), debt);
    Ok((state, result))
}

/// Deactivates the role (it is never removed from the map — a re-added
/// role with the same id is always rejected, per spec.md §4.3's role state
/// machine) and cascades: every dependency touching it is deleted in the
/// same transition.
pub fn remove_role(mut state: OrgState, role_id: String) -> Result<(OrgState, TransitionResult), KernelError> {
    let role = state
        .roles
        .get_mut(&role_id)
        .ok_or_else(|| KernelError::UnknownRole { role_id: role_id.clone() })?;
    role.active = false;

    state
        .dependencies
        .retain(|dep| dep.from_role_id != role_id && dep.to_role_id != role_id);

    let debt = state.structural_debt;
    let mut result = TransitionResult::plain("remove_role", format!("role '{role_id}' removed"), debt);
    result.deactivated.push(role_id);
    Ok((state, result))
}
