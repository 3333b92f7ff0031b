//! Graph analysis over `OrgState` (spec.md §4.5): structural density,
//! isolated roles, per-role ego density. Read-only; never mutates state.

use std::collections::BTreeSet;

use crate::math::fixed::{Fixed, SCALE};
use crate::model::state::OrgState;

/// `edges * SCALE / (n * (n-1))` for `n ≥ 2` active roles, else `0`. `edges`
/// counts dependencies whose both endpoints are active roles.
pub fn structural_density(state: &OrgState) -> Fixed {
    let n = state.active_role_count() as i64;
    if n < 2 {
        return Fixed::zero();
    }
    let edges = active_edge_count(state, None);
    let numerator = Fixed::from_raw(edges * SCALE);
    let denominator = Fixed::from_raw(n * (n - 1));
    numerator.div_scaled(denominator).unwrap_or(Fixed::zero())
}

fn active_edge_count(state: &OrgState, restrict_to: Option<&BTreeSet<&str>>) -> i64 {
    state
        .dependencies
        .iter()
        .filter(|dep| {
            let from_active = state.roles.get(&dep.from_role_id).is_some_and(|r| r.active);
            let to_active = state.roles.get(&dep.to_role_id).is_some_and(|r| r.active);
            if !from_active || !to_active {
                return false;
            }
            match restrict_to {
                None => true,
                Some(set) => set.contains(dep.from_role_id.as_str()) && set.contains(dep.to_role_id.as_str()),
            }
        })
        .count() as i64
}

/// Active roles with zero in-degree and zero out-degree, in canonical order.
pub fn isolated_roles(state: &OrgState) -> Vec<String> {
    state
        .roles
        .values()
        .filter(|r| r.active)
        .filter(|r| state.degree(&r.id) == (0, 0))
        .map(|r| r.id.clone())
        .collect()
}

/// Density of `role_id`'s 1-hop ego subgraph: the role plus every role
/// directly connected to it by an active dependency, and the edges among
/// that node set.
pub fn ego_density(state: &OrgState, role_id: &str) -> Fixed {
    let mut members: BTreeSet<&str> = BTreeSet::new();
    members.insert(role_id);
    for dep in &state.dependencies {
        let from_active = state.roles.get(&dep.from_role_id).is_some_and(|r| r.active);
        let to_active = state.roles.get(&dep.to_role_id).is_some_and(|r| r.active);
        if !from_active || !to_active {
            continue;
        }
        if dep.from_role_id == role_id {
            members.insert(dep.to_role_id.as_str());
        }
        if dep.to_role_id == role_id {
            members.insert(dep.from_role_id.as_str());
        }
    }

    let n = members.len() as i64;
    if n < 2 {
        return Fixed::zero();
    }
    let edges = active_edge_count(state, Some(&members));
    let numerator = Fixed::from_raw(edges * SCALE);
    let denominator = Fixed::from_raw(n * (n - 1));
    numerator.div_scaled(denominator).unwrap_or(Fixed::zero())
}

/// `true` if the critical-edge subgraph contains a cycle (spec.md §4.5).
/// Exposed for diagnostics warnings; `validate` enforces this as a hard
/// invariant already, so a `true` here should never be observable on a
/// state that passed `validate`.
pub fn has_critical_cycle(state: &OrgState) -> bool {
    crate::validate::check_critical_acyclic(state).is_err()
}
