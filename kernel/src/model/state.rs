//! `OrgState` — the value-semantics container the orchestrator owns
//! exclusively (spec.md §3). Transitions receive a state by value and
//! return a new one; there is no aliasing and no interior mutability.

use std::collections::BTreeMap;

use crate::canon::hash::Digest;
use crate::math::fixed::Fixed;
use crate::model::constants::DomainConstants;
use crate::model::constraints::ConstraintVector;
use crate::model::dependency::Dependency;
use crate::model::role::Role;

/// The full simulation state at a point in the event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgState {
    /// `None` until `initialize_constants` has been applied.
    pub constants: Option<DomainConstants>,
    /// Ordered by `role_id` (`BTreeMap` gives deterministic iteration for
    /// free; no sort pass needed at serialization time).
    pub roles: BTreeMap<String, Role>,
    /// Always kept in canonical order: `(from_role_id, to_role_id,
    /// dependency_type)`.
    pub dependencies: Vec<Dependency>,
    pub constraints: ConstraintVector,
    pub structural_debt: Fixed,
    pub event_count: u64,
    pub prev_state_hash: Digest,
    /// Bookkeeping beyond the spec's literal table: needed to enforce
    /// `compression_limit` deterministically from replay alone. Part of
    /// this crate's own canonical-serialization whitelist.
    pub compression_count: u32,
}

impl OrgState {
    /// The state before any event has been applied: no constants, no
    /// roles, zero debt, the all-zero digest as `prev_state_hash`.
    pub fn genesis() -> Self {
        OrgState {
            constants: None,
            roles: BTreeMap::new(),
            dependencies: Vec::new(),
            constraints: ConstraintVector::from_constants(
                Fixed::zero(),
                Fixed::zero(),
                Fixed::zero(),
                Fixed::zero(),
            ),
            structural_debt: Fixed::zero(),
            event_count: 0,
            prev_state_hash: [0u8; 32],
            compression_count: 0,
        }
    }

    pub fn active_role_ids(&self) -> impl Iterator<Item = &str> {
        self.roles.values().filter(|r| r.active).map(|r| r.id.as_str())
    }

    pub fn active_role_count(&self) -> usize {
        self.roles.values().filter(|r| r.active).count()
    }

    /// Active in-degree and out-degree of `role_id` over edges whose
    /// counterpart role is also active.
    pub fn degree(&self, role_id: &str) -> (usize, usize) {
        let mut in_degree = 0usize;
        let mut out_degree = 0usize;
        for dep in &self.dependencies {
            let from_active = self.roles.get(&dep.from_role_id).is_some_and(|r| r.active);
            let to_active = self.roles.get(&dep.to_role_id).is_some_and(|r| r.active);
            if !from_active || !to_active {
                continue;
            }
            if dep.to_role_id == role_id {
                in_degree += 1;
            }
            if dep.from_role_id == role_id {
                out_degree += 1;
            }
        }
        (in_degree, out_degree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_has_no_constants_and_zero_debt() {
        let s = OrgState::genesis();
        assert!(s.constants.is_none());
        assert_eq!(s.structural_debt, Fixed::zero());
        assert_eq!(s.event_count, 0);
        assert_eq!(s.prev_state_hash, [0u8; 32]);
    }

    #[test]
    fn degree_ignores_inactive_roles() {
        let mut s = OrgState::genesis();
        let mut a = Role::new("a".into(), "A".into(), "".into(), vec!["x".into()]).unwrap();
        a.active = false;
        s.roles.insert("a".into(), a);
        s.roles.insert(
            "b".into(),
            Role::new("b".into(), "B".into(), "".into(), vec!["x".into()]).unwrap(),
        );
        s.dependencies.push(Dependency {
            from_role_id: "a".into(),
            to_role_id: "b".into(),
            dependency_type: crate::model::dependency::DependencyType::Operational,
            critical: false,
        });
        assert_eq!(s.degree("b"), (0, 0));
    }
}
