//! `Dependency` — a directed edge in the organization graph (spec.md §3).

/// The kind of dependency between two roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DependencyType {
    Operational,
    Informational,
    Governance,
}

impl DependencyType {
    /// The canonical wire string for this variant (used by `canon::json`).
    pub fn as_str(self) -> &'static str {
        match self {
            DependencyType::Operational => "operational",
            DependencyType::Informational => "informational",
            DependencyType::Governance => "governance",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "operational" => Some(DependencyType::Operational),
            "informational" => Some(DependencyType::Informational),
            "governance" => Some(DependencyType::Governance),
            _ => None,
        }
    }
}

/// A directed, typed edge between two roles.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Dependency {
    pub from_role_id: String,
    pub to_role_id: String,
    pub dependency_type: DependencyType,
    pub critical: bool,
}

impl Dependency {
    /// The canonical sort key: `(from_role_id, to_role_id, dependency_type)`
    /// (spec.md §4.1).
    pub fn sort_key(&self) -> (&str, &str, DependencyType) {
        (&self.from_role_id, &self.to_role_id, self.dependency_type)
    }
}

/// Insert `dep` into `deps`, keeping the list sorted by canonical order.
/// Used by every transition that adds a dependency, so the invariant "the
/// dependency list is always canonically ordered" never needs a separate
/// sort pass at serialization time.
pub fn insert_sorted(deps: &mut Vec<Dependency>, dep: Dependency) {
    let pos = deps
        .binary_search_by(|d| d.sort_key().cmp(&dep.sort_key()))
        .unwrap_or_else(|e| e);
    deps.insert(pos, dep);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dep(from: &str, to: &str, t: DependencyType) -> Dependency {
        Dependency {
            from_role_id: from.into(),
            to_role_id: to.into(),
            dependency_type: t,
            critical: false,
        }
    }

    #[test]
    fn insert_sorted_keeps_canonical_order() {
        let mut deps = Vec::new();
        insert_sorted(&mut deps, dep("b", "a", DependencyType::Operational));
        insert_sorted(&mut deps, dep("a", "z", DependencyType::Operational));
        insert_sorted(&mut deps, dep("a", "a", DependencyType::Governance));
        let keys: Vec<_> = deps.iter().map(|d| d.sort_key()).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn dependency_type_round_trips_through_strings() {
        for t in [
            DependencyType::Operational,
            DependencyType::Informational,
            DependencyType::Governance,
        ] {
            assert_eq!(DependencyType::parse(t.as_str()), Some(t));
        }
    }
}
