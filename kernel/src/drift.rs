//! Drift detector (spec.md §4.8): compares the declared organization (the
//! external classification taxonomy) against the structural organization
//! (clusters derived purely from the dependency graph). Detects three
//! things:
//! - `divergence_ratio` — the share of declared roles whose structural
//!   cluster's majority label disagrees with their own declared label.
//! - phantom departments — a declared tag that never wins the majority
//!   vote in any structural cluster, i.e. a department with no structural
//!   footprint.
//! - hidden couplings — pairs of roles declared under different tags that
//!   nonetheless land in the same structural cluster with at least
//!   `HIDDEN_COUPLING_EDGE_THRESHOLD` edges between them.

use std::collections::{BTreeMap, BTreeSet};

use crate::cluster::ClusterInfo;
use crate::math::fixed::{Fixed, SCALE};
use crate::model::state::OrgState;
use crate::semantic::{ClassificationDb, SemanticLabel};

/// `K` in "hidden coupling: ≥K edges". Part of this kernel's version
/// identity in the same sense as `cluster::CLUSTER_EPSILON_RAW` — it does
/// not change a golden hash (drift output isn't hashed into `OrgState`),
/// but it is pinned here so repeated runs against the same data agree.
pub const HIDDEN_COUPLING_EDGE_THRESHOLD: i64 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleDriftEntry {
    pub role_id: String,
    pub declared_label: Option<String>,
    pub structural_cluster_id: String,
    pub structural_label: String,
    pub diverges: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriftReport {
    pub divergence_ratio: Fixed,
    pub phantom_departments: Vec<String>,
    pub hidden_couplings: Vec<(String, String, i64)>,
    pub roles: Vec<RoleDriftEntry>,
}

fn undirected_edge_counts(state: &OrgState) -> BTreeMap<(String, String), i64> {
    let mut counts: BTreeMap<(String, String), i64> = BTreeMap::new();
    for dep in &state.dependencies {
        let from_active = state.roles.get(&dep.from_role_id).is_some_and(|r| r.active);
        let to_active = state.roles.get(&dep.to_role_id).is_some_and(|r| r.active);
        if !from_active || !to_active {
            continue;
        }
        let key = if dep.from_role_id <= dep.to_role_id {
            (dep.from_role_id.clone(), dep.to_role_id.clone())
        } else {
            (dep.to_role_id.clone(), dep.from_role_id.clone())
        };
        *counts.entry(key).or_insert(0) += 1;
    }
    counts
}

pub fn detect_drift(
    state: &OrgState,
    clusters: &[ClusterInfo],
    labels: &[SemanticLabel],
    db: &dyn ClassificationDb,
) -> DriftReport {
    let label_by_cluster: BTreeMap<&str, &str> =
        labels.iter().map(|l| (l.cluster_id.as_str(), l.label.as_str())).collect();

    let mut cluster_of_role: BTreeMap<&str, &str> = BTreeMap::new();
    for cluster in clusters {
        for role_id in &cluster.role_ids {
            cluster_of_role.insert(role_id.as_str(), cluster.cluster_id.as_str());
        }
    }

    let mut roles = Vec::new();
    let mut declared_count = 0i64;
    let mut diverging_count = 0i64;
    let mut declared_tags: BTreeSet<String> = BTreeSet::new();

    for role in state.roles.values().filter(|r| r.active) {
        let declared = db.classify(&role.id).map(str::to_string);
        let structural_cluster_id = cluster_of_role.get(role.id.as_str()).copied().unwrap_or("").to_string();
        let structural_label = label_by_cluster.get(structural_cluster_id.as_str()).copied().unwrap_or("").to_string();

        let diverges = match &declared {
            Some(tag) => {
                declared_count += 1;
                declared_tags.insert(tag.clone());
                let diverges = tag != &structural_label;
                if diverges {
                    diverging_count += 1;
                }
                diverges
            }
            None => false,
        };

        roles.push(RoleDriftEntry { role_id: role.id.clone(), declared_label: declared, structural_cluster_id, structural_label, diverges });
    }
    roles.sort_by(|a, b| a.role_id.cmp(&b.role_id));

    let divergence_ratio = if declared_count == 0 {
        Fixed::zero()
    } else {
        Fixed::from_raw(diverging_count * SCALE).div_scaled(Fixed::from_raw(declared_count)).unwrap_or(Fixed::zero())
    };

    let structural_labels: BTreeSet<&str> = label_by_cluster.values().copied().collect();
    let phantom_departments: Vec<String> =
        declared_tags.into_iter().filter(|tag| !structural_labels.contains(tag.as_str())).collect();

    let edge_counts = undirected_edge_counts(state);
    let mut hidden_couplings = Vec::new();
    for ((a, b), count) in edge_counts {
        if count < HIDDEN_COUPLING_EDGE_THRESHOLD {
            continue;
        }
        let cluster_a = cluster_of_role.get(a.as_str());
        let cluster_b = cluster_of_role.get(b.as_str());
        if cluster_a.is_none() || cluster_a != cluster_b {
            continue;
        }
        let tag_a = db.classify(&a);
        let tag_b = db.classify(&b);
        if let (Some(ta), Some(tb)) = (tag_a, tag_b) {
            if ta != tb {
                hidden_couplings.push((a, b, count));
            }
        }
    }

    DriftReport { divergence_ratio, phantom_departments, hidden_couplings, roles }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::dependency::{Dependency, DependencyType};
    use crate::model::role::Role;

    struct MapDb(BTreeMap<String, String>);
    impl ClassificationDb for MapDb {
        fn classify(&self, role_id: &str) -> Option<&str> {
            self.0.get(role_id).map(|s| s.as_str())
        }
    }

    fn role(id: &str) -> Role {
        Role::new(id.into(), id.to_uppercase(), "".into(), vec!["x".into()]).unwrap()
    }

    #[test]
    fn no_classification_means_zero_divergence_and_no_phantoms() {
        let mut state = OrgState::genesis();
        state.roles.insert("a".into(), role("a"));
        let clusters = crate::cluster::cluster(&state).clusters;
        let db = crate::semantic::NullClassificationDb;
        let labels = crate::semantic::label_clusters(&clusters, &db);
        let report = detect_drift(&state, &clusters, &labels, &db);
        assert_eq!(report.divergence_ratio, Fixed::zero());
        assert!(report.phantom_departments.is_empty());
    }

    #[test]
    fn declared_department_with_no_structural_majority_is_phantom() {
        let mut state = OrgState::genesis();
        state.roles.insert("a".into(), role("a"));
        state.roles.insert("b".into(), role("b"));
        state.dependencies.push(Dependency {
            from_role_id: "a".into(),
            to_role_id: "b".into(),
            dependency_type: DependencyType::Operational,
            critical: false,
        });
        let mut map = BTreeMap::new();
        map.insert("a".to_string(), "Ghost".to_string());
        map.insert("b".to_string(), "Ghost2".to_string());
        let db = MapDb(map);
        let clusters = crate::cluster::cluster(&state).clusters;
        let labels = crate::semantic::label_clusters(&clusters, &db);
        let report = detect_drift(&state, &clusters, &labels, &db);
        assert_eq!(report.phantom_departments.len(), 1);
    }

    #[test]
    fn tightly_coupled_cross_department_roles_are_a_hidden_coupling() {
        let mut state = OrgState::genesis();
        state.roles.insert("a".into(), role("a"));
        state.roles.insert("b".into(), role("b"));
        for dep_type in [DependencyType::Operational, DependencyType::Informational] {
            state.dependencies.push(Dependency {
                from_role_id: "a".into(),
                to_role_id: "b".into(),
                dependency_type: dep_type,
                critical: false,
            });
        }
        let mut map = BTreeMap::new();
        map.insert("a".to_string(), "Engineering".to_string());
        map.insert("b".to_string(), "Finance".to_string());
        let db = MapDb(map);
        let clusters = crate::cluster::cluster(&state).clusters;
        let labels = crate::semantic::label_clusters(&clusters, &db);
        let report = detect_drift(&state, &clusters, &labels, &db);
        assert_eq!(report.hidden_couplings, vec![("a".to_string(), "b".to_string(), 2)]);
    }
}
