//! Semantic projection (spec.md §4.7): labels each structural cluster with
//! the majority classification tag of its members. Purely a read-only
//! consumer of an injected `ClassificationDb` — no process-wide singleton,
//! no mutation of kernel state. A cluster with no classified members (or no
//! members at all) is labeled `"Unclassified"`.

use std::collections::BTreeMap;

use crate::cluster::ClusterInfo;
use crate::math::fixed::{Fixed, SCALE};

pub const UNCLASSIFIED: &str = "Unclassified";

/// Read-only lookup from role id to an externally declared semantic tag
/// (e.g. "Engineering", "Finance"). Implementations are injected by the
/// caller at projection time; the kernel ships no built-in classification
/// data.
pub trait ClassificationDb {
    fn classify(&self, role_id: &str) -> Option<&str>;
}

/// A `ClassificationDb` that knows nothing: every role is unclassified.
/// Used where the caller has no external taxonomy to inject.
pub struct NullClassificationDb;

impl ClassificationDb for NullClassificationDb {
    fn classify(&self, _role_id: &str) -> Option<&str> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemanticLabel {
    pub cluster_id: String,
    pub label: String,
    pub confidence: Fixed,
}

/// Majority-vote label for one cluster. Ties broken by lexicographically
/// smallest tag. `confidence = dominant_count * SCALE / total_members`.
fn label_cluster(cluster: &ClusterInfo, db: &dyn ClassificationDb) -> SemanticLabel {
    let mut votes: BTreeMap<&str, i64> = BTreeMap::new();
    for role_id in &cluster.role_ids {
        if let Some(tag) = db.classify(role_id) {
            *votes.entry(tag).or_insert(0) += 1;
        }
    }

    let total = cluster.role_ids.len() as i64;
    if votes.is_empty() || total == 0 {
        return SemanticLabel {
            cluster_id: cluster.cluster_id.clone(),
            label: UNCLASSIFIED.to_string(),
            confidence: Fixed::zero(),
        };
    }

    let mut best_tag: &str = "";
    let mut best_count: i64 = -1;
    for (&tag, &count) in &votes {
        if count > best_count {
            best_count = count;
            best_tag = tag;
        }
    }

    let confidence = Fixed::from_raw(best_count * SCALE).div_scaled(Fixed::from_raw(total)).unwrap_or(Fixed::zero());
    SemanticLabel { cluster_id: cluster.cluster_id.clone(), label: best_tag.to_string(), confidence }
}

/// Label every cluster in `clusters`, in the order given.
pub fn label_clusters(clusters: &[ClusterInfo], db: &dyn ClassificationDb) -> Vec<SemanticLabel> {
    clusters.iter().map(|c| label_cluster(c, db)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::ClusterInfo;

    struct MapDb(BTreeMap<String, String>);
    impl ClassificationDb for MapDb {
        fn classify(&self, role_id: &str) -> Option<&str> {
            self.0.get(role_id).map(|s| s.as_str())
        }
    }

    fn cluster(ids: &[&str]) -> ClusterInfo {
        ClusterInfo {
            cluster_id: "x".into(),
            role_ids: ids.iter().map(|s| s.to_string()).collect(),
            internal_density: Fixed::zero(),
        }
    }

    #[test]
    fn empty_classification_yields_unclassified() {
        let db = NullClassificationDb;
        let label = label_cluster(&cluster(&["a", "b"]), &db);
        assert_eq!(label.label, UNCLASSIFIED);
        assert_eq!(label.confidence, Fixed::zero());
    }

    #[test]
    fn majority_tag_wins() {
        let mut map = BTreeMap::new();
        map.insert("a".to_string(), "Engineering".to_string());
        map.insert("b".to_string(), "Engineering".to_string());
        map.insert("c".to_string(), "Finance".to_string());
        let db = MapDb(map);
        let label = label_cluster(&cluster(&["a", "b", "c"]), &db);
        assert_eq!(label.label, "Engineering");
        assert_eq!(label.confidence, Fixed::from_raw(6666));
    }

    #[test]
    fn ties_break_lexicographically() {
        let mut map = BTreeMap::new();
        map.insert("a".to_string(), "Zeta".to_string());
        map.insert("b".to_string(), "Alpha".to_string());
        let db = MapDb(map);
        let label = label_cluster(&cluster(&["a", "b"]), &db);
        assert_eq!(label.label, "Alpha");
    }
}
