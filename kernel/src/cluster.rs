//! The deterministic clusterer (spec.md §4.6): no randomness, no semantic
//! input. Weakly-connected components → recursive greedy bipartition →
//! global refinement → SHA-256 cluster ids.
//!
//! Two constants are part of this kernel's version identity (spec.md §9
//! open question: "the exact greedy refinement ε ... must choose one and
//! document it, since it affects the golden hash"):
//! - `SPLIT_MIN` — components at or below this size are never split.
//! - `CLUSTER_EPSILON_RAW` — a bipartition step only executes if it
//!   strictly increases the intra-cluster edge count by more than this
//!   many raw (unscaled) edges. Since edge counts are integers, `1` is the
//!   smallest meaningful threshold: "more than epsilon" means "by at least
//!   one whole edge".

use std::collections::{BTreeMap, BTreeSet};

use crate::canon::hash::{sha256, to_hex};
use crate::math::fixed::{Fixed, SCALE};
use crate::model::state::OrgState;

pub const SPLIT_MIN: usize = 4;
pub const CLUSTER_EPSILON_RAW: i64 = 1;
const REFINEMENT_STEP_CAP_FACTOR: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterInfo {
    pub cluster_id: String,
    pub role_ids: Vec<String>,
    pub internal_density: Fixed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusteringResult {
    pub clusters: Vec<ClusterInfo>,
    /// `(from_role_id, to_role_id)` pairs whose endpoints land in different
    /// clusters, in canonical dependency order.
    pub inter_cluster_edges: Vec<(String, String)>,
    pub boundary_heat: Fixed,
    /// SHA-256 over the sorted, `|`-joined cluster ids. Changes whenever the
    /// partition itself changes, independent of internal density or label.
    pub cluster_hash: String,
}

fn undirected_adjacency(state: &OrgState) -> BTreeMap<String, BTreeSet<String>> {
    let mut adjacency: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for role in state.roles.values().filter(|r| r.active) {
        adjacency.entry(role.id.clone()).or_default();
    }
    for dep in &state.dependencies {
        let from_active = state.roles.get(&dep.from_role_id).is_some_and(|r| r.active);
        let to_active = state.roles.get(&dep.to_role_id).is_some_and(|r| r.active);
        if !from_active || !to_active {
            continue;
        }
        adjacency.entry(dep.from_role_id.clone()).or_default().insert(dep.to_role_id.clone());
        adjacency.entry(dep.to_role_id.clone()).or_default().insert(dep.from_role_id.clone());
    }
    adjacency
}

fn weakly_connected_components(adjacency: &BTreeMap<String, BTreeSet<String>>) -> Vec<Vec<String>> {
    let mut visited: BTreeSet<&str> = BTreeSet::new();
    let mut components = Vec::new();

    for start in adjacency.keys() {
        if visited.contains(start.as_str()) {
            continue;
        }
        let mut component = Vec::new();
        let mut stack = vec![start.as_str()];
        visited.insert(start.as_str());
        while let Some(node) = stack.pop() {
            component.push(node.to_string());
            if let Some(neighbors) = adjacency.get(node) {
                for neighbor in neighbors {
                    if !visited.contains(neighbor.as_str()) {
                        visited.insert(neighbor.as_str());
                        stack.push(neighbor.as_str());
                    }
                }
            }
        }
        component.sort();
        components.push(component);
    }
    components.sort();
    components
}

/// Count undirected edges with both endpoints in `members`.
fn edge_count_within(adjacency: &BTreeMap<String, BTreeSet<String>>, members: &BTreeSet<String>) -> i64 {
    let mut count = 0i64;
    for member in members {
        if let Some(neighbors) = adjacency.get(member) {
            for neighbor in neighbors {
                if members.contains(neighbor) && neighbor > member {
                    count += 1;
                }
            }
        }
    }
    count
}

/// Greedy hill-climbing bipartition of `nodes` into two sets, seeded by a
/// lexicographic half-split. Moves the single boundary node whose move most
/// increases total within-cluster edges; stops when no move improves by
/// more than `CLUSTER_EPSILON_RAW` edges.
fn bipartition(adjacency: &BTreeMap<String, BTreeSet<String>>, nodes: &[String]) -> (Vec<String>, Vec<String>) {
    let mid = nodes.len() / 2;
    let mut a: BTreeSet<String> = nodes[..mid].iter().cloned().collect();
    let mut b: BTreeSet<String> = nodes[mid..].iter().cloned().collect();

    let step_cap = nodes.len() * REFINEMENT_STEP_CAP_FACTOR;
    for _ in 0..step_cap {
        let current = edge_count_within(adjacency, &a) + edge_count_within(adjacency, &b);
        let mut best: Option<(i64, String, bool)> = None; // (new_total, node, moves_a_to_b)

        for node in &a {
            let mut a2 = a.clone();
            let mut b2 = b.clone();
            a2.remove(node);
            b2.insert(node.clone());
            let total = edge_count_within(adjacency, &a2) + edge_count_within(adjacency, &b2);
            if total - current > CLUSTER_EPSILON_RAW || (total > current && best.is_none()) {
                match &best {
                    None => best = Some((total, node.clone(), true)),
                    Some((best_total, best_node, _)) => {
                        if total > *best_total || (total == *best_total && node < best_node) {
                            best = Some((total, node.clone(), true));
                        }
                    }
                }
            }
        }
        for node in &b {
            let mut a2 = a.clone();
            let mut b2 = b.clone();
            b2.remove(node);
            a2.insert(node.clone());
            let total = edge_count_within(adjacency, &a2) + edge_count_within(adjacency, &b2);
            if total > current {
                match &best {
                    None => best = Some((total, node.clone(), false)),
                    Some((best_total, best_node, _)) => {
                        if total > *best_total || (total == *best_total && node < best_node) {
                            best = Some((total, node.clone(), false));
                        }
                    }
                }
            }
        }

        match best {
            Some((total, node, moves_a_to_b)) if total - current >= 1 => {
                if moves_a_to_b {
                    a.remove(&node);
                    b.insert(node);
                } else {
                    b.remove(&node);
                    a.insert(node);
                }
            }
            _ => break,
        }
    }

    (a.into_iter().collect(), b.into_iter().collect())
}

/// Recursively split `component` into leaf clusters no larger than
/// `SPLIT_MIN`, in canonical order.
fn recursive_bipartition(adjacency: &BTreeMap<String, BTreeSet<String>>, component: Vec<String>) -> Vec<Vec<String>> {
    if component.len() <= SPLIT_MIN {
        return vec![component];
    }
    let (left, right) = bipartition(adjacency, &component);
    if left.is_empty() || right.is_empty() {
        return vec![component];
    }
    let mut out = recursive_bipartition(adjacency, left);
    out.extend(recursive_bipartition(adjacency, right));
    out
}

/// One global refinement pass: reassign each role, in canonical order, to
/// the neighbor cluster it has the most edges into, if that exceeds its
/// edges into its current cluster. Runs until stable or a step cap.
fn refine(adjacency: &BTreeMap<String, BTreeSet<String>>, mut clusters: Vec<Vec<String>>) -> Vec<Vec<String>> {
    let total_roles: usize = clusters.iter().map(|c| c.len()).sum();
    let step_cap = total_roles * REFINEMENT_STEP_CAP_FACTOR;

    for _ in 0..step_cap {
        let mut membership: BTreeMap<String, usize> = BTreeMap::new();
        for (idx, cluster) in clusters.iter().enumerate() {
            for role in cluster {
                membership.insert(role.clone(), idx);
            }
        }

        let mut role_ids: Vec<String> = membership.keys().cloned().collect();
        role_ids.sort();

        let mut moved = false;
        for role in role_ids {
            let current_idx = membership[&role];
            let neighbors = match adjacency.get(&role) {
                Some(n) => n,
                None => continue,
            };
            let mut counts: BTreeMap<usize, i64> = BTreeMap::new();
            for neighbor in neighbors {
                if let Some(&idx) = membership.get(neighbor) {
                    *counts.entry(idx).or_insert(0) += 1;
                }
            }
            let current_count = *counts.get(&current_idx).unwrap_or(&0);
            let mut best_idx = current_idx;
            let mut best_count = current_count;
            for (&idx, &count) in &counts {
                if idx == current_idx {
                    continue;
                }
                if count > best_count || (count == best_count && idx < best_idx) {
                    best_idx = idx;
                    best_count = count;
                }
            }
            if best_idx != current_idx && best_count > current_count {
                clusters[current_idx].retain(|r| r != &role);
                clusters[best_idx].push(role.clone());
                clusters[best_idx].sort();
                membership.insert(role, best_idx);
                moved = true;
            }
        }
        clusters.retain(|c| !c.is_empty());
        if !moved {
            break;
        }
    }
    clusters
}

fn cluster_id_for(role_ids: &[String]) -> String {
    let mut sorted = role_ids.to_vec();
    sorted.sort();
    let joined = sorted.join("|");
    to_hex(&sha256(joined.as_bytes()))
}

pub fn cluster(state: &OrgState) -> ClusteringResult {
    let adjacency = undirected_adjacency(state);
    let components = weakly_connected_components(&adjacency);

    let mut clusters: Vec<Vec<String>> = Vec::new();
    for component in components {
        clusters.extend(recursive_bipartition(&adjacency, component));
    }
    let clusters = refine(&adjacency, clusters);

    let mut membership: BTreeMap<&str, usize> = BTreeMap::new();
    for (idx, cluster) in clusters.iter().enumerate() {
        for role in cluster {
            membership.insert(role.as_str(), idx);
        }
    }

    let mut inter_cluster_edges = Vec::new();
    let mut cross_edges = 0i64;
    let mut total_edges = 0i64;
    for dep in &state.dependencies {
        let from_active = state.roles.get(&dep.from_role_id).is_some_and(|r| r.active);
        let to_active = state.roles.get(&dep.to_role_id).is_some_and(|r| r.active);
        if !from_active || !to_active {
            continue;
        }
        total_edges += 1;
        let from_cluster = membership.get(dep.from_role_id.as_str());
        let to_cluster = membership.get(dep.to_role_id.as_str());
        if from_cluster.is_some() && from_cluster != to_cluster {
            cross_edges += 1;
            inter_cluster_edges.push((dep.from_role_id.clone(), dep.to_role_id.clone()));
        }
    }

    let cluster_infos = clusters
        .into_iter()
        .map(|role_ids| {
            let members: BTreeSet<String> = role_ids.iter().cloned().collect();
            let n = role_ids.len() as i64;
            let internal_density = if n < 2 {
                Fixed::zero()
            } else {
                let edges = edge_count_within(&adjacency, &members) * 2; // undirected -> directed-equivalent count
                Fixed::from_raw(edges * SCALE)
                    .div_scaled(Fixed::from_raw(n * (n - 1)))
                    .unwrap_or(Fixed::zero())
            };
            ClusterInfo { cluster_id: cluster_id_for(&role_ids), role_ids, internal_density }
        })
        .collect();

    let boundary_heat = if total_edges == 0 {
        Fixed::zero()
    } else {
        Fixed::from_raw(cross_edges * SCALE).div_scaled(Fixed::from_raw(total_edges)).unwrap_or(Fixed::zero())
    };

    let cluster_hash = cluster_id_for(
        &cluster_infos.iter().map(|c| c.cluster_id.clone()).collect::<Vec<_>>(),
    );

    ClusteringResult { clusters: cluster_infos, inter_cluster_edges, boundary_heat, cluster_hash }
}
