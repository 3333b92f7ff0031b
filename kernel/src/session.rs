//! The session orchestrator (spec.md §4.9, §5): owns one project's event
//! log and current `OrgState`, and is the only place that calls `engine`.
//!
//! Concurrency model (spec.md §5): a session is single-writer, guarded by
//! an internal `std::sync::Mutex` over its kernel state. `append` commits
//! the in-memory state transition under that lock, then releases it before
//! touching `EventStore::persist` or the snapshot log — both of those live
//! behind their own, separate mutexes, so a slow or blocking store
//! implementation never holds the kernel state lock across its write.
//! `get_projection` locks just long enough to clone the state it needs,
//! then releases the lock before running clustering/semantic/drift —
//! readers never alias the locked state.
//!
//! Error tiers (spec.md §7): a Rejection from `append` leaves the session
//! untouched and safe to keep using. A Fatal error (`DeterminismError`,
//! `OutOfRangeFixedPoint`) poisons the session — further `append` calls are
//! refused until `verify_determinism` succeeds again.

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::canon::hash::Digest;
use crate::canon::state_hash::canonical_bytes;
use crate::cluster::{self, ClusteringResult};
use crate::drift::{self, DriftReport};
use crate::engine;
use crate::error::KernelError;
use crate::graph;
use crate::math::fixed::Fixed;
use crate::model::dependency::Dependency;
use crate::model::event::Event;
use crate::model::result::TransitionResult;
use crate::model::role::Role;
use crate::model::snapshot::Snapshot;
use crate::model::state::OrgState;
use crate::semantic::{self, ClassificationDb, SemanticLabel};

/// Snapshots are taken every `SNAPSHOT_CADENCE` committed events. Advisory
/// only: `verify_determinism` never consults them.
pub const SNAPSHOT_CADENCE: u64 = 50;

fn is_fatal(err: &KernelError) -> bool {
    matches!(err, KernelError::DeterminismError { .. } | KernelError::OutOfRangeFixedPoint { .. })
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AppliedEvent {
    event: Event,
    result: TransitionResult,
    state_hash: Digest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendOutcome {
    pub sequence: u64,
    pub state_hash: Digest,
    pub result: TransitionResult,
    /// `true` if this call found an already-committed event with the same
    /// `event_uuid` and identical payload, and returned its recorded
    /// outcome without applying anything new.
    pub idempotent_replay: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostics {
    pub role_count: usize,
    pub active_role_count: usize,
    pub structural_density: Fixed,
    pub structural_debt: Fixed,
    pub isolated_roles: Vec<String>,
    pub compression_count: u32,
    pub governance_edge_count: usize,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterProjection {
    pub cluster_id: String,
    pub role_ids: Vec<String>,
    pub internal_density: Fixed,
    pub semantic_label: String,
    pub confidence: Fixed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateProjection {
    pub event_count: u64,
    pub state_hash: Digest,
    pub diagnostics: Diagnostics,
    pub clusters: Vec<ClusterProjection>,
    /// Every active role's cluster id, spec.md §6's `role_to_department`.
    pub role_to_cluster: BTreeMap<String, String>,
    pub inter_cluster_edges: Vec<(String, String)>,
    pub boundary_heat: Fixed,
    /// SHA-256 over the sorted cluster ids (`cluster::ClusteringResult::cluster_hash`).
    pub cluster_hash: String,
    pub drift: DriftReport,
    pub roles: Vec<Role>,
    pub dependencies: Vec<Dependency>,
    pub transition_results: Vec<TransitionResult>,
}

/// Persists raw event bytes, in commit order. The kernel ships only the
/// in-memory implementation (`InMemoryEventStore`); a durable store is an
/// external concern the same way `IOError` is a tier the kernel reports but
/// never causes.
pub trait EventStore {
    fn persist(&mut self, sequence: u64, raw: Vec<u8>);
    fn all(&self) -> &[Vec<u8>];
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryEventStore {
    log: Vec<Vec<u8>>,
}

impl EventStore for InMemoryEventStore {
    fn persist(&mut self, _sequence: u64, raw: Vec<u8>) {
        self.log.push(raw);
    }

    fn all(&self) -> &[Vec<u8>] {
        &self.log
    }
}

struct Inner {
    state: OrgState,
    applied: Vec<AppliedEvent>,
    uuid_index: BTreeMap<String, usize>,
    poison_reason: Option<String>,
}

/// A snapshot of the mutable parts of a session, cloned out from under the
/// lock so `get_projection` can run the expensive clustering/drift passes
/// without holding it.
struct StateSnapshot {
    state: OrgState,
    event_count: u64,
    last_hash: Digest,
    transition_results: Vec<TransitionResult>,
}

pub struct SessionOrchestrator<S: EventStore = InMemoryEventStore> {
    inner: Mutex<Inner>,
    store: Mutex<S>,
    snapshots: Mutex<Vec<Snapshot>>,
}

impl<S: EventStore + Default> Default for SessionOrchestrator<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: EventStore + Default> SessionOrchestrator<S> {
    pub fn new() -> Self {
        SessionOrchestrator {
            inner: Mutex::new(Inner {
                state: OrgState::genesis(),
                applied: Vec::new(),
                uuid_index: BTreeMap::new(),
                poison_reason: None,
            }),
            store: Mutex::new(S::default()),
            snapshots: Mutex::new(Vec::new()),
        }
    }
}

impl SessionOrchestrator<InMemoryEventStore> {
    /// Rebuild a fresh in-memory orchestrator by replaying `events` from
    /// genesis (spec.md §8 scenario 6: export, reset, import, compare hash).
    pub fn import_events(events: Vec<Event>) -> Result<Self, KernelError> {
        let session = SessionOrchestrator::new();
        let mut guard = session.inner.lock().expect("session mutex poisoned by a panicking holder");
        let mut state = OrgState::genesis();
        for event in events {
            let (new_state, result, hash) = engine::apply_event(state, event.clone())?;
            if let Some(uuid) = &event.event_uuid {
                guard.uuid_index.insert(uuid.clone(), guard.applied.len());
            }
            guard.applied.push(AppliedEvent { event, result, state_hash: hash });
            state = new_state;
        }
        guard.state = state;
        drop(guard);
        Ok(session)
    }
}

impl<S: EventStore> SessionOrchestrator<S> {
    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("session mutex poisoned by a panicking holder")
    }

    pub fn is_poisoned(&self) -> bool {
        self.lock().poison_reason.is_some()
    }

    pub fn event_count(&self) -> u64 {
        self.lock().applied.len() as u64
    }

    /// Parse, validate, and apply one wire event. Rejections leave state
    /// untouched; fatal errors poison the session. Commits the in-memory
    /// state transition under the session lock, then releases it before
    /// writing to `EventStore` or the snapshot log — neither suspends while
    /// holding kernel state mutably.
    pub fn append(&self, raw: &[u8]) -> Result<AppendOutcome, KernelError> {
        let mut inner = self.lock();

        if let Some(reason) = &inner.poison_reason {
            return Err(KernelError::DeterminismError { detail: format!("session poisoned: {reason}") });
        }

        let expected_sequence = inner.applied.len() as u64;
        let event = engine::parse_event(raw, expected_sequence)?;

        if let Some(uuid) = &event.event_uuid {
            if let Some(&pos) = inner.uuid_index.get(uuid) {
                let existing = &inner.applied[pos];
                if existing.event.payload == event.payload {
                    return Ok(AppendOutcome {
                        sequence: existing.event.sequence,
                        state_hash: existing.state_hash,
                        result: existing.result.clone(),
                        idempotent_replay: true,
                    });
                }
                return Err(KernelError::SequenceDuplicate { sequence: event.sequence });
            }
        }

        let (new_state, result, hash) = match engine::apply_event(inner.state.clone(), event.clone()) {
            Ok(triple) => triple,
            Err(err) => {
                if is_fatal(&err) {
                    inner.poison_reason = Some(format!("{err}"));
                }
                return Err(err);
            }
        };

        if let Some(uuid) = &event.event_uuid {
            inner.uuid_index.insert(uuid.clone(), inner.applied.len());
        }
        inner.applied.push(AppliedEvent { event: event.clone(), result: result.clone(), state_hash: hash });
        let sequence_count = inner.applied.len() as u64;
        let snapshot_payload =
            if sequence_count % SNAPSHOT_CADENCE == 0 { Some(canonical_bytes(&new_state)) } else { None };
        inner.state = new_state;
        drop(inner);

        self.store.lock().expect("event store mutex poisoned by a panicking holder").persist(event.sequence, raw.to_vec());

        if let Some(canonical_state_json) = snapshot_payload {
            let snapshot =
                Snapshot { sequence: event.sequence, canonical_state_json, state_hash: hash, created_at: event.timestamp.clone() };
            self.snapshots.lock().expect("snapshot log mutex poisoned by a panicking holder").push(snapshot);
        }

        Ok(AppendOutcome { sequence: event.sequence, state_hash: hash, result, idempotent_replay: false })
    }

    /// Replay the committed log from event 0 in a fresh kernel and compare
    /// the resulting hash at every step to the one recorded at commit time.
    /// On success, clears any existing poison.
    pub fn verify_determinism(&self) -> Result<(), KernelError> {
        let mut inner = self.lock();
        let mut replay_state = OrgState::genesis();
        for applied in &inner.applied {
            let (next_state, _, hash) = engine::apply_event(replay_state, applied.event.clone())?;
            if hash != applied.state_hash {
                let detail = format!("sequence {} replay hash disagrees with committed hash", applied.event.sequence);
                inner.poison_reason = Some(detail.clone());
                return Err(KernelError::DeterminismError { detail });
            }
            replay_state = next_state;
        }
        inner.poison_reason = None;
        Ok(())
    }

    /// The committed event log, in commit order.
    pub fn export(&self) -> Vec<Event> {
        self.lock().applied.iter().map(|a| a.event.clone()).collect()
    }

    fn snapshot_state(&self) -> StateSnapshot {
        let inner = self.lock();
        StateSnapshot {
            state: inner.state.clone(),
            event_count: inner.applied.len() as u64,
            last_hash: inner.applied.last().map(|a| a.state_hash).unwrap_or([0u8; 32]),
            transition_results: inner.applied.iter().map(|a| a.result.clone()).collect(),
        }
    }

    fn diagnostics(state: &OrgState, clustering: &ClusteringResult) -> Diagnostics {
        let isolated_roles = graph::isolated_roles(state);
        let governance_edge_count = state
            .dependencies
            .iter()
            .filter(|d| {
                d.dependency_type == crate::model::dependency::DependencyType::Governance
                    && state.roles.get(&d.from_role_id).is_some_and(|r| r.active)
                    && state.roles.get(&d.to_role_id).is_some_and(|r| r.active)
            })
            .count();

        let mut warnings = Vec::new();
        if !isolated_roles.is_empty() {
            warnings.push("isolated_roles_present".to_string());
        }
        if clustering.boundary_heat > Fixed::zero() {
            warnings.push("boundary_heat_nonzero".to_string());
        }

        Diagnostics {
            role_count: state.roles.len(),
            active_role_count: state.active_role_count(),
            structural_density: graph::structural_density(state),
            structural_debt: state.structural_debt,
            isolated_roles,
            compression_count: state.compression_count,
            governance_edge_count,
            warnings,
        }
    }

    /// The full state projection (spec.md §6 response shape): diagnostics,
    /// structural clusters with semantic labels, drift, and the current
    /// roles/dependencies/transition-result log. Locks only long enough to
    /// clone the state it needs; the clustering/drift passes run unlocked.
    pub fn get_projection(&self, db: &dyn ClassificationDb) -> StateProjection {
        let snapshot = self.snapshot_state();
        let clustering = cluster::cluster(&snapshot.state);
        let labels = semantic::label_clusters(&clustering.clusters, db);
        let label_by_id: BTreeMap<&str, &SemanticLabel> =
            labels.iter().map(|l| (l.cluster_id.as_str(), l)).collect();

        let clusters = clustering
            .clusters
            .iter()
            .map(|c| {
                let label = label_by_id.get(c.cluster_id.as_str());
                ClusterProjection {
                    cluster_id: c.cluster_id.clone(),
                    role_ids: c.role_ids.clone(),
                    internal_density: c.internal_density,
                    semantic_label: label.map(|l| l.label.clone()).unwrap_or_else(|| semantic::UNCLASSIFIED.to_string()),
                    confidence: label.map(|l| l.confidence).unwrap_or(Fixed::zero()),
                }
            })
            .collect();

        let mut role_to_cluster = BTreeMap::new();
        for c in &clustering.clusters {
            for role_id in &c.role_ids {
                role_to_cluster.insert(role_id.clone(), c.cluster_id.clone());
            }
        }

        let drift_report = drift::detect_drift(&snapshot.state, &clustering.clusters, &labels, db);
        let diagnostics = Self::diagnostics(&snapshot.state, &clustering);

        StateProjection {
            event_count: snapshot.event_count,
            state_hash: snapshot.last_hash,
            diagnostics,
            clusters,
            role_to_cluster,
            inter_cluster_edges: clustering.inter_cluster_edges,
            boundary_heat: clustering.boundary_heat,
            cluster_hash: clustering.cluster_hash,
            drift: drift_report,
            roles: snapshot.state.roles.values().cloned().collect(),
            dependencies: snapshot.state.dependencies.clone(),
            transition_results: snapshot.transition_results,
        }
    }
}
