//! `TransitionResult` — the read-only outcome record attached to every
//! applied event (spec.md §3, §4.3).

use crate::math::fixed::Fixed;

/// The outcome of applying one transition. Immutable once produced; the
/// event engine attaches it to the event log entry alongside the new
/// `state_hash`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionResult {
    pub event_type: String,
    pub primary_debt: Fixed,
    pub secondary_debt: Fixed,
    pub target_density: Fixed,
    pub suppressed_differentiation: bool,
    pub differentiation_executed: bool,
    pub differentiation_skipped: bool,
    pub compression_executed: bool,
    pub deactivated: Vec<String>,
    pub reason: String,
    pub cumulative_debt: Fixed,
}

impl TransitionResult {
    /// A result carrying no debt and no side effects beyond the state
    /// change itself — the common case for `add_role`, `add_dependency`,
    /// `initialize_constants`.
    pub fn plain(event_type: impl Into<String>, reason: impl Into<String>, cumulative_debt: Fixed) -> Self {
        TransitionResult {
            event_type: event_type.into(),
            primary_debt: Fixed::zero(),
            secondary_debt: Fixed::zero(),
            target_density: Fixed::zero(),
            suppressed_differentiation: false,
            differentiation_executed: false,
            differentiation_skipped: false,
            compression_executed: false,
            deactivated: Vec::new(),
            reason: reason.into(),
            cumulative_debt,
        }
    }
}
