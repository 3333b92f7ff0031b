//! Transitions (spec.md §4.3): pure functions `(state, payload) -> (state',
//! result)`. Each submodule owns exactly one `event_type`; `apply` is the
//! single dispatch point the engine calls after sequence/schema checks pass.

pub mod compress;
pub mod constraints;
pub mod dependencies;
pub mod differentiate;
pub mod init;
pub mod roles;
pub mod shock;

use crate::error::KernelError;
use crate::model::event::EventPayload;
use crate::model::result::TransitionResult;
use crate::model::state::OrgState;

pub fn apply(state: OrgState, payload: EventPayload) -> Result<(OrgState, TransitionResult), KernelError> {
    match payload {
        EventPayload::InitializeConstants {
            capital,
            talent,
            time,
            political_cost,
            differentiation_threshold,
            compression_limit,
        } => init::initialize_constants(
            state,
            capital,
            talent,
            time,
            political_cost,
            differentiation_threshold,
            compression_limit,
        ),
        EventPayload::AddRole { id, name, purpose, responsibilities } => {
            roles::add_role(state, id, name, purpose, responsibilities)
        }
        EventPayload::RemoveRole { role_id } => roles::remove_role(state, role_id),
        EventPayload::AddDependency { from_role_id, to_role_id, dep_type, critical } => {
            dependencies::add_dependency(state, from_role_id, to_role_id, dep_type, critical)
        }
        EventPayload::InjectShock { target_role_id, magnitude } => {
            shock::inject_shock(state, target_role_id, magnitude)
        }
        EventPayload::ApplyConstraintChange {
            capital_delta,
            talent_delta,
            time_delta,
            political_cost_delta,
        } => constraints::apply_constraint_change(
            state,
            capital_delta,
            talent_delta,
            time_delta,
            political_cost_delta,
        ),
        EventPayload::DifferentiateRole { role_id } => differentiate::differentiate_role(state, role_id),
        EventPayload::CompressRoles { source_role_id, target_role_id } => {
            compress::compress_roles(state, source_role_id, target_role_id)
        }
    }
}
