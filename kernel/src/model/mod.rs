//! The data model (spec.md §3): roles, dependencies, constraint vector,
//! domain constants, and the `OrgState` container that holds them.

pub mod constants;
pub mod constraints;
pub mod dependency;
pub mod event;
pub mod result;
pub mod role;
pub mod snapshot;
pub mod state;

pub use constants::DomainConstants;
pub use constraints::ConstraintVector;
pub use dependency::{Dependency, DependencyType};
pub use event::{Event, EventPayload};
pub use result::TransitionResult;
pub use role::{Role, ScaleStage};
pub use snapshot::Snapshot;
pub use state::OrgState;
