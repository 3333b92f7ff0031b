//! `inject_shock` (spec.md §4.3, worked example in §8 scenario 4).
//!
//! ```text
//! target_density  = ego_density(target)
//! density_scaled  = target_density * SHOCK_DENSITY_WEIGHT / SCALE   (Fixed::mul_scaled)
//! primary_debt    = magnitude * (shock_base_multiplier + density_scaled)
//! ```
//!
//! `magnitude` is a plain integer multiplier (not itself fixed-point), so
//! the final multiplication is a raw scalar multiply, not `mul_scaled`.

use crate::error::KernelError;
use crate::graph::ego_density;
use crate::math::fixed::Fixed;
use crate::math::overflow::checked_mul_raw;
use crate::model::result::TransitionResult;
use crate::model::state::OrgState;

pub fn inject_shock(
    mut state: OrgState,
    target_role_id: String,
    magnitude: i64,
) -> Result<(OrgState, TransitionResult), KernelError> {
    let constants = state.constants.clone().ok_or(KernelError::ConstantsUnset)?;
    if !(1..=10).contains(&magnitude) {
        return Err(KernelError::OutOfRangeFixedPoint {
            detail: format!("shock magnitude {magnitude} out of range [1,10]"),
        });
    }
    if !state.roles.contains_key(&target_role_id) {
        return Err(KernelError::UnknownRole { role_id: target_role_id });
    }

    let target_density = ego_density(&state, &target_role_id);
    let density_scaled = target_density.mul_scaled(constants.shock_density_weight)?;
    let per_unit = constants.shock_base_multiplier.checked_add(density_scaled)?;
    let primary_raw = checked_mul_raw(per_unit.raw(), magnitude)?;
    let primary_debt = Fixed::from_raw(primary_raw);

    state.structural_debt = state.structural_debt.checked_add(primary_debt)?;

    let mut result = TransitionResult::plain(
        "inject_shock",
        format!("shock magnitude {magnitude} applied to '{target_role_id}'"),
        state.structural_debt,
    );
    result.primary_debt = primary_debt;
    result.target_density = target_density;
    Ok((state, result))
}
