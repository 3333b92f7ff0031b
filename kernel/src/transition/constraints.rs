//! `apply_constraint_change` (spec.md §4.3). Saturating at the constraint
//! vector's bounds folds the clamp magnitude into `secondary_debt`, which —
//! like every other transition's debt output — accumulates into
//! `OrgState.structural_debt` (see DESIGN.md for why this crate applies
//! that rule uniformly rather than only for `inject_shock`).

use crate::error::KernelError;
use crate::math::fixed::Fixed;
use crate::model::result::TransitionResult;
use crate::model::state::OrgState;

pub fn apply_constraint_change(
    mut state: OrgState,
    capital_delta: i64,
    talent_delta: i64,
    time_delta: i64,
    political_cost_delta: i64,
) -> Result<(OrgState, TransitionResult), KernelError> {
    if state.constants.is_none() {
        return Err(KernelError::ConstantsUnset);
    }
    let (updated, clamp_total) =
        state.constraints.apply_deltas(capital_delta, talent_delta, time_delta, political_cost_delta);
    state.constraints = updated;

    let secondary_debt = Fixed::from_raw(clamp_total);
    state.structural_debt = state.structural_debt.checked_add(secondary_debt)?;

    let mut result = TransitionResult::plain(
        "apply_constraint_change",
        "constraint deltas applied",
        state.structural_debt,
    );
    result.secondary_debt = secondary_debt;
    Ok((state, result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::constants::DomainConstants;

    fn initialized() -> OrgState {
        let mut s = OrgState::genesis();
        s.constants = Some(
            DomainConstants::new(Fixed::zero(), Fixed::zero(), Fixed::zero(), Fixed::zero(), 3, 5).unwrap(),
        );
        s
    }

    #[test]
    fn clamp_magnitude_becomes_secondary_debt() {
        let state = initialized();
        let (state, result) = apply_constraint_change(state, -1000, 0, 0, 0).unwrap();
        assert_eq!(result.secondary_debt.raw(), 1000);
        assert_eq!(state.structural_debt.raw(), 1000);
    }

    #[test]
    fn no_clamp_means_zero_secondary_debt() {
        let state = initialized();
        let (state, result) = apply_constraint_change(state, 1000, 0, 0, 0).unwrap();
        assert_eq!(result.secondary_debt, Fixed::zero());
        assert_eq!(state.structural_debt, Fixed::zero());
    }
}
