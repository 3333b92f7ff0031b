//! `initialize_constants` (spec.md §4.3). Must be event 0; the engine
//! enforces that ordering before this function is ever called. This
//! function only enforces "never applied twice".

use crate::error::KernelError;
use crate::math::fixed::Fixed;
use crate::model::constants::DomainConstants;
use crate::model::result::TransitionResult;
use crate::model::state::OrgState;

#[allow(clippy::too_many_arguments)]
pub fn initialize_constants(
    mut state: OrgState,
    capital: Fixed,
    talent: Fixed,
    time: Fixed,
    political_cost: Fixed,
    differentiation_threshold: i64,
    compression_limit: u32,
) -> Result<(OrgState, TransitionResult), KernelError> {
    if state.constants.is_some() {
        return Err(KernelError::BadSchema {
            detail: "initialize_constants already applied".into(),
        });
    }

    let constants = DomainConstants::new(
        capital,
        talent,
        time,
        political_cost,
        differentiation_threshold,
        compression_limit,
    )?;
    state.constraints =
        crate::model::constraints::ConstraintVector::from_constants(capital, talent, time, political_cost);
    state.constants = Some(constants);

    let debt = state.structural_debt;
    let result = TransitionResult::plain("initialize_constants", "constants set", debt);
    Ok((state, result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sets_constants_and_constraints() {
        let state = OrgState::genesis();
        let (state, _) = initialize_constants(
            state,
            Fixed::from_whole(5).unwrap(),
            Fixed::from_whole(5).unwrap(),
            Fixed::from_whole(5).unwrap(),
            Fixed::from_whole(5).unwrap(),
            3,
            5,
        )
        .unwrap();
        assert!(state.constants.is_some());
        assert_eq!(state.constraints.capital, Fixed::from_whole(5).unwrap());
    }

    #[test]
    fn second_call_is_rejected() {
        let state = OrgState::genesis();
        let (state, _) = initialize_constants(
            state,
            Fixed::zero(),
            Fixed::zero(),
            Fixed::zero(),
            Fixed::zero(),
            3,
            5,
        )
        .unwrap();
        let result =
            initialize_constants(state, Fixed::zero(), Fixed::zero(), Fixed::zero(), Fixed::zero(), 3, 5);
        assert!(matches!(result, Err(KernelError::BadSchema { .. })));
    }
}
