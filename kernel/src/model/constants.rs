//! `DomainConstants` — set once by `initialize_constants`, never mutated.
//!
//! Two fields (`shock_base_multiplier`, `shock_density_weight`) are pinned
//! kernel constants rather than event-payload fields (spec.md §9 open
//! questions; see DESIGN.md). Changing either is a golden-hash break.

use crate::error::KernelError;
use crate::math::fixed::Fixed;

/// `base_multiplier` in the shock formula (spec.md §4.3, scenario 4 pins this
/// at `2`). Frozen; not configurable per project.
pub const SHOCK_BASE_MULTIPLIER_RAW: i64 = 2 * crate::math::fixed::SCALE;

/// `SHOCK_DENSITY_WEIGHT` (spec.md §9 open question). Chosen as `1.0` so
/// `density_scaled` equals `target_density` directly — the simplest weight
/// that satisfies the worked example in spec.md §8 scenario 4 without
/// introducing an unconfigurable magic ratio.
pub const SHOCK_DENSITY_WEIGHT_RAW: i64 = crate::math::fixed::SCALE;

/// Constants fixed at project genesis by the `initialize_constants` event.
/// Immutable for the lifetime of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainConstants {
    pub capital: Fixed,
    pub talent: Fixed,
    pub time: Fixed,
    pub political_cost: Fixed,
    pub differentiation_threshold: i64,
    pub compression_limit: u32,
    pub shock_base_multiplier: Fixed,
    pub shock_density_weight: Fixed,
}

impl DomainConstants {
    /// Construct from the `initialize_constants` payload fields. The two
    /// pinned shock constants are attached here, not read from the payload.
    pub fn new(
        capital: Fixed,
        talent: Fixed,
        time: Fixed,
        political_cost: Fixed,
        differentiation_threshold: i64,
        compression_limit: u32,
    ) -> Result<Self, KernelError> {
        if differentiation_threshold < 0 {
            return Err(KernelError::OutOfRangeFixedPoint {
                detail: "differentiation_threshold must be non-negative".into(),
            });
        }
        Ok(DomainConstants {
            capital,
            talent,
            time,
            political_cost,
            differentiation_threshold,
            compression_limit,
            shock_base_multiplier: Fixed::from_raw(SHOCK_BASE_MULTIPLIER_RAW),
            shock_density_weight: Fixed::from_raw(SHOCK_DENSITY_WEIGHT_RAW),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_negative_threshold() {
        let z = Fixed::zero();
        assert!(DomainConstants::new(z, z, z, z, -1, 5).is_err());
    }

    #[test]
    fn pinned_constants_are_attached() {
        let c = DomainConstants::new(Fixed::zero(), Fixed::zero(), Fixed::zero(), Fixed::zero(), 3, 5)
            .unwrap();
        assert_eq!(c.shock_base_multiplier, Fixed::from_whole(2).unwrap());
        assert_eq!(c.shock_density_weight, Fixed::from_whole(1).unwrap());
    }
}
