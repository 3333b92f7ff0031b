//! `ConstraintVector` — capital/talent/time/political budgets (spec.md §3).

use crate::math::fixed::Fixed;

/// The saturation cap applied to every component: `2^31` raw units.
pub const SATURATION_CAP_RAW: i64 = 1 << 31;

/// The four scalar budgets that bound what a role's transitions may spend.
/// Each component is clamped to `[0, SATURATION_CAP_RAW]`; anything that
/// would push a component outside that range saturates instead of erroring,
/// and the clamp magnitude is folded into `secondary_debt` by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstraintVector {
    pub capital: Fixed,
    pub talent: Fixed,
    pub time: Fixed,
    pub political_cost: Fixed,
}

impl ConstraintVector {
    pub fn from_constants(capital: Fixed, talent: Fixed, time: Fixed, political_cost: Fixed) -> Self {
        ConstraintVector { capital, talent, time, political_cost }
    }

    /// Apply signed raw deltas to each component, saturating at the cap.
    /// Returns the updated vector and the total clamp magnitude summed
    /// across all four components (folded into `secondary_debt` by the
    /// `apply_constraint_change` transition).
    pub fn apply_deltas(
        self,
        capital_delta: i64,
        talent_delta: i64,
        time_delta: i64,
        political_cost_delta: i64,
    ) -> (ConstraintVector, i64) {
        let (capital, c1) = self.capital.saturating_add_capped(capital_delta, SATURATION_CAP_RAW);
        let (talent, c2) = self.talent.saturating_add_capped(talent_delta, SATURATION_CAP_RAW);
        let (time, c3) = self.time.saturating_add_capped(time_delta, SATURATION_CAP_RAW);
        let (political_cost, c4) =
            self.political_cost.saturating_add_capped(political_cost_delta, SATURATION_CAP_RAW);
        (ConstraintVector { capital, talent, time, political_cost }, c1 + c2 + c3 + c4)
    }
}
