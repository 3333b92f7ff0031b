//! `Fixed(i64)` — the kernel's sole numeric representation.
//!
//! All magnitudes in the kernel (constraint vector components, structural
//! debt, densities, shock multipliers) are `Fixed` values. `SCALE = 10_000`.
//!
//! INVARIANTS:
//! - The inner `i64` is PRIVATE. No code outside `math::fixed` touches it
//!   directly; `raw()` is `pub(crate)` for use by `canon` and test harnesses.
//! - Every operation that can fail returns `Result<Fixed, KernelError>`.
//! - Multiplying two `Fixed` values always divides by `SCALE` (`mul_scaled`).
//! - Floating-point arithmetic never appears anywhere in this module or its
//!   callers — the kernel has no `f32`/`f64` types at all.

use crate::error::KernelError;

/// The scaling factor. 1.0 kernel unit = `Fixed(10_000)`.
pub const SCALE: i64 = 10_000;

/// The kernel's sole numeric type: a signed fixed-point value with
/// `SCALE = 10_000`. The inner value is private — enforced by the module
/// system, not by convention.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Fixed(i64);

impl Fixed {
    /// Construct a `Fixed` from a pre-scaled raw `i64`.
    pub fn from_raw(raw: i64) -> Self {
        Fixed(raw)
    }

    /// Construct a `Fixed` from a whole-unit count (e.g. `3` = 3.0 units).
    /// Fails if `whole * SCALE` overflows `i64`.
    pub fn from_whole(whole: i64) -> Result<Self, KernelError> {
        whole
            .checked_mul(SCALE)
            .map(Fixed)
            .ok_or_else(|| KernelError::OutOfRangeFixedPoint {
                detail: format!("from_whole({whole}) overflows i64"),
            })
    }

    /// Parse a `Fixed` from a canonical numeric string
    /// (`^-?(0|[1-9][0-9]*)$`, the wire grammar for `canon::json`). The
    /// string represents the raw, already-scaled inner value.
    pub fn from_canonical_str(s: &str) -> Result<Self, KernelError> {
        let (sign, digits) = match s.strip_prefix('-') {
            Some(rest) => (-1i64, rest),
            None => (1i64, s),
        };
        let valid = digits == "0"
            || (!digits.is_empty()
                && digits.as_bytes()[0] != b'0'
                && digits.bytes().all(|b| b.is_ascii_digit()));
        if !valid || (sign == -1 && digits == "0") {
            return Err(KernelError::OutOfRangeFixedPoint {
                detail: format!("'{s}' is not a canonical fixed-point string"),
            });
        }
        let magnitude: i64 = digits.parse().map_err(|_| KernelError::OutOfRangeFixedPoint {
            detail: format!("'{s}' does not fit in i64"),
        })?;
        Ok(Fixed(sign * magnitude))
    }

    /// Returns the inner raw `i64` value. Restricted to the crate so that no
    /// external caller can bypass the checked-arithmetic discipline.
    pub(crate) fn raw(self) -> i64 {
        self.0
    }

    /// Multiply two `Fixed` values, dividing by `SCALE` to keep the result
    /// scaled: `(self.0 * other.0) / SCALE`, floor-rounded (truncation).
    pub fn mul_scaled(self, other: Fixed) -> Result<Fixed, KernelError> {
        let product = (self.0 as i128) * (other.0 as i128);
        let result = product / (SCALE as i128);
        i64::try_from(result)
            .map(Fixed)
            .map_err(|_| KernelError::OutOfRangeFixedPoint {
                detail: "mul_scaled overflows i64".into(),
            })
    }

    /// Divide `self` by `other`, scaling correctly: `(self.0 * SCALE) /
    /// other.0`. Pre-checks the denominator for zero.
    pub fn div_scaled(self, other: Fixed) -> Result<Fixed, KernelError> {
        if other.0 == 0 {
            return Err(KernelError::OutOfRangeFixedPoint {
                detail: "division by zero".into(),
            });
        }
        let numerator = (self.0 as i128) * (SCALE as i128);
        let result = numerator / (other.0 as i128);
        i64::try_from(result)
            .map(Fixed)
            .map_err(|_| KernelError::OutOfRangeFixedPoint {
                detail: "div_scaled overflows i64".into(),
            })
    }

    /// Add two `Fixed` values with overflow checking.
    pub fn checked_add(self, other: Fixed) -> Result<Fixed, KernelError> {
        self.0
            .checked_add(other.0)
            .map(Fixed)
            .ok_or_else(|| KernelError::OutOfRangeFixedPoint {
                detail: "checked_add overflows i64".into(),
            })
    }

    /// Subtract `other` from `self` with overflow/underflow checking.
    pub fn checked_sub(self, other: Fixed) -> Result<Fixed, KernelError> {
        self.0
            .checked_sub(other.0)
            .map(Fixed)
            .ok_or_else(|| KernelError::OutOfRangeFixedPoint {
                detail: "checked_sub overflows i64".into(),
            })
    }

    /// Add a signed raw delta, saturating at `[0, cap_raw]` rather than
    /// erroring. Returns the saturated value and the raw magnitude of the
    /// clamp (0 if no clamping occurred) — the caller folds the clamp
    /// magnitude into `secondary_debt`.
    pub fn saturating_add_capped(self, delta_raw: i64, cap_raw: i64) -> (Fixed, i64) {
        let unclamped = (self.0 as i128) + (delta_raw as i128);
        let clamped = unclamped.clamp(0, cap_raw as i128);
        let clamp_amount = (unclamped - clamped).unsigned_abs().min(i64::MAX as u128) as i64;
        (Fixed(clamped as i64), clamp_amount)
    }

    /// Returns true if this value is zero.
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Returns true if this value is negative.
    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// The zero value.
    pub fn zero() -> Fixed {
        Fixed(0)
    }

    /// Encode as a canonical numeric string (no leading zeros, explicit `-`
    /// for negative values, `0` for zero — never `-0`).
    pub fn to_canonical_string(self) -> String {
        self.0.to_string()
    }
}
