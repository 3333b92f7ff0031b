//! Additional checked arithmetic combinators.
//! Thin wrappers to make common patterns in the kernel more ergonomic
//! while preserving the explicit checked_* discipline.

use crate::error::KernelError;

/// Multiply two raw i64 values with overflow check.
/// Use when you need to multiply before a division without creating Fixed values.
pub fn checked_mul_raw(a: i64, b: i64) -> Result<i64, KernelError> {
    a.checked_mul(b).ok_or_else(|| KernelError::OutOfRangeFixedPoint {
        detail: format!("{a} * {b} overflows i64"),
    })
}

/// Divide raw a by raw b. Returns OutOfRangeFixedPoint if b is zero.
pub fn checked_div_raw(a: i64, b: i64) -> Result<i64, KernelError> {
    if b == 0 {
        return Err(KernelError::OutOfRangeFixedPoint {
            detail: "division by zero".into(),
        });
    }
    Ok(a / b)
}

/// Add two raw i64 values with overflow check.
pub fn checked_add_raw(a: i64, b: i64) -> Result<i64, KernelError> {
    a.checked_add(b).ok_or_else(|| KernelError::OutOfRangeFixedPoint {
        detail: format!("{a} + {b} overflows i64"),
    })
}

/// Subtract raw b from raw a with underflow check.
pub fn checked_sub_raw(a: i64, b: i64) -> Result<i64, KernelError> {
    a.checked_sub(b).ok_or_else(|| KernelError::OutOfRangeFixedPoint {
        detail: format!("{a} - {b} underflows i64"),
    })
}
