//! The deterministic fixed-point math engine.
//!
//! Module layout:
//!   math::fixed    — The Fixed(i64) wrapper. Private inner value.
//!   math::overflow — Checked arithmetic combinators used by the rest of the kernel.

pub mod fixed;
pub mod overflow;
