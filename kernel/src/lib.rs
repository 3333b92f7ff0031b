//! Organization Simulation Kernel
//! Version: 0.1.0
//!
//! A deterministic, event-sourced simulation kernel for organization
//! structure: roles, dependencies, constraint budgets, and the
//! transitions between them. No networking, no async, no threading inside
//! this crate — concurrency is the caller's concern (`session`'s doc
//! comment).
//!
//! INVARIANTS:
//! 1. All arithmetic uses checked_* variants; overflow surfaces as
//!    `KernelError::OutOfRangeFixedPoint`, never a panic.
//! 2. `Fixed`'s inner `i64` is private. No raw field access outside
//!    `math::fixed`.
//! 3. `BTreeMap`/sorted `Vec` everywhere state needs deterministic
//!    iteration order. `HashMap` never appears on a path that feeds the
//!    canonical serializer or the hasher.
//! 4. Floating-point arithmetic never appears anywhere in this crate. All
//!    math goes through `Fixed`.
//! 5. SHA-256 (FIPS 180-4) is the kernel's sole hash algorithm.

pub mod canon;
pub mod cluster;
pub mod drift;
pub mod engine;
pub mod error;
pub mod graph;
pub mod math;
pub mod model;
pub mod semantic;
pub mod session;
pub mod transition;
pub mod validate;

pub use error::KernelError;
