//! Labeling workload allocation
//!
//! Splits a work batch across the labeler roster in proportion to available
//! time, respecting each labeler's skill focus and hour budget. Runs are pure
//! and deterministic: identical inputs give an identical plan, regardless of
//! the order workers or items were listed in.

pub mod allocator;
pub mod apportion;
pub mod error;
mod repair;
pub mod types;
pub mod validator;

pub use allocator::Allocator;
pub use error::{AllocationError, Invariant};
pub use types::{fingerprint, AllocationPlan, PlanTotals, RepairMove, WorkerAssignment};
pub use validator::validate_plan;
