//! Allocation inputs
//!
//! Work items, the labeler roster and the time model. All three are built once
//! per run from upstream files and never mutated by the allocator.

pub mod item;
pub mod time_model;
pub mod worker;

pub use item::{ItemError, ItemType, Variant, WorkBatch, WorkItem};
pub use time_model::{TimeModel, TimeModelError};
pub use worker::{RegistryError, Worker, WorkerRegistry};
