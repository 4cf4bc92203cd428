//! Integration tests for label-allocator
//!
//! These tests drive the compiled binary end to end: project init,
//! allocation, plan writing and plan checking.

// Test utilities and common setup
mod common;

mod cli_tests;

// Re-export common utilities for use by test modules
pub use common::*;
