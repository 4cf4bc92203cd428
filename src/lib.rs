// Library exports for label-allocator
// This allows the modules to be imported in tests and external code

pub mod allocation;
pub mod config;
pub mod model;
pub mod persistence;
pub mod utils;
