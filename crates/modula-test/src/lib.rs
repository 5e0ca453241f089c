//! Modula Test Harness - Fuzzing and end-to-end validation
//!
//! This crate provides:
//! - Shared store fixtures and an in-memory router double
//! - Seeded fuzzing of global and module store synchronization
//! - End-to-end integration scenarios

pub mod fixtures;
pub mod integration;
pub mod store_fuzzer;

pub use fixtures::*;
pub use integration::*;
pub use store_fuzzer::*;
