//! Modula Core - Fundamental types and primitives
//!
//! This crate defines the core types shared by the store and router crates:
//! - Namespace paths (module locations in the state tree)
//! - The state value model (JSON values)
//! - Error types
//! - Store configuration

pub mod config;
pub mod error;
pub mod namespace;
pub mod value;

pub use config::*;
pub use error::*;
pub use namespace::*;
pub use value::*;
