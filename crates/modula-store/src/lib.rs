//! Modula Store - Hierarchical state store with shared module stores
//!
//! This crate implements the state side of Modula:
//! - The state tree (`Arc`-shared nodes with strict-mode watchers)
//! - The base store: commits, dispatches, getters, runtime modules
//! - Sanctioned-mutation flags and commit strategies
//! - The global store and module stores sharing its subtrees
//! - Mapping helpers for component-scoped lookups

pub mod collection;
pub mod context;
pub mod flag;
pub mod global;
pub mod handlers;
pub mod helpers;
pub mod module;
pub mod options;
pub mod state;
pub mod store;
pub mod strategy;

pub use collection::*;
pub use context::*;
pub use flag::*;
pub use global::*;
pub use handlers::*;
pub use helpers::*;
pub use module::*;
pub use options::*;
pub use state::*;
pub use store::*;
pub use strategy::*;
