//! Commit strategies
//!
//! A store delegates the "which flags must be raised for this commit"
//! decision to a [`CommitStrategy`]. Plain stores raise only their own flag;
//! the global store and module stores swap in strategies that also raise
//! the flags of the stores they share state with.

use std::sync::Arc;

use crate::{CommitFlag, CommitGuard};

/// Decides which flags a commit raises
pub trait CommitStrategy: Send + Sync {
    /// Raise every flag that must be true while `mutation_type` is applied.
    /// `own` is the committing store's flag.
    fn sanction(&self, own: &Arc<CommitFlag>, mutation_type: &str, guard: &mut CommitGuard);

    /// Short name for logs
    fn name(&self) -> &'static str;
}

/// Raises only the committing store's flag
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalCommit;

impl CommitStrategy for LocalCommit {
    fn sanction(&self, own: &Arc<CommitFlag>, _mutation_type: &str, guard: &mut CommitGuard) {
        guard.raise(own);
    }

    fn name(&self) -> &'static str {
        "local"
    }
}
