//! Sanctioned-mutation flags
//!
//! Every store owns a [`CommitFlag`]. While a commit runs, the flags of all
//! stores watching the written state must be raised; a [`CommitGuard`]
//! raises them and lowers every flag again when dropped, including during
//! panic unwinding.
//!
//! A flag counts the guards holding it and reads raised while any of them
//! is alive, across threads.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Per-store "a commit is in progress" flag
#[derive(Debug, Default)]
pub struct CommitFlag {
    /// Guards currently holding the flag
    depth: AtomicU64,
    /// Number of times the flag was raised by a guard
    raised: AtomicU64,
}

impl CommitFlag {
    pub fn new() -> Arc<Self> {
        Arc::new(CommitFlag::default())
    }

    #[inline]
    pub fn get(&self) -> bool {
        self.depth.load(Ordering::Acquire) > 0
    }

    /// Guards currently holding the flag
    pub fn depth(&self) -> u64 {
        self.depth.load(Ordering::Acquire)
    }

    /// How many times a guard raised this flag
    pub fn raise_count(&self) -> u64 {
        self.raised.load(Ordering::Relaxed)
    }

    fn raise(&self) {
        self.raised.fetch_add(1, Ordering::Relaxed);
        self.depth.fetch_add(1, Ordering::AcqRel);
    }

    fn lower(&self) {
        self.depth.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Raises flags for the duration of a commit
#[derive(Debug, Default)]
pub struct CommitGuard {
    /// Flags this guard raised, in raise order
    raised: Vec<Arc<CommitFlag>>,
}

impl CommitGuard {
    pub fn new() -> Self {
        CommitGuard::default()
    }

    /// Raise a flag. A flag already raised by this guard is skipped, so each
    /// flag is toggled at most once per guard.
    pub fn raise(&mut self, flag: &Arc<CommitFlag>) {
        if self.raised.iter().any(|f| Arc::ptr_eq(f, flag)) {
            return;
        }
        flag.raise();
        self.raised.push(Arc::clone(flag));
    }

    /// Number of distinct flags raised
    pub fn len(&self) -> usize {
        self.raised.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raised.is_empty()
    }
}

impl Drop for CommitGuard {
    fn drop(&mut self) {
        for flag in self.raised.drain(..).rev() {
            flag.lower();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_guard_restores() {
        let flag = CommitFlag::new();
        {
            let mut guard = CommitGuard::new();
            guard.raise(&flag);
            assert!(flag.get());
        }
        assert!(!flag.get());
        assert_eq!(flag.raise_count(), 1);
    }

    #[test]
    fn test_guard_skips_duplicates() {
        let flag = CommitFlag::new();
        let mut guard = CommitGuard::new();
        guard.raise(&flag);
        guard.raise(&flag);
        assert_eq!(guard.len(), 1);
        assert_eq!(flag.raise_count(), 1);
        drop(guard);
        assert!(!flag.get());
    }

    #[test]
    fn test_nested_guards_restore_outer_value() {
        let flag = CommitFlag::new();
        let mut outer = CommitGuard::new();
        outer.raise(&flag);
        {
            let mut inner = CommitGuard::new();
            inner.raise(&flag);
        }
        // inner guard must not clobber the outer commit
        assert!(flag.get());
        drop(outer);
        assert!(!flag.get());
    }

    #[test]
    fn test_guard_restores_on_panic() {
        let flag = CommitFlag::new();
        let cloned = Arc::clone(&flag);
        let result = std::panic::catch_unwind(move || {
            let mut guard = CommitGuard::new();
            guard.raise(&cloned);
            panic!("mutation failed");
        });
        assert!(result.is_err());
        assert!(!flag.get());
    }

    #[test]
    fn test_overlapping_guards_across_threads() {
        let flag = CommitFlag::new();
        let mut first = CommitGuard::new();
        first.raise(&flag);

        // a second commit on another thread starts, then the first ends
        let (raised_tx, raised_rx) = std::sync::mpsc::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
        let other = Arc::clone(&flag);
        let handle = std::thread::spawn(move || {
            let mut second = CommitGuard::new();
            second.raise(&other);
            raised_tx.send(()).unwrap();
            release_rx.recv().unwrap();
            other.get()
        });
        raised_rx.recv().unwrap();
        drop(first);
        assert!(flag.get());
        release_tx.send(()).unwrap();
        assert!(handle.join().unwrap());
        assert!(!flag.get());
        assert_eq!(flag.depth(), 0);
    }

    proptest! {
        #[test]
        fn prop_nesting_restores_initial(initial in any::<bool>(), depth in 1usize..16) {
            let flag = CommitFlag::new();
            let mut outer = CommitGuard::new();
            if initial {
                outer.raise(&flag);
            }
            let mut guards = Vec::new();
            for _ in 0..depth {
                let mut guard = CommitGuard::new();
                guard.raise(&flag);
                guards.push(guard);
                prop_assert!(flag.get());
            }
            while let Some(guard) = guards.pop() {
                drop(guard);
            }
            prop_assert_eq!(flag.get(), initial);
            prop_assert_eq!(flag.raise_count(), depth as u64 + u64::from(initial));
            drop(outer);
            prop_assert!(!flag.get());
        }
    }
}
