//! Store Fuzzer - Randomized commits across global and module stores
//!
//! Tests:
//! - Mutual observability of global and module handles
//! - Getter agreement between both handles
//! - Flag restoration after every commit
//! - Isolation of unregistered handles

use modula_core::{json, ModulaResult, NamespacePath, StoreConfig};
use modula_store::{GlobalStateStore, ModuleOptions, ModuleStateStore, RegisterOptions};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::fixtures::counter_options;

/// Fuzzer configuration
#[derive(Clone, Debug)]
pub struct FuzzerConfig {
    /// Number of module slots
    pub module_count: usize,
    /// Number of operations to run
    pub op_count: usize,
    /// Probability a commit goes through the global store
    pub global_commit_prob: f64,
    /// Probability an operation unregisters its module
    pub unregister_prob: f64,
    /// Run with strict stores
    pub strict: bool,
    /// Random seed
    pub seed: u64,
}

impl Default for FuzzerConfig {
    fn default() -> Self {
        FuzzerConfig {
            module_count: 4,
            op_count: 1000,
            global_commit_prob: 0.5,
            unregister_prob: 0.02,
            strict: true,
            seed: 42,
        }
    }
}

impl FuzzerConfig {
    /// Light fuzzing for quick tests
    pub fn light() -> Self {
        FuzzerConfig {
            module_count: 2,
            op_count: 100,
            global_commit_prob: 0.5,
            unregister_prob: 0.05,
            strict: true,
            seed: 42,
        }
    }

    /// Heavy fuzzing for thorough testing
    pub fn heavy() -> Self {
        FuzzerConfig {
            module_count: 16,
            op_count: 20000,
            global_commit_prob: 0.5,
            unregister_prob: 0.01,
            strict: true,
            seed: 42,
        }
    }
}

/// One module slot: the live handle and the counter it should hold
struct Slot {
    path: NamespacePath,
    store: Option<ModuleStateStore>,
    expected: i64,
    /// Handles unregistered from this slot, with their last counter
    detached: Vec<(ModuleStateStore, i64)>,
}

/// Fuzzing outcome
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FuzzResult {
    pub ops: usize,
    pub commits: usize,
    pub registrations: usize,
    pub unregistrations: usize,
    /// Handles disagreeing on state or getters
    pub divergences: usize,
    /// Flags still raised after a commit returned
    pub flag_leaks: usize,
    /// Commits or lookups that returned an error
    pub errors: usize,
    /// Detached handles whose writes reached the global store
    pub isolation_breaches: usize,
}

impl FuzzResult {
    pub fn passed(&self) -> bool {
        self.divergences == 0 && self.flag_leaks == 0 && self.errors == 0 && self.isolation_breaches == 0
    }
}

/// Store fuzzer
pub struct StoreFuzzer {
    config: FuzzerConfig,
    global: GlobalStateStore,
    slots: Vec<Slot>,
    rng: StdRng,
    result: FuzzResult,
}

impl StoreFuzzer {
    pub fn new(config: FuzzerConfig) -> ModulaResult<Self> {
        let store_config = if config.strict {
            StoreConfig::development()
        } else {
            StoreConfig::production()
        };
        let global = GlobalStateStore::new(ModuleOptions::new(), store_config)?;
        let slots = (0..config.module_count)
            .map(|i| Slot {
                path: NamespacePath::from(format!("m{i}")),
                store: None,
                expected: 0,
                detached: Vec::new(),
            })
            .collect();

        Ok(StoreFuzzer {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            global,
            slots,
            result: FuzzResult::default(),
        })
    }

    pub fn global(&self) -> &GlobalStateStore {
        &self.global
    }

    /// Run the fuzzer
    pub fn run(&mut self) -> FuzzResult {
        for i in 0..self.slots.len() {
            self.register(i);
        }

        for _ in 0..self.config.op_count {
            let i = self.rng.gen_range(0..self.slots.len());
            self.step(i);
            self.result.ops += 1;
            self.check(i);
        }

        debug!(result = ?self.result, "store fuzzing finished");
        self.result.clone()
    }

    fn step(&mut self, i: usize) {
        if self.slots[i].store.is_none() {
            self.register(i);
            return;
        }
        if self.rng.gen::<f64>() < self.config.unregister_prob {
            self.unregister(i);
            return;
        }

        let delta: i64 = self.rng.gen_range(-10..=10);
        let via_global = self.rng.gen::<f64>() < self.config.global_commit_prob;
        let slot = &mut self.slots[i];
        let outcome = match (&slot.store, via_global) {
            (_, true) => self.global.commit(&format!("{}add", slot.path.prefix()), json!(delta)),
            (Some(store), false) => store.commit("add", json!(delta)),
            (None, false) => return,
        };
        self.result.commits += 1;
        match outcome {
            Ok(()) => slot.expected += delta,
            Err(_) => self.result.errors += 1,
        }

        // poke a detached handle now and then; it must stay isolated
        if let Some((store, counter)) = slot.detached.last_mut() {
            if store.commit("increment", json!(null)).is_ok() {
                *counter += 1;
            } else {
                self.result.errors += 1;
            }
        }
    }

    fn register(&mut self, i: usize) {
        let slot = &mut self.slots[i];
        match self.global.register_module_store(
            slot.path.clone(),
            counter_options(0),
            RegisterOptions::default(),
        ) {
            Ok(store) => {
                slot.store = Some(store);
                slot.expected = 0;
                self.result.registrations += 1;
            }
            Err(_) => self.result.errors += 1,
        }
    }

    fn unregister(&mut self, i: usize) {
        let slot = &mut self.slots[i];
        if !self.global.unregister_module_store(slot.path.clone()) {
            self.result.errors += 1;
            return;
        }
        if let Some(store) = slot.store.take() {
            slot.detached.push((store, slot.expected));
        }
        self.result.unregistrations += 1;
    }

    fn check(&mut self, i: usize) {
        let slot = &self.slots[i];
        let key = slot.path.key();

        if self.global.is_committing() {
            self.result.flag_leaks += 1;
        }
        for (store, counter) in &slot.detached {
            if store.is_committing() {
                self.result.flag_leaks += 1;
            }
            if store.state().get("counter") != Some(json!(*counter)) {
                self.result.divergences += 1;
            }
        }

        let Some(store) = &slot.store else {
            if self.global.state().contains(&key) {
                self.result.isolation_breaches += 1;
            }
            return;
        };
        if store.is_committing() {
            self.result.flag_leaks += 1;
        }

        let expected = json!(slot.expected);
        let via_global = self.global.snapshot()[key.as_str()]["counter"].clone();
        let via_module = store.state().get("counter");
        if via_global != expected || via_module.as_ref() != Some(&expected) {
            self.result.divergences += 1;
        }

        let square = json!(slot.expected * slot.expected);
        match (
            self.global.getter(&format!("{}square", slot.path.prefix())),
            store.getter("square"),
        ) {
            (Ok(a), Ok(b)) if a == square && b == square => {}
            (Ok(_), Ok(_)) => self.result.divergences += 1,
            _ => self.result.errors += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_light_fuzzing() {
        let mut fuzzer = StoreFuzzer::new(FuzzerConfig::light()).unwrap();
        let result = fuzzer.run();
        assert!(result.passed(), "{result:?}");
        assert_eq!(result.ops, 100);
        assert!(result.commits > 0);
    }

    #[test]
    fn test_default_fuzzing() {
        let mut fuzzer = StoreFuzzer::new(FuzzerConfig::default()).unwrap();
        let result = fuzzer.run();
        assert!(result.passed(), "{result:?}");
        assert!(result.unregistrations > 0);
    }

    #[test]
    fn test_relaxed_stores() {
        let config = FuzzerConfig {
            strict: false,
            ..FuzzerConfig::light()
        };
        let result = StoreFuzzer::new(config).unwrap().run();
        assert!(result.passed(), "{result:?}");
    }

    #[test]
    fn test_same_seed_same_run() {
        let a = StoreFuzzer::new(FuzzerConfig::light()).unwrap().run();
        let b = StoreFuzzer::new(FuzzerConfig::light()).unwrap().run();
        assert_eq!(a, b);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn test_any_seed_passes(seed in any::<u64>(), global_commit_prob in 0.0f64..=1.0) {
            let config = FuzzerConfig {
                seed,
                global_commit_prob,
                ..FuzzerConfig::light()
            };
            let result = StoreFuzzer::new(config).unwrap().run();
            prop_assert!(result.passed(), "{:?}", result);
        }
    }
}
