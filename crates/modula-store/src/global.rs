//! Global state store
//!
//! The application-wide store. On top of a plain [`Store`] it keeps the
//! registry of module stores bound to namespaces of its tree and commits
//! through [`GlobalCommit`], which raises the flags of bound module stores
//! whose namespace covers the mutation.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use parking_lot::RwLock;

use modula_core::{ModulaResult, NamespacePath, StoreConfig};

use crate::{
    CommitFlag, CommitGuard, CommitStrategy, ModuleOptions, ModuleStateStore, RegisterOptions,
    Store,
};

#[derive(Clone)]
struct BoundStore {
    /// Entry key prefix of the namespace in the global store
    prefix: String,
    store: ModuleStateStore,
}

/// Module stores bound to namespaces of a global store.
///
/// Populated by registration, cleared by unregistration, owned by one
/// [`GlobalStateStore`] and never persisted.
#[derive(Default)]
pub struct ModuleStoreRegistry {
    bound: RwLock<BTreeMap<NamespacePath, BoundStore>>,
}

impl ModuleStoreRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(ModuleStoreRegistry::default())
    }

    pub(crate) fn bind(&self, path: NamespacePath, prefix: String, store: ModuleStateStore) {
        self.bound.write().insert(path, BoundStore { prefix, store });
    }

    /// Unbind every store at or below `path`
    pub(crate) fn unbind_below(&self, path: &NamespacePath) -> Vec<ModuleStateStore> {
        let mut bound = self.bound.write();
        let paths: Vec<NamespacePath> = bound
            .keys()
            .filter(|p| p.starts_with(path))
            .cloned()
            .collect();
        paths
            .iter()
            .filter_map(|p| bound.remove(p).map(|b| b.store))
            .collect()
    }

    pub fn get(&self, path: &NamespacePath) -> Option<ModuleStateStore> {
        self.bound.read().get(path).map(|bound| bound.store.clone())
    }

    pub fn contains(&self, path: &NamespacePath) -> bool {
        self.bound.read().contains_key(path)
    }

    pub fn paths(&self) -> Vec<NamespacePath> {
        self.bound.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.bound.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bound.read().is_empty()
    }

    /// Raise the flag of every bound store whose namespace prefixes
    /// `mutation_type` (a fully prefixed global type)
    pub fn raise_covering(&self, mutation_type: &str, guard: &mut CommitGuard) {
        for bound in self.bound.read().values() {
            if mutation_type.starts_with(&bound.prefix) {
                guard.raise(bound.store.committing_flag());
            }
        }
    }
}

impl fmt::Debug for ModuleStoreRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.paths()).finish()
    }
}

/// Commit strategy of the global store
pub struct GlobalCommit {
    registry: Arc<ModuleStoreRegistry>,
}

impl CommitStrategy for GlobalCommit {
    fn sanction(&self, own: &Arc<CommitFlag>, mutation_type: &str, guard: &mut CommitGuard) {
        guard.raise(own);
        self.registry.raise_covering(mutation_type, guard);
    }

    fn name(&self) -> &'static str {
        "global"
    }
}

/// Application-wide store with a registry of bound module stores
#[derive(Clone)]
pub struct GlobalStateStore {
    store: Store,
    registry: Arc<ModuleStoreRegistry>,
}

impl GlobalStateStore {
    pub fn new(options: ModuleOptions, config: StoreConfig) -> ModulaResult<Self> {
        Ok(GlobalStateStore::from_store(Store::new(options, config)?))
    }

    /// Promote an existing store to the global store
    pub fn from_store(store: Store) -> Self {
        let registry = ModuleStoreRegistry::new();
        store.set_strategy(Arc::new(GlobalCommit {
            registry: Arc::clone(&registry),
        }));
        GlobalStateStore { store, registry }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn registry(&self) -> &Arc<ModuleStoreRegistry> {
        &self.registry
    }

    /// See [`crate::register_module_store`]
    pub fn register_module_store(
        &self,
        path: impl Into<NamespacePath>,
        options: ModuleOptions,
        register: RegisterOptions,
    ) -> ModulaResult<ModuleStateStore> {
        crate::register_module_store(self, path, options, register)
    }

    /// See [`crate::unregister_module_store`]
    pub fn unregister_module_store(&self, path: impl Into<NamespacePath>) -> bool {
        crate::unregister_module_store(self, path)
    }

    /// Module store bound at `path`
    pub fn module_store(&self, path: &NamespacePath) -> Option<ModuleStateStore> {
        self.registry.get(path)
    }

    /// Remove a runtime module, unlinking its module store first if one is
    /// bound there
    pub fn unregister_module(&self, path: &NamespacePath) -> ModulaResult<()> {
        if self.registry.contains(path) {
            self.unregister_module_store(path.clone());
            return Ok(());
        }
        self.store.unregister_module(path)
    }
}

impl Deref for GlobalStateStore {
    type Target = Store;

    fn deref(&self) -> &Store {
        &self.store
    }
}

impl fmt::Debug for GlobalStateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalStateStore")
            .field("store", &self.store)
            .field("bound", &self.registry)
            .finish()
    }
}
