//! Module stores
//!
//! A [`ModuleStateStore`] is a store whose root state is a live subtree of
//! the global store. Its entry tables hold the very same entries the global
//! store installed for that namespace, under un-prefixed names, and its
//! commits go through [`LinkedCommit`] so the global store's strict watcher
//! accepts the write. Unregistering swaps the strategy back to a local one;
//! from then on the handle is an independent store.

use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use tracing::{debug, trace, warn};

use modula_core::{ModulaError, ModulaResult, NamespacePath, StoreConfig};

use crate::{
    CommitFlag, CommitGuard, CommitStrategy, GlobalStateStore, LocalCommit, ModuleOptions,
    ModuleStoreRegistry, RegisterOptions, Store,
};

/// Commit strategy of a module store bound to a global store
struct LinkedCommit {
    global_flag: Arc<CommitFlag>,
    registry: Weak<ModuleStoreRegistry>,
    /// Entry key prefix of the module in the global store
    prefix: String,
}

impl CommitStrategy for LinkedCommit {
    fn sanction(&self, own: &Arc<CommitFlag>, mutation_type: &str, guard: &mut CommitGuard) {
        guard.raise(own);
        guard.raise(&self.global_flag);
        if let Some(registry) = self.registry.upgrade() {
            let global_type = format!("{}{}", self.prefix, mutation_type);
            registry.raise_covering(&global_type, guard);
        }
        trace!(prefix = %self.prefix, flags = guard.len(), "linked commit");
    }

    fn name(&self) -> &'static str {
        "linked"
    }
}

/// Store handle for one module, sharing its state with the global store
#[derive(Clone)]
pub struct ModuleStateStore {
    store: Store,
    path: NamespacePath,
    linked: Arc<AtomicBool>,
}

impl ModuleStateStore {
    /// Path of the module in the global store
    pub fn path(&self) -> &NamespacePath {
        &self.path
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Check if the handle is still bound to the global store
    pub fn is_linked(&self) -> bool {
        self.linked.load(Ordering::Acquire)
    }

    fn unlink(&self) {
        self.store.set_strategy(Arc::new(LocalCommit));
        self.linked.store(false, Ordering::Release);
    }
}

impl Deref for ModuleStateStore {
    type Target = Store;

    fn deref(&self) -> &Store {
        &self.store
    }
}

impl fmt::Debug for ModuleStateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleStateStore")
            .field("path", &self.path)
            .field("linked", &self.is_linked())
            .field("state", &self.store.snapshot())
            .finish()
    }
}

/// Register `options` as a namespaced module at `path` of the global store
/// and return a module store sharing its state.
///
/// Fails with [`ModulaError::RootRegistration`] for the root path and with
/// [`ModulaError::NamespaceCollision`] when the path is taken; in both cases
/// nothing is installed.
pub fn register_module_store(
    global: &GlobalStateStore,
    path: impl Into<NamespacePath>,
    options: ModuleOptions,
    register: RegisterOptions,
) -> ModulaResult<ModuleStateStore> {
    let path = path.into();
    if path.is_root() {
        return Err(ModulaError::RootRegistration);
    }

    // key prefixing needs the module namespaced, whatever it declared
    global
        .store()
        .register_module_as(&path, &options, register, true)?;

    let node = global
        .module_state(&path)
        .ok_or_else(|| ModulaError::ModuleNotFound(path.clone()))?;
    let config = StoreConfig {
        strict: global.is_strict(),
        label: path.key(),
    };
    let store = Store::with_shared_state(node, &options, config);
    link_entries(global.store(), &store, &path, &NamespacePath::root(), &options);

    let prefix = global.namespace_of(&path);
    store.set_strategy(Arc::new(LinkedCommit {
        global_flag: Arc::clone(global.committing_flag()),
        registry: Arc::downgrade(global.registry()),
        prefix: prefix.clone(),
    }));

    let module = ModuleStateStore {
        store,
        path: path.clone(),
        linked: Arc::new(AtomicBool::new(true)),
    };
    global.registry().bind(path.clone(), prefix, module.clone());

    debug!(module = %path, "module store registered");
    Ok(module)
}

/// Copy the global entries of a module (and its nested modules) into the
/// module store's tables under the module store's own namespaces
fn link_entries(
    global: &Store,
    module: &Store,
    base: &NamespacePath,
    path: &NamespacePath,
    options: &ModuleOptions,
) {
    let global_ns = global.namespace_of(&base.concat(path));
    let module_ns = module.namespace_of(path);

    for name in options.getters.keys() {
        if let Some(entry) = global.getter_entry(&format!("{global_ns}{name}")) {
            module.insert_getter_entry(format!("{module_ns}{name}"), entry);
        }
    }
    for name in options.mutations.keys() {
        if let Some(entries) = global.mutation_entries(&format!("{global_ns}{name}")) {
            module.insert_mutation_entries(format!("{module_ns}{name}"), entries);
        }
    }
    for name in options.actions.keys() {
        if let Some(entries) = global.action_entries(&format!("{global_ns}{name}")) {
            module.insert_action_entries(format!("{module_ns}{name}"), entries);
        }
    }

    for (name, nested) in &options.modules {
        link_entries(global, module, base, &path.child(name.as_str()), nested);
    }
}

/// Unlink the module store bound at `path` (and any bound below it), then
/// remove the module's state from the global tree.
///
/// Returns `false` without touching anything when no store is bound there.
pub fn unregister_module_store(global: &GlobalStateStore, path: impl Into<NamespacePath>) -> bool {
    let path = path.into();
    if !global.registry().contains(&path) {
        debug!(module = %path, "no module store bound, nothing to unregister");
        return false;
    }

    for module in global.registry().unbind_below(&path) {
        module.unlink();
        debug!(module = %module.path(), "module store unlinked");
    }

    if let Err(err) = global.store().unregister_module(&path) {
        warn!(module = %path, error = %err, "module state could not be removed");
    }
    true
}
