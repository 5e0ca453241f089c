//! Base state store
//!
//! [`Store`] is a cheap-to-clone handle. It owns a state tree (or shares a
//! subtree, for module stores), the module collection describing that tree,
//! the entry tables, its sanctioned-mutation flag and the commit strategy
//! deciding which flags a commit raises.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace};

use modula_core::{ModulaError, ModulaResult, NamespacePath, StoreConfig, Value};

use crate::collection::split_path;
use crate::handlers::Handlers;
use crate::{
    ActionEntry, BoxFuture, CommitFlag, CommitGuard, CommitStrategy, GetterEntry, LocalCommit,
    ModuleCollection, ModuleOptions, ModuleRecord, MutationEntry, RegisterOptions, StateNode,
};

pub(crate) struct StoreInner {
    config: StoreConfig,
    root: Arc<StateNode>,
    modules: RwLock<ModuleCollection>,
    handlers: RwLock<Handlers>,
    committing: Arc<CommitFlag>,
    strategy: RwLock<Arc<dyn CommitStrategy>>,
}

impl Drop for StoreInner {
    fn drop(&mut self) {
        // a dropped module store stops guarding the subtree it shared
        self.root.unwatch(&self.committing);
    }
}

/// State store handle
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    /// Create a store from root options
    pub fn new(options: ModuleOptions, config: StoreConfig) -> ModulaResult<Store> {
        let record = ModuleRecord::build(&options, &NamespacePath::root(), false, false)?;
        let mut handlers = Handlers::default();
        handlers.check_getters(&record, "")?;

        let root = Arc::clone(&record.state);
        let store = Store::assemble(root, ModuleCollection::new(record), config);
        let owner = Arc::downgrade(&store.inner);
        handlers.install(
            &owner,
            store.inner.modules.read().root(),
            &NamespacePath::root(),
            "",
        );
        *store.inner.handlers.write() = handlers;

        debug!(
            store = %store.label(),
            strict = store.is_strict(),
            "store created"
        );
        Ok(store)
    }

    /// Store over a subtree that already exists elsewhere. The collection
    /// mirrors the nested modules of `options` without rebuilding their
    /// state; no entries are installed.
    pub(crate) fn with_shared_state(
        node: Arc<StateNode>,
        options: &ModuleOptions,
        config: StoreConfig,
    ) -> Store {
        let record = ModuleRecord::mirror(options, Arc::clone(&node));
        Store::assemble(node, ModuleCollection::new(record), config)
    }

    fn assemble(root: Arc<StateNode>, modules: ModuleCollection, config: StoreConfig) -> Store {
        let committing = CommitFlag::new();
        if config.strict {
            root.watch(config.label.clone(), &committing);
        }
        Store {
            inner: Arc::new(StoreInner {
                config,
                root,
                modules: RwLock::new(modules),
                handlers: RwLock::new(Handlers::default()),
                committing,
                strategy: RwLock::new(Arc::new(LocalCommit)),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<StoreInner>) -> Store {
        Store { inner }
    }

    pub(crate) fn downgrade(&self) -> std::sync::Weak<StoreInner> {
        Arc::downgrade(&self.inner)
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    pub fn label(&self) -> &str {
        &self.inner.config.label
    }

    pub fn is_strict(&self) -> bool {
        self.inner.config.strict
    }

    /// Live root state node
    pub fn state(&self) -> Arc<StateNode> {
        Arc::clone(&self.inner.root)
    }

    /// Snapshot of the whole state
    pub fn snapshot(&self) -> Value {
        self.inner.root.snapshot()
    }

    /// Check if two handles point at the same store
    pub fn ptr_eq(&self, other: &Store) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // ========================================================================
    // Commit
    // ========================================================================

    pub fn committing_flag(&self) -> &Arc<CommitFlag> {
        &self.inner.committing
    }

    pub fn is_committing(&self) -> bool {
        self.inner.committing.get()
    }

    /// Replace the commit strategy
    pub fn set_strategy(&self, strategy: Arc<dyn CommitStrategy>) {
        *self.inner.strategy.write() = strategy;
    }

    pub fn strategy_name(&self) -> &'static str {
        self.inner.strategy.read().name()
    }

    /// Apply a mutation. Every flag the strategy raises is restored on
    /// return, whether the mutation succeeded, failed or panicked.
    pub fn commit(&self, mutation_type: &str, payload: Value) -> ModulaResult<()> {
        let entries = self
            .mutation_entries(mutation_type)
            .ok_or_else(|| ModulaError::UnknownMutation(mutation_type.to_owned()))?;
        let strategy = Arc::clone(&*self.inner.strategy.read());

        let mut guard = CommitGuard::new();
        strategy.sanction(&self.inner.committing, mutation_type, &mut guard);
        trace!(
            store = %self.label(),
            mutation = mutation_type,
            strategy = strategy.name(),
            flags = guard.len(),
            "commit"
        );

        for entry in &entries {
            entry.apply(&payload)?;
        }
        Ok(())
    }

    /// Run `f` with this store's own flag raised
    pub fn with_commit<R>(&self, f: impl FnOnce() -> R) -> R {
        let mut guard = CommitGuard::new();
        guard.raise(&self.inner.committing);
        f()
    }

    /// Replace the root module's local fields
    pub fn replace_state(&self, state: Value) -> ModulaResult<()> {
        let fields = modula_core::into_state_map(state)
            .ok_or_else(|| ModulaError::InvalidState(NamespacePath::root()))?;
        self.with_commit(|| self.inner.root.replace(fields))
    }

    // ========================================================================
    // Dispatch and getters
    // ========================================================================

    /// Run an action. With several handlers under one type they run in
    /// registration order and their results are collected into an array.
    pub fn dispatch(&self, action_type: &str, payload: Value) -> BoxFuture<'static, ModulaResult<Value>> {
        let Some(entries) = self.action_entries(action_type) else {
            let err = ModulaError::UnknownAction(action_type.to_owned());
            return Box::pin(std::future::ready(Err(err)));
        };
        trace!(store = %self.label(), action = action_type, "dispatch");

        if entries.len() == 1 {
            return entries[0].call(payload);
        }
        Box::pin(async move {
            let mut results = Vec::with_capacity(entries.len());
            for entry in &entries {
                results.push(entry.call(payload.clone()).await?);
            }
            Ok(Value::Array(results))
        })
    }

    /// Evaluate a getter
    pub fn getter(&self, name: &str) -> ModulaResult<Value> {
        let entry = self
            .getter_entry(name)
            .ok_or_else(|| ModulaError::UnknownGetter(name.to_owned()))?;
        Ok(entry.evaluate())
    }

    /// Evaluate every getter
    pub fn getters(&self) -> BTreeMap<String, Value> {
        let entries: Vec<(String, GetterEntry)> = self
            .inner
            .handlers
            .read()
            .getters
            .iter()
            .map(|(k, e)| (k.clone(), e.clone()))
            .collect();
        entries
            .into_iter()
            .map(|(key, entry)| (key, entry.evaluate()))
            .collect()
    }

    pub fn getter_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.handlers.read().getters.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn has_mutation(&self, mutation_type: &str) -> bool {
        self.inner.handlers.read().mutations.contains_key(mutation_type)
    }

    pub fn has_action(&self, action_type: &str) -> bool {
        self.inner.handlers.read().actions.contains_key(action_type)
    }

    // ========================================================================
    // Entry tables
    // ========================================================================

    pub fn mutation_entries(&self, mutation_type: &str) -> Option<Vec<MutationEntry>> {
        self.inner.handlers.read().mutations.get(mutation_type).cloned()
    }

    pub fn action_entries(&self, action_type: &str) -> Option<Vec<ActionEntry>> {
        self.inner.handlers.read().actions.get(action_type).cloned()
    }

    pub fn getter_entry(&self, name: &str) -> Option<GetterEntry> {
        self.inner.handlers.read().getters.get(name).cloned()
    }

    pub(crate) fn insert_mutation_entries(&self, key: String, entries: Vec<MutationEntry>) {
        self.inner.handlers.write().mutations.insert(key, entries);
    }

    pub(crate) fn insert_action_entries(&self, key: String, entries: Vec<ActionEntry>) {
        self.inner.handlers.write().actions.insert(key, entries);
    }

    pub(crate) fn insert_getter_entry(&self, key: String, entry: GetterEntry) {
        self.inner.handlers.write().getters.insert(key, entry);
    }

    // ========================================================================
    // Modules
    // ========================================================================

    pub fn has_module(&self, path: &NamespacePath) -> bool {
        self.inner.modules.read().contains(path)
    }

    /// Live state node of a registered module
    pub fn module_state(&self, path: &NamespacePath) -> Option<Arc<StateNode>> {
        self.inner
            .modules
            .read()
            .get(path)
            .map(|record| Arc::clone(record.state()))
    }

    /// Entry key prefix of the module at `path`
    pub fn namespace_of(&self, path: &NamespacePath) -> String {
        self.inner.modules.read().namespace(path)
    }

    /// Namespacing the module at `path` declared in its options
    pub fn declared_namespaced(&self, path: &NamespacePath) -> Option<bool> {
        self.inner
            .modules
            .read()
            .get(path)
            .map(|record| record.declared_namespaced())
    }

    /// Register a module below the root at runtime
    pub fn register_module(
        &self,
        path: impl Into<NamespacePath>,
        options: ModuleOptions,
        register: RegisterOptions,
    ) -> ModulaResult<()> {
        let namespaced = options.namespaced;
        self.register_module_as(&path.into(), &options, register, namespaced)
    }

    /// Registration primitive. `namespaced` decides key prefixing for the
    /// top module; the record keeps the flag declared in `options`. Every
    /// check runs before anything is attached or installed.
    pub(crate) fn register_module_as(
        &self,
        path: &NamespacePath,
        options: &ModuleOptions,
        register: RegisterOptions,
        namespaced: bool,
    ) -> ModulaResult<()> {
        let (parent_path, key) = split_path(path)?;
        let mut modules = self.inner.modules.write();
        let parent_node = modules
            .get(&parent_path)
            .map(|parent| Arc::clone(parent.state()))
            .ok_or_else(|| ModulaError::ParentNotFound(parent_path.clone()))?;

        let preserved = if register.preserve_state {
            match parent_node.read(|fields| fields.get(key).cloned()) {
                Some(Value::Object(fields)) => Some(fields),
                _ => None,
            }
        } else {
            None
        };

        let occupied = match preserved {
            Some(_) => parent_node.child(key).is_some(),
            None => parent_node.contains(key),
        };
        if occupied || modules.contains(path) {
            return Err(ModulaError::NamespaceCollision(path.clone()));
        }

        let adopted = preserved.is_some();
        let record = match preserved {
            Some(fields) => ModuleRecord::build_with_fields(options, path, namespaced, true, fields)?,
            None => ModuleRecord::build(options, path, namespaced, true)?,
        };

        let parent_namespace = modules.namespace(&parent_path);
        let prefix = if namespaced {
            format!("{parent_namespace}{key}/")
        } else {
            parent_namespace
        };
        self.inner.handlers.read().check_getters(&record, &prefix)?;

        if adopted {
            parent_node.take_field(key);
        }
        parent_node.attach(key, Arc::clone(record.state()))?;
        self.inner
            .handlers
            .write()
            .install(&self.downgrade(), &record, path, &prefix);
        modules.insert(path, record)?;

        debug!(store = %self.label(), module = %path, prefix = %prefix, "module registered");
        Ok(())
    }

    /// Remove a runtime-registered module and its state. Entry tables are
    /// rebuilt from the remaining modules; their state nodes are kept, so
    /// entries copied elsewhere stay bound to live state.
    pub fn unregister_module(&self, path: &NamespacePath) -> ModulaResult<()> {
        let (parent_path, key) = split_path(path)?;
        let mut modules = self.inner.modules.write();
        modules.remove(path)?;
        if let Some(parent) = modules.get(&parent_path) {
            parent.state().detach(key);
        }

        let mut handlers = Handlers::default();
        handlers.install(&self.downgrade(), modules.root(), &NamespacePath::root(), "");
        *self.inner.handlers.write() = handlers;

        debug!(store = %self.label(), module = %path, "module unregistered");
        Ok(())
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("label", &self.label())
            .field("strict", &self.is_strict())
            .field("strategy", &self.strategy_name())
            .field("state", &self.snapshot())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modula_core::json;

    fn counter_options() -> ModuleOptions {
        ModuleOptions::new()
            .state(json!({ "counter": 1 }))
            .getter("square", |state, _| {
                let n = state["counter"].as_i64().unwrap_or(0);
                json!(n * n)
            })
            .getter("squarePlusOne", |_, getters| {
                let square = getters.get("square").ok().and_then(|v| v.as_i64()).unwrap_or(0);
                json!(square + 1)
            })
            .mutation("increment", |state, _| {
                let n = state["counter"].as_i64().unwrap_or(0);
                state.insert("counter".into(), json!(n + 1));
            })
            .mutation("set", |state, payload| {
                state.insert("counter".into(), payload.clone());
            })
            .action("incrementTwice", |ctx, _| {
                Box::pin(async move {
                    ctx.commit("increment", Value::Null)?;
                    ctx.commit("increment", Value::Null)?;
                    Ok(ctx.field("counter").unwrap_or(Value::Null))
                })
            })
    }

    #[test]
    fn test_commit_and_getters() {
        let store = Store::new(counter_options(), StoreConfig::development()).unwrap();
        assert_eq!(store.getter("square").unwrap(), json!(1));

        store.commit("increment", Value::Null).unwrap();
        assert_eq!(store.state().get("counter"), Some(json!(2)));
        assert_eq!(store.getter("square").unwrap(), json!(4));
        assert_eq!(store.getter("squarePlusOne").unwrap(), json!(5));
        assert!(!store.is_committing());
    }

    #[test]
    fn test_unknown_entries() {
        let store = Store::new(counter_options(), StoreConfig::development()).unwrap();
        assert_eq!(
            store.commit("missing", Value::Null),
            Err(ModulaError::UnknownMutation("missing".into()))
        );
        assert_eq!(
            store.getter("missing"),
            Err(ModulaError::UnknownGetter("missing".into()))
        );
    }

    #[test]
    fn test_strict_rejects_direct_write() {
        let store = Store::new(counter_options(), StoreConfig::development()).unwrap();
        let err = store
            .state()
            .write(|s| s.insert("counter".into(), json!(100)))
            .unwrap_err();
        assert!(matches!(err, ModulaError::StrictModeViolation { .. }));
        assert_eq!(store.state().get("counter"), Some(json!(1)));
    }

    #[test]
    fn test_drop_removes_watcher() {
        let store = Store::new(counter_options(), StoreConfig::development()).unwrap();
        let root = store.state();
        assert_eq!(root.watcher_count(), 1);

        drop(store);
        assert_eq!(root.watcher_count(), 0);
        assert!(root.write(|s| s.insert("counter".into(), json!(2))).is_ok());
    }

    #[test]
    fn test_relaxed_allows_direct_write() {
        let store = Store::new(counter_options(), StoreConfig::production()).unwrap();
        store
            .state()
            .write(|s| s.insert("counter".into(), json!(100)))
            .unwrap();
        assert_eq!(store.getter("square").unwrap(), json!(10000));
    }

    #[test]
    fn test_replace_state() {
        let store = Store::new(counter_options(), StoreConfig::development()).unwrap();
        store.replace_state(json!({ "counter": 3 })).unwrap();
        assert_eq!(store.getter("square").unwrap(), json!(9));
        assert!(store.replace_state(json!(3)).is_err());
    }

    #[tokio::test]
    async fn test_dispatch() {
        let store = Store::new(counter_options(), StoreConfig::development()).unwrap();
        let result = store.dispatch("incrementTwice", Value::Null).await.unwrap();
        assert_eq!(result, json!(3));
        assert_eq!(
            store.dispatch("missing", Value::Null).await,
            Err(ModulaError::UnknownAction("missing".into()))
        );
    }

    #[tokio::test]
    async fn test_dispatch_collects_results_of_shared_type() {
        let options = ModuleOptions::new()
            .action("ping", |_, _| Box::pin(async { Ok(json!("root")) }))
            .module(
                "plain",
                ModuleOptions::new().action("ping", |_, _| Box::pin(async { Ok(json!("plain")) })),
            );
        let store = Store::new(options, StoreConfig::development()).unwrap();
        let result = store.dispatch("ping", Value::Null).await.unwrap();
        assert_eq!(result, json!(["root", "plain"]));
    }

    #[test]
    fn test_register_and_unregister_module() {
        let store = Store::new(ModuleOptions::new(), StoreConfig::development()).unwrap();
        let path = NamespacePath::from("math");
        store
            .register_module(path.clone(), counter_options().namespaced(true), RegisterOptions::default())
            .unwrap();

        assert!(store.has_module(&path));
        assert_eq!(store.namespace_of(&path), "math/");
        store.commit("math/increment", Value::Null).unwrap();
        assert_eq!(store.getter("math/square").unwrap(), json!(4));
        assert_eq!(store.snapshot(), json!({ "math": { "counter": 2 } }));

        store.unregister_module(&path).unwrap();
        assert!(!store.has_module(&path));
        assert!(store.state().get("math").is_none());
        assert!(!store.has_mutation("math/increment"));
    }

    #[test]
    fn test_register_collision_leaves_store_untouched() {
        let store = Store::new(
            ModuleOptions::new().state(json!({ "math": "taken" })),
            StoreConfig::development(),
        )
        .unwrap();
        let err = store
            .register_module("math", counter_options().namespaced(true), RegisterOptions::default())
            .unwrap_err();
        assert_eq!(err, ModulaError::NamespaceCollision(NamespacePath::from("math")));
        assert_eq!(store.snapshot(), json!({ "math": "taken" }));
        assert!(!store.has_mutation("math/increment"));
    }

    #[test]
    fn test_register_duplicate_getter_rejected() {
        let store = Store::new(
            ModuleOptions::new().getter("square", |_, _| json!(0)),
            StoreConfig::development(),
        )
        .unwrap();
        // not namespaced, so its getters land at the root
        let err = store
            .register_module("math", counter_options(), RegisterOptions::default())
            .unwrap_err();
        assert_eq!(err, ModulaError::DuplicateGetter("square".into()));
        assert!(store.state().get("math").is_none());
        assert!(!store.has_module(&NamespacePath::from("math")));
    }

    #[test]
    fn test_register_preserves_hydrated_state() {
        let store = Store::new(
            ModuleOptions::new().state(json!({ "math": { "counter": 7 } })),
            StoreConfig::development(),
        )
        .unwrap();
        store
            .register_module("math", counter_options().namespaced(true), RegisterOptions::preserve_state())
            .unwrap();
        assert_eq!(store.getter("math/square").unwrap(), json!(49));
        assert_eq!(store.snapshot(), json!({ "math": { "counter": 7 } }));
    }

    #[test]
    fn test_register_requires_parent() {
        let store = Store::new(ModuleOptions::new(), StoreConfig::development()).unwrap();
        let err = store
            .register_module("a/b", ModuleOptions::new(), RegisterOptions::default())
            .unwrap_err();
        assert_eq!(err, ModulaError::ParentNotFound(NamespacePath::from("a")));
        assert_eq!(
            store.register_module(NamespacePath::root(), ModuleOptions::new(), RegisterOptions::default()),
            Err(ModulaError::RootRegistration)
        );
    }
}
