//! Contexts handed to actions and getters

use std::sync::{Arc, Weak};

use modula_core::{ModulaError, ModulaResult, NamespacePath, Value};

use crate::store::StoreInner;
use crate::{BoxFuture, StateNode, Store};

/// Local view of the store for one module's actions.
///
/// Types passed to `commit`/`dispatch`/`getter` are local to the module's
/// namespace; the `*_root` variants address the store root.
#[derive(Clone)]
pub struct ActionContext {
    store: Store,
    path: NamespacePath,
    prefix: String,
    node: Arc<StateNode>,
}

impl ActionContext {
    pub(crate) fn new(store: Store, path: NamespacePath, prefix: String, node: Arc<StateNode>) -> Self {
        ActionContext {
            store,
            path,
            prefix,
            node,
        }
    }

    /// Module path the action was declared at
    pub fn path(&self) -> &NamespacePath {
        &self.path
    }

    pub fn commit(&self, mutation: &str, payload: Value) -> ModulaResult<()> {
        self.store.commit(&format!("{}{}", self.prefix, mutation), payload)
    }

    pub fn commit_root(&self, mutation: &str, payload: Value) -> ModulaResult<()> {
        self.store.commit(mutation, payload)
    }

    pub fn dispatch(&self, action: &str, payload: Value) -> BoxFuture<'static, ModulaResult<Value>> {
        self.store.dispatch(&format!("{}{}", self.prefix, action), payload)
    }

    pub fn dispatch_root(&self, action: &str, payload: Value) -> BoxFuture<'static, ModulaResult<Value>> {
        self.store.dispatch(action, payload)
    }

    /// Snapshot of the module's state
    pub fn state(&self) -> Value {
        self.node.snapshot()
    }

    pub fn field(&self, key: &str) -> Option<Value> {
        self.node.get(key)
    }

    pub fn getter(&self, name: &str) -> ModulaResult<Value> {
        self.store.getter(&format!("{}{}", self.prefix, name))
    }

    pub fn root_state(&self) -> Value {
        self.store.state().snapshot()
    }

    pub fn root_getter(&self, name: &str) -> ModulaResult<Value> {
        self.store.getter(name)
    }
}

/// Getters of one module's namespace, as seen from inside a getter
#[derive(Clone)]
pub struct Getters {
    owner: Weak<StoreInner>,
    prefix: String,
}

impl Getters {
    pub(crate) fn new(owner: Weak<StoreInner>, prefix: String) -> Self {
        Getters { owner, prefix }
    }

    /// Evaluate a getter of the same namespace
    pub fn get(&self, name: &str) -> ModulaResult<Value> {
        self.store()?.getter(&format!("{}{}", self.prefix, name))
    }

    /// Evaluate a getter by its full type
    pub fn root(&self, name: &str) -> ModulaResult<Value> {
        self.store()?.getter(name)
    }

    pub fn root_state(&self) -> ModulaResult<Value> {
        Ok(self.store()?.state().snapshot())
    }

    fn store(&self) -> ModulaResult<Store> {
        self.owner
            .upgrade()
            .map(Store::from_inner)
            .ok_or(ModulaError::StoreDropped)
    }
}
