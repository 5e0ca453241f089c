//! Module options - the declarative shape of a store module

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use modula_core::{ModulaResult, StateMap, Value};

use crate::{ActionContext, Getters};

/// Owned, boxed future returned by actions and dispatches
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Mutation handler: receives the module's local fields and the payload
pub type MutationFn = Arc<dyn Fn(&mut StateMap, &Value) + Send + Sync>;

/// Getter: receives a snapshot of the module's state and its local getters
pub type GetterFn = Arc<dyn Fn(&Value, &Getters) -> Value + Send + Sync>;

/// Action handler: receives a context bound to the module's namespace
pub type ActionFn =
    Arc<dyn Fn(ActionContext, Value) -> BoxFuture<'static, ModulaResult<Value>> + Send + Sync>;

/// Options of one store module (and, for the root, of the whole store)
#[derive(Clone, Default)]
pub struct ModuleOptions {
    /// Address getters, mutations and actions with the `path/` prefix
    pub namespaced: bool,
    /// Initial local state, must be an object (or null)
    pub state: Value,
    pub getters: BTreeMap<String, GetterFn>,
    pub mutations: BTreeMap<String, MutationFn>,
    pub actions: BTreeMap<String, ActionFn>,
    /// Nested modules
    pub modules: BTreeMap<String, ModuleOptions>,
}

impl ModuleOptions {
    pub fn new() -> Self {
        ModuleOptions::default()
    }

    pub fn namespaced(mut self, namespaced: bool) -> Self {
        self.namespaced = namespaced;
        self
    }

    pub fn state(mut self, state: Value) -> Self {
        self.state = state;
        self
    }

    pub fn getter<F>(mut self, name: impl Into<String>, getter: F) -> Self
    where
        F: Fn(&Value, &Getters) -> Value + Send + Sync + 'static,
    {
        self.getters.insert(name.into(), Arc::new(getter));
        self
    }

    pub fn mutation<F>(mut self, name: impl Into<String>, mutation: F) -> Self
    where
        F: Fn(&mut StateMap, &Value) + Send + Sync + 'static,
    {
        self.mutations.insert(name.into(), Arc::new(mutation));
        self
    }

    /// Register an async action
    ///
    /// ```ignore
    /// ModuleOptions::new().action("load", |ctx, profile| {
    ///     Box::pin(async move {
    ///         ctx.commit("setNickname", profile["name"].clone())?;
    ///         Ok(Value::Null)
    ///     })
    /// })
    /// ```
    pub fn action<F>(mut self, name: impl Into<String>, action: F) -> Self
    where
        F: Fn(ActionContext, Value) -> BoxFuture<'static, ModulaResult<Value>>
            + Send
            + Sync
            + 'static,
    {
        self.actions.insert(name.into(), Arc::new(action));
        self
    }

    pub fn module(mut self, name: impl Into<String>, module: ModuleOptions) -> Self {
        self.modules.insert(name.into(), module);
        self
    }
}

impl fmt::Debug for ModuleOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleOptions")
            .field("namespaced", &self.namespaced)
            .field("state", &self.state)
            .field("getters", &self.getters.keys().collect::<Vec<_>>())
            .field("mutations", &self.mutations.keys().collect::<Vec<_>>())
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .field("modules", &self.modules)
            .finish()
    }
}

/// Options for registering a module at runtime
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RegisterOptions {
    /// Adopt an existing object field at the module's key as its state
    /// (e.g. hydrated state) instead of the declared initial state
    pub preserve_state: bool,
}

impl RegisterOptions {
    pub fn preserve_state() -> Self {
        RegisterOptions {
            preserve_state: true,
        }
    }
}
