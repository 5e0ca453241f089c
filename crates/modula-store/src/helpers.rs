//! Mapping helpers
//!
//! A component reads and writes through a [`StoreScope`]: its own module
//! store when it has one, the root store otherwise. Every helper takes
//! [`MapOptions`]; with `root` set the lookup goes to the root store even
//! when a module store is present.

use std::collections::BTreeMap;

use modula_core::{ModulaError, ModulaResult, NamespacePath, Value};

use crate::{BoxFuture, ModuleStateStore, Store};

/// Options of the mapping helpers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MapOptions {
    /// Resolve against the root store
    pub root: bool,
}

impl MapOptions {
    pub fn root() -> Self {
        MapOptions { root: true }
    }
}

/// Stores visible from one component
#[derive(Clone, Debug)]
pub struct StoreScope {
    local: Option<Store>,
    root: Store,
}

impl StoreScope {
    /// Scope of a component without a module store
    pub fn new(root: Store) -> Self {
        StoreScope { local: None, root }
    }

    /// Scope of a component owning `module`
    pub fn with_module(root: Store, module: &ModuleStateStore) -> Self {
        StoreScope {
            local: Some(module.store().clone()),
            root,
        }
    }

    pub fn has_local(&self) -> bool {
        self.local.is_some()
    }

    /// Store the helpers resolve against
    pub fn target(&self, options: MapOptions) -> &Store {
        match &self.local {
            Some(local) if !options.root => local,
            _ => &self.root,
        }
    }

    /// Read state fields, optionally below a module namespace
    pub fn map_state(
        &self,
        namespace: Option<&str>,
        keys: &[&str],
        options: MapOptions,
    ) -> ModulaResult<BTreeMap<String, Value>> {
        let store = self.target(options);
        let node = match namespace {
            Some(ns) => {
                let path = NamespacePath::parse(ns);
                store
                    .state()
                    .descend(&path)
                    .ok_or(ModulaError::ModuleNotFound(path))?
            }
            None => store.state(),
        };
        Ok(keys
            .iter()
            .map(|key| (key.to_string(), node.get(key).unwrap_or(Value::Null)))
            .collect())
    }

    /// Evaluate getters, optionally below a module namespace
    pub fn map_getters(
        &self,
        namespace: Option<&str>,
        names: &[&str],
        options: MapOptions,
    ) -> ModulaResult<BTreeMap<String, Value>> {
        let store = self.target(options);
        names
            .iter()
            .map(|name| {
                let value = store.getter(&qualify(namespace, name))?;
                Ok((name.to_string(), value))
            })
            .collect()
    }

    pub fn commit(
        &self,
        namespace: Option<&str>,
        mutation: &str,
        payload: Value,
        options: MapOptions,
    ) -> ModulaResult<()> {
        self.target(options)
            .commit(&qualify(namespace, mutation), payload)
    }

    pub fn dispatch(
        &self,
        namespace: Option<&str>,
        action: &str,
        payload: Value,
        options: MapOptions,
    ) -> BoxFuture<'static, ModulaResult<Value>> {
        self.target(options)
            .dispatch(&qualify(namespace, action), payload)
    }
}

fn qualify(namespace: Option<&str>, name: &str) -> String {
    match namespace.map(NamespacePath::parse) {
        Some(path) if !path.is_root() => format!("{}{}", path.prefix(), name),
        _ => name.to_owned(),
    }
}
