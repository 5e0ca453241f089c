//! Module collection - the tree of registered modules

use std::collections::BTreeMap;
use std::sync::Arc;

use modula_core::{into_state_map, ModulaError, ModulaResult, NamespacePath, StateMap, Value};

use crate::{ModuleOptions, StateNode};

/// A registered module
#[derive(Debug)]
pub struct ModuleRecord {
    pub(crate) raw: ModuleOptions,
    /// Namespacing used for key prefixes
    pub(crate) namespaced: bool,
    /// Namespacing the module declared in its options
    pub(crate) declared_namespaced: bool,
    /// Registered after store creation (and therefore removable)
    pub(crate) runtime: bool,
    pub(crate) state: Arc<StateNode>,
    pub(crate) children: BTreeMap<String, ModuleRecord>,
}

impl ModuleRecord {
    /// Build a record and fresh state nodes for a module and its nested
    /// modules. Nothing is attached to an existing tree yet.
    pub(crate) fn build(
        options: &ModuleOptions,
        path: &NamespacePath,
        namespaced: bool,
        runtime: bool,
    ) -> ModulaResult<ModuleRecord> {
        let fields = state_fields(&options.state, path)?;
        Self::build_with_fields(options, path, namespaced, runtime, fields)
    }

    pub(crate) fn build_with_fields(
        options: &ModuleOptions,
        path: &NamespacePath,
        namespaced: bool,
        runtime: bool,
        fields: StateMap,
    ) -> ModulaResult<ModuleRecord> {
        let state = StateNode::new(fields);
        let mut children = BTreeMap::new();
        for (name, nested) in &options.modules {
            let child_path = path.child(name.as_str());
            let child = ModuleRecord::build(nested, &child_path, nested.namespaced, runtime)?;
            state.attach(name, Arc::clone(&child.state)).map_err(|_| {
                ModulaError::NamespaceCollision(child_path.clone())
            })?;
            children.insert(name.clone(), child);
        }

        Ok(ModuleRecord {
            raw: options.clone(),
            namespaced,
            declared_namespaced: options.namespaced,
            runtime,
            state,
            children,
        })
    }

    /// Mirror an already-built module tree onto existing state nodes.
    /// Used by module stores so nested modules are not re-initialised.
    pub(crate) fn mirror(options: &ModuleOptions, state: Arc<StateNode>) -> ModuleRecord {
        let children = options
            .modules
            .iter()
            .filter_map(|(name, nested)| {
                let node = state.child(name)?;
                Some((name.clone(), ModuleRecord::mirror(nested, node)))
            })
            .collect();

        ModuleRecord {
            raw: options.clone(),
            namespaced: options.namespaced,
            declared_namespaced: options.namespaced,
            runtime: false,
            state,
            children,
        }
    }

    pub fn state(&self) -> &Arc<StateNode> {
        &self.state
    }

    pub fn is_namespaced(&self) -> bool {
        self.namespaced
    }

    pub fn declared_namespaced(&self) -> bool {
        self.declared_namespaced
    }

    pub fn is_runtime(&self) -> bool {
        self.runtime
    }

    pub fn options(&self) -> &ModuleOptions {
        &self.raw
    }
}

/// Convert declared state into local fields
fn state_fields(state: &Value, path: &NamespacePath) -> ModulaResult<StateMap> {
    into_state_map(state.clone()).ok_or_else(|| ModulaError::InvalidState(path.clone()))
}

/// Tree of module records rooted at the store's root module
#[derive(Debug)]
pub struct ModuleCollection {
    root: ModuleRecord,
}

impl ModuleCollection {
    pub(crate) fn new(root: ModuleRecord) -> Self {
        ModuleCollection { root }
    }

    pub fn root(&self) -> &ModuleRecord {
        &self.root
    }

    pub fn get(&self, path: &NamespacePath) -> Option<&ModuleRecord> {
        let mut record = &self.root;
        for segment in path.segments() {
            record = record.children.get(segment)?;
        }
        Some(record)
    }

    fn get_mut(&mut self, path: &NamespacePath) -> Option<&mut ModuleRecord> {
        let mut record = &mut self.root;
        for segment in path.segments() {
            record = record.children.get_mut(segment)?;
        }
        Some(record)
    }

    pub fn contains(&self, path: &NamespacePath) -> bool {
        self.get(path).is_some()
    }

    /// Key prefix for entries of the module at `path`: the keys of every
    /// namespaced module on the way down, each followed by `/`
    pub fn namespace(&self, path: &NamespacePath) -> String {
        let mut record = &self.root;
        let mut namespace = String::new();
        for segment in path.segments() {
            match record.children.get(segment) {
                Some(child) => {
                    if child.namespaced {
                        namespace.push_str(segment);
                        namespace.push('/');
                    }
                    record = child;
                }
                None => break,
            }
        }
        namespace
    }

    pub(crate) fn insert(&mut self, path: &NamespacePath, record: ModuleRecord) -> ModulaResult<()> {
        let (parent_path, key) = split_path(path)?;
        let parent = self
            .get_mut(&parent_path)
            .ok_or_else(|| ModulaError::ParentNotFound(parent_path.clone()))?;
        if parent.children.contains_key(key) {
            return Err(ModulaError::NamespaceCollision(path.clone()));
        }
        parent.children.insert(key.to_owned(), record);
        Ok(())
    }

    pub(crate) fn remove(&mut self, path: &NamespacePath) -> ModulaResult<ModuleRecord> {
        let (parent_path, key) = split_path(path)?;
        let parent = self
            .get_mut(&parent_path)
            .ok_or_else(|| ModulaError::ModuleNotFound(path.clone()))?;
        match parent.children.get(key) {
            None => return Err(ModulaError::ModuleNotFound(path.clone())),
            Some(record) if !record.runtime => {
                return Err(ModulaError::StaticModule(path.clone()))
            }
            Some(_) => {}
        }
        parent
            .children
            .remove(key)
            .ok_or_else(|| ModulaError::ModuleNotFound(path.clone()))
    }
}

/// Split a non-root path into parent path and key
pub(crate) fn split_path(path: &NamespacePath) -> ModulaResult<(NamespacePath, &str)> {
    match (path.parent(), path.last()) {
        (Some(parent), Some(key)) => Ok((parent, key)),
        _ => Err(ModulaError::RootRegistration),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modula_core::json;

    fn collection() -> ModuleCollection {
        let options = ModuleOptions::new()
            .state(json!({ "status": "loading" }))
            .module(
                "account",
                ModuleOptions::new()
                    .namespaced(true)
                    .module("settings", ModuleOptions::new().namespaced(true))
                    .module("plain", ModuleOptions::new()),
            );
        let root = ModuleRecord::build(&options, &NamespacePath::root(), false, false).unwrap();
        ModuleCollection::new(root)
    }

    #[test]
    fn test_namespace_skips_plain_modules() {
        let modules = collection();
        assert_eq!(modules.namespace(&NamespacePath::root()), "");
        assert_eq!(modules.namespace(&NamespacePath::from("account")), "account/");
        assert_eq!(
            modules.namespace(&NamespacePath::from("account/settings")),
            "account/settings/"
        );
        assert_eq!(modules.namespace(&NamespacePath::from("account/plain")), "account/");
    }

    #[test]
    fn test_build_attaches_nested_state() {
        let modules = collection();
        let root = modules.root().state();
        assert_eq!(
            root.snapshot(),
            json!({ "status": "loading", "account": { "settings": {}, "plain": {} } })
        );
    }

    #[test]
    fn test_invalid_state_rejected() {
        let options = ModuleOptions::new().state(json!(42));
        let err = ModuleRecord::build(&options, &NamespacePath::from("x"), true, true).unwrap_err();
        assert_eq!(err, ModulaError::InvalidState(NamespacePath::from("x")));
    }

    #[test]
    fn test_remove_static_module_rejected() {
        let mut modules = collection();
        let err = modules.remove(&NamespacePath::from("account")).unwrap_err();
        assert_eq!(err, ModulaError::StaticModule(NamespacePath::from("account")));
        assert!(modules.contains(&NamespacePath::from("account")));
    }
}
