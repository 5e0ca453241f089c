//! Installed getter, mutation and action entries
//!
//! Entries are keyed by their prefixed type. An entry is a small handle: the
//! state node it is bound to plus the shared handler, so copying an entry
//! into another store's table shares the very same evaluator.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use modula_core::{ModulaError, ModulaResult, NamespacePath, Value};

use crate::store::StoreInner;
use crate::{
    ActionContext, ActionFn, BoxFuture, GetterFn, Getters, ModuleRecord, MutationFn, StateNode,
    Store,
};

/// Installed mutation bound to its module's state node
#[derive(Clone)]
pub struct MutationEntry {
    pub(crate) node: Arc<StateNode>,
    pub(crate) handler: MutationFn,
}

impl MutationEntry {
    /// Run the mutation against the bound state node
    pub fn apply(&self, payload: &Value) -> ModulaResult<()> {
        self.node.write(|fields| (self.handler)(fields, payload))
    }

    pub fn node(&self) -> &Arc<StateNode> {
        &self.node
    }

    /// Check if two entries share the same handler
    pub fn same_handler(&self, other: &MutationEntry) -> bool {
        Arc::ptr_eq(&self.handler, &other.handler)
    }
}

/// Installed action bound to the store and namespace it was declared in
#[derive(Clone)]
pub struct ActionEntry {
    pub(crate) owner: Weak<StoreInner>,
    pub(crate) path: NamespacePath,
    pub(crate) prefix: String,
    pub(crate) node: Arc<StateNode>,
    pub(crate) handler: ActionFn,
}

impl ActionEntry {
    pub fn call(&self, payload: Value) -> BoxFuture<'static, ModulaResult<Value>> {
        let Some(inner) = self.owner.upgrade() else {
            return Box::pin(std::future::ready(Err(ModulaError::StoreDropped)));
        };
        let context = ActionContext::new(
            Store::from_inner(inner),
            self.path.clone(),
            self.prefix.clone(),
            Arc::clone(&self.node),
        );
        (self.handler)(context, payload)
    }

    pub fn same_handler(&self, other: &ActionEntry) -> bool {
        Arc::ptr_eq(&self.handler, &other.handler)
    }
}

/// Installed getter, re-evaluated on every access
#[derive(Clone)]
pub struct GetterEntry {
    pub(crate) owner: Weak<StoreInner>,
    pub(crate) prefix: String,
    pub(crate) node: Arc<StateNode>,
    pub(crate) handler: GetterFn,
}

impl GetterEntry {
    pub fn evaluate(&self) -> Value {
        let getters = Getters::new(self.owner.clone(), self.prefix.clone());
        (self.handler)(&self.node.snapshot(), &getters)
    }

    pub fn same_handler(&self, other: &GetterEntry) -> bool {
        Arc::ptr_eq(&self.handler, &other.handler)
    }
}

/// Entry tables of one store
#[derive(Clone, Default)]
pub(crate) struct Handlers {
    pub(crate) mutations: HashMap<String, Vec<MutationEntry>>,
    pub(crate) actions: HashMap<String, Vec<ActionEntry>>,
    pub(crate) getters: HashMap<String, GetterEntry>,
}

impl Handlers {
    /// Install the entries of a module record and its nested modules
    pub(crate) fn install(
        &mut self,
        owner: &Weak<StoreInner>,
        record: &ModuleRecord,
        path: &NamespacePath,
        prefix: &str,
    ) {
        for (name, handler) in &record.raw.mutations {
            self.mutations
                .entry(format!("{prefix}{name}"))
                .or_default()
                .push(MutationEntry {
                    node: Arc::clone(&record.state),
                    handler: Arc::clone(handler),
                });
        }

        for (name, handler) in &record.raw.actions {
            self.actions
                .entry(format!("{prefix}{name}"))
                .or_default()
                .push(ActionEntry {
                    owner: owner.clone(),
                    path: path.clone(),
                    prefix: prefix.to_owned(),
                    node: Arc::clone(&record.state),
                    handler: Arc::clone(handler),
                });
        }

        for (name, handler) in &record.raw.getters {
            // duplicates are rejected before install, first one wins otherwise
            self.getters
                .entry(format!("{prefix}{name}"))
                .or_insert_with(|| GetterEntry {
                    owner: owner.clone(),
                    prefix: prefix.to_owned(),
                    node: Arc::clone(&record.state),
                    handler: Arc::clone(handler),
                });
        }

        for (name, child) in &record.children {
            let child_prefix = if child.namespaced {
                format!("{prefix}{name}/")
            } else {
                prefix.to_owned()
            };
            self.install(owner, child, &path.child(name.as_str()), &child_prefix);
        }
    }

    /// Reject a record whose getters would shadow installed ones (or each other)
    pub(crate) fn check_getters(&self, record: &ModuleRecord, prefix: &str) -> ModulaResult<()> {
        let mut keys = Vec::new();
        collect_getter_keys(record, prefix, &mut keys);
        for (i, key) in keys.iter().enumerate() {
            if self.getters.contains_key(key) || keys[..i].contains(key) {
                return Err(ModulaError::DuplicateGetter(key.clone()));
            }
        }
        Ok(())
    }
}

fn collect_getter_keys(record: &ModuleRecord, prefix: &str, keys: &mut Vec<String>) {
    keys.extend(record.raw.getters.keys().map(|name| format!("{prefix}{name}")));
    for (name, child) in &record.children {
        let child_prefix = if child.namespaced {
            format!("{prefix}{name}/")
        } else {
            prefix.to_owned()
        };
        collect_getter_keys(child, &child_prefix, keys);
    }
}
