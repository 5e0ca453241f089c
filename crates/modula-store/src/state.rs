//! State tree nodes
//!
//! Each module owns one [`StateNode`]: its local fields plus its child
//! module nodes. Nodes are shared through `Arc`, so a module store and the
//! global store can hold the very same node. A node keeps a weak link to its
//! parent; writes are checked against every strict watcher on the ancestor
//! chain, which is how a write anywhere below a watched node is caught.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use modula_core::{ModulaError, ModulaResult, NamespacePath, StateMap, Value};

use crate::CommitFlag;

/// Strict mode watcher attached to a node
#[derive(Debug)]
struct Watcher {
    label: String,
    flag: Weak<CommitFlag>,
}

/// One module's slice of the state tree
#[derive(Debug, Default)]
pub struct StateNode {
    /// Key of this node in its parent
    key: RwLock<String>,
    /// Local fields
    fields: RwLock<StateMap>,
    /// Child module nodes
    children: RwLock<BTreeMap<String, Arc<StateNode>>>,
    parent: RwLock<Weak<StateNode>>,
    watchers: Mutex<Vec<Watcher>>,
}

impl StateNode {
    pub fn new(fields: StateMap) -> Arc<Self> {
        Arc::new(StateNode {
            fields: RwLock::new(fields),
            ..StateNode::default()
        })
    }

    /// Read a key: a local field, or a snapshot of the child module with
    /// that name
    pub fn get(&self, key: &str) -> Option<Value> {
        if let Some(value) = self.fields.read().get(key) {
            return Some(value.clone());
        }
        self.children.read().get(key).map(|child| child.snapshot())
    }

    /// Check if a local field or child module uses this key
    pub fn contains(&self, key: &str) -> bool {
        self.fields.read().contains_key(key) || self.children.read().contains_key(key)
    }

    /// Copy of the local fields
    pub fn fields(&self) -> StateMap {
        self.fields.read().clone()
    }

    /// Read the local fields without copying them
    pub fn read<R>(&self, f: impl FnOnce(&StateMap) -> R) -> R {
        f(&self.fields.read())
    }

    /// Full value of this node: local fields plus one key per child module
    pub fn snapshot(&self) -> Value {
        let mut map = self.fields.read().clone();
        for (name, child) in self.children.read().iter() {
            map.insert(name.clone(), child.snapshot());
        }
        Value::Object(map)
    }

    pub fn child(&self, name: &str) -> Option<Arc<StateNode>> {
        self.children.read().get(name).cloned()
    }

    pub fn child_names(&self) -> Vec<String> {
        self.children.read().keys().cloned().collect()
    }

    /// Walk down to a descendant node
    pub fn descend(self: &Arc<Self>, path: &NamespacePath) -> Option<Arc<StateNode>> {
        let mut node = Arc::clone(self);
        for segment in path.segments() {
            node = node.child(segment)?;
        }
        Some(node)
    }

    /// Path from the topmost attached ancestor to this node
    pub fn path(&self) -> NamespacePath {
        let mut segments = Vec::new();
        let mut key = self.key.read().clone();
        let mut parent = self.parent.read().upgrade();
        while let Some(node) = parent {
            segments.push(key);
            key = node.key.read().clone();
            parent = node.parent.read().upgrade();
        }
        segments.reverse();
        NamespacePath::from(segments)
    }

    /// Check if this node hangs off a parent
    pub fn is_attached(&self) -> bool {
        self.parent.read().upgrade().is_some()
    }

    /// Write the local fields.
    ///
    /// Rejected with [`ModulaError::StrictModeViolation`] when a strict store
    /// watching this node or one of its ancestors is not committing.
    pub fn write<R>(&self, f: impl FnOnce(&mut StateMap) -> R) -> ModulaResult<R> {
        self.check_sanctioned()?;
        Ok(f(&mut self.fields.write()))
    }

    /// Replace all local fields
    pub fn replace(&self, fields: StateMap) -> ModulaResult<()> {
        self.write(|current| *current = fields)
    }

    fn check_sanctioned(&self) -> ModulaResult<()> {
        self.check_own_watchers()?;
        let mut parent = self.parent.read().upgrade();
        while let Some(node) = parent {
            node.check_own_watchers()?;
            parent = node.parent.read().upgrade();
        }
        Ok(())
    }

    fn check_own_watchers(&self) -> ModulaResult<()> {
        let mut watchers = self.watchers.lock();
        watchers.retain(|w| w.flag.strong_count() > 0);
        for watcher in watchers.iter() {
            let committing = watcher.flag.upgrade().map_or(true, |flag| flag.get());
            if !committing {
                return Err(ModulaError::StrictModeViolation {
                    store: watcher.label.clone(),
                    path: self.path().to_string(),
                });
            }
        }
        Ok(())
    }

    /// Attach a strict watcher for a store's flag
    pub(crate) fn watch(&self, label: impl Into<String>, flag: &Arc<CommitFlag>) {
        self.watchers.lock().push(Watcher {
            label: label.into(),
            flag: Arc::downgrade(flag),
        });
    }

    /// Remove the watcher bound to a flag
    pub(crate) fn unwatch(&self, flag: &Arc<CommitFlag>) {
        let target = Arc::downgrade(flag);
        self.watchers.lock().retain(|w| !w.flag.ptr_eq(&target));
    }

    pub fn watcher_count(&self) -> usize {
        self.watchers.lock().len()
    }

    /// Hang a child module node under `name`
    pub(crate) fn attach(self: &Arc<Self>, name: &str, child: Arc<StateNode>) -> ModulaResult<()> {
        if self.contains(name) {
            return Err(ModulaError::NamespaceCollision(self.path().child(name)));
        }
        *child.key.write() = name.to_owned();
        *child.parent.write() = Arc::downgrade(self);
        self.children.write().insert(name.to_owned(), child);
        Ok(())
    }

    /// Unhook a child module node. The detached node keeps its fields and
    /// children but no longer sees the watchers above it.
    pub(crate) fn detach(&self, name: &str) -> Option<Arc<StateNode>> {
        let child = self.children.write().remove(name)?;
        *child.parent.write() = Weak::new();
        Some(child)
    }

    /// Take a local field out of this node (used to adopt preserved state)
    pub(crate) fn take_field(&self, key: &str) -> Option<Value> {
        self.fields.write().remove(key)
    }
}
