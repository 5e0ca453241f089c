//! Module descriptors
//!
//! What a module author declares: route fields, component(s), nested
//! modules and an optional store module.

use std::collections::BTreeMap;

use modula_core::Value;
use modula_store::ModuleOptions;

use crate::ComponentSource;

/// Declarative description of one application module
#[derive(Clone, Debug, Default)]
pub struct ModuleDescriptor {
    /// Route name, and the store namespace when `store` is set
    pub name: Option<String>,
    pub path: Option<String>,
    pub component: Option<ComponentSource>,
    /// Named views
    pub components: Option<BTreeMap<String, ComponentSource>>,
    pub children: Option<Vec<ModuleDescriptor>>,
    /// Store module registered under `name` when the module is normalized
    pub store: Option<ModuleOptions>,
    pub redirect: Option<Value>,
    pub alias: Vec<String>,
    pub meta: Value,
}

impl ModuleDescriptor {
    pub fn new() -> Self {
        ModuleDescriptor::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn component(mut self, component: impl Into<ComponentSource>) -> Self {
        self.component = Some(component.into());
        self
    }

    /// Add a named view
    pub fn view(mut self, name: impl Into<String>, component: impl Into<ComponentSource>) -> Self {
        self.components
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), component.into());
        self
    }

    pub fn child(mut self, child: ModuleDescriptor) -> Self {
        self.children.get_or_insert_with(Vec::new).push(child);
        self
    }

    pub fn children(mut self, children: Vec<ModuleDescriptor>) -> Self {
        self.children = Some(children);
        self
    }

    pub fn store(mut self, options: ModuleOptions) -> Self {
        self.store = Some(options);
        self
    }

    pub fn redirect(mut self, redirect: Value) -> Self {
        self.redirect = Some(redirect);
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias.push(alias.into());
        self
    }

    pub fn meta(mut self, meta: Value) -> Self {
        self.meta = meta;
        self
    }

    /// Check if this is the default child of its parent: no path, an empty
    /// path or `/`
    pub fn is_default_child(&self) -> bool {
        matches!(self.path.as_deref(), None | Some("") | Some("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_child_paths() {
        assert!(ModuleDescriptor::new().is_default_child());
        assert!(ModuleDescriptor::new().path("").is_default_child());
        assert!(ModuleDescriptor::new().path("/").is_default_child());
        assert!(!ModuleDescriptor::new().path("signup").is_default_child());
        assert!(!ModuleDescriptor::new().path("/auth").is_default_child());
    }

    #[test]
    fn test_builders() {
        let descriptor = ModuleDescriptor::new()
            .name("auth")
            .path("/auth")
            .child(ModuleDescriptor::new().name("signin"))
            .alias("/login");
        assert_eq!(descriptor.name.as_deref(), Some("auth"));
        assert_eq!(descriptor.children.as_ref().map(Vec::len), Some(1));
        assert_eq!(descriptor.alias, vec!["/login".to_string()]);
        assert!(descriptor.store.is_none());
    }
}
