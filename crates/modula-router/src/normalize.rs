//! Module normalization
//!
//! Turns module descriptors into route nodes:
//! - Route names: a named parent with a default child hands its name to
//!   that child and becomes anonymous, so navigating by name renders the
//!   overview page
//! - Stores: a descriptor with a store registers a module store under its
//!   own name and injects it into its components
//! - Components: every component is wrapped in a loader

use std::collections::BTreeMap;

use parking_lot::Mutex;
use tracing::debug;

use modula_core::{ModulaError, ModulaResult, NamespacePath};
use modula_store::{GlobalStateStore, RegisterOptions};

use crate::{ComponentLoader, Extension, ModuleDescriptor, RouteNode};

/// Shared state of one normalization run
#[derive(Debug)]
pub struct NormalizeContext {
    store: GlobalStateStore,
    registered: Mutex<Vec<NamespacePath>>,
}

impl NormalizeContext {
    pub fn new(store: GlobalStateStore) -> Self {
        NormalizeContext {
            store,
            registered: Mutex::new(Vec::new()),
        }
    }

    pub fn store(&self) -> &GlobalStateStore {
        &self.store
    }

    /// Module stores registered so far, in registration order
    pub fn registered(&self) -> Vec<NamespacePath> {
        self.registered.lock().clone()
    }

    /// Unregister every module store this run registered, newest first
    pub fn rollback(&self) -> usize {
        let registered = std::mem::take(&mut *self.registered.lock());
        let count = registered.len();
        for path in registered.into_iter().rev() {
            self.store.unregister_module_store(path);
        }
        count
    }
}

/// Normalize one module descriptor
pub fn normalize(descriptor: &ModuleDescriptor, ctx: &NormalizeContext) -> ModulaResult<RouteNode> {
    normalize_named(descriptor, descriptor.name.clone(), ctx)
}

/// Normalize a list of top-level descriptors, stopping at the first error
pub fn normalize_all(
    descriptors: &[ModuleDescriptor],
    ctx: &NormalizeContext,
) -> ModulaResult<Vec<RouteNode>> {
    descriptors
        .iter()
        .map(|descriptor| normalize(descriptor, ctx))
        .collect()
}

/// `route_name` is the name the route ends up with before default-child
/// resolution of its own children; it differs from the declared name for a
/// default child.
fn normalize_named(
    descriptor: &ModuleDescriptor,
    route_name: Option<String>,
    ctx: &NormalizeContext,
) -> ModulaResult<RouteNode> {
    let extension = inject_store(descriptor, ctx)?;

    let (name, children) = match &descriptor.children {
        Some(children) => {
            let overview = children.iter().position(ModuleDescriptor::is_default_child);
            let nodes = children
                .iter()
                .enumerate()
                .map(|(index, child)| {
                    let child_name = if overview == Some(index) {
                        route_name.clone()
                    } else {
                        child.name.clone()
                    };
                    normalize_named(child, child_name, ctx)
                })
                .collect::<ModulaResult<Vec<_>>>()?;
            let name = match overview {
                Some(_) => None,
                None => route_name,
            };
            (name, Some(nodes))
        }
        None => (route_name, None),
    };

    let component = descriptor
        .component
        .as_ref()
        .map(|source| ComponentLoader::new(source.clone(), extension.clone()));
    let components = descriptor.components.as_ref().map(|views| {
        views
            .iter()
            .map(|(view, source)| {
                (view.clone(), ComponentLoader::new(source.clone(), extension.clone()))
            })
            .collect::<BTreeMap<_, _>>()
    });

    Ok(RouteNode {
        name,
        path: descriptor.path.clone().unwrap_or_default(),
        component,
        components,
        children,
        redirect: descriptor.redirect.clone(),
        alias: descriptor.alias.clone(),
        meta: descriptor.meta.clone(),
    })
}

fn inject_store(descriptor: &ModuleDescriptor, ctx: &NormalizeContext) -> ModulaResult<Extension> {
    let Some(options) = &descriptor.store else {
        return Ok(Extension::default());
    };
    let name = descriptor
        .name
        .as_deref()
        .ok_or(ModulaError::MissingModuleName)?;
    if ctx.store.state().contains(name) {
        return Err(ModulaError::ModuleNameTaken(name.to_owned()));
    }

    let store = ctx
        .store
        .register_module_store(name, options.clone(), RegisterOptions::default())?;
    ctx.registered.lock().push(store.path().clone());
    debug!(module = name, "module store injected");

    Ok(Extension { store: Some(store) })
}
