//! Components and component loaders
//!
//! A route renders a [`Component`]. Descriptors give components either
//! directly or as a producer of a future; the normalizer wraps both in a
//! [`ComponentLoader`] that merges the module's [`Extension`] into the
//! component once it is available.

use std::fmt;
use std::sync::Arc;

use modula_core::{ModulaResult, StateMap};
use modula_store::{BoxFuture, ModuleStateStore};

/// Producer of a lazily loaded component
pub type ComponentFactory = Arc<dyn Fn() -> BoxFuture<'static, ModulaResult<Component>> + Send + Sync>;

/// A renderable unit, opaque apart from its name and the store injected
/// into it
#[derive(Clone, Default)]
pub struct Component {
    pub name: String,
    /// Arbitrary component options, carried through loading untouched
    pub fields: StateMap,
    /// Module store injected by the normalizer
    pub store: Option<ModuleStateStore>,
}

impl Component {
    pub fn new(name: impl Into<String>) -> Self {
        Component {
            name: name.into(),
            ..Component::default()
        }
    }

    pub fn field(mut self, key: impl Into<String>, value: modula_core::Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("store", &self.store.as_ref().map(|s| s.path().key()))
            .finish()
    }
}

/// Properties merged into every component a module resolves to
#[derive(Clone, Debug, Default)]
pub struct Extension {
    pub store: Option<ModuleStateStore>,
}

impl Extension {
    pub fn is_empty(&self) -> bool {
        self.store.is_none()
    }

    /// Merge into `component`; set properties overwrite the component's own
    pub fn apply(&self, mut component: Component) -> Component {
        if let Some(store) = &self.store {
            component.store = Some(store.clone());
        }
        component
    }
}

/// A component as declared by a module descriptor
#[derive(Clone)]
pub enum ComponentSource {
    Static(Component),
    Lazy(ComponentFactory),
}

impl ComponentSource {
    pub fn lazy<F>(factory: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, ModulaResult<Component>> + Send + Sync + 'static,
    {
        ComponentSource::Lazy(Arc::new(factory))
    }
}

impl From<Component> for ComponentSource {
    fn from(component: Component) -> Self {
        ComponentSource::Static(component)
    }
}

impl fmt::Debug for ComponentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentSource::Static(component) => f.debug_tuple("Static").field(component).finish(),
            ComponentSource::Lazy(_) => f.write_str("Lazy(..)"),
        }
    }
}

/// Loads a component and merges an extension into it
#[derive(Clone, Debug)]
pub struct ComponentLoader {
    source: ComponentSource,
    extension: Extension,
}

impl ComponentLoader {
    pub fn new(source: ComponentSource, extension: Extension) -> Self {
        ComponentLoader { source, extension }
    }

    pub fn is_lazy(&self) -> bool {
        matches!(self.source, ComponentSource::Lazy(_))
    }

    pub fn extension(&self) -> &Extension {
        &self.extension
    }

    /// Resolve the component. A lazy producer is invoked on first poll,
    /// not when this is called.
    pub fn load(&self) -> BoxFuture<'static, ModulaResult<Component>> {
        let extension = self.extension.clone();
        match &self.source {
            ComponentSource::Static(component) => {
                Box::pin(std::future::ready(Ok(extension.apply(component.clone()))))
            }
            ComponentSource::Lazy(factory) => {
                let factory = Arc::clone(factory);
                Box::pin(async move {
                    let component = factory().await?;
                    Ok(extension.apply(component))
                })
            }
        }
    }

    /// Resolve a static component without awaiting
    pub fn load_now(&self) -> Option<Component> {
        match &self.source {
            ComponentSource::Static(component) => Some(self.extension.apply(component.clone())),
            ComponentSource::Lazy(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use modula_core::{json, ModulaError, StoreConfig};
    use modula_store::{GlobalStateStore, ModuleOptions, RegisterOptions};

    fn counting_source(calls: Arc<AtomicUsize>) -> ComponentSource {
        ComponentSource::lazy(move || {
            calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok(Component::new("Lazy").field("title", json!("lazy page"))) })
        })
    }

    #[test]
    fn test_static_loads_now() {
        let loader = ComponentLoader::new(Component::new("Home").into(), Extension::default());
        assert!(!loader.is_lazy());
        let component = loader.load_now().unwrap();
        assert_eq!(component.name, "Home");
        assert!(component.store.is_none());
    }

    #[tokio::test]
    async fn test_lazy_produced_on_await() {
        let calls = Arc::new(AtomicUsize::new(0));
        let loader = ComponentLoader::new(counting_source(Arc::clone(&calls)), Extension::default());
        assert!(loader.is_lazy());
        assert!(loader.load_now().is_none());

        let pending = loader.load();
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let component = pending.await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(component.fields["title"], json!("lazy page"));
    }

    #[tokio::test]
    async fn test_extension_merged_after_load() {
        let global = GlobalStateStore::new(ModuleOptions::new(), StoreConfig::development()).unwrap();
        let store = global
            .register_module_store(
                "math",
                ModuleOptions::new().state(json!({ "counter": 1 })),
                RegisterOptions::default(),
            )
            .unwrap();
        let extension = Extension {
            store: Some(store.clone()),
        };

        let calls = Arc::new(AtomicUsize::new(0));
        let loader = ComponentLoader::new(counting_source(calls), extension);
        let component = loader.load().await.unwrap();

        assert_eq!(component.name, "Lazy");
        assert_eq!(component.fields["title"], json!("lazy page"));
        let injected = component.store.unwrap();
        assert!(injected.ptr_eq(&store));
    }

    #[tokio::test]
    async fn test_lazy_failure_propagates() {
        let source = ComponentSource::lazy(|| {
            Box::pin(async { Err(ModulaError::ComponentLoad("chunk missing".into())) })
        });
        let loader = ComponentLoader::new(source, Extension::default());
        assert_eq!(
            loader.load().await.unwrap_err(),
            ModulaError::ComponentLoad("chunk missing".into())
        );
    }
}
