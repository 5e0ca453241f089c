//! Application assembly
//!
//! [`App`] wires a global store and a router together. Modules can be
//! registered at any time; routes of late modules are added to the router
//! and a navigation that matched nothing so far is replayed. The current
//! location is mirrored into the `route` module of the global store.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use modula_core::{ModulaResult, NamespacePath, StoreConfig};
use modula_store::{GlobalStateStore, ModuleOptions, ModuleStateStore};

use crate::{
    normalize_all, replay_unresolved, sync_route, LogFormat, ModuleDescriptor, NormalizeContext,
    Router,
};

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub store: StoreConfig,
    /// Base path the router is mounted at
    pub base: String,
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            store: StoreConfig::default(),
            base: "/".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl AppConfig {
    /// Strict store, human-readable logs
    pub fn development() -> Self {
        AppConfig {
            store: StoreConfig::development(),
            ..AppConfig::default()
        }
    }

    /// Relaxed store, JSON logs
    pub fn production() -> Self {
        AppConfig {
            store: StoreConfig::production(),
            log_format: LogFormat::Json,
            ..AppConfig::default()
        }
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }
}

/// Outcome of one `register_modules` call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registration {
    /// Top-level routes added
    pub routes: usize,
    /// Module stores registered, in order
    pub stores: Vec<NamespacePath>,
    /// Whether a pending navigation was replayed
    pub replayed: bool,
}

/// A global store and a router
pub struct App<R: Router> {
    config: AppConfig,
    store: GlobalStateStore,
    router: R,
}

impl<R: Router> App<R> {
    /// Create an app with an empty global store
    pub fn new(config: AppConfig, router: R) -> ModulaResult<Self> {
        let store = GlobalStateStore::new(ModuleOptions::new(), config.store.clone())?;
        App::with_store(config, store, router)
    }

    /// Create an app around an existing global store. The route module is
    /// installed at the router's current location.
    pub fn with_store(config: AppConfig, store: GlobalStateStore, router: R) -> ModulaResult<Self> {
        sync_route(&store, &router.current_location())?;
        info!(base = %config.base, strict = store.is_strict(), "app assembled");
        Ok(App {
            config,
            store,
            router,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &GlobalStateStore {
        &self.store
    }

    pub fn router(&self) -> &R {
        &self.router
    }

    pub fn router_mut(&mut self) -> &mut R {
        &mut self.router
    }

    /// Normalize `descriptors`, add their routes and replay a pending
    /// navigation that matched nothing.
    ///
    /// When normalization or adding routes fails, the module stores this
    /// call registered are unregistered before the error is returned. A
    /// failed replay is logged; the modules stay registered.
    pub async fn register_modules(&mut self, descriptors: &[ModuleDescriptor]) -> ModulaResult<Registration> {
        let ctx = NormalizeContext::new(self.store.clone());
        let routes = match normalize_all(descriptors, &ctx) {
            Ok(routes) => routes,
            Err(err) => {
                let removed = ctx.rollback();
                warn!(error = %err, removed, "module normalization failed");
                return Err(err);
            }
        };

        let count = routes.len();
        if let Err(err) = self.router.add_routes(routes) {
            let removed = ctx.rollback();
            warn!(error = %err, removed, "router rejected routes");
            return Err(err);
        }
        debug!(routes = count, "routes added");

        let replayed = replay_unresolved(&mut self.router).await.unwrap_or(false);
        if let Err(err) = self.sync_route() {
            warn!(error = %err, "route state not synced");
        }
        Ok(Registration {
            routes: count,
            stores: ctx.registered(),
            replayed,
        })
    }

    /// Mirror the router's current location into the route module
    pub fn sync_route(&self) -> ModulaResult<()> {
        sync_route(&self.store, &self.router.current_location())
    }

    /// Module store registered for module `name`
    pub fn module_store(&self, name: &str) -> Option<ModuleStateStore> {
        self.store.module_store(&NamespacePath::from(name))
    }

    /// Remove the store of module `name`. Its routes stay with the router.
    pub fn unregister_module(&self, name: &str) -> bool {
        self.store.unregister_module_store(name)
    }
}

impl<R: Router + std::fmt::Debug> std::fmt::Debug for App<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("config", &self.config)
            .field("store", &self.store)
            .field("router", &self.router)
            .finish()
    }
}
