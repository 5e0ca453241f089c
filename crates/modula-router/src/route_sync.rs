//! Route state module
//!
//! The router's current location is mirrored into a `route` module of the
//! global store, so getters and components read it like any other state.
//! The module only changes through its `ROUTE_CHANGED` mutation; each change
//! keeps the previous location under `from`.

use tracing::{debug, trace};

use modula_core::{json, ModulaResult, NamespacePath, Value};
use modula_store::{GlobalStateStore, ModuleOptions, RegisterOptions};

use crate::Location;

/// Name of the module holding the current route
pub const ROUTE_MODULE: &str = "route";

/// Mutation replacing the current route
pub const ROUTE_CHANGED: &str = "ROUTE_CHANGED";

/// State of the route module for `location`, without `from`
pub fn route_state(location: &Location) -> Value {
    json!({
        "name": location.name,
        "path": location.path,
        "query": location.query,
        "hash": location.hash,
        "fullPath": full_path(location),
    })
}

/// Path with query string and hash, `/search?q=rust#top`
pub fn full_path(location: &Location) -> String {
    let mut full = location.path.clone();
    if !location.query.is_empty() {
        let query: Vec<String> = location
            .query
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        full.push('?');
        full.push_str(&query.join("&"));
    }
    if !location.hash.is_empty() {
        if !location.hash.starts_with('#') {
            full.push('#');
        }
        full.push_str(&location.hash);
    }
    full
}

/// Options of the route module, starting at `location`
pub fn route_module_options(location: &Location) -> ModuleOptions {
    let mut state = route_state(location);
    state["from"] = Value::Null;

    ModuleOptions::new()
        .namespaced(true)
        .state(state)
        .mutation(ROUTE_CHANGED, |state, route| {
            let mut from = std::mem::take(state);
            from.remove("from");
            if let Some(to) = route.as_object() {
                state.extend(to.clone());
            }
            state.insert("from".into(), Value::Object(from));
        })
}

/// Mirror `location` into the route module, installing the module on first
/// use
pub fn sync_route(store: &GlobalStateStore, location: &Location) -> ModulaResult<()> {
    let path = NamespacePath::from(ROUTE_MODULE);
    if !store.has_module(&path) {
        store.register_module(path, route_module_options(location), RegisterOptions::default())?;
        debug!(location = %location, "route module installed");
        return Ok(());
    }

    store.commit(&format!("{}{}", path.prefix(), ROUTE_CHANGED), route_state(location))?;
    trace!(location = %location, "route synced");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use modula_core::StoreConfig;

    fn store() -> GlobalStateStore {
        GlobalStateStore::new(ModuleOptions::new(), StoreConfig::development()).unwrap()
    }

    #[test]
    fn test_full_path() {
        assert_eq!(full_path(&Location::path("/math")), "/math");

        let mut location = Location::path("/search");
        location.query.insert("q".into(), "rust".into());
        location.query.insert("page".into(), "2".into());
        location.hash = "top".into();
        assert_eq!(full_path(&location), "/search?page=2&q=rust#top");

        location.hash = "#top".into();
        assert_eq!(full_path(&location), "/search?page=2&q=rust#top");
    }

    #[test]
    fn test_first_sync_installs_module() {
        let store = store();
        sync_route(&store, &Location::path("/math")).unwrap();

        let route = &store.snapshot()[ROUTE_MODULE];
        assert_eq!(route["path"], json!("/math"));
        assert_eq!(route["fullPath"], json!("/math"));
        assert_eq!(route["from"], Value::Null);
    }

    #[test]
    fn test_sync_keeps_previous_location() {
        let store = store();
        sync_route(&store, &Location::path("/math")).unwrap();
        sync_route(&store, &Location::path("/auth")).unwrap();
        sync_route(&store, &Location::path("/auth/signup")).unwrap();

        let route = &store.snapshot()[ROUTE_MODULE];
        assert_eq!(route["path"], json!("/auth/signup"));
        assert_eq!(route["from"]["path"], json!("/auth"));
        // only one level of history is kept
        assert!(route["from"].get("from").is_none());
    }

    #[test]
    fn test_route_state_is_guarded() {
        let store = store();
        sync_route(&store, &Location::path("/math")).unwrap();

        let node = store.module_state(&NamespacePath::from(ROUTE_MODULE)).unwrap();
        let err = node
            .write(|fields| fields.insert("path".into(), json!("/elsewhere")))
            .unwrap_err();
        assert!(matches!(err, modula_core::ModulaError::StrictModeViolation { .. }));
        assert_eq!(store.snapshot()[ROUTE_MODULE]["path"], json!("/math"));
    }
}
