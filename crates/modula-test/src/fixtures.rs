//! Shared fixtures
//!
//! Store options used across the harness, and a router double that keeps
//! its routing table in memory and records transitions.

use modula_core::{json, ModulaError, ModulaResult, StoreConfig, Value};
use modula_router::{Location, PendingNavigation, RouteNode, Router};
use modula_store::{BoxFuture, GlobalStateStore, ModuleOptions};

/// Root options: a loading status with a getter, a setter and an action
pub fn root_options() -> ModuleOptions {
    ModuleOptions::new()
        .state(json!({ "status": "loading" }))
        .getter("isLoaded", |state, _| json!(state["status"] == "loaded"))
        .mutation("setStatus", |state, status| {
            state.insert("status".into(), status.clone());
        })
        .action("load", |ctx, status| {
            Box::pin(async move {
                let status = if status.is_null() { json!("loaded") } else { status };
                ctx.commit("setStatus", status)?;
                Ok(Value::Null)
            })
        })
}

/// Profile module options: a nickname with a getter, a setter and an action
pub fn profile_options() -> ModuleOptions {
    ModuleOptions::new()
        .state(json!({ "nickname": "somebody" }))
        .getter("name", |state, _| state["nickname"].clone())
        .mutation("setNickname", |state, nickname| {
            state.insert("nickname".into(), nickname.clone());
        })
        .action("load", |ctx, profile| {
            Box::pin(async move {
                ctx.commit("setNickname", profile["name"].clone())?;
                Ok(Value::Null)
            })
        })
}

/// Counter module options
pub fn counter_options(start: i64) -> ModuleOptions {
    ModuleOptions::new()
        .state(json!({ "counter": start }))
        .getter("square", |state, _| {
            let n = state["counter"].as_i64().unwrap_or(0);
            json!(n * n)
        })
        .mutation("increment", |state, _| {
            let n = state["counter"].as_i64().unwrap_or(0);
            state.insert("counter".into(), json!(n + 1));
        })
        .mutation("add", |state, delta| {
            let n = state["counter"].as_i64().unwrap_or(0);
            state.insert("counter".into(), json!(n + delta.as_i64().unwrap_or(0)));
        })
}

/// Strict global store over [`root_options`]
pub fn global_store() -> ModulaResult<GlobalStateStore> {
    GlobalStateStore::new(root_options(), StoreConfig::development())
}

/// In-memory router double
#[derive(Debug, Default)]
pub struct RecordingRouter {
    pub routes: Vec<RouteNode>,
    pub pending: Option<PendingNavigation>,
    pub current: Location,
    pub transitions: Vec<Location>,
    /// Reject every transition
    pub reject: bool,
}

impl RecordingRouter {
    /// Router that started resolving `path` before any route existed
    pub fn resolving(path: &str) -> Self {
        RecordingRouter {
            pending: Some(PendingNavigation {
                target: Location::path(path),
                matched: 0,
            }),
            current: Location::path(path),
            ..RecordingRouter::default()
        }
    }

    /// Names of every route, depth first
    pub fn route_names(&self) -> Vec<String> {
        fn collect(route: &RouteNode, names: &mut Vec<String>) {
            if let Some(name) = &route.name {
                names.push(name.clone());
            }
            for child in route.children.iter().flatten() {
                collect(child, names);
            }
        }
        let mut names = Vec::new();
        for route in &self.routes {
            collect(route, &mut names);
        }
        names
    }

    fn matches(&self, location: &Location) -> usize {
        self.routes
            .iter()
            .filter(|route| route.path == location.path)
            .count()
    }
}

impl Router for RecordingRouter {
    fn add_routes(&mut self, routes: Vec<RouteNode>) -> ModulaResult<()> {
        self.routes.extend(routes);
        Ok(())
    }

    fn pending(&self) -> Option<PendingNavigation> {
        self.pending.clone()
    }

    fn current_location(&self) -> Location {
        self.current.clone()
    }

    fn transition_to(&mut self, location: Location) -> BoxFuture<'_, ModulaResult<()>> {
        self.transitions.push(location.clone());
        let result = if self.reject {
            Err(ModulaError::Navigation(format!("transition to {location} rejected")))
        } else {
            let matched = self.matches(&location);
            self.pending = if matched == 0 {
                Some(PendingNavigation {
                    target: location.clone(),
                    matched,
                })
            } else {
                None
            };
            self.current = location;
            Ok(())
        };
        Box::pin(std::future::ready(result))
    }
}
