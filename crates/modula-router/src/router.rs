//! Router seam
//!
//! Path matching and history live in the router implementation. Modula
//! only adds routes, inspects the navigation in flight and asks for a
//! transition.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use modula_core::ModulaResult;
use modula_store::BoxFuture;

use crate::RouteNode;

/// A navigation target
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
    pub path: String,
    pub name: Option<String>,
    pub query: BTreeMap<String, String>,
    pub hash: String,
}

impl Location {
    pub fn path(path: impl Into<String>) -> Self {
        Location {
            path: path.into(),
            ..Location::default()
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Location {
            name: Some(name.into()),
            ..Location::default()
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) if self.path.is_empty() => write!(f, "{{name: {}}}", name),
            _ => write!(f, "{}", self.path),
        }
    }
}

/// The navigation the router is currently resolving
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingNavigation {
    pub target: Location,
    /// Route records the target matched
    pub matched: usize,
}

impl PendingNavigation {
    pub fn is_unresolved(&self) -> bool {
        self.matched == 0
    }
}

/// Operations Modula needs from a router
pub trait Router: Send + Sync {
    /// Append routes to the routing table
    fn add_routes(&mut self, routes: Vec<RouteNode>) -> ModulaResult<()>;

    /// Navigation in flight, if any
    fn pending(&self) -> Option<PendingNavigation>;

    fn current_location(&self) -> Location;

    /// Resolve and perform a transition
    fn transition_to(&mut self, location: Location) -> BoxFuture<'_, ModulaResult<()>>;
}

/// Retry a pending navigation that matched nothing, against the router's
/// current location. Returns whether a transition was attempted.
pub async fn replay_unresolved<R: Router + ?Sized>(router: &mut R) -> ModulaResult<bool> {
    let Some(pending) = router.pending() else {
        return Ok(false);
    };
    if !pending.is_unresolved() {
        return Ok(false);
    }

    let location = router.current_location();
    debug!(navigation = %pending.target, location = %location, "replaying unresolved navigation");
    if let Err(err) = router.transition_to(location).await {
        warn!(navigation = %pending.target, error = %err, "navigation replay failed");
        return Err(err);
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use modula_core::ModulaError;

    #[derive(Default)]
    struct StubRouter {
        pending: Option<PendingNavigation>,
        current: Location,
        transitions: Vec<Location>,
        fail: bool,
    }

    impl Router for StubRouter {
        fn add_routes(&mut self, _routes: Vec<RouteNode>) -> ModulaResult<()> {
            Ok(())
        }

        fn pending(&self) -> Option<PendingNavigation> {
            self.pending.clone()
        }

        fn current_location(&self) -> Location {
            self.current.clone()
        }

        fn transition_to(&mut self, location: Location) -> BoxFuture<'_, ModulaResult<()>> {
            self.transitions.push(location);
            let result = if self.fail {
                Err(ModulaError::Navigation("guard rejected".into()))
            } else {
                Ok(())
            };
            Box::pin(std::future::ready(result))
        }
    }

    #[tokio::test]
    async fn test_no_pending_navigation() {
        let mut router = StubRouter::default();
        assert!(!replay_unresolved(&mut router).await.unwrap());
        assert!(router.transitions.is_empty());
    }

    #[tokio::test]
    async fn test_resolved_navigation_untouched() {
        let mut router = StubRouter {
            pending: Some(PendingNavigation {
                target: Location::path("/math"),
                matched: 1,
            }),
            ..StubRouter::default()
        };
        assert!(!replay_unresolved(&mut router).await.unwrap());
        assert!(router.transitions.is_empty());
    }

    #[tokio::test]
    async fn test_unresolved_navigation_replayed_at_current_location() {
        let mut router = StubRouter {
            pending: Some(PendingNavigation {
                target: Location::path("/math"),
                matched: 0,
            }),
            current: Location::path("/math"),
            ..StubRouter::default()
        };
        assert!(replay_unresolved(&mut router).await.unwrap());
        assert_eq!(router.transitions, vec![Location::path("/math")]);
    }

    #[tokio::test]
    async fn test_failed_replay_reported() {
        let mut router = StubRouter {
            pending: Some(PendingNavigation {
                target: Location::path("/math"),
                matched: 0,
            }),
            fail: true,
            ..StubRouter::default()
        };
        assert!(matches!(
            replay_unresolved(&mut router).await,
            Err(ModulaError::Navigation(_))
        ));
    }

    #[test]
    fn test_location_display() {
        assert_eq!(Location::path("/auth").to_string(), "/auth");
        assert_eq!(Location::named("auth").to_string(), "{name: auth}");
    }
}
