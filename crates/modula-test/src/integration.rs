//! End-to-end Integration Scenarios
//!
//! Scenarios that run the complete flow:
//! - Module descriptors through the app into the router
//! - Late registration replaying a navigation
//! - Components resolving with their module store
//! - Unregistration leaving detached handles behind

use modula_core::{json, ModulaError, ModulaResult, NamespacePath, Value};
use modula_router::{App, AppConfig, Component, ComponentSource, ModuleDescriptor};

use crate::fixtures::{counter_options, profile_options, RecordingRouter};

// ============================================================================
// DESCRIPTORS
// ============================================================================

/// Math module: a lazy page with a counter store
pub fn math_module() -> ModuleDescriptor {
    ModuleDescriptor::new()
        .name("math")
        .path("/math")
        .component(ComponentSource::lazy(|| {
            Box::pin(async { Ok(Component::new("Math").field("title", json!("Math page"))) })
        }))
        .store(counter_options(1))
}

/// Auth module: overview child plus a sign-up page, profile store
pub fn auth_module() -> ModuleDescriptor {
    ModuleDescriptor::new()
        .name("auth")
        .path("/auth")
        .store(profile_options())
        .children(vec![
            ModuleDescriptor::new()
                .name("signin")
                .component(Component::new("SignIn")),
            ModuleDescriptor::new()
                .name("signup")
                .path("signup")
                .component(Component::new("SignUp")),
        ])
}

/// Catch-all redirect
pub fn not_found_module() -> ModuleDescriptor {
    ModuleDescriptor::new()
        .path("*")
        .redirect(json!({ "name": "page404" }))
}

// ============================================================================
// SCENARIOS
// ============================================================================

/// Outcome of a scenario
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScenarioResult {
    pub name: &'static str,
    /// Failed checks, empty when the scenario passed
    pub failures: Vec<String>,
}

impl ScenarioResult {
    fn new(name: &'static str) -> Self {
        ScenarioResult {
            name,
            failures: Vec::new(),
        }
    }

    fn check(&mut self, ok: bool, what: impl Into<String>) {
        if !ok {
            self.failures.push(what.into());
        }
    }

    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Register modules, load a component and commit through both handles
pub async fn scenario_module_lifecycle() -> ModulaResult<ScenarioResult> {
    let mut result = ScenarioResult::new("module_lifecycle");
    let mut app = App::new(AppConfig::development(), RecordingRouter::default())?;
    let registration = app
        .register_modules(&[math_module(), auth_module(), not_found_module()])
        .await?;

    result.check(registration.routes == 3, "three routes added");
    result.check(
        app.router().route_names() == ["math", "auth", "signup"],
        "default child routes under the module name",
    );

    let route = &app.router().routes[0];
    let loader = route
        .component
        .as_ref()
        .ok_or_else(|| ModulaError::ComponentLoad("math".into()))?;
    let component = loader.load().await?;
    let store = component
        .store
        .ok_or_else(|| ModulaError::ComponentLoad("math store".into()))?;
    result.check(component.fields["title"] == json!("Math page"), "fields survive loading");

    app.store().commit("math/increment", Value::Null)?;
    result.check(store.getter("square")? == json!(4), "module sees global commit");
    store.commit("increment", Value::Null)?;
    result.check(
        app.store().getter("math/square")? == json!(9),
        "global sees module commit",
    );
    result.check(!app.store().is_committing(), "global flag restored");

    let auth = app
        .module_store("auth")
        .ok_or_else(|| ModulaError::ModuleNotFound(NamespacePath::from("auth")))?;
    auth.dispatch("load", json!({ "name": "odin" })).await?;
    result.check(
        app.store().getter("auth/name")? == json!("odin"),
        "module action visible globally",
    );

    result.check(app.unregister_module("math"), "math unregistered");
    store.commit("increment", Value::Null)?;
    result.check(app.store().state().get("math").is_none(), "math state removed");
    result.check(store.getter("square")? == json!(16), "detached handle keeps working");

    Ok(result)
}

/// A navigation that started before its module existed is replayed
pub async fn scenario_late_registration() -> ModulaResult<ScenarioResult> {
    let mut result = ScenarioResult::new("late_registration");
    let mut app = App::new(AppConfig::development(), RecordingRouter::resolving("/math"))?;

    let registration = app.register_modules(&[auth_module()]).await?;
    result.check(registration.replayed, "replayed while unresolved");
    result.check(app.router().pending.is_some(), "still unresolved without math");

    let registration = app.register_modules(&[math_module()]).await?;
    result.check(registration.replayed, "replayed after math arrived");
    result.check(app.router().pending.is_none(), "navigation resolved");
    result.check(
        app.store().snapshot()["route"]["path"] == json!("/math"),
        "route state follows the replayed navigation",
    );

    let registration = app.register_modules(&[not_found_module()]).await?;
    result.check(!registration.replayed, "nothing to replay");
    result.check(app.router().transitions.len() == 2, "two transitions");

    Ok(result)
}

/// A failing batch leaves no module store behind
pub async fn scenario_rollback() -> ModulaResult<ScenarioResult> {
    let mut result = ScenarioResult::new("rollback");
    let mut app = App::new(AppConfig::development(), RecordingRouter::default())?;

    let nameless = ModuleDescriptor::new().path("/nameless").store(counter_options(0));
    let err = app.register_modules(&[math_module(), nameless]).await;
    result.check(err == Err(ModulaError::MissingModuleName), "nameless store rejected");
    result.check(app.module_store("math").is_none(), "math rolled back");
    result.check(app.router().routes.is_empty(), "no routes added");

    app.register_modules(&[math_module()]).await?;
    let err = app.register_modules(&[math_module()]).await;
    result.check(
        err == Err(ModulaError::ModuleNameTaken("math".into())),
        "second math rejected",
    );
    result.check(app.module_store("math").is_some(), "first math intact");

    Ok(result)
}

/// Run every scenario
pub async fn run_all() -> ModulaResult<Vec<ScenarioResult>> {
    Ok(vec![
        scenario_module_lifecycle().await?,
        scenario_late_registration().await?,
        scenario_rollback().await?,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_module_lifecycle() {
        let result = scenario_module_lifecycle().await.unwrap();
        assert!(result.passed(), "{:?}", result.failures);
    }

    #[tokio::test]
    async fn test_late_registration() {
        let result = scenario_late_registration().await.unwrap();
        assert!(result.passed(), "{:?}", result.failures);
    }

    #[tokio::test]
    async fn test_rollback() {
        let result = scenario_rollback().await.unwrap();
        assert!(result.passed(), "{:?}", result.failures);
    }

    #[tokio::test]
    async fn test_run_all() {
        let results = run_all().await.unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(ScenarioResult::passed));
    }
}
