//! Route nodes
//!
//! The router-facing projection of a module descriptor. Serializing a route
//! node yields its routing shape (name, path, children, pass-through
//! fields); loaders are represented only by the view names they serve.

use std::collections::BTreeMap;

use serde::{Serialize, Serializer};

use modula_core::Value;

use crate::ComponentLoader;

/// Normalized route configuration
#[derive(Clone, Debug, Default, Serialize)]
pub struct RouteNode {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "loader_marker")]
    pub component: Option<ComponentLoader>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "view_names")]
    pub components: Option<BTreeMap<String, ComponentLoader>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<RouteNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alias: Vec<String>,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub meta: Value,
}

impl RouteNode {
    /// Routing shape as JSON
    pub fn shape(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Find a route by name, depth first
    pub fn find(&self, name: &str) -> Option<&RouteNode> {
        if self.name.as_deref() == Some(name) {
            return Some(self);
        }
        self.children
            .iter()
            .flatten()
            .find_map(|child| child.find(name))
    }

    /// Every loader of this route (not of its children)
    pub fn loaders(&self) -> Vec<&ComponentLoader> {
        self.component
            .iter()
            .chain(self.components.iter().flat_map(|views| views.values()))
            .collect()
    }
}

fn loader_marker<S: Serializer>(loader: &Option<ComponentLoader>, s: S) -> Result<S::Ok, S::Error> {
    match loader {
        Some(loader) if loader.is_lazy() => s.serialize_str("lazy"),
        Some(_) => s.serialize_str("static"),
        None => s.serialize_none(),
    }
}

fn view_names<S: Serializer>(
    views: &Option<BTreeMap<String, ComponentLoader>>,
    s: S,
) -> Result<S::Ok, S::Error> {
    let names: Vec<&String> = views.iter().flat_map(|views| views.keys()).collect();
    names.serialize(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Component, Extension};
    use modula_core::json;

    #[test]
    fn test_shape_skips_empty_fields() {
        let route = RouteNode {
            name: Some("auth".into()),
            path: "/auth".into(),
            ..RouteNode::default()
        };
        assert_eq!(route.shape(), json!({ "name": "auth", "path": "/auth" }));
    }

    #[test]
    fn test_shape_marks_loaders() {
        let loader = ComponentLoader::new(Component::new("Home").into(), Extension::default());
        let mut views = BTreeMap::new();
        views.insert("aside".to_string(), loader.clone());
        let route = RouteNode {
            path: "/".into(),
            component: Some(loader),
            components: Some(views),
            ..RouteNode::default()
        };
        assert_eq!(
            route.shape(),
            json!({ "path": "/", "component": "static", "components": ["aside"] })
        );
        assert_eq!(route.loaders().len(), 2);
    }

    #[test]
    fn test_find_by_name() {
        let route = RouteNode {
            path: "/auth".into(),
            children: Some(vec![
                RouteNode {
                    name: Some("auth".into()),
                    path: "".into(),
                    ..RouteNode::default()
                },
                RouteNode {
                    name: Some("signup".into()),
                    path: "signup".into(),
                    ..RouteNode::default()
                },
            ]),
            ..RouteNode::default()
        };
        assert_eq!(route.find("signup").map(|r| r.path.as_str()), Some("signup"));
        assert_eq!(route.find("auth").map(|r| r.path.as_str()), Some(""));
        assert!(route.find("missing").is_none());
    }
}
