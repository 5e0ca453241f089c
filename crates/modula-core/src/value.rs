//! State value model
//!
//! Module state is a tree of JSON values. Local fields of a module are a
//! [`StateMap`]; child modules hang off the same object under their own key
//! when a snapshot is taken.

pub use serde_json::{json, Map, Value};

/// Local fields of one module
pub type StateMap = Map<String, Value>;

/// Convert a JSON value into a state map.
///
/// Objects are taken as-is, `null` becomes an empty map and any other value
/// is rejected.
pub fn into_state_map(value: Value) -> Option<StateMap> {
    match value {
        Value::Object(map) => Some(map),
        Value::Null => Some(StateMap::new()),
        _ => None,
    }
}
