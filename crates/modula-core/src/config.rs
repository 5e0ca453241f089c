//! Store configuration

use serde::{Deserialize, Serialize};

/// Label given to the root store when none is configured
pub const ROOT_LABEL: &str = "root";

/// Store configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Reject state writes that happen outside of a commit
    pub strict: bool,
    /// Name used in logs and strict mode errors
    pub label: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        // strict in debug builds, relaxed in release builds
        StoreConfig {
            strict: cfg!(debug_assertions),
            label: ROOT_LABEL.to_owned(),
        }
    }
}

impl StoreConfig {
    /// Development preset: strict mode on
    pub fn development() -> Self {
        StoreConfig {
            strict: true,
            ..StoreConfig::default()
        }
    }

    /// Production preset: strict mode off
    pub fn production() -> Self {
        StoreConfig {
            strict: false,
            ..StoreConfig::default()
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}
