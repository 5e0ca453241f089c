//! Error types for Modula

use thiserror::Error;

use crate::NamespacePath;

/// Core Modula errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModulaError {
    // Namespace errors
    #[error("Cannot register a module store at the root namespace")]
    RootRegistration,

    #[error("Invalid module state at {0}: expected an object")]
    InvalidState(NamespacePath),

    // Registration errors
    #[error("Namespace collision: state already exists at {0}")]
    NamespaceCollision(NamespacePath),

    #[error("Parent module not registered: {0}")]
    ParentNotFound(NamespacePath),

    #[error("Module not registered: {0}")]
    ModuleNotFound(NamespacePath),

    #[error("Module was declared at store creation and cannot be unregistered: {0}")]
    StaticModule(NamespacePath),

    #[error("Duplicate getter: {0}")]
    DuplicateGetter(String),

    // Commit errors
    #[error("Unknown mutation type: {0}")]
    UnknownMutation(String),

    #[error("Unknown action type: {0}")]
    UnknownAction(String),

    #[error("Unknown getter: {0}")]
    UnknownGetter(String),

    #[error("Strict mode: store {store} observed a write to {path} outside of commit")]
    StrictModeViolation { store: String, path: String },

    #[error("Action failed: {0}")]
    ActionFailed(String),

    #[error("Store has been dropped")]
    StoreDropped,

    // Module and route errors
    #[error("Module should have a name if it uses a store")]
    MissingModuleName,

    #[error("Root store already has a module named {0}")]
    ModuleNameTaken(String),

    #[error("Component failed to load: {0}")]
    ComponentLoad(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),
}

/// Result type for Modula operations
pub type ModulaResult<T> = Result<T, ModulaError>;
