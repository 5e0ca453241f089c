//! Modula Router - Modules to routes
//!
//! This crate turns application modules into router configuration:
//! - Module descriptors and normalized route nodes
//! - Component loaders with store injection
//! - The normalizer (default-child naming, store registration)
//! - The router seam and navigation replay for late modules
//! - The route state module mirroring the current location
//! - The application assembler and tracing setup

pub mod app;
pub mod component;
pub mod descriptor;
pub mod normalize;
pub mod route;
pub mod router;
pub mod route_sync;
pub mod telemetry;

pub use app::*;
pub use component::*;
pub use descriptor::*;
pub use normalize::*;
pub use route::*;
pub use router::*;
pub use route_sync::*;
pub use telemetry::*;
