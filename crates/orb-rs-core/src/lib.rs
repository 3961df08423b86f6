//! # orb-rs-core
//!
//! Core types, settings, and error types for the orb-rs SQL generation layer.
//! This crate has zero framework dependencies and provides the foundation for all other crates.
//!
//! ## Modules
//!
//! - [`error`] - Error types and result aliases
//! - [`settings`] - Compiler settings (dialect, locales, recursion limit)
//! - [`settings_loader`] - Loading settings from TOML/JSON files and the environment
//! - [`logging`] - Tracing-based logging integration

pub mod error;
pub mod logging;
pub mod settings;
pub mod settings_loader;

// Re-export the most commonly used types at the crate root.
pub use error::{OrbError, OrbResult};
pub use settings::Settings;
