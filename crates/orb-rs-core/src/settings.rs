//! Settings for orb-rs.
//!
//! This module provides the [`Settings`] struct, which holds the knobs that
//! shape statement compilation: the SQL dialect, the locale selection used
//! for translatable columns, and the recursion limit applied to sub-selects
//! and expansions.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The locale value that selects every translation at once.
pub const ALL_LOCALES: &str = "all";

/// The complete set of settings.
///
/// # Examples
///
/// ```
/// use orb_rs_core::settings::Settings;
///
/// let settings = Settings::default();
/// assert_eq!(settings.dialect, "postgresql");
/// assert_eq!(settings.default_locale, "en_US");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    // ── Core ─────────────────────────────────────────────────────────

    /// Whether debug mode is enabled (pretty logs instead of JSON).
    pub debug: bool,

    // ── Database ─────────────────────────────────────────────────────

    /// The SQL dialect name ("postgresql" or "mysql").
    pub dialect: String,
    /// The namespace (database schema) applied to schemas without one.
    pub namespace: Option<String>,

    // ── Internationalization ─────────────────────────────────────────

    /// The locale translations fall back to.
    pub default_locale: String,
    /// The locale selected for translatable columns, or `"all"`.
    pub locale: String,

    // ── Compilation ──────────────────────────────────────────────────

    /// Maximum nesting of sub-selects, compounds, and expansions.
    pub max_compile_depth: usize,

    // ── Logging ──────────────────────────────────────────────────────

    /// The log level (e.g. "info", "debug", "warn").
    pub log_level: String,

    // ── Escape hatch ─────────────────────────────────────────────────

    /// Custom settings that don't fit into the above categories.
    pub extra: HashMap<String, serde_json::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: true,
            dialect: "postgresql".to_string(),
            namespace: None,
            default_locale: "en_US".to_string(),
            locale: "en_US".to_string(),
            max_compile_depth: 32,
            log_level: "info".to_string(),
            extra: HashMap::new(),
        }
    }
}

impl Settings {
    /// Returns `true` when every locale is selected.
    pub fn all_locales(&self) -> bool {
        self.locale.eq_ignore_ascii_case(ALL_LOCALES)
    }
}
