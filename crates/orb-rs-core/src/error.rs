//! Core error types for orb-rs.
//!
//! This module provides the error enum [`OrbError`] that covers schema
//! resolution failures, unsatisfiable filters, dialect lookup failures,
//! recursion limits, and configuration errors raised while compiling
//! statements.

use thiserror::Error;

/// The primary error type for orb-rs.
///
/// All compilation errors are raised synchronously and are deterministic:
/// compiling the same schema and query tree again reproduces the same error.
/// [`OrbError::EmptyQuery`] is the only variant that callers are expected to
/// recover from locally (see [`OrbError::is_empty_query`]).
#[derive(Error, Debug)]
pub enum OrbError {
    // ── Schema resolution ────────────────────────────────────────────

    /// A column, traversal hop, or expansion name does not exist on a schema.
    #[error("Column '{column}' not found on schema '{schema}'")]
    ColumnNotFound {
        /// The schema that was searched.
        schema: String,
        /// The requested column name.
        column: String,
    },

    /// A schema name could not be resolved in the registry.
    #[error("Table not found: {0}")]
    TableNotFound(String),

    // ── Query compilation ────────────────────────────────────────────

    /// A predicate can never match (e.g. membership in an empty set).
    #[error("Query can never match any records")]
    EmptyQuery,

    /// An operator, function, or math operation has no dialect mapping.
    #[error("Invalid operator: {0}")]
    InvalidOperator(String),

    /// The predicate tree is structurally invalid.
    #[error("Invalid query: {0}")]
    QueryInvalid(String),

    /// Recursive compilation exceeded the configured depth.
    #[error("Expansion too deep: depth {depth} exceeds limit {limit}")]
    ExpansionTooDeep {
        /// The depth that was reached.
        depth: usize,
        /// The configured limit.
        limit: usize,
    },

    // ── Mutations / DDL ──────────────────────────────────────────────

    /// A column type has no dialect mapping.
    #[error("Unsupported column type: {0}")]
    UnsupportedType(String),

    /// A record is missing a value for a column being written.
    #[error("No value for column '{column}' on schema '{schema}'")]
    ValueNotFound {
        /// The schema being written.
        schema: String,
        /// The missing column.
        column: String,
    },

    /// The schema cannot be written to.
    #[error("Schema is read-only: {0}")]
    ReadOnly(String),

    // ── Configuration ────────────────────────────────────────────────

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    // ── Serialization ────────────────────────────────────────────────

    /// An error occurred during serialization or deserialization.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // ── IO ───────────────────────────────────────────────────────────

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl OrbError {
    /// Creates a [`OrbError::ColumnNotFound`] error.
    pub fn column_not_found(schema: impl Into<String>, column: impl Into<String>) -> Self {
        Self::ColumnNotFound {
            schema: schema.into(),
            column: column.into(),
        }
    }

    /// Returns `true` for the unsatisfiable-filter case, which statement
    /// compilers turn into "no statement" instead of surfacing.
    pub const fn is_empty_query(&self) -> bool {
        matches!(self, Self::EmptyQuery)
    }

    /// Returns `true` if the error reflects a programming or configuration
    /// mistake rather than a lookup against user-supplied names.
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidOperator(_)
                | Self::UnsupportedType(_)
                | Self::ConfigurationError(_)
                | Self::ExpansionTooDeep { .. }
        )
    }
}

/// A convenience type alias for `Result<T, OrbError>`.
pub type OrbResult<T> = Result<T, OrbError>;
