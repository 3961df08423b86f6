//! # orb-rs
//!
//! SQL generation core for an object-relational mapping layer.
//!
//! This is the meta-crate that re-exports the sub-crates for convenient
//! access. Depend on `orb-rs` to get everything, or on the individual crates
//! for finer-grained control.

/// Settings, logging, and error types.
pub use orb_rs_core as core;

/// Schemas, query trees, dialects, and the statement compiler.
#[cfg(feature = "db")]
pub use orb_rs_db as db;

/// Re-exports of commonly used third-party crates.
pub mod deps {
    pub use serde;
    pub use serde_json;
    pub use tracing;
    pub use tracing_subscriber;
}

/// The most commonly used types, for glob import.
///
/// # Examples
///
/// ```
/// use orb_rs::prelude::*;
///
/// let registry = SchemaRegistry::new().with(
///     Schema::new("Role")
///         .column(Column::id())
///         .column(Column::new("name", ColumnType::String)),
/// );
/// let dialect = MySql::new();
/// let compiler = SqlCompiler::new(&registry, &dialect);
/// let statement = compiler
///     .compile_count("Role", &Lookup::new().filter(Query::new("name").startswith("adm")))
///     .unwrap()
///     .unwrap();
/// assert!(statement.sql.starts_with("SELECT COUNT(*) AS `count`"));
/// ```
pub mod prelude {
    pub use orb_rs_core::{OrbError, OrbResult, Settings};

    #[cfg(feature = "db")]
    pub use orb_rs_db::{
        Aggregator, Column, ColumnType, CompileOptions, CompiledStatement, Dialect, Distinct,
        ExpandTree, Index, Joiner, Locale, Lookup, Marker, MySql, OrderBy, Pipe, PostgreSql, Query,
        QueryCompound, QueryNode, Record, RecordSet, ReverseLookup, Schema, SchemaRegistry,
        SqlCompiler, Value,
    };
}
