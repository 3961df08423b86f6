//! # orb-rs-db
//!
//! SQL generation for the orb-rs mapping layer. Callers describe tables with
//! [`Schema`](schema::Schema) descriptors, ask for rows with a
//! [`Lookup`](query::Lookup) built from [`Query`](query::Query) filter trees,
//! and hand both to a [`SqlCompiler`](compiler::SqlCompiler), which produces
//! parameterized SQL for one [`Dialect`](dialect::Dialect).
//!
//! ## Architecture
//!
//! Nothing is executed here. Query values are immutable descriptions; the
//! compiler reads them, threads a fresh per-call context through the
//! recursive planners, and renders a [`CompiledStatement`](compiler::CompiledStatement)
//! whose named parameters line up with the `%(keyN)s` placeholders in its
//! text. Connection handling and result decoding belong to the caller.
//!
//! ## Module Overview
//!
//! - [`schema`] - Table, column, relationship, and index descriptors
//! - [`query`] - Filters, compounds, lookups, expansions, and records
//! - [`value`] - The backend-agnostic [`Value`](value::Value) enum
//! - [`store`] - Per-dialect conversion of values before binding
//! - [`dialect`] - PostgreSQL and MySQL syntax tables
//! - [`compiler`] - SELECT, COUNT, WHERE, INSERT, UPDATE, DELETE, and DDL compilation

// These clippy lints are intentionally allowed for the SQL crate:
// - struct_excessive_bools: Column mirrors the flag set of a schema descriptor
// - too_many_lines: the predicate compiler matches over every operator
// - result_large_err: OrbError is the crate-wide error type and is used consistently
// - format_push_string: format! with push_str is clearer than write! for SQL generation
// - doc_markdown: backtick requirements for documentation items are too strict
// - return_self_not_must_use: builder pattern methods are self-documenting
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::result_large_err)]
#![allow(clippy::format_push_string)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::match_same_arms)]
// literal_string_with_formatting_args: SQL templates carry literal {alias}-style text in tests
#![allow(clippy::literal_string_with_formatting_args)]

pub mod compiler;
pub mod dialect;
pub mod query;
pub mod schema;
pub mod store;
pub mod value;

// Re-export the most commonly used types at the crate root.
pub use compiler::{CompileOptions, CompiledStatement, Params, SqlCompiler};
pub use dialect::{Dialect, MySql, PostgreSql};
pub use query::{
    CompoundOp, Distinct, ExpandTree, Function, Locale, Lookup, Marker, Math, Op, OrderBy,
    Query, QueryCompound, QueryNode, QueryValue, Record, RecordSet,
};
pub use schema::{
    AggregateFunction, Aggregator, Column, ColumnType, Index, Joiner, Pipe, ReverseLookup, Schema,
    SchemaRegistry,
};
pub use store::ValueStore;
pub use value::Value;
