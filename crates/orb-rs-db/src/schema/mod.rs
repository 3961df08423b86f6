//! Read-only schema descriptors consumed by the compiler.
//!
//! - [`column`] - [`Column`], [`ColumnType`], aggregators and joiners
//! - [`table`] - [`Schema`], pipes, reverse lookups, and indexes
//! - [`registry`] - [`SchemaRegistry`], name-to-schema resolution

pub mod column;
pub mod registry;
pub mod table;

pub use column::{
    AggregateFunction, Aggregator, Column, ColumnFlag, ColumnKind, ColumnType, Joiner,
};
pub use registry::SchemaRegistry;
pub use table::{Index, Pipe, ReverseLookup, Schema};
