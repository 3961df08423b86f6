//! The query model: immutable filter trees and lookups.
//!
//! - [`filter`] - [`Query`] leaf predicates, operators, math, and functions
//! - [`compound`] - [`QueryCompound`] / [`QueryNode`] AND/OR trees
//! - [`lookup`] - [`Lookup`], [`OrderBy`], [`RecordSet`], and [`Locale`]
//! - [`expand`] - [`ExpandTree`] eager-load trees
//! - [`record`] - [`Record`] rows written by mutations
//!
//! Nothing here knows about SQL; the [`compiler`](crate::compiler) reads
//! these values and never mutates them.

pub mod compound;
pub mod expand;
pub mod filter;
pub mod lookup;
pub mod record;

pub use compound::{CompoundOp, QueryCompound, QueryNode};
pub use expand::{ExpandTree, Marker};
pub use filter::{Function, Math, Op, Query, QueryValue};
pub use lookup::{Distinct, Locale, Lookup, OrderBy, RecordSet};
pub use record::Record;
