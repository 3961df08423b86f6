//! Boolean combinations of predicates.
//!
//! Queries and compounds combine with `&` and `|`. Chains of the same
//! operator flatten into one compound, so `a & b & c` is a single AND with
//! three children in source order.
//!
//! ```
//! use orb_rs_db::query::{CompoundOp, Query, QueryNode};
//!
//! let node = Query::new("a").is(1) & (Query::new("b").is(2) | Query::new("c").is(3));
//! match node {
//!     QueryNode::Compound(c) => {
//!         assert_eq!(c.op, CompoundOp::And);
//!         assert_eq!(c.queries.len(), 2);
//!     }
//!     QueryNode::Query(_) => unreachable!(),
//! }
//! ```

use std::ops;

use super::filter::Query;

/// The boolean connective of a compound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompoundOp {
    And,
    Or,
}

impl CompoundOp {
    /// The SQL separator placed between children.
    pub const fn separator(self) -> &'static str {
        match self {
            Self::And => " AND ",
            Self::Or => " OR ",
        }
    }
}

/// An ordered AND/OR combination of nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryCompound {
    pub op: CompoundOp,
    pub queries: Vec<QueryNode>,
}

impl QueryCompound {
    pub fn and<I, N>(queries: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<QueryNode>,
    {
        Self {
            op: CompoundOp::And,
            queries: queries.into_iter().map(Into::into).collect(),
        }
    }

    pub fn or<I, N>(queries: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<QueryNode>,
    {
        Self {
            op: CompoundOp::Or,
            queries: queries.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}

/// A node of a filter tree.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryNode {
    Query(Query),
    Compound(QueryCompound),
}

impl From<Query> for QueryNode {
    fn from(q: Query) -> Self {
        Self::Query(q)
    }
}

impl From<QueryCompound> for QueryNode {
    fn from(c: QueryCompound) -> Self {
        Self::Compound(c)
    }
}

fn combine(op: CompoundOp, left: QueryNode, right: QueryNode) -> QueryNode {
    match (left, right) {
        (QueryNode::Compound(mut l), QueryNode::Compound(r)) if l.op == op && r.op == op => {
            l.queries.extend(r.queries);
            QueryNode::Compound(l)
        }
        (QueryNode::Compound(mut l), other) if l.op == op => {
            l.queries.push(other);
            QueryNode::Compound(l)
        }
        (other, QueryNode::Compound(mut r)) if r.op == op => {
            r.queries.insert(0, other);
            QueryNode::Compound(r)
        }
        (l, r) => QueryNode::Compound(QueryCompound {
            op,
            queries: vec![l, r],
        }),
    }
}

impl<T: Into<QueryNode>> ops::BitAnd<T> for QueryNode {
    type Output = QueryNode;

    fn bitand(self, rhs: T) -> Self::Output {
        combine(CompoundOp::And, self, rhs.into())
    }
}

impl<T: Into<QueryNode>> ops::BitOr<T> for QueryNode {
    type Output = QueryNode;

    fn bitor(self, rhs: T) -> Self::Output {
        combine(CompoundOp::Or, self, rhs.into())
    }
}

impl<T: Into<QueryNode>> ops::BitAnd<T> for Query {
    type Output = QueryNode;

    fn bitand(self, rhs: T) -> Self::Output {
        combine(CompoundOp::And, self.into(), rhs.into())
    }
}

impl<T: Into<QueryNode>> ops::BitOr<T> for Query {
    type Output = QueryNode;

    fn bitor(self, rhs: T) -> Self::Output {
        combine(CompoundOp::Or, self.into(), rhs.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(name: &str) -> Query {
        Query::new(name).is(1)
    }

    #[test]
    fn test_and_flattens() {
        let node = q("a") & q("b") & q("c");
        let QueryNode::Compound(c) = node else {
            panic!("expected compound")
        };
        assert_eq!(c.op, CompoundOp::And);
        let names: Vec<&str> = c
            .queries
            .iter()
            .map(|n| match n {
                QueryNode::Query(q) => q.column.as_str(),
                QueryNode::Compound(_) => "?",
            })
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_mixed_operators_nest() {
        let node = q("a") & (q("b") | q("c"));
        let QueryNode::Compound(c) = node else {
            panic!("expected compound")
        };
        assert_eq!(c.queries.len(), 2);
        assert!(matches!(
            &c.queries[1],
            QueryNode::Compound(inner) if inner.op == CompoundOp::Or && inner.queries.len() == 2
        ));
    }

    #[test]
    fn test_or_prepends_into_right_chain() {
        let right = q("b") | q("c");
        let node = QueryNode::from(q("a")) | right;
        let QueryNode::Compound(c) = node else {
            panic!("expected compound")
        };
        assert_eq!(c.queries.len(), 3);
        assert!(matches!(&c.queries[0], QueryNode::Query(q) if q.column == "a"));
    }

    #[test]
    fn test_constructors() {
        let c = QueryCompound::or([q("a"), q("b")]);
        assert_eq!(c.op.separator(), " OR ");
        assert!(!c.is_empty());
        assert!(QueryCompound::and(Vec::<Query>::new()).is_empty());
    }
}
