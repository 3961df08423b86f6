//! Leaf predicates.
//!
//! A [`Query`] compares one column (named directly or through a dotted
//! traversal path such as `address.city`) against a [`QueryValue`]. Queries
//! are immutable values built with consuming builder methods.
//!
//! # Examples
//!
//! ```
//! use orb_rs_db::query::{Op, Query, QueryValue};
//! use orb_rs_db::value::Value;
//!
//! let q = Query::new("username").is("john.doe");
//! assert_eq!(q.op, Op::Is);
//! assert_eq!(q.value, QueryValue::Literal(Value::from("john.doe")));
//!
//! let ci = Query::new("email").contains("@example").case_sensitive(false);
//! assert_eq!(ci.case_sensitive, Some(false));
//! ```

use super::lookup::RecordSet;
use crate::value::Value;

/// A comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Is,
    IsNot,
    LessThan,
    LessThanOrEqual,
    Before,
    GreaterThan,
    GreaterThanOrEqual,
    After,
    Between,
    Contains,
    DoesNotContain,
    Startswith,
    DoesNotStartwith,
    Endswith,
    DoesNotEndwith,
    Matches,
    DoesNotMatch,
    IsIn,
    IsNotIn,
}

impl Op {
    /// `IsIn` and `IsNotIn`.
    pub const fn is_membership(self) -> bool {
        matches!(self, Self::IsIn | Self::IsNotIn)
    }

    /// The `LIKE` family, whose bound value is wrapped in wildcards.
    pub const fn is_pattern(self) -> bool {
        matches!(
            self,
            Self::Contains
                | Self::DoesNotContain
                | Self::Startswith
                | Self::DoesNotStartwith
                | Self::Endswith
                | Self::DoesNotEndwith
        )
    }

    /// Operators whose truth value is the negation of another operator.
    pub const fn is_negative(self) -> bool {
        matches!(
            self,
            Self::IsNot
                | Self::DoesNotContain
                | Self::DoesNotStartwith
                | Self::DoesNotEndwith
                | Self::DoesNotMatch
                | Self::IsNotIn
        )
    }

    /// Wraps a pattern operand in `%` wildcards; other operators return it unchanged.
    pub fn wildcard(self, operand: &str) -> String {
        match self {
            Self::Contains | Self::DoesNotContain => format!("%{operand}%"),
            Self::Startswith | Self::DoesNotStartwith => format!("{operand}%"),
            Self::Endswith | Self::DoesNotEndwith => format!("%{operand}"),
            _ => operand.to_string(),
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Is => "Is",
            Self::IsNot => "IsNot",
            Self::LessThan => "LessThan",
            Self::LessThanOrEqual => "LessThanOrEqual",
            Self::Before => "Before",
            Self::GreaterThan => "GreaterThan",
            Self::GreaterThanOrEqual => "GreaterThanOrEqual",
            Self::After => "After",
            Self::Between => "Between",
            Self::Contains => "Contains",
            Self::DoesNotContain => "DoesNotContain",
            Self::Startswith => "Startswith",
            Self::DoesNotStartwith => "DoesNotStartwith",
            Self::Endswith => "Endswith",
            Self::DoesNotEndwith => "DoesNotEndwith",
            Self::Matches => "Matches",
            Self::DoesNotMatch => "DoesNotMatch",
            Self::IsIn => "IsIn",
            Self::IsNotIn => "IsNotIn",
        }
    }
}

/// An arithmetic or bitwise operation chained onto a column expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Math {
    Add,
    Subtract,
    Multiply,
    Divide,
    And,
    Or,
}

impl Math {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Add => "Add",
            Self::Subtract => "Subtract",
            Self::Multiply => "Multiply",
            Self::Divide => "Divide",
            Self::And => "And",
            Self::Or => "Or",
        }
    }
}

/// A scalar function wrapped around a column expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    Lower,
    Upper,
    Abs,
    AsString,
}

/// The right-hand side of a predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    /// No value: only `Is`/`IsNot` render (as NULL checks).
    Null,
    /// A literal, bound through a parameter.
    Literal(Value),
    /// Another column, for column-to-column comparisons.
    Column(Box<Query>),
    /// A set of records, loaded (ids known) or compiled as a sub-select.
    Records(Box<RecordSet>),
}

impl From<Value> for QueryValue {
    fn from(v: Value) -> Self {
        if v.is_null() {
            Self::Null
        } else {
            Self::Literal(v)
        }
    }
}

impl From<&str> for QueryValue {
    fn from(v: &str) -> Self {
        Self::Literal(Value::from(v))
    }
}

impl From<String> for QueryValue {
    fn from(v: String) -> Self {
        Self::Literal(Value::from(v))
    }
}

impl From<i64> for QueryValue {
    fn from(v: i64) -> Self {
        Self::Literal(Value::Int(v))
    }
}

impl From<i32> for QueryValue {
    fn from(v: i32) -> Self {
        Self::Literal(Value::from(v))
    }
}

impl From<f64> for QueryValue {
    fn from(v: f64) -> Self {
        Self::Literal(Value::Float(v))
    }
}

impl From<bool> for QueryValue {
    fn from(v: bool) -> Self {
        Self::Literal(Value::Bool(v))
    }
}

impl From<Vec<Value>> for QueryValue {
    fn from(v: Vec<Value>) -> Self {
        Self::Literal(Value::List(v))
    }
}

impl From<Query> for QueryValue {
    fn from(q: Query) -> Self {
        Self::Column(Box::new(q))
    }
}

impl From<RecordSet> for QueryValue {
    fn from(records: RecordSet) -> Self {
        Self::Records(Box::new(records))
    }
}

/// A leaf predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Column name or dotted traversal path, resolved against the base schema.
    pub column: String,
    pub op: Op,
    pub value: QueryValue,
    /// Swaps the sides of the comparison.
    pub inverted: bool,
    /// Overrides the column's default case sensitivity.
    pub case_sensitive: Option<bool>,
    /// Applied to the column expression in order, after `functions`.
    pub math: Vec<(Math, QueryValue)>,
    /// Applied to the column expression innermost-first.
    pub functions: Vec<Function>,
}

impl Query {
    /// A predicate on `column` that is not yet constrained (`Is NULL` until
    /// an operator builder is applied).
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            op: Op::Is,
            value: QueryValue::Null,
            inverted: false,
            case_sensitive: None,
            math: Vec::new(),
            functions: Vec::new(),
        }
    }

    fn with(mut self, op: Op, value: impl Into<QueryValue>) -> Self {
        self.op = op;
        self.value = value.into();
        self
    }

    // ── Operators ───────────────────────────────────────────────────

    #[must_use]
    pub fn is(self, value: impl Into<QueryValue>) -> Self {
        self.with(Op::Is, value)
    }

    #[must_use]
    pub fn is_not(self, value: impl Into<QueryValue>) -> Self {
        self.with(Op::IsNot, value)
    }

    #[must_use]
    pub fn is_null(self) -> Self {
        self.with(Op::Is, QueryValue::Null)
    }

    #[must_use]
    pub fn is_not_null(self) -> Self {
        self.with(Op::IsNot, QueryValue::Null)
    }

    #[must_use]
    pub fn less_than(self, value: impl Into<QueryValue>) -> Self {
        self.with(Op::LessThan, value)
    }

    #[must_use]
    pub fn less_than_or_equal(self, value: impl Into<QueryValue>) -> Self {
        self.with(Op::LessThanOrEqual, value)
    }

    #[must_use]
    pub fn before(self, value: impl Into<QueryValue>) -> Self {
        self.with(Op::Before, value)
    }

    #[must_use]
    pub fn greater_than(self, value: impl Into<QueryValue>) -> Self {
        self.with(Op::GreaterThan, value)
    }

    #[must_use]
    pub fn greater_than_or_equal(self, value: impl Into<QueryValue>) -> Self {
        self.with(Op::GreaterThanOrEqual, value)
    }

    #[must_use]
    pub fn after(self, value: impl Into<QueryValue>) -> Self {
        self.with(Op::After, value)
    }

    /// Inclusive range; both bounds are bound separately.
    #[must_use]
    pub fn between(self, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        self.with(Op::Between, Value::List(vec![low.into(), high.into()]))
    }

    #[must_use]
    pub fn contains(self, value: impl Into<QueryValue>) -> Self {
        self.with(Op::Contains, value)
    }

    #[must_use]
    pub fn does_not_contain(self, value: impl Into<QueryValue>) -> Self {
        self.with(Op::DoesNotContain, value)
    }

    #[must_use]
    pub fn startswith(self, value: impl Into<QueryValue>) -> Self {
        self.with(Op::Startswith, value)
    }

    #[must_use]
    pub fn does_not_startwith(self, value: impl Into<QueryValue>) -> Self {
        self.with(Op::DoesNotStartwith, value)
    }

    #[must_use]
    pub fn endswith(self, value: impl Into<QueryValue>) -> Self {
        self.with(Op::Endswith, value)
    }

    #[must_use]
    pub fn does_not_endwith(self, value: impl Into<QueryValue>) -> Self {
        self.with(Op::DoesNotEndwith, value)
    }

    /// Regular-expression match.
    #[must_use]
    pub fn matches(self, pattern: impl Into<QueryValue>) -> Self {
        self.with(Op::Matches, pattern)
    }

    #[must_use]
    pub fn does_not_match(self, pattern: impl Into<QueryValue>) -> Self {
        self.with(Op::DoesNotMatch, pattern)
    }

    /// Membership in a literal list or a record set.
    #[must_use]
    pub fn is_in(self, values: impl Into<QueryValue>) -> Self {
        self.with(Op::IsIn, values)
    }

    #[must_use]
    pub fn is_not_in(self, values: impl Into<QueryValue>) -> Self {
        self.with(Op::IsNotIn, values)
    }

    // ── Modifiers ───────────────────────────────────────────────────

    /// Places the compared value on the left of the operator.
    #[must_use]
    pub fn inverted(mut self) -> Self {
        self.inverted = !self.inverted;
        self
    }

    #[must_use]
    pub fn case_sensitive(mut self, sensitive: bool) -> Self {
        self.case_sensitive = Some(sensitive);
        self
    }

    #[must_use]
    pub fn function(mut self, function: Function) -> Self {
        self.functions.push(function);
        self
    }

    #[must_use]
    pub fn lower(self) -> Self {
        self.function(Function::Lower)
    }

    #[must_use]
    pub fn upper(self) -> Self {
        self.function(Function::Upper)
    }

    #[must_use]
    pub fn abs(self) -> Self {
        self.function(Function::Abs)
    }

    #[must_use]
    pub fn as_string(self) -> Self {
        self.function(Function::AsString)
    }

    #[must_use]
    pub fn math(mut self, math: Math, operand: impl Into<QueryValue>) -> Self {
        self.math.push((math, operand.into()));
        self
    }

    #[must_use]
    pub fn add(self, operand: impl Into<QueryValue>) -> Self {
        self.math(Math::Add, operand)
    }

    #[must_use]
    pub fn subtract(self, operand: impl Into<QueryValue>) -> Self {
        self.math(Math::Subtract, operand)
    }

    #[must_use]
    pub fn multiply(self, operand: impl Into<QueryValue>) -> Self {
        self.math(Math::Multiply, operand)
    }

    #[must_use]
    pub fn divide(self, operand: impl Into<QueryValue>) -> Self {
        self.math(Math::Divide, operand)
    }

    #[must_use]
    pub fn bit_and(self, operand: impl Into<QueryValue>) -> Self {
        self.math(Math::And, operand)
    }

    #[must_use]
    pub fn bit_or(self, operand: impl Into<QueryValue>) -> Self {
        self.math(Math::Or, operand)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcards() {
        assert_eq!(Op::Contains.wildcard("oe"), "%oe%");
        assert_eq!(Op::DoesNotStartwith.wildcard("jo"), "jo%");
        assert_eq!(Op::Endswith.wildcard("doe"), "%doe");
        assert_eq!(Op::Is.wildcard("x"), "x");
    }

    #[test]
    fn test_null_literal_normalizes() {
        let q = Query::new("deleted").is(Value::Null);
        assert_eq!(q.value, QueryValue::Null);
    }

    #[test]
    fn test_between_value() {
        let q = Query::new("age").between(18, 65);
        assert_eq!(q.op, Op::Between);
        assert_eq!(
            q.value,
            QueryValue::Literal(Value::List(vec![Value::Int(18), Value::Int(65)]))
        );
    }

    #[test]
    fn test_inverted_toggles() {
        let q = Query::new("a").greater_than(1).inverted();
        assert!(q.inverted);
        assert!(!q.inverted().inverted);
    }

    #[test]
    fn test_column_comparison_value() {
        let q = Query::new("created").before(Query::new("updated"));
        assert!(matches!(q.value, QueryValue::Column(ref other) if other.column == "updated"));
    }

    #[test]
    fn test_math_and_functions_order() {
        let q = Query::new("score").abs().add(5).multiply(2);
        assert_eq!(q.functions, vec![Function::Abs]);
        assert_eq!(q.math.len(), 2);
        assert_eq!(q.math[1].0, Math::Multiply);
    }

    #[test]
    fn test_op_families() {
        assert!(Op::IsNotIn.is_membership());
        assert!(Op::DoesNotEndwith.is_pattern());
        assert!(!Op::Matches.is_pattern());
        assert!(Op::DoesNotMatch.is_negative());
        assert!(!Op::After.is_negative());
    }
}
