//! Lookups: what a caller asks a SELECT for.

use super::compound::QueryNode;
use super::expand::ExpandTree;
use crate::value::Value;

/// A column ordering direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    /// The logical column name.
    pub column: String,
    /// Whether to sort in descending order.
    pub descending: bool,
}

impl OrderBy {
    /// Creates an ascending order.
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: false,
        }
    }

    /// Creates a descending order.
    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: true,
        }
    }

    /// The same column in the opposite direction.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self {
            column: self.column.clone(),
            descending: !self.descending,
        }
    }

    pub const fn direction(&self) -> &'static str {
        if self.descending {
            "DESC"
        } else {
            "ASC"
        }
    }
}

/// Which translations a statement reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locale {
    /// Every locale, as a locale-to-value mapping.
    All,
    /// One locale code.
    Code(String),
}

impl Locale {
    /// `"all"` (any case) selects every locale; anything else is a code.
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("all") {
            Self::All
        } else {
            Self::Code(value.to_string())
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            Self::All => None,
            Self::Code(code) => Some(code),
        }
    }
}

/// Which rows a DISTINCT select collapses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Distinct {
    /// `SELECT DISTINCT` over the whole output row.
    All,
    /// `SELECT DISTINCT ON (...)` over the named columns. An empty list
    /// behaves like [`Distinct::All`].
    On(Vec<String>),
}

/// A caller's request against one schema.
///
/// # Examples
///
/// ```
/// use orb_rs_db::query::{Lookup, OrderBy, Query};
///
/// let lookup = Lookup::new()
///     .columns(["id", "username"])
///     .filter(Query::new("active").is(true))
///     .order_by(OrderBy::desc("username"))
///     .start(20)
///     .limit(10);
/// assert_eq!(lookup.columns, vec!["id", "username"]);
/// assert_eq!(lookup.limit, Some(10));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Lookup {
    /// Requested logical column names; empty means every non-proxy column.
    pub columns: Vec<String>,
    pub filter: Option<QueryNode>,
    /// `None` falls back to the schema's default order.
    pub order: Option<Vec<OrderBy>>,
    pub start: Option<usize>,
    pub limit: Option<usize>,
    pub distinct: Option<Distinct>,
    pub expand: ExpandTree,
    /// Overrides the compiler's configured locale for this statement.
    pub locale: Option<Locale>,
}

impl Lookup {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the filter, AND-ing it onto any existing one.
    #[must_use]
    pub fn filter(mut self, filter: impl Into<QueryNode>) -> Self {
        let filter = filter.into();
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing & filter,
            None => filter,
        });
        self
    }

    #[must_use]
    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order.get_or_insert_with(Vec::new).push(order);
        self
    }

    /// Replaces the ordering; an empty list disables the schema default.
    #[must_use]
    pub fn order(mut self, order: Vec<OrderBy>) -> Self {
        self.order = Some(order);
        self
    }

    #[must_use]
    pub const fn start(mut self, start: usize) -> Self {
        self.start = Some(start);
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn distinct(mut self) -> Self {
        self.distinct = Some(Distinct::All);
        self
    }

    /// Keeps the first row of each group of equal values in `columns`.
    #[must_use]
    pub fn distinct_on<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.distinct = Some(Distinct::On(columns.into_iter().map(Into::into).collect()));
        self
    }

    #[must_use]
    pub fn expand(mut self, expand: ExpandTree) -> Self {
        self.expand = expand;
        self
    }

    #[must_use]
    pub fn locale(mut self, locale: Locale) -> Self {
        self.locale = Some(locale);
        self
    }
}

/// A set of records of one schema, used as a comparison value.
///
/// A loaded set carries the primary keys of records already in memory and
/// binds them directly. An unloaded set compiles its lookup as a sub-select.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSet {
    /// The schema name.
    pub table: String,
    pub lookup: Lookup,
    /// Primary keys of materialized records.
    pub loaded: Option<Vec<Value>>,
}

impl RecordSet {
    /// An unloaded set of every record of `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            lookup: Lookup::default(),
            loaded: None,
        }
    }

    /// A materialized set with known primary keys.
    pub fn loaded<I, V>(table: impl Into<String>, ids: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            table: table.into(),
            lookup: Lookup::default(),
            loaded: Some(ids.into_iter().map(Into::into).collect()),
        }
    }

    #[must_use]
    pub fn filter(mut self, filter: impl Into<QueryNode>) -> Self {
        self.lookup = self.lookup.filter(filter);
        self
    }

    #[must_use]
    pub fn with_lookup(mut self, lookup: Lookup) -> Self {
        self.lookup = lookup;
        self
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }
}
