//! Table descriptors.
//!
//! A [`Schema`] is the read-only description of one table the compiler works
//! against: its columns, indexes, many-to-many pipes, reverse lookups, and
//! natural ordering.

use orb_rs_core::{OrbError, OrbResult};

use super::column::Column;
use crate::query::OrderBy;

/// A many-to-many relationship mediated by a through-table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipe {
    /// The relationship name used in expansion trees.
    pub name: String,
    /// The through schema.
    pub through: String,
    /// The column on `through` pointing at the owning schema.
    pub from_column: String,
    /// The column on `through` pointing at `target`.
    pub to_column: String,
    /// The schema on the far side.
    pub target: String,
    /// At most one related row exists.
    pub unique: bool,
}

impl Pipe {
    pub fn new(
        name: impl Into<String>,
        through: impl Into<String>,
        from_column: impl Into<String>,
        to_column: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            through: through.into(),
            from_column: from_column.into(),
            to_column: to_column.into(),
            target: target.into(),
            unique: false,
        }
    }

    /// Marks the pipe as yielding a single row.
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// The inverse of a reference column: the rows of `target` whose `column`
/// points at the owning row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReverseLookup {
    /// The relationship name used in expansion trees.
    pub name: String,
    /// The referencing schema.
    pub target: String,
    /// The reference column on `target`.
    pub column: String,
    /// At most one referencing row exists.
    pub unique: bool,
}

impl ReverseLookup {
    pub fn new(name: impl Into<String>, target: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            column: column.into(),
            unique: false,
        }
    }

    /// Marks the lookup as yielding a single row.
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// A secondary index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    /// The index name.
    pub name: String,
    /// Logical column names, in index order.
    pub columns: Vec<String>,
    /// UNIQUE index.
    pub unique: bool,
}

impl Index {
    pub fn new<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            unique: false,
        }
    }

    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// A table descriptor.
///
/// # Examples
///
/// ```
/// use orb_rs_db::schema::{Column, ColumnType, Schema};
///
/// let user = Schema::new("User")
///     .column(Column::id())
///     .column(Column::new("username", ColumnType::String).unique())
///     .column(Column::new("bio", ColumnType::Text).translatable());
///
/// assert_eq!(user.table_name(), "user");
/// assert_eq!(user.i18n_table_name(), "user_i18n");
/// assert!(user.has_translations());
/// assert_eq!(user.primary_columns().len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    /// The schema name used by callers and references.
    pub name: String,
    /// The physical table name.
    pub db_name: String,
    /// The database namespace, when not the connection default.
    pub namespace: Option<String>,
    /// The parent schema, for inherited tables.
    pub inherits: Option<String>,
    columns: Vec<Column>,
    indexes: Vec<Index>,
    pipes: Vec<Pipe>,
    reverse_lookups: Vec<ReverseLookup>,
    default_order: Vec<OrderBy>,
}

impl Schema {
    /// Creates an empty schema whose table name is the snake-cased schema name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            db_name: to_snake_case(&name),
            name,
            namespace: None,
            inherits: None,
            columns: Vec::new(),
            indexes: Vec::new(),
            pipes: Vec::new(),
            reverse_lookups: Vec::new(),
            default_order: Vec::new(),
        }
    }

    /// Overrides the physical table name.
    #[must_use]
    pub fn db_name(mut self, db_name: impl Into<String>) -> Self {
        self.db_name = db_name.into();
        self
    }

    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    #[must_use]
    pub fn inherits(mut self, parent: impl Into<String>) -> Self {
        self.inherits = Some(parent.into());
        self
    }

    #[must_use]
    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    #[must_use]
    pub fn index(mut self, index: Index) -> Self {
        self.indexes.push(index);
        self
    }

    #[must_use]
    pub fn pipe(mut self, pipe: Pipe) -> Self {
        self.pipes.push(pipe);
        self
    }

    #[must_use]
    pub fn reverse_lookup(mut self, lookup: ReverseLookup) -> Self {
        self.reverse_lookups.push(lookup);
        self
    }

    #[must_use]
    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.default_order.push(order);
        self
    }

    // ── Descriptor API ──────────────────────────────────────────────

    /// All columns in declaration order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// The primary-key columns in declaration order.
    pub fn primary_columns(&self) -> Vec<&Column> {
        self.columns.iter().filter(|c| c.primary).collect()
    }

    /// The single primary-key column that translation tables and
    /// derived-table joins key on.
    ///
    /// Fails with [`OrbError::ReadOnly`] when the schema has no primary key.
    pub fn id_column(&self) -> OrbResult<&Column> {
        self.columns
            .iter()
            .find(|c| c.primary)
            .ok_or_else(|| OrbError::ReadOnly(self.name.clone()))
    }

    /// Looks a column up by logical name, then by physical field name.
    pub fn column_named(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .or_else(|| self.columns.iter().find(|c| c.field == name))
    }

    /// Like [`column_named`](Self::column_named) but fails with
    /// [`OrbError::ColumnNotFound`].
    pub fn require_column(&self, name: &str) -> OrbResult<&Column> {
        self.column_named(name)
            .ok_or_else(|| OrbError::column_not_found(&self.name, name))
    }

    pub fn pipe_named(&self, name: &str) -> Option<&Pipe> {
        self.pipes.iter().find(|p| p.name == name)
    }

    pub fn reverse_lookup_named(&self, name: &str) -> Option<&ReverseLookup> {
        self.reverse_lookups.iter().find(|r| r.name == name)
    }

    pub fn indexes(&self) -> &[Index] {
        &self.indexes
    }

    /// The natural ordering, empty when none is declared.
    pub fn default_order(&self) -> &[OrderBy] {
        &self.default_order
    }

    pub fn table_name(&self) -> &str {
        &self.db_name
    }

    pub fn translatable_columns(&self) -> Vec<&Column> {
        self.columns
            .iter()
            .filter(|c| c.translatable && !c.is_proxy())
            .collect()
    }

    pub fn has_translations(&self) -> bool {
        self.columns.iter().any(|c| c.translatable && !c.is_proxy())
    }

    /// The name of the per-locale side table.
    pub fn i18n_table_name(&self) -> String {
        format!("{}_i18n", self.db_name)
    }

    /// The column in the translation table that points back at this table.
    pub fn i18n_owner_field(&self) -> String {
        format!("{}_id", self.db_name)
    }
}

/// `OrderItem` -> `order_item`, `userRole` -> `user_role`.
pub(crate) fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for ch in name.chars() {
        if ch.is_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
            prev_lower = false;
        } else {
            out.push(ch);
            prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        }
    }
    out
}
