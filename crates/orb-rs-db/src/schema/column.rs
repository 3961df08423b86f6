//! Column descriptors.
//!
//! A [`Column`] carries a logical name (what callers and result rows use), a
//! physical field name (what SQL uses), a [`ColumnType`], a [`ColumnKind`]
//! classification, and a set of orthogonal flags.

use crate::query::QueryNode;

/// The storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ColumnType {
    /// Auto-generated integer primary key.
    Id,
    /// 64-bit integer.
    BigInt,
    /// 32-bit integer.
    Integer,
    /// Integer-backed enumeration.
    Enum,
    /// Boolean.
    Bool,
    /// Fixed-precision decimal.
    Decimal,
    /// Double-precision float.
    Double,
    /// Short string.
    String,
    /// Unlimited text.
    Text,
    /// Email address.
    Email,
    /// Password hash.
    Password,
    /// URL.
    Url,
    /// Color code.
    Color,
    /// Calendar date.
    Date,
    /// Timestamp without time zone.
    Datetime,
    /// Timestamp with time zone.
    DatetimeWithTimezone,
    /// Time of day.
    Time,
    /// Duration.
    Interval,
    /// Binary blob.
    ByteArray,
    /// JSON document.
    Json,
    /// UUID.
    Uuid,
    /// Foreign key to another schema's primary key.
    Reference,
}

impl ColumnType {
    /// Returns `true` for the character types (string matching, `||` concatenation).
    pub const fn is_string(self) -> bool {
        matches!(
            self,
            Self::String | Self::Text | Self::Email | Self::Password | Self::Url | Self::Color
        )
    }

    /// Returns `true` for the integral types that support bitwise math.
    pub const fn is_integral(self) -> bool {
        matches!(
            self,
            Self::Id | Self::BigInt | Self::Integer | Self::Enum | Self::Reference
        )
    }

    /// The type name used in error messages.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Id => "Id",
            Self::BigInt => "BigInt",
            Self::Integer => "Integer",
            Self::Enum => "Enum",
            Self::Bool => "Bool",
            Self::Decimal => "Decimal",
            Self::Double => "Double",
            Self::String => "String",
            Self::Text => "Text",
            Self::Email => "Email",
            Self::Password => "Password",
            Self::Url => "Url",
            Self::Color => "Color",
            Self::Date => "Date",
            Self::Datetime => "Datetime",
            Self::DatetimeWithTimezone => "DatetimeWithTimezone",
            Self::Time => "Time",
            Self::Interval => "Interval",
            Self::ByteArray => "ByteArray",
            Self::Json => "Json",
            Self::Uuid => "Uuid",
            Self::Reference => "Reference",
        }
    }
}

/// The column flags that have DDL fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnFlag {
    /// `UNIQUE`.
    Unique,
    /// `NOT NULL`.
    Required,
    /// Auto-increment clause.
    AutoIncrement,
}

/// An aggregate function applied by an [`Aggregator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    /// `COUNT`.
    Count,
    /// `SUM`.
    Sum,
    /// `MAX`.
    Max,
    /// `MIN`.
    Min,
}

impl AggregateFunction {
    /// The SQL function name.
    pub const fn sql(self) -> &'static str {
        match self {
            Self::Count => "COUNT",
            Self::Sum => "SUM",
            Self::Max => "MAX",
            Self::Min => "MIN",
        }
    }
}

/// Computes a column by aggregating rows of another schema that point back
/// at the owning row.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregator {
    /// The aggregate function.
    pub function: AggregateFunction,
    /// The schema whose rows are aggregated.
    pub reference: String,
    /// The column on `reference` that points at the owning row.
    pub reference_column: String,
    /// The column on `reference` being aggregated (`None` counts rows).
    pub target_column: Option<String>,
    /// An optional filter on `reference` rows.
    pub filter: Option<QueryNode>,
}

impl Aggregator {
    /// Counts rows of `reference` whose `reference_column` points at the owner.
    pub fn count(reference: impl Into<String>, reference_column: impl Into<String>) -> Self {
        Self {
            function: AggregateFunction::Count,
            reference: reference.into(),
            reference_column: reference_column.into(),
            target_column: None,
            filter: None,
        }
    }

    /// Applies `function` to `target_column` of the referencing rows.
    pub fn new(
        function: AggregateFunction,
        reference: impl Into<String>,
        reference_column: impl Into<String>,
        target_column: impl Into<String>,
    ) -> Self {
        Self {
            function,
            reference: reference.into(),
            reference_column: reference_column.into(),
            target_column: Some(target_column.into()),
            filter: None,
        }
    }

    /// Restricts the aggregated rows.
    #[must_use]
    pub fn filter(mut self, filter: impl Into<QueryNode>) -> Self {
        self.filter = Some(filter.into());
        self
    }
}

/// Projects the first matching value of another schema onto the owning row.
#[derive(Debug, Clone, PartialEq)]
pub struct Joiner {
    /// The schema holding the value.
    pub reference: String,
    /// The column on `reference` that points at the owning row.
    pub reference_column: String,
    /// The column on `reference` that is projected.
    pub target_column: String,
    /// An optional filter on `reference` rows.
    pub filter: Option<QueryNode>,
}

impl Joiner {
    /// Creates a joiner without a filter.
    pub fn new(
        reference: impl Into<String>,
        reference_column: impl Into<String>,
        target_column: impl Into<String>,
    ) -> Self {
        Self {
            reference: reference.into(),
            reference_column: reference_column.into(),
            target_column: target_column.into(),
            filter: None,
        }
    }

    /// Restricts the candidate rows.
    #[must_use]
    pub fn filter(mut self, filter: impl Into<QueryNode>) -> Self {
        self.filter = Some(filter.into());
        self
    }
}

/// How a column's value is produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnKind {
    /// Stored directly on the table.
    Plain,
    /// Computed from an aggregate over a related schema.
    Aggregate(Aggregator),
    /// Projected from the first matching row of a related schema.
    Joined(Joiner),
    /// Computed in the application layer; never part of SQL.
    Proxy,
}

/// A column descriptor.
///
/// # Examples
///
/// ```
/// use orb_rs_db::schema::{Column, ColumnType};
///
/// let username = Column::new("username", ColumnType::String).unique().required();
/// assert_eq!(username.field, "username");
/// assert!(username.unique);
///
/// let role = Column::reference("role", "Role");
/// assert_eq!(role.field, "role_id");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// The logical name.
    pub name: String,
    /// The physical field name.
    pub field: String,
    /// The storage type.
    pub column_type: ColumnType,
    /// The classification.
    pub kind: ColumnKind,
    /// Part of the primary key.
    pub primary: bool,
    /// Carries a UNIQUE constraint.
    pub unique: bool,
    /// Gets its own index.
    pub indexed: bool,
    /// NOT NULL.
    pub required: bool,
    /// Stored per locale in the translation table.
    pub translatable: bool,
    /// String comparisons default to case-sensitive.
    pub case_sensitive: bool,
    /// Generated by the database on insert.
    pub auto_increment: bool,
    /// The referenced schema, for [`ColumnType::Reference`] columns.
    pub reference: Option<String>,
    /// Overrides the dialect's default length for character types.
    pub max_length: Option<usize>,
}

impl Column {
    /// Creates a plain column whose field name equals its logical name.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        let name = name.into();
        Self {
            field: name.clone(),
            name,
            column_type,
            kind: ColumnKind::Plain,
            primary: false,
            unique: false,
            indexed: false,
            required: false,
            translatable: false,
            case_sensitive: false,
            auto_increment: false,
            reference: None,
            max_length: None,
        }
    }

    /// The conventional auto-increment `id` primary key.
    pub fn id() -> Self {
        Self::new("id", ColumnType::Id).primary().auto_increment()
    }

    /// A reference to `target`, stored in `{name}_id`.
    pub fn reference(name: impl Into<String>, target: impl Into<String>) -> Self {
        let name = name.into();
        let field = format!("{name}_id");
        Self::new(name, ColumnType::Reference)
            .field(field)
            .references(target)
    }

    /// A column computed by an aggregator.
    pub fn aggregate(name: impl Into<String>, column_type: ColumnType, aggregator: Aggregator) -> Self {
        let mut column = Self::new(name, column_type);
        column.kind = ColumnKind::Aggregate(aggregator);
        column
    }

    /// A column computed by a joiner.
    pub fn joined(name: impl Into<String>, column_type: ColumnType, joiner: Joiner) -> Self {
        let mut column = Self::new(name, column_type);
        column.kind = ColumnKind::Joined(joiner);
        column
    }

    /// A column that never reaches SQL.
    pub fn proxy(name: impl Into<String>, column_type: ColumnType) -> Self {
        let mut column = Self::new(name, column_type);
        column.kind = ColumnKind::Proxy;
        column
    }

    /// Sets the physical field name.
    #[must_use]
    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = field.into();
        self
    }

    /// Marks the column as part of the primary key.
    #[must_use]
    pub const fn primary(mut self) -> Self {
        self.primary = true;
        self.required = true;
        self
    }

    /// Adds a UNIQUE constraint.
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Requests an index.
    #[must_use]
    pub const fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    /// Adds NOT NULL.
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Stores the column per locale.
    #[must_use]
    pub const fn translatable(mut self) -> Self {
        self.translatable = true;
        self
    }

    /// Sets the default case sensitivity of string comparisons.
    #[must_use]
    pub const fn case_sensitive(mut self, sensitive: bool) -> Self {
        self.case_sensitive = sensitive;
        self
    }

    /// Marks the column as generated on insert.
    #[must_use]
    pub const fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Points the column at `target`.
    #[must_use]
    pub fn references(mut self, target: impl Into<String>) -> Self {
        self.reference = Some(target.into());
        self
    }

    /// Overrides the character length.
    #[must_use]
    pub const fn max_length(mut self, length: usize) -> Self {
        self.max_length = Some(length);
        self
    }

    pub const fn is_aggregate(&self) -> bool {
        matches!(self.kind, ColumnKind::Aggregate(_))
    }

    pub const fn is_joined(&self) -> bool {
        matches!(self.kind, ColumnKind::Joined(_))
    }

    pub const fn is_proxy(&self) -> bool {
        matches!(self.kind, ColumnKind::Proxy)
    }

    pub const fn is_reference(&self) -> bool {
        self.reference.is_some()
    }

    /// Aggregate and joined columns are produced by a derived-table join.
    pub const fn is_computed(&self) -> bool {
        matches!(self.kind, ColumnKind::Aggregate(_) | ColumnKind::Joined(_))
    }

    /// Stored on the base table itself.
    pub const fn is_stored(&self) -> bool {
        matches!(self.kind, ColumnKind::Plain) && !self.translatable
    }
}
