//! SQL dialects.
//!
//! A [`Dialect`] answers every vendor-specific question the compiler has:
//! identifier quoting, operator/function/math/type/flag lookups, structured
//! output helpers, pagination, and the mechanics of inserts and upserts. The
//! compiler itself never branches on the vendor.
//!
//! - [`postgresql`] - [`PostgreSql`]
//! - [`mysql`] - [`MySql`]

pub mod mysql;
pub mod postgresql;

use std::fmt;

use orb_rs_core::{OrbError, OrbResult};

pub use mysql::MySql;
pub use postgresql::PostgreSql;

use crate::query::{Function, Math, Op};
use crate::schema::{ColumnFlag, ColumnType};
use crate::store::ValueStore;

/// The capability interface a SQL vendor implements.
pub trait Dialect: fmt::Debug + Send + Sync {
    /// The canonical dialect name.
    fn name(&self) -> &'static str;

    /// Quotes one identifier.
    fn quote(&self, ident: &str) -> String;

    /// A possibly namespaced table reference.
    fn table_ref(&self, namespace: Option<&str>, table: &str) -> String {
        match namespace {
            Some(ns) => format!("{}.{}", self.quote(ns), self.quote(table)),
            None => self.quote(table),
        }
    }

    /// `"alias"."field"`.
    fn column_ref(&self, alias: &str, field: &str) -> String {
        format!("{}.{}", self.quote(alias), self.quote(field))
    }

    /// The named placeholder for a parameter key.
    fn placeholder(&self, key: &str) -> String {
        format!("%({key})s")
    }

    /// A string literal. Only used for schema-defined names (JSON object
    /// keys), never for caller values.
    fn name_literal(&self, text: &str) -> String {
        format!("'{}'", text.replace('\'', "''"))
    }

    /// The operator text, `None` when the dialect has no mapping.
    fn op_sql(&self, op: Op, case_sensitive: bool) -> Option<&'static str>;

    /// Whether a case-insensitive comparison is emulated by lower-casing both
    /// the field expression and the bound value.
    fn folds_case(&self, _op: Op, _case_sensitive: bool) -> bool {
        false
    }

    fn func_sql(&self, function: Function, expr: &str) -> String;

    /// The string concatenation operator, if `+` on strings is supported.
    fn concat_operator(&self) -> Option<&'static str>;

    /// The math operator for a column type, `None` when unsupported.
    fn math_sql(&self, math: Math, column_type: ColumnType) -> Option<&'static str> {
        if column_type.is_string() {
            return match math {
                Math::Add => self.concat_operator(),
                _ => None,
            };
        }
        match math {
            Math::Add => Some("+"),
            Math::Subtract => Some("-"),
            Math::Multiply => Some("*"),
            Math::Divide => Some("/"),
            Math::And if column_type.is_integral() => Some("&"),
            Math::Or if column_type.is_integral() => Some("|"),
            Math::And | Math::Or => None,
        }
    }

    /// The column type name, `None` when unsupported.
    fn type_sql(&self, column_type: ColumnType) -> Option<&'static str>;

    /// The DDL fragment for a flag, `None` when the flag needs no clause.
    fn flag_sql(&self, flag: ColumnFlag) -> Option<&'static str>;

    /// The default length of character types.
    fn default_length(&self, column_type: ColumnType) -> Option<usize> {
        match column_type {
            ColumnType::Color => Some(25),
            ColumnType::String | ColumnType::Email | ColumnType::Password => Some(256),
            ColumnType::Url => Some(500),
            _ => None,
        }
    }

    // ── Structured output ───────────────────────────────────────────

    /// A JSON object from `(key, expression)` pairs.
    fn json_object(&self, pairs: &[(String, String)]) -> String;

    /// Aggregates rows into a JSON array, empty (not NULL) without rows.
    fn json_array_agg(&self, expr: &str) -> String;

    /// Aggregates scalars into an array.
    fn array_agg(&self, expr: &str) -> String;

    /// Aggregates translation rows into a locale-to-value mapping.
    fn locale_map_agg(&self, locale: &str, value: &str) -> String;

    /// Picks the single value of a group that has at most one row.
    fn first_value(&self, expr: &str) -> String;

    /// A SELECT keeping only the first row per `partition` under `order`.
    /// `select` lists `ref` and `value` output columns; `source` is the FROM
    /// clause body, including joins and WHERE.
    fn first_per_group(&self, partition: &str, order: &str, select: &str, source: &str) -> String;

    /// The `DISTINCT ON (...)` select modifier, or `None` when unsupported.
    fn distinct_on(&self, _exprs: &[String]) -> Option<String> {
        None
    }

    /// `LIMIT`/`OFFSET`, or `None` when neither is requested.
    fn limit_clause(&self, start: Option<usize>, limit: Option<usize>) -> Option<String> {
        match (start, limit) {
            (None, None) => None,
            (None, Some(l)) => Some(format!("LIMIT {l}")),
            (Some(s), Some(l)) => Some(format!("LIMIT {l} OFFSET {s}")),
            (Some(s), None) => Some(format!("OFFSET {s}")),
        }
    }

    // ── Mutations ───────────────────────────────────────────────────

    /// The id of row `index` of the `count` rows inserted by the preceding
    /// multi-row INSERT, on the same connection.
    fn inserted_id(&self, index: usize, count: usize) -> String;

    /// A `RETURNING` clause, when supported.
    fn returning(&self, fields: &[String]) -> Option<String>;

    /// The conflict clause of a per-locale translation upsert.
    fn upsert(&self, conflict: &[String], updated: &[String]) -> String;

    /// An INSERT of `rows` rows that supplies no column values.
    fn default_values_insert(&self, table: &str, id_field: &str, rows: usize) -> String;

    /// The marshaller for this dialect's driver.
    fn store(&self) -> &dyn ValueStore;
}

/// Operators whose text is the same in every supported dialect.
pub(crate) const fn comparison_sql(op: Op) -> Option<&'static str> {
    match op {
        Op::Is => Some("="),
        Op::IsNot => Some("!="),
        Op::LessThan | Op::Before => Some("<"),
        Op::LessThanOrEqual => Some("<="),
        Op::GreaterThan | Op::After => Some(">"),
        Op::GreaterThanOrEqual => Some(">="),
        Op::Between => Some("BETWEEN"),
        Op::IsIn => Some("IN"),
        Op::IsNotIn => Some("NOT IN"),
        _ => None,
    }
}

/// Resolves a dialect by configuration name.
pub fn for_name(name: &str) -> OrbResult<Box<dyn Dialect>> {
    match name.to_lowercase().as_str() {
        "postgresql" | "postgres" | "psql" => Ok(Box::new(PostgreSql::new())),
        "mysql" | "mariadb" => Ok(Box::new(MySql::new())),
        other => Err(OrbError::ConfigurationError(format!(
            "unknown SQL dialect '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_name() {
        assert_eq!(for_name("PostgreSQL").unwrap().name(), "postgresql");
        assert_eq!(for_name("mariadb").unwrap().name(), "mysql");
        assert!(matches!(
            for_name("oracle"),
            Err(OrbError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_shared_math_rules() {
        let pg = PostgreSql::new();
        assert_eq!(pg.math_sql(Math::Add, ColumnType::String), Some("||"));
        assert_eq!(pg.math_sql(Math::Divide, ColumnType::Text), None);
        assert_eq!(pg.math_sql(Math::And, ColumnType::Integer), Some("&"));
        assert_eq!(pg.math_sql(Math::Or, ColumnType::Double), None);
        assert_eq!(pg.math_sql(Math::Multiply, ColumnType::Decimal), Some("*"));
    }

    #[test]
    fn test_default_lengths() {
        let pg = PostgreSql::new();
        assert_eq!(pg.default_length(ColumnType::Url), Some(500));
        assert_eq!(pg.default_length(ColumnType::Color), Some(25));
        assert_eq!(pg.default_length(ColumnType::Text), None);
    }

    #[test]
    fn test_limit_clause() {
        let pg = PostgreSql::new();
        assert_eq!(pg.limit_clause(None, None), None);
        assert_eq!(pg.limit_clause(Some(5), Some(10)).as_deref(), Some("LIMIT 10 OFFSET 5"));
        assert_eq!(pg.limit_clause(Some(5), None).as_deref(), Some("OFFSET 5"));
    }

    #[test]
    fn test_name_literal_escapes() {
        assert_eq!(PostgreSql::new().name_literal("o'brien"), "'o''brien'");
    }
}
