//! PostgreSQL.

use super::{comparison_sql, Dialect};
use crate::query::{Function, Op};
use crate::schema::{ColumnFlag, ColumnType};
use crate::store::{DefaultStore, ValueStore};

/// The PostgreSQL dialect.
///
/// Case-insensitive matching uses `ILIKE` and `~*`; structured output uses
/// the `json_*` functions; first-row-per-group uses `DISTINCT ON`; inserted
/// ids come from `LASTVAL()`.
#[derive(Debug, Clone, Default)]
pub struct PostgreSql {
    store: DefaultStore,
}

impl PostgreSql {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Dialect for PostgreSql {
    fn name(&self) -> &'static str {
        "postgresql"
    }

    fn quote(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    fn op_sql(&self, op: Op, case_sensitive: bool) -> Option<&'static str> {
        if let Some(sql) = comparison_sql(op) {
            return Some(sql);
        }
        let sql = match (op, case_sensitive) {
            (Op::Contains | Op::Startswith | Op::Endswith, false) => "ILIKE",
            (Op::Contains | Op::Startswith | Op::Endswith, true) => "LIKE",
            (Op::DoesNotContain | Op::DoesNotStartwith | Op::DoesNotEndwith, false) => "NOT ILIKE",
            (Op::DoesNotContain | Op::DoesNotStartwith | Op::DoesNotEndwith, true) => "NOT LIKE",
            (Op::Matches, false) => "~*",
            (Op::Matches, true) => "~",
            (Op::DoesNotMatch, false) => "!~*",
            (Op::DoesNotMatch, true) => "!~",
            _ => return None,
        };
        Some(sql)
    }

    fn func_sql(&self, function: Function, expr: &str) -> String {
        match function {
            Function::Lower => format!("lower({expr})"),
            Function::Upper => format!("upper({expr})"),
            Function::Abs => format!("abs({expr})"),
            Function::AsString => format!("{expr}::varchar"),
        }
    }

    fn concat_operator(&self) -> Option<&'static str> {
        Some("||")
    }

    fn type_sql(&self, column_type: ColumnType) -> Option<&'static str> {
        let sql = match column_type {
            ColumnType::Id => "BIGSERIAL",
            ColumnType::BigInt | ColumnType::Reference => "BIGINT",
            ColumnType::Integer | ColumnType::Enum => "INTEGER",
            ColumnType::Bool => "BOOLEAN",
            ColumnType::Decimal => "DECIMAL",
            ColumnType::Double => "DOUBLE PRECISION",
            ColumnType::String
            | ColumnType::Email
            | ColumnType::Password
            | ColumnType::Url
            | ColumnType::Color => "CHARACTER VARYING",
            ColumnType::Text => "TEXT",
            ColumnType::Date => "DATE",
            ColumnType::Datetime => "TIMESTAMP WITHOUT TIME ZONE",
            ColumnType::DatetimeWithTimezone => "TIMESTAMP WITH TIME ZONE",
            ColumnType::Time => "TIME",
            ColumnType::Interval => "INTERVAL",
            ColumnType::ByteArray => "BYTEA",
            ColumnType::Json => "JSONB",
            ColumnType::Uuid => "UUID",
        };
        Some(sql)
    }

    fn flag_sql(&self, flag: ColumnFlag) -> Option<&'static str> {
        match flag {
            ColumnFlag::Unique => Some("UNIQUE"),
            ColumnFlag::Required => Some("NOT NULL"),
            // BIGSERIAL already generates values.
            ColumnFlag::AutoIncrement => None,
        }
    }

    fn json_object(&self, pairs: &[(String, String)]) -> String {
        let args: Vec<String> = pairs
            .iter()
            .map(|(key, expr)| format!("{}, {expr}", self.name_literal(key)))
            .collect();
        format!("json_build_object({})", args.join(", "))
    }

    fn json_array_agg(&self, expr: &str) -> String {
        format!("COALESCE(json_agg({expr}), '[]')")
    }

    fn array_agg(&self, expr: &str) -> String {
        format!("array_agg({expr})")
    }

    fn locale_map_agg(&self, locale: &str, value: &str) -> String {
        format!("json_object_agg({locale}, {value}) FILTER (WHERE {locale} IS NOT NULL)")
    }

    fn first_value(&self, expr: &str) -> String {
        format!("(array_agg({expr}))[1]")
    }

    fn first_per_group(&self, partition: &str, order: &str, select: &str, source: &str) -> String {
        format!("SELECT DISTINCT ON ({partition}) {select} FROM {source} ORDER BY {partition}, {order}")
    }

    fn distinct_on(&self, exprs: &[String]) -> Option<String> {
        Some(format!("DISTINCT ON ({})", exprs.join(", ")))
    }

    fn inserted_id(&self, index: usize, count: usize) -> String {
        match count.saturating_sub(index + 1) {
            0 => "LASTVAL()".to_string(),
            back => format!("LASTVAL() - {back}"),
        }
    }

    fn returning(&self, fields: &[String]) -> Option<String> {
        let quoted: Vec<String> = fields.iter().map(|f| self.quote(f)).collect();
        Some(format!("RETURNING {}", quoted.join(", ")))
    }

    fn upsert(&self, conflict: &[String], updated: &[String]) -> String {
        let keys: Vec<String> = conflict.iter().map(|f| self.quote(f)).collect();
        if updated.is_empty() {
            return format!("ON CONFLICT ({}) DO NOTHING", keys.join(", "));
        }
        let sets: Vec<String> = updated
            .iter()
            .map(|f| {
                let q = self.quote(f);
                format!("{q} = EXCLUDED.{q}")
            })
            .collect();
        format!(
            "ON CONFLICT ({}) DO UPDATE SET {}",
            keys.join(", "),
            sets.join(", ")
        )
    }

    fn default_values_insert(&self, table: &str, id_field: &str, rows: usize) -> String {
        if rows <= 1 {
            return format!("INSERT INTO {table} DEFAULT VALUES");
        }
        let values = vec!["(DEFAULT)"; rows].join(", ");
        format!("INSERT INTO {table} ({}) VALUES {values}", self.quote(id_field))
    }

    fn store(&self) -> &dyn ValueStore {
        &self.store
    }
}
