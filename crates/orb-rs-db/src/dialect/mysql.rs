//! MySQL / MariaDB.

use super::{comparison_sql, Dialect};
use crate::query::{Function, Op};
use crate::schema::{ColumnFlag, ColumnType};
use crate::store::{MySqlStore, ValueStore};

/// The MySQL dialect.
///
/// Case-insensitive `LIKE` folds both sides with `lower()`; case-sensitive
/// matching uses `BINARY`. First-row-per-group ranks with `ROW_NUMBER()`,
/// and inserted ids count forward from `LAST_INSERT_ID()`.
#[derive(Debug, Clone, Default)]
pub struct MySql {
    store: MySqlStore,
}

impl MySql {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Dialect for MySql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote(&self, ident: &str) -> String {
        format!("`{}`", ident.replace('`', "``"))
    }

    fn op_sql(&self, op: Op, case_sensitive: bool) -> Option<&'static str> {
        if let Some(sql) = comparison_sql(op) {
            return Some(sql);
        }
        let sql = match (op, case_sensitive) {
            (Op::Contains | Op::Startswith | Op::Endswith, false) => "LIKE",
            (Op::Contains | Op::Startswith | Op::Endswith, true) => "LIKE BINARY",
            (Op::DoesNotContain | Op::DoesNotStartwith | Op::DoesNotEndwith, false) => "NOT LIKE",
            (Op::DoesNotContain | Op::DoesNotStartwith | Op::DoesNotEndwith, true) => {
                "NOT LIKE BINARY"
            }
            (Op::Matches, false) => "REGEXP",
            (Op::Matches, true) => "REGEXP BINARY",
            (Op::DoesNotMatch, false) => "NOT REGEXP",
            (Op::DoesNotMatch, true) => "NOT REGEXP BINARY",
            _ => return None,
        };
        Some(sql)
    }

    fn folds_case(&self, op: Op, case_sensitive: bool) -> bool {
        op.is_pattern() && !case_sensitive
    }

    fn func_sql(&self, function: Function, expr: &str) -> String {
        match function {
            Function::Lower => format!("LOWER({expr})"),
            Function::Upper => format!("UPPER({expr})"),
            Function::Abs => format!("ABS({expr})"),
            Function::AsString => format!("CAST({expr} AS CHAR)"),
        }
    }

    fn concat_operator(&self) -> Option<&'static str> {
        // `||` is logical OR unless PIPES_AS_CONCAT is set.
        None
    }

    fn type_sql(&self, column_type: ColumnType) -> Option<&'static str> {
        let sql = match column_type {
            ColumnType::Id | ColumnType::BigInt | ColumnType::Reference => "BIGINT",
            ColumnType::Integer | ColumnType::Enum => "INT",
            ColumnType::Bool => "BOOLEAN",
            ColumnType::Decimal => "DECIMAL",
            ColumnType::Double => "DOUBLE",
            ColumnType::String
            | ColumnType::Email
            | ColumnType::Password
            | ColumnType::Url
            | ColumnType::Color => "VARCHAR",
            ColumnType::Text => "LONGTEXT",
            ColumnType::Date => "DATE",
            ColumnType::Datetime => "DATETIME",
            ColumnType::DatetimeWithTimezone => "TIMESTAMP",
            ColumnType::Time => "TIME",
            ColumnType::ByteArray => "LONGBLOB",
            ColumnType::Json => "JSON",
            ColumnType::Uuid => "CHAR(36)",
            ColumnType::Interval => return None,
        };
        Some(sql)
    }

    fn flag_sql(&self, flag: ColumnFlag) -> Option<&'static str> {
        match flag {
            ColumnFlag::Unique => Some("UNIQUE"),
            ColumnFlag::Required => Some("NOT NULL"),
            ColumnFlag::AutoIncrement => Some("AUTO_INCREMENT"),
        }
    }

    fn json_object(&self, pairs: &[(String, String)]) -> String {
        let args: Vec<String> = pairs
            .iter()
            .map(|(key, expr)| format!("{}, {expr}", self.name_literal(key)))
            .collect();
        format!("JSON_OBJECT({})", args.join(", "))
    }

    fn json_array_agg(&self, expr: &str) -> String {
        format!("COALESCE(JSON_ARRAYAGG({expr}), JSON_ARRAY())")
    }

    fn array_agg(&self, expr: &str) -> String {
        format!("JSON_ARRAYAGG({expr})")
    }

    fn locale_map_agg(&self, locale: &str, value: &str) -> String {
        format!("IF(COUNT({locale}) = 0, NULL, JSON_OBJECTAGG(COALESCE({locale}, ''), {value}))")
    }

    fn first_value(&self, expr: &str) -> String {
        format!("ANY_VALUE({expr})")
    }

    fn first_per_group(&self, partition: &str, order: &str, select: &str, source: &str) -> String {
        format!(
            "SELECT {r}, {v} FROM (SELECT {select}, ROW_NUMBER() OVER (PARTITION BY {partition} ORDER BY {order}) AS {rank} FROM {source}) AS {ranked} WHERE {rank} = 1",
            r = self.quote("ref"),
            v = self.quote("value"),
            rank = self.quote("rank"),
            ranked = self.quote("ranked"),
        )
    }

    fn limit_clause(&self, start: Option<usize>, limit: Option<usize>) -> Option<String> {
        match (start, limit) {
            (None, None) => None,
            (None, Some(l)) => Some(format!("LIMIT {l}")),
            (Some(s), Some(l)) => Some(format!("LIMIT {l} OFFSET {s}")),
            // MySQL has no bare OFFSET.
            (Some(s), None) => Some(format!("LIMIT {} OFFSET {s}", u64::MAX)),
        }
    }

    fn inserted_id(&self, index: usize, _count: usize) -> String {
        match index {
            0 => "LAST_INSERT_ID()".to_string(),
            i => format!("LAST_INSERT_ID() + {i}"),
        }
    }

    fn returning(&self, _fields: &[String]) -> Option<String> {
        None
    }

    fn upsert(&self, conflict: &[String], updated: &[String]) -> String {
        let sets: Vec<String> = if updated.is_empty() {
            conflict
                .iter()
                .take(1)
                .map(|f| {
                    let q = self.quote(f);
                    format!("{q} = {q}")
                })
                .collect()
        } else {
            updated
                .iter()
                .map(|f| {
                    let q = self.quote(f);
                    format!("{q} = VALUES({q})")
                })
                .collect()
        };
        format!("ON DUPLICATE KEY UPDATE {}", sets.join(", "))
    }

    fn default_values_insert(&self, table: &str, _id_field: &str, rows: usize) -> String {
        let values = vec!["()"; rows.max(1)].join(", ");
        format!("INSERT INTO {table} () VALUES {values}")
    }

    fn store(&self) -> &dyn ValueStore {
        &self.store
    }
}
