//! Value marshalling.
//!
//! Every literal is passed through the dialect's [`ValueStore`] exactly once
//! before it is bound, so the parameter map holds values the target driver
//! accepts natively.

use orb_rs_core::{OrbError, OrbResult};

use crate::schema::{Column, ColumnType};
use crate::value::Value;

/// Converts a column value into a bindable native value.
pub trait ValueStore: std::fmt::Debug + Send + Sync {
    /// Marshals `value` for `column` (`None` for values not tied to a column,
    /// such as locale codes).
    fn store(&self, column: Option<&Column>, value: &Value) -> OrbResult<Value>;
}

/// Pass-through store with column-type coercions shared by every dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultStore;

impl ValueStore for DefaultStore {
    fn store(&self, column: Option<&Column>, value: &Value) -> OrbResult<Value> {
        if let Value::List(items) = value {
            return items
                .iter()
                .map(|item| self.store(column, item))
                .collect::<OrbResult<Vec<_>>>()
                .map(Value::List);
        }
        match column.map(|c| c.column_type) {
            Some(ColumnType::Bool) => coerce_bool(value),
            Some(ColumnType::Json) => Ok(match value {
                Value::Json(_) | Value::Null => value.clone(),
                other => Value::Json(other.to_json()),
            }),
            _ => Ok(value.clone()),
        }
    }
}

fn coerce_bool(value: &Value) -> OrbResult<Value> {
    match value {
        Value::Int(i) => Ok(Value::Bool(*i != 0)),
        Value::String(s) => match s.to_lowercase().as_str() {
            "true" | "t" | "1" | "yes" => Ok(Value::Bool(true)),
            "false" | "f" | "0" | "no" => Ok(Value::Bool(false)),
            _ => Err(OrbError::SerializationError(format!(
                "cannot store '{s}' as a boolean"
            ))),
        },
        other => Ok(other.clone()),
    }
}

/// MySQL has no native boolean, UUID, JSON-parameter, or zoned timestamp
/// binding; those are converted after the shared coercions.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlStore;

impl ValueStore for MySqlStore {
    fn store(&self, column: Option<&Column>, value: &Value) -> OrbResult<Value> {
        let stored = DefaultStore.store(column, value)?;
        Ok(to_mysql(stored))
    }
}

fn to_mysql(value: Value) -> Value {
    match value {
        Value::Bool(b) => Value::Int(i64::from(b)),
        Value::Uuid(u) => Value::String(u.to_string()),
        Value::Json(j) => Value::String(j.to_string()),
        Value::DateTimeTz(dt) => Value::DateTime(dt.naive_utc()),
        Value::List(items) => Value::List(items.into_iter().map(to_mysql).collect()),
        other => other,
    }
}
