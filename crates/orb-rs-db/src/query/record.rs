//! Records written by INSERT and UPDATE.

use std::collections::BTreeMap;

use crate::value::Value;

/// Column values of one row to write, keyed by logical column name.
///
/// Values of translatable columns placed in `values` are written to the
/// compile locale; `translations` holds explicit per-locale values.
///
/// # Examples
///
/// ```
/// use orb_rs_db::query::Record;
///
/// let record = Record::new()
///     .set("username", "john.doe")
///     .set("bio", "Hello")
///     .translate("fr_FR", "bio", "Bonjour");
/// assert_eq!(record.values.len(), 2);
/// assert_eq!(record.translations["fr_FR"].len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    pub values: BTreeMap<String, Value>,
    /// Locale code to column values.
    pub translations: BTreeMap<String, BTreeMap<String, Value>>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(column.into(), value.into());
        self
    }

    #[must_use]
    pub fn translate(
        mut self,
        locale: impl Into<String>,
        column: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.translations
            .entry(locale.into())
            .or_default()
            .insert(column.into(), value.into());
        self
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }
}
