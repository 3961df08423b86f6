//! INSERT compilation.
//!
//! One multi-row INSERT for the stored columns, followed, when any record
//! carries translations, by one multi-row INSERT into the translation table
//! keyed by the ids the first statement generated.

use std::collections::BTreeMap;

use orb_rs_core::{OrbError, OrbResult};

use super::context::CompileContext;
use super::statement::CompiledStatement;
use crate::query::Record;
use crate::schema::{Column, Schema};
use crate::value::Value;

/// A record's values split into stored and per-locale translated values,
/// keyed by logical column name.
#[derive(Debug, Default)]
pub(crate) struct SplitRecord<'r> {
    pub values: BTreeMap<String, &'r Value>,
    pub translations: BTreeMap<String, BTreeMap<String, &'r Value>>,
}

impl SplitRecord<'_> {
    /// Whether a locale has at least one non-null translated value.
    pub fn has_translation(&self, locale: &str) -> bool {
        self.translations
            .get(locale)
            .is_some_and(|values| values.values().any(|v| !v.is_null()))
    }
}

/// Normalizes a record against `schema`, routing translatable values in
/// `record.values` to `write_locale`.
pub(crate) fn split_record<'r>(
    schema: &Schema,
    record: &'r Record,
    write_locale: &str,
) -> OrbResult<SplitRecord<'r>> {
    let mut split = SplitRecord::default();

    for (key, value) in &record.values {
        let column = writable(schema, key)?;
        if column.translatable {
            split
                .translations
                .entry(write_locale.to_string())
                .or_default()
                .insert(column.name.clone(), value);
        } else {
            split.values.insert(column.name.clone(), value);
        }
    }

    for (locale, values) in &record.translations {
        for (key, value) in values {
            let column = writable(schema, key)?;
            if !column.translatable {
                return Err(OrbError::QueryInvalid(format!(
                    "column '{}' is not translatable",
                    column.name
                )));
            }
            split
                .translations
                .entry(locale.clone())
                .or_default()
                .insert(column.name.clone(), value);
        }
    }
    Ok(split)
}

fn writable<'s>(schema: &'s Schema, name: &str) -> OrbResult<&'s Column> {
    let column = schema.require_column(name)?;
    if column.is_computed() || column.is_proxy() {
        return Err(OrbError::QueryInvalid(format!(
            "column '{}' is computed and cannot be written",
            column.name
        )));
    }
    Ok(column)
}

pub(crate) fn compile_insert(
    ctx: &mut CompileContext<'_>,
    schema: &Schema,
    records: &[Record],
) -> OrbResult<Vec<CompiledStatement>> {
    if records.is_empty() {
        return Ok(Vec::new());
    }
    let pk = schema.id_column()?;
    let locale = ctx.write_locale();
    let splits = records
        .iter()
        .map(|record| split_record(schema, record, &locale))
        .collect::<OrbResult<Vec<_>>>()?;

    let mut statements = vec![insert_rows(ctx, schema, &splits)?];
    if let Some(statement) = insert_translations(ctx, schema, pk, &splits)? {
        statements.push(statement);
    }
    Ok(statements)
}

fn insert_rows(
    ctx: &mut CompileContext<'_>,
    schema: &Schema,
    splits: &[SplitRecord<'_>],
) -> OrbResult<CompiledStatement> {
    let table = ctx.table_ref(schema);
    let dialect = ctx.dialect();
    let columns: Vec<&Column> = schema
        .columns()
        .iter()
        .filter(|c| c.is_stored() && splits.iter().any(|s| s.values.contains_key(&c.name)))
        .collect();

    let mut sql = if columns.is_empty() {
        let pk = schema.id_column()?;
        dialect.default_values_insert(&table, &pk.field, splits.len())
    } else {
        let mut rows = Vec::with_capacity(splits.len());
        for split in splits {
            let mut keys = Vec::with_capacity(columns.len());
            for column in &columns {
                let value = split.values.get(&column.name).ok_or_else(|| OrbError::ValueNotFound {
                    schema: schema.name.clone(),
                    column: column.name.clone(),
                })?;
                keys.push(ctx.bind(Some(*column), value)?);
            }
            rows.push(format!("({})", keys.join(", ")));
        }
        let fields: Vec<String> = columns.iter().map(|c| ctx.quote(&c.field)).collect();
        format!(
            "INSERT INTO {table} ({}) VALUES {}",
            fields.join(", "),
            rows.join(", ")
        )
    };

    let returned: Vec<String> = schema
        .primary_columns()
        .iter()
        .map(|c| c.field.clone())
        .collect();
    if let Some(returning) = dialect.returning(&returned) {
        sql.push(' ');
        sql.push_str(&returning);
    }
    Ok(CompiledStatement::new(sql, ctx.take_params()))
}

fn insert_translations(
    ctx: &mut CompileContext<'_>,
    schema: &Schema,
    pk: &Column,
    splits: &[SplitRecord<'_>],
) -> OrbResult<Option<CompiledStatement>> {
    let columns: Vec<&Column> = schema
        .translatable_columns()
        .into_iter()
        .filter(|c| {
            splits
                .iter()
                .any(|s| s.translations.values().any(|t| t.contains_key(&c.name)))
        })
        .collect();
    if columns.is_empty() {
        return Ok(None);
    }

    let dialect = ctx.dialect();
    let mut rows = Vec::new();
    for (index, split) in splits.iter().enumerate() {
        let locales: Vec<&String> = split
            .translations
            .keys()
            .filter(|locale| split.has_translation(locale))
            .collect();
        if locales.is_empty() {
            continue;
        }

        let owner = match split.values.get(&pk.name) {
            Some(id) => ctx.bind(Some(pk), id)?,
            None => dialect.inserted_id(index, splits.len()),
        };
        for locale in locales {
            let values = &split.translations[locale];
            let mut row = vec![owner.clone(), ctx.bind(None, &Value::from(locale.as_str()))?];
            for column in &columns {
                let value = values.get(&column.name).map_or(Value::Null, |v| (*v).clone());
                row.push(ctx.bind(Some(*column), &value)?);
            }
            rows.push(format!("({})", row.join(", ")));
        }
    }
    if rows.is_empty() {
        return Ok(None);
    }

    let mut fields = vec![ctx.quote(&schema.i18n_owner_field()), ctx.quote("locale")];
    fields.extend(columns.iter().map(|c| ctx.quote(&c.field)));
    let sql = format!(
        "INSERT INTO {} ({}) VALUES {}",
        ctx.i18n_table_ref(schema),
        fields.join(", "),
        rows.join(", ")
    );
    Ok(Some(CompiledStatement::new(sql, ctx.take_params())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::context::CompileOptions;
    use crate::compiler::fixtures;
    use crate::dialect::{MySql, PostgreSql};
    use crate::schema::{ColumnType, SchemaRegistry};

    fn insert_user(dialect: &dyn crate::dialect::Dialect, records: &[Record]) -> OrbResult<Vec<CompiledStatement>> {
        let reg = fixtures::registry();
        let options = CompileOptions::default();
        let mut ctx = CompileContext::new(&reg, dialect, &options);
        compile_insert(&mut ctx, reg.get("User")?, records)
    }

    // ── Base rows ───────────────────────────────────────────────────

    #[test]
    fn test_insert_multi_row() {
        let records = [
            Record::new().set("username", "a").set("age", 30),
            Record::new().set("username", "b").set("age", 31),
        ];
        let out = insert_user(&PostgreSql::new(), &records).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(
            out[0].sql,
            "INSERT INTO \"user\" (\"username\", \"age\") VALUES (%(key0)s, %(key1)s), \
             (%(key2)s, %(key3)s) RETURNING \"id\""
        );
        assert_eq!(out[0].params.get("key2"), Some(&Value::from("b")));
    }

    #[test]
    fn test_insert_reference_uses_field_name() {
        let records = [Record::new().set("username", "a").set("role", 3)];
        let out = insert_user(&MySql::new(), &records).unwrap();
        assert_eq!(
            out[0].sql,
            "INSERT INTO `user` (`username`, `role_id`) VALUES (%(key0)s, %(key1)s)"
        );
    }

    #[test]
    fn test_insert_missing_value() {
        let records = [
            Record::new().set("username", "a").set("age", 30),
            Record::new().set("username", "b"),
        ];
        assert!(matches!(
            insert_user(&PostgreSql::new(), &records),
            Err(OrbError::ValueNotFound { .. })
        ));
    }

    #[test]
    fn test_insert_rejects_unknown_and_computed() {
        assert!(matches!(
            insert_user(&PostgreSql::new(), &[Record::new().set("nickname", "x")]),
            Err(OrbError::ColumnNotFound { .. })
        ));
        assert!(matches!(
            insert_user(&PostgreSql::new(), &[Record::new().set("orderCount", 1)]),
            Err(OrbError::QueryInvalid(_))
        ));
        assert!(matches!(
            insert_user(
                &PostgreSql::new(),
                &[Record::new().translate("fr_FR", "username", "x")]
            ),
            Err(OrbError::QueryInvalid(_))
        ));
    }

    #[test]
    fn test_insert_default_values() {
        let reg = SchemaRegistry::new().with(Schema::new("Tick").column(Column::id()));
        let pg = PostgreSql::new();
        let options = CompileOptions::default();
        let mut ctx = CompileContext::new(&reg, &pg, &options);
        let out = compile_insert(
            &mut ctx,
            reg.get("Tick").unwrap(),
            &[Record::new(), Record::new()],
        )
        .unwrap();
        assert_eq!(
            out[0].sql,
            "INSERT INTO \"tick\" (\"id\") VALUES (DEFAULT), (DEFAULT) RETURNING \"id\""
        );
    }

    // ── Translations ────────────────────────────────────────────────

    #[test]
    fn test_insert_translation_rows_only_for_translated_records() {
        let records = [
            Record::new().set("username", "a").translate("en", "bio", "Hi"),
            Record::new().set("username", "b"),
        ];
        let out = insert_user(&PostgreSql::new(), &records).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(
            out[1].sql,
            "INSERT INTO \"user_i18n\" (\"user_id\", \"locale\", \"bio\") \
             VALUES (LASTVAL() - 1, %(key2)s, %(key3)s)"
        );
        assert_eq!(out[1].params.len(), 2);
        assert_eq!(out[1].params.get("key2"), Some(&Value::from("en")));
    }

    #[test]
    fn test_insert_translation_in_write_locale() {
        let records = [Record::new().set("username", "a").set("bio", "Hello")];
        let out = insert_user(&MySql::new(), &records).unwrap();
        assert_eq!(
            out[1].sql,
            "INSERT INTO `user_i18n` (`user_id`, `locale`, `bio`) \
             VALUES (LAST_INSERT_ID(), %(key1)s, %(key2)s)"
        );
        assert_eq!(out[1].params.get("key1"), Some(&Value::from("en_US")));
    }

    #[test]
    fn test_null_translations_skipped() {
        let records = [Record::new()
            .set("username", "a")
            .translate("fr_FR", "bio", Value::Null)];
        let out = insert_user(&PostgreSql::new(), &records).unwrap();
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_explicit_id_owns_translations() {
        let records = [Record::new()
            .set("id", 9)
            .set("username", "a")
            .translate("de", "bio", "Hallo")];
        let out = insert_user(&PostgreSql::new(), &records).unwrap();
        assert_eq!(
            out[1].sql,
            "INSERT INTO \"user_i18n\" (\"user_id\", \"locale\", \"bio\") \
             VALUES (%(key2)s, %(key3)s, %(key4)s)"
        );
        assert_eq!(out[1].params.get("key2"), Some(&Value::Int(9)));
    }

    #[test]
    fn test_mixed_explicit_and_generated_ids_rejected() {
        let records = [
            Record::new().set("id", 9).set("username", "a").translate("de", "bio", "Hallo"),
            Record::new().set("username", "b").translate("de", "bio", "Hi"),
        ];
        assert!(matches!(
            insert_user(&PostgreSql::new(), &records),
            Err(OrbError::ValueNotFound { ref column, .. }) if column == "id"
        ));
    }

    #[test]
    fn test_read_only_schema() {
        let reg = SchemaRegistry::new().with(
            Schema::new("Report").column(Column::new("total", ColumnType::Integer)),
        );
        let pg = PostgreSql::new();
        let options = CompileOptions::default();
        let mut ctx = CompileContext::new(&reg, &pg, &options);
        assert!(matches!(
            compile_insert(&mut ctx, reg.get("Report").unwrap(), &[Record::new().set("total", 1)]),
            Err(OrbError::ReadOnly(_))
        ));
    }
}
