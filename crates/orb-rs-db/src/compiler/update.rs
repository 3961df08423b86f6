//! UPDATE compilation: one statement per record, restricted by its primary
//! key, plus one translation upsert per written locale.

use orb_rs_core::{OrbError, OrbResult};

use super::context::CompileContext;
use super::insert::{split_record, SplitRecord};
use super::statement::CompiledStatement;
use crate::query::Record;
use crate::schema::{Column, Schema};
use crate::value::Value;

pub(crate) fn compile_update(
    ctx: &mut CompileContext<'_>,
    schema: &Schema,
    records: &[Record],
) -> OrbResult<Vec<CompiledStatement>> {
    let keys = schema.primary_columns();
    if keys.is_empty() {
        return Err(OrbError::ReadOnly(schema.name.clone()));
    }
    let locale = ctx.write_locale();

    let mut statements = Vec::new();
    for record in records {
        let split = split_record(schema, record, &locale)?;
        let key_values = keys
            .iter()
            .map(|column| {
                split
                    .values
                    .get(&column.name)
                    .map(|value| (*column, *value))
                    .ok_or_else(|| OrbError::ValueNotFound {
                        schema: schema.name.clone(),
                        column: column.name.clone(),
                    })
            })
            .collect::<OrbResult<Vec<_>>>()?;

        if let Some(statement) = update_row(ctx, schema, &split, &key_values)? {
            statements.push(statement);
        }
        statements.extend(upsert_translations(ctx, schema, &split)?);
    }
    Ok(statements)
}

fn update_row(
    ctx: &mut CompileContext<'_>,
    schema: &Schema,
    split: &SplitRecord<'_>,
    keys: &[(&Column, &Value)],
) -> OrbResult<Option<CompiledStatement>> {
    let mut sets = Vec::new();
    for column in schema.columns() {
        if column.primary || !column.is_stored() {
            continue;
        }
        if let Some(value) = split.values.get(&column.name) {
            let key = ctx.bind(Some(column), value)?;
            sets.push(format!("{} = {key}", ctx.quote(&column.field)));
        }
    }
    if sets.is_empty() {
        return Ok(None);
    }

    let mut fields = Vec::with_capacity(keys.len());
    let mut bound = Vec::with_capacity(keys.len());
    for (column, value) in keys {
        fields.push(ctx.quote(&column.field));
        bound.push(ctx.bind(Some(*column), value)?);
    }
    let restriction = match (fields.as_slice(), bound.as_slice()) {
        ([field], [key]) => format!("{field} = {key}"),
        _ => format!("({}) = ({})", fields.join(", "), bound.join(", ")),
    };

    let sql = format!(
        "UPDATE {} SET {} WHERE {restriction}",
        ctx.table_ref(schema),
        sets.join(", ")
    );
    Ok(Some(CompiledStatement::new(sql, ctx.take_params())))
}

/// Writes each locale's translated values, inserting the translation row
/// when it does not exist yet.
fn upsert_translations(
    ctx: &mut CompileContext<'_>,
    schema: &Schema,
    split: &SplitRecord<'_>,
) -> OrbResult<Vec<CompiledStatement>> {
    if split.translations.is_empty() {
        return Ok(Vec::new());
    }
    let pk = schema.id_column()?;
    let owner_value = split.values.get(&pk.name).ok_or_else(|| OrbError::ValueNotFound {
        schema: schema.name.clone(),
        column: pk.name.clone(),
    })?;
    let owner_field = schema.i18n_owner_field();
    let conflict = vec![owner_field.clone(), "locale".to_string()];

    let mut statements = Vec::new();
    for (locale, values) in &split.translations {
        let columns: Vec<&Column> = schema
            .translatable_columns()
            .into_iter()
            .filter(|c| values.contains_key(&c.name))
            .collect();

        let mut fields = vec![ctx.quote(&owner_field), ctx.quote("locale")];
        let mut row = vec![
            ctx.bind(Some(pk), owner_value)?,
            ctx.bind(None, &Value::from(locale.as_str()))?,
        ];
        let mut updated = Vec::with_capacity(columns.len());
        for column in columns {
            fields.push(ctx.quote(&column.field));
            row.push(ctx.bind(Some(column), values[&column.name])?);
            updated.push(column.field.clone());
        }

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) {}",
            ctx.i18n_table_ref(schema),
            fields.join(", "),
            row.join(", "),
            ctx.dialect().upsert(&conflict, &updated)
        );
        statements.push(CompiledStatement::new(sql, ctx.take_params()));
    }
    Ok(statements)
}
