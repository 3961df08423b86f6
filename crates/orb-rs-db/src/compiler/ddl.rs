//! CREATE TABLE and ALTER TABLE generation.
//!
//! Column types and flag clauses come from the dialect's lookup tables.
//! Translatable columns live in the schema's translation table, keyed by
//! `(owner, locale)` and removed with their owner row.

use orb_rs_core::{OrbError, OrbResult};

use super::context::CompileContext;
use super::statement::CompiledStatement;
use crate::schema::{Column, ColumnFlag, ColumnType, Schema};

/// Length of the translation table's locale column.
const LOCALE_LENGTH: usize = 10;

/// `CREATE TABLE` for the base table, then the translation table when the
/// schema has translatable columns, then one `CREATE INDEX` per index.
pub(crate) fn compile_create_table(
    ctx: &CompileContext<'_>,
    schema: &Schema,
) -> OrbResult<Vec<CompiledStatement>> {
    let mut definitions = Vec::new();
    for column in schema.columns() {
        if column.is_stored() {
            definitions.push(column_definition(ctx, column)?);
        }
    }
    let keys: Vec<String> = schema
        .primary_columns()
        .iter()
        .map(|c| ctx.quote(&c.field))
        .collect();
    if !keys.is_empty() {
        definitions.push(format!("PRIMARY KEY ({})", keys.join(", ")));
    }

    let mut statements = vec![create_table(ctx.table_ref(schema), &definitions)];
    if schema.has_translations() {
        statements.push(create_i18n_table(ctx, schema)?);
    }
    statements.extend(create_indexes(ctx, schema)?);
    Ok(statements)
}

/// `ALTER TABLE ... ADD COLUMN` for the named columns, translatable ones
/// against the translation table.
pub(crate) fn compile_add_columns(
    ctx: &CompileContext<'_>,
    schema: &Schema,
    names: &[String],
) -> OrbResult<Vec<CompiledStatement>> {
    let mut statements = Vec::with_capacity(names.len());
    for name in names {
        let column = schema.require_column(name)?;
        if !is_physical(column) {
            return Err(OrbError::QueryInvalid(format!(
                "column '{}' of '{}' is not stored",
                column.name, schema.name
            )));
        }
        let table = if column.translatable {
            ctx.i18n_table_ref(schema)
        } else {
            ctx.table_ref(schema)
        };
        let sql = format!(
            "ALTER TABLE {table} ADD COLUMN {}",
            column_definition(ctx, column)?
        );
        statements.push(CompiledStatement::new(sql, Default::default()));
        if column.indexed && !column.primary {
            statements.push(column_index(ctx, schema, column));
        }
    }
    Ok(statements)
}

/// Plain columns, on either the base or the translation table.
const fn is_physical(column: &Column) -> bool {
    !column.is_computed() && !column.is_proxy()
}

fn create_table(table: String, definitions: &[String]) -> CompiledStatement {
    let sql = format!("CREATE TABLE IF NOT EXISTS {table} ({})", definitions.join(", "));
    CompiledStatement::new(sql, Default::default())
}

fn create_i18n_table(ctx: &CompileContext<'_>, schema: &Schema) -> OrbResult<CompiledStatement> {
    let pk = schema.id_column()?;
    let owner = ctx.quote(&schema.i18n_owner_field());
    let locale = ctx.quote("locale");

    // the owner mirrors the key type without generating values
    let owner_type = match pk.column_type {
        ColumnType::Id => ColumnType::BigInt,
        other => other,
    };
    let mut definitions = vec![
        format!("{owner} {} NOT NULL", sized_type(ctx, owner_type, pk.max_length)?),
        format!(
            "{locale} {} NOT NULL",
            sized_type(ctx, ColumnType::String, Some(LOCALE_LENGTH))?
        ),
    ];
    for column in schema.translatable_columns() {
        definitions.push(column_definition(ctx, column)?);
    }
    definitions.push(format!("PRIMARY KEY ({owner}, {locale})"));
    definitions.push(format!(
        "FOREIGN KEY ({owner}) REFERENCES {} ({}) ON DELETE CASCADE",
        ctx.table_ref(schema),
        ctx.quote(&pk.field)
    ));
    Ok(create_table(ctx.i18n_table_ref(schema), &definitions))
}

fn create_indexes(ctx: &CompileContext<'_>, schema: &Schema) -> OrbResult<Vec<CompiledStatement>> {
    let mut statements = Vec::new();
    for column in schema.columns() {
        if column.indexed && !column.primary && is_physical(column) {
            statements.push(column_index(ctx, schema, column));
        }
    }
    for index in schema.indexes() {
        let mut fields = Vec::with_capacity(index.columns.len());
        for name in &index.columns {
            let column = schema.require_column(name)?;
            if !column.is_stored() {
                return Err(OrbError::QueryInvalid(format!(
                    "index '{}' cannot cover column '{}'",
                    index.name, column.name
                )));
            }
            fields.push(ctx.quote(&column.field));
        }
        let sql = format!(
            "CREATE {}INDEX {} ON {} ({})",
            if index.unique { "UNIQUE " } else { "" },
            ctx.quote(&index.name),
            ctx.table_ref(schema),
            fields.join(", ")
        );
        statements.push(CompiledStatement::new(sql, Default::default()));
    }
    Ok(statements)
}

/// `CREATE INDEX "{table}_{field}_idx"` for a column flagged `indexed`.
fn column_index(ctx: &CompileContext<'_>, schema: &Schema, column: &Column) -> CompiledStatement {
    let (table, name) = if column.translatable {
        (ctx.i18n_table_ref(schema), schema.i18n_table_name())
    } else {
        (ctx.table_ref(schema), schema.table_name().to_string())
    };
    let sql = format!(
        "CREATE INDEX {} ON {table} ({})",
        ctx.quote(&format!("{name}_{}_idx", column.field)),
        ctx.quote(&column.field)
    );
    CompiledStatement::new(sql, Default::default())
}

fn column_definition(ctx: &CompileContext<'_>, column: &Column) -> OrbResult<String> {
    let mut definition = format!(
        "{} {}",
        ctx.quote(&column.field),
        sized_type(ctx, column.column_type, column.max_length)?
    );
    let dialect = ctx.dialect();
    let flags = [
        (column.unique && !column.primary, ColumnFlag::Unique),
        (column.required || column.primary, ColumnFlag::Required),
        (column.auto_increment, ColumnFlag::AutoIncrement),
    ];
    for (set, flag) in flags {
        if let Some(sql) = set.then(|| dialect.flag_sql(flag)).flatten() {
            definition.push(' ');
            definition.push_str(sql);
        }
    }
    Ok(definition)
}

fn sized_type(
    ctx: &CompileContext<'_>,
    column_type: ColumnType,
    max_length: Option<usize>,
) -> OrbResult<String> {
    let dialect = ctx.dialect();
    let name = dialect
        .type_sql(column_type)
        .ok_or_else(|| OrbError::UnsupportedType(format!("{} on {}", column_type.name(), dialect.name())))?;
    let length = if column_type.is_string() {
        max_length.or_else(|| dialect.default_length(column_type))
    } else {
        None
    };
    Ok(match length {
        Some(length) => format!("{name}({length})"),
        None => name.to_string(),
    })
}
