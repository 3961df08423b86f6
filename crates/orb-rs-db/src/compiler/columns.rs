//! Column planning.
//!
//! Decides how each selected column is produced: a direct field reference,
//! a derived-table join for aggregates and joiners, or the shared
//! translation join. Joins land in [`Scope::planned`]; they keep exactly one
//! row per base row, so they never require the filter to be wrapped.

use orb_rs_core::{OrbError, OrbResult};

use super::builder::SelectBuilder;
use super::context::{CompileContext, Scope};
use super::predicate;
use crate::query::{Locale, Lookup};
use crate::schema::{AggregateFunction, Aggregator, Column, ColumnKind, Joiner, Schema};
use crate::value::Value;

/// The translation join of one scope.
#[derive(Debug, Clone)]
pub(crate) struct Translations {
    pub alias: String,
    /// The default-locale join, present when another single locale is read.
    pub fallback: Option<String>,
    pub locale: Locale,
}

impl Translations {
    /// Whether the join is restricted to one locale (at most one row).
    pub fn is_single(&self) -> bool {
        !matches!(self.locale, Locale::All)
    }

    /// The output expression for a translated column.
    pub fn expr(&self, ctx: &CompileContext<'_>, column: &Column) -> String {
        let dialect = ctx.dialect();
        let value = ctx.column_ref(&self.alias, &column.field);
        match (&self.locale, &self.fallback) {
            (Locale::All, _) => {
                dialect.locale_map_agg(&ctx.column_ref(&self.alias, "locale"), &value)
            }
            (Locale::Code(_), None) => dialect.first_value(&value),
            (Locale::Code(_), Some(fallback)) => format!(
                "COALESCE({}, {})",
                dialect.first_value(&value),
                dialect.first_value(&ctx.column_ref(fallback, &column.field))
            ),
        }
    }
}

/// Joins the scope's translation table once.
pub(crate) fn join_translations(ctx: &mut CompileContext<'_>, scope: &mut Scope<'_>) -> OrbResult<()> {
    if scope.translations.is_some() {
        return Ok(());
    }

    let schema = scope.schema;
    let pk = schema.id_column()?;
    let owner = schema.i18n_owner_field();
    let base = ctx.column_ref(&scope.alias, &pk.field);
    let alias = format!("{}_i18n", scope.alias);
    let locale = ctx.locale().clone();

    let mut join = format!(
        "LEFT JOIN {} ON {} = {base}",
        ctx.i18n_from_clause(schema, &alias),
        ctx.column_ref(&alias, &owner)
    );

    let mut fallback = None;
    if let Locale::Code(code) = &locale {
        let key = ctx.bind(None, &Value::from(code.as_str()))?;
        join.push_str(&format!(" AND {} = {key}", ctx.column_ref(&alias, "locale")));
        scope.planned.push(join);

        let default_locale = ctx.default_locale();
        if code != default_locale {
            let default_alias = format!("{alias}_default");
            let key = ctx.bind(None, &Value::from(default_locale))?;
            scope.planned.push(format!(
                "LEFT JOIN {} ON {} = {base} AND {} = {key}",
                ctx.i18n_from_clause(schema, &default_alias),
                ctx.column_ref(&default_alias, &owner),
                ctx.column_ref(&default_alias, "locale")
            ));
            fallback = Some(default_alias);
        }
    } else {
        scope.planned.push(join);
    }

    tracing::trace!(table = %schema.name, alias = %alias, "translation join");
    scope.translations = Some(Translations {
        alias,
        fallback,
        locale,
    });
    scope.grouped = true;
    Ok(())
}

/// Plans the output columns of a lookup as `(expression, name)` pairs.
///
/// Plain columns come first in declaration order, computed columns last.
/// Reference columns that the lookup expands are left to the expansion
/// planner, which emits them under the same name.
pub(crate) fn plan_columns<'a>(
    ctx: &mut CompileContext<'a>,
    scope: &mut Scope<'a>,
    lookup: &Lookup,
) -> OrbResult<Vec<(String, String)>> {
    let schema = scope.schema;
    let mut columns: Vec<&'a Column> = Vec::new();

    if lookup.columns.is_empty() {
        columns.extend(schema.columns().iter().filter(|c| !c.is_proxy()));
    } else {
        for name in &lookup.columns {
            let column = schema.require_column(name)?;
            if !column.is_proxy() && !columns.iter().any(|c| c.name == column.name) {
                columns.push(column);
            }
        }
    }

    columns.retain(|c| !(c.is_reference() && lookup.expand.contains(&c.name)));
    columns.sort_by_key(|c| c.is_computed());

    columns
        .into_iter()
        .map(|column| Ok((column_expr(ctx, scope, column)?, column.name.clone())))
        .collect()
}

/// The expression that reads `column` in `scope`, planning any join it needs.
pub(crate) fn column_expr<'a>(
    ctx: &mut CompileContext<'a>,
    scope: &mut Scope<'a>,
    column: &Column,
) -> OrbResult<String> {
    match &column.kind {
        ColumnKind::Proxy => Err(OrbError::QueryInvalid(format!(
            "proxy column '{}' has no SQL representation",
            column.name
        ))),
        ColumnKind::Aggregate(_) | ColumnKind::Joined(_) => computed_field(ctx, scope, column),
        ColumnKind::Plain if column.translatable => {
            join_translations(ctx, scope)?;
            Ok(scope
                .translations
                .as_ref()
                .map(|t| t.expr(ctx, column))
                .unwrap_or_default())
        }
        ColumnKind::Plain => Ok(ctx.column_ref(&scope.alias, &column.field)),
    }
}

/// The join value of an aggregate or joined column, planning its derived
/// table the first time the column is needed in this scope.
pub(crate) fn computed_field<'a>(
    ctx: &mut CompileContext<'a>,
    scope: &mut Scope<'a>,
    column: &Column,
) -> OrbResult<String> {
    if let Some(expr) = scope.fields.get(&column.name) {
        return Ok(expr.clone());
    }

    let owner = scope.schema;
    let owner_alias = scope.alias.clone();
    let mark = ctx.params_len();
    let planned = match &column.kind {
        ColumnKind::Aggregate(aggregator) => {
            ctx.nested(|ctx| aggregate_join(ctx, owner, &owner_alias, aggregator))
        }
        ColumnKind::Joined(joiner) => ctx.nested(|ctx| joiner_join(ctx, owner, &owner_alias, joiner)),
        _ => {
            return Err(OrbError::QueryInvalid(format!(
                "column '{}' is not computed",
                column.name
            )))
        }
    };

    match planned {
        Ok((join, expr)) => {
            scope.planned.push(join);
            scope.fields.insert(column.name.clone(), expr.clone());
            if column.is_aggregate() {
                scope.grouped = true;
            }
            Ok(expr)
        }
        // Nothing can match the filter: the value is a constant.
        Err(err) if err.is_empty_query() => {
            ctx.rollback_params(mark);
            Ok(match &column.kind {
                ColumnKind::Aggregate(a) if a.function == AggregateFunction::Count => "0".to_string(),
                _ => "NULL".to_string(),
            })
        }
        Err(err) => Err(err),
    }
}

/// Compiles a computed column's own filter against its target schema.
fn target_filter<'a>(
    ctx: &mut CompileContext<'a>,
    scope: &mut Scope<'a>,
    filter: Option<&crate::query::QueryNode>,
) -> OrbResult<String> {
    match filter {
        Some(node) => predicate::compile_node(ctx, scope, node),
        None => Ok(String::new()),
    }
}

fn aggregate_join<'a>(
    ctx: &mut CompileContext<'a>,
    owner: &Schema,
    owner_alias: &str,
    aggregator: &Aggregator,
) -> OrbResult<(String, String)> {
    let target = ctx.registry().get(&aggregator.reference)?;
    let reference = target.require_column(&aggregator.reference_column)?;
    let inner = target.table_name().to_string();

    let value = match (aggregator.function, &aggregator.target_column) {
        (AggregateFunction::Count, None) => "COUNT(*)".to_string(),
        (function, Some(name)) => {
            let column = target.require_column(name)?;
            format!("{}({})", function.sql(), ctx.column_ref(&inner, &column.field))
        }
        (function, None) => {
            return Err(OrbError::QueryInvalid(format!(
                "{} over '{}' needs a target column",
                function.sql(),
                target.name
            )))
        }
    };

    let mut scope = Scope::new(target, inner.clone());
    let filter = target_filter(ctx, &mut scope, aggregator.filter.as_ref())?;

    let ref_expr = ctx.column_ref(&inner, &reference.field);
    let mut select = SelectBuilder::new(ctx.from_clause(target, &inner));
    select
        .column(ref_expr.clone(), Some("ref".into()))
        .column(value, Some("value".into()))
        .filter(filter)
        .group(ref_expr);
    select.joins = scope.planned;
    select.joins.extend(scope.joins);

    let alias = ctx.alias("join");
    let pk = owner.id_column()?;
    let join = format!(
        "LEFT JOIN ({}) AS {} ON {} = {}",
        select.render(ctx.dialect()),
        ctx.quote(&alias),
        ctx.column_ref(&alias, "ref"),
        ctx.column_ref(owner_alias, &pk.field)
    );

    let value = ctx.column_ref(&alias, "value");
    let expr = if aggregator.function == AggregateFunction::Count {
        format!("COALESCE({value}, 0)")
    } else {
        value
    };
    Ok((join, expr))
}

fn joiner_join<'a>(
    ctx: &mut CompileContext<'a>,
    owner: &Schema,
    owner_alias: &str,
    joiner: &Joiner,
) -> OrbResult<(String, String)> {
    let target = ctx.registry().get(&joiner.reference)?;
    let reference = target.require_column(&joiner.reference_column)?;
    let projected = target.require_column(&joiner.target_column)?;
    if !projected.is_stored() {
        return Err(OrbError::QueryInvalid(format!(
            "joined column must project a stored column, '{}' is not",
            projected.name
        )));
    }
    let inner = target.table_name().to_string();

    let mut scope = Scope::new(target, inner.clone());
    let filter = target_filter(ctx, &mut scope, joiner.filter.as_ref())?;

    let partition = ctx.column_ref(&inner, &reference.field);
    let select = format!(
        "{partition} AS {}, {} AS {}",
        ctx.quote("ref"),
        ctx.column_ref(&inner, &projected.field),
        ctx.quote("value")
    );
    let mut source = ctx.from_clause(target, &inner);
    for join in scope.planned.iter().chain(&scope.joins) {
        source.push(' ');
        source.push_str(join);
    }
    if !filter.is_empty() {
        source.push_str(&format!(" WHERE {filter}"));
    }
    let order = natural_order(ctx, target, &inner, false)?;
    let sub = ctx
        .dialect()
        .first_per_group(&partition, &order.join(", "), &select, &source);

    let alias = ctx.alias("join");
    let pk = owner.id_column()?;
    let join = format!(
        "LEFT JOIN ({sub}) AS {} ON {} = {}",
        ctx.quote(&alias),
        ctx.column_ref(&alias, "ref"),
        ctx.column_ref(owner_alias, &pk.field)
    );
    Ok((join, ctx.column_ref(&alias, "value")))
}

/// ORDER BY terms for a schema's natural order: its declared default order
/// over stored columns, else its primary key.
pub(crate) fn natural_order(
    ctx: &CompileContext<'_>,
    schema: &Schema,
    alias: &str,
    reversed: bool,
) -> OrbResult<Vec<String>> {
    let mut terms = Vec::new();
    for order in schema.default_order() {
        let column = schema.require_column(&order.column)?;
        if !column.is_stored() {
            continue;
        }
        let order = if reversed { order.reversed() } else { order.clone() };
        terms.push(format!(
            "{} {}",
            ctx.column_ref(alias, &column.field),
            order.direction()
        ));
    }

    if terms.is_empty() {
        let direction = if reversed { "DESC" } else { "ASC" };
        terms = schema
            .primary_columns()
            .iter()
            .map(|c| format!("{} {direction}", ctx.column_ref(alias, &c.field)))
            .collect();
    }
    Ok(terms)
}
