//! SELECT assembly.
//!
//! Orchestrates column planning, expansion, filtering, and ordering into
//! one [`SelectBuilder`]. Also home to the shared sub-select forms: the
//! record-set sub-select used by predicates and the primary-key wrap that
//! keeps traversal joins out of the outer FROM.

use orb_rs_core::{OrbError, OrbResult};

use super::builder::SelectBuilder;
use super::context::{CompileContext, Scope};
use super::statement::CompiledStatement;
use super::{columns, expand, predicate};
use crate::query::{Distinct, ExpandTree, Lookup, QueryNode, RecordSet};
use crate::schema::Schema;

/// Plans a complete SELECT of `schema`, returning the builder and its
/// output column names.
pub(crate) fn build_select<'a>(
    ctx: &mut CompileContext<'a>,
    schema: &'a Schema,
    lookup: &Lookup,
) -> OrbResult<(SelectBuilder, Vec<String>)> {
    let mut scope = Scope::new(schema, schema.table_name());

    let mut outputs = columns::plan_columns(ctx, &mut scope, lookup)?;
    outputs.extend(expand::plan_expansions(
        ctx,
        schema,
        &scope.alias,
        &lookup.expand,
    )?);

    let mut filter = match &lookup.filter {
        Some(node) => predicate::compile_node(ctx, &mut scope, node)?,
        None => String::new(),
    };

    let order = lookup
        .order
        .as_deref()
        .unwrap_or_else(|| schema.default_order());
    let mut order_exprs = Vec::with_capacity(order.len());
    let mut order_by = Vec::with_capacity(order.len());
    for term in order {
        let column = schema.require_column(&term.column)?;
        if column.is_proxy() {
            return Err(OrbError::QueryInvalid(format!(
                "cannot order by proxy column '{}'",
                column.name
            )));
        }
        let expr = columns::column_expr(ctx, &mut scope, column)?;
        order_by.push(format!("{expr} {}", term.direction()));
        order_exprs.push(expr);
    }

    let distinct_on = match &lookup.distinct {
        Some(Distinct::On(names)) if !names.is_empty() => {
            Some(distinct_on_clause(ctx, &mut scope, names)?)
        }
        _ => None,
    };

    if !scope.joins.is_empty() && !filter.is_empty() {
        filter = wrap_filter(ctx, &scope, &filter);
    }

    let mut select = SelectBuilder::new(ctx.from_clause(schema, &scope.alias));
    let mut names = Vec::with_capacity(outputs.len());
    for (expr, name) in outputs {
        select.column(expr, Some(name.clone()));
        names.push(name);
    }
    // DISTINCT requires every ORDER BY expression in the select list.
    if lookup.distinct.is_some() {
        for expr in order_exprs {
            if !select.columns.iter().any(|(selected, _)| *selected == expr) {
                select.column(expr, None);
            }
        }
    }
    select.filter(filter);
    select.group_by = scope.group_by(ctx);
    select.joins = scope.planned;
    select.order_by = order_by;
    select.distinct = lookup.distinct.is_some();
    select.distinct_on = distinct_on;
    select.start = lookup.start;
    select.limit = lookup.limit;
    Ok((select, names))
}

/// `DISTINCT ON (...)` over the named columns, read the way the select
/// list reads them.
fn distinct_on_clause<'a>(
    ctx: &mut CompileContext<'a>,
    scope: &mut Scope<'a>,
    names: &[String],
) -> OrbResult<String> {
    let schema = scope.schema;
    let mut exprs = Vec::with_capacity(names.len());
    for name in names {
        let column = schema.require_column(name)?;
        exprs.push(columns::column_expr(ctx, scope, column)?);
    }
    let dialect = ctx.dialect();
    dialect.distinct_on(&exprs).ok_or_else(|| {
        OrbError::InvalidOperator(format!("DISTINCT ON is not supported by {}", dialect.name()))
    })
}

/// `pk IN (SELECT pk FROM base <joins> WHERE filter)`.
pub(crate) fn wrap_filter(ctx: &CompileContext<'_>, scope: &Scope<'_>, filter: &str) -> String {
    let keys = scope.primary_refs(ctx);
    let lhs = match keys.as_slice() {
        [single] => single.clone(),
        _ => format!("({})", keys.join(", ")),
    };
    format!("{lhs} IN ({})", filter_subselect(ctx, scope, filter))
}

/// The primary keys of the rows of `scope` matching `filter`, with every
/// join the filter may reference.
pub(crate) fn filter_subselect(ctx: &CompileContext<'_>, scope: &Scope<'_>, filter: &str) -> String {
    let mut select = SelectBuilder::new(ctx.from_clause(scope.schema, &scope.alias));
    for key in scope.primary_refs(ctx) {
        select.column(key, None);
    }
    select.joins = scope.planned.iter().chain(&scope.joins).cloned().collect();
    select.filter(filter.to_string());
    select.render(ctx.dialect())
}

/// Compiles a SELECT, or `None` when the filter cannot match any row.
pub(crate) fn compile_select<'a>(
    ctx: &mut CompileContext<'a>,
    schema: &'a Schema,
    lookup: &Lookup,
) -> OrbResult<Option<CompiledStatement>> {
    if let Some(locale) = &lookup.locale {
        ctx.set_locale(locale.clone());
    }
    match build_select(ctx, schema, lookup) {
        Ok((select, names)) => {
            let sql = select.render(ctx.dialect());
            Ok(Some(
                CompiledStatement::new(sql, ctx.take_params()).with_columns(names),
            ))
        }
        Err(err) if err.is_empty_query() => {
            tracing::debug!(table = %schema.name, "filter cannot match; statement suppressed");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

/// Compiles `SELECT COUNT(*)` over the rows a lookup selects.
pub(crate) fn compile_count<'a>(
    ctx: &mut CompileContext<'a>,
    schema: &'a Schema,
    lookup: &Lookup,
) -> OrbResult<Option<CompiledStatement>> {
    let mut lookup = lookup.clone();
    if lookup.columns.is_empty() {
        lookup.columns = schema
            .primary_columns()
            .iter()
            .map(|c| c.name.clone())
            .collect();
    }
    lookup.expand = ExpandTree::new();
    if lookup.start.is_none() && lookup.limit.is_none() {
        lookup.order = Some(Vec::new());
    }

    let Some(inner) = compile_select(ctx, schema, &lookup)? else {
        return Ok(None);
    };
    let sql = format!(
        "SELECT COUNT(*) AS {} FROM ({}) AS {}",
        ctx.quote("count"),
        inner.sql,
        ctx.quote("records")
    );
    Ok(Some(
        CompiledStatement::new(sql, inner.params).with_columns(vec!["count".to_string()]),
    ))
}

/// The sub-select of an unloaded record set: its primary keys under its own
/// lookup. Ordering is kept only when it selects a page.
///
/// A paged set is read through a derived table: MySQL rejects `LIMIT`
/// directly inside `IN (...)`.
pub(crate) fn record_subselect(ctx: &mut CompileContext<'_>, records: &RecordSet) -> OrbResult<String> {
    let schema = ctx.registry().get(&records.table)?;
    let pk = schema.id_column()?;
    let mut lookup = records.lookup.clone();
    lookup.columns = vec![pk.name.clone()];
    lookup.expand = ExpandTree::new();
    let paged = lookup.start.is_some() || lookup.limit.is_some();
    if !paged {
        lookup.order = Some(Vec::new());
    }

    let (mut select, _) = build_select(ctx, schema, &lookup)?;
    if paged {
        return Ok(format!(
            "SELECT {} FROM ({}) AS {}",
            ctx.column_ref("ids", &pk.name),
            select.render(ctx.dialect()),
            ctx.quote("ids")
        ));
    }
    for (_, alias) in &mut select.columns {
        *alias = None;
    }
    Ok(select.render(ctx.dialect()))
}

/// Compiles a standalone filter fragment against `schema`, wrapping it in a
/// primary-key sub-select when it needs joins. `None` when nothing can match.
pub(crate) fn compile_where<'a>(
    ctx: &mut CompileContext<'a>,
    schema: &'a Schema,
    node: &QueryNode,
) -> OrbResult<Option<CompiledStatement>> {
    let mut scope = Scope::new(schema, schema.table_name());
    let filter = match predicate::compile_node(ctx, &mut scope, node) {
        Ok(filter) => filter,
        Err(err) if err.is_empty_query() => return Ok(None),
        Err(err) => return Err(err),
    };
    let sql = if filter.is_empty() || (scope.planned.is_empty() && scope.joins.is_empty()) {
        filter
    } else {
        wrap_filter(ctx, &scope, &filter)
    };
    Ok(Some(CompiledStatement::new(sql, ctx.take_params())))
}
