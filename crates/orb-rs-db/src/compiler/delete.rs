//! DELETE compilation.

use orb_rs_core::OrbResult;

use super::context::{CompileContext, Scope};
use super::predicate;
use super::select::filter_subselect;
use super::statement::CompiledStatement;
use crate::query::QueryNode;
use crate::schema::Schema;

/// Compiles `DELETE FROM table [WHERE ...]`, or `None` when the filter
/// cannot match any row.
///
/// Filters that need joins are rewritten as a primary-key sub-select. The
/// sub-select is wrapped once more in a derived table so that engines which
/// refuse to read the table being deleted from still accept it.
pub(crate) fn compile_delete<'a>(
    ctx: &mut CompileContext<'a>,
    schema: &'a Schema,
    filter: Option<&QueryNode>,
) -> OrbResult<Option<CompiledStatement>> {
    let mut sql = format!("DELETE FROM {}", ctx.table_ref(schema));
    let Some(node) = filter else {
        return Ok(Some(CompiledStatement::new(sql, ctx.take_params())));
    };

    let mut scope = Scope::new(schema, schema.table_name());
    let condition = match predicate::compile_node(ctx, &mut scope, node) {
        Ok(condition) => condition,
        Err(err) if err.is_empty_query() => {
            tracing::debug!(table = %schema.name, "filter cannot match; delete suppressed");
            return Ok(None);
        }
        Err(err) => return Err(err),
    };

    if condition.is_empty() {
        // nothing to restrict
    } else if scope.planned.is_empty() && scope.joins.is_empty() {
        sql.push_str(&format!(" WHERE {condition}"));
    } else {
        sql.push_str(&format!(" WHERE {}", key_restriction(ctx, &scope, &condition)));
    }
    Ok(Some(CompiledStatement::new(sql, ctx.take_params())))
}

fn key_restriction(ctx: &CompileContext<'_>, scope: &Scope<'_>, condition: &str) -> String {
    let ids = ctx.quote("ids");
    let fields: Vec<&str> = scope
        .schema
        .primary_columns()
        .iter()
        .map(|c| c.field.as_str())
        .collect();
    let outer: Vec<String> = fields.iter().map(|f| ctx.column_ref(&scope.alias, f)).collect();
    let inner: Vec<String> = fields.iter().map(|f| format!("{ids}.{}", ctx.quote(f))).collect();
    let lhs = match outer.as_slice() {
        [single] => single.clone(),
        _ => format!("({})", outer.join(", ")),
    };
    format!(
        "{lhs} IN (SELECT {} FROM ({}) AS {ids})",
        inner.join(", "),
        filter_subselect(ctx, scope, condition)
    )
}
