//! Eager-load expansion.
//!
//! Every requested relationship becomes one correlated sub-select in the
//! owner's select list, producing a structured value (JSON object, array,
//! id array, or count). Nested expansion recurses through the context's
//! depth guard.

use orb_rs_core::{OrbError, OrbResult};

use super::builder::SelectBuilder;
use super::columns;
use super::context::{CompileContext, Scope};
use crate::query::{ExpandTree, Lookup, Marker};
use crate::schema::{Pipe, ReverseLookup, Schema};

/// A many-valued relationship.
enum Relation<'a> {
    Pipe(&'a Pipe),
    Reverse(&'a ReverseLookup),
}

impl Relation<'_> {
    fn target(&self) -> &str {
        match self {
            Self::Pipe(pipe) => &pipe.target,
            Self::Reverse(lookup) => &lookup.target,
        }
    }

    fn unique(&self) -> bool {
        match self {
            Self::Pipe(pipe) => pipe.unique,
            Self::Reverse(lookup) => lookup.unique,
        }
    }
}

/// Plans one sub-select per top-level key of `tree`, as
/// `(expression, name)` pairs in name order.
pub(crate) fn plan_expansions<'a>(
    ctx: &mut CompileContext<'a>,
    owner: &'a Schema,
    owner_alias: &str,
    tree: &ExpandTree,
) -> OrbResult<Vec<(String, String)>> {
    tree.iter()
        .map(|(name, sub)| {
            let sql = ctx.nested(|ctx| expand(ctx, owner, owner_alias, name, sub))?;
            Ok((sql, name.to_string()))
        })
        .collect()
}

fn expand<'a>(
    ctx: &mut CompileContext<'a>,
    owner: &'a Schema,
    owner_alias: &str,
    name: &str,
    sub: &ExpandTree,
) -> OrbResult<String> {
    if let Some(column) = owner.column_named(name) {
        if !column.is_reference() {
            return Err(OrbError::QueryInvalid(format!(
                "'{name}' on '{}' is not a reference and cannot be expanded",
                owner.name
            )));
        }
        let target = ctx.registry().reference_model(column)?;
        let alias = ctx.alias(target.table_name());
        let (object, mut select) = record_object(ctx, target, &alias, &sub.nested())?;
        let pk = target.id_column()?;
        select.column(object, None).filter(format!(
            "{} = {}",
            ctx.column_ref(&alias, &pk.field),
            ctx.column_ref(owner_alias, &column.field)
        ));
        tracing::trace!(relation = %name, alias = %alias, "expand reference");
        return Ok(format!("({})", select.render(ctx.dialect())));
    }

    let relation = if let Some(pipe) = owner.pipe_named(name) {
        Relation::Pipe(pipe)
    } else if let Some(lookup) = owner.reverse_lookup_named(name) {
        Relation::Reverse(lookup)
    } else {
        return Err(OrbError::column_not_found(&owner.name, name));
    };

    let mut markers = sub.markers();
    if markers.is_empty() {
        markers.push(if relation.unique() {
            Marker::First
        } else {
            Marker::Records
        });
    }
    let nested = sub.nested();

    let mut values = Vec::with_capacity(markers.len());
    for marker in &markers {
        let value = expand_marker(ctx, owner, owner_alias, &relation, *marker, &nested)?;
        values.push((marker.name().to_string(), value));
    }
    tracing::trace!(relation = %name, markers = markers.len(), "expand collection");

    Ok(match values.len() {
        1 => values.remove(0).1,
        _ => ctx.dialect().json_object(&values),
    })
}

/// The correlation restricting `alias` rows of the relation's target to
/// those related to the owner row.
fn correlation(
    ctx: &CompileContext<'_>,
    owner: &Schema,
    owner_alias: &str,
    relation: &Relation<'_>,
    target: &Schema,
    alias: &str,
) -> OrbResult<String> {
    let owner_pk = ctx.column_ref(owner_alias, &owner.id_column()?.field);
    match relation {
        Relation::Reverse(lookup) => {
            let column = target.require_column(&lookup.column)?;
            Ok(format!("{} = {owner_pk}", ctx.column_ref(alias, &column.field)))
        }
        Relation::Pipe(pipe) => {
            let through = ctx.registry().get(&pipe.through)?;
            let from = through.require_column(&pipe.from_column)?;
            let to = through.require_column(&pipe.to_column)?;
            let through_alias = format!("{alias}_through");
            Ok(format!(
                "{} IN (SELECT {} FROM {} WHERE {} = {owner_pk})",
                ctx.column_ref(alias, &target.id_column()?.field),
                ctx.column_ref(&through_alias, &to.field),
                ctx.from_clause(through, &through_alias),
                ctx.column_ref(&through_alias, &from.field)
            ))
        }
    }
}

fn expand_marker<'a>(
    ctx: &mut CompileContext<'a>,
    owner: &'a Schema,
    owner_alias: &str,
    relation: &Relation<'_>,
    marker: Marker,
    nested: &ExpandTree,
) -> OrbResult<String> {
    let target = ctx.registry().get(relation.target())?;
    let alias = ctx.alias(target.table_name());
    let filter = correlation(ctx, owner, owner_alias, relation, target, &alias)?;

    match marker {
        Marker::Count | Marker::Ids => {
            let value = if marker == Marker::Count {
                "COUNT(*)".to_string()
            } else {
                let pk = target.id_column()?;
                ctx.dialect().array_agg(&ctx.column_ref(&alias, &pk.field))
            };
            let mut select = SelectBuilder::new(ctx.from_clause(target, &alias));
            select.column(value, None).filter(filter);
            Ok(format!("({})", select.render(ctx.dialect())))
        }
        Marker::First | Marker::Last => {
            let (object, mut select) = record_object(ctx, target, &alias, nested)?;
            select.column(object, None).filter(filter);
            select.order_by = columns::natural_order(ctx, target, &alias, marker == Marker::Last)?;
            select.limit = Some(1);
            Ok(format!("({})", select.render(ctx.dialect())))
        }
        Marker::Records => {
            let (object, mut select) = record_object(ctx, target, &alias, nested)?;
            select.column(object, Some("record".into())).filter(filter);
            select.order_by = columns::natural_order(ctx, target, &alias, false)?;
            let records = format!("{alias}_records");
            Ok(format!(
                "(SELECT {} FROM ({}) AS {})",
                ctx.dialect().json_array_agg(&ctx.column_ref(&records, "record")),
                select.render(ctx.dialect()),
                ctx.quote(&records)
            ))
        }
    }
}

/// One record of `schema` as a JSON object, with the select that reads it.
///
/// The returned builder has its FROM, joins, and GROUP BY set; the caller
/// adds the object column, the correlation filter, and any ordering.
fn record_object<'a>(
    ctx: &mut CompileContext<'a>,
    schema: &'a Schema,
    alias: &str,
    nested: &ExpandTree,
) -> OrbResult<(String, SelectBuilder)> {
    let mut scope = Scope::new(schema, alias);
    let lookup = Lookup::new().expand(nested.clone());
    let mut pairs: Vec<(String, String)> = columns::plan_columns(ctx, &mut scope, &lookup)?
        .into_iter()
        .map(|(expr, name)| (name, expr))
        .collect();
    for (expr, name) in plan_expansions(ctx, schema, alias, nested)? {
        pairs.push((name, expr));
    }

    let object = ctx.dialect().json_object(&pairs);
    let mut select = SelectBuilder::new(ctx.from_clause(schema, alias));
    select.group_by = scope.group_by(ctx);
    select.joins = scope.planned;
    Ok((object, select))
}
