//! Predicate and compound compilation.
//!
//! [`compile_node`] turns a filter tree into one boolean SQL fragment,
//! binding every literal through the context. Compounds are always
//! parenthesized; a top-level leaf is not. An empty fragment means "no
//! constraint" and is dropped by the enclosing compound.

use orb_rs_core::{OrbError, OrbResult};

use super::columns;
use super::context::{CompileContext, Scope};
use super::select;
use crate::query::{CompoundOp, Function, Op, Query, QueryCompound, QueryNode, QueryValue, RecordSet};
use crate::schema::{Column, ColumnKind, Schema};
use crate::value::Value;

/// A column resolved through any traversal joins.
pub(crate) struct Resolved<'a> {
    pub schema: &'a Schema,
    pub alias: String,
    pub column: &'a Column,
}

pub(crate) fn compile_node<'a>(
    ctx: &mut CompileContext<'a>,
    scope: &mut Scope<'a>,
    node: &QueryNode,
) -> OrbResult<String> {
    match node {
        QueryNode::Query(query) => compile_query(ctx, scope, query),
        QueryNode::Compound(compound) => ctx.nested(|ctx| compile_compound(ctx, scope, compound)),
    }
}

fn compile_compound<'a>(
    ctx: &mut CompileContext<'a>,
    scope: &mut Scope<'a>,
    compound: &QueryCompound,
) -> OrbResult<String> {
    let mut parts = Vec::with_capacity(compound.queries.len());
    let mut unsatisfiable = 0;

    for child in &compound.queries {
        match compound.op {
            CompoundOp::And => {
                let sql = compile_node(ctx, scope, child)?;
                if !sql.is_empty() {
                    parts.push(sql);
                }
            }
            CompoundOp::Or => {
                // An unsatisfiable alternative cannot change an OR; forget
                // the joins and parameters it produced.
                let snapshot = scope.clone();
                let mark = ctx.params_len();
                match compile_node(ctx, scope, child) {
                    Ok(sql) => {
                        if !sql.is_empty() {
                            parts.push(sql);
                        }
                    }
                    Err(err) if err.is_empty_query() => {
                        *scope = snapshot;
                        ctx.rollback_params(mark);
                        unsatisfiable += 1;
                    }
                    Err(err) => return Err(err),
                }
            }
        }
    }

    if unsatisfiable > 0 && unsatisfiable == compound.queries.len() {
        return Err(OrbError::EmptyQuery);
    }
    if parts.is_empty() {
        return Ok(String::new());
    }
    Ok(format!("({})", parts.join(compound.op.separator())))
}

/// Resolves a column name or dotted traversal path, emitting one LEFT JOIN
/// per hop not yet joined in this scope.
pub(crate) fn resolve<'a>(
    ctx: &mut CompileContext<'a>,
    scope: &mut Scope<'a>,
    path: &str,
) -> OrbResult<Resolved<'a>> {
    let (hops, last) = match path.rsplit_once('.') {
        Some((hops, last)) => (hops.split('.').collect::<Vec<_>>(), last),
        None => (Vec::new(), path),
    };

    let mut schema = scope.schema;
    let mut alias = scope.alias.clone();
    let mut walked = String::new();

    for hop in hops {
        let column = schema
            .column_named(hop)
            .filter(|c| c.is_reference())
            .ok_or_else(|| OrbError::column_not_found(&schema.name, hop))?;
        let target = ctx.registry().reference_model(column)?;

        if !walked.is_empty() {
            walked.push('.');
        }
        walked.push_str(hop);

        alias = if let Some(existing) = scope.join_aliases.get(&walked) {
            existing.clone()
        } else {
            let join_alias = ctx.alias("join");
            let pk = target.id_column()?;
            let join = format!(
                "LEFT JOIN {} ON {} = {}",
                ctx.from_clause(target, &join_alias),
                ctx.column_ref(&join_alias, &pk.field),
                ctx.column_ref(&alias, &column.field)
            );
            tracing::trace!(path = %walked, alias = %join_alias, "traversal join");
            scope.joins.push(join);
            scope.join_aliases.insert(walked.clone(), join_alias.clone());
            scope.implicated.insert(target.name.clone());
            join_alias
        };
        schema = target;
    }

    let column = schema.require_column(last)?;
    Ok(Resolved {
        schema,
        alias,
        column,
    })
}

fn compile_query<'a>(
    ctx: &mut CompileContext<'a>,
    scope: &mut Scope<'a>,
    query: &Query,
) -> OrbResult<String> {
    let target = resolve(ctx, scope, &query.column)?;
    let column = target.column;
    let case_sensitive = query.case_sensitive.unwrap_or(column.case_sensitive);

    if column.translatable && !column.is_proxy() && !joined_translation(scope, &target) {
        return compile_translated(ctx, scope, &target, query, case_sensitive);
    }

    let field = field_expr(ctx, scope, &target)?;
    let lhs = decorate(ctx, scope, column, field, query)?;
    compare(ctx, scope, column, &lhs, query, case_sensitive)
}

/// Whether a single-locale translation join already serves this column.
fn joined_translation(scope: &Scope<'_>, target: &Resolved<'_>) -> bool {
    target.alias == scope.alias
        && scope
            .translations
            .as_ref()
            .is_some_and(columns::Translations::is_single)
}

/// Compares a translated column through a self-contained sub-select on the
/// translation table.
fn compile_translated<'a>(
    ctx: &mut CompileContext<'a>,
    scope: &mut Scope<'a>,
    target: &Resolved<'a>,
    query: &Query,
    case_sensitive: bool,
) -> OrbResult<String> {
    let schema = target.schema;
    let pk = schema.id_column()?;
    let sub = ctx.alias("i18n");
    let field = ctx.column_ref(&sub, &target.column.field);
    let lhs = decorate(ctx, scope, target.column, field, query)?;
    let mut filter = compare(ctx, scope, target.column, &lhs, query, case_sensitive)?;
    if filter.is_empty() {
        return Ok(filter);
    }

    if let Some(code) = ctx.locale().code().map(str::to_owned) {
        let key = ctx.bind(None, &Value::from(code))?;
        filter.push_str(&format!(" AND {} = {key}", ctx.column_ref(&sub, "locale")));
    }

    Ok(format!(
        "{} IN (SELECT {} FROM {} WHERE {filter})",
        ctx.column_ref(&target.alias, &pk.field),
        ctx.column_ref(&sub, &schema.i18n_owner_field()),
        ctx.i18n_from_clause(schema, &sub)
    ))
}

/// The undecorated expression a resolved column compares through.
fn field_expr<'a>(
    ctx: &mut CompileContext<'a>,
    scope: &mut Scope<'a>,
    target: &Resolved<'a>,
) -> OrbResult<String> {
    let column = target.column;
    match &column.kind {
        ColumnKind::Proxy => Err(OrbError::QueryInvalid(format!(
            "proxy column '{}' cannot be queried",
            column.name
        ))),
        ColumnKind::Aggregate(_) | ColumnKind::Joined(_) => {
            if target.alias != scope.alias {
                return Err(OrbError::QueryInvalid(format!(
                    "computed column '{}' cannot be reached through a traversal",
                    column.name
                )));
            }
            columns::computed_field(ctx, scope, column)
        }
        ColumnKind::Plain if column.translatable => match &scope.translations {
            Some(t) if joined_translation(scope, target) => Ok(ctx.column_ref(&t.alias, &column.field)),
            _ => Err(OrbError::QueryInvalid(format!(
                "translated column '{}' cannot be used as an operand here",
                column.name
            ))),
        },
        ColumnKind::Plain => Ok(ctx.column_ref(&target.alias, &column.field)),
    }
}

/// The full expression of a column-to-column operand.
fn operand_expr<'a>(
    ctx: &mut CompileContext<'a>,
    scope: &mut Scope<'a>,
    query: &Query,
) -> OrbResult<String> {
    let target = resolve(ctx, scope, &query.column)?;
    let field = field_expr(ctx, scope, &target)?;
    decorate(ctx, scope, target.column, field, query)
}

/// Applies functions (innermost first), then chained math.
fn decorate<'a>(
    ctx: &mut CompileContext<'a>,
    scope: &mut Scope<'a>,
    column: &Column,
    field: String,
    query: &Query,
) -> OrbResult<String> {
    let dialect = ctx.dialect();
    let mut expr = query
        .functions
        .iter()
        .fold(field, |expr, function| dialect.func_sql(*function, &expr));

    for (index, (math, operand)) in query.math.iter().enumerate() {
        let op = dialect.math_sql(*math, column.column_type).ok_or_else(|| {
            OrbError::InvalidOperator(format!(
                "{} is not supported on {} columns",
                math.name(),
                column.column_type.name()
            ))
        })?;
        let rhs = match operand {
            QueryValue::Literal(value) => ctx.bind(Some(column), value)?,
            QueryValue::Column(other) => operand_expr(ctx, scope, other)?,
            QueryValue::Null => {
                return Err(OrbError::QueryInvalid(format!(
                    "{} operand on '{}' cannot be NULL",
                    math.name(),
                    column.name
                )))
            }
            QueryValue::Records(_) => {
                return Err(OrbError::QueryInvalid(format!(
                    "{} operand on '{}' cannot be a record set",
                    math.name(),
                    column.name
                )))
            }
        };
        expr = if index == 0 {
            format!("{expr} {op} {rhs}")
        } else {
            format!("({expr}) {op} {rhs}")
        };
    }
    Ok(expr)
}

fn operator(ctx: &CompileContext<'_>, op: Op, case_sensitive: bool) -> OrbResult<&'static str> {
    let dialect = ctx.dialect();
    dialect.op_sql(op, case_sensitive).ok_or_else(|| {
        OrbError::InvalidOperator(format!("{} has no {} mapping", op.name(), dialect.name()))
    })
}

/// Dispatches on the shape of the comparison value.
fn compare<'a>(
    ctx: &mut CompileContext<'a>,
    scope: &mut Scope<'a>,
    column: &Column,
    lhs: &str,
    query: &Query,
    case_sensitive: bool,
) -> OrbResult<String> {
    match &query.value {
        QueryValue::Null => Ok(match query.op {
            Op::Is => format!("{lhs} IS NULL"),
            Op::IsNot => format!("{lhs} IS NOT NULL"),
            _ => String::new(),
        }),
        QueryValue::Column(other) => {
            let op = operator(ctx, query.op, case_sensitive)?;
            let rhs = operand_expr(ctx, scope, other)?;
            Ok(if query.inverted {
                format!("{rhs} {op} {lhs}")
            } else {
                format!("{lhs} {op} {rhs}")
            })
        }
        QueryValue::Records(records) => {
            compare_records(ctx, column, lhs, query, records, case_sensitive)
        }
        QueryValue::Literal(value) => {
            compare_literal(ctx, column, lhs, query, value, case_sensitive)
        }
    }
}

fn compare_literal(
    ctx: &mut CompileContext<'_>,
    column: &Column,
    lhs: &str,
    query: &Query,
    value: &Value,
    case_sensitive: bool,
) -> OrbResult<String> {
    let op = query.op;

    if op == Op::Between {
        if query.inverted {
            return Err(OrbError::QueryInvalid(format!(
                "Between on '{}' has no operand to swap and cannot be inverted",
                column.name
            )));
        }
        let bounds = value.as_list().filter(|b| b.len() == 2).ok_or_else(|| {
            OrbError::QueryInvalid(format!(
                "Between on '{}' requires exactly two bounds",
                column.name
            ))
        })?;
        let low = ctx.bind(Some(column), &bounds[0])?;
        let high = ctx.bind(Some(column), &bounds[1])?;
        return Ok(format!("{lhs} BETWEEN {low} AND {high}"));
    }

    if op.is_membership() || (matches!(op, Op::Is | Op::IsNot) && value.as_list().is_some()) {
        let items = value
            .as_list()
            .map_or_else(|| vec![value.clone()], <[Value]>::to_vec);
        return compare_members(ctx, column, lhs, op, &items);
    }

    let sql_op = operator(ctx, op, case_sensitive)?;

    if op.is_pattern() {
        let folds = ctx.dialect().folds_case(op, case_sensitive);
        let text = value.as_str().map_or_else(|| value.to_string(), str::to_owned);
        let text = if folds { text.to_lowercase() } else { text };
        let key = ctx.bind(None, &Value::String(op.wildcard(&text)))?;
        let field = if folds {
            ctx.dialect().func_sql(Function::Lower, lhs)
        } else {
            lhs.to_string()
        };
        return Ok(if query.inverted {
            format!("{key} {sql_op} {field}")
        } else {
            format!("{field} {sql_op} {key}")
        });
    }

    // Patterns are not column values.
    let key = if matches!(op, Op::Matches | Op::DoesNotMatch) {
        ctx.bind(None, value)?
    } else {
        ctx.bind(Some(column), value)?
    };
    Ok(if query.inverted {
        format!("{key} {sql_op} {lhs}")
    } else {
        format!("{lhs} {sql_op} {key}")
    })
}

fn compare_members(
    ctx: &mut CompileContext<'_>,
    column: &Column,
    lhs: &str,
    op: Op,
    items: &[Value],
) -> OrbResult<String> {
    if items.is_empty() {
        return Err(OrbError::EmptyQuery);
    }
    let keys = items
        .iter()
        .map(|item| ctx.bind(Some(column), item))
        .collect::<OrbResult<Vec<_>>>()?;
    let sql_op = operator(ctx, if op.is_negative() { Op::IsNotIn } else { Op::IsIn }, false)?;
    Ok(format!("{lhs} {sql_op} ({})", keys.join(", ")))
}

fn compare_records(
    ctx: &mut CompileContext<'_>,
    column: &Column,
    lhs: &str,
    query: &Query,
    records: &RecordSet,
    case_sensitive: bool,
) -> OrbResult<String> {
    let membership = match query.op {
        Op::Is | Op::IsIn => Some(Op::IsIn),
        Op::IsNot | Op::IsNotIn => Some(Op::IsNotIn),
        _ => None,
    };

    if let Some(ids) = &records.loaded {
        let op = membership.ok_or_else(|| {
            OrbError::InvalidOperator(format!(
                "{} cannot compare against loaded records",
                query.op.name()
            ))
        })?;
        return compare_members(ctx, column, lhs, op, ids);
    }

    let op = operator(ctx, membership.unwrap_or(query.op), case_sensitive)?;
    let sub = ctx.nested(|ctx| select::record_subselect(ctx, records))?;
    Ok(format!("{lhs} {op} ({sub})"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::context::CompileOptions;
    use crate::compiler::fixtures;
    use crate::compiler::statement::Params;
    use crate::dialect::{Dialect, MySql, PostgreSql};
    use crate::query::{Locale, Lookup};

    struct Compiled {
        sql: String,
        params: Params,
        joins: Vec<String>,
    }

    fn compile_with(
        dialect: &dyn Dialect,
        options: &CompileOptions,
        node: impl Into<QueryNode>,
    ) -> OrbResult<Compiled> {
        let reg = fixtures::registry();
        let mut ctx = CompileContext::new(&reg, dialect, options);
        let mut scope = Scope::new(reg.get("User")?, "user");
        let sql = compile_node(&mut ctx, &mut scope, &node.into())?;
        Ok(Compiled {
            sql,
            params: ctx.take_params(),
            joins: scope.joins,
        })
    }

    fn compile(node: impl Into<QueryNode>) -> OrbResult<Compiled> {
        compile_with(&PostgreSql::new(), &CompileOptions::default(), node)
    }

    // ── Literals ────────────────────────────────────────────────────

    #[test]
    fn test_equality_binds_one_param() {
        let out = compile(Query::new("username").is("john.doe")).unwrap();
        assert_eq!(out.sql, "\"user\".\"username\" = %(key0)s");
        assert_eq!(out.params.len(), 1);
        assert_eq!(out.params.get("key0"), Some(&Value::from("john.doe")));
    }

    #[test]
    fn test_null_checks() {
        assert_eq!(
            compile(Query::new("email").is_null()).unwrap().sql,
            "\"user\".\"email\" IS NULL"
        );
        assert_eq!(
            compile(Query::new("email").is_not_null()).unwrap().sql,
            "\"user\".\"email\" IS NOT NULL"
        );
        assert_eq!(
            compile(Query::new("email").greater_than(Value::Null)).unwrap().sql,
            ""
        );
    }

    #[test]
    fn test_inverted_literal_swaps_sides() {
        let out = compile(Query::new("age").greater_than(21).inverted()).unwrap();
        assert_eq!(out.sql, "%(key0)s > \"user\".\"age\"");
    }

    #[test]
    fn test_between() {
        let out = compile(Query::new("age").between(18, 65)).unwrap();
        assert_eq!(out.sql, "\"user\".\"age\" BETWEEN %(key0)s AND %(key1)s");
        assert_eq!(out.params.get("key1"), Some(&Value::Int(65)));

        let bad = Query::new("age").is(1);
        let bad = Query { op: Op::Between, ..bad };
        assert!(matches!(compile(bad), Err(OrbError::QueryInvalid(_))));
    }

    #[test]
    fn test_inverted_between_rejected() {
        assert!(matches!(
            compile(Query::new("age").between(18, 65).inverted()),
            Err(OrbError::QueryInvalid(_))
        ));
    }

    #[test]
    fn test_bool_column_values_are_marshalled() {
        let out = compile(Query::new("active").is(1)).unwrap();
        assert_eq!(out.params.get("key0"), Some(&Value::Bool(true)));
    }

    // ── Patterns ────────────────────────────────────────────────────

    #[test]
    fn test_contains_postgres_ilike() {
        let out = compile(Query::new("username").contains("Doe")).unwrap();
        assert_eq!(out.sql, "\"user\".\"username\" ILIKE %(key0)s");
        assert_eq!(out.params.get("key0"), Some(&Value::from("%Doe%")));
    }

    #[test]
    fn test_case_sensitive_startswith() {
        let out = compile(Query::new("username").startswith("jo").case_sensitive(true)).unwrap();
        assert_eq!(out.sql, "\"user\".\"username\" LIKE %(key0)s");
        assert_eq!(out.params.get("key0"), Some(&Value::from("jo%")));
    }

    #[test]
    fn test_mysql_folds_case_on_both_sides() {
        let out = compile_with(
            &MySql::new(),
            &CompileOptions::default(),
            Query::new("username").endswith("DOE"),
        )
        .unwrap();
        assert_eq!(out.sql, "LOWER(`user`.`username`) LIKE %(key0)s");
        assert_eq!(out.params.get("key0"), Some(&Value::from("%doe")));
    }

    #[test]
    fn test_inverted_pattern_swaps_sides() {
        let out = compile(Query::new("username").contains("jo").inverted()).unwrap();
        assert_eq!(out.sql, "%(key0)s ILIKE \"user\".\"username\"");
        assert_eq!(out.params.get("key0"), Some(&Value::from("%jo%")));

        let out = compile_with(
            &MySql::new(),
            &CompileOptions::default(),
            Query::new("username").does_not_contain("Jo").inverted(),
        )
        .unwrap();
        assert_eq!(out.sql, "%(key0)s NOT LIKE LOWER(`user`.`username`)");
        assert_eq!(out.params.get("key0"), Some(&Value::from("%jo%")));
    }

    #[test]
    fn test_regex_match() {
        let out = compile(Query::new("email").matches("^a.*@x$")).unwrap();
        assert_eq!(out.sql, "\"user\".\"email\" ~* %(key0)s");
    }

    // ── Membership ──────────────────────────────────────────────────

    #[test]
    fn test_is_in_list() {
        let out = compile(Query::new("age").is_in(vec![Value::Int(1), Value::Int(2)])).unwrap();
        assert_eq!(out.sql, "\"user\".\"age\" IN (%(key0)s, %(key1)s)");
        let out = compile(Query::new("age").is_not(vec![Value::Int(3)])).unwrap();
        assert_eq!(out.sql, "\"user\".\"age\" NOT IN (%(key0)s)");
    }

    #[test]
    fn test_empty_membership_is_empty_query() {
        assert!(matches!(
            compile(Query::new("username").is_in(Vec::<Value>::new())),
            Err(OrbError::EmptyQuery)
        ));
        assert!(matches!(
            compile(Query::new("role").is_in(RecordSet::loaded("Role", Vec::<i64>::new()))),
            Err(OrbError::EmptyQuery)
        ));
    }

    #[test]
    fn test_loaded_records_bind_ids() {
        let out = compile(Query::new("role").is(RecordSet::loaded("Role", [4_i64, 7]))).unwrap();
        assert_eq!(out.sql, "\"user\".\"role_id\" IN (%(key0)s, %(key1)s)");
        assert!(matches!(
            compile(Query::new("role").greater_than(RecordSet::loaded("Role", [1_i64]))),
            Err(OrbError::InvalidOperator(_))
        ));
    }

    #[test]
    fn test_unloaded_records_compile_subselect() {
        let roles = RecordSet::new("Role").filter(Query::new("name").is("admin"));
        let out = compile(Query::new("role").is_in(roles)).unwrap();
        assert_eq!(
            out.sql,
            "\"user\".\"role_id\" IN (SELECT \"role\".\"id\" FROM \"role\" WHERE \"role\".\"name\" = %(key0)s)"
        );
    }

    #[test]
    fn test_paged_records_mysql_use_derived_table() {
        let roles = RecordSet::new("Role").with_lookup(Lookup::new().limit(3));
        let out = compile_with(
            &MySql::new(),
            &CompileOptions::default(),
            Query::new("role").is_in(roles),
        )
        .unwrap();
        assert_eq!(
            out.sql,
            "`user`.`role_id` IN (SELECT `ids`.`id` FROM \
             (SELECT `role`.`id` AS `id` FROM `role` LIMIT 3) AS `ids`)"
        );
    }

    // ── Columns, math, functions ────────────────────────────────────

    #[test]
    fn test_column_comparison_and_inversion() {
        let q = Query::new("age").greater_than(Query::new("id"));
        assert_eq!(compile(q.clone()).unwrap().sql, "\"user\".\"age\" > \"user\".\"id\"");
        assert_eq!(compile(q.inverted()).unwrap().sql, "\"user\".\"id\" > \"user\".\"age\"");
    }

    #[test]
    fn test_math_chain_and_functions() {
        let out = compile(Query::new("age").abs().add(1).multiply(2).greater_than(10)).unwrap();
        assert_eq!(
            out.sql,
            "(abs(\"user\".\"age\") + %(key0)s) * %(key1)s > %(key2)s"
        );
    }

    #[test]
    fn test_string_concat_and_invalid_math() {
        let out = compile(Query::new("username").add("x").is("ax")).unwrap();
        assert_eq!(out.sql, "\"user\".\"username\" || %(key0)s = %(key1)s");
        assert!(matches!(
            compile(Query::new("username").divide(2).is("a")),
            Err(OrbError::InvalidOperator(_))
        ));
        assert!(matches!(
            compile(Query::new("age").add(Value::Null).is(1)),
            Err(OrbError::QueryInvalid(_))
        ));
    }

    #[test]
    fn test_lower_function() {
        let out = compile(Query::new("username").lower().is("x")).unwrap();
        assert_eq!(out.sql, "lower(\"user\".\"username\") = %(key0)s");
    }

    // ── Resolution and traversal ────────────────────────────────────

    #[test]
    fn test_unknown_column() {
        assert!(matches!(
            compile(Query::new("nickname").is("x")),
            Err(OrbError::ColumnNotFound { .. })
        ));
        assert!(matches!(
            compile(Query::new("username.city").is("x")),
            Err(OrbError::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn test_traversal_join_is_reused() {
        let out = compile(
            Query::new("address.city").is("Paris") & Query::new("address.zip").startswith("75"),
        )
        .unwrap();
        assert_eq!(out.joins.len(), 1);
        assert_eq!(
            out.joins[0],
            "LEFT JOIN \"address\" AS \"join_0\" ON \"join_0\".\"id\" = \"user\".\"address_id\""
        );
        assert_eq!(
            out.sql,
            "(\"join_0\".\"city\" = %(key0)s AND \"join_0\".\"zip\" ILIKE %(key1)s)"
        );
    }

    #[test]
    fn test_proxy_column_rejected() {
        assert!(matches!(
            compile(Query::new("displayName").is("x")),
            Err(OrbError::QueryInvalid(_))
        ));
    }

    // ── Compounds ───────────────────────────────────────────────────

    #[test]
    fn test_compound_parenthesization() {
        let q = Query::new("age").is(1) & (Query::new("email").is(2) | Query::new("username").is(3));
        assert_eq!(
            compile(q).unwrap().sql,
            "(\"user\".\"age\" = %(key0)s AND (\"user\".\"email\" = %(key1)s OR \"user\".\"username\" = %(key2)s))"
        );
    }

    #[test]
    fn test_single_child_compound_parenthesized() {
        let node = QueryNode::Compound(QueryCompound::and([Query::new("age").is(1)]));
        assert_eq!(compile(node).unwrap().sql, "(\"user\".\"age\" = %(key0)s)");
    }

    #[test]
    fn test_empty_children_dropped() {
        let node = Query::new("age").is(1) & Query::new("email").greater_than(Value::Null);
        assert_eq!(compile(node).unwrap().sql, "(\"user\".\"age\" = %(key0)s)");
        let empty = QueryNode::Compound(QueryCompound::and(Vec::<QueryNode>::new()));
        assert_eq!(compile(empty).unwrap().sql, "");
    }

    #[test]
    fn test_or_drops_unsatisfiable_alternatives() {
        let node = Query::new("address.city").is_in(Vec::<Value>::new()) | Query::new("age").is(5);
        let out = compile(node).unwrap();
        assert_eq!(out.sql, "(\"user\".\"age\" = %(key0)s)");
        assert!(out.joins.is_empty());

        let none = Query::new("age").is_in(Vec::<Value>::new()) | Query::new("id").is_in(Vec::<Value>::new());
        assert!(matches!(compile(none), Err(OrbError::EmptyQuery)));
    }

    #[test]
    fn test_and_propagates_unsatisfiable() {
        let node = Query::new("age").is(1) & Query::new("id").is_in(Vec::<Value>::new());
        assert!(matches!(compile(node), Err(OrbError::EmptyQuery)));
    }

    #[test]
    fn test_depth_guard_on_nested_compounds() {
        let mut node: QueryNode = Query::new("age").is(1).into();
        for _ in 0..5 {
            node = QueryNode::Compound(QueryCompound::and([node]));
        }
        let options = CompileOptions::default().max_depth(3);
        assert!(matches!(
            compile_with(&PostgreSql::new(), &options, node),
            Err(OrbError::ExpansionTooDeep { .. })
        ));
    }

    // ── Translations and computed columns ───────────────────────────

    #[test]
    fn test_translated_column_without_join() {
        let out = compile(Query::new("bio").contains("rust")).unwrap();
        assert_eq!(
            out.sql,
            "\"user\".\"id\" IN (SELECT \"i18n_0\".\"user_id\" FROM \"user_i18n\" AS \"i18n_0\" \
             WHERE \"i18n_0\".\"bio\" ILIKE %(key0)s AND \"i18n_0\".\"locale\" = %(key1)s)"
        );
        assert_eq!(out.params.get("key1"), Some(&Value::from("en_US")));

        let all = CompileOptions::default().locale(Locale::All);
        let out = compile_with(&PostgreSql::new(), &all, Query::new("bio").is("x")).unwrap();
        assert!(!out.sql.contains("locale"));
    }

    #[test]
    fn test_aggregate_column_plans_join() {
        let reg = fixtures::registry();
        let pg = PostgreSql::new();
        let options = CompileOptions::default();
        let mut ctx = CompileContext::new(&reg, &pg, &options);
        let mut scope = Scope::new(reg.get("User").unwrap(), "user");
        let node: QueryNode = Query::new("orderCount").greater_than(5).into();
        let sql = compile_node(&mut ctx, &mut scope, &node).unwrap();
        assert_eq!(sql, "COALESCE(\"join_0\".\"value\", 0) > %(key0)s");
        assert_eq!(scope.planned.len(), 1);
        assert!(scope.joins.is_empty());
    }
}
