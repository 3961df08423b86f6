//! Integration tests for the public compiler surface.
//!
//! These tests drive [`SqlCompiler`] end to end, covering:
//! 1. Plain, translated, and aggregate selects
//! 2. Unsatisfiable filters
//! 3. Inserts with translations
//! 4. Structural properties (join reuse, parenthesization, determinism, inversion)

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use orb_rs_core::OrbError;
use orb_rs_db::{
    Aggregator, Column, ColumnType, CompileOptions, Dialect, Locale, Lookup, MySql, PostgreSql,
    Query, QueryNode, Record, Schema, SchemaRegistry, SqlCompiler, Value,
};

// ============================================================================
// Shared helpers
// ============================================================================

/// `User{id, username}` with nothing else.
fn plain_registry() -> SchemaRegistry {
    SchemaRegistry::new().with(
        Schema::new("User")
            .column(Column::id())
            .column(Column::new("username", ColumnType::String).unique()),
    )
}

/// Users with a translated bio, an order count, and an address reference.
fn shop_registry() -> SchemaRegistry {
    SchemaRegistry::new()
        .with(
            Schema::new("User")
                .column(Column::id())
                .column(Column::new("username", ColumnType::String).unique())
                .column(Column::new("bio", ColumnType::Text).translatable())
                .column(Column::reference("address", "Address"))
                .column(Column::aggregate(
                    "orderCount",
                    ColumnType::Integer,
                    Aggregator::count("Order", "user"),
                )),
        )
        .with(
            Schema::new("Address")
                .column(Column::id())
                .column(Column::new("city", ColumnType::String))
                .column(Column::new("zip", ColumnType::String)),
        )
        .with(
            Schema::new("Order")
                .column(Column::id())
                .column(Column::reference("user", "User"))
                .column(Column::new("total", ColumnType::Decimal)),
        )
}

/// Two integer columns to compare against each other.
fn pair_registry() -> SchemaRegistry {
    SchemaRegistry::new().with(
        Schema::new("Pair")
            .column(Column::id())
            .column(Column::new("a", ColumnType::Integer))
            .column(Column::new("b", ColumnType::Integer)),
    )
}

// ============================================================================
// 1. Selects
// ============================================================================

#[test]
fn test_select_by_username() {
    let reg = plain_registry();
    let pg = PostgreSql::new();
    let compiler = SqlCompiler::new(&reg, &pg);
    let out = compiler
        .compile_select("User", &Lookup::new().filter(Query::new("username").is("john.doe")))
        .unwrap()
        .unwrap();

    assert_eq!(
        out.sql,
        "SELECT \"user\".\"id\" AS \"id\", \"user\".\"username\" AS \"username\" \
         FROM \"user\" WHERE \"user\".\"username\" = %(key0)s"
    );
    assert_eq!(out.params.len(), 1);
    assert_eq!(out.params.get("key0"), Some(&Value::from("john.doe")));
    assert!(!out.sql.contains("john.doe"));
}

#[test]
fn test_select_all_locales() {
    let reg = shop_registry();
    let pg = PostgreSql::new();
    let options = CompileOptions::default().locale(Locale::All);
    let compiler = SqlCompiler::with_options(&reg, &pg, options);
    let out = compiler
        .compile_select("User", &Lookup::new().columns(["id", "bio"]))
        .unwrap()
        .unwrap();

    assert!(out
        .sql
        .contains("LEFT JOIN \"user_i18n\" ON \"user_i18n\".\"user_id\" = \"user\".\"id\""));
    assert!(out.sql.contains("json_object_agg("));
    assert!(out.sql.contains(") AS \"bio\""));
    assert!(out.sql.ends_with("GROUP BY \"user\".\"id\""));
    assert_eq!(out.columns, vec!["id", "bio"]);
}

#[test]
fn test_select_filtered_by_aggregate() {
    let reg = shop_registry();
    let pg = PostgreSql::new();
    let compiler = SqlCompiler::new(&reg, &pg);
    let lookup = Lookup::new()
        .columns(["id"])
        .filter(Query::new("orderCount").greater_than(5));
    let out = compiler.compile_select("User", &lookup).unwrap().unwrap();

    assert_eq!(out.sql.matches("LEFT JOIN").count(), 1);
    assert!(out.sql.contains(
        "LEFT JOIN (SELECT \"order\".\"user_id\" AS \"ref\", COUNT(*) AS \"value\" FROM \"order\" \
         GROUP BY \"order\".\"user_id\") AS \"join_0\" ON \"join_0\".\"ref\" = \"user\".\"id\""
    ));
    assert!(out.sql.contains("WHERE COALESCE(\"join_0\".\"value\", 0) > %(key0)s"));
    assert!(out.sql.contains("GROUP BY \"user\".\"id\""));
    assert_eq!(out.params.get("key0"), Some(&Value::Int(5)));
}

#[test]
fn test_count_on_mysql() {
    let reg = shop_registry();
    let my = MySql::new();
    let compiler = SqlCompiler::new(&reg, &my);
    let out = compiler
        .compile_count("Order", &Lookup::new().filter(Query::new("total").greater_than(10)))
        .unwrap()
        .unwrap();
    assert_eq!(
        out.sql,
        "SELECT COUNT(*) AS `count` FROM (SELECT `order`.`id` AS `id` FROM `order` \
         WHERE `order`.`total` > %(key0)s) AS `records`"
    );
}

// ============================================================================
// 2. Unsatisfiable filters
// ============================================================================

#[test]
fn test_empty_membership_produces_no_sql() {
    let reg = plain_registry();
    let pg = PostgreSql::new();
    let compiler = SqlCompiler::new(&reg, &pg);
    let lookup = Lookup::new().filter(Query::new("username").is_in(Vec::<Value>::new()));

    assert!(compiler.compile_select("User", &lookup).unwrap().is_none());
    assert!(compiler.compile_count("User", &lookup).unwrap().is_none());
    let filter = lookup.filter.clone().unwrap();
    assert!(compiler.compile_where("User", &filter).unwrap().is_none());
    assert!(compiler.compile_delete("User", Some(&filter)).unwrap().is_none());
}

#[test]
fn test_unknown_column_is_an_error() {
    let reg = plain_registry();
    let pg = PostgreSql::new();
    let compiler = SqlCompiler::new(&reg, &pg);
    let lookup = Lookup::new().filter(Query::new("nickname").is("x"));
    assert!(matches!(
        compiler.compile_select("User", &lookup),
        Err(OrbError::ColumnNotFound { .. })
    ));
}

// ============================================================================
// 3. Inserts
// ============================================================================

#[test]
fn test_insert_translations_only_where_present() {
    let reg = shop_registry();
    let pg = PostgreSql::new();
    let compiler = SqlCompiler::new(&reg, &pg);
    let records = [
        Record::new().set("username", "ann").translate("en", "bio", "Hello"),
        Record::new().set("username", "bob"),
    ];
    let out = compiler.compile_insert("User", &records).unwrap();

    assert_eq!(out.len(), 2);
    let base = &out[0].sql;
    let values = &base[base.find("VALUES").unwrap()..];
    assert_eq!(values.matches("), (").count(), 1);
    assert!(base.ends_with("RETURNING \"id\""));

    let translated = &out[1].sql;
    assert!(translated.starts_with("INSERT INTO \"user_i18n\""));
    let values = &translated[translated.find("VALUES").unwrap()..];
    assert_eq!(values.matches("), (").count(), 0);
    assert_eq!(out[1].params.len(), 2);
}

#[test]
fn test_update_then_delete() {
    let reg = shop_registry();
    let my = MySql::new();
    let compiler = SqlCompiler::new(&reg, &my);
    let updated = compiler
        .compile_update("Order", &[Record::new().set("id", 7).set("total", 12.5)])
        .unwrap();
    assert_eq!(
        updated[0].sql,
        "UPDATE `order` SET `total` = %(key0)s WHERE `id` = %(key1)s"
    );

    let filter: QueryNode = Query::new("user.username").is("bob").into();
    let deleted = compiler.compile_delete("Order", Some(&filter)).unwrap().unwrap();
    assert!(deleted.sql.starts_with("DELETE FROM `order` WHERE `order`.`id` IN (SELECT `ids`.`id` FROM ("));
}

// ============================================================================
// 4. Structural properties
// ============================================================================

#[test]
fn test_same_path_joined_once() {
    let reg = shop_registry();
    let pg = PostgreSql::new();
    let compiler = SqlCompiler::new(&reg, &pg);
    let filter = Query::new("address.city").is("Lyon") & Query::new("address.zip").is("69001");
    let out = compiler.compile_where("User", &filter).unwrap().unwrap();
    assert_eq!(out.sql.matches("LEFT JOIN \"address\"").count(), 1);
    assert_eq!(out.params.len(), 2);
}

#[test]
fn test_compound_parenthesization() {
    let reg = pair_registry();
    let pg = PostgreSql::new();
    let compiler = SqlCompiler::new(&reg, &pg);
    let filter = Query::new("id").is(1) & (Query::new("a").is(2) | Query::new("b").is(3));
    let out = compiler.compile_where("Pair", &filter).unwrap().unwrap();
    assert_eq!(
        out.sql,
        "(\"pair\".\"id\" = %(key0)s AND (\"pair\".\"a\" = %(key1)s OR \"pair\".\"b\" = %(key2)s))"
    );
}

#[test]
fn test_compilation_is_deterministic() {
    let reg = shop_registry();
    let my = MySql::new();
    let compiler = SqlCompiler::new(&reg, &my);
    let lookup = Lookup::new()
        .filter(Query::new("address.city").is("Lyon") | Query::new("orderCount").greater_than(2))
        .limit(5);
    let first = compiler.compile_select("User", &lookup).unwrap();
    let second = compiler.compile_select("User", &lookup).unwrap();
    assert_eq!(first, second);
}

/// Evaluates `"pair"."x" OP "pair"."y"` for concrete column values.
fn evaluate(sql: &str, a: i64, b: i64) -> bool {
    let parts: Vec<&str> = sql.split(' ').collect();
    assert_eq!(parts.len(), 3, "unexpected comparison: {sql}");
    let operand = |text: &str| match text {
        "\"pair\".\"a\"" => a,
        "\"pair\".\"b\"" => b,
        other => panic!("unexpected operand {other}"),
    };
    let (lhs, rhs) = (operand(parts[0]), operand(parts[2]));
    match parts[1] {
        "<" => lhs < rhs,
        "<=" => lhs <= rhs,
        ">" => lhs > rhs,
        ">=" => lhs >= rhs,
        "=" => lhs == rhs,
        "!=" => lhs != rhs,
        other => panic!("unexpected operator {other}"),
    }
}

#[test]
fn test_inverted_comparison_swaps_operands() {
    let reg = pair_registry();
    let pg = PostgreSql::new();
    let compiler = SqlCompiler::new(&reg, &pg);
    let builders: [fn(Query, Query) -> Query; 6] = [
        |q, v| q.less_than(v),
        |q, v| q.less_than_or_equal(v),
        |q, v| q.greater_than(v),
        |q, v| q.greater_than_or_equal(v),
        |q, v| q.is(v),
        |q, v| q.is_not(v),
    ];
    let mut rng = StdRng::seed_from_u64(0x0b5e);

    for build in builders {
        let plain: QueryNode = build(Query::new("a"), Query::new("b")).into();
        let inverted: QueryNode = build(Query::new("a"), Query::new("b")).inverted().into();
        let swapped: QueryNode = build(Query::new("b"), Query::new("a")).into();
        let plain = compiler.compile_where("Pair", &plain).unwrap().unwrap().sql;
        let inverted = compiler.compile_where("Pair", &inverted).unwrap().unwrap().sql;
        let swapped = compiler.compile_where("Pair", &swapped).unwrap().unwrap().sql;

        for _ in 0..64 {
            let a = rng.gen_range(-20..20);
            let b = rng.gen_range(-20..20);
            assert_eq!(evaluate(&inverted, a, b), evaluate(&swapped, a, b), "{inverted}");
            assert_eq!(evaluate(&plain, b, a), evaluate(&inverted, a, b), "{plain}");
        }
    }
}

#[test]
fn test_dialect_names() {
    let dialects: [&dyn Dialect; 2] = [&PostgreSql::new(), &MySql::new()];
    let names: Vec<&str> = dialects.iter().map(|d| d.name()).collect();
    assert_eq!(names, vec!["postgresql", "mysql"]);
}
