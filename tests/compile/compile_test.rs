//! Integration tests for Query → SQL compilation across dialects.
//!
//! Every emitted statement that a stock SQL parser understands is also
//! round-tripped through sqlparser to catch syntax regressions.

use insta::assert_snapshot;
use prismo::compile::{compile, CompileError, CompileOptions, QueryCompiler};
use prismo::model::{
    record_from_json, AggregateFn, Aggregation, Condition, Operation, Operator, OrderBy, Query,
    Value,
};
use prismo::sql::{Dialect, DialectError};
use serde_json::json;
use sqlparser::dialect::{MySqlDialect, PostgreSqlDialect, SQLiteDialect};
use sqlparser::parser::Parser;

fn validate(sql: &str, dialect: Dialect) {
    let parser: Box<dyn sqlparser::dialect::Dialect> = match dialect {
        Dialect::Postgres => Box::new(PostgreSqlDialect {}),
        Dialect::MySql => Box::new(MySqlDialect {}),
        Dialect::Sqlite => Box::new(SQLiteDialect {}),
    };
    if let Err(e) = Parser::parse_sql(&*parser, sql) {
        panic!("invalid SQL for {dialect:?}: {e}\nSQL: {sql}");
    }
}

fn sql(query: Query, dialect: Dialect) -> String {
    let compiled = compile(query, dialect, None).unwrap();
    validate(&compiled.sql.text, dialect);
    compiled.sql.text
}

// ============================================================================
// Conditions
// ============================================================================

#[test]
fn test_is_null_binds_nothing() {
    for dialect in [Dialect::Postgres, Dialect::MySql, Dialect::Sqlite] {
        let compiled = compile(
            Query::find_many("users").filter(Condition::is_null("deleted_at")),
            dialect,
            None,
        )
        .unwrap();
        assert!(compiled.sql.text.contains("deleted_at IS NULL"));
        assert!(compiled.sql.args.is_empty());
    }
}

#[test]
fn test_insensitive_contains_folds_both_sides() {
    let query = Query::find_many("users").filter(Condition::contains("email", "Acme").insensitive());
    let compiled = compile(query, Dialect::Postgres, None).unwrap();
    assert_snapshot!(
        compiled.sql.text,
        @"SELECT * FROM users WHERE LOWER(email) LIKE LOWER($1)"
    );
    assert_eq!(compiled.sql.args, vec![Value::from("%Acme%")]);
}

#[test]
fn test_placeholders_per_dialect() {
    let query = Query::find_many("users")
        .filter(Condition::gt("age", 21i64))
        .filter(Condition::new("role", Operator::In, Value::array(["admin", "owner"])));

    assert_snapshot!(
        sql(query.clone(), Dialect::Postgres),
        @"SELECT * FROM users WHERE age > $1 AND role IN ($2, $3)"
    );
    assert_snapshot!(
        sql(query.clone(), Dialect::Sqlite),
        @"SELECT * FROM users WHERE age > $1 AND role IN ($2, $3)"
    );
    assert_snapshot!(
        sql(query, Dialect::MySql),
        @"SELECT * FROM users WHERE age > ? AND role IN (?, ?)"
    );
}

#[test]
fn test_search_is_postgres_only() {
    let query = Query::find_many("posts").filter(Condition::new("body", Operator::Search, "rust async"));
    let compiled = compile(query.clone(), Dialect::Postgres, None).unwrap();
    assert_snapshot!(
        compiled.sql.text,
        @"SELECT * FROM posts WHERE TO_TSVECTOR(body) @@ PLAINTO_TSQUERY($1)"
    );

    for dialect in [Dialect::MySql, Dialect::Sqlite] {
        let err = compile(query.clone(), dialect, None).unwrap_err();
        assert!(
            matches!(
                err,
                CompileError::Dialect(DialectError::Unsupported { feature: "full-text search", .. })
            ),
            "{dialect:?}: {err:?}"
        );
    }
}

#[test]
fn test_has_rejected_outside_postgres() {
    let query = Query::find_many("posts").filter(Condition::new("tags", Operator::Has, Value::array(["rust"])));
    assert_snapshot!(
        compile(query.clone(), Dialect::Postgres, None).unwrap().sql.text,
        @"SELECT * FROM posts WHERE tags @> ARRAY[$1]"
    );
    assert!(matches!(
        compile(query, Dialect::MySql, None),
        Err(CompileError::Dialect(DialectError::Unsupported { .. }))
    ));
}

// ============================================================================
// Reads
// ============================================================================

#[test]
fn test_distinct_on_selects_distinct_fields() {
    let query = Query::find_many("events").distinct(["a", "b"]).select(["c"]);
    let text = sql(query.clone(), Dialect::Postgres);
    assert_snapshot!(text, @"SELECT DISTINCT ON (a, b) c, a, b FROM events");

    assert_snapshot!(sql(query, Dialect::Sqlite), @"SELECT DISTINCT c FROM events");
}

#[test]
fn test_cursor_is_anded_with_filter() {
    let query = Query::find_many("posts")
        .filter(Condition::equals("published", true))
        .cursor("id", 100i64)
        .take(20);
    let compiled = compile(query, Dialect::Postgres, None).unwrap();
    validate(&compiled.sql.text, Dialect::Postgres);
    assert_snapshot!(
        compiled.sql.text,
        @"SELECT * FROM posts WHERE id > $1 AND published = $2 ORDER BY id ASC LIMIT 20"
    );
    assert_eq!(compiled.sql.args[0], Value::Int(100));
    assert_eq!(compiled.sql.args[1], Value::Bool(true));
}

#[test]
fn test_group_by_having() {
    let query = Query::new("orders", Operation::Aggregate)
        .group_by(["customer_id"])
        .aggregate(Aggregation::new(AggregateFn::Sum, "amount"))
        .having(Condition::gt("SUM(amount)", 1000i64));
    let compiled = compile(query, Dialect::MySql, None).unwrap();
    validate(&compiled.sql.text, Dialect::MySql);
    assert_snapshot!(
        compiled.sql.text,
        @"SELECT customer_id, SUM(amount) AS _sum_amount FROM orders GROUP BY customer_id HAVING SUM(amount) > ?"
    );
    assert_eq!(compiled.sql.args, vec![Value::Int(1000)]);
}

#[test]
fn test_count_with_pagination() {
    let query = Query::new("users", Operation::Count)
        .filter(Condition::equals("active", true))
        .take(10)
        .skip(20);
    let compiled = compile(query, Dialect::Postgres, None).unwrap();
    validate(&compiled.sql.text, Dialect::Postgres);
    assert_snapshot!(
        compiled.sql.text,
        @"SELECT COUNT(*) AS _count FROM (SELECT * FROM users WHERE active = $1 LIMIT 10 OFFSET 20) AS _sub"
    );
}

#[test]
fn test_paginated_aggregate_groups_the_page() {
    let query = Query::new("orders", Operation::Aggregate)
        .filter(Condition::equals("status", "paid"))
        .group_by(["customer_id"])
        .aggregate(Aggregation::new(AggregateFn::Sum, "amount"))
        .having(Condition::gt("SUM(amount)", 100i64))
        .order_by(OrderBy::desc("created_at"))
        .take(50);
    let compiled = compile(query, Dialect::MySql, None).unwrap();
    validate(&compiled.sql.text, Dialect::MySql);
    assert_snapshot!(
        compiled.sql.text,
        @"SELECT customer_id, SUM(amount) AS _sum_amount FROM (SELECT * FROM orders WHERE status = ? ORDER BY created_at DESC LIMIT 50) AS _sub GROUP BY customer_id HAVING SUM(amount) > ?"
    );
    assert_eq!(
        compiled.sql.args,
        vec![Value::from("paid"), Value::Int(100)]
    );
}

#[test]
fn test_find_first_with_ordering() {
    let query = Query::new("users", Operation::FindFirst)
        .order_by(OrderBy::desc("created_at"))
        .order_by(OrderBy::asc("id"));
    assert_snapshot!(
        sql(query, Dialect::MySql),
        @"SELECT * FROM users ORDER BY created_at DESC, id ASC LIMIT 1"
    );
}

// ============================================================================
// Writes
// ============================================================================

fn upsert_query() -> Query {
    Query::new("users", Operation::Upsert).upsert(
        record_from_json(json!({"email": "ada@example.com", "name": "Ada"})),
        ["email"],
        record_from_json(json!({"name": "Ada L."})),
    )
}

#[test]
fn test_upsert_returning_by_dialect() {
    let pg = compile(upsert_query(), Dialect::Postgres, None).unwrap();
    validate(&pg.sql.text, Dialect::Postgres);
    assert_snapshot!(
        pg.sql.text,
        @"INSERT INTO users (email, name) VALUES ($1, $2) ON CONFLICT (email) DO UPDATE SET name = $3 RETURNING *"
    );
    assert_eq!(
        pg.sql.args,
        vec![
            Value::from("ada@example.com"),
            Value::from("Ada"),
            Value::from("Ada L.")
        ]
    );

    let sqlite = compile(upsert_query(), Dialect::Sqlite, None).unwrap();
    assert!(sqlite.sql.text.ends_with("RETURNING *"));

    let mysql = compile(upsert_query(), Dialect::MySql, None).unwrap();
    validate(&mysql.sql.text, Dialect::MySql);
    assert_snapshot!(
        mysql.sql.text,
        @"INSERT INTO users (email, name) VALUES (?, ?) ON DUPLICATE KEY UPDATE name = ?"
    );
    assert!(!mysql.sql.text.contains("RETURNING"));
}

#[test]
fn test_upsert_without_update_reuses_data() {
    let query = Query::new("users", Operation::Upsert).upsert(
        record_from_json(json!({"email": "ada@example.com", "name": "Ada"})),
        ["email"],
        Default::default(),
    );
    assert_snapshot!(
        sql(query, Dialect::Sqlite),
        @"INSERT INTO users (email, name) VALUES ($1, $2) ON CONFLICT (email) DO UPDATE SET email = $3, name = $4 RETURNING *"
    );
}

#[test]
fn test_malformed_upsert_is_rejected() {
    let no_data = Query::new("users", Operation::Upsert);
    assert_eq!(
        compile(no_data, Dialect::Postgres, None).unwrap_err(),
        CompileError::EmptyUpsertData
    );

    let no_keys = Query::new("users", Operation::Upsert).upsert(
        record_from_json(json!({"email": "a@b.com"})),
        Vec::<String>::new(),
        Default::default(),
    );
    assert_eq!(
        compile(no_keys, Dialect::Postgres, None).unwrap_err(),
        CompileError::EmptyUpsertKeys
    );
}

#[test]
fn test_upsert_unsupported_dialect() {
    use prismo::sql::dialect::SqlDialect;
    use prismo::sql::{Insert, OnConflict};
    use prismo::sql::expr::param;

    // The reference ANSI dialect has no conflict clause
    let ansi = prismo::sql::dialect::Ansi;
    let insert = Insert::into("users")
        .columns(["email"])
        .values([param("a@b.com")])
        .on_conflict(OnConflict::do_update(["email"], vec![("email".into(), param("a@b.com"))]));
    let err = insert.to_tokens(&ansi).unwrap_err();
    assert_eq!(err, DialectError::unsupported(ansi.name(), "upsert"));
}

#[test]
fn test_create_many_shape() {
    let rows = vec![
        record_from_json(json!({"name": "a", "email": "a@x.com"})),
        record_from_json(json!({"name": "b", "email": "b@x.com"})),
        record_from_json(json!({"name": "c", "email": "c@x.com"})),
    ];
    for dialect in [Dialect::Postgres, Dialect::MySql, Dialect::Sqlite] {
        let query = Query::new("users", Operation::CreateMany).create_many(rows.clone());
        let compiled = compile(query, dialect, None).unwrap();
        validate(&compiled.sql.text, dialect);
        let values = compiled.sql.text.split(" VALUES ").nth(1).unwrap();
        assert_eq!(values.matches('(').count(), 3, "{}", compiled.sql.text);
        assert_eq!(compiled.sql.args.len(), 3 * 2);
        assert_eq!(
            compiled.sql.text.contains("RETURNING *"),
            dialect != Dialect::MySql
        );
    }
}

#[test]
fn test_update_numbers_set_before_where() {
    let query = Query::new("users", Operation::Update)
        .data(record_from_json(json!({"name": "Bob", "age": 40})))
        .filter(Condition::equals("id", 7i64))
        .filter(Condition::is_null("deleted_at"));
    let compiled = compile(query, Dialect::Postgres, None).unwrap();
    validate(&compiled.sql.text, Dialect::Postgres);
    assert_snapshot!(
        compiled.sql.text,
        @"UPDATE users SET age = $1, name = $2 WHERE id = $3 AND deleted_at IS NULL"
    );
    assert_eq!(
        compiled.sql.args,
        vec![Value::Int(40), Value::from("Bob"), Value::Int(7)]
    );
}

// ============================================================================
// Options and purity
// ============================================================================

#[test]
fn test_quoted_identifiers() {
    let compiler = QueryCompiler::new(
        CompileOptions::default()
            .with_dialect(Dialect::Postgres)
            .with_quoted_identifiers(true),
    );
    let compiled = compiler
        .compile(Query::find_many("users").select(["id", "email"]).filter(Condition::equals("id", 1i64)))
        .unwrap();
    validate(&compiled.sql.text, Dialect::Postgres);
    assert_snapshot!(
        compiled.sql.text,
        @r#"SELECT "id", "email" FROM "users" WHERE "id" = $1"#
    );
}

#[test]
fn test_compilation_is_deterministic() {
    let query = Query::find_many("users")
        .filter(Condition::new("status", Operator::In, Value::array(["a", "b"])))
        .filter(Condition::contains("name", "x"))
        .order_by(OrderBy::asc("id"))
        .take(5);
    let first = compile(query.clone(), Dialect::Postgres, None).unwrap();
    let second = compile(query, Dialect::Postgres, None).unwrap();
    assert_eq!(first.sql.text, second.sql.text);
    assert_eq!(first.sql.args, second.sql.args);
}

#[test]
fn test_injection_attempts_are_rejected() {
    let bad_field = Query::find_many("users").filter(Condition::equals("id; DROP TABLE users", 1i64));
    assert!(matches!(
        compile(bad_field, Dialect::Postgres, None),
        Err(CompileError::InvalidIdentifier(_))
    ));

    let bad_model = Query::find_many("users u");
    assert!(matches!(
        compile(bad_model, Dialect::Postgres, None),
        Err(CompileError::InvalidIdentifier(_))
    ));

    let bad_having = Query::new("orders", Operation::Aggregate)
        .group_by(["customer_id"])
        .having(Condition::gt("SUM(amount) OR 1=1", 0i64));
    assert!(matches!(
        compile(bad_having, Dialect::Postgres, None),
        Err(CompileError::InvalidAggregateExpression(_))
    ));
}
