//! Integration tests for relation inclusion through the metadata registry.

use insta::assert_snapshot;
use prismo::compile::{compile, CompileError, CompileOptions, QueryCompiler, RelationPolicy};
use prismo::metadata::{MetadataError, RelationMetadata, RelationType, StaticRegistry};
use prismo::model::{Condition, Operation, Query, RelationInclusion, Value};
use prismo::sql::Dialect;
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

fn registry() -> StaticRegistry {
    StaticRegistry::builder()
        .table("User", "users")
        .table("Post", "posts")
        .table("Comment", "comments")
        .table("Tag", "tags")
        .column("User", "emailAddress", "email_address")
        .relation(
            "posts",
            RelationMetadata::new("User", "Post", RelationType::OneToMany)
                .fields(["author_id"], ["id"]),
        )
        .relation(
            "author",
            RelationMetadata::new("Post", "User", RelationType::ManyToOne)
                .fields(["author_id"], ["id"]),
        )
        .relation(
            "comments",
            RelationMetadata::new("Post", "Comment", RelationType::OneToMany)
                .fields(["post_id"], ["id"]),
        )
        .relation(
            "tags",
            RelationMetadata::new("Post", "Tag", RelationType::ManyToMany),
        )
        .build()
}

fn validate(sql: &str) {
    if let Err(e) = Parser::parse_sql(&PostgreSqlDialect {}, sql) {
        panic!("invalid SQL: {e}\nSQL: {sql}");
    }
}

#[test]
fn test_simple_include() {
    let reg = registry();
    let query = Query::find_many("User").include(RelationInclusion::new("posts"));
    let compiled = compile(query, Dialect::Postgres, Some(&reg)).unwrap();
    validate(&compiled.sql.text);
    assert_snapshot!(
        compiled.sql.text,
        @"SELECT users.*, users_posts.* FROM users LEFT JOIN posts AS users_posts ON users_posts.author_id = users.id"
    );
    assert!(compiled.sql.args.is_empty());
}

#[test]
fn test_many_to_one_include() {
    let reg = registry();
    let query = Query::find_many("Post").include(RelationInclusion::new("author"));
    let compiled = compile(query, Dialect::MySql, Some(&reg)).unwrap();
    assert_snapshot!(
        compiled.sql.text,
        @"SELECT posts.*, posts_author.* FROM posts LEFT JOIN users AS posts_author ON posts_author.id = posts.author_id"
    );
}

#[test]
fn test_nested_include_binds_join_filters_before_where() {
    let reg = registry();
    let posts = Query::find_many("Post")
        .filter(Condition::equals("published", true))
        .select(["id", "title"])
        .include(RelationInclusion::new("comments"));
    let query = Query::find_many("User")
        .filter(Condition::equals("role", "admin"))
        .include(RelationInclusion::new("posts").with_query(posts));

    let compiled = compile(query, Dialect::Postgres, Some(&reg)).unwrap();
    validate(&compiled.sql.text);
    assert_snapshot!(
        compiled.sql.text,
        @"SELECT users.*, users_posts.id AS posts_id, users_posts.title AS posts_title, users_posts_comments.* FROM users LEFT JOIN posts AS users_posts ON users_posts.author_id = users.id AND users_posts.published = $1 LEFT JOIN comments AS users_posts_comments ON users_posts_comments.post_id = users_posts.id WHERE users.role = $2"
    );
    assert_eq!(
        compiled.sql.args,
        vec![Value::Bool(true), Value::from("admin")]
    );
}

#[test]
fn test_registry_column_names_are_used() {
    let reg = registry();
    let query = Query::find_many("User")
        .filter(Condition::equals("emailAddress", "ada@example.com"))
        .include(RelationInclusion::new("posts"));
    let compiled = compile(query, Dialect::Postgres, Some(&reg)).unwrap();
    assert!(compiled
        .sql
        .text
        .ends_with("WHERE users.email_address = $1"));
}

#[test]
fn test_unknown_relation_fails_by_default() {
    let reg = registry();
    let query = Query::find_many("User").include(RelationInclusion::new("followers"));
    let err = compile(query, Dialect::Postgres, Some(&reg)).unwrap_err();
    match err {
        CompileError::UnknownRelation {
            model,
            relation,
            source,
        } => {
            assert_eq!(model, "User");
            assert_eq!(relation, "followers");
            assert!(matches!(source, MetadataError::RelationNotFound { .. }));
        }
        other => panic!("expected UnknownRelation, got {other:?}"),
    }
}

#[test]
fn test_unknown_relation_can_be_skipped() {
    let reg = registry();
    let compiler = QueryCompiler::new(
        CompileOptions::default().with_relation_policy(RelationPolicy::Skip),
    )
    .with_registry(&reg);
    let query = Query::find_many("User")
        .include(RelationInclusion::new("followers"))
        .include(RelationInclusion::new("posts"));
    let compiled = compiler.compile(query).unwrap();
    assert_eq!(
        compiled.sql.text,
        "SELECT users.*, users_posts.* FROM users LEFT JOIN posts AS users_posts ON users_posts.author_id = users.id"
    );
}

#[test]
fn test_only_skipped_relations_leave_plain_select() {
    let reg = registry();
    let compiler = QueryCompiler::new(
        CompileOptions::default().with_relation_policy(RelationPolicy::Skip),
    )
    .with_registry(&reg);
    let compiled = compiler
        .compile(Query::find_many("User").include(RelationInclusion::new("followers")))
        .unwrap();
    assert_eq!(compiled.sql.text, "SELECT * FROM users");
}

#[test]
fn test_many_to_many_is_rejected() {
    let reg = registry();
    let query = Query::find_many("Post").include(RelationInclusion::new("tags"));
    assert_eq!(
        compile(query, Dialect::Postgres, Some(&reg)).unwrap_err(),
        CompileError::ManyToManyRelation {
            model: "Post".into(),
            relation: "tags".into(),
        }
    );
}

#[test]
fn test_depth_bound() {
    let reg = registry();
    let query = Query::find_many("User").include(
        RelationInclusion::new("posts")
            .with_query(Query::find_many("Post").include(RelationInclusion::new("comments"))),
    );

    let shallow = QueryCompiler::new(CompileOptions::default().with_max_relation_depth(1))
        .with_registry(&reg);
    assert_eq!(
        shallow.compile(query.clone()).unwrap_err(),
        CompileError::RelationDepthExceeded { max: 1 }
    );

    let deep = QueryCompiler::new(CompileOptions::default().with_max_relation_depth(2))
        .with_registry(&reg);
    assert!(deep.compile(query).is_ok());
}

#[test]
fn test_include_without_registry() {
    let query = Query::find_many("User").include(RelationInclusion::new("posts"));
    assert_eq!(
        compile(query, Dialect::Postgres, None).unwrap_err(),
        CompileError::MissingRegistry
    );
}

#[test]
fn test_relations_ignored_for_count() {
    let reg = registry();
    let query = Query::new("User", Operation::Count).include(RelationInclusion::new("posts"));
    let compiled = compile(query, Dialect::Postgres, Some(&reg)).unwrap();
    assert_eq!(compiled.sql.text, "SELECT COUNT(*) AS _count FROM users");
}

#[test]
fn test_registry_shared_across_threads() {
    let reg = registry();
    std::thread::scope(|scope| {
        let handles: Vec<_> = [Dialect::Postgres, Dialect::MySql, Dialect::Sqlite]
            .into_iter()
            .map(|dialect| {
                let reg = &reg;
                scope.spawn(move || {
                    let query = Query::find_many("User").include(RelationInclusion::new("posts"));
                    compile(query, dialect, Some(reg)).unwrap().sql.text
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap().contains("LEFT JOIN posts AS users_posts"));
        }
    });
}
