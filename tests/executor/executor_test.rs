//! Executor behavior against a scripted in-memory adapter.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use prismo::compile::{compile, CompiledQuery};
use prismo::executor::{
    AdapterError, AdapterResult, BufferedRows, DatabaseAdapter, ExecContext, ExecError,
    ExecOutcome, QueryExecutor, RowCursor, Transaction,
};
use prismo::mapper::MapError;
use prismo::model::{Condition, Operation, Query, Value};
use prismo::{record, Dialect};

#[derive(Default)]
struct Log {
    statements: Mutex<Vec<String>>,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
    rows_pulled: AtomicUsize,
}

impl Log {
    fn statements(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }
}

/// Scripted adapter: returns fixed rows, fails statements containing
/// `fail_on`, fails the cursor at row `fail_row`, and sleeps `delay` before
/// every call.
#[derive(Default)]
struct ScriptedAdapter {
    log: Arc<Log>,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    affected: u64,
    fail_on: Option<&'static str>,
    fail_row: Option<usize>,
    fail_rollback: bool,
    delay: Option<Duration>,
}

impl ScriptedAdapter {
    fn with_rows(columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
            ..Default::default()
        }
    }

    async fn call(&self, sql: &str) -> AdapterResult<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.log.statements.lock().unwrap().push(sql.to_string());
        match self.fail_on {
            Some(marker) if sql.contains(marker) => {
                Err(AdapterError::driver(format!("constraint violated: {marker}")))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl DatabaseAdapter for ScriptedAdapter {
    async fn query(
        &self,
        _ctx: &ExecContext,
        sql: &str,
        _args: &[Value],
    ) -> AdapterResult<Box<dyn RowCursor>> {
        self.call(sql).await?;
        Ok(Box::new(ScriptedCursor {
            log: Arc::clone(&self.log),
            rows: BufferedRows::new(self.columns.clone(), self.rows.clone()),
            fail_row: self.fail_row,
        }))
    }

    async fn execute(
        &self,
        _ctx: &ExecContext,
        sql: &str,
        _args: &[Value],
    ) -> AdapterResult<ExecOutcome> {
        self.call(sql).await?;
        Ok(ExecOutcome {
            rows_affected: self.affected,
        })
    }

    async fn begin(&self, _ctx: &ExecContext) -> AdapterResult<Box<dyn Transaction>> {
        Ok(Box::new(ScriptedTransaction {
            adapter: ScriptedAdapter {
                log: Arc::clone(&self.log),
                affected: 1,
                fail_on: self.fail_on,
                fail_rollback: self.fail_rollback,
                delay: self.delay,
                ..Default::default()
            },
        }))
    }
}

struct ScriptedCursor {
    log: Arc<Log>,
    rows: BufferedRows,
    fail_row: Option<usize>,
}

#[async_trait]
impl RowCursor for ScriptedCursor {
    fn columns(&self) -> &[String] {
        self.rows.columns()
    }

    async fn next_row(&mut self) -> AdapterResult<Option<Vec<Value>>> {
        let index = self.log.rows_pulled.fetch_add(1, Ordering::SeqCst);
        if self.fail_row == Some(index) {
            return Err(AdapterError::driver("connection lost mid-result"));
        }
        self.rows.next_row().await
    }
}

struct ScriptedTransaction {
    adapter: ScriptedAdapter,
}

#[async_trait]
impl Transaction for ScriptedTransaction {
    async fn execute(
        &mut self,
        ctx: &ExecContext,
        sql: &str,
        args: &[Value],
    ) -> AdapterResult<ExecOutcome> {
        self.adapter.execute(ctx, sql, args).await
    }

    async fn commit(self: Box<Self>, _ctx: &ExecContext) -> AdapterResult<()> {
        self.adapter.log.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(self: Box<Self>, _ctx: &ExecContext) -> AdapterResult<()> {
        self.adapter.log.rollbacks.fetch_add(1, Ordering::SeqCst);
        if self.adapter.fail_rollback {
            return Err(AdapterError::driver("connection reset"));
        }
        Ok(())
    }
}

fn raw(sql: &str) -> CompiledQuery {
    CompiledQuery::raw("users", sql, Vec::new())
}

// ============================================================================
// Reads
// ============================================================================

#[tokio::test]
async fn test_execute_returns_records() {
    let adapter = ScriptedAdapter::with_rows(
        &["id", "email", "avatar"],
        vec![
            vec![Value::Int(1), Value::from("a@x.com"), Value::Bytes(b"png".to_vec())],
            vec![Value::Int(2), Value::from("b@x.com"), Value::Null],
        ],
    );
    let executor = QueryExecutor::new(Arc::new(adapter));
    let compiled = compile(Query::find_many("users"), Dialect::Postgres, None).unwrap();

    let records = executor
        .execute(&ExecContext::background(), &compiled)
        .await
        .unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["id"], Value::Int(1));
    assert_eq!(records[0]["avatar"], Value::from("png"));
    assert_eq!(records[1]["avatar"], Value::Null);
}

#[tokio::test]
async fn test_empty_result_is_not_an_error_by_default() {
    let executor = QueryExecutor::new(Arc::new(ScriptedAdapter::with_rows(&["id"], vec![])));
    let compiled = compile(Query::find_many("users"), Dialect::Postgres, None).unwrap();
    let records = executor
        .execute(&ExecContext::background(), &compiled)
        .await
        .unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_throw_if_not_found() {
    let executor = QueryExecutor::new(Arc::new(ScriptedAdapter::with_rows(&["id"], vec![])));
    let query = Query::new("users", Operation::FindFirst)
        .filter(Condition::equals("id", 42i64))
        .throw_if_not_found();
    let compiled = compile(query, Dialect::Postgres, None).unwrap();

    let err = executor
        .execute(&ExecContext::background(), &compiled)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "no users record found");
}

#[tokio::test]
async fn test_query_failure_names_model() {
    let adapter = ScriptedAdapter {
        fail_on: Some("FROM users"),
        ..Default::default()
    };
    let executor = QueryExecutor::new(Arc::new(adapter));
    let compiled = compile(Query::find_many("users"), Dialect::Postgres, None).unwrap();

    let err = executor
        .execute(&ExecContext::background(), &compiled)
        .await
        .unwrap_err();
    assert!(matches!(&err, ExecError::Query { model, .. } if model == "users"));
    assert!(!err.is_not_found());
}

#[tokio::test]
async fn test_batch_reports_failing_index() {
    let adapter = ScriptedAdapter {
        fail_on: Some("FROM audit"),
        ..Default::default()
    };
    let log = Arc::clone(&adapter.log);
    let executor = QueryExecutor::new(Arc::new(adapter));
    let batch = vec![
        raw("SELECT * FROM users"),
        raw("SELECT * FROM audit"),
        raw("SELECT * FROM posts"),
    ];

    let err = executor
        .execute_batch(&ExecContext::background(), &batch)
        .await
        .unwrap_err();
    assert!(matches!(err, ExecError::Batch { index: 1, .. }));
    // Execution stops at the first failure
    assert_eq!(log.statements().len(), 2);
}

#[tokio::test]
async fn test_scan_failure_stops_reading() {
    let adapter = ScriptedAdapter {
        fail_row: Some(1),
        ..ScriptedAdapter::with_rows(
            &["id"],
            vec![vec![Value::Int(1)], vec![Value::Int(2)], vec![Value::Int(3)]],
        )
    };
    let log = Arc::clone(&adapter.log);
    let executor = QueryExecutor::new(Arc::new(adapter));
    let compiled = compile(Query::find_many("users"), Dialect::Postgres, None).unwrap();

    let err = executor
        .execute(&ExecContext::background(), &compiled)
        .await
        .unwrap_err();
    assert!(
        matches!(err, ExecError::Scan { row: 1, source: AdapterError::Driver(_) }),
        "{err}"
    );
    // Row 3 is never pulled
    assert_eq!(log.rows_pulled.load(Ordering::SeqCst), 2);
}

// ============================================================================
// Mapping
// ============================================================================

record! {
    #[derive(Debug, PartialEq)]
    struct User {
        id: i64,
        #[field(serialize = "email")]
        email_address: String,
        nickname: Option<String>,
    }
}

record! {
    #[derive(Debug)]
    struct Strict {
        id: bool,
    }
}

#[tokio::test]
async fn test_execute_into_typed_records() {
    let adapter = ScriptedAdapter::with_rows(
        &["ID", "EMAIL", "nickname", "extra"],
        vec![vec![
            Value::Int(7),
            Value::Bytes(b"ada@example.com".to_vec()),
            Value::Null,
            Value::from("ignored"),
        ]],
    );
    let executor = QueryExecutor::new(Arc::new(adapter));
    let compiled = compile(Query::find_many("users"), Dialect::Postgres, None).unwrap();

    let users: Vec<User> = executor
        .execute_into(&ExecContext::background(), &compiled)
        .await
        .unwrap();
    assert_eq!(
        users,
        vec![User {
            id: 7,
            email_address: "ada@example.com".into(),
            nickname: None,
        }]
    );
}

#[tokio::test]
async fn test_execute_into_mapping_failure() {
    let adapter = ScriptedAdapter::with_rows(&["id"], vec![vec![Value::from("seven")]]);
    let executor = QueryExecutor::new(Arc::new(adapter));
    let compiled = compile(Query::find_many("users"), Dialect::Postgres, None).unwrap();

    let err = executor
        .execute_into::<Strict>(&ExecContext::background(), &compiled)
        .await
        .unwrap_err();
    match err {
        ExecError::Mapping { target, source } => {
            assert!(target.ends_with("Strict"));
            assert!(matches!(source, MapError::Field { ref field, .. } if field == "id"));
        }
        other => panic!("expected Mapping, got {other:?}"),
    }
}

// ============================================================================
// Mutations
// ============================================================================

#[tokio::test]
async fn test_execute_mutation_returns_affected_rows() {
    let adapter = ScriptedAdapter {
        affected: 3,
        ..Default::default()
    };
    let executor = QueryExecutor::new(Arc::new(adapter));
    let compiled = compile(
        Query::new("sessions", Operation::Delete).filter(Condition::is_null("user_id")),
        Dialect::MySql,
        None,
    )
    .unwrap();

    let affected = executor
        .execute_mutation(&ExecContext::background(), &compiled)
        .await
        .unwrap();
    assert_eq!(affected, 3);
}

// ============================================================================
// Nested writes
// ============================================================================

#[tokio::test]
async fn test_nested_writes_commit_once() {
    let adapter = ScriptedAdapter::default();
    let log = Arc::clone(&adapter.log);
    let executor = QueryExecutor::new(Arc::new(adapter));

    executor
        .execute_nested_writes(
            &ExecContext::background(),
            &[raw("INSERT INTO users (id) VALUES (1)"), raw("INSERT INTO posts (id) VALUES (1)")],
        )
        .await
        .unwrap();

    assert_eq!(log.statements().len(), 2);
    assert_eq!(log.commits.load(Ordering::SeqCst), 1);
    assert_eq!(log.rollbacks.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_nested_write_failure_rolls_back_once() {
    let adapter = ScriptedAdapter {
        fail_on: Some("posts"),
        ..Default::default()
    };
    let log = Arc::clone(&adapter.log);
    let executor = QueryExecutor::new(Arc::new(adapter));

    let err = executor
        .execute_nested_writes(
            &ExecContext::background(),
            &[
                raw("INSERT INTO users (id) VALUES (1)"),
                raw("INSERT INTO posts (id) VALUES (1)"),
                raw("INSERT INTO comments (id) VALUES (1)"),
            ],
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ExecError::Statement { index: 1, .. }));
    assert_eq!(log.statements().len(), 2);
    assert_eq!(log.commits.load(Ordering::SeqCst), 0);
    assert_eq!(log.rollbacks.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failed_rollback_keeps_both_errors() {
    let adapter = ScriptedAdapter {
        fail_on: Some("posts"),
        fail_rollback: true,
        ..Default::default()
    };
    let executor = QueryExecutor::new(Arc::new(adapter));

    let err = executor
        .execute_nested_writes(
            &ExecContext::background(),
            &[raw("INSERT INTO posts (id) VALUES (1)")],
        )
        .await
        .unwrap_err();

    match &err {
        ExecError::RollbackFailed { source, rollback } => {
            assert!(matches!(**source, ExecError::Statement { index: 0, .. }));
            assert_eq!(rollback.to_string(), "connection reset");
        }
        other => panic!("expected RollbackFailed, got {other:?}"),
    }
    let message = err.to_string();
    assert!(message.contains("constraint violated"));
    assert!(message.contains("rollback also failed: connection reset"));
}

// ============================================================================
// Cancellation and deadlines
// ============================================================================

#[tokio::test]
async fn test_deadline_interrupts_query() {
    let adapter = ScriptedAdapter {
        delay: Some(Duration::from_secs(5)),
        ..Default::default()
    };
    let executor = QueryExecutor::new(Arc::new(adapter));
    let ctx = ExecContext::background().with_timeout(Duration::from_millis(20));

    let err = executor.execute(&ctx, &raw("SELECT 1")).await.unwrap_err();
    assert!(matches!(err, ExecError::Timeout(limit) if limit == Duration::from_millis(20)));
    assert!(err.is_interrupted());
}

#[tokio::test]
async fn test_cancelled_context_never_reaches_adapter() {
    let adapter = ScriptedAdapter::default();
    let log = Arc::clone(&adapter.log);
    let executor = QueryExecutor::new(Arc::new(adapter));
    let (ctx, handle) = ExecContext::background().cancellable();
    handle.cancel();

    let err = executor
        .execute_mutation(&ctx, &raw("DELETE FROM users"))
        .await
        .unwrap_err();
    assert!(matches!(err, ExecError::Cancelled));
    assert!(log.statements().is_empty());
}

#[tokio::test]
async fn test_timeout_inside_transaction_still_rolls_back() {
    let adapter = ScriptedAdapter {
        delay: Some(Duration::from_millis(200)),
        ..Default::default()
    };
    let log = Arc::clone(&adapter.log);
    let executor = QueryExecutor::new(Arc::new(adapter));
    let ctx = ExecContext::background().with_timeout(Duration::from_millis(50));

    let err = executor
        .execute_nested_writes(&ctx, &[raw("INSERT INTO users (id) VALUES (1)")])
        .await
        .unwrap_err();

    assert!(matches!(err, ExecError::Timeout(_)));
    assert_eq!(log.commits.load(Ordering::SeqCst), 0);
    assert_eq!(log.rollbacks.load(Ordering::SeqCst), 1);
}
