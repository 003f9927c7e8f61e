//! SQLite adapter on top of `rusqlite`.
//!
//! One connection behind an async mutex. Every driver call runs on the
//! blocking pool and is interrupted if its context fires first. A
//! transaction holds the connection from `BEGIN` until it commits or rolls
//! back; dropping it unfinished rolls back.

use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use async_trait::async_trait;
use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{params_from_iter, Connection, InterruptHandle, ToSql};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::warn;

use super::adapter::{BufferedRows, DatabaseAdapter, ExecOutcome, RowCursor, Transaction};
use super::context::ExecContext;
use super::error::{AdapterError, AdapterResult};
use crate::model::{Value, TIMESTAMP_FORMAT};

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        use rusqlite::types::Value as Sql;

        Ok(match self {
            Value::Null => ToSqlOutput::Owned(Sql::Null),
            Value::Bool(b) => ToSqlOutput::Owned(Sql::Integer(i64::from(*b))),
            Value::Int(n) => ToSqlOutput::Owned(Sql::Integer(*n)),
            Value::Int32(n) => ToSqlOutput::Owned(Sql::Integer(i64::from(*n))),
            Value::Float(f) => ToSqlOutput::Owned(Sql::Real(*f)),
            Value::Float32(f) => ToSqlOutput::Owned(Sql::Real(f64::from(*f))),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Bytes(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
            Value::Timestamp(ts) => {
                ToSqlOutput::Owned(Sql::Text(ts.format(TIMESTAMP_FORMAT).to_string()))
            }
            Value::Array(_) => {
                return Err(rusqlite::Error::ToSqlConversionFailure(
                    "sqlite cannot bind array values".into(),
                ))
            }
        })
    }
}

fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(n) => Value::Int(n),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Bytes(b.to_vec()),
    }
}

fn check_args(args: &[Value]) -> AdapterResult<()> {
    match args.iter().position(|arg| matches!(arg, Value::Array(_))) {
        Some(index) => Err(AdapterError::Unbindable {
            index: index + 1,
            kind: "array",
        }),
        None => Ok(()),
    }
}

fn query_all(conn: &Connection, sql: &str, args: &[Value]) -> rusqlite::Result<BufferedRows> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let mut rows = stmt.query(params_from_iter(args.iter()))?;

    let mut buffered = Vec::new();
    while let Some(row) = rows.next()? {
        let values = (0..columns.len())
            .map(|i| row.get_ref(i).map(from_sql))
            .collect::<rusqlite::Result<Vec<_>>>()?;
        buffered.push(values);
    }
    Ok(BufferedRows::new(columns, buffered))
}

fn execute(conn: &Connection, sql: &str, args: &[Value]) -> rusqlite::Result<ExecOutcome> {
    let mut stmt = conn.prepare(sql)?;
    let params = params_from_iter(args.iter());
    let rows_affected = if stmt.column_count() == 0 {
        stmt.execute(params)? as u64
    } else {
        // RETURNING yields one row per written row
        let mut rows = stmt.query(params)?;
        let mut written = 0;
        while rows.next()?.is_some() {
            written += 1;
        }
        written
    };
    Ok(ExecOutcome { rows_affected })
}

/// Interrupts the statement of a blocking call whose caller went away.
///
/// Armed while the call holds the connection. Dropping it before the call
/// reports back through [`CallDone`] runs `sqlite3_interrupt`.
struct InterruptOnDrop {
    handle: InterruptHandle,
    running: Arc<StdMutex<bool>>,
}

struct CallDone(Arc<StdMutex<bool>>);

impl InterruptOnDrop {
    fn arm(conn: &Connection) -> (Self, CallDone) {
        let running = Arc::new(StdMutex::new(true));
        let guard = Self {
            handle: conn.get_interrupt_handle(),
            running: Arc::clone(&running),
        };
        (guard, CallDone(running))
    }
}

impl Drop for InterruptOnDrop {
    fn drop(&mut self) {
        // Held across the interrupt so the call cannot release the connection
        // to another statement in between
        let running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        if *running {
            self.handle.interrupt();
        }
    }
}

impl CallDone {
    fn mark(self) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = false;
    }
}

/// Wait for `work` unless `ctx` is cancelled or passes its deadline first.
async fn within<T>(ctx: &ExecContext, work: impl Future<Output = T>) -> AdapterResult<T> {
    tokio::select! {
        out = work => Ok(out),
        () = ctx.done() => Err(AdapterError::Abandoned),
    }
}

/// [`DatabaseAdapter`] for an embedded SQLite database.
#[derive(Clone)]
pub struct SqliteAdapter {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteAdapter {
    pub fn open(path: impl AsRef<Path>) -> AdapterResult<Self> {
        Ok(Self::from_connection(Connection::open(path)?))
    }

    pub fn open_in_memory() -> AdapterResult<Self> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Run a script of `;`-separated statements with no arguments.
    pub async fn execute_batch(&self, sql: &str) -> AdapterResult<()> {
        let sql = sql.to_string();
        self.with_conn(&ExecContext::background(), move |conn| conn.execute_batch(&sql))
            .await
    }

    async fn lock(&self, ctx: &ExecContext) -> AdapterResult<OwnedMutexGuard<Connection>> {
        within(ctx, Arc::clone(&self.conn).lock_owned()).await
    }

    async fn with_conn<T, F>(&self, ctx: &ExecContext, f: F) -> AdapterResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let guard = self.lock(ctx).await?;
        let (_interrupt, done) = InterruptOnDrop::arm(&guard);
        let task = tokio::task::spawn_blocking(move || {
            let result = f(&guard);
            done.mark();
            result
        });
        Ok(within(ctx, task).await???)
    }
}

#[async_trait]
impl DatabaseAdapter for SqliteAdapter {
    async fn query(
        &self,
        ctx: &ExecContext,
        sql: &str,
        args: &[Value],
    ) -> AdapterResult<Box<dyn RowCursor>> {
        check_args(args)?;
        let (sql, args) = (sql.to_string(), args.to_vec());
        let rows = self
            .with_conn(ctx, move |conn| query_all(conn, &sql, &args))
            .await?;
        Ok(Box::new(rows))
    }

    async fn execute(
        &self,
        ctx: &ExecContext,
        sql: &str,
        args: &[Value],
    ) -> AdapterResult<ExecOutcome> {
        check_args(args)?;
        let (sql, args) = (sql.to_string(), args.to_vec());
        self.with_conn(ctx, move |conn| execute(conn, &sql, &args))
            .await
    }

    async fn begin(&self, ctx: &ExecContext) -> AdapterResult<Box<dyn Transaction>> {
        let guard = self.lock(ctx).await?;
        // Built on the blocking thread: if this call is abandoned, the
        // discarded `TxConn` rolls the transaction back
        let task = tokio::task::spawn_blocking(move || TxConn::begin(guard));
        let tx = within(ctx, task).await???;
        Ok(Box::new(SqliteTransaction {
            shared: Arc::clone(&self.conn),
            conn: Some(tx),
        }))
    }
}

/// The connection lock held from `BEGIN` to `COMMIT`/`ROLLBACK`.
///
/// Dropping it while the transaction is still open rolls back, which blocks.
struct TxConn {
    guard: OwnedMutexGuard<Connection>,
    open: bool,
}

impl TxConn {
    fn begin(guard: OwnedMutexGuard<Connection>) -> rusqlite::Result<Self> {
        guard.execute_batch("BEGIN")?;
        Ok(Self { guard, open: true })
    }

    fn finish(&mut self, sql: &str) -> rusqlite::Result<()> {
        self.guard.execute_batch(sql)?;
        self.open = false;
        Ok(())
    }
}

impl Drop for TxConn {
    fn drop(&mut self) {
        if self.open {
            if let Err(err) = self.guard.execute_batch("ROLLBACK") {
                warn!(error = %err, "rollback of abandoned transaction failed");
            }
        }
    }
}

/// Transaction holding the adapter's connection.
struct SqliteTransaction {
    shared: Arc<Mutex<Connection>>,
    // `None` once an abandoned call took the connection with it
    conn: Option<TxConn>,
}

impl SqliteTransaction {
    async fn run<T, F>(&mut self, ctx: &ExecContext, f: F) -> AdapterResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut TxConn) -> rusqlite::Result<T> + Send + 'static,
    {
        let mut tx = self.conn.take().ok_or(AdapterError::Interrupted)?;
        let (_interrupt, done) = InterruptOnDrop::arm(&tx.guard);
        let task = tokio::task::spawn_blocking(move || {
            let result = f(&mut tx);
            done.mark();
            (tx, result)
        });
        let (tx, result) = within(ctx, task).await??;
        self.conn = Some(tx);
        Ok(result?)
    }
}

#[async_trait]
impl Transaction for SqliteTransaction {
    async fn execute(
        &mut self,
        ctx: &ExecContext,
        sql: &str,
        args: &[Value],
    ) -> AdapterResult<ExecOutcome> {
        check_args(args)?;
        let (sql, args) = (sql.to_string(), args.to_vec());
        self.run(ctx, move |tx| execute(&tx.guard, &sql, &args))
            .await
    }

    async fn commit(mut self: Box<Self>, ctx: &ExecContext) -> AdapterResult<()> {
        self.run(ctx, |tx| tx.finish("COMMIT")).await
    }

    async fn rollback(mut self: Box<Self>, _ctx: &ExecContext) -> AdapterResult<()> {
        if self.conn.is_none() {
            // The abandoned call's `TxConn` rolls back before it unlocks
            drop(self.shared.lock().await);
            return Ok(());
        }
        self.run(&ExecContext::background(), |tx| tx.finish("ROLLBACK"))
            .await
    }
}

impl Drop for SqliteTransaction {
    fn drop(&mut self) {
        let Some(tx) = self.conn.take() else {
            return;
        };
        if !tx.open {
            return;
        }
        // Keep the blocking ROLLBACK off the async worker
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn_blocking(move || drop(tx));
            }
            Err(_) => drop(tx),
        }
    }
}
