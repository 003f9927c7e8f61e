//! Database adapter boundary.
//!
//! The executor never talks to a driver directly; it goes through these
//! traits. Implementations receive the [`ExecContext`] so they can honor
//! deadlines on their own network operations, but the executor also races
//! every call against the context itself.

use async_trait::async_trait;

use super::context::ExecContext;
use super::error::AdapterResult;
use crate::model::Value;

/// Outcome of a statement that returns no rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecOutcome {
    pub rows_affected: u64,
}

/// A database connection (or pool) the executor can run statements on.
#[async_trait]
pub trait DatabaseAdapter: Send + Sync {
    /// Run a row-returning statement.
    async fn query(
        &self,
        ctx: &ExecContext,
        sql: &str,
        args: &[Value],
    ) -> AdapterResult<Box<dyn RowCursor>>;

    /// Run a statement and report the affected-row count.
    async fn execute(&self, ctx: &ExecContext, sql: &str, args: &[Value])
        -> AdapterResult<ExecOutcome>;

    /// Open a transaction.
    async fn begin(&self, ctx: &ExecContext) -> AdapterResult<Box<dyn Transaction>>;
}

/// An open transaction. Consumed by `commit` or `rollback`.
#[async_trait]
pub trait Transaction: Send {
    async fn execute(
        &mut self,
        ctx: &ExecContext,
        sql: &str,
        args: &[Value],
    ) -> AdapterResult<ExecOutcome>;

    async fn commit(self: Box<Self>, ctx: &ExecContext) -> AdapterResult<()>;

    async fn rollback(self: Box<Self>, ctx: &ExecContext) -> AdapterResult<()>;
}

/// Forward-only iteration over a result set.
#[async_trait]
pub trait RowCursor: Send {
    /// Column names, in row order.
    fn columns(&self) -> &[String];

    /// The next row's values, or `None` when the result set is exhausted.
    async fn next_row(&mut self) -> AdapterResult<Option<Vec<Value>>>;

    /// Release the cursor and report any error deferred by the driver.
    async fn close(&mut self) -> AdapterResult<()> {
        Ok(())
    }
}

/// A fully buffered result set.
#[derive(Debug, Clone, Default)]
pub struct BufferedRows {
    columns: Vec<String>,
    rows: std::vec::IntoIter<Vec<Value>>,
}

impl BufferedRows {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns,
            rows: rows.into_iter(),
        }
    }
}

#[async_trait]
impl RowCursor for BufferedRows {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    async fn next_row(&mut self) -> AdapterResult<Option<Vec<Value>>> {
        Ok(self.rows.next())
    }
}
