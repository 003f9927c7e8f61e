//! Query executor.
//!
//! Runs [`CompiledQuery`]s through a [`DatabaseAdapter`]. Rows are scanned
//! into generic [`Record`]s and, on request, mapped into typed structs.
//!
//! Every operation is a single statement except
//! [`QueryExecutor::execute_nested_writes`], which runs its statements in
//! one transaction. Nothing here retries.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use prismo::executor::{ExecContext, QueryExecutor, SqliteAdapter};
//! use prismo::model::{Condition, Query};
//! use prismo::{compile, Dialect};
//!
//! let executor = QueryExecutor::new(Arc::new(SqliteAdapter::open_in_memory()?));
//! let query = Query::find_many("users").filter(Condition::equals("active", true));
//! let compiled = compile(query, Dialect::Sqlite, None)?;
//! let rows = executor.execute(&ExecContext::background(), &compiled).await?;
//! # Ok(())
//! # }
//! ```

mod adapter;
mod context;
mod error;
mod sqlite;

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::compile::CompiledQuery;
use crate::mapper::{map_to_records, row_to_record, FromRecord};
use crate::model::Record;

pub use adapter::{BufferedRows, DatabaseAdapter, ExecOutcome, RowCursor, Transaction};
pub use context::{CancelHandle, ExecContext};
pub use error::{AdapterError, AdapterResult, BoxError, ExecError, ExecResult};
pub use sqlite::SqliteAdapter;

/// Executes compiled statements through a database adapter.
#[derive(Clone)]
pub struct QueryExecutor {
    adapter: Arc<dyn DatabaseAdapter>,
}

impl QueryExecutor {
    pub fn new(adapter: Arc<dyn DatabaseAdapter>) -> Self {
        Self { adapter }
    }

    pub fn adapter(&self) -> &Arc<dyn DatabaseAdapter> {
        &self.adapter
    }

    /// Run a row-returning statement and collect its rows.
    ///
    /// Fails with [`ExecError::NotFound`] when the query was built with
    /// `throw_if_not_found` and no rows came back.
    pub async fn execute(
        &self,
        ctx: &ExecContext,
        compiled: &CompiledQuery,
    ) -> ExecResult<Vec<Record>> {
        let model = &compiled.mapping.model;
        let sql = &compiled.sql;
        debug!(model = %model, sql = %sql.text, args = sql.args.len(), "executing query");

        let mut cursor = ctx
            .run(self.adapter.query(ctx, &sql.text, &sql.args), |source| {
                ExecError::Query {
                    model: model.clone(),
                    source,
                }
            })
            .await?;

        let columns = cursor.columns().to_vec();
        let mut records = Vec::new();
        loop {
            let row = records.len();
            let next = ctx
                .run(cursor.next_row(), |source| ExecError::Scan { row, source })
                .await?;
            let Some(values) = next else {
                break;
            };
            let record = row_to_record(&columns, values).map_err(|source| ExecError::Mapping {
                target: "Record",
                source,
            })?;
            records.push(record);
        }
        let row = records.len();
        ctx.run(cursor.close(), |source| ExecError::Scan { row, source })
            .await?;

        if records.is_empty() && compiled.throw_if_not_found() {
            return Err(ExecError::NotFound {
                model: model.clone(),
            });
        }
        Ok(records)
    }

    /// Run statements one after another, stopping at the first failure.
    ///
    /// Not transactional: statements before the failing one stay applied.
    pub async fn execute_batch(
        &self,
        ctx: &ExecContext,
        batch: &[CompiledQuery],
    ) -> ExecResult<Vec<Vec<Record>>> {
        let mut results = Vec::with_capacity(batch.len());
        for (index, compiled) in batch.iter().enumerate() {
            let records = self
                .execute(ctx, compiled)
                .await
                .map_err(|source| ExecError::Batch {
                    index,
                    source: Box::new(source),
                })?;
            results.push(records);
        }
        Ok(results)
    }

    /// Run a row-returning statement and map its rows into `T`.
    pub async fn execute_into<T: FromRecord>(
        &self,
        ctx: &ExecContext,
        compiled: &CompiledQuery,
    ) -> ExecResult<Vec<T>> {
        let records = self.execute(ctx, compiled).await?;
        map_to_records(&records).map_err(|source| ExecError::Mapping {
            target: std::any::type_name::<T>(),
            source,
        })
    }

    /// Run an UPDATE/DELETE-shaped statement and return the affected-row count.
    pub async fn execute_mutation(
        &self,
        ctx: &ExecContext,
        compiled: &CompiledQuery,
    ) -> ExecResult<u64> {
        let model = &compiled.mapping.model;
        let sql = &compiled.sql;
        debug!(model = %model, sql = %sql.text, args = sql.args.len(), "executing mutation");

        let outcome = ctx
            .run(self.adapter.execute(ctx, &sql.text, &sql.args), |source| {
                ExecError::Mutation {
                    model: model.clone(),
                    source,
                }
            })
            .await?;
        Ok(outcome.rows_affected)
    }

    /// Run every statement in one transaction.
    ///
    /// The first failure rolls the transaction back exactly once and commit
    /// is never attempted. A failed rollback is reported together with the
    /// statement failure.
    pub async fn execute_nested_writes(
        &self,
        ctx: &ExecContext,
        statements: &[CompiledQuery],
    ) -> ExecResult<()> {
        let mut tx = ctx.run(self.adapter.begin(ctx), ExecError::Begin).await?;
        info!(statements = statements.len(), "transaction started");

        for (index, compiled) in statements.iter().enumerate() {
            let sql = &compiled.sql;
            debug!(
                model = %compiled.mapping.model,
                sql = %sql.text,
                args = sql.args.len(),
                index,
                "executing nested write"
            );

            let result = ctx
                .run(tx.execute(ctx, &sql.text, &sql.args), |source| {
                    ExecError::Statement { index, source }
                })
                .await;

            if let Err(err) = result {
                warn!(index, error = %err, "nested write failed, rolling back");
                // The rollback must run even when `ctx` is what failed
                return Err(match tx.rollback(ctx).await {
                    Ok(()) => err,
                    Err(rollback) => {
                        warn!(error = %rollback, "rollback failed");
                        ExecError::RollbackFailed {
                            source: Box::new(err),
                            rollback,
                        }
                    }
                });
            }
        }

        ctx.run(tx.commit(ctx), ExecError::Commit).await?;
        info!(statements = statements.len(), "transaction committed");
        Ok(())
    }
}

impl std::fmt::Debug for QueryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryExecutor").finish_non_exhaustive()
    }
}
