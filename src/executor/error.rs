//! Executor error types.

use std::error::Error as StdError;
use std::time::Duration;

use thiserror::Error;

use crate::mapper::MapError;

/// Boxed driver error carried by custom adapters.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Result type for adapter round-trips.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Result type for executor operations.
pub type ExecResult<T> = Result<T, ExecError>;

/// Failures reported by a [`DatabaseAdapter`](super::DatabaseAdapter).
#[derive(Error, Debug)]
pub enum AdapterError {
    /// SQLite driver error.
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A blocking driver task panicked or was cancelled.
    #[error("driver task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// The transaction lost its connection to an interrupted call.
    #[error("transaction connection was interrupted")]
    Interrupted,

    /// The call's context was cancelled or passed its deadline.
    #[error("call abandoned by its context")]
    Abandoned,

    /// Argument that the driver cannot bind.
    #[error("cannot bind {kind} argument at position {index}")]
    Unbindable { index: usize, kind: &'static str },

    /// Any other driver failure.
    #[error("{0}")]
    Driver(#[source] BoxError),
}

impl AdapterError {
    /// Wrap an arbitrary driver error.
    pub fn driver(err: impl Into<BoxError>) -> Self {
        Self::Driver(err.into())
    }
}

/// Errors surfaced by [`QueryExecutor`](super::QueryExecutor).
#[derive(Error, Debug)]
pub enum ExecError {
    /// A row-returning statement failed.
    #[error("query on {model} failed: {source}")]
    Query {
        model: String,
        #[source]
        source: AdapterError,
    },

    /// A mutation failed.
    #[error("mutation on {model} failed: {source}")]
    Mutation {
        model: String,
        #[source]
        source: AdapterError,
    },

    /// Reading a result row failed; no later rows were read.
    #[error("failed to scan row {row}: {source}")]
    Scan {
        row: usize,
        #[source]
        source: AdapterError,
    },

    /// Zero rows came back for a query that requires one.
    #[error("no {model} record found")]
    NotFound { model: String },

    /// A statement in a non-transactional batch failed.
    #[error("batch statement {index} failed: {source}")]
    Batch {
        index: usize,
        #[source]
        source: Box<ExecError>,
    },

    /// Opening the transaction failed.
    #[error("failed to begin transaction: {0}")]
    Begin(#[source] AdapterError),

    /// A nested write failed; the transaction was rolled back.
    #[error("nested write {index} failed: {source}")]
    Statement {
        index: usize,
        #[source]
        source: AdapterError,
    },

    /// A nested write failed and so did the rollback.
    #[error("{source}; rollback also failed: {rollback}")]
    RollbackFailed {
        #[source]
        source: Box<ExecError>,
        rollback: AdapterError,
    },

    /// Committing the transaction failed.
    #[error("failed to commit transaction: {0}")]
    Commit(#[source] AdapterError),

    /// Rows came back but could not be mapped into the destination type.
    #[error("failed to map rows into {target}: {source}")]
    Mapping {
        target: &'static str,
        #[source]
        source: MapError,
    },

    /// The execution context was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// The execution context deadline passed.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),
}

impl ExecError {
    /// Check if this is the not-found domain error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Batch { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Check if the context, not the database, ended the operation.
    pub fn is_interrupted(&self) -> bool {
        match self {
            Self::Cancelled | Self::Timeout(_) => true,
            Self::Batch { source, .. } | Self::RollbackFailed { source, .. } => {
                source.is_interrupted()
            }
            _ => false,
        }
    }
}
