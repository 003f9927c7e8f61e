//! End-to-end compilation from a [`Query`] to dialect SQL.
//!
//! This module provides the high-level API for compiling queries:
//!
//! ```text
//! Query → Plan (select / write / joins) → Tokens → SQL text + args
//! ```
//!
//! # Example
//!
//! ```ignore
//! use prismo::compile::{CompileOptions, QueryCompiler};
//! use prismo::model::{Condition, Query};
//! use prismo::sql::Dialect;
//!
//! let query = Query::find_many("users").filter(Condition::equals("active", true)).take(20);
//! let compiler = QueryCompiler::new(CompileOptions::default().with_dialect(Dialect::Sqlite));
//! let compiled = compiler.compile(query)?;
//! assert_eq!(compiled.sql.text, "SELECT * FROM users WHERE active = $1 LIMIT 20");
//! ```
//!
//! Compilation is a pure function of the query, the options and the registry:
//! it performs no I/O and compiling the same input twice yields byte-identical
//! SQL and the same argument sequence.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::metadata::{MetadataError, MetadataRegistry};
use crate::model::{Operation, Query, Value};
use crate::planner::SqlPlanner;
use crate::sql::token::{RenderOptions, RenderedSql};
use crate::sql::{Dialect, DialectError};

// ============================================================================
// Error Types
// ============================================================================

/// Construction errors: raised before any statement reaches an adapter.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    #[error("query model must not be empty")]
    EmptyModel,

    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("invalid aggregate expression in HAVING: {0:?}")]
    InvalidAggregateExpression(String),

    #[error("{operation:?} requires a non-empty data payload")]
    EmptyData { operation: Operation },

    #[error("upsert requires non-empty upsert data")]
    EmptyUpsertData,

    #[error("upsert requires at least one conflict key")]
    EmptyUpsertKeys,

    #[error("create many requires at least one record")]
    EmptyCreateMany,

    #[error("find unique requires a filter")]
    MissingUniqueFilter,

    #[error("operator {operator} on field {field} expects {expected}, got {actual}")]
    InvalidConditionValue {
        field: String,
        operator: &'static str,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("schema metadata registry is required")]
    MissingRegistry,

    #[error("relation {relation} on model {model} could not be resolved")]
    UnknownRelation {
        model: String,
        relation: String,
        #[source]
        source: MetadataError,
    },

    #[error("relation {relation} on model {model} is many-to-many; junction joins are not supported")]
    ManyToManyRelation { model: String, relation: String },

    #[error("relation inclusion nested deeper than {max} levels")]
    RelationDepthExceeded { max: usize },

    #[error(transparent)]
    Dialect(#[from] DialectError),
}

pub type CompileResult<T> = Result<T, CompileError>;

// ============================================================================
// Options
// ============================================================================

/// What to do when an included relation is not in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationPolicy {
    /// Fail the compilation.
    #[default]
    Error,
    /// Leave the relation out of the statement.
    Skip,
}

/// Default bound on nested relation inclusion.
pub const DEFAULT_MAX_RELATION_DEPTH: usize = 8;

/// Options for compilation.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileOptions {
    /// SQL dialect to generate.
    pub dialect: Dialect,
    /// Quote every identifier with the dialect's quoting style.
    pub quote_identifiers: bool,
    /// Handling of relations missing from the registry.
    pub relation_policy: RelationPolicy,
    /// Maximum depth of nested relation inclusion.
    pub max_relation_depth: usize,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            dialect: Dialect::Postgres,
            quote_identifiers: false,
            relation_policy: RelationPolicy::Error,
            max_relation_depth: DEFAULT_MAX_RELATION_DEPTH,
        }
    }
}

impl CompileOptions {
    /// Set the SQL dialect.
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Quote identifiers.
    pub fn with_quoted_identifiers(mut self, quote: bool) -> Self {
        self.quote_identifiers = quote;
        self
    }

    /// Set the unknown relation policy.
    pub fn with_relation_policy(mut self, policy: RelationPolicy) -> Self {
        self.relation_policy = policy;
        self
    }

    /// Set the nested relation depth bound.
    pub fn with_max_relation_depth(mut self, depth: usize) -> Self {
        self.max_relation_depth = depth;
        self
    }

    fn render_options(&self) -> RenderOptions {
        RenderOptions {
            quote_identifiers: self.quote_identifiers,
        }
    }
}

// ============================================================================
// Result Types
// ============================================================================

/// Result-mapping hints carried alongside the SQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    pub model: String,
}

/// One compiled statement, ready for the executor.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    /// SQL text and positional arguments, in placeholder order.
    pub sql: RenderedSql,
    pub mapping: Mapping,
    /// The query this statement was compiled from.
    pub original: Arc<Query>,
}

impl CompiledQuery {
    /// Wrap hand-written SQL, e.g. for nested writes the compiler does not model.
    pub fn raw(model: impl Into<String>, text: impl Into<String>, args: Vec<Value>) -> Self {
        let model = model.into();
        Self {
            sql: RenderedSql {
                text: text.into(),
                args,
            },
            mapping: Mapping {
                model: model.clone(),
            },
            original: Arc::new(Query::new(model, Operation::FindMany)),
        }
    }

    /// Whether an empty result must surface as a not-found error.
    pub fn throw_if_not_found(&self) -> bool {
        self.original.throw_if_not_found
    }
}

// ============================================================================
// Compiler
// ============================================================================

/// Compiles queries for one dialect against an optional metadata registry.
///
/// The registry is borrowed read-only; one registry can serve any number of
/// compilers on any number of threads.
#[derive(Clone)]
pub struct QueryCompiler<'a> {
    options: CompileOptions,
    registry: Option<&'a dyn MetadataRegistry>,
}

impl<'a> QueryCompiler<'a> {
    pub fn new(options: CompileOptions) -> Self {
        Self {
            options,
            registry: None,
        }
    }

    /// Attach the schema metadata registry used for table, column and relation lookup.
    pub fn with_registry(mut self, registry: &'a dyn MetadataRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Compile a query into SQL text plus positional arguments.
    pub fn compile(&self, query: impl Into<Arc<Query>>) -> CompileResult<CompiledQuery> {
        let query: Arc<Query> = query.into();
        if query.model.trim().is_empty() {
            return Err(CompileError::EmptyModel);
        }

        let planner = SqlPlanner::new(&self.options, self.registry);
        let statement = planner.plan(&query)?;

        let dialect = self.options.dialect;
        let sql = statement.render(&dialect, self.options.render_options())?;

        tracing::trace!(
            model = %query.model,
            operation = ?query.operation,
            dialect = %dialect,
            sql = %sql.text,
            args = sql.args.len(),
            "compiled query"
        );

        Ok(CompiledQuery {
            sql,
            mapping: Mapping {
                model: query.model.clone(),
            },
            original: query,
        })
    }
}

/// Compile `query` for `dialect` with default options.
pub fn compile(
    query: impl Into<Arc<Query>>,
    dialect: Dialect,
    registry: Option<&dyn MetadataRegistry>,
) -> CompileResult<CompiledQuery> {
    let mut compiler = QueryCompiler::new(CompileOptions::default().with_dialect(dialect));
    if let Some(registry) = registry {
        compiler = compiler.with_registry(registry);
    }
    compiler.compile(query)
}
