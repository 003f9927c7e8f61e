//! # prismo
//!
//! Query compilation and execution core for a Prisma-style ORM.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  Query (model::Query)                    │
//! │  (filters, ordering, cursor, aggregation, relations,     │
//! │   create / upsert payloads)                              │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [planner + metadata registry]
//! ┌─────────────────────────────────────────────────────────┐
//! │      SQL statements (sql::SelectStatement, Insert, …)    │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [dialect rendering]
//! ┌─────────────────────────────────────────────────────────┐
//! │        CompiledQuery (SQL text + positional args)        │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [executor + database adapter]
//! ┌─────────────────────────────────────────────────────────┐
//! │       Records ──[mapper]──▶ typed structs                │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use prismo::prelude::*;
//!
//! let query = Query::find_many("users")
//!     .filter(Condition::contains("email", "acme").insensitive())
//!     .order_by(OrderBy::desc("created_at"))
//!     .take(10);
//!
//! let compiled = compile(query, Dialect::Postgres, None).unwrap();
//! assert_eq!(
//!     compiled.sql.text,
//!     "SELECT * FROM users WHERE LOWER(email) LIKE LOWER($1) ORDER BY created_at DESC LIMIT 10"
//! );
//! assert_eq!(compiled.sql.args, vec![Value::from("%acme%")]);
//! ```

pub mod compile;
pub mod config;
pub mod executor;
pub mod mapper;
pub mod metadata;
pub mod model;
pub mod planner;
pub mod sql;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::compile::{
        compile, CompileError, CompileOptions, CompiledQuery, QueryCompiler, RelationPolicy,
    };
    pub use crate::executor::{
        DatabaseAdapter, ExecContext, ExecError, QueryExecutor, SqliteAdapter,
    };
    pub use crate::mapper::{map_to_record, map_to_records, FromRecord, FromValue};
    pub use crate::metadata::{MetadataRegistry, RelationMetadata, RelationType, StaticRegistry};
    pub use crate::model::{
        AggregateFn, Aggregation, Condition, Mode, Operation, Operator, OrderBy, Query, Record,
        RelationInclusion, Value,
    };
    pub use crate::sql::Dialect;
}

// Also export at crate root for convenience
pub use compile::{compile, CompileError, CompileOptions, CompiledQuery, QueryCompiler};
pub use sql::Dialect;
