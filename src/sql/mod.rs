//! SQL generation module.
//!
//! This module provides a type-safe SQL builder that generates multi-dialect SQL.
//! It includes:
//!
//! - [`query`] - SELECT statement builder
//! - [`expr`] - Expression AST and builder DSL
//! - [`dml`] - Data Manipulation Language (INSERT, UPDATE, DELETE)
//! - [`token`] - Token types and placeholder numbering
//! - [`dialect`] - SQL dialect implementations

pub mod dialect;
pub mod dml;
pub mod expr;
pub mod query;
pub mod token;


// Re-export commonly used types at the sql module level
pub use dialect::{Dialect, DialectError, SqlDialect};
pub use expr::{
    col, func, lit_int, param, raw_sql, star, table_col, table_star, BinaryOperator, Expr,
    ExprExt,
};
pub use query::{Distinct, FromItem, Join, OrderByExpr, SelectExpr, SelectStatement, SortDir, TableRef};
pub use token::{RenderOptions, RenderedSql, Token, TokenStream};

// Re-export DML types
pub use dml::{Delete, Insert, OnConflict, Update};
