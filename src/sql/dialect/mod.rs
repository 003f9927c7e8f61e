//! SQL Dialect definitions and formatting rules.
//!
//! This module provides a trait-based abstraction for SQL dialect differences.
//! Each dialect implements `SqlDialect` to handle its specific syntax:
//!
//! - Identifier quoting: `"` (PostgreSQL/SQLite), `` ` `` (MySQL)
//! - Placeholders: `$1, $2, ...` (PostgreSQL/SQLite) vs `?` (MySQL)
//! - Conflict handling: `ON CONFLICT ... DO UPDATE` vs `ON DUPLICATE KEY UPDATE`
//! - RETURNING, DISTINCT ON, full-text search and array containment support
//!
//! # Usage
//!
//! ```ignore
//! use prismo::sql::dialect::{Dialect, SqlDialect};
//!
//! let dialect = Dialect::Postgres;
//! assert_eq!(dialect.placeholder(2), "$2");
//! ```
//!
//! # Feature Matrix
//!
//! | Feature | PostgreSQL | MySQL | SQLite |
//! |---------|-----------|-------|--------|
//! | RETURNING | ✓ | ❌ | 3.35+ |
//! | DISTINCT ON | ✓ | ❌ | ❌ |
//! | ON CONFLICT upsert | ✓ | ❌ (ON DUPLICATE KEY) | ✓ |
//! | Full-text search | ✓ | ❌ | ❌ |
//! | Array containment | ✓ | ❌ | ❌ |
//!
//! Check the capability methods (`supports_returning()`, `supports_search()`, ...)
//! before generating SQL that uses these features. Operations a dialect cannot
//! express return [`DialectError::Unsupported`] rather than degrading silently.

mod ansi;
pub mod helpers;
mod mysql;
mod postgres;
mod sqlite;

// Note: Ansi is exported as a reference implementation for testing and documentation.
// It is NOT included in the Dialect enum; it has no upsert or RETURNING support.
pub use ansi::Ansi;
pub use mysql::MySql;
pub use postgres::Postgres;
pub use sqlite::Sqlite;

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::dml::OnConflict;
use super::token::TokenStream;

/// Raised when a dialect cannot express a requested construct.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DialectError {
    #[error("{feature} is not supported by the {dialect} dialect")]
    Unsupported {
        dialect: &'static str,
        feature: &'static str,
    },

    #[error("unknown dialect: {0}")]
    Unknown(String),
}

impl DialectError {
    pub fn unsupported(dialect: &'static str, feature: &'static str) -> Self {
        Self::Unsupported { dialect, feature }
    }
}

/// SQL dialect trait - the per-dialect strategy the compiler works through.
///
/// The default implementations follow ANSI SQL where possible and reject
/// vendor extensions.
pub trait SqlDialect: std::fmt::Debug + Send + Sync {
    /// Dialect name for display/logging.
    fn name(&self) -> &'static str;

    // =========================================================================
    // Identifiers and Placeholders
    // =========================================================================

    /// Quote an identifier (table, column, alias).
    ///
    /// - ANSI/PostgreSQL/SQLite: `"identifier"`
    /// - MySQL: `` `identifier` ``
    fn quote_identifier(&self, ident: &str) -> String;

    /// Positional placeholder for the 1-based argument `index`.
    fn placeholder(&self, index: usize) -> String;

    // =========================================================================
    // Pagination
    // =========================================================================

    /// Emit LIMIT/OFFSET clause.
    ///
    /// Default is `LIMIT n OFFSET m`, with OFFSET allowed on its own.
    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> TokenStream {
        helpers::emit_limit_offset(limit, offset, None)
    }

    // =========================================================================
    // Capabilities
    // =========================================================================

    /// Whether INSERT can end in `RETURNING *`.
    fn supports_returning(&self) -> bool {
        false
    }

    /// Whether `SELECT DISTINCT ON (...)` is available.
    fn supports_distinct_on(&self) -> bool {
        false
    }

    /// Whether full-text search predicates can be compiled.
    fn supports_search(&self) -> bool {
        false
    }

    /// Whether array containment predicates can be compiled.
    fn supports_array_contains(&self) -> bool {
        false
    }

    /// Case-folding function used for case-insensitive matching.
    fn case_fold_function(&self) -> &'static str {
        "LOWER"
    }

    // =========================================================================
    // Vendor Constructs
    // =========================================================================

    /// Full-text predicate over `column` for the search text in `query`.
    fn emit_search(
        &self,
        column: &TokenStream,
        query: &TokenStream,
    ) -> Result<TokenStream, DialectError> {
        let _ = (column, query);
        Err(DialectError::unsupported(self.name(), "full-text search"))
    }

    /// Array containment predicate: `column` contains every element of `items`.
    fn emit_array_contains(
        &self,
        column: &TokenStream,
        items: &[TokenStream],
    ) -> Result<TokenStream, DialectError> {
        let _ = (column, items);
        Err(DialectError::unsupported(self.name(), "array containment"))
    }

    /// Conflict clause appended to an INSERT.
    fn emit_on_conflict(&self, conflict: &OnConflict) -> Result<TokenStream, DialectError> {
        let _ = conflict;
        Err(DialectError::unsupported(self.name(), "upsert"))
    }

    /// Whether the conflict is expressed as `INSERT IGNORE` instead of a
    /// trailing clause.
    fn uses_insert_ignore(&self, conflict: &OnConflict) -> bool {
        let _ = conflict;
        false
    }
}

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Postgres,
    MySql,
    Sqlite,
}

impl Dialect {
    /// Get the dialect implementation.
    pub fn dialect(&self) -> &'static dyn SqlDialect {
        match self {
            Dialect::Postgres => &Postgres,
            Dialect::MySql => &MySql,
            Dialect::Sqlite => &Sqlite,
        }
    }
}

impl FromStr for Dialect {
    type Err = DialectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Dialect::Postgres),
            "mysql" | "mariadb" => Ok(Dialect::MySql),
            "sqlite" | "sqlite3" => Ok(Dialect::Sqlite),
            other => Err(DialectError::Unknown(other.to_string())),
        }
    }
}

// Implement SqlDialect for Dialect enum by delegating to concrete types
impl SqlDialect for Dialect {
    fn name(&self) -> &'static str {
        self.dialect().name()
    }

    fn quote_identifier(&self, ident: &str) -> String {
        self.dialect().quote_identifier(ident)
    }

    fn placeholder(&self, index: usize) -> String {
        self.dialect().placeholder(index)
    }

    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> TokenStream {
        self.dialect().emit_limit_offset(limit, offset)
    }

    fn supports_returning(&self) -> bool {
        self.dialect().supports_returning()
    }

    fn supports_distinct_on(&self) -> bool {
        self.dialect().supports_distinct_on()
    }

    fn supports_search(&self) -> bool {
        self.dialect().supports_search()
    }

    fn supports_array_contains(&self) -> bool {
        self.dialect().supports_array_contains()
    }

    fn case_fold_function(&self) -> &'static str {
        self.dialect().case_fold_function()
    }

    fn emit_search(
        &self,
        column: &TokenStream,
        query: &TokenStream,
    ) -> Result<TokenStream, DialectError> {
        self.dialect().emit_search(column, query)
    }

    fn emit_array_contains(
        &self,
        column: &TokenStream,
        items: &[TokenStream],
    ) -> Result<TokenStream, DialectError> {
        self.dialect().emit_array_contains(column, items)
    }

    fn emit_on_conflict(&self, conflict: &OnConflict) -> Result<TokenStream, DialectError> {
        self.dialect().emit_on_conflict(conflict)
    }

    fn uses_insert_ignore(&self, conflict: &OnConflict) -> bool {
        self.dialect().uses_insert_ignore(conflict)
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dialect().name())
    }
}
