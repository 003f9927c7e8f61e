//! SQLite SQL dialect.
//!
//! SQLite features:
//! - ANSI identifier quoting (`"`)
//! - Numbered placeholders (`$1`), bound by position of first appearance
//! - ON CONFLICT upserts and RETURNING (3.35+, the bundled library is newer)
//! - OFFSET requires a LIMIT (`LIMIT -1` means unbounded)
//! - No DISTINCT ON, no full-text predicate without FTS tables, no arrays

use super::super::dml::OnConflict;
use super::super::token::TokenStream;
use super::{helpers, DialectError, SqlDialect};

/// SQLite SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Sqlite;

impl SqlDialect for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn placeholder(&self, index: usize) -> String {
        helpers::placeholder_dollar(index)
    }

    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> TokenStream {
        helpers::emit_limit_offset(limit, offset, Some("-1"))
    }

    fn supports_returning(&self) -> bool {
        true
    }

    fn emit_on_conflict(&self, conflict: &OnConflict) -> Result<TokenStream, DialectError> {
        Ok(helpers::emit_on_conflict_clause(conflict))
    }
}
