//! PostgreSQL SQL dialect.
//!
//! PostgreSQL features:
//! - ANSI identifier quoting (`"`)
//! - Numbered placeholders (`$1`)
//! - RETURNING clause
//! - ON CONFLICT for upserts
//! - DISTINCT ON
//! - Full-text search (`to_tsvector` / `plainto_tsquery`)
//! - Array containment (`@>`)

use super::super::dml::OnConflict;
use super::super::token::{Token, TokenStream};
use super::{helpers, DialectError, SqlDialect};

/// PostgreSQL SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Postgres;

impl SqlDialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn placeholder(&self, index: usize) -> String {
        helpers::placeholder_dollar(index)
    }

    // Uses default emit_limit_offset (OFFSET may stand alone)

    fn supports_returning(&self) -> bool {
        true
    }

    fn supports_distinct_on(&self) -> bool {
        true
    }

    fn supports_search(&self) -> bool {
        true
    }

    fn supports_array_contains(&self) -> bool {
        true
    }

    fn emit_search(
        &self,
        column: &TokenStream,
        query: &TokenStream,
    ) -> Result<TokenStream, DialectError> {
        let mut ts = TokenStream::new();
        ts.push(Token::FunctionName("to_tsvector".into()))
            .lparen()
            .append(column)
            .rparen()
            .space()
            .push(Token::Matches)
            .space()
            .push(Token::FunctionName("plainto_tsquery".into()))
            .lparen()
            .append(query)
            .rparen();
        Ok(ts)
    }

    fn emit_array_contains(
        &self,
        column: &TokenStream,
        items: &[TokenStream],
    ) -> Result<TokenStream, DialectError> {
        let mut ts = TokenStream::new();
        ts.append(column)
            .space()
            .push(Token::Contains)
            .space()
            .push(Token::Array)
            .push(Token::LBracket)
            .comma_separated(items)
            .push(Token::RBracket);
        Ok(ts)
    }

    fn emit_on_conflict(&self, conflict: &OnConflict) -> Result<TokenStream, DialectError> {
        Ok(helpers::emit_on_conflict_clause(conflict))
    }
}
