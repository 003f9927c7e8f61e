//! MySQL SQL dialect.
//!
//! MySQL differences from ANSI:
//! - Backtick identifier quoting (`` `name` ``)
//! - Anonymous `?` placeholders
//! - ON DUPLICATE KEY UPDATE for upserts, INSERT IGNORE to skip duplicates
//! - No RETURNING clause (use LAST_INSERT_ID())
//! - OFFSET requires a LIMIT
//! - No DISTINCT ON, no array types

use super::super::dml::OnConflict;
use super::super::token::{Token, TokenStream};
use super::{helpers, DialectError, SqlDialect};

/// Largest LIMIT MySQL accepts; the documented idiom for "all rows".
const UNBOUNDED_LIMIT: &str = "18446744073709551615";

/// MySQL SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct MySql;

impl SqlDialect for MySql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_backtick(ident)
    }

    fn placeholder(&self, index: usize) -> String {
        helpers::placeholder_question(index)
    }

    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> TokenStream {
        helpers::emit_limit_offset(limit, offset, Some(UNBOUNDED_LIMIT))
    }

    fn emit_on_conflict(&self, conflict: &OnConflict) -> Result<TokenStream, DialectError> {
        let mut ts = TokenStream::new();
        match conflict {
            // Expressed through INSERT IGNORE, see uses_insert_ignore()
            OnConflict::DoNothing { .. } => {}
            OnConflict::DoUpdate { set, .. } => {
                ts.push(Token::On)
                    .space()
                    .push(Token::DuplicateKey)
                    .space()
                    .push(Token::Update)
                    .space()
                    .append(&helpers::emit_assignments(set));
            }
        }
        Ok(ts)
    }

    fn uses_insert_ignore(&self, conflict: &OnConflict) -> bool {
        matches!(conflict, OnConflict::DoNothing { .. })
    }
}
