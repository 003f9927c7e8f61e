//! ANSI SQL dialect - base reference implementation.
//!
//! This provides the ANSI SQL standard behavior as a reference. It relies on
//! every trait default, so vendor constructs (upsert, RETURNING, DISTINCT ON,
//! search, arrays) are all rejected.

use super::super::token::{Token, TokenStream};
use super::{helpers, SqlDialect};

/// ANSI SQL dialect (reference implementation).
#[derive(Debug, Clone, Copy)]
pub struct Ansi;

impl SqlDialect for Ansi {
    fn name(&self) -> &'static str {
        "ansi"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn placeholder(&self, index: usize) -> String {
        helpers::placeholder_question(index)
    }

    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> TokenStream {
        // ANSI SQL uses OFFSET ... ROWS FETCH FIRST ... ROWS ONLY
        let mut ts = TokenStream::new();

        if let Some(off) = offset {
            ts.push(Token::Offset)
                .space()
                .push(Token::LitInt(off as i64))
                .space()
                .push(Token::Raw("ROWS".into()));
        }

        if let Some(lim) = limit {
            if offset.is_some() {
                ts.space();
            }
            ts.push(Token::Raw("FETCH FIRST".into()))
                .space()
                .push(Token::LitInt(lim as i64))
                .space()
                .push(Token::Raw("ROWS ONLY".into()));
        }

        ts
    }
}
