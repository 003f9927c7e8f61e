//! Shared helper functions for SQL dialect implementations.
//!
//! This module provides reusable building blocks that dialects can compose
//! to implement the `SqlDialect` trait with minimal duplication.

use super::super::dml::OnConflict;
use super::super::token::{Token, TokenStream};

// =============================================================================
// Identifier Quoting
// =============================================================================

/// Quote identifier with double quotes (ANSI style).
/// Used by: Postgres, SQLite
pub fn quote_double(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote identifier with backticks.
/// Used by: MySQL
pub fn quote_backtick(ident: &str) -> String {
    format!("`{}`", ident.replace('`', "``"))
}

// =============================================================================
// Placeholders
// =============================================================================

/// Numbered placeholder: `$1`, `$2`, ...
/// Used by: Postgres, SQLite
pub fn placeholder_dollar(index: usize) -> String {
    format!("${}", index)
}

/// Anonymous positional placeholder.
/// Used by: MySQL, ANSI
pub fn placeholder_question(_index: usize) -> String {
    "?".to_string()
}

// =============================================================================
// Pagination
// =============================================================================

/// Emit `LIMIT n OFFSET m`.
///
/// Dialects that cannot take OFFSET without LIMIT pass `unbounded`, the
/// literal that means "no limit" for them (`-1` in SQLite).
pub fn emit_limit_offset(
    limit: Option<u64>,
    offset: Option<u64>,
    unbounded: Option<&'static str>,
) -> TokenStream {
    let mut ts = TokenStream::new();

    match (limit, unbounded) {
        (Some(lim), _) => {
            ts.push(Token::Limit).space().push(Token::LitInt(lim as i64));
        }
        (None, Some(all)) if offset.is_some() => {
            ts.push(Token::Limit).space().push(Token::Raw(all.to_string()));
        }
        _ => {}
    }

    if let Some(off) = offset {
        if !ts.is_empty() {
            ts.space();
        }
        ts.push(Token::Offset).space().push(Token::LitInt(off as i64));
    }

    ts
}

// =============================================================================
// Conflict Handling
// =============================================================================

/// `ON CONFLICT (cols) DO UPDATE SET ...` / `ON CONFLICT (cols) DO NOTHING`.
/// Used by: Postgres, SQLite
pub fn emit_on_conflict_clause(conflict: &OnConflict) -> TokenStream {
    let mut ts = TokenStream::new();
    ts.push(Token::On).space().push(Token::Conflict);

    let columns = conflict.columns();
    if !columns.is_empty() {
        ts.space().lparen();
        for (i, col) in columns.iter().enumerate() {
            if i > 0 {
                ts.comma().space();
            }
            ts.push(Token::Ident(col.clone()));
        }
        ts.rparen();
    }

    ts.space().push(Token::Do).space();
    match conflict {
        OnConflict::DoNothing { .. } => {
            ts.push(Token::Nothing);
        }
        OnConflict::DoUpdate { set, .. } => {
            ts.push(Token::Update).space().push(Token::Set).space();
            ts.append(&emit_assignments(set));
        }
    }
    ts
}

/// `col = expr, col = expr`
pub fn emit_assignments(set: &[(String, super::super::expr::Expr)]) -> TokenStream {
    let mut ts = TokenStream::new();
    for (i, (col, expr)) in set.iter().enumerate() {
        if i > 0 {
            ts.comma().space();
        }
        ts.push(Token::Ident(col.clone()))
            .space()
            .push(Token::Eq)
            .space()
            .append(&expr.to_tokens());
    }
    ts
}
