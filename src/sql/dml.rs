//! DML (Data Manipulation Language) support.
//!
//! This module provides types and builders for generating DML statements
//! (INSERT, UPDATE, DELETE) across different SQL dialects.
//!
//! # Examples
//!
//! ```ignore
//! use prismo::sql::dml::{Insert, Update, Delete};
//! use prismo::sql::expr::{col, param, ExprExt};
//!
//! // INSERT
//! let insert = Insert::into("users")
//!     .columns(["name", "email"])
//!     .values([param("Alice"), param("alice@example.com")]);
//!
//! // UPDATE
//! let update = Update::table("users")
//!     .set("status", param("active"))
//!     .filter(col("id").eq(param(1)));
//!
//! // DELETE
//! let delete = Delete::from("users")
//!     .filter(col("status").eq(param("inactive")));
//! ```

use super::dialect::helpers::emit_assignments;
use super::dialect::{DialectError, SqlDialect};
use super::expr::{Expr, ExprExt};
use super::token::{Token, TokenStream};

// ============================================================================
// INSERT
// ============================================================================

/// INSERT statement.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "DML statements have no effect until converted to SQL"]
pub struct Insert {
    pub table: String,
    pub columns: Vec<String>,
    pub values: Vec<Vec<Expr>>,
    pub on_conflict: Option<OnConflict>,
    /// Append `RETURNING *`.
    pub returning: bool,
}

impl Insert {
    /// Create a new INSERT statement.
    pub fn into(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            values: Vec::new(),
            on_conflict: None,
            returning: false,
        }
    }

    /// Set the columns to insert.
    pub fn columns(mut self, cols: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.columns = cols.into_iter().map(|c| c.into()).collect();
        self
    }

    /// Add a row of values.
    pub fn values(mut self, vals: impl IntoIterator<Item = impl Into<Expr>>) -> Self {
        self.values
            .push(vals.into_iter().map(|v| v.into()).collect());
        self
    }

    /// Add a conflict clause.
    pub fn on_conflict(mut self, conflict: OnConflict) -> Self {
        self.on_conflict = Some(conflict);
        self
    }

    /// Add `RETURNING *`.
    pub fn returning_all(mut self) -> Self {
        self.returning = true;
        self
    }

    /// Convert to token stream.
    ///
    /// Fails when the dialect cannot express the conflict clause or RETURNING.
    pub fn to_tokens(&self, dialect: &dyn SqlDialect) -> Result<TokenStream, DialectError> {
        let mut ts = TokenStream::new();

        let insert_ignore = self
            .on_conflict
            .as_ref()
            .is_some_and(|c| dialect.uses_insert_ignore(c));

        // INSERT [IGNORE] INTO
        ts.push(Token::Insert).space();
        if insert_ignore {
            ts.push(Token::Ignore).space();
        }
        ts.push(Token::Into).space();
        ts.push(Token::Ident(self.table.clone()));

        // Columns
        if !self.columns.is_empty() {
            ts.space().lparen();
            for (i, col) in self.columns.iter().enumerate() {
                if i > 0 {
                    ts.comma().space();
                }
                ts.push(Token::Ident(col.clone()));
            }
            ts.rparen();
        }

        // VALUES
        ts.space().push(Token::Values).space();
        for (row_idx, row) in self.values.iter().enumerate() {
            if row_idx > 0 {
                ts.comma().space();
            }
            ts.lparen();
            for (i, val) in row.iter().enumerate() {
                if i > 0 {
                    ts.comma().space();
                }
                ts.append(&val.to_tokens());
            }
            ts.rparen();
        }

        // Conflict handling
        if let Some(conflict) = &self.on_conflict {
            let clause = dialect.emit_on_conflict(conflict)?;
            if !clause.is_empty() {
                ts.space().append(&clause);
            }
        }

        // RETURNING
        if self.returning {
            if !dialect.supports_returning() {
                return Err(DialectError::unsupported(dialect.name(), "RETURNING"));
            }
            ts.space().push(Token::Returning).space().push(Token::Star);
        }

        Ok(ts)
    }
}

/// Conflict resolution for INSERT.
#[derive(Debug, Clone, PartialEq)]
pub enum OnConflict {
    /// Skip conflicting rows.
    DoNothing { columns: Vec<String> },
    /// Overwrite the listed columns of the conflicting row.
    DoUpdate {
        columns: Vec<String>,
        set: Vec<(String, Expr)>,
    },
}

impl OnConflict {
    /// ON CONFLICT DO NOTHING with no conflict target.
    pub fn do_nothing() -> Self {
        OnConflict::DoNothing {
            columns: Vec::new(),
        }
    }

    /// ON CONFLICT (columns) DO UPDATE SET ...
    pub fn do_update(
        columns: impl IntoIterator<Item = impl Into<String>>,
        set: Vec<(String, Expr)>,
    ) -> Self {
        OnConflict::DoUpdate {
            columns: columns.into_iter().map(|c| c.into()).collect(),
            set,
        }
    }

    /// Conflict target columns.
    pub fn columns(&self) -> &[String] {
        match self {
            OnConflict::DoNothing { columns } | OnConflict::DoUpdate { columns, .. } => columns,
        }
    }
}

// ============================================================================
// UPDATE
// ============================================================================

/// UPDATE statement.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "DML statements have no effect until converted to SQL"]
pub struct Update {
    pub table: String,
    pub set: Vec<(String, Expr)>,
    pub where_clause: Option<Expr>,
}

impl Update {
    /// Create a new UPDATE statement.
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            set: Vec::new(),
            where_clause: None,
        }
    }

    /// Add a SET assignment.
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Expr>) -> Self {
        self.set.push((column.into(), value.into()));
        self
    }

    /// Add a WHERE condition (ANDed with existing conditions).
    pub fn filter(mut self, expr: Expr) -> Self {
        self.where_clause = Some(match self.where_clause {
            Some(existing) => existing.and(expr),
            None => expr,
        });
        self
    }

    /// Convert to token stream.
    pub fn to_tokens(&self) -> TokenStream {
        let mut ts = TokenStream::new();
        ts.push(Token::Update)
            .space()
            .push(Token::Ident(self.table.clone()))
            .space()
            .push(Token::Set)
            .space()
            .append(&emit_assignments(&self.set));

        if let Some(where_clause) = &self.where_clause {
            ts.space()
                .push(Token::Where)
                .space()
                .append(&where_clause.to_tokens());
        }
        ts
    }
}

// ============================================================================
// DELETE
// ============================================================================

/// DELETE statement.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "DML statements have no effect until converted to SQL"]
pub struct Delete {
    pub table: String,
    pub where_clause: Option<Expr>,
}

impl Delete {
    /// Create a new DELETE statement.
    pub fn from(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            where_clause: None,
        }
    }

    /// Add a WHERE condition (ANDed with existing conditions).
    pub fn filter(mut self, expr: Expr) -> Self {
        self.where_clause = Some(match self.where_clause {
            Some(existing) => existing.and(expr),
            None => expr,
        });
        self
    }

    /// Convert to token stream.
    pub fn to_tokens(&self) -> TokenStream {
        let mut ts = TokenStream::new();
        ts.push(Token::Delete)
            .space()
            .push(Token::From)
            .space()
            .push(Token::Ident(self.table.clone()));

        if let Some(where_clause) = &self.where_clause {
            ts.space()
                .push(Token::Where)
                .space()
                .append(&where_clause.to_tokens());
        }
        ts
    }
}
