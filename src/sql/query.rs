//! SELECT statement builder - construct queries with a fluent API.

use super::dialect::SqlDialect;
use super::expr::{Expr, ExprExt};
use super::token::{RenderOptions, RenderedSql, Token, TokenStream};

// =============================================================================
// Select Expression (column with optional alias)
// =============================================================================

/// A SELECT list item: expression with optional alias.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "builders have no effect until used"]
pub struct SelectExpr {
    pub expr: Expr,
    pub alias: Option<String>,
}

impl SelectExpr {
    pub fn new(expr: Expr) -> Self {
        Self { expr, alias: None }
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn to_tokens(&self) -> TokenStream {
        let mut ts = self.expr.to_tokens();
        if let Some(alias) = &self.alias {
            ts.space()
                .push(Token::As)
                .space()
                .push(Token::Ident(alias.clone()));
        }
        ts
    }
}

impl From<Expr> for SelectExpr {
    fn from(expr: Expr) -> Self {
        SelectExpr::new(expr)
    }
}

// =============================================================================
// Table Reference
// =============================================================================

/// A table reference with optional alias.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "builders have no effect until used"]
pub struct TableRef {
    pub table: String,
    pub alias: Option<String>,
}

impl TableRef {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.into(),
            alias: None,
        }
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Name other clauses use to refer to this table.
    pub fn reference(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.table)
    }

    pub fn to_tokens(&self) -> TokenStream {
        let mut ts = TokenStream::new();
        ts.push(Token::Ident(self.table.clone()));
        if let Some(alias) = &self.alias {
            ts.space()
                .push(Token::As)
                .space()
                .push(Token::Ident(alias.clone()));
        }
        ts
    }
}

/// A FROM source: a named table or a derived table `(SELECT ...) AS alias`.
#[derive(Debug, Clone, PartialEq)]
pub enum FromItem {
    Table(TableRef),
    Derived {
        query: Box<SelectStatement>,
        alias: String,
    },
}

impl FromItem {
    pub fn to_tokens(&self, dialect: &dyn SqlDialect) -> TokenStream {
        match self {
            FromItem::Table(table) => table.to_tokens(),
            FromItem::Derived { query, alias } => {
                let mut ts = TokenStream::new();
                ts.lparen()
                    .append(&query.to_tokens(dialect))
                    .rparen()
                    .space()
                    .push(Token::As)
                    .space()
                    .push(Token::Ident(alias.clone()));
                ts
            }
        }
    }
}

// =============================================================================
// Joins
// =============================================================================

/// A `LEFT JOIN ... ON ...` clause.
///
/// Relation loading never drops parent rows, so LEFT is the only join kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub table: TableRef,
    pub on: Expr,
}

impl Join {
    pub fn left(table: TableRef, on: Expr) -> Self {
        Self { table, on }
    }

    pub fn to_tokens(&self) -> TokenStream {
        let mut ts = TokenStream::new();
        ts.push(Token::Left)
            .space()
            .push(Token::Join)
            .space()
            .append(&self.table.to_tokens())
            .space()
            .push(Token::On)
            .space()
            .append(&self.on.to_tokens());
        ts
    }
}

// =============================================================================
// ORDER BY
// =============================================================================

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

/// An ORDER BY item.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByExpr {
    pub expr: Expr,
    pub dir: SortDir,
}

impl OrderByExpr {
    pub fn asc(expr: Expr) -> Self {
        Self {
            expr,
            dir: SortDir::Asc,
        }
    }

    pub fn desc(expr: Expr) -> Self {
        Self {
            expr,
            dir: SortDir::Desc,
        }
    }

    pub fn to_tokens(&self) -> TokenStream {
        let mut ts = self.expr.to_tokens();
        ts.space().push(match self.dir {
            SortDir::Asc => Token::Asc,
            SortDir::Desc => Token::Desc,
        });
        ts
    }
}

// =============================================================================
// DISTINCT
// =============================================================================

/// Row de-duplication mode.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Distinct {
    #[default]
    None,
    /// `SELECT DISTINCT`
    All,
    /// `SELECT DISTINCT ON (...)` (PostgreSQL)
    On(Vec<Expr>),
}

// =============================================================================
// SELECT Statement
// =============================================================================

/// A SELECT statement.
#[derive(Debug, Clone, Default, PartialEq)]
#[must_use = "SelectStatement has no effect until rendered"]
pub struct SelectStatement {
    pub distinct: Distinct,
    pub select: Vec<SelectExpr>,
    pub from: Option<FromItem>,
    pub joins: Vec<Join>,
    pub where_clause: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub having: Option<Expr>,
    pub order_by: Vec<OrderByExpr>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl SelectStatement {
    /// Create a new empty statement.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the SELECT list.
    pub fn select(mut self, exprs: Vec<impl Into<SelectExpr>>) -> Self {
        self.select = exprs.into_iter().map(|e| e.into()).collect();
        self
    }

    /// Append one SELECT item.
    pub fn column(mut self, expr: impl Into<SelectExpr>) -> Self {
        self.select.push(expr.into());
        self
    }

    pub fn distinct(mut self, distinct: Distinct) -> Self {
        self.distinct = distinct;
        self
    }

    /// Set the FROM table.
    pub fn from(mut self, table: TableRef) -> Self {
        self.from = Some(FromItem::Table(table));
        self
    }

    /// Select from a derived table.
    pub fn from_derived(mut self, query: SelectStatement, alias: &str) -> Self {
        self.from = Some(FromItem::Derived {
            query: Box::new(query),
            alias: alias.into(),
        });
        self
    }

    /// Add a LEFT JOIN.
    pub fn left_join(mut self, table: TableRef, on: Expr) -> Self {
        self.joins.push(Join::left(table, on));
        self
    }

    /// Add a WHERE condition (ANDed with existing conditions).
    pub fn filter(mut self, condition: Expr) -> Self {
        self.where_clause = Some(match self.where_clause {
            Some(existing) => existing.and(condition),
            None => condition,
        });
        self
    }

    /// Set the GROUP BY clause.
    pub fn group_by(mut self, exprs: Vec<Expr>) -> Self {
        self.group_by = exprs;
        self
    }

    /// Set the HAVING clause.
    pub fn having(mut self, condition: Expr) -> Self {
        self.having = Some(condition);
        self
    }

    /// Set the ORDER BY clause.
    pub fn order_by(mut self, exprs: Vec<OrderByExpr>) -> Self {
        self.order_by = exprs;
        self
    }

    /// Set LIMIT.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set OFFSET.
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Convert to a token stream for a specific dialect.
    pub fn to_tokens(&self, dialect: &dyn SqlDialect) -> TokenStream {
        let mut ts = TokenStream::new();

        // SELECT
        ts.push(Token::Select);
        match &self.distinct {
            Distinct::None => {}
            Distinct::All => {
                ts.space().push(Token::Distinct);
            }
            Distinct::On(exprs) => {
                ts.space().push(Token::Distinct).space().push(Token::On).space();
                ts.lparen();
                let items: Vec<TokenStream> = exprs.iter().map(Expr::to_tokens).collect();
                ts.comma_separated(&items).rparen();
            }
        }

        // Columns
        ts.space();
        if self.select.is_empty() {
            ts.push(Token::Star);
        } else {
            let items: Vec<TokenStream> = self.select.iter().map(SelectExpr::to_tokens).collect();
            ts.comma_separated(&items);
        }

        // FROM
        if let Some(from) = &self.from {
            ts.space().push(Token::From).space();
            ts.append(&from.to_tokens(dialect));
        }

        // JOINs
        for join in &self.joins {
            ts.space().append(&join.to_tokens());
        }

        // WHERE
        if let Some(where_clause) = &self.where_clause {
            ts.space().push(Token::Where).space();
            ts.append(&where_clause.to_tokens());
        }

        // GROUP BY
        if !self.group_by.is_empty() {
            ts.space().push(Token::GroupBy).space();
            let items: Vec<TokenStream> = self.group_by.iter().map(Expr::to_tokens).collect();
            ts.comma_separated(&items);
        }

        // HAVING
        if let Some(having) = &self.having {
            ts.space().push(Token::Having).space();
            ts.append(&having.to_tokens());
        }

        // ORDER BY
        if !self.order_by.is_empty() {
            ts.space().push(Token::OrderBy).space();
            let items: Vec<TokenStream> = self.order_by.iter().map(OrderByExpr::to_tokens).collect();
            ts.comma_separated(&items);
        }

        // LIMIT / OFFSET
        let limit_offset = dialect.emit_limit_offset(self.limit, self.offset);
        if !limit_offset.is_empty() {
            ts.space().append(&limit_offset);
        }

        ts
    }

    /// Render to SQL text and arguments.
    pub fn render(&self, dialect: &dyn SqlDialect, opts: RenderOptions) -> RenderedSql {
        self.to_tokens(dialect).render(dialect, opts)
    }

    /// Generate SQL text for a specific dialect with bare identifiers.
    pub fn to_sql(&self, dialect: &dyn SqlDialect) -> String {
        self.to_tokens(dialect).serialize(dialect)
    }
}
