//! Expression AST - the core of SQL expression building.
//!
//! This module provides a strongly-typed AST for SQL expressions
//! with exhaustive pattern matching enforced by the compiler. Values are
//! never inlined: they travel as [`Expr::Param`] and become placeholders
//! when the statement is rendered.

use crate::model::Value;

use super::query::SelectExpr;
use super::token::{Token, TokenStream};

// =============================================================================
// Expression AST
// =============================================================================

/// A SQL expression.
///
/// Every variant must be handled in `to_tokens()` - the compiler enforces this.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Column reference: optional_table.column
    Column {
        table: Option<String>,
        column: String,
    },

    /// Wildcard: * or table.*
    Star { table: Option<String> },

    /// Bound parameter
    Param(Value),

    /// Integer literal (constant predicates only)
    LitInt(i64),

    /// Binary operation: left op right
    BinaryOp {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },

    /// Function call: name(args...)
    Function { name: String, args: Vec<Expr> },

    /// IN: expr IN (values...)
    In {
        expr: Box<Expr>,
        values: Vec<Expr>,
        negated: bool,
    },

    /// IS NULL / IS NOT NULL
    IsNull { expr: Box<Expr>, negated: bool },

    /// Fragment already rendered by a dialect (search, array containment).
    Dialect(TokenStream),

    /// Raw SQL expression passed directly to output without escaping.
    ///
    /// # Security Warning
    ///
    /// **Never pass user input to this variant.** Raw SQL is not sanitized.
    /// The planner only uses it for aggregate text that has been checked
    /// against a restricted character set.
    Raw(String),
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Comparison
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    // Logical
    And,
    // Pattern
    Like,
}

// =============================================================================
// Token Emission
// =============================================================================

impl Expr {
    /// Convert this expression to a token stream.
    pub fn to_tokens(&self) -> TokenStream {
        let mut ts = TokenStream::new();

        match self {
            Expr::Column { table, column } => {
                ts.push(Token::QualifiedIdent {
                    qualifier: table.clone(),
                    name: column.clone(),
                });
            }

            Expr::Star { table } => {
                if let Some(t) = table {
                    ts.push(Token::Ident(t.clone())).push(Token::Dot);
                }
                ts.push(Token::Star);
            }

            Expr::Param(value) => {
                ts.push(Token::Param(value.clone()));
            }

            Expr::LitInt(n) => {
                ts.push(Token::LitInt(*n));
            }

            Expr::BinaryOp { left, op, right } => {
                ts.append(&left.to_tokens())
                    .space()
                    .push(binary_op_to_token(*op))
                    .space()
                    .append(&right.to_tokens());
            }

            Expr::Function { name, args } => {
                ts.push(Token::FunctionName(name.clone())).lparen();
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        ts.comma().space();
                    }
                    ts.append(&arg.to_tokens());
                }
                ts.rparen();
            }

            Expr::In {
                expr,
                values,
                negated,
            } => {
                // "x IN ()" is invalid SQL: empty IN is FALSE, empty NOT IN is TRUE
                if values.is_empty() {
                    let rhs = if *negated { 1 } else { 0 };
                    ts.push(Token::LitInt(1))
                        .space()
                        .push(Token::Eq)
                        .space()
                        .push(Token::LitInt(rhs));
                } else {
                    ts.append(&expr.to_tokens());
                    if *negated {
                        ts.space().push(Token::Not);
                    }
                    ts.space().push(Token::In).space().lparen();
                    for (i, val) in values.iter().enumerate() {
                        if i > 0 {
                            ts.comma().space();
                        }
                        ts.append(&val.to_tokens());
                    }
                    ts.rparen();
                }
            }

            Expr::IsNull { expr, negated } => {
                ts.append(&expr.to_tokens()).space();
                ts.push(if *negated {
                    Token::IsNotNull
                } else {
                    Token::IsNull
                });
            }

            Expr::Dialect(fragment) => {
                ts.append(fragment);
            }

            Expr::Raw(sql) => {
                ts.push(Token::Raw(sql.clone()));
            }
        }

        ts
    }
}

fn binary_op_to_token(op: BinaryOperator) -> Token {
    match op {
        BinaryOperator::Eq => Token::Eq,
        BinaryOperator::Ne => Token::Ne,
        BinaryOperator::Lt => Token::Lt,
        BinaryOperator::Lte => Token::Lte,
        BinaryOperator::Gt => Token::Gt,
        BinaryOperator::Gte => Token::Gte,
        BinaryOperator::And => Token::And,
        BinaryOperator::Like => Token::Like,
    }
}

// =============================================================================
// Constructors
// =============================================================================

/// Unqualified column reference.
pub fn col(name: &str) -> Expr {
    Expr::Column {
        table: None,
        column: name.into(),
    }
}

/// Qualified column reference: table.column
pub fn table_col(table: &str, column: &str) -> Expr {
    Expr::Column {
        table: Some(table.into()),
        column: column.into(),
    }
}

/// Column reference qualified only when `table` is given.
pub fn maybe_qualified(table: Option<&str>, column: &str) -> Expr {
    Expr::Column {
        table: table.map(str::to_string),
        column: column.into(),
    }
}

/// Bound parameter.
pub fn param(value: impl Into<Value>) -> Expr {
    Expr::Param(value.into())
}

pub fn lit_int(n: i64) -> Expr {
    Expr::LitInt(n)
}

/// SELECT *
pub fn star() -> Expr {
    Expr::Star { table: None }
}

/// SELECT table.*
pub fn table_star(table: &str) -> Expr {
    Expr::Star {
        table: Some(table.into()),
    }
}

/// Generic function call.
pub fn func(name: &str, args: Vec<Expr>) -> Expr {
    Expr::Function {
        name: name.into(),
        args,
    }
}

/// Raw SQL fragment. See the security warning on [`Expr::Raw`].
pub fn raw_sql(sql: &str) -> Expr {
    Expr::Raw(sql.into())
}

/// AND together a list of expressions; `None` when the list is empty.
pub fn and_all(exprs: impl IntoIterator<Item = Expr>) -> Option<Expr> {
    exprs.into_iter().reduce(|acc, e| acc.and(e))
}

// =============================================================================
// Expression Builder Trait
// =============================================================================

/// Extension trait for building expressions fluently.
pub trait ExprExt: Sized {
    fn into_expr(self) -> Expr;

    fn binary(self, op: BinaryOperator, other: impl Into<Expr>) -> Expr {
        Expr::BinaryOp {
            left: Box::new(self.into_expr()),
            op,
            right: Box::new(other.into()),
        }
    }

    // Comparison operators
    fn eq(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::Eq, other)
    }

    fn ne(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::Ne, other)
    }

    fn gt(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::Gt, other)
    }

    fn gte(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::Gte, other)
    }

    fn lt(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::Lt, other)
    }

    fn lte(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::Lte, other)
    }

    // Logical operators
    fn and(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::And, other)
    }

    // Pattern matching
    fn like(self, pattern: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::Like, pattern)
    }

    // NULL checks
    fn is_null(self) -> Expr {
        Expr::IsNull {
            expr: Box::new(self.into_expr()),
            negated: false,
        }
    }

    fn is_not_null(self) -> Expr {
        Expr::IsNull {
            expr: Box::new(self.into_expr()),
            negated: true,
        }
    }

    // IN
    fn in_list(self, values: Vec<Expr>) -> Expr {
        Expr::In {
            expr: Box::new(self.into_expr()),
            values,
            negated: false,
        }
    }

    fn not_in_list(self, values: Vec<Expr>) -> Expr {
        Expr::In {
            expr: Box::new(self.into_expr()),
            values,
            negated: true,
        }
    }

    /// Create a SELECT item with alias.
    fn alias(self, name: &str) -> SelectExpr {
        SelectExpr::new(self.into_expr()).with_alias(name)
    }
}

impl ExprExt for Expr {
    fn into_expr(self) -> Expr {
        self
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<Value> for Expr {
    fn from(value: Value) -> Self {
        Expr::Param(value)
    }
}

impl From<i64> for Expr {
    fn from(n: i64) -> Self {
        lit_int(n)
    }
}
