//! Condition compiler: one [`Condition`] to one SQL predicate.
//!
//! Every value becomes a bound parameter; nothing user-supplied is inlined.
//! HAVING conditions may name an aggregate call (`SUM(amount)`) instead of a
//! field, which is passed through verbatim once it matches a restricted
//! pattern.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{checked_ident, Names};
use crate::compile::{CompileError, CompileResult};
use crate::model::{Condition, Mode, Operator, Value};
use crate::sql::dialect::SqlDialect;
use crate::sql::expr::{func, maybe_qualified, param, raw_sql, Expr, ExprExt};

static AGGREGATE_CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?i:COUNT|SUM|AVG|MIN|MAX)\(\s*(\*|[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?)\s*\)$")
        .expect("aggregate pattern is valid")
});

/// Compiles conditions on one model, optionally qualifying columns.
pub struct ConditionCompiler<'a> {
    dialect: &'a dyn SqlDialect,
    names: Names<'a>,
    model: &'a str,
    qualifier: Option<&'a str>,
}

impl<'a> ConditionCompiler<'a> {
    pub fn new(dialect: &'a dyn SqlDialect, names: Names<'a>, model: &'a str) -> Self {
        Self {
            dialect,
            names,
            model,
            qualifier: None,
        }
    }

    /// Qualify every column with `alias`.
    pub fn qualified(mut self, alias: Option<&'a str>) -> Self {
        self.qualifier = alias;
        self
    }

    /// Column expression for a model field.
    pub fn column(&self, field: &str) -> CompileResult<Expr> {
        let column = self.names.column(self.model, field)?;
        Ok(maybe_qualified(self.qualifier, &column))
    }

    /// Compile a WHERE condition.
    pub fn compile(&self, condition: &Condition) -> CompileResult<Expr> {
        let lhs = self.column(&condition.field)?;
        self.predicate(lhs, condition)
    }

    /// Compile a conjunction, preserving order.
    pub fn compile_all(&self, filter: &[Condition]) -> CompileResult<Vec<Expr>> {
        filter.iter().map(|c| self.compile(c)).collect()
    }

    /// Compile a HAVING condition whose field is a column or an aggregate call.
    pub fn compile_having(&self, condition: &Condition) -> CompileResult<Expr> {
        let field = condition.field.trim();
        let lhs = if checked_ident(field).is_ok() {
            self.column(field)?
        } else if AGGREGATE_CALL.is_match(field) {
            raw_sql(field)
        } else {
            return Err(CompileError::InvalidAggregateExpression(field.to_string()));
        };
        self.predicate(lhs, condition)
    }

    fn predicate(&self, lhs: Expr, condition: &Condition) -> CompileResult<Expr> {
        let value = &condition.value;
        let insensitive = condition.mode == Mode::Insensitive;

        let expr = match condition.operator {
            Operator::Equals if value.is_null() => lhs.is_null(),
            Operator::NotEquals if value.is_null() => lhs.is_not_null(),
            Operator::Equals => {
                let (lhs, rhs) = self.fold_case(lhs, param(value.clone()), insensitive);
                lhs.eq(rhs)
            }
            Operator::NotEquals => {
                let (lhs, rhs) = self.fold_case(lhs, param(value.clone()), insensitive);
                lhs.ne(rhs)
            }
            Operator::Gt => lhs.gt(self.non_null(condition)?),
            Operator::Gte => lhs.gte(self.non_null(condition)?),
            Operator::Lt => lhs.lt(self.non_null(condition)?),
            Operator::Lte => lhs.lte(self.non_null(condition)?),
            Operator::In => lhs.in_list(self.list(condition)?),
            Operator::NotIn => lhs.not_in_list(self.list(condition)?),
            Operator::Contains => self.like(lhs, condition, |s| format!("%{s}%"))?,
            Operator::StartsWith => self.like(lhs, condition, |s| format!("{s}%"))?,
            Operator::EndsWith => self.like(lhs, condition, |s| format!("%{s}"))?,
            Operator::IsNull => match value {
                Value::Bool(false) => lhs.is_not_null(),
                _ => lhs.is_null(),
            },
            Operator::Has => {
                let items: Vec<_> = self
                    .list(condition)?
                    .iter()
                    .map(Expr::to_tokens)
                    .collect();
                Expr::Dialect(self.dialect.emit_array_contains(&lhs.to_tokens(), &items)?)
            }
            Operator::Search => {
                let Value::Text(text) = value else {
                    return Err(invalid(condition, "text"));
                };
                let query = param(text.clone()).to_tokens();
                Expr::Dialect(self.dialect.emit_search(&lhs.to_tokens(), &query)?)
            }
        };
        Ok(expr)
    }

    /// `LHS LIKE $n`, or `LOWER(LHS) LIKE LOWER($n)` when insensitive.
    fn like(
        &self,
        lhs: Expr,
        condition: &Condition,
        pattern: impl Fn(&str) -> String,
    ) -> CompileResult<Expr> {
        if condition.value.is_null() {
            return Err(invalid(condition, "non-null value"));
        }
        let arg = param(pattern(&condition.value.to_text()));
        let (lhs, rhs) = self.fold_case(lhs, arg, condition.mode == Mode::Insensitive);
        Ok(lhs.like(rhs))
    }

    fn fold_case(&self, lhs: Expr, rhs: Expr, insensitive: bool) -> (Expr, Expr) {
        if !insensitive {
            return (lhs, rhs);
        }
        let fold = self.dialect.case_fold_function();
        (func(fold, vec![lhs]), func(fold, vec![rhs]))
    }

    fn non_null(&self, condition: &Condition) -> CompileResult<Expr> {
        if condition.value.is_null() {
            return Err(invalid(condition, "non-null value"));
        }
        Ok(param(condition.value.clone()))
    }

    /// Parameters for a list operator; a scalar is a one-element list.
    fn list(&self, condition: &Condition) -> CompileResult<Vec<Expr>> {
        match &condition.value {
            Value::Array(items) => Ok(items.iter().cloned().map(param).collect()),
            Value::Null => Err(invalid(condition, "array")),
            scalar => Ok(vec![param(scalar.clone())]),
        }
    }
}

fn invalid(condition: &Condition, expected: &'static str) -> CompileError {
    CompileError::InvalidConditionValue {
        field: condition.field.clone(),
        operator: condition.operator.name(),
        expected,
        actual: condition.value.kind(),
    }
}
