//! SQL planner - lowers a model [`Query`] into a SQL statement AST.
//!
//! Two families of plans:
//! 1. Reads (`FindMany`, `FindFirst`, `FindUnique`, `Count`, `Aggregate`) become a
//!    [`SelectStatement`], with relation inclusions lowered by [`JoinBuilder`].
//! 2. Writes (`Create`, `CreateMany`, `Update`, `Delete`, `Upsert`) become DML.
//!
//! Nothing here touches a database; every failure is a construction error.

pub mod condition;
pub mod join_builder;
mod select;
mod write;

pub use condition::ConditionCompiler;
pub use join_builder::{JoinBuilder, JoinPlan};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::compile::{CompileError, CompileOptions, CompileResult};
use crate::metadata::MetadataRegistry;
use crate::model::{Operation, Query};
use crate::sql::dialect::SqlDialect;
use crate::sql::dml::{Delete, Insert, Update};
use crate::sql::query::SelectStatement;
use crate::sql::token::{RenderOptions, RenderedSql};

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid"));

/// Reject anything that is not a plain SQL identifier.
pub(crate) fn checked_ident(name: &str) -> CompileResult<&str> {
    if IDENTIFIER.is_match(name) {
        Ok(name)
    } else {
        Err(CompileError::InvalidIdentifier(name.to_string()))
    }
}

/// A planned statement of any kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(SelectStatement),
    Insert(Insert),
    Update(Update),
    Delete(Delete),
}

impl Statement {
    /// Render to SQL text and arguments with one placeholder counter.
    pub fn render(
        &self,
        dialect: &dyn SqlDialect,
        opts: RenderOptions,
    ) -> CompileResult<RenderedSql> {
        let tokens = match self {
            Statement::Select(stmt) => stmt.to_tokens(dialect),
            Statement::Insert(stmt) => stmt.to_tokens(dialect)?,
            Statement::Update(stmt) => stmt.to_tokens(),
            Statement::Delete(stmt) => stmt.to_tokens(),
        };
        Ok(tokens.render(dialect, opts))
    }
}

/// Physical names for models and fields, via the registry when one is attached.
#[derive(Clone, Copy)]
pub struct Names<'a> {
    registry: Option<&'a dyn MetadataRegistry>,
}

impl<'a> Names<'a> {
    pub fn new(registry: Option<&'a dyn MetadataRegistry>) -> Self {
        Self { registry }
    }

    /// Table for `model`, falling back to the model name.
    pub fn table(&self, model: &str) -> CompileResult<String> {
        let table = self
            .registry
            .and_then(|r| r.get_table_name(model).ok())
            .unwrap_or_else(|| model.to_string());
        checked_ident(&table)?;
        Ok(table)
    }

    /// Column for `model.field`, falling back to the field name.
    pub fn column(&self, model: &str, field: &str) -> CompileResult<String> {
        let column = self
            .registry
            .and_then(|r| r.get_column_name(model, field).ok())
            .unwrap_or_else(|| field.to_string());
        checked_ident(&column)?;
        Ok(column)
    }
}

/// Main entry point for SQL planning.
pub struct SqlPlanner<'a> {
    options: &'a CompileOptions,
    registry: Option<&'a dyn MetadataRegistry>,
}

impl<'a> SqlPlanner<'a> {
    pub fn new(options: &'a CompileOptions, registry: Option<&'a dyn MetadataRegistry>) -> Self {
        Self { options, registry }
    }

    pub(crate) fn dialect(&self) -> &'a dyn SqlDialect {
        self.options.dialect.dialect()
    }

    pub(crate) fn names(&self) -> Names<'a> {
        Names::new(self.registry)
    }

    /// Plan one query into one statement.
    pub fn plan(&self, query: &Query) -> CompileResult<Statement> {
        match query.operation {
            Operation::FindMany
            | Operation::FindFirst
            | Operation::FindUnique
            | Operation::Count
            | Operation::Aggregate => self.plan_select(query).map(Statement::Select),
            Operation::Create => self.plan_create(query).map(Statement::Insert),
            Operation::CreateMany => self.plan_create_many(query).map(Statement::Insert),
            Operation::Upsert => self.plan_upsert(query).map(Statement::Insert),
            Operation::Update => self.plan_update(query).map(Statement::Update),
            Operation::Delete => self.plan_delete(query).map(Statement::Delete),
        }
    }
}
