//! Write planning: `Create`, `CreateMany`, `Update`, `Delete`, `Upsert`.
//!
//! Column lists come from [`Record`] keys, which iterate in sorted order, so
//! the same payload always yields the same SQL.

use std::collections::BTreeSet;

use super::{checked_ident, ConditionCompiler, SqlPlanner};
use crate::compile::{CompileError, CompileResult};
use crate::model::{Operation, Query, Record, Value};
use crate::sql::dml::{Delete, Insert, OnConflict, Update};
use crate::sql::expr::{param, Expr};

impl<'a> SqlPlanner<'a> {
    pub(super) fn plan_create(&self, query: &Query) -> CompileResult<Insert> {
        if query.data.is_empty() {
            return Err(CompileError::EmptyData {
                operation: Operation::Create,
            });
        }
        let insert = Insert::into(self.names().table(&query.model)?)
            .columns(self.columns(&query.model, query.data.keys())?)
            .values(query.data.values().cloned().map(param));
        Ok(self.with_returning(insert))
    }

    pub(super) fn plan_create_many(&self, query: &Query) -> CompileResult<Insert> {
        if query.create_many_data.is_empty() {
            return Err(CompileError::EmptyCreateMany);
        }

        // Union of every record's keys; absent values bind NULL
        let fields: BTreeSet<&String> = query
            .create_many_data
            .iter()
            .flat_map(|record| record.keys())
            .collect();

        let mut insert = Insert::into(self.names().table(&query.model)?)
            .columns(self.columns(&query.model, fields.iter().copied())?);
        for record in &query.create_many_data {
            insert = insert.values(
                fields
                    .iter()
                    .map(|field| param(record.get(*field).cloned().unwrap_or(Value::Null))),
            );
        }
        if query.skip_duplicates {
            insert = insert.on_conflict(OnConflict::do_nothing());
        }
        Ok(self.with_returning(insert))
    }

    pub(super) fn plan_upsert(&self, query: &Query) -> CompileResult<Insert> {
        if query.upsert_data.is_empty() {
            return Err(CompileError::EmptyUpsertData);
        }
        if query.upsert_keys.is_empty() {
            return Err(CompileError::EmptyUpsertKeys);
        }

        let keys = self.columns(&query.model, query.upsert_keys.iter())?;
        let update = if query.upsert_update.is_empty() {
            &query.upsert_data
        } else {
            &query.upsert_update
        };

        let insert = Insert::into(self.names().table(&query.model)?)
            .columns(self.columns(&query.model, query.upsert_data.keys())?)
            .values(query.upsert_data.values().cloned().map(param))
            .on_conflict(OnConflict::do_update(keys, self.assignments(&query.model, update)?));
        Ok(self.with_returning(insert))
    }

    pub(super) fn plan_update(&self, query: &Query) -> CompileResult<Update> {
        if query.data.is_empty() {
            return Err(CompileError::EmptyData {
                operation: Operation::Update,
            });
        }
        let mut update = Update::table(self.names().table(&query.model)?);
        update.set = self.assignments(&query.model, &query.data)?;
        for predicate in self.filter(query)? {
            update = update.filter(predicate);
        }
        Ok(update)
    }

    pub(super) fn plan_delete(&self, query: &Query) -> CompileResult<Delete> {
        let mut delete = Delete::from(self.names().table(&query.model)?);
        for predicate in self.filter(query)? {
            delete = delete.filter(predicate);
        }
        Ok(delete)
    }

    fn filter(&self, query: &Query) -> CompileResult<Vec<Expr>> {
        ConditionCompiler::new(self.dialect(), self.names(), &query.model).compile_all(&query.filter)
    }

    fn columns<'f>(
        &self,
        model: &str,
        fields: impl IntoIterator<Item = &'f String>,
    ) -> CompileResult<Vec<String>> {
        fields
            .into_iter()
            .map(|field| {
                checked_ident(field)?;
                self.names().column(model, field)
            })
            .collect()
    }

    fn assignments(&self, model: &str, record: &Record) -> CompileResult<Vec<(String, Expr)>> {
        record
            .iter()
            .map(|(field, value)| {
                checked_ident(field)?;
                Ok((self.names().column(model, field)?, param(value.clone())))
            })
            .collect()
    }

    /// `RETURNING *` wherever the dialect has it.
    fn with_returning(&self, insert: Insert) -> Insert {
        if self.dialect().supports_returning() {
            insert.returning_all()
        } else {
            insert
        }
    }
}
