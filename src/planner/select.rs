//! Read planning: `FindMany`, `FindFirst`, `FindUnique`, `Count`, `Aggregate`.

use super::{ConditionCompiler, JoinBuilder, JoinPlan, SqlPlanner};
use crate::compile::{CompileError, CompileResult};
use crate::model::{Aggregation, Operation, Query, Selection, SortOrder};
use crate::sql::expr::{func, param, star, table_star, Expr, ExprExt};
use crate::sql::query::{Distinct, OrderByExpr, SelectStatement, TableRef};

impl<'a> SqlPlanner<'a> {
    pub(super) fn plan_select(&self, query: &Query) -> CompileResult<SelectStatement> {
        let dialect = self.dialect();
        let table = self.names().table(&query.model)?;
        let is_find = !matches!(query.operation, Operation::Count | Operation::Aggregate);
        if query.operation == Operation::FindUnique && query.filter.is_empty() {
            return Err(CompileError::MissingUniqueFilter);
        }

        // Relations are eager-loaded for row-returning reads only
        let joins = if is_find && !query.relations.is_empty() {
            JoinBuilder::new(self.registry, dialect)
                .policy(self.options.relation_policy)
                .max_depth(self.options.max_relation_depth)
                .build(&query.model, &table, &query.relations)?
        } else {
            JoinPlan::default()
        };

        // Columns are qualified only once another table is in scope
        let qualifier = (!joins.is_empty()).then_some(table.as_str());
        let conditions =
            ConditionCompiler::new(dialect, self.names(), &query.model).qualified(qualifier);

        // WHERE: cursor boundary first, then the filter in order
        let mut stmt = SelectStatement::new().from(TableRef::new(&table));
        if let Some(cursor) = &query.cursor {
            let boundary = conditions.column(&cursor.field)?.gt(param(cursor.value.clone()));
            stmt = stmt.filter(boundary);
        }
        for predicate in conditions.compile_all(&query.filter)? {
            stmt = stmt.filter(predicate);
        }

        let order_by = query
            .ordering
            .iter()
            .map(|o| {
                let column = conditions.column(&o.field)?;
                Ok(match o.order {
                    SortOrder::Asc => OrderByExpr::asc(column),
                    SortOrder::Desc => OrderByExpr::desc(column),
                })
            })
            .collect::<CompileResult<Vec<_>>>()?;

        if is_find {
            self.finish_find(stmt, query, joins, qualifier, &conditions, order_by)
        } else {
            finish_aggregate(stmt, query, &conditions, order_by)
        }
    }

    fn finish_find(
        &self,
        mut stmt: SelectStatement,
        query: &Query,
        joins: JoinPlan,
        qualifier: Option<&str>,
        conditions: &ConditionCompiler<'_>,
        mut order_by: Vec<OrderByExpr>,
    ) -> CompileResult<SelectStatement> {
        let dialect = self.dialect();

        match &query.selection {
            Selection::All => {
                stmt = stmt.column(qualifier.map_or_else(star, table_star));
            }
            Selection::Fields(fields) => {
                for field in fields {
                    stmt = stmt.column(conditions.column(field)?);
                }
                // DISTINCT ON fields must be selectable
                if dialect.supports_distinct_on() {
                    for field in &query.distinct {
                        if !fields.contains(field) {
                            stmt = stmt.column(conditions.column(field)?);
                        }
                    }
                }
            }
        }
        for column in joins.columns {
            stmt = stmt.column(column);
        }
        stmt.joins.extend(joins.joins);

        let distinct_columns = query
            .distinct
            .iter()
            .map(|field| conditions.column(field))
            .collect::<CompileResult<Vec<_>>>()?;
        if !distinct_columns.is_empty() {
            stmt = stmt.distinct(if dialect.supports_distinct_on() {
                Distinct::On(distinct_columns)
            } else {
                Distinct::All
            });
        }

        if order_by.is_empty() {
            if let Some(cursor) = &query.cursor {
                order_by.push(OrderByExpr::asc(conditions.column(&cursor.field)?));
            }
        }
        if let Distinct::On(leading) = &stmt.distinct {
            if !order_by.is_empty() {
                order_by = lead_with_distinct(leading, order_by);
            }
        }
        if !order_by.is_empty() {
            stmt = stmt.order_by(order_by);
        }

        stmt.limit = match query.operation {
            Operation::FindFirst => query.take.or(Some(1)),
            Operation::FindUnique => Some(1),
            _ => query.take,
        };
        stmt.offset = query.skip;

        Ok(stmt)
    }
}

/// `Count` and `Aggregate`.
///
/// `take`/`skip` bound the rows being counted, so a paginated aggregate runs
/// over a derived table holding the filtered, ordered page.
fn finish_aggregate(
    base: SelectStatement,
    query: &Query,
    conditions: &ConditionCompiler<'_>,
    mut order_by: Vec<OrderByExpr>,
) -> CompileResult<SelectStatement> {
    let mut stmt = if query.take.is_some() || query.skip.is_some() {
        if order_by.is_empty() {
            if let Some(cursor) = &query.cursor {
                order_by.push(OrderByExpr::asc(conditions.column(&cursor.field)?));
            }
        }
        let mut page = base.order_by(order_by);
        page.limit = query.take;
        page.offset = query.skip;
        SelectStatement::new().from_derived(page, "_sub")
    } else if query.operation == Operation::Aggregate {
        base.order_by(order_by)
    } else {
        // A lone COUNT(*) row has nothing to order
        base
    };

    if query.operation == Operation::Aggregate {
        for field in &query.group_by {
            stmt = stmt.column(conditions.column(field)?);
        }
        for aggregation in &query.aggregations {
            let expr = aggregate_expr(aggregation, conditions)?;
            stmt = stmt.column(expr.alias(&aggregation.alias()));
        }
    }
    if stmt.select.is_empty() {
        stmt = stmt.column(func("COUNT", vec![star()]).alias("_count"));
    }

    if !query.group_by.is_empty() {
        let group_by = query
            .group_by
            .iter()
            .map(|field| conditions.column(field))
            .collect::<CompileResult<Vec<_>>>()?;
        stmt = stmt.group_by(group_by);
    }
    let having = query
        .having
        .iter()
        .map(|c| conditions.compile_having(c))
        .collect::<CompileResult<Vec<_>>>()?;
    if let Some(having) = crate::sql::expr::and_all(having) {
        stmt = stmt.having(having);
    }

    Ok(stmt)
}

/// `FN(column)`, or `COUNT(*)` for a field-less count.
fn aggregate_expr(
    aggregation: &Aggregation,
    conditions: &ConditionCompiler<'_>,
) -> CompileResult<Expr> {
    let name = aggregation.function.sql_name();
    match &aggregation.field {
        Some(field) => Ok(func(name, vec![conditions.column(field)?])),
        None if aggregation.function == crate::model::AggregateFn::Count => {
            Ok(func(name, vec![star()]))
        }
        None => Err(CompileError::InvalidAggregateExpression(format!("{name}(*)"))),
    }
}

/// PostgreSQL requires ORDER BY to start with the DISTINCT ON expressions.
fn lead_with_distinct(leading: &[Expr], order_by: Vec<OrderByExpr>) -> Vec<OrderByExpr> {
    let mut result: Vec<OrderByExpr> = leading
        .iter()
        .map(|expr| {
            order_by
                .iter()
                .find(|o| &o.expr == expr)
                .cloned()
                .unwrap_or_else(|| OrderByExpr::asc(expr.clone()))
        })
        .collect();
    result.extend(order_by.into_iter().filter(|o| !leading.contains(&o.expr)));
    result
}
