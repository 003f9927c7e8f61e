//! The dialect-neutral description of one logical database operation.
//!
//! A [`Query`] is pure data. It is built per call by an upstream query
//! builder and never mutated by the compiler.

use serde::{Deserialize, Serialize};

use super::value::{Record, Value};

// =============================================================================
// Operation
// =============================================================================

/// The kind of operation a query describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    #[default]
    FindMany,
    FindFirst,
    FindUnique,
    Count,
    Aggregate,
    Create,
    CreateMany,
    Update,
    Delete,
    Upsert,
}

impl Operation {
    /// Whether the operation reads rows (SELECT-shaped).
    pub fn is_read(&self) -> bool {
        matches!(
            self,
            Operation::FindMany
                | Operation::FindFirst
                | Operation::FindUnique
                | Operation::Count
                | Operation::Aggregate
        )
    }
}

// =============================================================================
// Conditions
// =============================================================================

/// Comparison operator of a [`Condition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equals,
    NotEquals,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    NotIn,
    Contains,
    StartsWith,
    EndsWith,
    /// Array containment (PostgreSQL only).
    Has,
    /// `IS NULL`; a `false` value flips it to `IS NOT NULL`.
    IsNull,
    /// Full-text search (PostgreSQL only).
    Search,
}

impl Operator {
    pub fn name(&self) -> &'static str {
        match self {
            Operator::Equals => "equals",
            Operator::NotEquals => "not_equals",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::In => "in",
            Operator::NotIn => "not_in",
            Operator::Contains => "contains",
            Operator::StartsWith => "starts_with",
            Operator::EndsWith => "ends_with",
            Operator::Has => "has",
            Operator::IsNull => "is_null",
            Operator::Search => "search",
        }
    }
}

/// String matching mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Default,
    Insensitive,
}

/// A single predicate: `field operator value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub mode: Mode,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
            mode: Mode::Default,
        }
    }

    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Equals, value)
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Gt, value)
    }

    pub fn contains(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Contains, value)
    }

    pub fn is_null(field: impl Into<String>) -> Self {
        Self::new(field, Operator::IsNull, true)
    }

    pub fn is_not_null(field: impl Into<String>) -> Self {
        Self::new(field, Operator::IsNull, false)
    }

    /// Switch to case-insensitive matching.
    pub fn insensitive(mut self) -> Self {
        self.mode = Mode::Insensitive;
        self
    }
}

/// An ordered conjunction of conditions.
pub type Filter = Vec<Condition>;

// =============================================================================
// Ordering, pagination, aggregation
// =============================================================================

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// One ORDER BY item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    #[serde(default)]
    pub order: SortOrder,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Desc,
        }
    }
}

/// Cursor boundary: rows strictly after `value` on `field`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cursor {
    pub field: String,
    pub value: Value,
}

/// Aggregate function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateFn {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFn {
    pub fn sql_name(&self) -> &'static str {
        match self {
            AggregateFn::Count => "COUNT",
            AggregateFn::Sum => "SUM",
            AggregateFn::Avg => "AVG",
            AggregateFn::Min => "MIN",
            AggregateFn::Max => "MAX",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            AggregateFn::Count => "count",
            AggregateFn::Sum => "sum",
            AggregateFn::Avg => "avg",
            AggregateFn::Min => "min",
            AggregateFn::Max => "max",
        }
    }
}

/// An aggregate over a field; `field = None` means `*` (only meaningful for COUNT).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregation {
    pub function: AggregateFn,
    #[serde(default)]
    pub field: Option<String>,
}

impl Aggregation {
    pub fn new(function: AggregateFn, field: impl Into<String>) -> Self {
        Self {
            function,
            field: Some(field.into()),
        }
    }

    pub fn count_all() -> Self {
        Self {
            function: AggregateFn::Count,
            field: None,
        }
    }

    /// Result column alias: `_count`, `_sum_amount`, ...
    pub fn alias(&self) -> String {
        match &self.field {
            Some(field) => format!("_{}_{}", self.function.label(), field),
            None => format!("_{}", self.function.label()),
        }
    }
}

/// Which columns of the base model are selected.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    #[default]
    All,
    Fields(Vec<String>),
}

impl Selection {
    pub fn fields(&self) -> &[String] {
        match self {
            Selection::All => &[],
            Selection::Fields(fields) => fields,
        }
    }
}

/// A request to eager-load a related model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationInclusion {
    pub relation: String,
    /// Filtering, selection and further nesting on the related model.
    #[serde(default)]
    pub query: Option<Box<Query>>,
}

impl RelationInclusion {
    pub fn new(relation: impl Into<String>) -> Self {
        Self {
            relation: relation.into(),
            query: None,
        }
    }

    pub fn with_query(mut self, query: Query) -> Self {
        self.query = Some(Box::new(query));
        self
    }
}

// =============================================================================
// Query
// =============================================================================

/// One logical operation against one model.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
#[must_use = "Query has no effect until compiled"]
pub struct Query {
    pub model: String,
    pub operation: Operation,
    pub filter: Filter,
    pub ordering: Vec<OrderBy>,
    pub distinct: Vec<String>,
    pub cursor: Option<Cursor>,
    pub take: Option<u64>,
    pub skip: Option<u64>,
    pub group_by: Vec<String>,
    pub aggregations: Vec<Aggregation>,
    pub having: Filter,
    pub selection: Selection,
    pub relations: Vec<RelationInclusion>,
    /// Payload for `Create` and `Update`.
    pub data: Record,
    pub upsert_data: Record,
    pub upsert_keys: Vec<String>,
    pub upsert_update: Record,
    pub create_many_data: Vec<Record>,
    pub skip_duplicates: bool,
    pub throw_if_not_found: bool,
}

impl Query {
    /// Create a query on `model` for `operation`.
    pub fn new(model: impl Into<String>, operation: Operation) -> Self {
        Self {
            model: model.into(),
            operation,
            ..Default::default()
        }
    }

    pub fn find_many(model: impl Into<String>) -> Self {
        Self::new(model, Operation::FindMany)
    }

    /// Add a condition (ANDed with existing ones).
    pub fn filter(mut self, condition: Condition) -> Self {
        self.filter.push(condition);
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.ordering.push(order);
        self
    }

    pub fn distinct(mut self, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.distinct = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn cursor(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.cursor = Some(Cursor {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn take(mut self, take: u64) -> Self {
        self.take = Some(take);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn group_by(mut self, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.group_by = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn aggregate(mut self, aggregation: Aggregation) -> Self {
        self.aggregations.push(aggregation);
        self
    }

    pub fn having(mut self, condition: Condition) -> Self {
        self.having.push(condition);
        self
    }

    pub fn select(mut self, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.selection = Selection::Fields(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn include(mut self, relation: RelationInclusion) -> Self {
        self.relations.push(relation);
        self
    }

    pub fn data(mut self, data: Record) -> Self {
        self.data = data;
        self
    }

    pub fn upsert(mut self, data: Record, keys: impl IntoIterator<Item = impl Into<String>>, update: Record) -> Self {
        self.upsert_data = data;
        self.upsert_keys = keys.into_iter().map(Into::into).collect();
        self.upsert_update = update;
        self
    }

    pub fn create_many(mut self, rows: Vec<Record>) -> Self {
        self.create_many_data = rows;
        self
    }

    pub fn skip_duplicates(mut self) -> Self {
        self.skip_duplicates = true;
        self
    }

    pub fn throw_if_not_found(mut self) -> Self {
        self.throw_if_not_found = true;
        self
    }
}
