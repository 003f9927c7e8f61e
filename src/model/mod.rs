//! Query domain model.
//!
//! Plain data describing one logical operation: conditions, ordering,
//! pagination, aggregation, relation inclusion and write payloads. No
//! behavior lives here; see [`crate::compile`] for turning a [`Query`] into
//! SQL.

pub mod query;
pub mod value;

pub use query::{
    AggregateFn, Aggregation, Condition, Cursor, Filter, Mode, Operation, Operator, OrderBy,
    Query, RelationInclusion, Selection, SortOrder,
};
pub use value::{record_from_json, Record, Value, TIMESTAMP_FORMAT};
