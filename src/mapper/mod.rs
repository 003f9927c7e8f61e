//! Result mapper: generic [`Record`]s into typed structs.
//!
//! Rows are scanned into string-keyed records first and mapped second. Types
//! opt in through the [`record!`](crate::record) macro, which generates a
//! static [`FieldSpec`] table and a [`FromRecord`] impl.
//!
//! Each field reads the column named by, in order:
//!
//! 1. its `serialize` annotation, up to the first `,` (`"email,omitempty"`)
//! 2. its `db` annotation
//! 3. its own name, lower-cased
//!
//! Lookup tries an exact key first, then a case-insensitive match. Fields
//! with no matching column keep their default; extra columns are ignored.
//!
//! ```
//! use prismo::model::{record_from_json, Value};
//! use prismo::mapper::map_to_records;
//!
//! prismo::record! {
//!     #[derive(Debug, PartialEq)]
//!     pub struct Account {
//!         pub id: i64,
//!         #[field(serialize = "email,omitempty")]
//!         pub email: String,
//!         pub nickname: Option<String>,
//!     }
//! }
//!
//! let rows = vec![record_from_json(serde_json::json!({"id": 1, "EMAIL": "a@b.com"}))];
//! let accounts: Vec<Account> = map_to_records(&rows).unwrap();
//! assert_eq!(accounts[0].email, "a@b.com");
//! assert_eq!(accounts[0].nickname, None);
//! ```

mod macros;
pub mod value;

use std::borrow::Cow;

use thiserror::Error;

use crate::executor::{AdapterError, RowCursor};
use crate::model::{Record, Value};

pub use value::FromValue;

#[derive(Debug, Error)]
pub enum MapError {
    #[error("cannot map {from} into {to}")]
    Unsupported { from: &'static str, to: &'static str },

    #[error("text value {value:?} cannot be assigned to integer type {to}")]
    TextToInteger { value: String, to: &'static str },

    #[error("cannot parse {value:?} as {to}")]
    Parse { value: String, to: &'static str },

    #[error("field `{field}`")]
    Field {
        field: String,
        #[source]
        source: Box<MapError>,
    },

    #[error("row has {values} values for {columns} columns")]
    RowShape { columns: usize, values: usize },

    #[error("failed to read row")]
    Cursor(#[source] AdapterError),
}

pub type MapResult<T> = Result<T, MapError>;

/// Column-name annotations for one struct field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub serialize: Option<&'static str>,
    pub db: Option<&'static str>,
}

impl FieldSpec {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            serialize: None,
            db: None,
        }
    }

    pub const fn serialize(mut self, tag: &'static str) -> Self {
        self.serialize = Some(tag);
        self
    }

    pub const fn db(mut self, column: &'static str) -> Self {
        self.db = Some(column);
        self
    }

    /// Record key this field is read from.
    pub fn key(&self) -> Cow<'static, str> {
        if let Some(tag) = self.serialize {
            let name = tag.split(',').next().unwrap_or_default().trim();
            if !name.is_empty() && name != "-" {
                return Cow::Borrowed(name);
            }
        }
        match self.db {
            Some(column) if !column.is_empty() => Cow::Borrowed(column),
            _ => Cow::Owned(self.name.to_lowercase()),
        }
    }
}

/// A struct that can be populated from a [`Record`].
///
/// Implemented by the [`record!`](crate::record) macro; hand-written impls
/// must keep `FIELDS` and `set_field` in agreement.
pub trait FromRecord: Default {
    const FIELDS: &'static [FieldSpec];

    /// Assign `value` to the field called `field` (the Rust name).
    fn set_field(&mut self, field: &str, value: &Value) -> MapResult<()>;
}

fn lookup<'r>(record: &'r Record, key: &str) -> Option<&'r Value> {
    record.get(key).or_else(|| {
        record
            .iter()
            .find(|(column, _)| column.eq_ignore_ascii_case(key))
            .map(|(_, value)| value)
    })
}

/// Populate `dest` from one record.
pub fn map_to_record<T: FromRecord>(record: &Record, dest: &mut T) -> MapResult<()> {
    for spec in T::FIELDS {
        let Some(value) = lookup(record, &spec.key()) else {
            continue;
        };
        dest.set_field(spec.name, value)
            .map_err(|source| MapError::Field {
                field: spec.name.to_string(),
                source: Box::new(source),
            })?;
    }
    Ok(())
}

/// Map every record into a fresh `T`, failing on the first bad row.
pub fn map_to_records<T: FromRecord>(records: &[Record]) -> MapResult<Vec<T>> {
    records
        .iter()
        .map(|record| {
            let mut item = T::default();
            map_to_record(record, &mut item)?;
            Ok(item)
        })
        .collect()
}

/// Zip column names with one row's values, surfacing binary values as text.
pub fn row_to_record(columns: &[String], values: Vec<Value>) -> MapResult<Record> {
    if columns.len() != values.len() {
        return Err(MapError::RowShape {
            columns: columns.len(),
            values: values.len(),
        });
    }
    Ok(columns
        .iter()
        .cloned()
        .zip(values.into_iter().map(Value::into_textual))
        .collect())
}

/// Advance `cursor` by one row and map it into `dest`.
///
/// Returns `false` once the cursor is exhausted, leaving `dest` untouched.
pub async fn scan_row<T: FromRecord>(cursor: &mut dyn RowCursor, dest: &mut T) -> MapResult<bool> {
    let Some(values) = cursor.next_row().await.map_err(MapError::Cursor)? else {
        return Ok(false);
    };
    let record = row_to_record(cursor.columns(), values)?;
    map_to_record(&record, dest)?;
    Ok(true)
}
