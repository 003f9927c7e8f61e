//! Mapping rows and records into `record!` structs from outside the crate.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use prismo::executor::{AdapterError, AdapterResult, BufferedRows, RowCursor};
use prismo::mapper::{map_to_record, map_to_records, scan_row, FromRecord, MapError};
use prismo::model::{record_from_json, Value};
use prismo::record;
use serde_json::json;

record! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Order {
        pub id: u32,
        #[field(serialize = "customer,omitempty")]
        pub customer_name: String,
        pub total: f64,
        pub paid: bool,
        #[field(db = "receipt_pdf")]
        pub receipt: Vec<u8>,
        pub placed_at: Option<DateTime<Utc>>,
        pub raw: Value,
    }
}

fn columns() -> Vec<String> {
    ["id", "Customer", "total", "paid", "receipt_pdf", "placed_at", "raw"]
        .iter()
        .map(|c| c.to_string())
        .collect()
}

#[test]
fn test_field_table_follows_annotations() {
    let keys: Vec<_> = Order::FIELDS.iter().map(|f| f.key().into_owned()).collect();
    assert_eq!(
        keys,
        ["id", "customer", "total", "paid", "receipt_pdf", "placed_at", "raw"]
    );
}

#[test]
fn test_case_insensitive_columns() {
    let rec = record_from_json(json!({
        "ID": 12,
        "CUSTOMER": "Acme",
        "Total": 19.5,
        "PAID": 1,
    }));
    let mut order = Order::default();
    map_to_record(&rec, &mut order).unwrap();
    assert_eq!(order.id, 12);
    assert_eq!(order.customer_name, "Acme");
    assert_eq!(order.total, 19.5);
    assert!(order.paid);
    assert_eq!(order.raw, Value::Null);
}

#[test]
fn test_missing_columns_keep_defaults() {
    let orders: Vec<Order> = map_to_records(&[record_from_json(json!({"id": 1}))]).unwrap();
    assert_eq!(
        orders[0],
        Order {
            id: 1,
            ..Order::default()
        }
    );
}

#[test]
fn test_text_into_integer_is_rejected() {
    let rec = record_from_json(json!({"id": "12"}));
    let err = map_to_records::<Order>(&[rec]).unwrap_err();
    match err {
        MapError::Field { field, source } => {
            assert_eq!(field, "id");
            assert_eq!(
                source.to_string(),
                "text value \"12\" cannot be assigned to integer type u32"
            );
        }
        other => panic!("expected a field error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_scan_rows_from_cursor() {
    let placed = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
    let mut cursor = BufferedRows::new(
        columns(),
        vec![
            vec![
                Value::Int(1),
                Value::from("Acme"),
                Value::Int(20),
                Value::Bool(true),
                Value::Bytes(b"%PDF".to_vec()),
                Value::from("2024-05-06 07:08:09"),
                Value::array([1i64, 2]),
            ],
            vec![
                Value::Int32(2),
                Value::Null,
                Value::Float32(2.5),
                Value::Int(0),
                Value::Null,
                Value::Timestamp(placed),
                Value::Null,
            ],
        ],
    );

    let mut first = Order::default();
    assert!(scan_row(&mut cursor, &mut first).await.unwrap());
    assert_eq!(first.customer_name, "Acme");
    assert_eq!(first.total, 20.0);
    assert_eq!(first.receipt, b"%PDF".to_vec());
    assert_eq!(first.placed_at, Some(placed));
    assert_eq!(first.raw, Value::array([1i64, 2]));

    let mut second = Order::default();
    assert!(scan_row(&mut cursor, &mut second).await.unwrap());
    assert_eq!(second.id, 2);
    assert_eq!(second.customer_name, "");
    assert_eq!(second.total, 2.5);
    assert!(!second.paid);
    assert_eq!(second.placed_at, Some(placed));

    let mut untouched = Order::default();
    assert!(!scan_row(&mut cursor, &mut untouched).await.unwrap());
    assert_eq!(untouched, Order::default());
}

#[tokio::test]
async fn test_scan_rejects_malformed_timestamp() {
    let mut cursor = BufferedRows::new(
        vec!["placed_at".to_string()],
        vec![vec![Value::from("yesterday")]],
    );
    let err = scan_row(&mut cursor, &mut Order::default()).await.unwrap_err();
    let MapError::Field { source, .. } = err else {
        panic!("expected a field error");
    };
    assert!(matches!(*source, MapError::Parse { to: "DateTime<Utc>", .. }));
}

struct BrokenCursor {
    columns: Vec<String>,
}

#[async_trait]
impl RowCursor for BrokenCursor {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    async fn next_row(&mut self) -> AdapterResult<Option<Vec<Value>>> {
        Err(AdapterError::driver("socket closed"))
    }
}

#[tokio::test]
async fn test_scan_surfaces_cursor_errors() {
    let mut cursor = BrokenCursor { columns: columns() };
    let err = scan_row(&mut cursor, &mut Order::default()).await.unwrap_err();
    assert!(matches!(err, MapError::Cursor(AdapterError::Driver(_))));
}

#[tokio::test]
async fn test_scan_rejects_short_rows() {
    let mut cursor = BufferedRows::new(columns(), vec![vec![Value::Int(1)]]);
    let err = scan_row(&mut cursor, &mut Order::default()).await.unwrap_err();
    assert!(matches!(err, MapError::RowShape { columns: 7, values: 1 }));
}
