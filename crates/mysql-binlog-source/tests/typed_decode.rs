//! Typed records through a session

use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use mysql_binlog_source::testing::{RecordingDiagnostics, ScriptedClient};
use mysql_binlog_source::{
    BinlogPosition, BinlogRecord, Cdc, Column, ColumnKind, DecodeError, Descriptor, Options,
    RawValue, RowAction, RowsEvent, SourceOpts, TableBinding,
};

#[derive(Debug, Default, Clone, PartialEq)]
struct Order {
    id: i64,
    customer_id: u32,
    status: String,
    total: f64,
    paid: bool,
    created_at: DateTime<Utc>,
    shipped_at: Option<DateTime<Utc>>,
    note: String,
}

impl BinlogRecord for Order {
    fn descriptor() -> Descriptor<Self> {
        Descriptor::<Self>::new()
            .int("id", "column:id", |o, v| o.id = v)
            .uint("customer_id", "column:customer_id", |o, v| {
                o.customer_id = v as u32
            })
            .string("status", "column:status", |o, v| o.status = v)
            .float("total", "column:total", |o, v| o.total = v)
            .bool("paid", "column:is_paid", |o, v| o.paid = v)
            .timestamp("created_at", "column:created_at", |o, v| o.created_at = v)
            .optional_timestamp("shipped_at", "column:shipped_at", |o, v| {
                o.shipped_at = Some(v)
            })
            // Not a source column.
            .string("note", "column:COLUMN", |o, v| o.note = v)
    }
}

fn columns() -> Vec<Column> {
    vec![
        Column::new("id", ColumnKind::Number),
        Column::new("customer_id", ColumnKind::MediumInt),
        Column::from_information_schema(
            "status".to_string(),
            "enum",
            "enum('pending','paid','shipped')",
        ),
        Column::new("total", ColumnKind::Float),
        Column::new("is_paid", ColumnKind::Number),
        Column::new("created_at", ColumnKind::DateTime),
        Column::new("shipped_at", ColumnKind::Timestamp),
    ]
}

fn image(id: i64, status: u8, paid: i8, shipped_at: Option<&str>) -> Vec<RawValue> {
    vec![
        RawValue::I64(id),
        RawValue::U32(42),
        RawValue::U8(status),
        RawValue::F64(19.5),
        RawValue::I8(paid),
        RawValue::from("2023-05-01 10:00:00"),
        RawValue::from(shipped_at),
    ]
}

fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 5, 1, hour, 0, 0).unwrap()
}

fn source() -> SourceOpts {
    SourceOpts {
        database: "shop".to_string(),
        ..SourceOpts::default()
    }
}

#[tokio::test]
async fn test_update_decodes_typed_pairs() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let sink = calls.clone();
    let options = Options::new(source()).table(TableBinding::typed(
        "orders",
        move |old: Option<Order>, new: Option<Order>, table| {
            sink.lock().unwrap().push((old, new, table.to_string()))
        },
    ));
    let client = ScriptedClient::new(BinlogPosition::new("mysql-bin.000001", 4)).event(
        RowsEvent::new(
            "shop",
            "orders",
            RowAction::Update,
            columns(),
            vec![
                image(1001, 1, 0, None),
                image(1001, 3, 1, Some("2023-05-01 12:00:00")),
            ],
        ),
    );
    let diagnostics = Arc::new(RecordingDiagnostics::default());
    let mut cdc = Cdc::with_client(options, client, diagnostics.clone()).unwrap();

    cdc.listen().await;

    let expected_old = Order {
        id: 1001,
        customer_id: 42,
        status: "pending".to_string(),
        total: 19.5,
        paid: false,
        created_at: at(10),
        shipped_at: None,
        note: String::new(),
    };
    let expected_new = Order {
        status: "shipped".to_string(),
        paid: true,
        shipped_at: Some(at(12)),
        ..expected_old.clone()
    };

    let calls = calls.lock().unwrap();
    assert_eq!(
        *calls,
        vec![(
            Some(expected_old),
            Some(expected_new),
            "shop.orders".to_string()
        )]
    );
    assert!(diagnostics.skipped_rows().is_empty());
}

#[tokio::test]
async fn test_mismatched_kinds_fall_back_to_zero_values() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let sink = calls.clone();
    let options = Options::new(source()).table(TableBinding::typed(
        "orders",
        move |_, new: Option<Order>, _| sink.lock().unwrap().push(new),
    ));
    // Every column reported as text.
    let columns: Vec<Column> = columns()
        .into_iter()
        .map(|c| Column::new(c.name, ColumnKind::String))
        .collect();
    let client = ScriptedClient::new(BinlogPosition::new("mysql-bin.000001", 4)).event(
        RowsEvent::new(
            "shop",
            "orders",
            RowAction::Insert,
            columns,
            vec![vec![
                RawValue::from("1001"),
                RawValue::from("42"),
                RawValue::from("paid"),
                RawValue::from("19.5"),
                RawValue::from("1"),
                RawValue::from("2023-05-01 10:00:00"),
                RawValue::Null,
            ]],
        ),
    );
    let mut cdc =
        Cdc::with_client(options, client, Arc::new(RecordingDiagnostics::default())).unwrap();

    cdc.listen().await;

    let calls = calls.lock().unwrap();
    assert_eq!(
        *calls,
        vec![Some(Order {
            status: "paid".to_string(),
            ..Order::default()
        })]
    );
}

#[tokio::test]
async fn test_missing_descriptor_skips_event_once() {
    let calls = Arc::new(Mutex::new(0));
    let sink = calls.clone();
    let options = Options::new(source()).table(TableBinding::with_descriptor(
        "orders",
        None::<Descriptor<Order>>,
        move |_, _, _| *sink.lock().unwrap() += 1,
    ));
    let client = ScriptedClient::new(BinlogPosition::new("mysql-bin.000001", 4)).event(
        RowsEvent::new(
            "shop",
            "orders",
            RowAction::Insert,
            columns(),
            vec![image(1, 1, 0, None), image(2, 1, 0, None)],
        ),
    );
    let diagnostics = Arc::new(RecordingDiagnostics::default());
    let mut cdc = Cdc::with_client(options, client, diagnostics.clone()).unwrap();

    cdc.listen().await;

    assert_eq!(*calls.lock().unwrap(), 0);
    assert_eq!(
        diagnostics.skip_errors(),
        vec![DecodeError::MissingDescriptor {
            table: "shop.orders".to_string()
        }]
    );
    assert_eq!(cdc.stats().rows_skipped, 2);
}
