//! Replication client backed by `mysql_async`'s binlog stream.
//!
//! The client registers as a replica with the configured server id, reads
//! row events, resolves each event's table through the stream's table map,
//! and converts row images into [`RowsEvent`]s. Update events are flattened
//! to interleaved `[before, after]` images.
//!
//! Column metadata is checked against each table map. When the column count
//! differs, the table's metadata is reloaded over a side connection. Rows
//! that still do not match are dropped.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use binlog_types::{Column, ColumnKind, RawValue, RowImage};
use chrono::DateTime;
use futures::StreamExt;
use mysql_async::binlog::events::{EventData, RowsEventData, TableMapEvent};
use mysql_async::binlog::row::BinlogRow;
use mysql_async::binlog::value::BinlogValue;
use mysql_async::prelude::*;
use mysql_async::{BinlogStreamRequest, Conn, Opts, OptsBuilder, Row, Value};
use tracing::{debug, error, info, warn};

use crate::client::{EventSink, ReplicationClient};
use crate::error::CdcError;
use crate::event::{RowAction, RowsEvent};
use crate::options::{Flavor, SourceOpts};
use crate::position::BinlogPosition;
use crate::schema::load_table_columns;

pub struct MySqlBinlogClient {
    conn: Option<Conn>,
    /// For side connections that reload metadata while streaming
    opts: Opts,
    address: String,
    flavor: Flavor,
    server_id: u32,
    /// Column metadata per qualified table name
    tables: HashMap<String, Arc<[Column]>>,
}

impl MySqlBinlogClient {
    /// Connect to the source and load column metadata for `tables`
    /// (qualified `schema.table` names).
    pub async fn connect(source: &SourceOpts, tables: &[&str]) -> Result<Self, CdcError> {
        let address = source.address();
        let password = (!source.password.is_empty()).then(|| source.password.clone());
        let opts = OptsBuilder::default()
            .ip_or_hostname(source.host.clone())
            .tcp_port(source.port)
            .user(Some(source.user.clone()))
            .pass(password);
        let opts = Opts::from(opts);

        let mut conn = Conn::new(opts.clone())
            .await
            .map_err(|source| CdcError::Connect {
                address: address.clone(),
                source,
            })?;
        info!(address = %address, flavor = %source.flavor, "Connected to replication source");

        let mut columns = HashMap::new();
        for name in tables {
            let (schema, table) = name.split_once('.').ok_or_else(|| {
                CdcError::InvalidOptions(format!("table '{name}' is not qualified"))
            })?;
            let table_columns = load_table_columns(&mut conn, schema, table).await?;
            debug!(table = %name, columns = table_columns.len(), "Loaded column metadata");
            columns.insert(name.to_string(), table_columns);
        }

        Ok(Self {
            conn: Some(conn),
            opts,
            address,
            flavor: source.flavor,
            server_id: source.server_id,
            tables: columns,
        })
    }

    fn table_columns(&self, name: &str, column_count: usize) -> TableColumns {
        match self.tables.get(name) {
            None => TableColumns::Untracked,
            Some(columns) if columns.len() == column_count => {
                TableColumns::Current(columns.clone())
            }
            Some(columns) => TableColumns::Stale(columns.clone()),
        }
    }

    /// Reload the metadata of `schema.table` after its layout changed.
    async fn refresh_columns(&mut self, schema: &str, table: &str) {
        let name = format!("{schema}.{table}");
        let reloaded = async {
            let mut conn = Conn::new(self.opts.clone())
                .await
                .map_err(|e| CdcError::Schema {
                    table: name.clone(),
                    reason: e.to_string(),
                })?;
            let columns = load_table_columns(&mut conn, schema, table).await;
            if let Err(e) = conn.disconnect().await {
                debug!(error = %e, "Failed to close metadata connection");
            }
            columns
        }
        .await;

        match reloaded {
            Ok(columns) => {
                info!(table = %name, columns = columns.len(), "Reloaded column metadata");
                self.tables.insert(name, columns);
            }
            Err(e) => warn!(table = %name, error = %e, "Failed to reload column metadata"),
        }
    }

    fn rows_event(
        &self,
        tme: &TableMapEvent<'_>,
        data: &RowsEventData<'_>,
        position: BinlogPosition,
    ) -> std::io::Result<RowsEvent> {
        let schema = tme.database_name().into_owned();
        let table = tme.table_name().into_owned();
        let action = match data {
            RowsEventData::WriteRowsEvent(_) | RowsEventData::WriteRowsEventV1(_) => {
                RowAction::Insert
            }
            RowsEventData::DeleteRowsEvent(_) | RowsEventData::DeleteRowsEventV1(_) => {
                RowAction::Delete
            }
            _ => RowAction::Update,
        };

        let column_count = tme.columns_count() as usize;
        let columns = match self.table_columns(&format!("{schema}.{table}"), column_count) {
            TableColumns::Current(columns) => columns,
            // No metadata, so only the identity is forwarded.
            TableColumns::Untracked => {
                return Ok(
                    RowsEvent::new(schema, table, action, Vec::<Column>::new(), Vec::new())
                        .with_position(position),
                );
            }
            TableColumns::Stale(columns) => {
                error!(
                    table = %format!("{schema}.{table}"),
                    expected = columns.len(),
                    actual = column_count,
                    position = %position,
                    "Column count differs from table metadata, rows dropped"
                );
                return Ok(RowsEvent::new(schema, table, action, columns, Vec::new())
                    .with_position(position));
            }
        };

        let mut rows = Vec::new();
        for images in data.rows(tme) {
            let (before, after) = images?;
            for image in [before, after].into_iter().flatten() {
                rows.push(convert_row(&image, &columns));
            }
        }

        Ok(RowsEvent {
            schema,
            table,
            action,
            columns,
            rows,
            position: Some(position),
        })
    }
}

#[async_trait]
impl ReplicationClient for MySqlBinlogClient {
    async fn current_position(&mut self) -> Result<BinlogPosition, CdcError> {
        let conn = self.conn.as_mut().ok_or_else(|| {
            CdcError::PositionUnavailable("connection is already streaming".to_string())
        })?;

        let row = match conn.query_first::<Row, _>("SHOW MASTER STATUS").await {
            Ok(row) => row,
            Err(e) => {
                debug!(error = %e, "SHOW MASTER STATUS failed, trying SHOW BINARY LOG STATUS");
                conn.query_first::<Row, _>("SHOW BINARY LOG STATUS")
                    .await
                    .map_err(|e| CdcError::PositionUnavailable(e.to_string()))?
            }
        };

        let row = row.ok_or_else(|| {
            CdcError::PositionUnavailable("binary logging is disabled on the source".to_string())
        })?;
        let file: String = row
            .get(0)
            .ok_or_else(|| CdcError::PositionUnavailable("missing binlog file".to_string()))?;
        let pos: u64 = row
            .get(1)
            .ok_or_else(|| CdcError::PositionUnavailable("missing binlog offset".to_string()))?;

        Ok(BinlogPosition::new(file, pos))
    }

    async fn run_from(&mut self, position: BinlogPosition, sink: &mut dyn EventSink) -> CdcError {
        let Some(mut conn) = self.conn.take() else {
            return CdcError::StreamClosed;
        };

        if self.flavor == Flavor::MariaDb {
            if let Err(e) = conn.query_drop("SET @mariadb_slave_capability = 4").await {
                return CdcError::Transport(e.to_string());
            }
        }

        let request = BinlogStreamRequest::new(self.server_id)
            .with_filename(position.file.as_bytes())
            .with_pos(position.pos);
        let mut stream = match conn.get_binlog_stream(request).await {
            Ok(stream) => stream,
            Err(e) => return CdcError::Transport(e.to_string()),
        };
        info!(
            address = %self.address,
            position = %position,
            server_id = self.server_id,
            "Binlog stream started"
        );

        let mut current = position;
        while let Some(event) = stream.next().await {
            let event = match event {
                Ok(event) => event,
                Err(e) => return CdcError::Transport(e.to_string()),
            };
            let log_pos = u64::from(event.header().log_pos());
            let data = match event.read_data() {
                Ok(data) => data,
                Err(e) => return CdcError::Transport(e.to_string()),
            };

            match data {
                Some(EventData::RotateEvent(rotate)) => {
                    current = BinlogPosition::new(rotate.name().into_owned(), rotate.position());
                    debug!(position = %current, "Binlog rotated");
                    sink.on_rotate(&current);
                }
                Some(EventData::RowsEvent(rows)) => {
                    if log_pos > 0 {
                        current = current.at(log_pos);
                    }
                    let (schema, table, column_count) = match stream.get_tme(rows.table_id()) {
                        Some(tme) => (
                            tme.database_name().into_owned(),
                            tme.table_name().into_owned(),
                            tme.columns_count() as usize,
                        ),
                        None => {
                            debug!(table_id = rows.table_id(), "Rows event without table map");
                            continue;
                        }
                    };
                    let name = format!("{schema}.{table}");
                    if let TableColumns::Stale(_) = self.table_columns(&name, column_count) {
                        self.refresh_columns(&schema, &table).await;
                    }

                    let Some(tme) = stream.get_tme(rows.table_id()) else {
                        continue;
                    };
                    match self.rows_event(tme, &rows, current.clone()) {
                        Ok(rows_event) => sink.on_rows(rows_event),
                        Err(e) => return CdcError::Transport(e.to_string()),
                    }
                }
                _ => {
                    if log_pos > 0 {
                        current = current.at(log_pos);
                    }
                }
            }
        }

        CdcError::StreamClosed
    }
}

/// Loaded metadata of a table compared with a table map.
#[derive(Debug)]
enum TableColumns {
    Untracked,
    Current(Arc<[Column]>),
    /// Loaded, but with a different column count
    Stale(Arc<[Column]>),
}

fn convert_row(row: &BinlogRow, columns: &[Column]) -> RowImage {
    (0..row.len())
        .map(|index| match (row.as_ref(index), columns.get(index)) {
            (Some(BinlogValue::Value(value)), Some(column)) => convert_value(value, column),
            (Some(BinlogValue::Value(value)), None) => {
                convert_value(value, &Column::new("", ColumnKind::String))
            }
            // JSON documents and partial JSON updates are not decoded.
            _ => RawValue::Null,
        })
        .collect()
}

/// Convert one protocol value into its row-image representation.
fn convert_value(value: &Value, column: &Column) -> RawValue {
    match value {
        Value::NULL => RawValue::Null,
        Value::Int(i) if column.kind == ColumnKind::Timestamp => unix_timestamp(*i, 0),
        Value::UInt(u) if column.kind == ColumnKind::Timestamp => match i64::try_from(*u) {
            Ok(secs) => unix_timestamp(secs, 0),
            Err(_) => RawValue::U64(*u),
        },
        Value::Int(i) => RawValue::I64(*i),
        Value::UInt(u) => RawValue::U64(*u),
        Value::Float(f) => RawValue::F32(*f),
        Value::Double(d) => RawValue::F64(*d),
        Value::Bytes(bytes) => convert_bytes(bytes, column),
        Value::Date(year, month, day, hour, minute, second, micros) => {
            let date = format!("{year:04}-{month:02}-{day:02}");
            if column.kind == ColumnKind::Date {
                RawValue::Text(date)
            } else {
                RawValue::Text(format!(
                    "{date} {hour:02}:{minute:02}:{second:02}{}",
                    fraction(*micros)
                ))
            }
        }
        Value::Time(negative, days, hours, minutes, seconds, micros) => {
            let sign = if *negative { "-" } else { "" };
            let hours = u64::from(*days) * 24 + u64::from(*hours);
            RawValue::Text(format!(
                "{sign}{hours:02}:{minutes:02}:{seconds:02}{}",
                fraction(*micros)
            ))
        }
    }
}

fn convert_bytes(bytes: &[u8], column: &Column) -> RawValue {
    match column.kind {
        ColumnKind::Binary | ColumnKind::Bit | ColumnKind::Point => RawValue::Bytes(bytes.to_vec()),
        // TIMESTAMP2 arrives as `secs[.fraction]` since the epoch.
        ColumnKind::Timestamp => std::str::from_utf8(bytes)
            .ok()
            .and_then(parse_unix_seconds)
            .map(|(secs, micros)| unix_timestamp(secs, micros))
            .unwrap_or_else(|| text(bytes)),
        // YEAR arrives as decimal digits.
        ColumnKind::Number | ColumnKind::MediumInt => {
            let digits = std::str::from_utf8(bytes).ok().map(str::trim);
            if let Some(i) = digits.and_then(|d| d.parse::<i64>().ok()) {
                RawValue::I64(i)
            } else if let Some(u) = digits.and_then(|d| d.parse::<u64>().ok()) {
                RawValue::U64(u)
            } else {
                text(bytes)
            }
        }
        // 1 or 2 byte little-endian label index
        ColumnKind::Enum if (1..=2).contains(&bytes.len()) => {
            RawValue::U64(little_endian(bytes))
        }
        // Little-endian bitmask over the labels
        ColumnKind::Set if !column.enum_labels.is_empty() && bytes.len() <= 8 => {
            let mask = little_endian(bytes);
            let labels: Vec<&str> = column
                .enum_labels
                .iter()
                .enumerate()
                .filter(|(bit, _)| *bit < 64 && mask & (1 << bit) != 0)
                .map(|(_, label)| label.as_str())
                .collect();
            RawValue::Text(labels.join(","))
        }
        ColumnKind::Set => RawValue::Bytes(bytes.to_vec()),
        _ => text(bytes),
    }
}

fn text(bytes: &[u8]) -> RawValue {
    match String::from_utf8(bytes.to_vec()) {
        Ok(text) => RawValue::Text(text),
        Err(e) => RawValue::Bytes(e.into_bytes()),
    }
}

fn little_endian(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .rev()
        .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte))
}

/// `secs` or `secs.fraction`, fraction digits read as a decimal fraction.
fn parse_unix_seconds(s: &str) -> Option<(i64, u32)> {
    let (secs, frac) = match s.trim().split_once('.') {
        Some((secs, frac)) => (secs, frac),
        None => (s.trim(), ""),
    };
    let secs = secs.parse::<i64>().ok()?;
    if frac.len() > 6 || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let micros = if frac.is_empty() {
        0
    } else {
        format!("{frac:0<6}").parse::<u32>().ok()?
    };
    Some((secs, micros))
}

fn unix_timestamp(secs: i64, micros: u32) -> RawValue {
    match DateTime::from_timestamp(secs, micros * 1_000) {
        Some(at) => RawValue::Text(format!(
            "{}{}",
            at.format("%Y-%m-%d %H:%M:%S"),
            fraction(micros)
        )),
        None => RawValue::I64(secs),
    }
}

fn fraction(micros: u32) -> String {
    if micros == 0 {
        String::new()
    } else {
        format!(".{micros:06}")
    }
}
