//! Row decoding: one row image into a record.
//!
//! Generic decoding maps every column name to its raw value. Typed decoding
//! walks a [`Descriptor`] and coerces the bound columns into the caller's
//! record. Field-level mismatches fall back to zero values; only a missing
//! row or a missing descriptor is an error.

use std::collections::HashMap;

use binlog_types::{coerce, RawValue};

use crate::descriptor::{Assign, Descriptor};
use crate::error::DecodeError;
use crate::event::RowsEvent;

/// A generically decoded row: column name to raw value.
pub type RowMap = HashMap<String, RawValue>;

const NULL: RawValue = RawValue::Null;

fn row_image(event: &RowsEvent, row: usize) -> Result<&[RawValue], DecodeError> {
    event
        .rows
        .get(row)
        .map(Vec::as_slice)
        .ok_or(DecodeError::RowOutOfRange {
            row,
            rows: event.rows.len(),
        })
}

/// Decode a row into a column-name keyed map.
pub fn decode_row(event: &RowsEvent, row: usize) -> Result<RowMap, DecodeError> {
    let values = row_image(event, row)?;
    if values.len() < event.columns.len() {
        return Err(DecodeError::ShortRow {
            row,
            columns: event.columns.len(),
            values: values.len(),
        });
    }

    Ok(event
        .columns
        .iter()
        .zip(values)
        .map(|(column, value)| (column.name.clone(), value.clone()))
        .collect())
}

/// Decode a row into a typed record.
///
/// Fields whose column is not part of the event keep their default value.
pub fn decode_typed<T: Default>(
    event: &RowsEvent,
    row: usize,
    descriptor: Option<&Descriptor<T>>,
) -> Result<T, DecodeError> {
    let descriptor = descriptor.ok_or_else(|| DecodeError::MissingDescriptor {
        table: event.qualified_name(),
    })?;
    let values = row_image(event, row)?;

    let mut record = T::default();
    for field in descriptor.bound_fields() {
        let Some(index) = field.column().and_then(|name| event.column_index(name)) else {
            continue;
        };
        let column = &event.columns[index];
        let value = values.get(index).unwrap_or(&NULL);

        match &field.assign {
            Assign::Int(set) => set(&mut record, coerce::to_i64(column.kind, value)),
            Assign::Uint(set) => set(&mut record, coerce::to_u64(column.kind, value)),
            Assign::Bool(set) => set(&mut record, coerce::to_bool(column.kind, value)),
            Assign::Float(set) => set(&mut record, coerce::to_f64(column.kind, value)),
            Assign::String(set) => set(&mut record, coerce::to_string(column, value)),
            Assign::Timestamp(set) => set(&mut record, coerce::to_timestamp(column.kind, value)),
            Assign::OptionalTimestamp(set) => {
                if !value.is_null() {
                    set(&mut record, coerce::to_timestamp(column.kind, value));
                }
            }
        }
    }

    Ok(record)
}
