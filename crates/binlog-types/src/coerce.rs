//! Permissive coercion of row values into semantic types.
//!
//! Every function is total: a column of the wrong kind, a value of the wrong
//! representation, or an unparseable string yields the zero value of the
//! target type. Replication streams carry DDL drift and unexpected NULLs, and
//! a zero value keeps the row flowing to the handler.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::column::{Column, ColumnKind};
use crate::value::RawValue;

/// Layout of temporal values in row images (`YYYY-MM-DD HH:MM:SS`).
///
/// A trailing fractional second is accepted when present.
pub const TIMESTAMP_LAYOUT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// The value a timestamp takes when it cannot be decoded.
pub fn zero_timestamp() -> DateTime<Utc> {
    DateTime::<Utc>::default()
}

/// Signed integer coercion; only numeric columns yield a non-zero value.
pub fn to_i64(kind: ColumnKind, value: &RawValue) -> i64 {
    if !kind.is_numeric() {
        return 0;
    }
    value.as_i64().unwrap_or(0)
}

/// Unsigned integer coercion; only numeric columns yield a non-zero value.
pub fn to_u64(kind: ColumnKind, value: &RawValue) -> u64 {
    if !kind.is_numeric() {
        return 0;
    }
    value.as_u64().unwrap_or(0)
}

/// `1` is true, everything else is false.
pub fn to_bool(kind: ColumnKind, value: &RawValue) -> bool {
    to_i64(kind, value) == 1
}

pub fn to_f64(kind: ColumnKind, value: &RawValue) -> f64 {
    if !kind.is_float() {
        return 0.0;
    }
    value.as_f64().unwrap_or(0.0)
}

/// String coercion.
///
/// ENUM columns resolve their stored 1-based index against the column's
/// labels. Index 0, an out-of-range index, a NULL or an empty label list
/// give an empty string. Other columns accept text or bytes.
pub fn to_string(column: &Column, value: &RawValue) -> String {
    if column.kind == ColumnKind::Enum {
        return enum_label(&column.enum_labels, value)
            .map(str::to_string)
            .unwrap_or_default();
    }

    match value {
        RawValue::Text(s) => s.clone(),
        RawValue::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
        _ => String::new(),
    }
}

fn enum_label<'a>(labels: &'a [String], value: &RawValue) -> Option<&'a str> {
    let index = value.as_i64()?;
    let position = usize::try_from(index).ok()?.checked_sub(1)?;
    labels.get(position).map(String::as_str)
}

/// Timestamp coercion for DATETIME, TIMESTAMP, DATE and TIME columns.
///
/// The value must match [`TIMESTAMP_LAYOUT`]; it is read as UTC.
pub fn to_timestamp(kind: ColumnKind, value: &RawValue) -> DateTime<Utc> {
    if !kind.is_temporal() {
        return zero_timestamp();
    }
    value
        .as_str()
        .and_then(|s| NaiveDateTime::parse_from_str(s.trim(), TIMESTAMP_LAYOUT).ok())
        .map(|naive| naive.and_utc())
        .unwrap_or_else(zero_timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_integer_width_roundtrip() {
        for expected in [0i64, 1, -1, 42, i8::MIN as i64, i8::MAX as i64] {
            assert_eq!(to_i64(ColumnKind::Number, &RawValue::I8(expected as i8)), expected);
        }
        for expected in [i16::MIN as i64, -300, 300, i16::MAX as i64] {
            assert_eq!(to_i64(ColumnKind::Number, &RawValue::I16(expected as i16)), expected);
        }
        for expected in [i32::MIN as i64, -70_000, 70_000, i32::MAX as i64] {
            assert_eq!(to_i64(ColumnKind::Number, &RawValue::I32(expected as i32)), expected);
        }
        for expected in [i64::MIN, -1, i64::MAX] {
            assert_eq!(to_i64(ColumnKind::Number, &RawValue::I64(expected)), expected);
        }
        for expected in [0u64, 200, u8::MAX as u64] {
            assert_eq!(to_u64(ColumnKind::Number, &RawValue::U8(expected as u8)), expected);
        }
        for expected in [u16::MAX as u64, u32::MAX as u64] {
            assert_eq!(to_u64(ColumnKind::Number, &RawValue::U32(expected as u32)), expected);
        }
        assert_eq!(to_u64(ColumnKind::Number, &RawValue::U16(65_000)), 65_000);
        assert_eq!(to_u64(ColumnKind::Number, &RawValue::U64(u64::MAX)), u64::MAX);
        assert_eq!(to_i64(ColumnKind::MediumInt, &RawValue::U32(8_000_000)), 8_000_000);
    }

    #[test]
    fn test_integer_requires_numeric_column() {
        assert_eq!(to_i64(ColumnKind::String, &RawValue::I64(5)), 0);
        assert_eq!(to_u64(ColumnKind::Float, &RawValue::U64(5)), 0);
        assert_eq!(to_i64(ColumnKind::Number, &RawValue::Text("5".into())), 0);
        assert_eq!(to_i64(ColumnKind::Number, &RawValue::Null), 0);
    }

    #[test]
    fn test_bool() {
        assert!(to_bool(ColumnKind::Number, &RawValue::I8(1)));
        assert!(!to_bool(ColumnKind::Number, &RawValue::I8(0)));
        assert!(!to_bool(ColumnKind::Number, &RawValue::I8(2)));
        assert!(!to_bool(ColumnKind::String, &RawValue::I8(1)));
    }

    #[test]
    fn test_float() {
        assert_eq!(to_f64(ColumnKind::Float, &RawValue::F64(2.5)), 2.5);
        assert_eq!(to_f64(ColumnKind::Float, &RawValue::F32(0.5)), 0.5);
        assert_eq!(to_f64(ColumnKind::Decimal, &RawValue::F64(2.5)), 0.0);
        assert_eq!(to_f64(ColumnKind::Float, &RawValue::I64(2)), 0.0);
    }

    #[test]
    fn test_enum_labels() {
        let column = Column::new("grade", ColumnKind::Enum)
            .with_enum_labels(vec!["a".into(), "b".into(), "c".into()]);
        assert_eq!(to_string(&column, &RawValue::I64(2)), "b");
        assert_eq!(to_string(&column, &RawValue::U8(3)), "c");
        assert_eq!(to_string(&column, &RawValue::I64(0)), "");
        assert_eq!(to_string(&column, &RawValue::I64(4)), "");
        assert_eq!(to_string(&column, &RawValue::I64(-1)), "");
        assert_eq!(to_string(&column, &RawValue::Null), "");

        let unlabeled = Column::new("grade", ColumnKind::Enum);
        assert_eq!(to_string(&unlabeled, &RawValue::I64(2)), "");
    }

    #[test]
    fn test_string_representations() {
        let column = Column::new("status", ColumnKind::String);
        assert_eq!(to_string(&column, &RawValue::Text("pending".into())), "pending");
        assert_eq!(to_string(&column, &RawValue::Bytes(b"shipped".to_vec())), "shipped");
        assert_eq!(to_string(&column, &RawValue::I64(3)), "");
    }

    #[test]
    fn test_timestamp() {
        let expected = Utc.with_ymd_and_hms(2023, 5, 1, 10, 0, 0).unwrap();
        let value = RawValue::Text("2023-05-01 10:00:00".into());
        assert_eq!(to_timestamp(ColumnKind::DateTime, &value), expected);
        assert_eq!(to_timestamp(ColumnKind::Timestamp, &value), expected);
        assert_eq!(
            to_timestamp(ColumnKind::DateTime, &RawValue::Bytes(b"2023-05-01 10:00:00".to_vec())),
            expected
        );
        assert_eq!(to_timestamp(ColumnKind::String, &value), zero_timestamp());
    }

    #[test]
    fn test_timestamp_fraction_and_garbage() {
        let with_fraction = RawValue::Text("2023-05-01 10:00:00.250000".into());
        let parsed = to_timestamp(ColumnKind::DateTime, &with_fraction);
        assert_eq!(parsed.timestamp_subsec_millis(), 250);

        assert_eq!(
            to_timestamp(ColumnKind::DateTime, &RawValue::Text("yesterday".into())),
            zero_timestamp()
        );
        assert_eq!(
            to_timestamp(ColumnKind::Date, &RawValue::Text("2023-05-01".into())),
            zero_timestamp()
        );
        assert_eq!(to_timestamp(ColumnKind::DateTime, &RawValue::I64(1)), zero_timestamp());
    }
}
