//! Row values as they come off the replication stream.
//!
//! The replication client decodes every cell of a row image into a
//! `RawValue`. The variant records the wire representation the client
//! produced, so coercion into a target kind is a match on the variant and
//! needs no runtime type inspection.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Serialize, Serializer};

/// One ordered row image: values are aligned with the event's column list.
pub type RowImage = Vec<RawValue>;

/// A single decoded column value.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// SQL NULL, or a column missing from the row image
    Null,

    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),

    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),

    F32(f32),
    F64(f64),

    /// Character data already decoded to UTF-8
    Text(String),

    /// Opaque bytes (binary columns, or character data the client left raw)
    Bytes(Vec<u8>),
}

impl RawValue {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Widen or narrow any integer representation to `i64`.
    ///
    /// Unsigned values above `i64::MAX` wrap, matching a two's complement cast.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::I8(v) => Some(v as i64),
            Self::I16(v) => Some(v as i64),
            Self::I32(v) => Some(v as i64),
            Self::I64(v) => Some(v),
            Self::U8(v) => Some(v as i64),
            Self::U16(v) => Some(v as i64),
            Self::U32(v) => Some(v as i64),
            Self::U64(v) => Some(v as i64),
            _ => None,
        }
    }

    /// Widen or narrow any integer representation to `u64`.
    ///
    /// Negative values wrap, matching a two's complement cast.
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Self::I8(v) => Some(v as u64),
            Self::I16(v) => Some(v as u64),
            Self::I32(v) => Some(v as u64),
            Self::I64(v) => Some(v as u64),
            Self::U8(v) => Some(v as u64),
            Self::U16(v) => Some(v as u64),
            Self::U32(v) => Some(v as u64),
            Self::U64(v) => Some(v),
            _ => None,
        }
    }

    /// Get a float representation as `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::F32(v) => Some(v as f64),
            Self::F64(v) => Some(v),
            _ => None,
        }
    }

    /// Get character data, accepting either text or UTF-8 bytes.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Bytes(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for RawValue {
                fn from(v: $ty) -> Self {
                    RawValue::$variant(v)
                }
            }
        )*
    };
}

impl_from! {
    i8 => I8, i16 => I16, i32 => I32, i64 => I64,
    u8 => U8, u16 => U16, u32 => U32, u64 => U64,
    f32 => F32, f64 => F64,
    String => Text, Vec<u8> => Bytes,
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        RawValue::Text(v.to_string())
    }
}

impl<T: Into<RawValue>> From<Option<T>> for RawValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(RawValue::Null)
    }
}

/// Values serialize as plain JSON scalars; bytes are base64 encoded.
impl Serialize for RawValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::I8(v) => serializer.serialize_i8(*v),
            Self::I16(v) => serializer.serialize_i16(*v),
            Self::I32(v) => serializer.serialize_i32(*v),
            Self::I64(v) => serializer.serialize_i64(*v),
            Self::U8(v) => serializer.serialize_u8(*v),
            Self::U16(v) => serializer.serialize_u16(*v),
            Self::U32(v) => serializer.serialize_u32(*v),
            Self::U64(v) => serializer.serialize_u64(*v),
            Self::F32(v) => serializer.serialize_f32(*v),
            Self::F64(v) => serializer.serialize_f64(*v),
            Self::Text(s) => serializer.serialize_str(s),
            Self::Bytes(b) => serializer.serialize_str(&BASE64.encode(b)),
        }
    }
}
