//! Column metadata, row values and type coercion for binlog row images.
//!
//! This crate is the leaf of the CDC engine. It has no I/O and no shared state.
//!
//! # Structure
//!
//! - `column`: `ColumnKind` classification and per-column metadata
//! - `value`: `RawValue`, the tagged representation of one decoded cell
//! - `coerce`: permissive conversion of a `RawValue` into a target kind
//!
//! # Example
//!
//! ```rust
//! use binlog_types::{coerce, Column, ColumnKind, RawValue};
//!
//! let status = Column::new("status", ColumnKind::Enum)
//!     .with_enum_labels(vec!["pending".into(), "shipped".into()]);
//! assert_eq!(coerce::to_string(&status, &RawValue::I64(2)), "shipped");
//!
//! // Non-numeric columns never yield an integer.
//! assert_eq!(coerce::to_i64(ColumnKind::String, &RawValue::I64(7)), 0);
//! ```

pub mod coerce;
pub mod column;
pub mod value;

pub use column::{parse_enum_labels, Column, ColumnKind};
pub use value::{RawValue, RowImage};
