//! Typed descriptors: a per-type table of field-to-column bindings.
//!
//! A descriptor is built once, when a typed table binding is registered.
//! Each entry carries the column resolved from the field's tag, the
//! semantic kind of the field, and a setter. Decoding a row walks this
//! table and never inspects the target type at runtime.
//!
//! ```rust
//! use chrono::{DateTime, Utc};
//! use mysql_binlog_source::{BinlogRecord, Descriptor};
//!
//! #[derive(Debug, Default)]
//! struct Order {
//!     id: i64,
//!     status: String,
//!     paid: bool,
//!     shipped_at: Option<DateTime<Utc>>,
//! }
//!
//! impl BinlogRecord for Order {
//!     fn descriptor() -> Descriptor<Self> {
//!         Descriptor::<Self>::new()
//!             .int("id", "column:id", |o, v| o.id = v)
//!             .string("status", "column:status", |o, v| o.status = v)
//!             .bool("paid", "column:is_paid", |o, v| o.paid = v)
//!             .optional_timestamp("shipped_at", "column:shipped_at", |o, v| o.shipped_at = Some(v))
//!     }
//! }
//!
//! assert_eq!(Order::descriptor().len(), 4);
//! ```

use std::fmt;

use chrono::{DateTime, Utc};

use crate::tags::column_from_tag;

/// Semantic kind of a descriptor field; selects the coercion rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Int,
    Uint,
    Bool,
    Float,
    String,
    Timestamp,
    /// Left unset when the source cell is NULL or the column is absent
    OptionalTimestamp,
}

type Setter<T, V> = Box<dyn Fn(&mut T, V) + Send + Sync>;

pub(crate) enum Assign<T> {
    Int(Setter<T, i64>),
    Uint(Setter<T, u64>),
    Bool(Setter<T, bool>),
    Float(Setter<T, f64>),
    String(Setter<T, String>),
    Timestamp(Setter<T, DateTime<Utc>>),
    OptionalTimestamp(Setter<T, DateTime<Utc>>),
}

impl<T> Assign<T> {
    fn kind(&self) -> FieldKind {
        match self {
            Assign::Int(_) => FieldKind::Int,
            Assign::Uint(_) => FieldKind::Uint,
            Assign::Bool(_) => FieldKind::Bool,
            Assign::Float(_) => FieldKind::Float,
            Assign::String(_) => FieldKind::String,
            Assign::Timestamp(_) => FieldKind::Timestamp,
            Assign::OptionalTimestamp(_) => FieldKind::OptionalTimestamp,
        }
    }
}

/// One field of a typed descriptor.
pub struct FieldBinding<T> {
    field: &'static str,
    column: Option<String>,
    pub(crate) assign: Assign<T>,
}

impl<T> FieldBinding<T> {
    pub fn field(&self) -> &'static str {
        self.field
    }

    /// Source column, or `None` when the tag binds nothing.
    pub fn column(&self) -> Option<&str> {
        self.column.as_deref()
    }

    pub fn kind(&self) -> FieldKind {
        self.assign.kind()
    }
}

impl<T> fmt::Debug for FieldBinding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldBinding")
            .field("field", &self.field)
            .field("column", &self.column)
            .field("kind", &self.kind())
            .finish()
    }
}

/// Field-to-column layout of a caller-defined record type.
pub struct Descriptor<T> {
    fields: Vec<FieldBinding<T>>,
}

impl<T> Descriptor<T> {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    fn push(mut self, field: &'static str, tag: &str, assign: Assign<T>) -> Self {
        self.fields.push(FieldBinding {
            field,
            column: column_from_tag(tag),
            assign,
        });
        self
    }

    /// Signed integer field. The setter receives the value widened to `i64`
    /// and narrows it to the field's width.
    pub fn int(
        self,
        field: &'static str,
        tag: &str,
        set: impl Fn(&mut T, i64) + Send + Sync + 'static,
    ) -> Self {
        self.push(field, tag, Assign::Int(Box::new(set)))
    }

    /// Unsigned integer field, widened to `u64`.
    pub fn uint(
        self,
        field: &'static str,
        tag: &str,
        set: impl Fn(&mut T, u64) + Send + Sync + 'static,
    ) -> Self {
        self.push(field, tag, Assign::Uint(Box::new(set)))
    }

    pub fn bool(
        self,
        field: &'static str,
        tag: &str,
        set: impl Fn(&mut T, bool) + Send + Sync + 'static,
    ) -> Self {
        self.push(field, tag, Assign::Bool(Box::new(set)))
    }

    pub fn float(
        self,
        field: &'static str,
        tag: &str,
        set: impl Fn(&mut T, f64) + Send + Sync + 'static,
    ) -> Self {
        self.push(field, tag, Assign::Float(Box::new(set)))
    }

    pub fn string(
        self,
        field: &'static str,
        tag: &str,
        set: impl Fn(&mut T, String) + Send + Sync + 'static,
    ) -> Self {
        self.push(field, tag, Assign::String(Box::new(set)))
    }

    pub fn timestamp(
        self,
        field: &'static str,
        tag: &str,
        set: impl Fn(&mut T, DateTime<Utc>) + Send + Sync + 'static,
    ) -> Self {
        self.push(field, tag, Assign::Timestamp(Box::new(set)))
    }

    /// Nullable timestamp field. The setter only runs for non-NULL cells.
    pub fn optional_timestamp(
        self,
        field: &'static str,
        tag: &str,
        set: impl Fn(&mut T, DateTime<Utc>) + Send + Sync + 'static,
    ) -> Self {
        self.push(field, tag, Assign::OptionalTimestamp(Box::new(set)))
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldBinding<T>> {
        self.fields.iter()
    }

    /// Fields whose tag names a source column.
    pub fn bound_fields(&self) -> impl Iterator<Item = &FieldBinding<T>> {
        self.fields.iter().filter(|f| f.column.is_some())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<T> Default for Descriptor<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Descriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("type", &std::any::type_name::<T>())
            .field("fields", &self.fields)
            .finish()
    }
}

/// A record type that can be decoded from a row image.
pub trait BinlogRecord: Default + Send + 'static {
    fn descriptor() -> Descriptor<Self>;
}
