//! Table bindings: a table name paired with a decoder and a handler.
//!
//! The handler receives `(old, new, qualified_name)`:
//! inserts pass `(None, Some(new))`, deletes `(Some(old), None)` and updates
//! `(Some(old), Some(new))`.

use std::fmt;

use crate::decoder::{decode_row, decode_typed, RowMap};
use crate::descriptor::{BinlogRecord, Descriptor};
use crate::error::{CdcError, DecodeError};
use crate::event::{RowAction, RowsEvent};

trait RecordDecoder: Send + Sync {
    type Record;

    fn decode(&self, event: &RowsEvent, row: usize) -> Result<Self::Record, DecodeError>;
}

struct GenericRows;

impl RecordDecoder for GenericRows {
    type Record = RowMap;

    fn decode(&self, event: &RowsEvent, row: usize) -> Result<RowMap, DecodeError> {
        decode_row(event, row)
    }
}

struct TypedRows<T> {
    descriptor: Option<Descriptor<T>>,
}

impl<T: Default + Send + 'static> RecordDecoder for TypedRows<T> {
    type Record = T;

    fn decode(&self, event: &RowsEvent, row: usize) -> Result<T, DecodeError> {
        decode_typed(event, row, self.descriptor.as_ref())
    }
}

/// Type-erased decode-and-deliver step for one visited row index.
trait RowSink: Send + Sync {
    fn deliver(&self, event: &RowsEvent, row: usize, table: &str) -> Result<(), DecodeError>;

    fn is_typed(&self) -> bool;
}

struct Bound<D, F> {
    decoder: D,
    handler: F,
    typed: bool,
}

impl<D, F> RowSink for Bound<D, F>
where
    D: RecordDecoder,
    F: Fn(Option<D::Record>, Option<D::Record>, &str) + Send + Sync,
{
    fn deliver(&self, event: &RowsEvent, row: usize, table: &str) -> Result<(), DecodeError> {
        let current = self.decoder.decode(event, row)?;
        match event.action {
            RowAction::Insert => (self.handler)(None, Some(current), table),
            RowAction::Delete => (self.handler)(Some(current), None, table),
            RowAction::Update => {
                let before = row.checked_sub(1).ok_or(DecodeError::RowOutOfRange {
                    row,
                    rows: event.rows.len(),
                })?;
                let old = self.decoder.decode(event, before)?;
                (self.handler)(Some(old), Some(current), table)
            }
        }
        Ok(())
    }

    fn is_typed(&self) -> bool {
        self.typed
    }
}

/// Registration of one tracked table.
pub struct TableBinding {
    name: String,
    sink: Box<dyn RowSink>,
}

impl TableBinding {
    /// Bind a table to a handler receiving generic [`RowMap`]s.
    ///
    /// `name` is either `schema.table` or a bare table name, which is
    /// qualified with the source database when the options are validated.
    pub fn new<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Option<RowMap>, Option<RowMap>, &str) + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            sink: Box::new(Bound {
                decoder: GenericRows,
                handler,
                typed: false,
            }),
        }
    }

    /// Bind a table to a handler receiving typed records.
    pub fn typed<T, F>(name: impl Into<String>, handler: F) -> Self
    where
        T: BinlogRecord,
        F: Fn(Option<T>, Option<T>, &str) + Send + Sync + 'static,
    {
        Self::with_descriptor(name, Some(T::descriptor()), handler)
    }

    /// Bind a table to a typed handler with an explicit descriptor.
    ///
    /// Without a descriptor every row of the table fails to decode with
    /// [`DecodeError::MissingDescriptor`].
    pub fn with_descriptor<T, F>(
        name: impl Into<String>,
        descriptor: Option<Descriptor<T>>,
        handler: F,
    ) -> Self
    where
        T: Default + Send + 'static,
        F: Fn(Option<T>, Option<T>, &str) + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            sink: Box::new(Bound {
                decoder: TypedRows { descriptor },
                handler,
                typed: true,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_typed(&self) -> bool {
        self.sink.is_typed()
    }

    /// Prefix a bare table name with `schema`.
    pub(crate) fn qualify(mut self, schema: &str) -> Result<Self, CdcError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(CdcError::InvalidOptions("table name is empty".to_string()));
        }
        if !name.contains('.') {
            if schema.is_empty() {
                return Err(CdcError::InvalidOptions(format!(
                    "table '{name}' has no schema and no source database is configured"
                )));
            }
            self.name = format!("{schema}.{name}");
        } else {
            self.name = name.to_string();
        }
        Ok(self)
    }

    /// Decode row `row` (and its before image for updates) and call the handler.
    pub(crate) fn deliver(&self, event: &RowsEvent, row: usize) -> Result<(), DecodeError> {
        self.sink.deliver(event, row, &self.name)
    }
}

impl fmt::Debug for TableBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableBinding")
            .field("name", &self.name)
            .field("typed", &self.is_typed())
            .finish()
    }
}
