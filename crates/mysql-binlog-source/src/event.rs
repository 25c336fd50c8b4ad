//! Row-change events as delivered by a replication client.

use std::sync::Arc;

use binlog_types::{Column, RowImage};
use serde::Serialize;

use crate::position::BinlogPosition;

/// What a row-change event did to its rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RowAction {
    Insert,
    Update,
    Delete,
}

impl RowAction {
    pub fn as_str(self) -> &'static str {
        match self {
            RowAction::Insert => "insert",
            RowAction::Update => "update",
            RowAction::Delete => "delete",
        }
    }
}

/// One binlog rows event for a single table.
///
/// Update events store their rows as consecutive `(before, after)` pairs;
/// insert and delete events store one image per affected row.
#[derive(Debug, Clone)]
pub struct RowsEvent {
    pub schema: String,
    pub table: String,
    pub action: RowAction,
    /// Table columns in ordinal order, shared between events of one table
    pub columns: Arc<[Column]>,
    pub rows: Vec<RowImage>,
    /// Position of the binlog entry this event was read from
    pub position: Option<BinlogPosition>,
}

impl RowsEvent {
    pub fn new(
        schema: impl Into<String>,
        table: impl Into<String>,
        action: RowAction,
        columns: impl Into<Arc<[Column]>>,
        rows: Vec<RowImage>,
    ) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            action,
            columns: columns.into(),
            rows,
            position: None,
        }
    }

    pub fn with_position(mut self, position: BinlogPosition) -> Self {
        self.position = Some(position);
        self
    }

    /// `schema.table`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }

    /// Ordinal of the column with this exact name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}
