//! Error types for the CDC engine.

use thiserror::Error;

/// Errors that stop a session, either before streaming starts or as the
/// terminal result of [`crate::Cdc::listen`].
#[derive(Debug, Error)]
pub enum CdcError {
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    #[error("Table '{0}' is registered more than once")]
    DuplicateTable(String),

    #[error("Failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: mysql_async::Error,
    },

    #[error("Replication position unavailable: {0}")]
    PositionUnavailable(String),

    #[error("Failed to load column metadata for '{table}': {reason}")]
    Schema { table: String, reason: String },

    #[error("Replication transport error: {0}")]
    Transport(String),

    #[error("Replication stream closed")]
    StreamClosed,
}

impl CdcError {
    /// Setup errors are returned before any event reaches a handler.
    pub fn is_setup(&self) -> bool {
        matches!(
            self,
            CdcError::InvalidOptions(_)
                | CdcError::DuplicateTable(_)
                | CdcError::Connect { .. }
                | CdcError::PositionUnavailable(_)
                | CdcError::Schema { .. }
        )
    }
}

/// A fault decoding one row. The dispatcher skips the row and carries on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Row index {row} out of range for event with {rows} rows")]
    RowOutOfRange { row: usize, rows: usize },

    #[error("Row {row} has {values} values but the table has {columns} columns")]
    ShortRow {
        row: usize,
        columns: usize,
        values: usize,
    },

    #[error("No typed descriptor registered for table '{table}'")]
    MissingDescriptor { table: String },
}
