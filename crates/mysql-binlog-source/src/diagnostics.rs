//! Diagnostic sink for benign and per-event conditions.
//!
//! None of these conditions stops the stream. They are reported here instead
//! of being returned. The session receives its sink at construction. The
//! default sink forwards everything to `tracing`.

use tracing::{error, warn};

use crate::error::DecodeError;
use crate::position::BinlogPosition;

/// A panic caught at the event boundary.
#[derive(Debug, Clone)]
pub struct EventFault {
    /// Qualified name of the table the event belonged to
    pub table: String,
    pub position: Option<BinlogPosition>,
    /// Panic payload rendered as text
    pub message: String,
    /// `file:line:column` of the panic
    pub location: Option<String>,
    /// Stack of the panicking thread at the panic site
    pub backtrace: String,
}

pub trait Diagnostics: Send + Sync {
    /// An event for a table that is not registered was dropped.
    fn unmatched_table(&self, table: &str) {
        warn!(table = %table, "Not matched table, event dropped");
    }

    /// A row could not be decoded and was skipped.
    fn row_skipped(&self, table: &str, row: usize, error: &DecodeError) {
        error!(table = %table, row, error = %error, "Failed to decode row, skipping");
    }

    /// Decoding or a handler panicked; the rest of the event was abandoned.
    fn event_faulted(&self, fault: &EventFault) {
        error!(
            table = %fault.table,
            position = ?fault.position,
            panic = %fault.message,
            location = ?fault.location,
            backtrace = %fault.backtrace,
            "Recovered from panic while processing event"
        );
    }
}

/// Reports through `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {}
