use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::diagnostics::{Diagnostics, EventFault};
use crate::error::DecodeError;

/// Keeps every reported condition for later assertions.
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    unmatched: Mutex<Vec<String>>,
    skipped: Mutex<Vec<(String, usize, DecodeError)>>,
    faults: Mutex<Vec<EventFault>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RecordingDiagnostics {
    pub fn unmatched(&self) -> Vec<String> {
        lock(&self.unmatched).clone()
    }

    /// `(table, row)` of each skipped row.
    pub fn skipped_rows(&self) -> Vec<(String, usize)> {
        lock(&self.skipped)
            .iter()
            .map(|(table, row, _)| (table.clone(), *row))
            .collect()
    }

    pub fn skip_errors(&self) -> Vec<DecodeError> {
        lock(&self.skipped)
            .iter()
            .map(|(_, _, error)| error.clone())
            .collect()
    }

    pub fn faults(&self) -> Vec<EventFault> {
        lock(&self.faults).clone()
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn unmatched_table(&self, table: &str) {
        lock(&self.unmatched).push(table.to_string());
    }

    fn row_skipped(&self, table: &str, row: usize, error: &DecodeError) {
        lock(&self.skipped).push((table.to_string(), row, error.clone()));
    }

    fn event_faulted(&self, fault: &EventFault) {
        lock(&self.faults).push(fault.clone());
    }
}
