//! `tail`: one JSON line per row change of the tracked tables.

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::{Arc, Mutex};

use mysql_binlog_source::{Options, RawValue, RowMap, TableBinding};
use serde::Serialize;
use tracing::error;

use crate::config::CdcConfig;

/// A printed change.
///
/// Columns are sorted by name so lines are stable across runs.
#[derive(Debug, Serialize)]
pub struct ChangeLine<'a> {
    pub table: &'a str,
    pub op: &'static str,
    pub old: Option<BTreeMap<&'a str, &'a RawValue>>,
    pub new: Option<BTreeMap<&'a str, &'a RawValue>>,
}

impl<'a> ChangeLine<'a> {
    pub fn new(old: Option<&'a RowMap>, new: Option<&'a RowMap>, table: &'a str) -> Self {
        let op = match (old.is_some(), new.is_some()) {
            (false, _) => "insert",
            (true, false) => "delete",
            (true, true) => "update",
        };
        Self {
            table,
            op,
            old: old.map(sorted),
            new: new.map(sorted),
        }
    }
}

fn sorted(row: &RowMap) -> BTreeMap<&str, &RawValue> {
    row.iter().map(|(k, v)| (k.as_str(), v)).collect()
}

/// Session options binding every configured table to a printer on `out`.
pub fn options<W>(config: CdcConfig, out: Arc<Mutex<W>>) -> Options
where
    W: Write + Send + 'static,
{
    config
        .tables
        .into_iter()
        .fold(Options::new(config.source), |options, table| {
            let out = out.clone();
            options.table(TableBinding::new(table, move |old, new, table| {
                let line = ChangeLine::new(old.as_ref(), new.as_ref(), table);
                if let Err(e) = print_line(&line, &out) {
                    error!(table = %table, error = %e, "Failed to write change");
                }
            }))
        })
}

fn print_line<W: Write>(line: &ChangeLine<'_>, out: &Mutex<W>) -> std::io::Result<()> {
    let mut out = out
        .lock()
        .map_err(|_| std::io::Error::other("output writer poisoned"))?;
    serde_json::to_writer(&mut *out, line)?;
    out.write_all(b"\n")?;
    out.flush()
}
