//! MySQL/MariaDB binlog change data capture.
//!
//! A [`Cdc`] session streams row events from a replication client and
//! dispatches every row of a tracked table to the handler registered for it.
//! Handlers receive either generic [`RowMap`]s or typed records described by
//! a [`Descriptor`].
//!
//! ```no_run
//! use mysql_binlog_source::{Cdc, Options, SourceOpts, TableBinding};
//!
//! # async fn run() -> Result<(), mysql_binlog_source::CdcError> {
//! let source = SourceOpts {
//!     database: "shop".to_string(),
//!     ..SourceOpts::default()
//! };
//! let options = Options::new(source).table(TableBinding::new("orders", |old, new, table| {
//!     println!("{table}: {old:?} -> {new:?}");
//! }));
//!
//! let mut cdc = Cdc::start(options).await?;
//! let stopped = cdc.listen().await;
//! eprintln!("listener stopped: {stopped}");
//! # Ok(())
//! # }
//! ```

pub mod binding;
pub mod classifier;
pub mod client;
pub mod decoder;
pub mod descriptor;
pub mod diagnostics;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod mysql_client;
pub mod options;
pub mod position;
pub mod registry;
pub mod schema;
pub mod session;
pub mod tags;

#[doc(hidden)]
pub mod testing;

pub use binding::TableBinding;
pub use client::{EventSink, ReplicationClient};
pub use decoder::{decode_row, decode_typed, RowMap};
pub use descriptor::{BinlogRecord, Descriptor, FieldKind};
pub use diagnostics::{Diagnostics, EventFault, TracingDiagnostics};
pub use dispatcher::{DispatchOutcome, DispatchStats, Dispatcher};
pub use error::{CdcError, DecodeError};
pub use event::{RowAction, RowsEvent};
pub use mysql_client::MySqlBinlogClient;
pub use options::{Flavor, Options, SourceOpts};
pub use position::{BinlogPosition, ParsePositionError};
pub use registry::TableRegistry;
pub use session::Cdc;

pub use binlog_types::{Column, ColumnKind, RawValue, RowImage};
