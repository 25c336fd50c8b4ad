//! binlog-cdc
//!
//! Command-line front end for MySQL/MariaDB binlog change data capture.
//!
//! # CLI Usage
//!
//! ```bash
//! # Print every change of shop.orders as a JSON line
//! binlog-cdc tail --config cdc.toml --table orders
//!
//! # Current binlog position of the source
//! binlog-cdc position --host db.internal --user repl
//! ```

pub mod config;
pub mod tail;

pub use config::{CdcConfig, SourceArgs};
pub use mysql_binlog_source as source;
