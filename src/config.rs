//! Configuration file loading with command-line and environment overrides.
//!
//! ```toml
//! tables = ["orders", "billing.invoices"]
//!
//! [source]
//! host = "db.internal"
//! database = "shop"
//! flavor = "mariadb"
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use mysql_binlog_source::{BinlogPosition, Flavor, SourceOpts};
use serde::{Deserialize, Serialize};

/// Contents of a `binlog-cdc` configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CdcConfig {
    pub source: SourceOpts,
    /// Tracked tables, `schema.table` or bare names in `source.database`
    pub tables: Vec<String>,
}

impl CdcConfig {
    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        toml::from_str(text).context("Invalid configuration")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Load `path` when given, then apply `overrides`.
    pub fn resolve(path: Option<&Path>, overrides: &SourceArgs) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        overrides.apply(&mut config);
        Ok(config)
    }
}

/// Source settings accepted on the command line.
///
/// Every flag also reads a `BINLOG_CDC_*` environment variable and, when
/// present, replaces the value from the configuration file.
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Configuration file (TOML)
    #[arg(long, env = "BINLOG_CDC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Source host
    #[arg(long, env = "BINLOG_CDC_HOST")]
    pub host: Option<String>,

    /// Source port
    #[arg(long, env = "BINLOG_CDC_PORT")]
    pub port: Option<u16>,

    /// Replication user
    #[arg(long, env = "BINLOG_CDC_USER")]
    pub user: Option<String>,

    /// Replication user's password
    #[arg(long, env = "BINLOG_CDC_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Database qualifying bare table names
    #[arg(long, env = "BINLOG_CDC_DATABASE")]
    pub database: Option<String>,

    /// Server flavor: mysql or mariadb
    #[arg(long, env = "BINLOG_CDC_FLAVOR")]
    pub flavor: Option<String>,

    /// Replica server id announced to the source
    #[arg(long, env = "BINLOG_CDC_SERVER_ID")]
    pub server_id: Option<u32>,

    /// Resume position (format: file:pos, e.g. "mysql-bin.000003:4")
    #[arg(long, env = "BINLOG_CDC_START_POSITION")]
    pub start_position: Option<BinlogPosition>,

    /// Table to track; repeatable. Replaces the tables of the config file.
    #[arg(long = "table", value_name = "TABLE", env = "BINLOG_CDC_TABLES", value_delimiter = ',')]
    pub tables: Vec<String>,
}

impl SourceArgs {
    pub fn apply(&self, config: &mut CdcConfig) {
        let source = &mut config.source;
        if let Some(host) = &self.host {
            source.host = host.clone();
        }
        if let Some(port) = self.port {
            source.port = port;
        }
        if let Some(user) = &self.user {
            source.user = user.clone();
        }
        if let Some(password) = &self.password {
            source.password = password.clone();
        }
        if let Some(database) = &self.database {
            source.database = database.clone();
        }
        if let Some(flavor) = &self.flavor {
            source.flavor = Flavor::parse(flavor);
        }
        if let Some(server_id) = self.server_id {
            source.server_id = server_id;
        }
        if let Some(position) = &self.start_position {
            source.start_position = Some(position.clone());
        }
        if !self.tables.is_empty() {
            config.tables = self.tables.clone();
        }
    }
}
