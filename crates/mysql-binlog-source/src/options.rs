//! Session options
//!
//! `SourceOpts` holds everything needed to reach the source and can be
//! loaded from configuration files. `Options` adds the table bindings, which
//! carry handlers and therefore only exist in code.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::binding::TableBinding;
use crate::error::CdcError;
use crate::position::BinlogPosition;
use crate::registry::TableRegistry;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3306;
pub const DEFAULT_USER: &str = "root";
pub const DEFAULT_SERVER_ID: u32 = 10001;

/// Replication protocol flavor of the source server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Flavor {
    #[default]
    MySql,
    MariaDb,
}

impl Flavor {
    /// `mariadb` in any case selects MariaDB; every other name means MySQL.
    pub fn parse(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("mariadb") {
            Flavor::MariaDb
        } else {
            Flavor::MySql
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Flavor::MySql => "mysql",
            Flavor::MariaDb => "mariadb",
        }
    }
}

impl From<String> for Flavor {
    fn from(name: String) -> Self {
        Flavor::parse(&name)
    }
}

impl From<Flavor> for String {
    fn from(flavor: Flavor) -> Self {
        flavor.as_str().to_string()
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// MySQL source connection options
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceOpts {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    /// Source database; qualifies table names given without a schema
    pub database: String,
    pub flavor: Flavor,
    /// Replication client identifier; must be unique among the source's replicas
    pub server_id: u32,
    /// Resume from here instead of the source's current position
    pub start_position: Option<BinlogPosition>,
}

impl Default for SourceOpts {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            user: DEFAULT_USER.to_string(),
            password: String::new(),
            database: String::new(),
            flavor: Flavor::MySql,
            server_id: DEFAULT_SERVER_ID,
            start_position: None,
        }
    }
}

impl SourceOpts {
    /// Replace empty or zero settings with their defaults.
    pub fn normalize(mut self) -> Self {
        if self.host.trim().is_empty() {
            self.host = DEFAULT_HOST.to_string();
        }
        if self.port == 0 {
            self.port = DEFAULT_PORT;
        }
        if self.user.trim().is_empty() {
            self.user = DEFAULT_USER.to_string();
        }
        if self.server_id == 0 {
            self.server_id = DEFAULT_SERVER_ID;
        }
        self
    }

    /// `host:port`
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for SourceOpts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceOpts")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("flavor", &self.flavor)
            .field("server_id", &self.server_id)
            .field("start_position", &self.start_position)
            .finish()
    }
}

/// Everything a session needs: where to connect and which tables to track.
#[derive(Debug, Default)]
pub struct Options {
    pub source: SourceOpts,
    pub tables: Vec<TableBinding>,
}

impl Options {
    pub fn new(source: SourceOpts) -> Self {
        Self {
            source,
            tables: Vec::new(),
        }
    }

    pub fn table(mut self, binding: TableBinding) -> Self {
        self.tables.push(binding);
        self
    }

    /// Normalize the source options and build the table registry.
    pub fn validate(self) -> Result<(SourceOpts, TableRegistry), CdcError> {
        let source = self.source.normalize();
        if self.tables.is_empty() {
            return Err(CdcError::InvalidOptions(
                "at least one table must be tracked".to_string(),
            ));
        }

        let mut registry = TableRegistry::new();
        for binding in self.tables {
            registry.register(binding.qualify(&source.database)?)?;
        }

        Ok((source, registry))
    }
}
