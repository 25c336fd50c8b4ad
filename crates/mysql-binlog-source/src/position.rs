//! Binlog coordinates
//!
//! A position is the binlog file name plus the byte offset of the next
//! event. It is rendered as `file:pos` on the command line.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Replication position within the source's binary log.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BinlogPosition {
    /// Binlog file name, e.g. `mysql-bin.000003`
    pub file: String,
    /// Byte offset inside the file
    pub pos: u64,
}

impl BinlogPosition {
    pub fn new(file: impl Into<String>, pos: u64) -> Self {
        Self {
            file: file.into(),
            pos,
        }
    }

    /// Same file, new offset.
    pub fn at(&self, pos: u64) -> Self {
        Self {
            file: self.file.clone(),
            pos,
        }
    }
}

impl fmt::Display for BinlogPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.pos)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid binlog position '{0}': expected 'file:pos'")]
pub struct ParsePositionError(String);

impl FromStr for BinlogPosition {
    type Err = ParsePositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (file, pos) = s
            .trim()
            .rsplit_once(':')
            .ok_or_else(|| ParsePositionError(s.to_string()))?;
        if file.is_empty() {
            return Err(ParsePositionError(s.to_string()));
        }
        let pos = pos
            .parse::<u64>()
            .map_err(|_| ParsePositionError(s.to_string()))?;
        Ok(Self::new(file, pos))
    }
}
