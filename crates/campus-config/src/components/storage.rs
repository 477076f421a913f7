//! Storage component configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// SQLite database settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file, or `:memory:`
    pub path: PathBuf,
    /// Write-ahead logging
    pub wal_mode: bool,
    /// How long a writer waits for the database lock
    pub busy_timeout_ms: u32,
    /// SQLite `cache_size` pragma (negative values are KiB)
    pub cache_size: i32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./campus.db"),
            wal_mode: true,
            busy_timeout_ms: 5000,
            cache_size: -64000,
        }
    }
}
