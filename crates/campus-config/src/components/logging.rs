//! Logging component configuration

use serde::{Deserialize, Serialize};

/// Tracing output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level for the campus crates (off, error, warn, info, debug, trace)
    pub level: String,
    /// Include the module path in each line
    pub include_target: bool,
    /// Colored output
    pub use_ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            include_target: false,
            use_ansi: true,
        }
    }
}

impl LoggingConfig {
    /// `EnvFilter` directive covering every campus crate at the configured level
    pub fn filter_directive(&self) -> String {
        let level = self.level.trim().to_lowercase();
        ["campus_cli", "campus_core", "campus_sqlite", "campus_config"]
            .iter()
            .map(|target| format!("{}={}", target, level))
            .collect::<Vec<_>>()
            .join(",")
    }
}
