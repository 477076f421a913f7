//! # Campus configuration
//!
//! Type-safe configuration for the campus tag tools, loaded with the
//! precedence defaults < TOML file < environment < command-line overrides.
//!
//! ```rust,no_run
//! use campus_config::{CampusConfig, ConfigOverrides};
//!
//! let config = CampusConfig::load(None, ConfigOverrides::default())?;
//! println!("database at {}", config.storage.path.display());
//! # Ok::<(), campus_config::ConfigError>(())
//! ```

#![warn(missing_docs)]

pub mod components;
mod config;
mod error;

pub use components::{LoggingConfig, StorageConfig};
pub use config::*;
pub use error::{ConfigError, ConfigResult};
