//! Configuration sections

mod logging;
mod storage;

pub use logging::LoggingConfig;
pub use storage::StorageConfig;
