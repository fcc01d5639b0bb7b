use super::config::ConfigError;
use crate::core::backend::BackendError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Platform '{name}' not found (available: {available:?})")]
    PlatformResolution {
        name: String,
        available: Vec<String>,
    },

    #[error("Snapshot {field} has {found} entries but the engine expects {expected}")]
    DimensionMismatch {
        field: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error("Invalid configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Backend failure: {source}")]
    Backend {
        #[from]
        source: BackendError,
    },
}
