//! Error types for the engine binary.

/// Top-level error for the engine binary.
///
/// Each variant wraps one subsystem error so `run` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading or validation failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: unrest_core::ConfigError,
    },

    /// Model construction failed.
    #[error("model error: {source}")]
    Model {
        /// The underlying model error.
        #[from]
        source: unrest_core::ModelError,
    },

    /// A batch or benchmark run failed.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: unrest_core::RunnerError,
    },

    /// The summary could not be serialized.
    #[error("failed to serialize output: {source}")]
    Output {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },
}
