//! Error types for the Penwright content pipeline.
//!
//! Uses `thiserror` for public API error types. Expected failures from the
//! external collaborators (search provider, language model) are modelled here
//! so callers can recover per item; only invalid input and total generation
//! failure ever reach the pipeline's public surface as `Err`.

use std::path::PathBuf;

/// Top-level error type for the Penwright core library.
#[derive(Debug, thiserror::Error)]
pub enum PenwrightError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from language model interactions.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("API request failed: {message}")]
    ApiRequest { message: String },

    #[error("API response parse error: {message}")]
    ResponseParse { message: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Provider connection failed: {message}")]
    Connection { message: String },
}

/// Errors from the search provider.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Search request failed: {message}")]
    Request { message: String },

    #[error("Search response parse error: {message}")]
    Parse { message: String },

    #[error("Authentication failed for search provider {provider}")]
    AuthFailed { provider: String },

    #[error("Search timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Environment variable not set: {var}")]
    EnvVarMissing { var: String },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

/// Errors surfaced by the pipeline operations themselves.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("No research sources could be gathered for '{topic}'")]
    NoResearch { topic: String },

    #[error("Generation failed: {reason}")]
    GenerationFailed { reason: String },
}

/// A type alias for results using the top-level `PenwrightError`.
pub type Result<T> = std::result::Result<T, PenwrightError>;
