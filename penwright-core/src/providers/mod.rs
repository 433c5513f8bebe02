//! LLM provider implementations and outbound request limiting.
//!
//! - `OpenAiCompatibleProvider` speaks the OpenAI chat completions format.
//! - `RequestGate` bounds concurrency, rate and latency of every outbound call.
//!
//! Use `create_provider()` to instantiate the appropriate provider based on config.

pub mod gate;
pub mod openai_compat;
pub mod rate_limiter;

use crate::brain::LlmProvider;
use crate::config::LlmConfig;
use crate::error::LlmError;
use std::sync::Arc;

pub use gate::{GateError, RequestGate};
pub use openai_compat::OpenAiCompatibleProvider;
pub use rate_limiter::RequestRateLimiter;

/// Create an LLM provider based on the configuration.
///
/// Every supported provider currently speaks the OpenAI-compatible wire format;
/// `provider` only selects defaults such as the local base URL for Ollama.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    match config.provider.as_str() {
        "ollama" if config.base_url.is_none() => {
            let local = LlmConfig {
                base_url: Some("http://localhost:11434/v1".to_string()),
                ..config.clone()
            };
            Ok(Arc::new(OpenAiCompatibleProvider::new(&local)?))
        }
        _ => Ok(Arc::new(OpenAiCompatibleProvider::new(config)?)),
    }
}
