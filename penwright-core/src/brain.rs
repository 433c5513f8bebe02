//! Brain module: LLM provider abstraction and gated interaction.
//!
//! Defines the `LlmProvider` trait for model-agnostic completions, the `Brain`
//! wrapper that routes every call through a `RequestGate`, and a queue-driven
//! `MockLlmProvider` for tests and offline runs.

use crate::error::LlmError;
use crate::providers::{GateError, RequestGate};
use crate::types::{CompletionRequest, CompletionResponse, TokenUsage};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

/// Trait for LLM providers.
///
/// Responses are free text that should contain JSON but may be truncated,
/// wrapped in markdown or malformed; callers validate everything.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Perform a full completion and return the response.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Return the model name.
    fn model_name(&self) -> &str;
}

/// A gated handle on an `LlmProvider` with default sampling settings.
pub struct Brain {
    provider: Arc<dyn LlmProvider>,
    gate: RequestGate,
    temperature: f32,
    max_tokens: Option<usize>,
    usage: Mutex<TokenUsage>,
}

impl Brain {
    pub fn new(provider: Arc<dyn LlmProvider>, gate: RequestGate) -> Self {
        Self {
            provider,
            gate,
            temperature: 0.7,
            max_tokens: None,
            usage: Mutex::new(TokenUsage::default()),
        }
    }

    /// Override the default temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Override the default response token cap.
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Send a system + user prompt and return the raw response text.
    pub async fn ask(&self, system: &str, user: &str) -> Result<String, LlmError> {
        self.ask_with_temperature(system, user, self.temperature)
            .await
    }

    /// Like [`Brain::ask`] with an explicit temperature.
    pub async fn ask_with_temperature(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
    ) -> Result<String, LlmError> {
        let request = CompletionRequest {
            temperature,
            max_tokens: self.max_tokens,
            ..CompletionRequest::from_prompt(system, user)
        };

        debug!(
            model = self.provider.model_name(),
            prompt_chars = user.len(),
            "Dispatching model request"
        );

        let response = match self.gate.run(self.provider.complete(request)).await {
            Ok(result) => result?,
            Err(GateError::TimedOut { after_secs }) => {
                warn!(
                    model = self.provider.model_name(),
                    after_secs, "Model request timed out"
                );
                return Err(LlmError::Timeout {
                    timeout_secs: after_secs,
                });
            }
            Err(GateError::Closed) => {
                return Err(LlmError::Connection {
                    message: "request gate closed".to_string(),
                });
            }
        };

        self.usage
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .accumulate(&response.usage);
        Ok(response.text)
    }

    /// Cumulative token usage across all calls made through this brain.
    pub fn usage(&self) -> TokenUsage {
        *self.usage.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }
}

type Responder = Box<dyn Fn(&CompletionRequest) -> Option<String> + Send + Sync>;

/// A mock LLM provider for testing.
///
/// Queued replies are served first, in order. When the queue is empty the
/// optional responder closure is consulted, which suits concurrent callers
/// whose ordering is not deterministic. With neither, calls fail.
pub struct MockLlmProvider {
    model: String,
    replies: Mutex<VecDeque<Result<String, String>>>,
    responder: Option<Responder>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockLlmProvider {
    pub fn new() -> Self {
        Self {
            model: "mock-model".to_string(),
            replies: Mutex::new(VecDeque::new()),
            responder: None,
            delay: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock that answers every call through `responder`.
    pub fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(&CompletionRequest) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            responder: Some(Box::new(responder)),
            ..Self::new()
        }
    }

    /// Sleep for `delay` before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a successful reply.
    pub fn queue_response(&self, text: impl Into<String>) {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Ok(text.into()));
    }

    /// Queue a transport failure.
    pub fn queue_error(&self, message: impl Into<String>) {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Err(message.into()));
    }

    /// Number of completed `complete` calls.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// User prompts received so far, in arrival order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for MockLlmProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(prompt) = request.last_user_text() {
            self.prompts
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(prompt.to_string());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let queued = self
            .replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        let text = match queued {
            Some(Ok(text)) => text,
            Some(Err(message)) => return Err(LlmError::ApiRequest { message }),
            None => match self.responder.as_ref().and_then(|r| r(&request)) {
                Some(text) => text,
                None => {
                    return Err(LlmError::ApiRequest {
                        message: "no mock response available".to_string(),
                    });
                }
            },
        };

        Ok(CompletionResponse {
            usage: TokenUsage {
                input_tokens: 100,
                output_tokens: text.split_whitespace().count(),
            },
            text,
            model: self.model.clone(),
            finish_reason: Some("stop".to_string()),
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_queue_is_served_in_order() {
        let mock = Arc::new(MockLlmProvider::new());
        mock.queue_response("first");
        mock.queue_response("second");
        let brain = Brain::new(mock.clone(), RequestGate::unbounded("llm"));

        assert_eq!(brain.ask("sys", "a").await.unwrap(), "first");
        assert_eq!(brain.ask("sys", "b").await.unwrap(), "second");
        assert!(brain.ask("sys", "c").await.is_err());
        assert_eq!(mock.call_count(), 3);
        assert_eq!(mock.prompts(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_responder_used_when_queue_empty() {
        let mock = MockLlmProvider::with_responder(|req| {
            req.last_user_text().map(|t| format!("echo: {t}"))
        });
        let brain = Brain::new(Arc::new(mock), RequestGate::unbounded("llm"));
        assert_eq!(brain.ask("sys", "hi").await.unwrap(), "echo: hi");
    }

    #[tokio::test]
    async fn test_queued_error_is_api_error() {
        let mock = MockLlmProvider::new();
        mock.queue_error("upstream 502");
        let brain = Brain::new(Arc::new(mock), RequestGate::unbounded("llm"));
        let err = brain.ask("sys", "x").await.unwrap_err();
        assert!(matches!(err, LlmError::ApiRequest { .. }));
    }

    #[tokio::test]
    async fn test_gate_timeout_maps_to_llm_timeout() {
        let mock = MockLlmProvider::with_responder(|_| Some("late".into()))
            .with_delay(Duration::from_secs(5));
        let gate = RequestGate::new("llm", 1, 0, Duration::from_millis(20));
        let brain = Brain::new(Arc::new(mock), gate);
        let err = brain.ask("sys", "x").await.unwrap_err();
        assert!(matches!(err, LlmError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_usage_accumulates() {
        let mock = MockLlmProvider::new();
        mock.queue_response("one two three");
        let brain = Brain::new(Arc::new(mock), RequestGate::unbounded("llm"));
        brain.ask("sys", "x").await.unwrap();
        let usage = brain.usage();
        assert_eq!(usage.input_tokens, 100);
        assert_eq!(usage.output_tokens, 3);
    }
}
