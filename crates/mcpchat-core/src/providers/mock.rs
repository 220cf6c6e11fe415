//! Mock provider for testing
//!
//! Provides deterministic, configurable responses without network dependencies.
//! Every request is recorded so tests can inspect what the chat loop sent.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use super::error::{ProviderError, ProviderResult};
use super::traits::{CompletionRequest, CompletionResponse, Provider, ProviderModelConfig};
use crate::types::{ChatMessage, MessageRole};

/// Mock response mode
#[derive(Debug, Clone)]
pub enum MockMode {
    /// Echo back the last user text
    Echo,
    /// Return a fixed response
    Fixed(String),
    /// Return the queued responses in order, one per request
    Script(VecDeque<CompletionResponse>),
    /// Fail every request
    Error(String),
}

impl Default for MockMode {
    fn default() -> Self {
        MockMode::Echo
    }
}

/// Mock model provider for testing
#[derive(Debug, Default)]
pub struct MockProvider {
    mode: Mutex<MockMode>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockProvider {
    /// Create a new mock provider in echo mode
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with a specific mode
    pub fn with_mode(mode: MockMode) -> Self {
        Self {
            mode: Mutex::new(mode),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create an echo provider (echoes back user message)
    pub fn echo() -> Self {
        Self::with_mode(MockMode::Echo)
    }

    /// Create a fixed response provider
    pub fn fixed(response: impl Into<String>) -> Self {
        Self::with_mode(MockMode::Fixed(response.into()))
    }

    /// Create a provider that plays back `responses` in order
    pub fn scripted(responses: impl IntoIterator<Item = CompletionResponse>) -> Self {
        Self::with_mode(MockMode::Script(responses.into_iter().collect()))
    }

    /// Create an error-producing provider
    pub fn error(message: impl Into<String>) -> Self {
        Self::with_mode(MockMode::Error(message.into()))
    }

    /// Requests received so far, oldest first
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }

    /// Number of requests received so far
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Extract last user text, skipping tool result turns
    fn get_last_user_message(messages: &[ChatMessage]) -> String {
        messages
            .iter()
            .rev()
            .filter(|m| m.role == MessageRole::User)
            .map(ChatMessage::text_content)
            .find(|text| !text.is_empty())
            .unwrap_or_else(|| "Hello from MockProvider!".to_string())
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn default_api_base(&self) -> &str {
        "http://localhost:0/mock"
    }

    async fn complete(
        &self,
        request: CompletionRequest,
        model: &ProviderModelConfig,
    ) -> ProviderResult<CompletionResponse> {
        debug!(model = %model.model, messages = request.messages.len(), "MockProvider: complete called");

        let reply = {
            let mut mode = self.mode.lock();
            match &mut *mode {
                MockMode::Echo => Ok(CompletionResponse::text(format!(
                    "Echo: {}",
                    Self::get_last_user_message(&request.messages)
                ))),
                MockMode::Fixed(text) => Ok(CompletionResponse::text(text.clone())),
                MockMode::Script(queue) => queue
                    .pop_front()
                    .ok_or_else(|| ProviderError::Other("Mock script exhausted".to_string())),
                MockMode::Error(message) => Err(ProviderError::Other(format!("Mock error: {}", message))),
            }
        };

        self.requests.lock().push(request);
        reply.map(|mut response| {
            if response.model.is_empty() {
                response.model = model.model.clone();
            }
            response
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContentPart, StopReason};
    use serde_json::json;

    fn test_config() -> ProviderModelConfig {
        ProviderModelConfig::new("mock-model")
    }

    #[tokio::test]
    async fn test_echo_mode() {
        let provider = MockProvider::echo();
        let response = provider
            .complete(CompletionRequest::new(vec![ChatMessage::user("Hello, world!")]), &test_config())
            .await
            .expect("echo should succeed");

        assert_eq!(response.text_content(), "Echo: Hello, world!");
        assert_eq!(response.stop_reason, StopReason::EndTurn);
        assert_eq!(response.model, "mock-model");
    }

    #[tokio::test]
    async fn test_fixed_mode() {
        let provider = MockProvider::fixed("This is a test response.");
        let response = provider
            .complete(CompletionRequest::new(vec![ChatMessage::user("Anything")]), &test_config())
            .await
            .unwrap();

        assert_eq!(response.text_content(), "This is a test response.");
    }

    #[tokio::test]
    async fn test_script_mode_plays_in_order() {
        let provider = MockProvider::scripted(vec![
            CompletionResponse::tool_use(vec![ContentPart::tool_use("t1", "get_weather", json!({}))]),
            CompletionResponse::text("done"),
        ]);

        let first = provider
            .complete(CompletionRequest::new(vec![ChatMessage::user("a")]), &test_config())
            .await
            .unwrap();
        assert!(first.stop_reason.wants_tools());

        let second = provider
            .complete(CompletionRequest::new(vec![ChatMessage::user("b")]), &test_config())
            .await
            .unwrap();
        assert_eq!(second.text_content(), "done");

        let third = provider
            .complete(CompletionRequest::new(vec![ChatMessage::user("c")]), &test_config())
            .await;
        assert!(third.is_err());
        assert_eq!(provider.request_count(), 3);
    }

    #[tokio::test]
    async fn test_error_mode() {
        let provider = MockProvider::error("Test error message");
        let result = provider
            .complete(CompletionRequest::new(vec![ChatMessage::user("Anything")]), &test_config())
            .await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("Test error message"));
    }

    #[tokio::test]
    async fn test_records_requests() {
        let provider = MockProvider::echo();
        let request = CompletionRequest::new(vec![ChatMessage::user("Hi")]).with_system("system prompt");
        provider.complete(request, &test_config()).await.unwrap();

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].system.as_deref(), Some("system prompt"));
    }

    #[test]
    fn test_last_user_message_skips_tool_results() {
        let messages = vec![
            ChatMessage::user("real question"),
            ChatMessage::with_parts(MessageRole::User, vec![ContentPart::tool_result("t1", "{}")]),
        ];
        assert_eq!(MockProvider::get_last_user_message(&messages), "real question");
    }
}
