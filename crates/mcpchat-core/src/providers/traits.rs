//! Provider trait definition

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{ChatMessage, ContentPart, StopReason, Tool, ToolCall};
use super::error::ProviderResult;

/// Model configuration for provider requests
#[derive(Debug, Clone)]
pub struct ProviderModelConfig {
    /// Model identifier as used by the provider's API
    pub model: String,
    /// API key for authentication
    pub api_key: Option<String>,
    /// Custom API base URL
    pub api_base: Option<String>,
}

impl ProviderModelConfig {
    /// Create a new model config
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            api_key: None,
            api_base: None,
        }
    }

    /// Set the API key
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the API base URL
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = Some(base.into());
        self
    }
}

/// A single request to the model
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    /// System prompt
    pub system: Option<String>,
    /// Conversation transcript, oldest first
    pub messages: Vec<ChatMessage>,
    /// Tools available for the model to use
    pub tools: Vec<Tool>,
    /// Maximum tokens to generate
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            system: None,
            messages,
            tools: Vec::new(),
            max_tokens: 4096,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = tokens;
        self
    }
}

/// Token accounting reported by the provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
}

/// The model's reply to one request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    /// Content blocks, in the order the model produced them
    pub content: Vec<ContentPart>,
    #[serde(default)]
    pub stop_reason: StopReason,
    #[serde(default)]
    pub usage: Option<Usage>,
}

impl CompletionResponse {
    /// Build a plain text reply that ends the turn
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentPart::text(text)],
            stop_reason: StopReason::EndTurn,
            ..Default::default()
        }
    }

    /// Build a reply that asks for tools to be run
    pub fn tool_use(content: Vec<ContentPart>) -> Self {
        Self {
            content,
            stop_reason: StopReason::ToolUse,
            ..Default::default()
        }
    }

    /// Concatenation of every text block
    pub fn text_content(&self) -> String {
        self.content.iter().filter_map(ContentPart::as_text).collect()
    }

    /// Tool uses requested, in order
    pub fn tool_calls(&self) -> Vec<ToolCall> {
        self.content.iter().filter_map(ContentPart::as_tool_call).collect()
    }
}

/// Provider trait for hosted model implementations
#[async_trait]
pub trait Provider: Send + Sync {
    /// Get the provider name (e.g., "anthropic", "mock")
    fn name(&self) -> &str;

    /// Get the default API base URL
    fn default_api_base(&self) -> &str;

    /// Run one non-streaming completion
    async fn complete(
        &self,
        request: CompletionRequest,
        model: &ProviderModelConfig,
    ) -> ProviderResult<CompletionResponse>;

    /// Get the API base URL, using custom if provided
    fn get_api_base(&self, model: &ProviderModelConfig) -> String {
        model.api_base.clone().unwrap_or_else(|| self.default_api_base().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_helpers() {
        let response = CompletionResponse::tool_use(vec![
            ContentPart::text("Looking that up."),
            ContentPart::tool_use("toolu_1", "search_voip_docs", json!({"query": "BYE"})),
            ContentPart::tool_use("toolu_2", "get_sip_message_example", json!({"message_type": "BYE"})),
        ]);

        assert!(response.stop_reason.wants_tools());
        assert_eq!(response.text_content(), "Looking that up.");
        let calls = response.tool_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].id, "toolu_2");
    }

    #[test]
    fn test_response_deserialization() {
        let response: CompletionResponse = serde_json::from_value(json!({
            "id": "msg_01",
            "type": "message",
            "role": "assistant",
            "model": "claude-sonnet-4-5",
            "content": [{"type": "text", "text": "Hi"}],
            "stop_reason": "end_turn",
            "stop_sequence": null,
            "usage": {"input_tokens": 12, "output_tokens": 3}
        }))
        .unwrap();

        assert_eq!(response.id, "msg_01");
        assert_eq!(response.stop_reason, StopReason::EndTurn);
        assert_eq!(response.usage.unwrap().output_tokens, 3);
    }

    #[test]
    fn test_model_config_builder() {
        let config = ProviderModelConfig::new("claude-sonnet-4-5")
            .with_api_key("sk-ant-test")
            .with_api_base("http://localhost:9999");
        assert_eq!(config.api_key.as_deref(), Some("sk-ant-test"));
        assert_eq!(config.api_base.as_deref(), Some("http://localhost:9999"));
    }
}
