//! ChatClient - bounded request/response loop with tool execution

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::error::{ChatError, ChatResult};
use super::prompt::system_prompt;
use crate::providers::{CompletionRequest, Provider, ProviderModelConfig};
use crate::tools::ToolRegistry;
use crate::types::{ChatMessage, ContentPart, MessageRole, ToolResult};

/// Reply used when the iteration cap is reached before the model said anything
pub const ITERATION_LIMIT_REPLY: &str = "I couldn't finish answering within the tool-call limit.";

/// Loop limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatSettings {
    /// Model calls per user message
    pub max_iterations: usize,
    /// Tokens the model may generate per call
    pub max_tokens: u32,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            max_tokens: 4096,
        }
    }
}

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatStop {
    /// The model finished its turn
    Completed,
    /// The model still wanted tools when the iteration cap was reached
    IterationLimit,
}

/// One tool invocation made while answering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub tool: String,
    pub input: Value,
    pub result: Value,
}

/// Result of one user message
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    /// Final assistant text
    pub response: String,
    /// Tools run, in order
    pub tool_calls: Vec<ToolCallRecord>,
    /// Full transcript including tool turns
    pub conversation: Vec<ChatMessage>,
    /// Model calls made
    pub iterations: usize,
    pub stop: ChatStop,
}

/// Drives the model and routes its tool calls through the registry
pub struct ChatClient {
    provider: Arc<dyn Provider>,
    model: ProviderModelConfig,
    registry: Arc<ToolRegistry>,
    settings: ChatSettings,
}

impl ChatClient {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: ProviderModelConfig,
        registry: Arc<ToolRegistry>,
        settings: ChatSettings,
    ) -> Self {
        Self {
            provider,
            model,
            registry,
            settings,
        }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn settings(&self) -> ChatSettings {
        self.settings
    }

    /// Answer `user_message` given the prior user/assistant turns
    pub async fn send_message(&self, user_message: &str, history: Vec<ChatMessage>) -> ChatResult<ChatOutcome> {
        if user_message.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let mut messages = history;
        messages.push(ChatMessage::user(user_message));

        let tools = self.registry.llm_tools();
        let system = system_prompt(&self.registry.all_resources().await);
        let mut tool_calls = Vec::new();
        // Most recent non-empty assistant text
        let mut last_text = String::new();

        for iteration in 1..=self.settings.max_iterations {
            debug!(iteration, messages = messages.len(), tools = tools.len(), "Calling model");

            let request = CompletionRequest::new(messages.clone())
                .with_system(system.clone())
                .with_tools(tools.clone())
                .with_max_tokens(self.settings.max_tokens);
            let response = self.provider.complete(request, &self.model).await?;

            info!(iteration, stop_reason = ?response.stop_reason, "Model responded");

            let content: Vec<ContentPart> = response.content.into_iter().filter(ContentPart::is_supported).collect();
            let requested: Vec<_> = content.iter().filter_map(ContentPart::as_tool_call).collect();
            let text: String = content.iter().filter_map(ContentPart::as_text).collect();
            if !text.trim().is_empty() {
                last_text = text;
            }

            if !content.is_empty() {
                messages.push(ChatMessage::with_parts(MessageRole::Assistant, content));
            }

            if !response.stop_reason.wants_tools() || requested.is_empty() {
                return Ok(ChatOutcome {
                    response: last_text,
                    tool_calls,
                    conversation: messages,
                    iterations: iteration,
                    stop: ChatStop::Completed,
                });
            }

            let mut results = Vec::with_capacity(requested.len());
            for call in &requested {
                let result = self.registry.execute_tool_call(call).await;
                results.push(ContentPart::from(ToolResult::from_value(call.id.clone(), &result)));
                tool_calls.push(ToolCallRecord {
                    tool: call.name.clone(),
                    input: call.input.clone(),
                    result,
                });
            }
            messages.push(ChatMessage::with_parts(MessageRole::User, results));
        }

        warn!(
            max_iterations = self.settings.max_iterations,
            tool_calls = tool_calls.len(),
            "Iteration limit reached with tool calls still pending"
        );
        if last_text.trim().is_empty() {
            last_text = ITERATION_LIMIT_REPLY.to_string();
        }
        Ok(ChatOutcome {
            response: last_text,
            tool_calls,
            conversation: messages,
            iterations: self.settings.max_iterations,
            stop: ChatStop::IterationLimit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::providers::{CompletionResponse, MockProvider};
    use crate::tools::DocsServer;
    use crate::types::StopReason;

    fn registry(dir: &std::path::Path) -> Arc<ToolRegistry> {
        std::fs::write(dir.join("rfc3261.txt"), "intro\nBYE ends a dialog.\noutro\n").unwrap();
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(DocsServer::new(dir)));
        Arc::new(registry)
    }

    fn client(provider: Arc<MockProvider>, registry: Arc<ToolRegistry>) -> ChatClient {
        ChatClient::new(provider, ProviderModelConfig::new("mock-model"), registry, ChatSettings::default())
    }

    #[tokio::test]
    async fn test_plain_answer() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::fixed("SIP is a signalling protocol."));
        let outcome = client(provider.clone(), registry(dir.path()))
            .send_message("What is SIP?", vec![ChatMessage::user("hi"), ChatMessage::assistant("hello")])
            .await
            .unwrap();

        assert_eq!(outcome.response, "SIP is a signalling protocol.");
        assert_eq!(outcome.stop, ChatStop::Completed);
        assert_eq!(outcome.iterations, 1);
        assert!(outcome.tool_calls.is_empty());
        assert_eq!(outcome.conversation.len(), 4);

        let requests = provider.requests();
        let request = &requests[0];
        assert_eq!(request.messages.len(), 3);
        assert_eq!(request.max_tokens, 4096);
        assert_eq!(request.tools.len(), 2);
        assert!(request.system.as_deref().unwrap().contains("- rfc3261: VoIP documentation: rfc3261"));
    }

    #[tokio::test]
    async fn test_tool_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::scripted(vec![
            CompletionResponse::tool_use(vec![
                ContentPart::text("Let me check."),
                ContentPart::tool_use("toolu_1", "search_voip_docs", json!({"query": "BYE"})),
                ContentPart::tool_use("toolu_2", "get_sip_message_example", json!({"message_type": "BYE"})),
            ]),
            CompletionResponse::text("BYE terminates a dialog."),
        ]));

        let outcome = client(provider.clone(), registry(dir.path()))
            .send_message("How do I hang up?", Vec::new())
            .await
            .unwrap();

        assert_eq!(outcome.response, "BYE terminates a dialog.");
        assert_eq!(outcome.iterations, 2);
        assert_eq!(outcome.tool_calls.len(), 2);
        assert_eq!(outcome.tool_calls[0].tool, "search_voip_docs");
        assert_eq!(outcome.tool_calls[0].result["total_found"], 1);
        assert_eq!(outcome.tool_calls[1].tool, "get_sip_message_example");

        // user, assistant(tool_use), user(tool_result x2), assistant(text)
        assert_eq!(outcome.conversation.len(), 4);
        let requests = provider.requests();
        let second = &requests[1];
        let parts = parts_of(&second.messages[2]);
        assert_eq!(parts.len(), 2);
        match &parts[0] {
            ContentPart::ToolResult { tool_use_id, content, is_error } => {
                assert_eq!(tool_use_id, "toolu_1");
                assert!(content.contains("\n  \"query\": \"BYE\""));
                assert!(!is_error);
            }
            other => panic!("expected tool result, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_tool_reported_to_model() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::scripted(vec![
            CompletionResponse::tool_use(vec![ContentPart::tool_use("toolu_1", "launch_rocket", json!({}))]),
            CompletionResponse::text("I can't do that."),
        ]));

        let outcome = client(provider, registry(dir.path()))
            .send_message("Launch", Vec::new())
            .await
            .unwrap();
        assert_eq!(outcome.tool_calls[0].result, json!({"error": "Tool launch_rocket not found"}));
        assert_eq!(outcome.response, "I can't do that.");
    }

    #[tokio::test]
    async fn test_iteration_limit() {
        let dir = tempfile::tempdir().unwrap();
        let looping = |i: usize| {
            CompletionResponse::tool_use(vec![
                ContentPart::text(format!("attempt {}", i)),
                ContentPart::tool_use(format!("toolu_{}", i), "get_sip_message_example", json!({"message_type": "ACK"})),
            ])
        };
        let provider = Arc::new(MockProvider::scripted((1..=5).map(looping)));

        let outcome = client(provider.clone(), registry(dir.path()))
            .send_message("loop forever", Vec::new())
            .await
            .unwrap();

        assert_eq!(outcome.stop, ChatStop::IterationLimit);
        assert_eq!(outcome.iterations, 5);
        assert_eq!(outcome.tool_calls.len(), 5);
        assert_eq!(outcome.response, "attempt 5");
        assert_eq!(provider.request_count(), 5);
    }

    #[tokio::test]
    async fn test_iteration_limit_without_text() {
        let dir = tempfile::tempdir().unwrap();
        let tool_only = |i: usize| {
            CompletionResponse::tool_use(vec![ContentPart::tool_use(
                format!("toolu_{}", i),
                "get_sip_message_example",
                json!({"message_type": "ACK"}),
            )])
        };
        let provider = Arc::new(MockProvider::scripted((1..=5).map(tool_only)));

        let outcome = client(provider, registry(dir.path()))
            .send_message("loop forever", Vec::new())
            .await
            .unwrap();
        assert_eq!(outcome.stop, ChatStop::IterationLimit);
        assert_eq!(outcome.response, ITERATION_LIMIT_REPLY);
    }

    #[tokio::test]
    async fn test_iteration_limit_keeps_earlier_text() {
        let dir = tempfile::tempdir().unwrap();
        let mut script = vec![CompletionResponse::tool_use(vec![
            ContentPart::text("Looking up ACK."),
            ContentPart::tool_use("toolu_0", "get_sip_message_example", json!({"message_type": "ACK"})),
        ])];
        script.extend((1..5).map(|i| {
            CompletionResponse::tool_use(vec![ContentPart::tool_use(
                format!("toolu_{}", i),
                "get_sip_message_example",
                json!({"message_type": "ACK"}),
            )])
        }));
        let provider = Arc::new(MockProvider::scripted(script));

        let outcome = client(provider, registry(dir.path()))
            .send_message("loop forever", Vec::new())
            .await
            .unwrap();
        assert_eq!(outcome.stop, ChatStop::IterationLimit);
        assert_eq!(outcome.response, "Looking up ACK.");
    }

    #[tokio::test]
    async fn test_tool_use_without_calls_ends_turn() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::scripted(vec![CompletionResponse {
            content: vec![ContentPart::text("done"), ContentPart::Unsupported],
            stop_reason: StopReason::ToolUse,
            ..Default::default()
        }]));

        let outcome = client(provider, registry(dir.path()))
            .send_message("hi", Vec::new())
            .await
            .unwrap();
        assert_eq!(outcome.response, "done");
        assert_eq!(outcome.stop, ChatStop::Completed);
        assert_eq!(parts_of(outcome.conversation.last().unwrap()).len(), 1);
    }

    #[tokio::test]
    async fn test_errors() {
        let dir = tempfile::tempdir().unwrap();
        let chat = client(Arc::new(MockProvider::error("down")), registry(dir.path()));
        assert!(matches!(chat.send_message("   ", Vec::new()).await, Err(ChatError::EmptyMessage)));
        let err = chat.send_message("hi", Vec::new()).await.unwrap_err();
        assert!(matches!(err, ChatError::Provider(_)));
        assert!(err.to_string().contains("Mock error: down"));
    }

    fn parts_of(message: &ChatMessage) -> &[ContentPart] {
        match &message.content {
            crate::types::MessageContent::Parts(parts) => parts,
            other => panic!("expected parts, got {:?}", other),
        }
    }
}
