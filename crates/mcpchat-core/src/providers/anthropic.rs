//! AnthropicProvider - hosted Messages API over reqwest
//!
//! Sends non-streaming `POST /v1/messages` requests. The transcript types in
//! `crate::types` already serialize to the wire shape, so assistant content
//! goes back to the API exactly as it was received.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, RETRY_AFTER};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::types::{ChatMessage, Tool};

use super::error::{ProviderError, ProviderResult};
use super::traits::{CompletionRequest, CompletionResponse, Provider, ProviderModelConfig};

const PROVIDER_ID: &str = "anthropic";
const API_VERSION: &str = "2023-06-01";
const MAX_BACKOFF: Duration = Duration::from_secs(8);

/// Transport settings for the hosted API
#[derive(Debug, Clone)]
pub struct AnthropicSettings {
    /// Retries after the first attempt for retryable failures
    pub max_retries: u32,
    /// Per-attempt request timeout
    pub timeout: Duration,
    /// Initial backoff delay, doubled after each retry
    pub initial_backoff: Duration,
}

impl Default for AnthropicSettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            timeout: Duration::from_secs(60),
            initial_backoff: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    #[serde(skip_serializing_if = "no_tools")]
    tools: &'a [Tool],
    messages: &'a [ChatMessage],
}

fn no_tools(tools: &&[Tool]) -> bool {
    tools.is_empty()
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    message: String,
}

/// Provider for the hosted Messages API
pub struct AnthropicProvider {
    client: reqwest::Client,
    settings: AnthropicSettings,
}

impl AnthropicProvider {
    /// Create a provider with the given transport settings
    pub fn new(settings: AnthropicSettings) -> ProviderResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()?;
        Ok(Self { client, settings })
    }

    /// Create with default settings (3 retries, 60 second timeout)
    pub fn with_defaults() -> ProviderResult<Self> {
        Self::new(AnthropicSettings::default())
    }

    fn endpoint(&self, model: &ProviderModelConfig) -> String {
        format!("{}/v1/messages", self.get_api_base(model).trim_end_matches('/'))
    }

    fn headers(api_key: &str) -> ProviderResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("anthropic-version", HeaderValue::from_static(API_VERSION));
        let key = HeaderValue::from_str(api_key)
            .map_err(|_| ProviderError::Other("API key contains invalid header characters".to_string()))?;
        headers.insert("x-api-key", key);
        Ok(headers)
    }

    /// Delay before the given retry attempt (1-based)
    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.settings
            .initial_backoff
            .checked_mul(factor)
            .unwrap_or(MAX_BACKOFF)
            .min(MAX_BACKOFF)
    }

    async fn send_once(
        &self,
        url: &str,
        headers: HeaderMap,
        body: &MessagesRequest<'_>,
    ) -> (ProviderResult<CompletionResponse>, Option<Duration>) {
        let response = match self.client.post(url).headers(headers).json(body).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return (Err(ProviderError::Timeout { provider: PROVIDER_ID.to_string() }), None)
            }
            Err(e) => return (Err(ProviderError::Http(e)), None),
        };

        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);

        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => return (Err(ProviderError::Http(e)), retry_after),
        };

        if status.is_success() {
            let parsed = serde_json::from_str::<CompletionResponse>(&text)
                .map_err(|e| ProviderError::invalid_response(PROVIDER_ID, e.to_string()));
            return (parsed, None);
        }

        (Err(Self::status_error(status, &text)), retry_after)
    }

    fn status_error(status: StatusCode, body: &str) -> ProviderError {
        let message = match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(envelope) if !envelope.error.kind.is_empty() => {
                format!("{}: {}", envelope.error.kind, envelope.error.message)
            }
            Ok(envelope) => envelope.error.message,
            Err(_) => body.chars().take(500).collect(),
        };

        if status == StatusCode::TOO_MANY_REQUESTS {
            ProviderError::rate_limited(PROVIDER_ID, message)
        } else {
            ProviderError::api_error(PROVIDER_ID, status.as_u16(), message)
        }
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        PROVIDER_ID
    }

    fn default_api_base(&self) -> &str {
        "https://api.anthropic.com"
    }

    async fn complete(
        &self,
        request: CompletionRequest,
        model: &ProviderModelConfig,
    ) -> ProviderResult<CompletionResponse> {
        let api_key = model
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ProviderError::missing_api_key(PROVIDER_ID))?;

        let url = self.endpoint(model);
        let body = MessagesRequest {
            model: &model.model,
            max_tokens: request.max_tokens,
            system: request.system.as_deref(),
            tools: &request.tools,
            messages: &request.messages,
        };

        debug!(
            model = %model.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending messages request"
        );

        let mut attempt = 0;
        loop {
            let (result, retry_after) = self.send_once(&url, Self::headers(api_key)?, &body).await;
            match result {
                Ok(response) => {
                    info!(
                        id = %response.id,
                        stop_reason = ?response.stop_reason,
                        blocks = response.content.len(),
                        "Messages response received"
                    );
                    return Ok(response);
                }
                Err(e) if e.is_retryable() && attempt < self.settings.max_retries => {
                    attempt += 1;
                    let delay = retry_after.unwrap_or_else(|| self.backoff(attempt)).min(MAX_BACKOFF);
                    warn!(error = %e, attempt, delay_ms = delay.as_millis() as u64, "Retrying messages request");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ContentPart;
    use serde_json::json;

    #[test]
    fn test_request_body_shape() {
        let messages = vec![
            ChatMessage::user("What does BYE look like?"),
            ChatMessage::with_parts(
                crate::types::MessageRole::Assistant,
                vec![ContentPart::tool_use("toolu_1", "get_sip_message_example", json!({"message_type": "BYE"}))],
            ),
        ];
        let body = MessagesRequest {
            model: "claude-sonnet-4-5",
            max_tokens: 4096,
            system: Some("be brief"),
            tools: &[],
            messages: &messages,
        };

        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["model"], "claude-sonnet-4-5");
        assert_eq!(value["system"], "be brief");
        assert!(value.get("tools").is_none());
        assert_eq!(value["messages"][0]["content"], "What does BYE look like?");
        assert_eq!(value["messages"][1]["content"][0]["type"], "tool_use");
    }

    #[test]
    fn test_status_error_mapping() {
        let body = r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#;
        let err = AnthropicProvider::status_error(StatusCode::from_u16(529).unwrap(), body);
        assert!(matches!(err, ProviderError::ApiError { status: 529, .. }));
        assert!(err.to_string().contains("overloaded_error: Overloaded"));
        assert!(err.is_retryable());

        let err = AnthropicProvider::status_error(StatusCode::TOO_MANY_REQUESTS, "slow down");
        assert!(matches!(err, ProviderError::RateLimited { .. }));
    }

    #[test]
    fn test_backoff_is_capped() {
        let provider = AnthropicProvider::with_defaults().unwrap();
        assert_eq!(provider.backoff(1), Duration::from_millis(500));
        assert_eq!(provider.backoff(2), Duration::from_secs(1));
        assert_eq!(provider.backoff(10), MAX_BACKOFF);
    }

    #[test]
    fn test_endpoint() {
        let provider = AnthropicProvider::with_defaults().unwrap();
        let model = ProviderModelConfig::new("m");
        assert_eq!(provider.endpoint(&model), "https://api.anthropic.com/v1/messages");

        let model = ProviderModelConfig::new("m").with_api_base("http://127.0.0.1:8080/");
        assert_eq!(provider.endpoint(&model), "http://127.0.0.1:8080/v1/messages");
    }

    fn fast_retries(max_retries: u32) -> AnthropicProvider {
        AnthropicProvider::new(AnthropicSettings {
            max_retries,
            timeout: Duration::from_secs(5),
            initial_backoff: Duration::from_millis(1),
        })
        .unwrap()
    }

    fn hello() -> CompletionRequest {
        CompletionRequest::new(vec![ChatMessage::user("hi")])
    }

    const REPLY: &str = r#"{
        "id": "msg_01",
        "type": "message",
        "role": "assistant",
        "model": "m",
        "content": [{"type": "text", "text": "Hello from SIP land"}],
        "stop_reason": "end_turn",
        "usage": {"input_tokens": 12, "output_tokens": 5}
    }"#;

    #[tokio::test]
    async fn test_retries_overloaded_then_succeeds() {
        let mut upstream = mockito::Server::new_async().await;
        let overloaded = upstream
            .mock("POST", "/v1/messages")
            .match_header("x-api-key", "k")
            .match_header("anthropic-version", API_VERSION)
            .with_status(529)
            .with_body(r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#)
            .expect(1)
            .create_async()
            .await;
        let ok = upstream
            .mock("POST", "/v1/messages")
            .match_header("x-api-key", "k")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(REPLY)
            .expect(1)
            .create_async()
            .await;

        let model = ProviderModelConfig::new("m").with_api_base(upstream.url()).with_api_key("k");
        let response = fast_retries(3).complete(hello(), &model).await.unwrap();

        overloaded.assert_async().await;
        ok.assert_async().await;
        assert_eq!(response.id, "msg_01");
        assert_eq!(response.text_content(), "Hello from SIP land");
        assert_eq!(response.stop_reason, crate::types::StopReason::EndTurn);
        assert_eq!(response.usage.map(|u| u.output_tokens), Some(5));
    }

    #[tokio::test]
    async fn test_server_errors_stop_after_max_retries() {
        let mut upstream = mockito::Server::new_async().await;
        let failing = upstream
            .mock("POST", "/v1/messages")
            .with_status(500)
            .with_body(r#"{"type":"error","error":{"type":"api_error","message":"Internal"}}"#)
            .expect(3)
            .create_async()
            .await;

        let model = ProviderModelConfig::new("m").with_api_base(upstream.url()).with_api_key("k");
        let err = fast_retries(2).complete(hello(), &model).await.unwrap_err();

        failing.assert_async().await;
        assert!(matches!(err, ProviderError::ApiError { status: 500, .. }));
        assert!(err.to_string().contains("api_error: Internal"));
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let mut upstream = mockito::Server::new_async().await;
        let rejected = upstream
            .mock("POST", "/v1/messages")
            .with_status(400)
            .with_body(r#"{"type":"error","error":{"type":"invalid_request_error","message":"max_tokens too large"}}"#)
            .expect(1)
            .create_async()
            .await;

        let model = ProviderModelConfig::new("m").with_api_base(upstream.url()).with_api_key("k");
        let err = fast_retries(3).complete(hello(), &model).await.unwrap_err();

        rejected.assert_async().await;
        assert!(matches!(err, ProviderError::ApiError { status: 400, .. }));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let provider = AnthropicProvider::with_defaults().unwrap();
        let result = provider
            .complete(CompletionRequest::new(vec![ChatMessage::user("hi")]), &ProviderModelConfig::new("m"))
            .await;
        assert!(matches!(result, Err(ProviderError::MissingApiKey { .. })));
    }
}
