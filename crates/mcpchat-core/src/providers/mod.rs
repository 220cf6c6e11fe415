//! Model provider implementations
//!
//! ## Architecture
//!
//! The chat loop talks to a `Provider`, which runs one non-streaming
//! completion per call. `AnthropicProvider` speaks the hosted Messages API
//! directly over reqwest so tool-use blocks and their ids survive the round
//! trip untouched.
//!
//! The `MockProvider` is kept for testing purposes.

mod traits;
mod error;
mod anthropic;
mod mock;

// Core traits and types
pub use traits::{CompletionRequest, CompletionResponse, Provider, ProviderModelConfig, Usage};
pub use error::{ProviderError, ProviderResult};

pub use anthropic::{AnthropicProvider, AnthropicSettings};

// Mock provider for testing
pub use mock::{MockProvider, MockMode};

/// Create a provider for the given provider ID
pub fn create_provider(provider_id: &str, settings: AnthropicSettings) -> ProviderResult<Box<dyn Provider>> {
    match provider_id.to_lowercase().as_str() {
        "anthropic" => Ok(Box::new(AnthropicProvider::new(settings)?)),
        "mock" => Ok(Box::new(MockProvider::echo())),
        other => Err(ProviderError::Other(format!(
            "Unsupported provider '{}' (supported: {})",
            other,
            supported_providers().join(", ")
        ))),
    }
}

/// List all supported provider IDs
pub fn supported_providers() -> Vec<&'static str> {
    vec!["anthropic", "mock"]
}
