//! mcpchat core
//!
//! A tool-calling chat assistant for VoIP/SIP questions. The model is offered
//! tools from in-process tool servers (documentation search, SIP message
//! examples, weather) and the conversation history is kept in SQLite.
//!
//! ## Chat loop
//!
//! ```rust,ignore
//! use mcpchat_core::{bootstrap, ConfigFile};
//!
//! let service = bootstrap::build_service(&ConfigFile::default())?;
//! let conversation = service.new_conversation().await?;
//! let exchange = service.send(conversation.id, "What does a SIP BYE do?").await?;
//! println!("{}", exchange.assistant_response);
//! ```

pub mod types;
pub mod secrets;
pub mod logging;
pub mod config;
pub mod providers;
pub mod tools;
pub mod chat;
pub mod store;
pub mod service;
pub mod bootstrap;

// Re-export commonly used types
pub use types::{
    ChatMessage, ContentPart, MessageRole, MessageContent,
    Resource, StopReason,
    Tool, ToolCall, ToolResult,
};

pub use secrets::{
    SecretStore, ResolvedSecret, SecretStoreError, SecretStoreResult,
    EnvSecretStore, MemorySecretStore, ChainSecretStore,
    api_key_chain,
};

pub use config::{ConfigError, ConfigFile, ConfigLevel, ConfigResult, FileConfigProvider};

pub use providers::{
    create_provider, AnthropicProvider, AnthropicSettings, CompletionRequest, CompletionResponse, MockProvider,
    Provider, ProviderError, ProviderModelConfig, ProviderResult,
};

pub use tools::{
    DocsServer, ToolError, ToolFilter, ToolInfo, ToolRegistry, ToolServer, WeatherServer,
};

pub use chat::{ChatClient, ChatError, ChatOutcome, ChatSettings, ChatStop, ToolCallRecord};

pub use store::{ChatStore, Conversation, StoreError, StoredMessage, StoredRole};

pub use service::{ChatService, Exchange, Overview, ServiceError, ServiceResult, ToolListing};

pub use bootstrap::{BootstrapError, BootstrapResult};
