//! Assemble a [`ChatService`] from a [`ConfigFile`]

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use crate::chat::{ChatClient, ChatSettings};
use crate::config::ConfigFile;
use crate::providers::{create_provider, AnthropicSettings, Provider, ProviderError, ProviderModelConfig};
use crate::secrets::{api_key_chain, SecretStore, SecretStoreError};
use crate::service::ChatService;
use crate::store::{ChatStore, StoreError};
use crate::tools::{DocsServer, PdfExtractor, ToolError, ToolRegistry, WeatherServer};

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("No API key for provider '{0}' (set it in the config file or the environment)")]
    MissingApiKey(String),

    #[error("Failed to prepare docs directory: {0}")]
    DocsDir(#[from] std::io::Error),

    #[error(transparent)]
    Secret(#[from] SecretStoreError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type BootstrapResult<T> = Result<T, BootstrapError>;

/// Tool servers enabled by `config`, with the tool filter applied
pub fn build_registry(config: &ConfigFile) -> BootstrapResult<ToolRegistry> {
    let docs = DocsServer::new(&config.docs.dir)
        .with_pdf_extractor(PdfExtractor::new().with_pdftotext(&config.docs.pdftotext));
    docs.ensure_dir()?;

    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(docs));

    if config.weather.enabled {
        let weather = WeatherServer::new(
            config.weather.api_base.clone(),
            Duration::from_secs(config.weather.timeout_secs),
        )?;
        registry.register(Arc::new(weather));
    }

    registry.apply_filter(&config.tools.filter());
    info!(
        servers = ?registry.server_names(),
        tools = registry.tool_count(),
        enabled = registry.enabled_tool_count(),
        "Tool registry ready"
    );
    Ok(registry)
}

/// Provider named in `config`, plus its model settings with the resolved key
pub fn build_provider(config: &ConfigFile) -> BootstrapResult<(Arc<dyn Provider>, ProviderModelConfig)> {
    let section = &config.provider;
    let chain = api_key_chain(&section.name, section.api_key.as_deref())?;
    let api_key = match chain.resolve(&section.name) {
        Some(resolved) => {
            info!(provider = %section.name, source = %resolved.source, "Resolved API key");
            Some(resolved.value)
        }
        None if section.name.eq_ignore_ascii_case("mock") => None,
        None => return Err(BootstrapError::MissingApiKey(section.name.clone())),
    };

    let settings = AnthropicSettings {
        max_retries: section.max_retries,
        timeout: Duration::from_secs(section.timeout_secs),
        ..Default::default()
    };
    let provider: Arc<dyn Provider> = Arc::from(create_provider(&section.name, settings)?);
    Ok((provider, section.model_config(api_key)))
}

/// Open the store and wire the chat loop to `provider`
pub fn build_service_with_provider(
    config: &ConfigFile,
    provider: Arc<dyn Provider>,
    model: ProviderModelConfig,
    store: ChatStore,
) -> BootstrapResult<ChatService> {
    let registry = build_registry(config)?;
    if registry.enabled_tool_count() == 0 {
        warn!("No tools enabled; the model will answer without tools");
    }

    let settings = ChatSettings {
        max_iterations: config.chat.max_iterations,
        max_tokens: config.chat.max_tokens,
    };
    let chat = ChatClient::new(provider, model, Arc::new(registry), settings);
    Ok(ChatService::new(store, chat, config.server.recent_conversations))
}

/// Everything the server needs, from configuration alone
pub fn build_service(config: &ConfigFile) -> BootstrapResult<ChatService> {
    let (provider, model) = build_provider(config)?;
    let store = ChatStore::open(&config.database.resolved_path())?;
    info!(provider = provider.name(), model = %model.model, "Chat service ready");
    build_service_with_provider(config, provider, model, store)
}
