//! File-based configuration (YAML)
//!
//! Supports user-level (~/.config/mcpchat/config.yaml) and workspace-level
//! (.config/mcpchat/config.yaml) config.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::error::{ConfigError, ConfigResult};
use crate::providers::ProviderModelConfig;
use crate::tools::ToolFilter;

/// Model provider settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSection {
    /// Provider id (`anthropic` or `mock`)
    pub name: String,
    pub model: String,
    pub api_base: Option<String>,
    /// API key; the environment is consulted when unset
    pub api_key: Option<String>,
    pub max_retries: u32,
    pub timeout_secs: u64,
}

impl Default for ProviderSection {
    fn default() -> Self {
        Self {
            name: "anthropic".to_string(),
            model: "claude-sonnet-4-5".to_string(),
            api_base: None,
            api_key: None,
            max_retries: 3,
            timeout_secs: 60,
        }
    }
}

impl ProviderSection {
    /// Model config for provider requests, with the resolved key
    pub fn model_config(&self, api_key: Option<String>) -> ProviderModelConfig {
        let mut config = ProviderModelConfig::new(self.model.clone());
        config.api_key = api_key;
        config.api_base = self.api_base.clone();
        config
    }
}

/// Chat loop limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSection {
    pub max_iterations: usize,
    pub max_tokens: u32,
}

impl Default for ChatSection {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            max_tokens: 4096,
        }
    }
}

/// Documentation directory settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocsSection {
    pub dir: PathBuf,
    /// `pdftotext` binary used as the last PDF extraction method
    pub pdftotext: PathBuf,
}

impl Default for DocsSection {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("/tmp/voip_docs"),
            pdftotext: PathBuf::from("pdftotext"),
        }
    }
}

/// Weather backend settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherSection {
    pub enabled: bool,
    pub api_base: String,
    pub timeout_secs: u64,
}

impl Default for WeatherSection {
    fn default() -> Self {
        Self {
            enabled: true,
            api_base: crate::tools::DEFAULT_WEATHER_API_BASE.to_string(),
            timeout_secs: 15,
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: String,
    /// Conversations listed on the index view
    pub recent_conversations: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
            recent_conversations: 10,
        }
    }
}

/// Chat history database settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    /// SQLite file; defaults to the platform data directory
    pub path: Option<PathBuf>,
}

impl DatabaseSection {
    /// Configured path, else `<data dir>/mcpchat/mcpchat.db`
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|dir| dir.join("mcpchat").join("mcpchat.db"))
                .unwrap_or_else(|| PathBuf::from("mcpchat.db"))
        })
    }
}

/// Which tools are offered to the model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    /// If set, only these tools are enabled
    pub include: Option<Vec<String>>,
    pub exclude: Vec<String>,
}

impl ToolsSection {
    pub fn filter(&self) -> ToolFilter {
        let mut filter = ToolFilter::new().with_exclude(self.exclude.iter().cloned());
        if let Some(include) = &self.include {
            filter = filter.with_include(include.iter().cloned());
        }
        filter
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    /// Mirror log output to this file
    pub file: Option<PathBuf>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Configuration file structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub provider: ProviderSection,
    pub chat: ChatSection,
    pub docs: DocsSection,
    pub weather: WeatherSection,
    pub server: ServerSection,
    pub database: DatabaseSection,
    pub tools: ToolsSection,
    pub logging: LoggingSection,
}

impl ConfigFile {
    /// Parse a YAML document
    pub fn from_yaml(content: &str) -> ConfigResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: ConfigFile = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the application cannot run with
    pub fn validate(&self) -> ConfigResult<()> {
        if self.chat.max_iterations == 0 {
            return Err(ConfigError::Invalid("chat.max_iterations must be at least 1".to_string()));
        }
        if self.chat.max_tokens == 0 {
            return Err(ConfigError::Invalid("chat.max_tokens must be at least 1".to_string()));
        }
        if self.provider.model.trim().is_empty() {
            return Err(ConfigError::Invalid("provider.model must not be empty".to_string()));
        }
        Ok(())
    }

    /// Apply environment overrides from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup`. Empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(model) = get("ANTHROPIC_MODEL") {
            self.provider.model = model;
        }
        if let Some(base) = get("ANTHROPIC_BASE_URL") {
            self.provider.api_base = Some(base);
        }
        if let Some(dir) = get("VOIP_DOCS_DIR") {
            self.docs.dir = PathBuf::from(dir);
        }
        if let Some(path) = get("MCPCHAT_DATABASE") {
            self.database.path = Some(PathBuf::from(path));
        }
        if let Some(bind) = get("MCPCHAT_BIND") {
            self.server.bind = bind;
        }
        if let Some(level) = get("MCPCHAT_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(file) = get("MCPCHAT_DEBUG_LOG") {
            self.logging.file = Some(PathBuf::from(file));
        }
    }
}

/// Config level (user or workspace)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLevel {
    /// User-level config (~/.config/mcpchat/config.yaml)
    User,
    /// Workspace-level config (.config/mcpchat/config.yaml in the working directory)
    Workspace,
}

impl ConfigLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigLevel::User => "user",
            ConfigLevel::Workspace => "workspace",
        }
    }
}

/// Reads and writes the YAML config file at one level
pub struct FileConfigProvider {
    path: PathBuf,
    level: ConfigLevel,
    cache: RwLock<Option<ConfigFile>>,
}

impl FileConfigProvider {
    pub fn new(path: impl Into<PathBuf>, level: ConfigLevel) -> Self {
        Self {
            path: path.into(),
            level,
            cache: RwLock::new(None),
        }
    }

    /// User-level config provider (~/.config/mcpchat/config.yaml)
    pub fn user() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".config"));
        Self::new(config_dir.join("mcpchat").join("config.yaml"), ConfigLevel::User)
    }

    /// Workspace-level config provider (.config/mcpchat/config.yaml)
    pub fn workspace(workspace_root: impl AsRef<Path>) -> Self {
        let path = workspace_root.as_ref().join(".config").join("mcpchat").join("config.yaml");
        Self::new(path, ConfigLevel::Workspace)
    }

    /// The workspace file if it exists, else the user file
    pub fn discover(workspace_root: impl AsRef<Path>) -> Self {
        let workspace = Self::workspace(workspace_root);
        if workspace.exists() {
            workspace
        } else {
            Self::user()
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn level(&self) -> ConfigLevel {
        self.level
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn load(&self) -> ConfigResult<ConfigFile> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No config file, using defaults");
            return Ok(ConfigFile::default());
        }

        let content = fs::read_to_string(&self.path)?;
        let config = ConfigFile::from_yaml(&content)?;
        info!(path = %self.path.display(), level = self.level.as_str(), "Loaded configuration");
        Ok(config)
    }

    /// Cached config, loading it on first use
    pub fn get_config(&self) -> ConfigResult<ConfigFile> {
        if let Some(config) = self.cache.read().as_ref() {
            return Ok(config.clone());
        }
        self.reload()
    }

    /// Reload config from disk (invalidate cache)
    pub fn reload(&self) -> ConfigResult<ConfigFile> {
        let config = self.load()?;
        *self.cache.write() = Some(config.clone());
        Ok(config)
    }

    /// Write config to disk
    pub fn save(&self, config: &ConfigFile) -> ConfigResult<()> {
        config.validate()?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_yaml::to_string(config)?)?;
        *self.cache.write() = Some(config.clone());
        Ok(())
    }

    /// Copy the current config file next to itself
    pub fn backup(&self) -> ConfigResult<Option<PathBuf>> {
        if !self.exists() {
            return Ok(None);
        }

        let backup_path = self.path.with_extension("yaml.backup");
        fs::copy(&self.path, &backup_path)?;
        Ok(Some(backup_path))
    }

    /// Write `config`, first copying any existing file aside.
    /// Returns the backup path when one was made.
    pub fn init(&self, config: &ConfigFile) -> ConfigResult<Option<PathBuf>> {
        config.validate()?;
        let backup = self.backup()?;
        self.save(config)?;
        info!(path = %self.path.display(), backup = ?backup, "Wrote configuration");
        Ok(backup)
    }
}

impl std::fmt::Debug for FileConfigProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileConfigProvider")
            .field("path", &self.path)
            .field("level", &self.level)
            .field("exists", &self.exists())
            .finish()
    }
}
