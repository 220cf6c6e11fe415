//! Configuration
//!
//! A single YAML file, read from the workspace level
//! (`.config/mcpchat/config.yaml`) when present, else from the user level
//! (`<config dir>/mcpchat/config.yaml`). Every section is optional.
//! Environment variables override file values.

mod error;
mod file;

pub use error::{ConfigError, ConfigResult};
pub use file::{
    ChatSection, ConfigFile, ConfigLevel, DatabaseSection, DocsSection, FileConfigProvider, LoggingSection,
    ProviderSection, ServerSection, ToolsSection, WeatherSection,
};
