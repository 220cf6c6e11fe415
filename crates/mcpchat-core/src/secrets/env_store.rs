//! Environment variable secret store

use std::collections::HashMap;
use std::env;

use once_cell::sync::Lazy;

use super::traits::{SecretStore, SecretStoreError, SecretStoreResult};

/// Mapping from provider names to environment variable names
static ENV_VAR_MAP: Lazy<HashMap<&'static str, Vec<&'static str>>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("anthropic", vec!["ANTHROPIC_API_KEY"]);
    m.insert("mock", vec![]);
    m
});

/// Read-only secret store backed by the process environment
///
/// Provider names map to their conventional variables (`anthropic` reads
/// `ANTHROPIC_API_KEY`). Any other key is read as a variable name, then as
/// `<KEY>_API_KEY`.
#[derive(Debug, Default)]
pub struct EnvSecretStore;

impl EnvSecretStore {
    pub fn new() -> Self {
        Self
    }

    /// Get the environment variable names for a provider
    pub fn env_vars_for_provider(provider: &str) -> Option<&'static [&'static str]> {
        ENV_VAR_MAP.get(provider.to_lowercase().as_str()).map(|v| v.as_slice())
    }

    fn read(name: &str) -> Option<String> {
        env::var(name).ok().filter(|v| !v.is_empty())
    }
}

impl SecretStore for EnvSecretStore {
    fn name(&self) -> &str {
        "env"
    }

    fn get(&self, key: &str) -> Option<String> {
        if let Some(value) = Self::read(key) {
            return Some(value);
        }

        if let Some(vars) = Self::env_vars_for_provider(key) {
            if let Some(value) = vars.iter().find_map(|var| Self::read(var)) {
                return Some(value);
            }
        }

        Self::read(&format!("{}_API_KEY", key.to_uppercase()))
    }

    fn store(&self, _key: &str, _value: &str) -> SecretStoreResult<()> {
        Err(SecretStoreError::ReadOnly)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_store_read_only() {
        let store = EnvSecretStore::new();
        assert_eq!(store.name(), "env");
        assert!(matches!(store.store("anthropic", "value"), Err(SecretStoreError::ReadOnly)));
    }

    #[test]
    fn test_env_store_get_direct() {
        env::set_var("MCPCHAT_TEST_SECRET_DIRECT", "direct");
        let store = EnvSecretStore::new();
        assert_eq!(store.get("MCPCHAT_TEST_SECRET_DIRECT").as_deref(), Some("direct"));
        env::remove_var("MCPCHAT_TEST_SECRET_DIRECT");
    }

    #[test]
    fn test_env_store_api_key_suffix() {
        env::set_var("MCPCHAT_TEST_SUFFIX_API_KEY", "suffixed");
        let store = EnvSecretStore::new();
        assert_eq!(store.get("mcpchat_test_suffix").as_deref(), Some("suffixed"));
        env::remove_var("MCPCHAT_TEST_SUFFIX_API_KEY");
    }

    #[test]
    fn test_env_store_ignores_empty_values() {
        env::set_var("MCPCHAT_TEST_EMPTY", "");
        let store = EnvSecretStore::new();
        assert_eq!(store.get("MCPCHAT_TEST_EMPTY"), None);
        env::remove_var("MCPCHAT_TEST_EMPTY");
    }

    #[test]
    fn test_provider_mapping() {
        assert_eq!(EnvSecretStore::env_vars_for_provider("Anthropic"), Some(&["ANTHROPIC_API_KEY"][..]));
        assert_eq!(EnvSecretStore::env_vars_for_provider("openai"), None);
    }
}
