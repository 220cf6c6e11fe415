//! In-memory secret store

use std::collections::HashMap;

use parking_lot::RwLock;

use super::traits::{SecretStore, SecretStoreResult};

/// Read-write store held in memory
///
/// Holds the API key from the config file and serves tests.
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    secrets: RwLock<HashMap<String, String>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecretStore for MemorySecretStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn get(&self, key: &str) -> Option<String> {
        self.secrets.read().get(key).cloned()
    }

    fn store(&self, key: &str, value: &str) -> SecretStoreResult<()> {
        self.secrets.write().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_overwrites() {
        let store = MemorySecretStore::new();
        assert!(store.get("anthropic").is_none());

        store.store("anthropic", "sk-ant-1").unwrap();
        assert_eq!(store.get("anthropic").as_deref(), Some("sk-ant-1"));

        store.store("anthropic", "sk-ant-2").unwrap();
        assert_eq!(store.get("anthropic").as_deref(), Some("sk-ant-2"));
    }

    #[test]
    fn test_resolve_reports_source() {
        let store = MemorySecretStore::new();
        store.store("anthropic", "sk-ant").unwrap();
        let resolved = store.resolve("anthropic").unwrap();
        assert_eq!(resolved.value, "sk-ant");
        assert_eq!(resolved.source, "memory");
    }
}
