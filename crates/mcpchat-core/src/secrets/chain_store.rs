//! Chained secret store with fallback behavior

use std::sync::Arc;

use super::traits::{ResolvedSecret, SecretStore, SecretStoreError, SecretStoreResult};

/// Tries each store in order; the first hit wins.
/// Writes go to the first store.
pub struct ChainSecretStore {
    stores: Vec<Arc<dyn SecretStore>>,
}

impl ChainSecretStore {
    pub fn new(stores: Vec<Arc<dyn SecretStore>>) -> SecretStoreResult<Self> {
        if stores.is_empty() {
            return Err(SecretStoreError::Invalid(
                "a chain needs at least one store".to_string(),
            ));
        }
        Ok(Self { stores })
    }
}

impl SecretStore for ChainSecretStore {
    fn name(&self) -> &str {
        "chain"
    }

    fn get(&self, key: &str) -> Option<String> {
        self.stores.iter().find_map(|store| store.get(key))
    }

    fn resolve(&self, key: &str) -> Option<ResolvedSecret> {
        self.stores.iter().find_map(|store| store.resolve(key))
    }

    fn store(&self, key: &str, value: &str) -> SecretStoreResult<()> {
        self.stores[0].store(key, value)
    }
}
