//! Secret storage
//!
//! The model API key is looked up through a [`ChainSecretStore`]: a key set
//! in the config file (held in a [`MemorySecretStore`]) wins over the
//! environment ([`EnvSecretStore`]).

mod traits;
mod env_store;
mod memory_store;
mod chain_store;

use std::sync::Arc;

pub use traits::{ResolvedSecret, SecretStore, SecretStoreError, SecretStoreResult};
pub use env_store::EnvSecretStore;
pub use memory_store::MemorySecretStore;
pub use chain_store::ChainSecretStore;

/// Chain of the configured key (if any) followed by the environment
pub fn api_key_chain(provider: &str, configured_key: Option<&str>) -> SecretStoreResult<ChainSecretStore> {
    let configured = Arc::new(MemorySecretStore::new());
    if let Some(key) = configured_key.filter(|k| !k.is_empty()) {
        configured.store(provider, key)?;
    }
    ChainSecretStore::new(vec![configured, Arc::new(EnvSecretStore::new())])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_key_wins() {
        let chain = api_key_chain("mcpchat_test_provider", Some("from-config")).unwrap();
        let resolved = chain.resolve("mcpchat_test_provider").unwrap();
        assert_eq!(resolved.value, "from-config");
        assert_eq!(resolved.source, "memory");

        let chain = api_key_chain("mcpchat_test_provider", Some("")).unwrap();
        assert!(chain.resolve("mcpchat_test_provider").is_none());
    }
}
