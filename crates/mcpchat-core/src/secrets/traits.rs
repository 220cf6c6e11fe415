//! Core traits and types for secret storage

use thiserror::Error;

/// A secret together with the store that supplied it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSecret {
    pub value: String,
    /// Name of the store the value came from
    pub source: String,
}

/// Errors that can occur during secret store operations
#[derive(Error, Debug)]
pub enum SecretStoreError {
    #[error("Store is read-only")]
    ReadOnly,

    #[error("Invalid store configuration: {0}")]
    Invalid(String),
}

pub type SecretStoreResult<T> = Result<T, SecretStoreError>;

/// Trait for secret storage implementations
///
/// Keys are either provider names (`anthropic`), which stores may map to a
/// well-known variable, or literal variable names (`ANTHROPIC_API_KEY`).
pub trait SecretStore: Send + Sync {
    /// Human-readable name of this store
    fn name(&self) -> &str;

    /// Retrieve a secret by key
    fn get(&self, key: &str) -> Option<String>;

    /// Store a secret
    ///
    /// Returns `Err(SecretStoreError::ReadOnly)` if the store doesn't support writing.
    fn store(&self, key: &str, value: &str) -> SecretStoreResult<()>;

    /// Retrieve a secret along with where it came from
    fn resolve(&self, key: &str) -> Option<ResolvedSecret> {
        self.get(key).map(|value| ResolvedSecret {
            value,
            source: self.name().to_string(),
        })
    }
}
