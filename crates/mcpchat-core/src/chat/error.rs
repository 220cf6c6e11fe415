//! Chat loop errors

use thiserror::Error;

use crate::providers::ProviderError;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Empty message")]
    EmptyMessage,

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

pub type ChatResult<T> = Result<T, ChatError>;
