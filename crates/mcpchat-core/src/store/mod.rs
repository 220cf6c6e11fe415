//! Chat history storage
//!
//! Conversations and their messages live in SQLite. [`ChatStore`] methods
//! are blocking; async callers go through [`ChatStore::run`], which moves
//! the work onto the blocking thread pool.

mod error;
mod models;
mod sqlite;

pub use error::{StoreError, StoreResult};
pub use models::{clip_title, Conversation, StoredMessage, StoredRole, DEFAULT_TITLE, MAX_TITLE_CHARS};
pub use sqlite::ChatStore;
