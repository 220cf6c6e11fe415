//! Tool-calling chat loop

mod client;
mod error;
mod prompt;

pub use client::{ChatClient, ChatOutcome, ChatSettings, ChatStop, ToolCallRecord, ITERATION_LIMIT_REPLY};
pub use error::{ChatError, ChatResult};
pub use prompt::{format_resources, system_prompt};
