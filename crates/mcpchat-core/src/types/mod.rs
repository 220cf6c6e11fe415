//! Core types for model interactions
//!
//! This module contains the shared types used by providers, tool servers
//! and the chat loop.

mod message;
mod tool;
mod resource;
mod stop;

pub use message::{ChatMessage, ContentPart, MessageRole, MessageContent};
pub use tool::{Tool, ToolCall, ToolResult};
pub use resource::Resource;
pub use stop::StopReason;
