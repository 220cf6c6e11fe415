//! Tool server trait and error types

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;

use crate::types::{Resource, Tool, ToolCall};

/// Errors raised while running a tool or reading a resource
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Unknown server: {0}")]
    UnknownServer(String),

    #[error("Tool {0} not found")]
    ToolNotFound(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("{0}")]
    ExecutionFailed(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ToolError {
    /// The JSON value handed to the model in place of a result
    pub fn to_value(&self) -> Value {
        json!({ "error": self.to_string() })
    }

    /// A required argument is absent or has the wrong type
    pub fn bad_argument(key: &str, expected: &str) -> Self {
        ToolError::InvalidArguments(format!("'{}' must be {}", key, expected))
    }
}

/// Result of a single tool invocation
pub type ToolOutcome = Result<Value, ToolError>;

/// An in-process tool server
///
/// A server owns a set of tools and, optionally, a set of readable
/// resources. Servers are registered with a [`ToolRegistry`](super::ToolRegistry)
/// which routes calls from the model to the owning server.
#[async_trait]
pub trait ToolServer: Send + Sync {
    /// Server name used for routing (e.g. "voip-docs")
    fn name(&self) -> &str;

    /// Human readable description
    fn description(&self) -> &str;

    /// Tools offered by this server
    fn tools(&self) -> Vec<Tool>;

    /// Resources offered by this server
    async fn resources(&self) -> Vec<Resource> {
        Vec::new()
    }

    /// Run the tool named by `call`, reading its arguments from `call.input`
    async fn call_tool(&self, call: &ToolCall) -> ToolOutcome;

    /// Read a resource by URI
    async fn read_resource(&self, uri: &str) -> Result<String, ToolError> {
        Err(ToolError::ResourceNotFound(uri.to_string()))
    }
}
