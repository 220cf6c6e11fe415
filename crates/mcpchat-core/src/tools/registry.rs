//! Tool registry for routing model tool calls
//!
//! The ToolRegistry is the central component for:
//! - Aggregating tools and resources from every registered server
//! - Filtering tools based on configuration
//! - Converting tools to the provider format
//! - Routing tool calls to the owning server

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use super::server::{ToolError, ToolServer};
use crate::types::{Resource, Tool, ToolCall};

const RESULT_LOG_CHARS: usize = 200;

/// Information about a tool with its owning server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Tool name
    pub name: String,
    /// Tool description
    pub description: String,
    /// JSON Schema for tool parameters
    pub input_schema: Value,
    /// Whether this tool is offered to the model
    pub enabled: bool,
    /// Name of the server that owns this tool
    pub server: String,
}

impl From<&ToolInfo> for Tool {
    fn from(info: &ToolInfo) -> Self {
        Tool {
            name: info.name.clone(),
            description: info.description.clone(),
            input_schema: info.input_schema.clone(),
        }
    }
}

/// A resource tagged with its owning server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceInfo {
    #[serde(flatten)]
    pub resource: Resource,
    pub server: String,
}

/// Filter for tool listings
#[derive(Debug, Clone, Default)]
pub struct ToolFilter {
    /// If set, only include tools with these names
    pub include: Option<HashSet<String>>,
    /// Exclude tools with these names
    pub exclude: HashSet<String>,
    /// Only include enabled tools
    pub only_enabled: bool,
}

impl ToolFilter {
    /// Enabled tools only
    pub fn new() -> Self {
        Self {
            include: None,
            exclude: HashSet::new(),
            only_enabled: true,
        }
    }

    /// Every tool, enabled or not
    pub fn all() -> Self {
        Self::default()
    }

    /// Include only specific tools
    pub fn with_include(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.include = Some(names.into_iter().collect());
        self
    }

    /// Exclude specific tools
    pub fn with_exclude(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.exclude = names.into_iter().collect();
        self
    }

    /// Check if a tool matches this filter
    pub fn matches(&self, tool: &ToolInfo) -> bool {
        if self.only_enabled && !tool.enabled {
            return false;
        }

        if self.exclude.contains(&tool.name) {
            return false;
        }

        if let Some(ref include) = self.include {
            if !include.contains(&tool.name) {
                return false;
            }
        }

        true
    }
}

/// Registry of in-process tool servers
#[derive(Default)]
pub struct ToolRegistry {
    /// Servers in registration order
    servers: Vec<(String, Arc<dyn ToolServer>)>,
    /// Configured enabled/disabled state, by tool name
    tool_states: RwLock<HashMap<String, bool>>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a server under its own name
    pub fn register(&mut self, server: Arc<dyn ToolServer>) {
        let name = server.name().to_string();
        self.register_as(name, server);
    }

    /// Register a server under an explicit name, replacing any server
    /// previously registered under that name
    pub fn register_as(&mut self, name: impl Into<String>, server: Arc<dyn ToolServer>) {
        let name = name.into();
        info!(server = %name, tools = server.tools().len(), "Registered tool server");
        if let Some(slot) = self.servers.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = server;
        } else {
            self.servers.push((name, server));
        }
    }

    /// Server names in registration order
    pub fn server_names(&self) -> Vec<String> {
        self.servers.iter().map(|(name, _)| name.clone()).collect()
    }

    fn server(&self, name: &str) -> Option<&Arc<dyn ToolServer>> {
        self.servers.iter().find(|(n, _)| n == name).map(|(_, s)| s)
    }

    /// Every tool from every server, in registration order
    pub fn all_tools(&self) -> Vec<ToolInfo> {
        let states = self.tool_states.read();
        self.servers
            .iter()
            .flat_map(|(server_name, server)| {
                server.tools().into_iter().map(|tool| ToolInfo {
                    enabled: states.get(&tool.name).copied().unwrap_or(true),
                    name: tool.name,
                    description: tool.description,
                    input_schema: tool.input_schema,
                    server: server_name.clone(),
                })
            })
            .collect()
    }

    /// Every resource from every server, in registration order
    pub async fn all_resources(&self) -> Vec<ResourceInfo> {
        let mut resources = Vec::new();
        for (server_name, server) in &self.servers {
            resources.extend(server.resources().await.into_iter().map(|resource| ResourceInfo {
                resource,
                server: server_name.clone(),
            }));
        }
        resources
    }

    /// Get tools matching a filter
    pub fn get_tools(&self, filter: &ToolFilter) -> Vec<ToolInfo> {
        self.all_tools().into_iter().filter(|t| filter.matches(t)).collect()
    }

    /// Get tools for sending to the model (enabled only)
    pub fn llm_tools(&self) -> Vec<Tool> {
        self.get_tools(&ToolFilter::new()).iter().map(Tool::from).collect()
    }

    /// Enable or disable a tool
    pub fn set_tool_enabled(&self, name: &str, enabled: bool) {
        self.tool_states.write().insert(name.to_string(), enabled);
    }

    /// Disable every tool excluded by `filter`
    pub fn apply_filter(&self, filter: &ToolFilter) {
        for tool in self.get_tools(&ToolFilter::all()) {
            if !filter.matches(&tool) {
                info!(tool = %tool.name, "Tool disabled by configuration");
                self.set_tool_enabled(&tool.name, false);
            }
        }
    }

    /// Name of the server owning an enabled tool; first match wins
    pub fn find_server(&self, tool_name: &str) -> Option<String> {
        self.get_tools(&ToolFilter::new())
            .into_iter()
            .find(|t| t.name == tool_name)
            .map(|t| t.server)
    }

    /// Call a tool on a named server. Failures come back as `{"error": ...}`.
    pub async fn call_tool(&self, tool_name: &str, arguments: &Value, server_name: &str) -> Value {
        let call = ToolCall::new(String::new(), tool_name, arguments.clone());
        self.dispatch(&call, server_name).await
    }

    async fn dispatch(&self, call: &ToolCall, server_name: &str) -> Value {
        let tool_name = call.name.as_str();
        let Some(server) = self.server(server_name) else {
            warn!(server = %server_name, tool = %tool_name, "Tool call for unknown server");
            return ToolError::UnknownServer(server_name.to_string()).to_value();
        };

        info!(tool = %tool_name, server = %server_name, input = %call.input, "Calling tool");

        let result = match server.call_tool(call).await {
            Ok(value) => value,
            Err(e) => {
                warn!(tool = %tool_name, error = %e, "Tool call failed");
                e.to_value()
            }
        };

        let rendered = result.to_string();
        let preview: String = rendered.chars().take(RESULT_LOG_CHARS).collect();
        info!(tool = %tool_name, result = %preview, "Tool result");

        result
    }

    /// Execute a tool call requested by the model
    pub async fn execute_tool_call(&self, tool_call: &ToolCall) -> Value {
        match self.find_server(&tool_call.name) {
            Some(server) => self.dispatch(tool_call, &server).await,
            None => {
                warn!(tool = %tool_call.name, "Model requested a tool no server owns");
                ToolError::ToolNotFound(tool_call.name.clone()).to_value()
            }
        }
    }

    /// Read a resource from whichever server lists it
    pub async fn read_resource(&self, uri: &str) -> Result<String, ToolError> {
        for (_, server) in &self.servers {
            if server.resources().await.iter().any(|r| r.uri == uri) {
                return server.read_resource(uri).await;
            }
        }
        Err(ToolError::ResourceNotFound(uri.to_string()))
    }

    /// Get count of available tools
    pub fn tool_count(&self) -> usize {
        self.all_tools().len()
    }

    /// Get count of enabled tools
    pub fn enabled_tool_count(&self) -> usize {
        self.get_tools(&ToolFilter::new()).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    use crate::tools::server::ToolOutcome;

    struct StaticServer {
        name: &'static str,
        tools: Vec<&'static str>,
    }

    #[async_trait]
    impl ToolServer for StaticServer {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "test server"
        }

        fn tools(&self) -> Vec<Tool> {
            self.tools.iter().map(|t| Tool::new(*t, format!("{} tool", t))).collect()
        }

        async fn resources(&self) -> Vec<Resource> {
            vec![Resource::new(
                format!("mem://{}/readme", self.name),
                "readme",
                "Readme",
                "text/plain",
            )]
        }

        async fn call_tool(&self, call: &ToolCall) -> ToolOutcome {
            if call.name == "fail" {
                return Err(ToolError::ExecutionFailed("boom".to_string()));
            }
            Ok(json!({ "server": self.name, "tool": call.name, "args": call.input }))
        }

        async fn read_resource(&self, uri: &str) -> Result<String, ToolError> {
            Ok(format!("contents of {}", uri))
        }
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(StaticServer { name: "alpha", tools: vec!["shared", "only_alpha", "fail"] }));
        registry.register(Arc::new(StaticServer { name: "beta", tools: vec!["shared", "only_beta"] }));
        registry
    }

    fn info(name: &str, enabled: bool) -> ToolInfo {
        ToolInfo {
            name: name.to_string(),
            description: String::new(),
            input_schema: json!({}),
            enabled,
            server: "alpha".to_string(),
        }
    }

    #[test]
    fn test_tool_filter_default() {
        let filter = ToolFilter::new();
        assert!(filter.matches(&info("search_voip_docs", true)));
        assert!(!filter.matches(&info("get_weather", false)));
        assert!(ToolFilter::all().matches(&info("get_weather", false)));
    }

    #[test]
    fn test_tool_filter_include_exclude() {
        let filter = ToolFilter::new().with_exclude(["get_weather".to_string()]);
        assert!(filter.matches(&info("search_voip_docs", true)));
        assert!(!filter.matches(&info("get_weather", true)));

        let filter = ToolFilter::new().with_include(["get_weather".to_string()]);
        assert!(!filter.matches(&info("search_voip_docs", true)));
        assert!(filter.matches(&info("get_weather", true)));
    }

    #[tokio::test]
    async fn test_aggregation_keeps_registration_order() {
        let registry = registry();
        let tools = registry.all_tools();
        let names: Vec<_> = tools.iter().map(|t| (t.server.as_str(), t.name.as_str())).collect();
        assert_eq!(
            names,
            vec![
                ("alpha", "shared"),
                ("alpha", "only_alpha"),
                ("alpha", "fail"),
                ("beta", "shared"),
                ("beta", "only_beta"),
            ]
        );

        let resources = registry.all_resources().await;
        assert_eq!(resources.len(), 2);
        assert_eq!(resources[1].server, "beta");
        let wire = serde_json::to_value(&resources[0]).unwrap();
        assert_eq!(wire["mimeType"], "text/plain");
        assert_eq!(wire["server"], "alpha");
    }

    #[test]
    fn test_find_server_first_match_wins() {
        let registry = registry();
        assert_eq!(registry.find_server("shared").as_deref(), Some("alpha"));
        assert_eq!(registry.find_server("only_beta").as_deref(), Some("beta"));
        assert_eq!(registry.find_server("missing"), None);
    }

    #[test]
    fn test_disabled_tools_hidden_from_model() {
        let registry = registry();
        registry.set_tool_enabled("only_alpha", false);
        assert_eq!(registry.tool_count(), 5);
        assert_eq!(registry.enabled_tool_count(), 4);
        assert!(registry.llm_tools().iter().all(|t| t.name != "only_alpha"));
        assert_eq!(registry.find_server("only_alpha"), None);

        registry.apply_filter(&ToolFilter::new().with_exclude(["only_beta".to_string()]));
        assert_eq!(registry.enabled_tool_count(), 3);
    }

    #[tokio::test]
    async fn test_call_tool_routes_to_named_server() {
        let registry = registry();
        let result = registry.call_tool("shared", &json!({"x": 1}), "beta").await;
        assert_eq!(result["server"], "beta");
        assert_eq!(result["args"]["x"], 1);

        let result = registry.call_tool("shared", &json!({}), "gamma").await;
        assert_eq!(result, json!({"error": "Unknown server: gamma"}));

        let result = registry.call_tool("fail", &json!({}), "alpha").await;
        assert_eq!(result, json!({"error": "boom"}));
    }

    #[tokio::test]
    async fn test_execute_tool_call() {
        let registry = registry();
        let result = registry
            .execute_tool_call(&ToolCall::new("t1", "only_beta", json!({})))
            .await;
        assert_eq!(result["server"], "beta");

        let result = registry
            .execute_tool_call(&ToolCall::new("t2", "frobnicate", json!({})))
            .await;
        assert_eq!(result, json!({"error": "Tool frobnicate not found"}));
    }

    #[tokio::test]
    async fn test_read_resource() {
        let registry = registry();
        let text = registry.read_resource("mem://beta/readme").await.unwrap();
        assert_eq!(text, "contents of mem://beta/readme");
        assert!(matches!(
            registry.read_resource("mem://nowhere").await,
            Err(ToolError::ResourceNotFound(_))
        ));
    }
}
