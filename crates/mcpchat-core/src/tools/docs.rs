//! VoIP documentation tool server
//!
//! Serves plain text, Markdown and PDF documents from a single directory.
//! Two tools are exposed to the model:
//!
//! - `search_voip_docs`: case-insensitive substring search, returning each
//!   matching line with two lines of context on either side
//! - `get_sip_message_example`: canned SIP messages by method
//!
//! Every document in the directory is also listed as a `file://` resource.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::pdf::PdfExtractor;
use super::server::{ToolError, ToolOutcome, ToolServer};
use super::sip;
use crate::types::{Resource, Tool, ToolCall};

/// Server name used for routing
pub const DOCS_SERVER_NAME: &str = "voip-docs";

const DEFAULT_MAX_RESULTS: usize = 3;
const MAX_RESULTS_LIMIT: usize = 20;
const CONTEXT_LINES: usize = 2;

/// Document kinds served from the docs directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocKind {
    Text,
    Markdown,
    Pdf,
}

impl DocKind {
    fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "txt" => Some(DocKind::Text),
            "md" => Some(DocKind::Markdown),
            "pdf" => Some(DocKind::Pdf),
            _ => None,
        }
    }

    fn mime_type(self) -> &'static str {
        match self {
            DocKind::Text => "text/plain",
            DocKind::Markdown => "text/markdown",
            DocKind::Pdf => "application/pdf",
        }
    }
}

/// Tool server over a directory of VoIP documentation
pub struct DocsServer {
    docs_dir: PathBuf,
    pdf: PdfExtractor,
}

impl DocsServer {
    pub fn new(docs_dir: impl Into<PathBuf>) -> Self {
        Self {
            docs_dir: docs_dir.into(),
            pdf: PdfExtractor::default(),
        }
    }

    /// Use a custom PDF extractor
    pub fn with_pdf_extractor(mut self, pdf: PdfExtractor) -> Self {
        self.pdf = pdf;
        self
    }

    pub fn docs_dir(&self) -> &Path {
        &self.docs_dir
    }

    /// Create the docs directory if it does not exist
    pub fn ensure_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.docs_dir)
    }

    /// Documents in the directory, sorted by file name
    async fn doc_files(&self) -> Vec<(PathBuf, DocKind)> {
        let mut entries = match tokio::fs::read_dir(&self.docs_dir).await {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };

        let mut files = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(dir = %self.docs_dir.display(), error = %e, "Error listing documentation directory");
                    break;
                }
            };
            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            let path = entry.path();
            if !is_file {
                continue;
            }
            if let Some(kind) = DocKind::from_path(&path) {
                files.push((path, kind));
            }
        }
        files.sort_by(|a, b| a.0.file_name().cmp(&b.0.file_name()));
        files
    }

    async fn load_text(&self, path: &Path, kind: DocKind) -> Result<String, ToolError> {
        match kind {
            DocKind::Pdf => Ok(self.pdf.extract(path).await?.text),
            DocKind::Text | DocKind::Markdown => Ok(tokio::fs::read_to_string(path).await?),
        }
    }

    /// Search every document for `query`
    pub async fn search(&self, query: &str, max_results: usize) -> Value {
        let is_dir = tokio::fs::metadata(&self.docs_dir).await.map(|m| m.is_dir()).unwrap_or(false);
        if !is_dir {
            return json!({ "results": [], "message": "Documentation directory not found" });
        }

        let needle = query.to_lowercase();
        let mut results = Vec::new();

        for (path, kind) in self.doc_files().await {
            let content = match self.load_text(&path, kind).await {
                Ok(content) => content,
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "Error reading documentation file");
                    continue;
                }
            };

            let matches = find_matches(&content, &needle, max_results);
            if !matches.is_empty() {
                let file = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                results.push(json!({ "file": file, "matches": matches }));
            }
        }

        let total_found = results.len();
        results.truncate(max_results);
        debug!(query = %query, total_found, "Documentation search finished");

        json!({
            "results": results,
            "query": query,
            "total_found": total_found,
        })
    }

    async fn resolve_resource(&self, uri: &str) -> Result<PathBuf, ToolError> {
        let raw = uri.strip_prefix("file://").unwrap_or(uri);
        let path = tokio::fs::canonicalize(raw)
            .await
            .map_err(|_| ToolError::ResourceNotFound(uri.to_string()))?;
        let root = tokio::fs::canonicalize(&self.docs_dir)
            .await
            .map_err(|_| ToolError::ResourceNotFound(uri.to_string()))?;
        if !path.starts_with(&root) {
            return Err(ToolError::InvalidArguments(format!(
                "{} is outside the documentation directory",
                uri
            )));
        }
        Ok(path)
    }
}

/// Context windows around each line containing `needle` (already lowercased),
/// at most `limit` of them
fn find_matches(content: &str, needle: &str, limit: usize) -> Vec<String> {
    if !content.to_lowercase().contains(needle) {
        return Vec::new();
    }

    let lines: Vec<&str> = content.lines().collect();
    let mut matches = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        if line.to_lowercase().contains(needle) {
            let start = i.saturating_sub(CONTEXT_LINES);
            let end = (i + CONTEXT_LINES + 1).min(lines.len());
            matches.push(lines[start..end].join("\n"));
            if matches.len() >= limit {
                break;
            }
        }
    }
    matches
}

/// `max_results` argument, defaulted and clamped to `1..=20`
fn max_results_arg(call: &ToolCall) -> usize {
    let requested = call
        .get_arg_i64("max_results")
        .or_else(|| call.get_arg_f64("max_results").map(|f| f as i64));
    match requested {
        Some(n) => n.clamp(1, MAX_RESULTS_LIMIT as i64) as usize,
        None => DEFAULT_MAX_RESULTS,
    }
}

#[async_trait]
impl ToolServer for DocsServer {
    fn name(&self) -> &str {
        DOCS_SERVER_NAME
    }

    fn description(&self) -> &str {
        "Access to VoIP and SIP protocol documentation"
    }

    fn tools(&self) -> Vec<Tool> {
        vec![
            Tool::new(
                "search_voip_docs",
                "Search through VoIP documentation for specific topic. Returns relevant excerpts from SIP RFCs, FreeSWITCH docs, etc.",
            )
            .with_schema(json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search query (e.g., 'SIP INVITE method', 'FreeSWITCH dialplan')"
                    },
                    "max_results": {
                        "type": "integer",
                        "description": "Maximum number of results to return (default: 3)",
                        "default": DEFAULT_MAX_RESULTS
                    }
                },
                "required": ["query"]
            })),
            Tool::new(
                "get_sip_message_example",
                "Get example SIP messages for different scenarios (INVITE, REGISTER, BYE, etc.)",
            )
            .with_schema(json!({
                "type": "object",
                "properties": {
                    "message_type": {
                        "type": "string",
                        "enum": sip::MESSAGE_TYPES,
                        "description": "Type of SIP message"
                    }
                },
                "required": ["message_type"]
            })),
        ]
    }

    async fn resources(&self) -> Vec<Resource> {
        self.doc_files()
            .await
            .into_iter()
            .map(|(path, kind)| {
                let stem = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                Resource::new(
                    format!("file://{}", path.display()),
                    stem.clone(),
                    format!("VoIP documentation: {}", stem),
                    kind.mime_type(),
                )
            })
            .collect()
    }

    async fn call_tool(&self, call: &ToolCall) -> ToolOutcome {
        match call.name.as_str() {
            "search_voip_docs" => {
                let query = call
                    .get_arg_str("query")
                    .ok_or_else(|| ToolError::bad_argument("query", "a string"))?;
                if query.trim().is_empty() {
                    return Err(ToolError::InvalidArguments("'query' must not be empty".to_string()));
                }
                Ok(self.search(query, max_results_arg(call)).await)
            }
            "get_sip_message_example" => {
                let message_type = call
                    .get_arg_str("message_type")
                    .ok_or_else(|| ToolError::bad_argument("message_type", "a string"))?;
                Ok(Value::String(sip::example_or_fallback(message_type)))
            }
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }

    async fn read_resource(&self, uri: &str) -> Result<String, ToolError> {
        let path = self.resolve_resource(uri).await?;
        let kind = DocKind::from_path(&path).ok_or_else(|| ToolError::ResourceNotFound(uri.to_string()))?;
        self.load_text(&path, kind).await
    }
}
