//! PDF text extraction
//!
//! Extraction runs through several independent methods and keeps the
//! longest non-empty result.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::process::Command;
use tracing::{debug, warn};

use super::server::ToolError;

/// A text extraction method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMethod {
    /// `pdf-extract` over the whole document
    PdfExtract,
    /// `lopdf`, page by page
    Lopdf,
    /// External `pdftotext` binary (poppler)
    Pdftotext,
}

impl ExtractionMethod {
    /// All methods, in the order they are tried
    pub const ALL: [ExtractionMethod; 3] = [
        ExtractionMethod::PdfExtract,
        ExtractionMethod::Lopdf,
        ExtractionMethod::Pdftotext,
    ];
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExtractionMethod::PdfExtract => "pdf-extract",
            ExtractionMethod::Lopdf => "lopdf",
            ExtractionMethod::Pdftotext => "pdftotext",
        };
        f.write_str(name)
    }
}

/// Extracted text and the method that produced it
#[derive(Debug, Clone)]
pub struct PdfText {
    pub text: String,
    pub method: ExtractionMethod,
}

/// Runs the extraction chain
#[derive(Debug, Clone)]
pub struct PdfExtractor {
    pdftotext_bin: PathBuf,
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self {
            pdftotext_bin: PathBuf::from("pdftotext"),
        }
    }
}

impl PdfExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific `pdftotext` binary
    pub fn with_pdftotext(mut self, bin: impl Into<PathBuf>) -> Self {
        self.pdftotext_bin = bin.into();
        self
    }

    /// Extract text from a PDF file, keeping the longest result.
    /// Ties go to the method tried first.
    pub async fn extract(&self, path: &Path) -> Result<PdfText, ToolError> {
        let bytes = Arc::new(tokio::fs::read(path).await?);

        let mut candidates = Vec::with_capacity(ExtractionMethod::ALL.len());
        for method in ExtractionMethod::ALL {
            match self.run(method, path, Arc::clone(&bytes)).await {
                Ok(text) => {
                    debug!(path = %path.display(), %method, chars = text.chars().count(), "PDF extraction finished");
                    candidates.push(PdfText { text, method });
                }
                Err(e) => debug!(path = %path.display(), %method, error = %e, "PDF extraction failed"),
            }
        }

        pick_longest(candidates).ok_or_else(|| {
            warn!(path = %path.display(), "No extraction method produced text");
            ToolError::ExecutionFailed(format!("No text could be extracted from {}", path.display()))
        })
    }

    async fn run(&self, method: ExtractionMethod, path: &Path, bytes: Arc<Vec<u8>>) -> Result<String, String> {
        match method {
            ExtractionMethod::PdfExtract => tokio::task::spawn_blocking(move || {
                pdf_extract::extract_text_from_mem(&bytes).map_err(|e| e.to_string())
            })
            .await
            .map_err(|e| format!("extraction task failed: {}", e))?,
            ExtractionMethod::Lopdf => tokio::task::spawn_blocking(move || extract_with_lopdf(&bytes))
                .await
                .map_err(|e| format!("extraction task failed: {}", e))?,
            ExtractionMethod::Pdftotext => {
                let output = Command::new(&self.pdftotext_bin)
                    .arg("-layout")
                    .arg(path)
                    .arg("-")
                    .output()
                    .await
                    .map_err(|e| e.to_string())?;
                if !output.status.success() {
                    return Err(format!("exited with {}", output.status));
                }
                Ok(String::from_utf8_lossy(&output.stdout).into_owned())
            }
        }
    }
}

/// Longest non-blank candidate; on equal length the earlier one wins
fn pick_longest(candidates: impl IntoIterator<Item = PdfText>) -> Option<PdfText> {
    let mut best: Option<(usize, PdfText)> = None;
    for candidate in candidates {
        if candidate.text.trim().is_empty() {
            continue;
        }
        let len = candidate.text.chars().count();
        if best.as_ref().map_or(true, |(best_len, _)| len > *best_len) {
            best = Some((len, candidate));
        }
    }
    best.map(|(_, text)| text)
}

fn extract_with_lopdf(bytes: &[u8]) -> Result<String, String> {
    let document = lopdf::Document::load_mem(bytes).map_err(|e| e.to_string())?;
    let mut text = String::new();
    for page in document.get_pages().keys() {
        // Unreadable pages are skipped
        if let Ok(page_text) = document.extract_text(&[*page]) {
            text.push_str(&page_text);
            text.push('\n');
        }
    }
    Ok(text)
}
