use super::chunker::TextChunker;
use super::error::NarrationError;
use crate::infrastructure::storage::{Artifact, BlobStore, DocumentKey};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

/// Separator written between chunks of the stored text. Informational only:
/// synthesis strips it and re-chunks with its own size.
pub const CHUNK_MARKER: &str = "\n--- CHUNK BREAK ---\n";

static URL_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://[^\s]+").expect("valid regex"));
static WHITESPACE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Pdf,
    Html,
    PlainText,
}

impl SourceFormat {
    /// Detect the format from the document bytes
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"%PDF-") {
            return Some(SourceFormat::Pdf);
        }
        let text = std::str::from_utf8(bytes).ok()?;
        let head: String = text.chars().take(1024).collect::<String>().to_lowercase();
        if head.contains("<html") || head.contains("<!doctype html") || head.contains("<body") {
            Some(SourceFormat::Html)
        } else {
            Some(SourceFormat::PlainText)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionReport {
    pub characters: usize,
    pub chunks: usize,
}

/// Turns the uploaded source document into the stored text derivative
pub struct TextExtractor {
    blob_store: Arc<dyn BlobStore>,
    chunker: TextChunker,
}

impl TextExtractor {
    pub fn new(blob_store: Arc<dyn BlobStore>, text_chunk_size: usize) -> Self {
        Self {
            blob_store,
            chunker: TextChunker::new(text_chunk_size),
        }
    }

    pub async fn extract(&self, key: &DocumentKey) -> Result<ExtractionReport, NarrationError> {
        let source = self
            .blob_store
            .get(&key.artifact(Artifact::Source))
            .await?
            .ok_or_else(|| NarrationError::Extraction(format!("source document missing for {}", key)))?;

        let format = SourceFormat::sniff(&source)
            .ok_or_else(|| NarrationError::Extraction("unsupported or corrupt source document".to_string()))?;

        tracing::info!(document = %key, format = ?format, source_size = source.len(), "Extracting text");

        let raw = extract_plain_text(source, format).await?;
        let text = clean_text(&raw);
        if text.is_empty() {
            return Err(NarrationError::Extraction("document contains no extractable text".to_string()));
        }

        let chunks: Vec<&str> = self.chunker.chunks(&text).collect();
        let report = ExtractionReport {
            characters: text.chars().count(),
            chunks: chunks.len(),
        };

        self.blob_store
            .put(
                &key.artifact(Artifact::Text),
                chunks.join(CHUNK_MARKER).into_bytes(),
                Artifact::Text.content_type(),
            )
            .await?;

        tracing::info!(
            document = %key,
            characters = report.characters,
            chunks = report.chunks,
            "Text derivative stored"
        );
        Ok(report)
    }
}

/// Inverse of the chunk joining done at extraction time
pub fn strip_chunk_markers(stored: &str) -> String {
    stored.replace(CHUNK_MARKER, "")
}

async fn extract_plain_text(source: Vec<u8>, format: SourceFormat) -> Result<String, NarrationError> {
    match format {
        SourceFormat::Pdf => {
            // pdf-extract is CPU bound and may panic on malformed input
            tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&source))
                .await
                .map_err(|e| NarrationError::Extraction(format!("PDF parser crashed: {}", e)))?
                .map_err(|e| NarrationError::Extraction(format!("unreadable PDF: {}", e)))
        }
        SourceFormat::Html => Ok(html2text::from_read(source.as_slice(), usize::MAX)),
        SourceFormat::PlainText => String::from_utf8(source)
            .map_err(|e| NarrationError::Extraction(format!("source is not valid UTF-8: {}", e))),
    }
}

/// Remove URLs and collapse whitespace runs into single spaces
fn clean_text(text: &str) -> String {
    let without_urls = URL_PATTERN.replace_all(text, "");
    WHITESPACE_PATTERN
        .replace_all(&without_urls, " ")
        .trim()
        .to_string()
}
