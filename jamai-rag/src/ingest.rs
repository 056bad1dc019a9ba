//! Ingestion of already-decoded files.
//!
//! Text extraction from PDF, DOCX and similar formats happens upstream;
//! this module only sees file names and their decoded text.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chunking::TextSplitter;
use crate::document::DocumentChunk;

/// Reason recorded for files whose text is blank.
pub const NO_READABLE_TEXT: &str = "File contained no readable text";

/// A decoded file handed to the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestFile {
    /// File name, used as the chunk source label.
    pub name: String,
    /// Decoded text content.
    pub text: String,
}

impl IngestFile {
    /// Create a file.
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self { name: name.into(), text: text.into() }
    }
}

/// Outcome of an ingestion call.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestReport {
    /// Files that contributed text.
    pub files_processed: usize,
    /// Points written to the collection.
    pub chunks_indexed: usize,
    /// Skipped file names with the reason.
    pub skipped: BTreeMap<String, String>,
}

/// Split a comma-separated tag list, trimming and dropping empty entries.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|tag| !tag.is_empty()).map(str::to_string).collect()
}

/// Files turned into chunks, before indexing.
#[derive(Debug, Default)]
pub(crate) struct PreparedBatch {
    pub files_processed: usize,
    pub skipped: BTreeMap<String, String>,
    pub chunks: Vec<DocumentChunk>,
}

pub(crate) fn prepare_batch(
    splitter: &TextSplitter,
    files: &[IngestFile],
    tenant_id: Option<&str>,
    tags: &[String],
) -> PreparedBatch {
    let mut batch = PreparedBatch::default();
    for file in files {
        if file.text.trim().is_empty() {
            let key = if file.name.is_empty() { "unknown" } else { file.name.as_str() };
            batch.skipped.insert(key.to_string(), NO_READABLE_TEXT.to_string());
            continue;
        }
        batch.files_processed += 1;

        let source = if file.name.is_empty() { "document" } else { file.name.as_str() };
        let chunks = splitter.chunk_document(source, &file.text, tenant_id, tags);
        debug!(source, chunk_count = chunks.len(), "chunked file");
        batch.chunks.extend(chunks);
    }
    batch
}
