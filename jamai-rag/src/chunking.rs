//! Sliding-window text chunking.
//!
//! [`TextSplitter`] cuts normalized text into fixed-size character windows
//! that overlap by a configured amount. [`TextSplitter::chunk_document`]
//! wraps the windows into [`DocumentChunk`]s carrying the metadata the
//! retriever filters on.

use std::ops::Range;

use uuid::Uuid;

use crate::document::{
    CHUNK_ID_KEY, CHUNK_INDEX_KEY, DocumentChunk, Metadata, MetadataValue, SOURCE_KEY, TAGS_KEY,
    TENANT_KEY,
};

/// Splits text into overlapping fixed-size windows measured in characters.
///
/// Each window is trimmed and empty windows are dropped. Overlap is
/// measured on the untrimmed window boundaries, so trimming can shrink the
/// overlap visible between two returned strings.
///
/// # Example
///
/// ```rust,ignore
/// use jamai_rag::TextSplitter;
///
/// let splitter = TextSplitter::new(10, 3);
/// let chunks = splitter.split(&"abcdefghij".repeat(3));
/// assert_eq!(chunks.len(), 4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextSplitter {
    /// Create a new `TextSplitter`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` - characters per window (at least one)
    /// * `chunk_overlap` - characters shared by consecutive windows, clamped
    ///   to `chunk_size - 1` so every step advances
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self { chunk_size, chunk_overlap: chunk_overlap.min(chunk_size - 1) }
    }

    /// The window size in characters.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// The effective (clamped) overlap in characters.
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split `text` into ordered, non-empty, trimmed chunks.
    ///
    /// Line endings are normalized to `\n` and the whole text is trimmed
    /// first; blank input yields no chunks.
    pub fn split(&self, text: &str) -> Vec<String> {
        let normalized = text.replace("\r\n", "\n");
        let normalized = normalized.trim();
        if normalized.is_empty() {
            return Vec::new();
        }

        // Byte offset of every char boundary, including the end of the text.
        let offsets: Vec<usize> = normalized
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(normalized.len()))
            .collect();
        let char_len = offsets.len() - 1;

        self.windows(char_len)
            .into_iter()
            .filter_map(|window| {
                let chunk = normalized[offsets[window.start]..offsets[window.end]].trim();
                (!chunk.is_empty()).then(|| chunk.to_string())
            })
            .collect()
    }

    /// Split `text` and wrap each chunk into a [`DocumentChunk`].
    ///
    /// Every chunk gets a fresh UUIDv4 id and metadata holding `source`,
    /// `chunk_index` and `chunk_id`, plus `tenant_id` and `tags` when given.
    pub fn chunk_document(
        &self,
        source: &str,
        text: &str,
        tenant_id: Option<&str>,
        tags: &[String],
    ) -> Vec<DocumentChunk> {
        self.split(text)
            .into_iter()
            .enumerate()
            .map(|(index, chunk_text)| {
                let id = Uuid::new_v4().to_string();
                let mut metadata = Metadata::new();
                metadata.insert(SOURCE_KEY.to_string(), source.into());
                metadata.insert(CHUNK_INDEX_KEY.to_string(), MetadataValue::Integer(index as i64));
                metadata.insert(CHUNK_ID_KEY.to_string(), id.clone().into());
                if let Some(tenant_id) = tenant_id {
                    metadata.insert(TENANT_KEY.to_string(), tenant_id.into());
                }
                if !tags.is_empty() {
                    metadata.insert(TAGS_KEY.to_string(), tags.to_vec().into());
                }
                DocumentChunk::new(id, chunk_text, metadata)
            })
            .collect()
    }

    /// Character ranges of the untrimmed windows over a text of `char_len`
    /// characters. The last window ends exactly at `char_len`.
    fn windows(&self, char_len: usize) -> Vec<Range<usize>> {
        let step = self.chunk_size - self.chunk_overlap;
        let mut windows = Vec::new();
        let mut start = 0;
        loop {
            let end = (start + self.chunk_size).min(char_len);
            windows.push(start..end);
            if end >= char_len {
                break;
            }
            start += step;
        }
        windows
    }
}
