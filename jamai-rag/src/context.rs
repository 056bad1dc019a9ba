//! Context-window assembly under a character budget.

use serde::{Deserialize, Serialize};

use crate::document::{RetrievedChunk, SourceRef};

/// Context text used when nothing was retrieved.
pub const NO_CONTEXT: &str = "No supporting documents available.";

/// The prompt context and the citations for the chunks it contains.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssembledContext {
    /// Formatted context text.
    pub text: String,
    /// One citation per chunk included in `text`, in order.
    pub sources: Vec<SourceRef>,
}

/// Formats ranked chunks into a bounded context.
///
/// Chunk texts are trimmed and cut so that the chunk texts together never
/// exceed `max_chars` characters. Each included chunk is rendered as
///
/// ```text
/// [Source 1] guide.txt
/// <text>
/// ```
///
/// where the index is the 1-based position in the retrieved list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextAssembler {
    max_chars: usize,
}

impl ContextAssembler {
    /// Create an assembler with a budget of `max_chars` characters.
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    /// The character budget.
    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Assemble `retrieved` (already ranked) into a context.
    pub fn assemble(&self, retrieved: &[RetrievedChunk]) -> AssembledContext {
        if retrieved.is_empty() {
            return AssembledContext { text: NO_CONTEXT.to_string(), sources: Vec::new() };
        }

        let mut used = 0;
        let mut sections = Vec::new();
        let mut sources = Vec::new();

        for (index, chunk) in retrieved.iter().enumerate() {
            let text = chunk.text.trim();
            if text.is_empty() {
                continue;
            }
            let remaining = self.max_chars.saturating_sub(used);
            if remaining == 0 {
                break;
            }

            let snippet = truncate_chars(text, remaining);
            used += snippet.chars().count();
            sections.push(format!("[Source {}] {}\n{snippet}\n", index + 1, chunk.source()));
            sources.push(SourceRef {
                source: chunk.source().to_string(),
                score: chunk.score,
                text: snippet.to_string(),
                chunk_id: chunk.chunk_id().map(str::to_string),
            });
        }

        if sections.is_empty() {
            return AssembledContext { text: NO_CONTEXT.to_string(), sources };
        }
        AssembledContext { text: sections.join("\n"), sources }
    }
}

/// The longest prefix of `text` with at most `max` characters.
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}
