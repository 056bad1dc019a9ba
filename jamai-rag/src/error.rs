//! Error types for the `jamai-rag` crate.

use thiserror::Error;

/// Errors that can occur in retrieval, indexing and generation.
#[derive(Debug, Error)]
pub enum RagError {
    /// The embedding endpoint failed, returned an error payload, or never
    /// produced a non-empty vector within the retry budget.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// The vector store reported that the collection does not exist.
    ///
    /// Kept distinct from [`RagError::VectorStoreError`] so callers can
    /// create the collection or reset readiness instead of failing.
    #[error("Collection '{collection}' not found")]
    CollectionNotFound {
        /// The missing collection.
        collection: String,
    },

    /// The chat-completion endpoint failed.
    #[error("Generation error ({provider}): {message}")]
    GenerationError {
        /// The chat provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl RagError {
    /// Returns `true` if this error signals a missing collection.
    pub fn is_collection_not_found(&self) -> bool {
        matches!(self, Self::CollectionNotFound { .. })
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
