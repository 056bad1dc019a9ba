//! Configuration for the retrieval engine.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

const DEFAULT_SYSTEM_PROMPT: &str =
    "You are JamAI, a calm assistant who answers using the provided context. \
     Decline when the answer is not in the context. Cite sources when possible.";

/// Configuration parameters for the retrieval engine and its collaborators.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Base URL of the Ollama server used for embeddings and chat.
    pub ollama_host: String,
    /// Chat model name.
    pub llm_model: String,
    /// Embedding model name.
    pub embed_model: String,
    /// Timeout applied to every embedding and chat request, in seconds.
    pub request_timeout_secs: u64,
    /// Qdrant gRPC URL.
    pub qdrant_url: String,
    /// Optional Qdrant API key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qdrant_api_key: Option<String>,
    /// Name of the single collection holding every chunk.
    pub collection_name: String,
    /// Window size of the chunker in characters.
    pub chunk_size: usize,
    /// Characters shared between consecutive windows. Clamped to
    /// `chunk_size - 1` by the chunker.
    pub chunk_overlap: usize,
    /// Number of results retrieved when a request does not specify one.
    pub default_top_k: usize,
    /// Character budget of the assembled context.
    pub max_context_chars: usize,
    /// System instruction sent ahead of every conversation.
    pub system_prompt: String,
    /// Sampling temperature for chat completions.
    pub temperature: f32,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            ollama_host: "http://ollama:11434".to_string(),
            llm_model: "llama3.1".to_string(),
            embed_model: "mxbai-embed-large".to_string(),
            request_timeout_secs: 120,
            qdrant_url: "http://qdrant:6334".to_string(),
            qdrant_api_key: None,
            collection_name: "rag_documents".to_string(),
            chunk_size: 800,
            chunk_overlap: 100,
            default_top_k: 4,
            max_context_chars: 4000,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            temperature: 0.2,
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Build a configuration from the process environment.
    ///
    /// Unset variables keep their defaults. See [`RagConfig::from_vars`] for
    /// the recognised names.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    ///
    /// Recognised keys: `OLLAMA_HOST`, `LLM_MODEL`, `EMBED_MODEL`,
    /// `OLLAMA_TIMEOUT`, `QDRANT_URL`, `QDRANT_API_KEY`, `QDRANT_COLLECTION`,
    /// `CHUNK_SIZE`, `CHUNK_OVERLAP`, `TOP_K`, `MAX_CONTEXT_CHARS`,
    /// `SYSTEM_PROMPT` and `LLM_TEMPERATURE`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a numeric variable does not parse
    /// or the resulting configuration fails validation.
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();
        if let Some(v) = lookup("OLLAMA_HOST") {
            builder = builder.ollama_host(v);
        }
        if let Some(v) = lookup("LLM_MODEL") {
            builder = builder.llm_model(v);
        }
        if let Some(v) = lookup("EMBED_MODEL") {
            builder = builder.embed_model(v);
        }
        if let Some(v) = parse_var(&lookup, "OLLAMA_TIMEOUT")? {
            builder = builder.request_timeout(Duration::from_secs(v));
        }
        if let Some(v) = lookup("QDRANT_URL") {
            builder = builder.qdrant_url(v);
        }
        if let Some(v) = lookup("QDRANT_API_KEY").filter(|k| !k.is_empty()) {
            builder = builder.qdrant_api_key(v);
        }
        if let Some(v) = lookup("QDRANT_COLLECTION") {
            builder = builder.collection_name(v);
        }
        if let Some(v) = parse_var(&lookup, "CHUNK_SIZE")? {
            builder = builder.chunk_size(v);
        }
        if let Some(v) = parse_var(&lookup, "CHUNK_OVERLAP")? {
            builder = builder.chunk_overlap(v);
        }
        if let Some(v) = parse_var(&lookup, "TOP_K")? {
            builder = builder.default_top_k(v);
        }
        if let Some(v) = parse_var(&lookup, "MAX_CONTEXT_CHARS")? {
            builder = builder.max_context_chars(v);
        }
        if let Some(v) = lookup("SYSTEM_PROMPT") {
            builder = builder.system_prompt(v);
        }
        if let Some(v) = parse_var(&lookup, "LLM_TEMPERATURE")? {
            builder = builder.temperature(v);
        }
        builder.build()
    }

    /// The request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| RagError::ConfigError(format!("invalid value for {key} ({raw:?}): {e}"))),
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the Ollama base URL.
    pub fn ollama_host(mut self, host: impl Into<String>) -> Self {
        self.config.ollama_host = host.into();
        self
    }

    /// Set the chat model name.
    pub fn llm_model(mut self, model: impl Into<String>) -> Self {
        self.config.llm_model = model.into();
        self
    }

    /// Set the embedding model name.
    pub fn embed_model(mut self, model: impl Into<String>) -> Self {
        self.config.embed_model = model.into();
        self
    }

    /// Set the per-request timeout for embedding and chat calls.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout_secs = timeout.as_secs();
        self
    }

    /// Set the Qdrant URL.
    pub fn qdrant_url(mut self, url: impl Into<String>) -> Self {
        self.config.qdrant_url = url.into();
        self
    }

    /// Set the Qdrant API key.
    pub fn qdrant_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.qdrant_api_key = Some(key.into());
        self
    }

    /// Set the collection name.
    pub fn collection_name(mut self, name: impl Into<String>) -> Self {
        self.config.collection_name = name.into();
        self
    }

    /// Set the chunk window size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive windows in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the default number of results to retrieve.
    pub fn default_top_k(mut self, k: usize) -> Self {
        self.config.default_top_k = k;
        self
    }

    /// Set the context character budget.
    pub fn max_context_chars(mut self, chars: usize) -> Self {
        self.config.max_context_chars = chars;
        self
    }

    /// Set the system prompt.
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = prompt.into();
        self
    }

    /// Set the chat sampling temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = temperature;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// An overlap larger than the window is accepted; the chunker clamps it.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `chunk_size == 0`
    /// - `default_top_k == 0`
    /// - `temperature` is outside `0.0..=2.0`
    /// - `collection_name` is blank
    pub fn build(self) -> Result<RagConfig> {
        if self.config.chunk_size == 0 {
            return Err(RagError::ConfigError("chunk_size must be greater than zero".to_string()));
        }
        if self.config.default_top_k == 0 {
            return Err(RagError::ConfigError(
                "default_top_k must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.config.temperature) {
            return Err(RagError::ConfigError(format!(
                "temperature ({}) must be between 0.0 and 2.0",
                self.config.temperature
            )));
        }
        if self.config.collection_name.trim().is_empty() {
            return Err(RagError::ConfigError("collection_name must not be empty".to_string()));
        }
        Ok(self.config)
    }
}
