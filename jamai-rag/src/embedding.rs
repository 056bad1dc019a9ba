//! Embedding provider trait and the retrying embedding client.
//!
//! [`RetryingEmbedder`] turns raw JSON replies from an
//! [`EmbeddingTransport`] into vectors. It tolerates the response shapes of
//! different embedding servers and retries well-formed replies that carry
//! no vector, which some backends return transiently.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::error::{RagError, Result};
use crate::retry::{Delay, RetryPolicy, TokioDelay};

/// Text used to discover the dimensionality of an embedding model.
pub const DIMENSION_PROBE: &str = "dimension probe";

/// A provider that generates vector embeddings from text input.
///
/// The default [`embed_batch`](EmbeddingProvider::embed_batch)
/// implementation calls [`embed`](EmbeddingProvider::embed) sequentially and
/// stops at the first failure.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embedding vectors for a batch of text inputs, in order.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }
}

/// Request body sent to the embedding endpoint.
///
/// The text is carried under both `prompt` and `input` so servers following
/// either convention accept it.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EmbeddingRequest {
    /// Embedding model name.
    pub model: String,
    /// The text, under the Ollama field name.
    pub prompt: String,
    /// The text, under the OpenAI-compatible field name.
    pub input: String,
}

impl EmbeddingRequest {
    /// Build a request for `text` against `model`.
    pub fn new(model: &str, text: &str) -> Self {
        Self { model: model.to_string(), prompt: text.to_string(), input: text.to_string() }
    }
}

/// Delivers one [`EmbeddingRequest`] and returns the decoded JSON body.
///
/// Implementations fail with [`RagError::EmbeddingError`] when the endpoint
/// is unreachable or answers with a non-success status. Those failures are
/// never retried.
#[async_trait]
pub trait EmbeddingTransport: Send + Sync {
    /// Name used in errors and logs.
    fn name(&self) -> &str;

    /// Send the request and return the response body.
    async fn send(&self, request: &EmbeddingRequest) -> Result<Value>;
}

/// What a single response body contained.
#[derive(Debug, PartialEq)]
enum Reply {
    Vector(Vec<f32>),
    Error(String),
    Empty,
}

fn non_empty_vector(value: Option<&Value>) -> Option<Vec<f32>> {
    value
        .and_then(|v| Vec::<f32>::deserialize(v).ok())
        .filter(|vector| !vector.is_empty())
}

fn parse_reply(body: &Value) -> Reply {
    if let Some(vector) = non_empty_vector(body.get("embedding")) {
        return Reply::Vector(vector);
    }
    let nested =
        body.get("data").and_then(|data| data.get(0)).and_then(|first| first.get("embedding"));
    if let Some(vector) = non_empty_vector(nested) {
        return Reply::Vector(vector);
    }
    match body.get("error") {
        Some(Value::String(message)) => Reply::Error(message.clone()),
        Some(other) => Reply::Error(other.to_string()),
        None => Reply::Empty,
    }
}

/// An [`EmbeddingProvider`] that retries empty replies with backoff.
///
/// HTTP failures and explicit `error` payloads fail immediately. A reply
/// without a usable vector is retried according to the [`RetryPolicy`]
/// (five attempts, 1s doubling to 8s by default).
///
/// # Example
///
/// ```rust,ignore
/// use jamai_rag::{RetryingEmbedder, ollama::OllamaEmbeddingTransport};
///
/// let transport = OllamaEmbeddingTransport::new("http://localhost:11434", timeout)?;
/// let embedder = RetryingEmbedder::new(Arc::new(transport), "mxbai-embed-large");
/// let vector = embedder.embed("hello world").await?;
/// ```
pub struct RetryingEmbedder {
    transport: Arc<dyn EmbeddingTransport>,
    model: String,
    policy: RetryPolicy,
    delay: Arc<dyn Delay>,
}

impl RetryingEmbedder {
    /// Create an embedder with the default retry policy and real sleeping.
    pub fn new(transport: Arc<dyn EmbeddingTransport>, model: impl Into<String>) -> Self {
        Self {
            transport,
            model: model.into(),
            policy: RetryPolicy::default(),
            delay: Arc::new(TokioDelay),
        }
    }

    /// Replace the retry policy.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the delay used between attempts.
    pub fn with_delay(mut self, delay: Arc<dyn Delay>) -> Self {
        self.delay = delay;
        self
    }

    fn failure(&self, message: String) -> RagError {
        RagError::EmbeddingError { provider: self.transport.name().to_string(), message }
    }
}

#[async_trait]
impl EmbeddingProvider for RetryingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest::new(&self.model, text);
        let max_attempts = self.policy.max_attempts;

        for attempt in 1..=max_attempts {
            let body = self.transport.send(&request).await?;
            match parse_reply(&body) {
                Reply::Vector(vector) => {
                    debug!(
                        provider = self.transport.name(),
                        attempt,
                        dimensions = vector.len(),
                        "embedded text"
                    );
                    return Ok(vector);
                }
                Reply::Error(message) => {
                    error!(
                        provider = self.transport.name(),
                        error = %message,
                        "embedding endpoint returned an error"
                    );
                    return Err(self.failure(format!("endpoint returned error: {message}")));
                }
                Reply::Empty => {
                    warn!(
                        provider = self.transport.name(),
                        attempt,
                        max_attempts,
                        "empty embedding response"
                    );
                    if attempt < max_attempts {
                        self.delay.sleep(self.policy.delay_for_attempt(attempt)).await;
                    }
                }
            }
        }

        error!(
            provider = self.transport.name(),
            max_attempts,
            "no embedding returned after retries"
        );
        Err(self.failure(format!("response missing \"embedding\" after {max_attempts} attempts")))
    }
}
