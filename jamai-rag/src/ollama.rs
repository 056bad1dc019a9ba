//! Ollama HTTP clients for embeddings and chat completions.
//!
//! This module is only available when the `ollama` feature is enabled.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};

use crate::embedding::{EmbeddingRequest, EmbeddingTransport};
use crate::error::{RagError, Result};
use crate::generation::{ChatMessage, ChatModel, CompletionRequest};

const PROVIDER: &str = "Ollama";

fn build_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder().timeout(timeout).build()
}

/// Extract a readable message from an error body, falling back to the raw text.
fn error_detail(body: String) -> String {
    match serde_json::from_str::<Value>(&body) {
        Ok(Value::Object(map)) => match map.get("error") {
            Some(Value::String(message)) => message.clone(),
            Some(other) => other.to_string(),
            None => body,
        },
        _ => body,
    }
}

/// An [`EmbeddingTransport`] posting to Ollama's `/api/embeddings` endpoint.
///
/// Wrap it in a [`RetryingEmbedder`](crate::RetryingEmbedder) to get an
/// [`EmbeddingProvider`](crate::EmbeddingProvider).
pub struct OllamaEmbeddingTransport {
    client: reqwest::Client,
    url: String,
}

impl OllamaEmbeddingTransport {
    /// Create a transport for the Ollama server at `host`.
    pub fn new(host: &str, timeout: Duration) -> Result<Self> {
        let client = build_client(timeout).map_err(|e| RagError::EmbeddingError {
            provider: PROVIDER.into(),
            message: format!("failed to build HTTP client: {e}"),
        })?;
        Ok(Self { client, url: format!("{}/api/embeddings", host.trim_end_matches('/')) })
    }
}

#[async_trait]
impl EmbeddingTransport for OllamaEmbeddingTransport {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn send(&self, request: &EmbeddingRequest) -> Result<Value> {
        debug!(
            provider = PROVIDER,
            model = %request.model,
            text_len = request.input.len(),
            "embedding text"
        );

        let response = self.client.post(&self.url).json(request).send().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "embedding request failed");
            RagError::EmbeddingError {
                provider: PROVIDER.into(),
                message: format!("request failed: {e}"),
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = error_detail(response.text().await.unwrap_or_default());
            error!(provider = PROVIDER, %status, "embedding API error");
            return Err(RagError::EmbeddingError {
                provider: PROVIDER.into(),
                message: format!("API returned {status}: {detail}"),
            });
        }

        response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse embedding response");
            RagError::EmbeddingError {
                provider: PROVIDER.into(),
                message: format!("failed to parse response: {e}"),
            }
        })
    }
}

// ── Ollama chat API request/response types ──

#[derive(Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Deserialize, Default)]
struct ChatReply {
    #[serde(default)]
    message: ChatReplyMessage,
}

#[derive(Deserialize, Default)]
struct ChatReplyMessage {
    #[serde(default)]
    content: String,
}

/// A [`ChatModel`] posting non-streaming requests to Ollama's `/api/chat`.
pub struct OllamaChatModel {
    client: reqwest::Client,
    url: String,
    model: String,
}

impl OllamaChatModel {
    /// Create a chat client for `model` on the Ollama server at `host`.
    pub fn new(host: &str, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = build_client(timeout).map_err(|e| RagError::GenerationError {
            provider: PROVIDER.into(),
            message: format!("failed to build HTTP client: {e}"),
        })?;
        Ok(Self {
            client,
            url: format!("{}/api/chat", host.trim_end_matches('/')),
            model: model.into(),
        })
    }
}

#[async_trait]
impl ChatModel for OllamaChatModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        debug!(
            provider = PROVIDER,
            model = %self.model,
            messages = request.messages.len(),
            "requesting chat completion"
        );

        let body = ChatBody {
            model: &self.model,
            messages: &request.messages,
            stream: false,
            options: ChatOptions { temperature: request.temperature },
        };

        let response = self.client.post(&self.url).json(&body).send().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "chat request failed");
            RagError::GenerationError {
                provider: PROVIDER.into(),
                message: format!("request failed: {e}"),
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = error_detail(response.text().await.unwrap_or_default());
            error!(provider = PROVIDER, %status, "chat API error");
            return Err(RagError::GenerationError {
                provider: PROVIDER.into(),
                message: format!("API returned {status}: {detail}"),
            });
        }

        let reply: ChatReply = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse chat response");
            RagError::GenerationError {
                provider: PROVIDER.into(),
                message: format!("failed to parse response: {e}"),
            }
        })?;

        Ok(reply.message.content)
    }
}
