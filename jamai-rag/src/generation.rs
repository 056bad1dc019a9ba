//! Answer generation over an assembled context.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::context::ContextAssembler;
use crate::document::{RetrievedChunk, SourceRef};
use crate::error::Result;

/// Answer substituted for an empty generation.
pub const FALLBACK_ANSWER: &str = "I do not have enough information to answer that yet.";

/// Role of a message in a chat completion request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// The system instruction.
    System,
    /// A user turn.
    User,
    /// An assistant turn.
    Assistant,
}

/// A single message sent to the chat model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    /// Who authored the message.
    pub role: ChatRole,
    /// The message text.
    pub content: String,
}

impl ChatMessage {
    /// A system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into() }
    }

    /// A user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }

    /// An assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into() }
    }
}

/// A prior conversation turn as received from a client.
///
/// Roles are free-form here; only `user` and `assistant` turns with content
/// are forwarded to the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationTurn {
    /// The declared role.
    pub role: String,
    /// The turn text.
    pub content: String,
}

impl ConversationTurn {
    /// Create a turn.
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self { role: role.into(), content: content.into() }
    }

    fn to_message(&self) -> Option<ChatMessage> {
        if self.content.is_empty() {
            return None;
        }
        match self.role.as_str() {
            "user" => Some(ChatMessage::user(self.content.clone())),
            "assistant" => Some(ChatMessage::assistant(self.content.clone())),
            _ => None,
        }
    }
}

/// A complete, non-streaming chat completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// The ordered messages.
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature.
    pub temperature: f32,
}

/// A chat-completion backend.
///
/// One call produces one complete reply. Failures surface as
/// [`RagError::GenerationError`](crate::RagError::GenerationError) and are
/// not retried.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Name of the model, for logs.
    fn name(&self) -> &str;

    /// Produce the assistant reply for `request`.
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

/// A generated answer with the citations of the context it was based on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    /// The trimmed model reply. May be empty.
    pub text: String,
    /// One entry per chunk placed in the context.
    pub sources: Vec<SourceRef>,
}

/// Builds the prompt for a question and asks the [`ChatModel`] once.
pub struct AnswerGenerator {
    model: Arc<dyn ChatModel>,
    assembler: ContextAssembler,
    system_prompt: String,
    temperature: f32,
}

impl AnswerGenerator {
    /// Create a generator.
    pub fn new(
        model: Arc<dyn ChatModel>,
        assembler: ContextAssembler,
        system_prompt: impl Into<String>,
        temperature: f32,
    ) -> Self {
        Self { model, assembler, system_prompt: system_prompt.into(), temperature }
    }

    /// Answer `query` from `retrieved`, continuing `history` when given.
    ///
    /// # Errors
    ///
    /// Propagates the chat model's error unchanged.
    pub async fn answer(
        &self,
        query: &str,
        retrieved: &[RetrievedChunk],
        history: Option<&[ConversationTurn]>,
    ) -> Result<Answer> {
        let context = self.assembler.assemble(retrieved);
        let request = CompletionRequest {
            messages: self.build_messages(query, &context.text, history.unwrap_or_default()),
            temperature: self.temperature,
        };
        debug!(model = self.model.name(), messages = request.messages.len(), "generating answer");

        let reply = self.model.complete(&request).await?;
        let text = reply.trim().to_string();
        info!(
            model = self.model.name(),
            answer_len = text.len(),
            sources = context.sources.len(),
            "answer generated"
        );

        Ok(Answer { text, sources: context.sources })
    }

    fn build_messages(
        &self,
        query: &str,
        context: &str,
        history: &[ConversationTurn],
    ) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(self.system_prompt.clone()));
        messages.extend(history.iter().filter_map(ConversationTurn::to_message));
        messages.push(ChatMessage::user(format!(
            "Answer the question using the provided context. \
             If the answer is not in the context, say you do not know.\n\n\
             Context:\n{context}\n\nQuestion: {query}\nAnswer:"
        )));
        messages
    }
}

/// Replace an empty answer with [`FALLBACK_ANSWER`].
pub fn answer_or_fallback(answer: String) -> String {
    if answer.is_empty() { FALLBACK_ANSWER.to_string() } else { answer }
}
