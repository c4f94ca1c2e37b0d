//! The seam between the orchestrator and a language-model backend.
//!
//! Whether a call streams is decided by the method used, not by the
//! request: [`Provider::complete`] returns one message, [`Provider::stream`]
//! a channel of [`StreamChunk`]s whose last item has `done` set.

use crate::error::ProviderError;
use crate::message::{Message, MessageToolCall};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;
use tokio::sync::mpsc;

/// One model call: the full conversation plus the tools on offer.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub model: String,
    /// System prompt first, then the history, then this turn's tool traffic.
    pub messages: Vec<Message>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub tools: Vec<ToolDefinition>,
}

/// A tool as advertised to the model. Also served by `GET /api/tools`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema of the arguments object
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub message: Message,
    pub usage: Option<Usage>,
    /// Model that answered, as reported by the backend
    pub model: String,
}

/// Token counts. Summed across rounds for the `done` event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl AddAssign for Usage {
    fn add_assign(&mut self, other: Self) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}

/// One item of a streamed response.
///
/// Text arrives in any number of chunks. Tool calls are only complete once
/// the stream ends, so they ride on the final chunk.
#[derive(Debug, Clone, Default)]
pub struct StreamChunk {
    pub content: Option<String>,
    pub tool_calls: Vec<MessageToolCall>,
    pub done: bool,
    pub usage: Option<Usage>,
}

impl StreamChunk {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// The closing chunk.
    pub fn last(tool_calls: Vec<MessageToolCall>, usage: Option<Usage>) -> Self {
        Self {
            content: None,
            tool_calls,
            done: true,
            usage,
        }
    }
}

pub type ChunkReceiver = mpsc::Receiver<Result<StreamChunk, ProviderError>>;

#[async_trait]
pub trait Provider: Send + Sync {
    /// Short backend name for logs, e.g. `groq`.
    fn name(&self) -> &str;

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError>;

    /// Stream a response. `Err` means nothing was produced at all; failures
    /// after that arrive through the channel.
    ///
    /// Defaults to a single closing chunk built from [`Provider::complete`].
    async fn stream(&self, request: ProviderRequest) -> Result<ChunkReceiver, ProviderError> {
        let response = self.complete(request).await?;
        let message = response.message;

        let (tx, rx) = mpsc::channel(2);
        if !message.content.is_empty() {
            let _ = tx.send(Ok(StreamChunk::text(message.content))).await;
        }
        let _ = tx
            .send(Ok(StreamChunk::last(message.tool_calls, response.usage)))
            .await;
        Ok(rx)
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        Ok(true)
    }
}
