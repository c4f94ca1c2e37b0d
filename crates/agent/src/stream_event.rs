//! Orchestrator streaming events.
//!
//! `AgentStreamEvent` wraps provider-level stream chunks into higher-level
//! events that the gateway forwards to clients, either as plain text or
//! over SSE.

use haru_core::provider::Usage;
use serde::{Deserialize, Serialize};

/// Events emitted while a chat turn runs.
///
/// Serialized with a `type` tag; `event_type` gives the SSE event name.
/// `error` is only sent once output has started.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentStreamEvent {
    /// Partial text token from the model.
    Chunk { content: String },

    /// The model is calling a tool.
    ToolCall {
        id: String,
        name: String,
        input: serde_json::Value,
    },

    /// Tool execution completed.
    ToolResult {
        id: String,
        name: String,
        /// Text handed back to the model
        output: String,
        success: bool,
        /// Structured payload for rendering (weather / fortune cards)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<serde_json::Value>,
    },

    /// The turn is complete.
    Done {
        request_id: String,
        usage: Option<Usage>,
        /// Model calls made
        rounds: u32,
        tool_calls_made: usize,
    },

    /// An error occurred mid-stream.
    Error { message: String },
}

impl AgentStreamEvent {
    /// SSE event name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Chunk { .. } => "chunk",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolResult { .. } => "tool_result",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
        }
    }
}
