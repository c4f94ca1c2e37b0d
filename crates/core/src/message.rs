//! Message domain types.
//!
//! Two shapes live here:
//! - [`ChatMessage`] is the wire shape the browser sends: the whole prior
//!   history, with completed tool invocations attached to assistant turns.
//! - [`Message`] is the provider-facing shape the orchestrator feeds to the LLM.
//!
//! [`to_provider_messages`] converts the former into the latter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role of a message sender in a provider conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The AI assistant
    Assistant,
    /// System instructions (persona, rules)
    System,
    /// Tool execution result
    Tool,
}

/// A single message in a provider conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,

    /// Tool calls requested by the assistant (if any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<MessageToolCall>,

    /// If this is a tool result, which tool call it responds to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn new(role: Role, content: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content,
            tool_calls: Vec::new(),
            tool_call_id: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content.into())
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content.into())
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content.into())
    }

    /// Create a tool result message.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        let mut msg = Self::new(Role::Tool, content.into());
        msg.tool_call_id = Some(tool_call_id.into());
        msg
    }

    /// Override the creation timestamp.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// A tool call embedded in an assistant message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageToolCall {
    /// Unique ID for this tool call
    pub id: String,

    /// Name of the tool to invoke
    pub name: String,

    /// Arguments as JSON string
    pub arguments: String,
}

// --- Wire types ---

/// Role of a message in the inbound chat history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    Tool,
    System,
}

/// A tool invocation record attached to an assistant turn in the history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInvocation {
    pub tool_call_id: String,
    pub tool_name: String,
    #[serde(default)]
    pub args: serde_json::Value,
    /// Present once the tool has produced a result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Set when the tool call failed instead of producing a result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolInvocation {
    /// Whether the invocation finished, with either a result or an error.
    pub fn is_complete(&self) -> bool {
        self.result.is_some() || self.error.is_some()
    }

    fn outcome_text(&self) -> String {
        match (&self.result, &self.error) {
            (Some(result), _) => result.to_string(),
            (None, Some(error)) => format!("Error: {error}"),
            (None, None) => String::new(),
        }
    }
}

/// One message of the conversation history as sent by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub role: ChatRole,

    #[serde(default)]
    pub content: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_invocations: Vec<ToolInvocation>,

    /// For `tool` messages: the call this result answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ChatMessage {
    /// Convenience constructor for a plain user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: None,
            role: ChatRole::User,
            content: content.into(),
            tool_invocations: Vec::new(),
            tool_call_id: None,
            created_at: None,
        }
    }

    /// Convenience constructor for a plain assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            ..Self::user(content)
        }
    }
}

/// Convert the inbound history into provider messages.
///
/// System turns are dropped (the orchestrator owns the system prompt).
/// Assistant turns with completed tool invocations expand into an assistant
/// message carrying the calls followed by one tool message per result.
/// Unfinished invocations and orphan tool messages are dropped.
pub fn to_provider_messages(history: &[ChatMessage]) -> Vec<Message> {
    let mut out = Vec::with_capacity(history.len());

    for chat in history {
        let stamp = |m: Message| match chat.created_at {
            Some(ts) => m.with_timestamp(ts),
            None => m,
        };

        match chat.role {
            ChatRole::System => {}
            ChatRole::User => out.push(stamp(Message::user(&chat.content))),
            ChatRole::Tool => {
                if let Some(call_id) = &chat.tool_call_id {
                    out.push(stamp(Message::tool_result(call_id, &chat.content)));
                }
            }
            ChatRole::Assistant => {
                let completed: Vec<&ToolInvocation> = chat
                    .tool_invocations
                    .iter()
                    .filter(|inv| inv.is_complete())
                    .collect();

                if completed.is_empty() {
                    if !chat.content.is_empty() {
                        out.push(stamp(Message::assistant(&chat.content)));
                    }
                    continue;
                }

                let mut msg = Message::assistant(&chat.content);
                msg.tool_calls = completed
                    .iter()
                    .map(|inv| MessageToolCall {
                        id: inv.tool_call_id.clone(),
                        name: inv.tool_name.clone(),
                        arguments: inv.args.to_string(),
                    })
                    .collect();
                out.push(stamp(msg));

                for inv in completed {
                    out.push(stamp(Message::tool_result(
                        &inv.tool_call_id,
                        inv.outcome_text(),
                    )));
                }
            }
        }
    }

    out
}
