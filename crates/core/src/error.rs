//! Errors shared by the Haru crates.
//!
//! Model failures and tool failures are kept apart: a tool failure is fed
//! back to the model as text and the turn continues, while a model failure
//! ends the turn.

use thiserror::Error;

/// Anything that can end a chat turn.
#[derive(Debug, Error)]
pub enum Error {
    #[error("language model call failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("tool call failed: {0}")]
    Tool(#[from] ToolError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failures talking to the language model.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// Non-success status other than 401/403/429.
    #[error("model API returned {status_code}: {message}")]
    ApiError { status_code: u16, message: String },

    #[error("rate limited by model API, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("model API rejected the credential: {0}")]
    AuthenticationFailed(String),

    /// 200 response whose body could not be understood.
    #[error("unexpected model API response: {0}")]
    InvalidResponse(String),

    #[error("response stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("model provider not configured: {0}")]
    NotConfigured(String),

    #[error("could not reach model API: {0}")]
    Network(String),
}

/// Failures running a tool. The orchestrator reports these to the model as
/// `Error: <message>`.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    NotFound(String),

    #[error("{tool_name} failed: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
}
