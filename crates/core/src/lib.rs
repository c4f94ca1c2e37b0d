//! # Haru Core
//!
//! Domain types, traits, and error definitions for the Haru chat service.
//! This crate has no HTTP or framework dependencies: it defines the message
//! model, the `Provider` and `Tool` seams, and the error taxonomy that every
//! other crate builds on.

pub mod error;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use message::{ChatMessage, ChatRole, Message, Role, ToolInvocation};
pub use provider::{Provider, ProviderRequest, ProviderResponse, StreamChunk};
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult};
