//! The chat orchestrator: the heart of Haru.
//!
//! Each request follows a bounded **Model → Tools → Model** cycle:
//!
//! 1. **Receive** the conversation history from the gateway or CLI
//! 2. **Build context** (Korean persona system prompt + history)
//! 3. **Stream from the model**, forwarding text as it arrives
//! 4. **If tool calls**: execute them, append results, loop back to step 3
//! 5. **Otherwise** finish the turn
//!
//! The loop stops when the model answers without tool calls or the round
//! cap (5 by default) is reached.

pub mod orchestrator;
pub mod prompt;
pub mod stream_event;

pub use orchestrator::ChatOrchestrator;
pub use prompt::SYSTEM_PROMPT;
pub use stream_event::AgentStreamEvent;
