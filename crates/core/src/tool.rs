//! Tools the model can call: the weather lookup, the fortune generator and
//! the date/time tool all implement [`Tool`].

use crate::error::ToolError;
use crate::provider::ToolDefinition;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;

/// One tool call, with its arguments already parsed.
#[derive(Debug, Clone)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// What a tool call produced.
///
/// `output` is what the model reads. `data` is the same payload as JSON,
/// forwarded to the browser to draw weather and fortune cards.
#[derive(Debug, Clone)]
pub struct ToolResult {
    pub call_id: String,
    pub success: bool,
    pub output: String,
    pub data: Option<serde_json::Value>,
}

impl ToolResult {
    /// Successful result carrying a serializable payload.
    pub fn json<T: Serialize>(payload: &T) -> Result<Self, ToolError> {
        let data = serde_json::to_value(payload)
            .map_err(|e| ToolError::InvalidArguments(format!("unserializable result: {e}")))?;
        Ok(Self {
            call_id: String::new(),
            success: true,
            output: data.to_string(),
            data: Some(data),
        })
    }

    /// Failed result; the model sees `Error: <message>`.
    pub fn failure(call_id: impl Into<String>, error: &ToolError) -> Self {
        Self {
            call_id: call_id.into(),
            success: false,
            output: format!("Error: {error}"),
            data: None,
        }
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    /// Name the model calls the tool by, e.g. `getWeather`.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema for the arguments object.
    fn parameters_schema(&self) -> serde_json::Value;

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError>;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// The tools offered to the model, keyed by name.
///
/// Name order keeps the definitions identical from request to request.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool, replacing any tool of the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    /// Run a call. Never fails: unknown tools and tool errors come back as
    /// a failed [`ToolResult`] so the model can read what went wrong.
    pub async fn execute(&self, call: &ToolCall) -> ToolResult {
        let outcome = match self.tools.get(&call.name) {
            Some(tool) => tool.execute(call.arguments.clone()).await,
            None => Err(ToolError::NotFound(call.name.clone())),
        };

        match outcome {
            Ok(mut result) => {
                result.call_id = call.id.clone();
                result
            }
            Err(e) => ToolResult::failure(&call.id, &e),
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
