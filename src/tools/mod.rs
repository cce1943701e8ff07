//! MCP tools: the invocation contract and the built-in tool set.
//!
//! A [`Tool`] declares a name, a description and a JSON input schema, and
//! turns an arguments object into a [`ToolCallResult`]. Tools never fail
//! across this boundary: every failure is an `isError` result with a
//! human-readable reason in its first text item.
//!
//! Tools delegate to capability modules ([`crate::modules`]) handed to them
//! at construction; they hold no global state.

pub mod actor;
pub mod hello_world;
pub mod registry;
pub mod schema;

pub use actor::{DeleteActorTool, DuplicateActorTool, GetActorsInLevelTool, SpawnActorTool};
pub use hello_world::HelloWorldTool;
pub use registry::ToolRegistry;

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::modules::ActorModule;

/// A named, independently invocable capability.
pub trait Tool: Send + Sync {
    /// Stable, unique `snake_case` identifier used by `tools/call`.
    fn name(&self) -> &str;

    /// Human-readable text shown to the calling agent.
    fn description(&self) -> &str;

    /// JSON Schema of the arguments object.
    fn input_schema(&self) -> Value;

    /// Runs the tool. Arguments have already been checked against
    /// [`Tool::input_schema`].
    fn execute(&self, arguments: &Map<String, Value>) -> ToolCallResult;
}

/// A tool definition for tools/list response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema for the tool's input parameters.
    pub input_schema: Value,
}

/// Content item in a tool call response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
}

/// Result of a tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    /// Content returned by the tool.
    pub content: Vec<ToolContent>,
    /// Whether the tool call resulted in an error.
    pub is_error: bool,
}

impl ToolCallResult {
    /// Creates a successful text result.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// Creates an error text result.
    ///
    /// An empty message is replaced so the failure always carries a reason.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        let mut text = message.into();
        if text.trim().is_empty() {
            text = "Tool failed without reporting a reason".to_string();
        }
        Self {
            content: vec![ToolContent::Text { text }],
            is_error: true,
        }
    }

    /// Text of the first content item, if any.
    #[must_use]
    pub fn first_text(&self) -> Option<&str> {
        self.content.first().map(|item| match item {
            ToolContent::Text { text } => text.as_str(),
        })
    }
}

/// Builds the registry of built-in tools over the given modules.
///
/// Registration order is the order `tools/list` reports.
#[must_use]
pub fn builtin_registry(actors: &Arc<dyn ActorModule>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    let tools: Vec<Arc<dyn Tool>> = vec![
        Arc::new(HelloWorldTool),
        Arc::new(SpawnActorTool::new(Arc::clone(actors))),
        Arc::new(DeleteActorTool::new(Arc::clone(actors))),
        Arc::new(DuplicateActorTool::new(Arc::clone(actors))),
        Arc::new(GetActorsInLevelTool::new(Arc::clone(actors))),
    ];
    for tool in tools {
        // Failures are logged by the registry; the first registration wins.
        let _ = registry.register(tool);
    }
    registry
}
