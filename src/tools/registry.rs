//! Tool registry: name → tool, in registration order.
//!
//! The registry is filled once at start-up and shared read-only afterwards.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use super::{Tool, ToolDefinition};
use crate::error::RegistryError;

/// A registered tool with the descriptor captured at registration.
#[derive(Clone)]
pub struct RegisteredTool {
    /// Immutable metadata reported by `tools/list`.
    pub definition: ToolDefinition,
    /// The implementation.
    pub tool: Arc<dyn Tool>,
}

impl std::fmt::Debug for RegisteredTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredTool")
            .field("name", &self.definition.name)
            .finish_non_exhaustive()
    }
}

/// Central catalogue of invocable tools.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: IndexMap<String, RegisteredTool>,
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool.
    ///
    /// The first registration of a name wins; later duplicates are rejected
    /// and logged.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is taken or not `snake_case`, the
    /// description is empty, or the schema is not an object schema.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), RegistryError> {
        let definition = ToolDefinition {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            input_schema: tool.input_schema(),
        };

        if let Err(e) = Self::check_definition(&definition) {
            tracing::error!(error = %e, "Rejected tool registration");
            return Err(e);
        }
        if self.tools.contains_key(&definition.name) {
            let e = RegistryError::DuplicateTool {
                name: definition.name,
            };
            tracing::error!(error = %e, "Rejected tool registration");
            return Err(e);
        }

        tracing::debug!(tool = %definition.name, "Registered tool");
        self.tools
            .insert(definition.name.clone(), RegisteredTool { definition, tool });
        Ok(())
    }

    fn check_definition(definition: &ToolDefinition) -> Result<(), RegistryError> {
        let name = &definition.name;
        let snake_case = !name.is_empty()
            && name.starts_with(|c: char| c.is_ascii_lowercase())
            && name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if !snake_case {
            return Err(RegistryError::InvalidName { name: name.clone() });
        }

        if definition.description.trim().is_empty() {
            return Err(RegistryError::MissingDescription { name: name.clone() });
        }

        let schema = &definition.input_schema;
        if schema.get("type").and_then(Value::as_str) != Some("object") {
            return Err(RegistryError::InvalidSchema {
                name: name.clone(),
                reason: "schema type must be \"object\"".to_string(),
            });
        }
        if schema.get("properties").is_some_and(|p| !p.is_object()) {
            return Err(RegistryError::InvalidSchema {
                name: name.clone(),
                reason: "\"properties\" must be an object".to_string(),
            });
        }
        if schema.get("required").is_some_and(|r| {
            !r.as_array()
                .is_some_and(|items| items.iter().all(Value::is_string))
        }) {
            return Err(RegistryError::InvalidSchema {
                name: name.clone(),
                reason: "\"required\" must be an array of strings".to_string(),
            });
        }
        Ok(())
    }

    /// Looks up a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.tools.get(name)
    }

    /// Whether a tool with this name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Descriptors of all tools, in registration order.
    #[must_use]
    pub fn list(&self) -> Vec<ToolDefinition> {
        self.tools
            .values()
            .map(|registered| registered.definition.clone())
            .collect()
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether no tools are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
