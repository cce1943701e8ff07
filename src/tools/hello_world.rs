//! `hello_world`: connectivity check.

use serde_json::{json, Map, Value};

use super::{Tool, ToolCallResult};

/// Returns a greeting; used by clients to verify the connection.
#[derive(Debug, Default, Clone, Copy)]
pub struct HelloWorldTool;

impl Tool for HelloWorldTool {
    fn name(&self) -> &str {
        "hello_world"
    }

    fn description(&self) -> &str {
        "Returns a greeting from the Unreal Editor MCP server. \
         Use this to verify the MCP connection is working."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": {
                    "type": "string",
                    "description": "Name to greet. Optional, defaults to \"World\"."
                }
            }
        })
    }

    fn execute(&self, arguments: &Map<String, Value>) -> ToolCallResult {
        let name = arguments
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("World");

        ToolCallResult::text(format!(
            "Hello, {name}! Greetings from the Unreal Editor MCP server!"
        ))
    }
}
