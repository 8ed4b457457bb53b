use std::collections::HashMap;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::errors::{AgentError, AgentResult};
use crate::models::tool::Tool;

/// A callable tool implementation. Handlers return a display string and may
/// perform arbitrary I/O behind this signature.
#[async_trait]
pub trait ToolFunction: Send + Sync {
    async fn call(&self, arguments: Value) -> AgentResult<String>;
}

/// Name-keyed registry of tools the model may invoke.
///
/// `tools()` preserves registration order so every completion request carries
/// the same tool list.
pub struct ToolRegistry {
    tools: Vec<Tool>,
    handlers: HashMap<String, (Value, Box<dyn ToolFunction>)>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            handlers: HashMap::new(),
        }
    }

    /// Register a tool and its handler, keyed by the tool name.
    pub fn register(&mut self, tool: Tool, handler: Box<dyn ToolFunction>) -> AgentResult<()> {
        if !is_valid_tool_name(&tool.name) {
            return Err(AgentError::Internal(format!(
                "tool name '{}' must match [a-zA-Z0-9_-]+",
                tool.name
            )));
        }
        if !tool.input_schema.is_object() {
            return Err(AgentError::Internal(format!(
                "tool '{}' must declare an object schema",
                tool.name
            )));
        }
        if self.handlers.contains_key(&tool.name) {
            return Err(AgentError::DuplicateTool(tool.name));
        }

        self.handlers
            .insert(tool.name.clone(), (tool.input_schema.clone(), handler));
        self.tools.push(tool);
        Ok(())
    }

    /// The registered tools, in registration order, for completion requests.
    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    /// Look up a tool by name, validate the arguments against its declared
    /// schema, and invoke the handler.
    pub async fn dispatch(&self, name: &str, arguments: Value) -> AgentResult<String> {
        let (schema, handler) = self
            .handlers
            .get(name)
            .ok_or_else(|| AgentError::ToolNotFound(name.to_string()))?;

        validate_arguments(schema, &arguments)?;

        debug!(tool = name, "dispatching tool call");
        handler.call(arguments).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn is_valid_tool_name(name: &str) -> bool {
    let re = Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap();
    re.is_match(name)
}

/// Check decoded arguments against the tool's schema: required keys present,
/// primitive types match, and no properties beyond those declared.
fn validate_arguments(schema: &Value, arguments: &Value) -> AgentResult<()> {
    let args = arguments.as_object().ok_or_else(|| {
        AgentError::InvalidParameters("arguments must be a JSON object".to_string())
    })?;

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for key in required.iter().filter_map(Value::as_str) {
            if !args.contains_key(key) {
                return Err(AgentError::InvalidParameters(format!(
                    "missing required parameter '{}'",
                    key
                )));
            }
        }
    }

    let properties = schema.get("properties").and_then(Value::as_object);
    for (key, value) in args {
        let property = match properties.and_then(|p| p.get(key)) {
            Some(property) => property,
            None => {
                return Err(AgentError::InvalidParameters(format!(
                    "unexpected parameter '{}'",
                    key
                )))
            }
        };
        if let Some(expected) = property.get("type").and_then(Value::as_str) {
            if !matches_type(value, expected) {
                return Err(AgentError::InvalidParameters(format!(
                    "parameter '{}' must be of type {}",
                    key, expected
                )));
            }
        }
    }

    Ok(())
}

fn matches_type(value: &Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        _ => true,
    }
}
