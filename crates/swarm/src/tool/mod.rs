//! Tools an agent can offer to its model
//!
//! A tool is either a [`FunctionTool`], a callable with declared parameters
//! whose schema is derived once when the agent is built, or a ready-made
//! [`ToolSchema`] that is offered to the model as-is and never executed.
mod doc;
mod function;
mod schema;

pub use function::{FunctionTool, ToolHandler};
pub use schema::{derive_schema, Parameter, ParameterType, SchemaError, ToolSchema};

use serde_json::Value;

/// The two shapes a tool can take when registered on an agent
#[derive(Debug, Clone)]
pub enum AgentTool {
    Function(FunctionTool),
    Schema(ToolSchema),
}

impl AgentTool {
    pub fn name(&self) -> &str {
        match self {
            AgentTool::Function(function) => &function.name,
            AgentTool::Schema(schema) => &schema.name,
        }
    }

    /// Accept a tool definition in the chat completions shape
    /// (`{"type": "function", "function": {...}}`) or the bare
    /// `{name, description, parameters}` object.
    pub fn from_value(value: Value) -> Result<Self, SchemaError> {
        let inner = match value.get("function") {
            Some(function) if function.is_object() => function.clone(),
            Some(_) => return Err(SchemaError::InvalidToolFormat(value.to_string())),
            None => value.clone(),
        };

        let name = inner.get("name").and_then(Value::as_str);
        let parameters = inner.get("parameters").filter(|p| p.is_object());
        match (name, parameters) {
            (Some(name), Some(parameters)) if !name.is_empty() => {
                let description = inner
                    .get("description")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                Ok(AgentTool::Schema(ToolSchema::new(
                    name,
                    description,
                    parameters.clone(),
                )))
            }
            _ => Err(SchemaError::InvalidToolFormat(value.to_string())),
        }
    }

    /// The schema offered to the model for this tool
    pub(crate) fn schema(&self) -> Result<ToolSchema, SchemaError> {
        match self {
            AgentTool::Function(function) => derive_schema(function),
            AgentTool::Schema(schema) => Ok(schema.clone()),
        }
    }
}

impl From<FunctionTool> for AgentTool {
    fn from(function: FunctionTool) -> Self {
        AgentTool::Function(function)
    }
}

impl From<ToolSchema> for AgentTool {
    fn from(schema: ToolSchema) -> Self {
        AgentTool::Schema(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_openai_shape() {
        let tool = AgentTool::from_value(json!({
            "type": "function",
            "function": {
                "name": "lookup_stock",
                "description": "Check stock levels",
                "parameters": {
                    "type": "object",
                    "properties": {"sku": {"type": "string", "description": "Item"}},
                    "required": ["sku"]
                }
            }
        }))
        .unwrap();

        match tool {
            AgentTool::Schema(schema) => {
                assert_eq!(schema.name, "lookup_stock");
                assert_eq!(schema.required(), vec!["sku"]);
            }
            AgentTool::Function(_) => panic!("Expected a schema tool"),
        }
    }

    #[test]
    fn test_from_value_bare_shape() {
        let tool = AgentTool::from_value(json!({
            "name": "ping",
            "parameters": {"type": "object", "properties": {}}
        }))
        .unwrap();
        assert_eq!(tool.name(), "ping");
    }

    #[test]
    fn test_from_value_invalid() {
        for value in [
            json!("just a string"),
            json!({"function": "nope"}),
            json!({"name": "missing_parameters"}),
            json!({"function": {"parameters": {}}}),
        ] {
            let err = AgentTool::from_value(value).unwrap_err();
            assert!(matches!(err, SchemaError::InvalidToolFormat(_)));
            assert!(err.to_string().starts_with("Invalid tool format"));
        }
    }
}
