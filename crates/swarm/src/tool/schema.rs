use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::function::FunctionTool;

/// Everything that can go wrong while turning a tool definition into a schema.
/// These are raised while agents are built, never during a run.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Function {0} is missing a documentation comment")]
    MissingDocBlock(String),

    #[error("Function {0} is missing @description in its documentation comment")]
    MissingDescription(String),

    #[error("Invalid @param format in function {function}: {line}")]
    InvalidParamFormat { function: String, line: String },

    #[error("Invalid type '{kind}' for parameter {param} in function {function}. Allowed types are: string, number, boolean, array, object")]
    InvalidType {
        function: String,
        param: String,
        kind: String,
    },

    #[error("Parameter {param} is documented but not present in the function {function} signature")]
    DocumentedButUndeclared { function: String, param: String },

    #[error("Parameter {param} in function {function} is not documented")]
    Undocumented { function: String, param: String },

    #[error("Invalid enum format for parameter {param} in function {function}")]
    InvalidEnum { function: String, param: String },

    #[error("Parameter {param} is declared more than once in function {function}")]
    DuplicateParameter { function: String, param: String },

    #[error("Function has an empty name")]
    MissingName,

    #[error("Duplicate tool name: {0}")]
    DuplicateTool(String),

    #[error("Invalid tool format: {0}")]
    InvalidToolFormat(String),
}

/// The JSON types a tool parameter may take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    String,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParameterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterType::String => "string",
            ParameterType::Number => "number",
            ParameterType::Boolean => "boolean",
            ParameterType::Array => "array",
            ParameterType::Object => "object",
        }
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParameterType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "string" => Ok(ParameterType::String),
            "number" => Ok(ParameterType::Number),
            "boolean" => Ok(ParameterType::Boolean),
            "array" => Ok(ParameterType::Array),
            "object" => Ok(ParameterType::Object),
            _ => Err(s.to_string()),
        }
    }
}

/// Declarative description of one tool parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub kind: ParameterType,
    pub description: String,
    /// Allowed literal values, in order
    pub enum_values: Option<Vec<Value>>,
    /// A parameter is required iff it has no default
    pub default: Option<Value>,
}

impl Parameter {
    pub fn new<N, D>(name: N, kind: ParameterType, description: D) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
            enum_values: None,
            default: None,
        }
    }

    pub fn string<N: Into<String>, D: Into<String>>(name: N, description: D) -> Self {
        Self::new(name, ParameterType::String, description)
    }

    pub fn number<N: Into<String>, D: Into<String>>(name: N, description: D) -> Self {
        Self::new(name, ParameterType::Number, description)
    }

    pub fn boolean<N: Into<String>, D: Into<String>>(name: N, description: D) -> Self {
        Self::new(name, ParameterType::Boolean, description)
    }

    pub fn with_enum<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.enum_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_default<V: Into<Value>>(mut self, default: V) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// A tool as presented to the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolSchema {
    /// The name of the tool
    pub name: String,
    /// A description of what the tool does
    pub description: String,
    /// JSON schema object describing the arguments
    pub parameters: Value,
}

impl ToolSchema {
    pub fn new<N, D>(name: N, description: D, parameters: Value) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        ToolSchema {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// The schema an agent exposes for itself: one required string `input`
    pub fn agent_input<N, D>(name: N, description: D) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        Self::new(
            name,
            description,
            json!({
                "type": "object",
                "properties": {
                    "input": {
                        "type": "string",
                        "description": "Input for the agent"
                    }
                },
                "required": ["input"]
            }),
        )
    }

    /// Names of the required parameters, in schema order
    pub fn required(&self) -> Vec<&str> {
        self.parameters
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.parameters.get("properties")?.get(name)
    }
}

/// Derive the schema offered to the model from a function tool's declared
/// parameters.
pub fn derive_schema(function: &FunctionTool) -> Result<ToolSchema, SchemaError> {
    if function.name.trim().is_empty() {
        return Err(SchemaError::MissingName);
    }
    if function.description.trim().is_empty() {
        return Err(SchemaError::MissingDescription(function.name.clone()));
    }

    let mut seen = HashSet::new();
    let mut properties = Map::new();
    let mut required = Vec::new();

    for param in &function.parameters {
        if param.name.trim().is_empty() {
            return Err(SchemaError::InvalidParamFormat {
                function: function.name.clone(),
                line: format!("parameter of type {} has no name", param.kind),
            });
        }
        if !seen.insert(param.name.as_str()) {
            return Err(SchemaError::DuplicateParameter {
                function: function.name.clone(),
                param: param.name.clone(),
            });
        }

        let mut property = json!({
            "type": param.kind,
            "description": param.description,
        });
        if let Some(values) = &param.enum_values {
            if values.is_empty() {
                return Err(SchemaError::InvalidEnum {
                    function: function.name.clone(),
                    param: param.name.clone(),
                });
            }
            property["enum"] = json!(values);
        }
        properties.insert(param.name.clone(), property);

        if param.is_required() {
            required.push(param.name.clone());
        }
    }

    Ok(ToolSchema::new(
        &function.name,
        &function.description,
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        }),
    ))
}
