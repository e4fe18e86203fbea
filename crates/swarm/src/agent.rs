use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

use crate::tool::{AgentTool, FunctionTool, SchemaError, ToolSchema};

pub const DEFAULT_MODEL: &str = "gpt-4o";

const FINALIZER_INSTRUCTIONS: &str = "You receive all messages from the agents (needs, positioning, sales) and combine them into a single polite and persuasive message for the client. Write as a human salesperson would. Do not mention that you are an AI. Avoid using the client's name unless it was explicitly provided, and do not include phrases like \"Sincerely, [Your Name]\" if you don't know your own name.";

/// A named, instructed, model-bound participant in a swarm.
///
/// The router sees every agent as a single tool taking one string `input`;
/// when dispatched, the agent runs its own conversation against `model`
/// and may call its own tools. Schemas are derived once in
/// [`AgentBuilder::build`] and never change afterwards.
#[derive(Debug, Clone)]
pub struct Agent {
    name: String,
    description: String,
    instructions: String,
    model: String,
    tools: Vec<AgentTool>,
    tool_schema: ToolSchema,
    tool_schemas: Vec<ToolSchema>,
}

impl Agent {
    pub fn builder<S: Into<String>>(name: S) -> AgentBuilder {
        AgentBuilder {
            name: name.into(),
            description: String::new(),
            instructions: String::new(),
            model: DEFAULT_MODEL.to_string(),
            tools: Vec::new(),
        }
    }

    /// The finalizer used when a run does not supply one
    pub fn default_finalizer() -> Self {
        let description = "Generates the final response based on messages from other agents";
        Agent {
            name: "finalizer".to_string(),
            description: description.to_string(),
            instructions: FINALIZER_INSTRUCTIONS.to_string(),
            model: DEFAULT_MODEL.to_string(),
            tools: Vec::new(),
            tool_schema: ToolSchema::agent_input("finalizer", description),
            tool_schemas: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn tools(&self) -> &[AgentTool] {
        &self.tools
    }

    /// How the agent presents itself to the router
    pub fn tool_schema(&self) -> &ToolSchema {
        &self.tool_schema
    }

    /// Schemas of the agent's own tools
    pub fn tool_schemas(&self) -> &[ToolSchema] {
        &self.tool_schemas
    }

    /// Find a callable tool by name. Schema-only tools are never returned.
    pub fn function(&self, name: &str) -> Option<&FunctionTool> {
        self.tools.iter().find_map(|tool| match tool {
            AgentTool::Function(function) if function.name == name => Some(function),
            _ => None,
        })
    }

    pub fn spec(&self) -> AgentSpec {
        AgentSpec {
            name: self.name.clone(),
            description: self.description.clone(),
            model: self.model.clone(),
            system_message: self.instructions.clone(),
            tools: self.tool_schemas.clone(),
        }
    }
}

pub struct AgentBuilder {
    name: String,
    description: String,
    instructions: String,
    model: String,
    tools: Vec<AgentTool>,
}

impl AgentBuilder {
    pub fn description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = description.into();
        self
    }

    pub fn instructions<S: Into<String>>(mut self, instructions: S) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn model<S: Into<String>>(mut self, model: S) -> Self {
        self.model = model.into();
        self
    }

    pub fn tool<T: Into<AgentTool>>(mut self, tool: T) -> Self {
        self.tools.push(tool.into());
        self
    }

    pub fn tools<I, T>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<AgentTool>,
    {
        self.tools.extend(tools.into_iter().map(Into::into));
        self
    }

    /// Register a tool given as a JSON definition
    pub fn tool_value(self, value: Value) -> Result<Self, SchemaError> {
        Ok(self.tool(AgentTool::from_value(value)?))
    }

    pub fn build(self) -> Result<Agent, SchemaError> {
        let mut names = HashSet::new();
        let mut tool_schemas = Vec::with_capacity(self.tools.len());
        for tool in &self.tools {
            let schema = tool.schema()?;
            if !names.insert(schema.name.clone()) {
                return Err(SchemaError::DuplicateTool(schema.name));
            }
            tool_schemas.push(schema);
        }

        Ok(Agent {
            tool_schema: ToolSchema::agent_input(&self.name, &self.description),
            name: self.name,
            description: self.description,
            instructions: self.instructions,
            model: self.model,
            tools: self.tools,
            tool_schemas,
        })
    }
}

/// A read-only view of an agent, shaped for registration with hosted agent
/// APIs and for team files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub system_message: String,
    #[serde(default)]
    pub tools: Vec<ToolSchema>,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

impl TryFrom<AgentSpec> for Agent {
    type Error = SchemaError;

    fn try_from(spec: AgentSpec) -> Result<Self, Self::Error> {
        Agent::builder(spec.name)
            .description(spec.description)
            .instructions(spec.system_message)
            .model(spec.model)
            .tools(spec.tools)
            .build()
    }
}
