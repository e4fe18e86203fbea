//! The turn-taking loop that drives a router and its agents.
//!
//! A run alternates between asking the router which agents to involve and
//! dispatching each chosen agent in its own nested conversation. It ends when
//! the router answers in plain text or the turn cap is reached, after which a
//! finalizer folds every agent reply into one message.
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::agent::Agent;
use crate::errors::{
    ConfigError, DispatchError, SwarmError, SwarmResult, ToolError, ToolResult, TOOL_ERROR_MESSAGE,
};
use crate::models::message::{Message, ToolCall};
use crate::providers::base::{Provider, Usage};
use crate::providers::configs::OpenAiProviderConfig;
use crate::providers::openai::OpenAiProvider;
use crate::tool::{FunctionTool, ToolSchema};
use crate::transcript;

pub const DEFAULT_MAX_TURNS: usize = 10;

/// Why the routing loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The router answered without calling any agent
    Completed,
    /// The turn cap was reached while the router was still dispatching
    MaxTurns,
}

/// Everything a single run needs
#[derive(Debug, Clone)]
pub struct RunRequest<'a> {
    pub agents: &'a [Agent],
    pub router: Option<&'a Agent>,
    pub finalizer: Option<&'a Agent>,
    pub messages: Vec<Message>,
    pub max_turns: usize,
    pub debug: bool,
}

impl<'a> RunRequest<'a> {
    pub fn new(agents: &'a [Agent]) -> Self {
        Self {
            agents,
            router: None,
            finalizer: None,
            messages: Vec::new(),
            max_turns: DEFAULT_MAX_TURNS,
            debug: false,
        }
    }

    /// Seed the conversation with the router's instructions and use its model
    pub fn router(mut self, router: &'a Agent) -> Self {
        self.router = Some(router);
        self
    }

    pub fn finalizer(mut self, finalizer: &'a Agent) -> Self {
        self.finalizer = Some(finalizer);
        self
    }

    pub fn messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    pub fn message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    pub fn max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }

    /// Log every request, response and tool execution
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

/// The result of a run
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// The full conversation, including tool acknowledgements, agent replies
    /// and the finalizer's synthesis
    pub messages: Vec<Message>,
    /// Text replies collected from the router and agents, in order
    pub replies: Vec<String>,
    /// Number of routing requests made
    pub turns: usize,
    pub stop: StopReason,
    pub usage: Usage,
}

impl RunOutput {
    pub fn final_answer(&self) -> Option<&str> {
        transcript::final_answer(&self.messages)
    }
}

/// Orchestrates routers, agents and finalizers over one chat provider
pub struct Swarm {
    provider: Box<dyn Provider>,
}

impl Swarm {
    pub fn new<P: Provider + 'static>(provider: P) -> Self {
        Self {
            provider: Box::new(provider),
        }
    }

    pub fn openai(config: OpenAiProviderConfig) -> anyhow::Result<Self> {
        Ok(Self::new(OpenAiProvider::new(config)?))
    }

    pub async fn run(&self, request: RunRequest<'_>) -> SwarmResult<RunOutput> {
        let RunRequest {
            agents,
            router,
            finalizer,
            messages,
            max_turns,
            debug,
        } = request;

        let first = agents.first().ok_or(ConfigError::NoAgents)?;
        let mut by_name = HashMap::with_capacity(agents.len());
        for agent in agents {
            if by_name.insert(agent.name(), agent).is_some() {
                return Err(ConfigError::DuplicateAgent(agent.name().to_string()).into());
            }
        }

        info!(
            agents = agents.len(),
            router = router.map(Agent::name),
            max_turns,
            "swarm run started"
        );

        let mut conversation = Vec::with_capacity(messages.len() + 1);
        if let Some(router) = router {
            conversation.push(Message::system().with_text(router.instructions()));
        }
        conversation.extend(messages);

        let mut run = Run {
            provider: self.provider.as_ref(),
            agents: by_name,
            router_tools: agents.iter().map(|a| a.tool_schema().clone()).collect(),
            conversation,
            replies: Vec::new(),
            usage: Usage::default(),
            debug,
        };

        let model = router.map(Agent::model).unwrap_or(first.model());
        let mut turns = 0;
        let mut stop = StopReason::MaxTurns;
        while turns < max_turns {
            turns += 1;
            if run.route(model).await? {
                stop = StopReason::Completed;
                break;
            }
        }

        if !run.replies.is_empty() {
            let default_finalizer;
            let finalizer = match finalizer {
                Some(finalizer) => finalizer,
                None => {
                    default_finalizer = Agent::default_finalizer();
                    &default_finalizer
                }
            };
            run.finalize(finalizer).await?;
        }

        info!(
            turns,
            stop = ?stop,
            replies = run.replies.len(),
            messages = run.conversation.len(),
            "swarm run finished"
        );

        Ok(RunOutput {
            messages: run.conversation,
            replies: run.replies,
            turns,
            stop,
            usage: run.usage,
        })
    }
}

/// State owned by one invocation of [`Swarm::run`]
struct Run<'a> {
    provider: &'a dyn Provider,
    agents: HashMap<&'a str, &'a Agent>,
    router_tools: Vec<ToolSchema>,
    conversation: Vec<Message>,
    replies: Vec<String>,
    usage: Usage,
    debug: bool,
}

impl<'a> Run<'a> {
    async fn complete(
        &self,
        model: &str,
        messages: &[Message],
        tools: &[ToolSchema],
    ) -> SwarmResult<(Message, Usage)> {
        if self.debug {
            debug!(model, tools = tools.len(), messages = ?messages, "chat request");
        }
        let (message, usage) = self
            .provider
            .complete(model, messages, tools)
            .await
            .map_err(SwarmError::Transport)?;
        if self.debug {
            debug!(model, response = ?message, "chat response");
        }
        Ok((message, usage))
    }

    /// One routing step. Returns true when the router answered in plain text.
    async fn route(&mut self, model: &str) -> SwarmResult<bool> {
        let (response, usage) = self
            .complete(model, &self.conversation, &self.router_tools)
            .await?;
        self.usage.add(&usage);
        self.conversation.push(response.clone());

        if !response.has_tool_calls() {
            if let Some(text) = response.text() {
                self.replies.push(text.to_string());
            }
            return Ok(true);
        }

        // Every tool call is answered before any agent runs, so the transcript
        // stays valid for the nested conversations that include it.
        for call in response.tool_calls() {
            let ack = Message::tool(&call.id).with_text(format!("Calling agent: {}", call.name));
            if self.debug {
                debug!(tool_call_id = %call.id, agent = %call.name, "tool acknowledgement");
            }
            self.conversation.push(ack);
        }

        let mut dispatches = Vec::with_capacity(response.tool_calls().len());
        for call in response.tool_calls() {
            let agent = *self
                .agents
                .get(call.name.as_str())
                .ok_or_else(|| DispatchError::UnknownAgent(call.name.clone()))?;
            dispatches.push((agent, agent_input(call)?));
        }

        for (agent, input) in dispatches {
            self.dispatch(agent, input).await?;
        }

        Ok(false)
    }

    async fn dispatch(&mut self, agent: &Agent, input: String) -> SwarmResult<()> {
        let mut nested = Vec::with_capacity(self.conversation.len() + 2);
        nested.push(Message::system().with_text(agent.instructions()));
        nested.extend(self.conversation.iter().cloned());
        nested.push(Message::user().with_text(input));

        let (response, usage) = self
            .complete(agent.model(), &nested, agent.tool_schemas())
            .await?;
        self.usage.add(&usage);
        if self.debug {
            debug!(agent = agent.name(), response = ?response, "agent response");
        }
        self.conversation.push(response.clone());

        for call in response.tool_calls() {
            let content = self.execute_tool(agent, call).await?;
            self.conversation
                .push(Message::tool(&call.id).with_text(content));
        }

        if let Some(text) = response.text() {
            self.replies.push(text.to_string());
        }
        Ok(())
    }

    /// Run one of the agent's own tools. Only malformed argument JSON is fatal;
    /// anything that goes wrong inside the tool is logged and masked.
    async fn execute_tool(&self, agent: &Agent, call: &ToolCall) -> SwarmResult<String> {
        let args = call
            .parse_arguments()
            .map_err(|source| DispatchError::InvalidArguments {
                id: call.id.clone(),
                name: call.name.clone(),
                source,
            })?;

        let Some(function) = agent.function(&call.name) else {
            if self.debug {
                debug!(agent = agent.name(), tool = %call.name, "no callable registered");
            }
            return Ok(format!("Calling agent: {}", call.name));
        };

        match invoke(function, args).await {
            Ok(result) => {
                if self.debug {
                    debug!(agent = agent.name(), tool = %call.name, result = %result, "tool executed");
                }
                Ok(result)
            }
            Err(error) => {
                warn!(
                    agent = agent.name(),
                    tool = %call.name,
                    tool_call_id = %call.id,
                    error = %error,
                    "tool execution failed"
                );
                Ok(TOOL_ERROR_MESSAGE.to_string())
            }
        }
    }

    async fn finalize(&mut self, finalizer: &Agent) -> SwarmResult<()> {
        let combined = self.replies.join("\n\n");
        let messages = [
            Message::system().with_text(finalizer.instructions()),
            Message::user().with_text(combined),
        ];

        let (response, usage) = self.complete(finalizer.model(), &messages, &[]).await?;
        self.usage.add(&usage);
        if self.debug {
            debug!(finalizer = finalizer.name(), response = ?response, "finalizer response");
        }
        self.conversation.push(response);
        Ok(())
    }
}

/// Pull the `input` argument out of a router tool call
fn agent_input(call: &ToolCall) -> Result<String, DispatchError> {
    let args = call
        .parse_arguments()
        .map_err(|source| DispatchError::InvalidArguments {
            id: call.id.clone(),
            name: call.name.clone(),
            source,
        })?;

    match args.get("input") {
        Some(Value::String(input)) => Ok(input.clone()),
        Some(Value::Null) | None => Err(DispatchError::MissingInput {
            id: call.id.clone(),
            agent: call.name.clone(),
        }),
        Some(other) => Ok(other.to_string()),
    }
}

/// Call a function tool, binding argument values by position in the order the
/// model emitted the keys, not by name. Omitted trailing parameters take their
/// declared defaults, up to the first one without a default.
// TODO: bind by parameter name once callers stop relying on emission order
async fn invoke(function: &FunctionTool, args: Value) -> ToolResult<String> {
    let mut values: Vec<Value> = match args {
        Value::Object(map) => map.into_iter().map(|(_, value)| value).collect(),
        Value::Array(items) => items,
        other => {
            return Err(ToolError::InvalidParameters(format!(
                "expected an argument object, got {}",
                other
            )))
        }
    };
    let defaults = function
        .parameters
        .iter()
        .skip(values.len())
        .map_while(|parameter| parameter.default.clone());
    values.extend(defaults);

    match function.call(values).await? {
        Value::Null => Err(ToolError::NoResult),
        Value::String(text) => Ok(text),
        other => Ok(other.to_string()),
    }
}
