use futures::future::BoxFuture;
use serde_json::Value;
use std::fmt::{self, Debug};
use std::future::Future;
use std::sync::Arc;

use super::schema::Parameter;

/// The function that powers a tool. Arguments arrive positionally.
pub type ToolHandler =
    Arc<dyn Fn(Vec<Value>) -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync>;

/// A callable tool with declared parameters
#[derive(Clone)]
pub struct FunctionTool {
    pub name: String,
    pub description: String,
    pub parameters: Vec<Parameter>,
    handler: ToolHandler,
}

impl FunctionTool {
    pub fn new<N, D, F, Fut>(name: N, description: D, handler: F) -> Self
    where
        N: Into<String>,
        D: Into<String>,
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
            handler: Arc::new(move |args| Box::pin(handler(args))),
        }
    }

    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_parameters<I: IntoIterator<Item = Parameter>>(mut self, parameters: I) -> Self {
        self.parameters.extend(parameters);
        self
    }

    /// Invoke the tool with positional arguments
    pub async fn call(&self, args: Vec<Value>) -> anyhow::Result<Value> {
        (self.handler)(args).await
    }
}

impl Debug for FunctionTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .field("handler", &"<function>")
            .finish()
    }
}
