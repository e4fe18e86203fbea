use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use swarm::{Agent, AgentSpec, FunctionTool};

/// A router, the agents it can call and an optional finalizer
#[derive(Debug)]
pub struct Team {
    pub router: Option<Agent>,
    pub finalizer: Option<Agent>,
    pub agents: Vec<Agent>,
}

/// On-disk team description. Agents loaded this way only carry tool
/// schemas, never callables.
#[derive(Debug, Deserialize)]
struct TeamFile {
    #[serde(default)]
    router: Option<AgentSpec>,
    #[serde(default)]
    finalizer: Option<AgentSpec>,
    agents: Vec<AgentSpec>,
}

impl Team {
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read team file {}", path.display()))?;
        Self::from_yaml(&contents)
            .with_context(|| format!("Invalid team file {}", path.display()))
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let file: TeamFile = serde_yaml::from_str(yaml)?;
        if file.agents.is_empty() {
            return Err(anyhow!("A team needs at least one agent"));
        }

        Ok(Self {
            router: file.router.map(Agent::try_from).transpose()?,
            finalizer: file.finalizer.map(Agent::try_from).transpose()?,
            agents: file
                .agents
                .into_iter()
                .map(Agent::try_from)
                .collect::<Result<_, _>>()?,
        })
    }

    /// The built-in sales team: a needs analyst, a product specialist who can
    /// quote prices and a closer, coordinated by a router
    pub fn sales(model: &str) -> Result<Self> {
        let router = Agent::builder("router")
            .instructions(
                "You coordinate a sales team. Call the agents that can help with the \
                 client's request, passing each one a short instruction as `input`. \
                 Once the team has answered, reply to the client directly without \
                 calling any agent.",
            )
            .model(model)
            .build()?;

        let needs = Agent::builder("needs_analyst")
            .description("Works out what the client needs and what they can spend")
            .instructions(
                "You are a needs analyst. Summarize the client's requirements and budget \
                 in two or three sentences.",
            )
            .model(model)
            .build()?;

        let specialist = Agent::builder("product_specialist")
            .description("Recommends products and quotes prices")
            .instructions(
                "You are a product specialist. Recommend one product that fits the \
                 client's needs and use quote_price to give an exact price.",
            )
            .model(model)
            .tool(quote_price()?)
            .build()?;

        let closer = Agent::builder("closer")
            .description("Writes the closing pitch and next steps")
            .instructions(
                "You are a closer. Write a short, friendly pitch that ends with a clear \
                 next step for the client.",
            )
            .model(model)
            .build()?;

        Ok(Self {
            router: Some(router),
            finalizer: None,
            agents: vec![needs, specialist, closer],
        })
    }
}

const QUOTE_PRICE_DOC: &str = r#"
/**
 * @description Quote the price of a product in US dollars
 * @param {string} product - The product to quote @enum ["laptop", "phone", "tablet"]
 * @param {string} tier - Support tier @enum ["standard", "premium"]
 */
"#;

fn quote_price() -> Result<FunctionTool> {
    let tool = FunctionTool::from_doc(
        "quote_price",
        r#"product, tier = "standard""#,
        QUOTE_PRICE_DOC,
        |args| async move {
            let product = args
                .first()
                .and_then(Value::as_str)
                .ok_or_else(|| anyhow!("product must be a string"))?;
            let tier = args
                .get(1)
                .and_then(Value::as_str)
                .ok_or_else(|| anyhow!("tier must be a string"))?;
            let base = list_price(product).ok_or_else(|| anyhow!("No list price for {product}"))?;
            let price = match tier {
                "premium" => base + 149,
                _ => base,
            };
            Ok(json!({"product": product, "tier": tier, "price_usd": price}))
        },
    )?;
    Ok(tool)
}

fn list_price(product: &str) -> Option<u32> {
    match product.to_lowercase().as_str() {
        "laptop" => Some(899),
        "phone" => Some(599),
        "tablet" => Some(449),
        _ => None,
    }
}
