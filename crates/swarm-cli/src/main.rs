mod configuration;
mod error;
mod render;
mod team;

use anyhow::{Context, Result};
use clap::Parser;
use cliclack::spinner;
use console::style;
use std::env;
use std::path::PathBuf;
use swarm::{Message, RunRequest, StopReason, Swarm};
use tracing_subscriber::EnvFilter;

use configuration::Settings;
use team::Team;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// OpenAI API key (can also be set via SWARM_OPENAI__API_KEY or OPENAI_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// API host for an OpenAI-compatible endpoint
    #[arg(long)]
    host: Option<String>,

    /// Route all API traffic through this HTTP(S) proxy
    #[arg(long)]
    proxy: Option<String>,

    /// Model for the router and built-in agents
    #[arg(short, long)]
    model: Option<String>,

    /// YAML team file to use instead of the built-in sales team
    #[arg(short, long)]
    team: Option<PathBuf>,

    /// Maximum number of routing turns
    #[arg(long)]
    max_turns: Option<usize>,

    /// Log every request, response and tool execution
    #[arg(short, long)]
    debug: bool,

    /// Print the transcript as JSON instead of rendering it
    #[arg(long)]
    raw: bool,

    /// The client's message
    #[arg(required = true)]
    message: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let filter = if cli.debug {
        "swarm=debug,swarm_cli=debug"
    } else {
        "swarm=warn,swarm_cli=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with_writer(std::io::stderr)
        .init();

    let mut settings = Settings::new()?;
    apply_overrides(&mut settings, &cli);

    let team = match &settings.team {
        Some(path) => Team::from_file(path)?,
        None => Team::sales(&settings.model)?,
    };
    let swarm = Swarm::openai(settings.provider_config()?)
        .context("Failed to create the API client")?;

    let mut request = RunRequest::new(&team.agents)
        .message(Message::user().with_text(cli.message.join(" ")))
        .max_turns(settings.max_turns)
        .debug(cli.debug);
    if let Some(router) = &team.router {
        request = request.router(router);
    }
    if let Some(finalizer) = &team.finalizer {
        request = request.finalizer(finalizer);
    }

    let spin = spinner();
    spin.start("agents at work");
    let output = swarm.run(request).await;
    spin.stop("");
    let output = output?;

    if cli.raw {
        println!("{}", serde_json::to_string_pretty(&output.messages)?);
        return Ok(());
    }

    render::print_transcript(&output.messages);
    if output.stop == StopReason::MaxTurns {
        println!(
            "{}",
            style(format!("Stopped after {} turns.", output.turns)).yellow()
        );
    }
    match output.final_answer() {
        Some(answer) => render::print_final_answer(answer)?,
        None => println!("{}", style("No answer was produced.").dim()),
    }
    if let Some(total) = output.usage.total_tokens {
        println!("{}", style(format!("{} tokens used", total)).dim());
    }
    Ok(())
}

/// Flags win over settings; `OPENAI_API_KEY` is the last resort for the key
fn apply_overrides(settings: &mut Settings, cli: &Cli) {
    if let Some(model) = &cli.model {
        settings.model = model.clone();
    }
    if let Some(team) = &cli.team {
        settings.team = Some(team.clone());
    }
    if let Some(max_turns) = cli.max_turns {
        settings.max_turns = max_turns;
    }
    if let Some(host) = &cli.host {
        settings.openai.host = host.clone();
    }
    if let Some(proxy) = &cli.proxy {
        settings.openai.proxy = Some(proxy.clone());
    }
    settings.openai.api_key = cli
        .api_key
        .clone()
        .or(settings.openai.api_key.take())
        .or_else(|| env::var("OPENAI_API_KEY").ok());
}
