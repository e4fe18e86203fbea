use anyhow::Result;
use bat::WrappingMode;
use console::style;
use serde_json::Value;
use swarm::{Message, Role, ToolCall};

const THEME: &str = "zenburn";

/// One console line (or block) per message, distinguishing user, assistant,
/// tool call, tool result and everything else
pub fn transcript(messages: &[Message]) -> String {
    let mut out = String::new();
    for message in messages {
        match message.role {
            Role::User => {
                out.push_str(&format!(
                    "\n{} {}\n",
                    style("User:").cyan().bold(),
                    content(message)
                ));
            }
            Role::Assistant if message.has_tool_calls() => {
                for call in message.tool_calls() {
                    out.push_str(&format!(
                        "{} {} {}\n{}\n",
                        style("Assistant invoked").magenta().bold(),
                        style(&call.name).magenta(),
                        style("with arguments:").dim(),
                        arguments(call)
                    ));
                }
            }
            Role::Assistant => {
                out.push_str(&format!(
                    "{} {}\n",
                    style("Assistant:").green().bold(),
                    content(message)
                ));
            }
            Role::Tool => {
                out.push_str(&format!(
                    "{} {}\n",
                    style("Tool response:").yellow().bold(),
                    content(message)
                ));
            }
            Role::System => {
                out.push_str(&format!(
                    "{} {}\n",
                    style(format!("{}:", message.role)).dim(),
                    style(content(message)).dim()
                ));
            }
        }
    }
    out
}

fn content(message: &Message) -> &str {
    message.content.as_deref().unwrap_or_default()
}

/// Pretty-printed arguments, or the raw text when it is not valid JSON
fn arguments(call: &ToolCall) -> String {
    call.parse_arguments()
        .ok()
        .and_then(|value: Value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or_else(|| call.arguments.clone())
}

pub fn print_transcript(messages: &[Message]) {
    print!("{}", transcript(messages));
    println!("\n{}\n", style("Conversation finished.").green());
}

pub fn print_final_answer(answer: &str) -> Result<()> {
    bat::PrettyPrinter::new()
        .input(bat::Input::from_bytes(answer.as_bytes()).name("Final answer"))
        .theme(THEME)
        .language("Markdown")
        .header(true)
        .grid(true)
        .wrapping_mode(WrappingMode::Character)
        .print()?;
    println!();
    Ok(())
}
