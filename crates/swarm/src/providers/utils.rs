use anyhow::{anyhow, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Value};
use std::collections::HashSet;

use crate::models::message::{Message, ToolCall};
use crate::models::role::Role;
use crate::tool::ToolSchema;

lazy_static! {
    static ref FUNCTION_NAME_RE: Regex = Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap();
}

/// Convert internal Message format to OpenAI's API message specification
pub fn messages_to_openai_spec(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|message| {
            let mut converted = json!({
                "role": message.role,
                "content": message.content,
            });

            if let Some(tool_calls) = &message.tool_calls {
                converted["tool_calls"] = tool_calls
                    .iter()
                    .map(|call| {
                        json!({
                            "id": call.id,
                            "type": "function",
                            "function": {
                                "name": call.name,
                                "arguments": call.arguments,
                            }
                        })
                    })
                    .collect();
            }
            if let Some(id) = &message.tool_call_id {
                converted["tool_call_id"] = json!(id);
            }

            converted
        })
        .collect()
}

/// Convert internal Tool format to OpenAI's API tool specification
pub fn tools_to_openai_spec(tools: &[ToolSchema]) -> Result<Vec<Value>> {
    let mut tool_names = HashSet::new();
    let mut result = Vec::new();

    for tool in tools {
        if !is_valid_function_name(&tool.name) {
            return Err(anyhow!(
                "Invalid tool name '{}', it must match this regex [a-zA-Z0-9_-]+",
                tool.name
            ));
        }
        if !tool_names.insert(&tool.name) {
            return Err(anyhow!("Duplicate tool name: {}", tool.name));
        }

        result.push(json!({
            "type": "function",
            "function": {
                "name": tool.name,
                "description": tool.description,
                "parameters": tool.parameters,
            }
        }));
    }

    Ok(result)
}

/// Convert OpenAI's API response to internal Message format.
///
/// Tool call arguments are kept as the raw text the model produced; they are
/// only interpreted when the call is dispatched.
pub fn openai_response_to_message(response: &Value) -> Result<Message> {
    let original = response
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .ok_or_else(|| anyhow!("No message in response: {}", response))?;

    let mut message = Message::assistant();
    if let Some(text) = original.get("content").and_then(Value::as_str) {
        message = message.with_text(text);
    }

    if let Some(tool_calls) = original.get("tool_calls").and_then(Value::as_array) {
        for tool_call in tool_calls {
            let id = tool_call["id"].as_str().unwrap_or_default();
            let name = tool_call["function"]["name"].as_str().unwrap_or_default();
            let arguments = tool_call["function"]["arguments"]
                .as_str()
                .unwrap_or_default();
            message = message.with_tool_call(ToolCall::new(id, name, arguments));
        }
    }

    // Anything other than an assistant reply here means a non-conforming endpoint
    if let Some(role) = original.get("role").and_then(Value::as_str) {
        if role != Role::Assistant.as_str() {
            return Err(anyhow!("Unexpected role in response: {}", role));
        }
    }

    Ok(message)
}

fn is_valid_function_name(name: &str) -> bool {
    FUNCTION_NAME_RE.is_match(name)
}

#[derive(Debug, thiserror::Error)]
#[error("Context length exceeded. Message: {0}")]
pub struct ContextLengthExceededError(String);

pub fn check_openai_context_length_error(error: &Value) -> Option<ContextLengthExceededError> {
    let code = error.get("code")?.as_str()?;
    if code == "context_length_exceeded" || code == "string_above_max_length" {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown error")
            .to_string();
        Some(ContextLengthExceededError(message))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPENAI_TOOL_USE_RESPONSE: &str = r#"{
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "1",
                    "type": "function",
                    "function": {
                        "name": "example_fn",
                        "arguments": "{\"param\": \"value\"}"
                    }
                }]
            }
        }],
        "usage": {
            "prompt_tokens": 10,
            "completion_tokens": 25,
            "total_tokens": 35
        }
    }"#;

    fn schema(name: &str) -> ToolSchema {
        ToolSchema::new(
            name,
            "A test tool",
            json!({
                "type": "object",
                "properties": {
                    "input": {
                        "type": "string",
                        "description": "Test parameter"
                    }
                },
                "required": ["input"]
            }),
        )
    }

    #[test]
    fn test_messages_to_openai_spec() {
        let message = Message::user().with_text("Hello");
        let spec = messages_to_openai_spec(&[message]);

        assert_eq!(spec.len(), 1);
        assert_eq!(spec[0], json!({"role": "user", "content": "Hello"}));
    }

    #[test]
    fn test_messages_to_openai_spec_tool_exchange() {
        let messages = vec![
            Message::system().with_text("Route the request."),
            Message::user().with_text("I want a quote"),
            Message::assistant().with_tool_call(ToolCall::new(
                "call_1",
                "sales",
                r#"{"input":"laptop"}"#,
            )),
            Message::tool("call_1").with_text("Calling agent: sales"),
        ];

        let spec = messages_to_openai_spec(&messages);

        assert_eq!(spec.len(), 4);
        assert_eq!(spec[0]["role"], "system");
        assert_eq!(spec[2]["role"], "assistant");
        assert_eq!(spec[2]["content"], Value::Null);
        assert_eq!(spec[2]["tool_calls"][0]["type"], "function");
        assert_eq!(spec[2]["tool_calls"][0]["function"]["name"], "sales");
        assert_eq!(
            spec[2]["tool_calls"][0]["function"]["arguments"],
            r#"{"input":"laptop"}"#
        );
        assert_eq!(spec[3]["role"], "tool");
        assert_eq!(spec[3]["tool_call_id"], spec[2]["tool_calls"][0]["id"]);
        assert_eq!(spec[3]["content"], "Calling agent: sales");
        // created is local bookkeeping and never sent
        assert!(spec.iter().all(|m| m.get("created").is_none()));
    }

    #[test]
    fn test_tools_to_openai_spec() -> Result<()> {
        let spec = tools_to_openai_spec(&[schema("test_tool")])?;

        assert_eq!(spec.len(), 1);
        assert_eq!(spec[0]["type"], "function");
        assert_eq!(spec[0]["function"]["name"], "test_tool");
        assert_eq!(spec[0]["function"]["parameters"]["required"], json!(["input"]));
        Ok(())
    }

    #[test]
    fn test_tools_to_openai_spec_duplicate() {
        let result = tools_to_openai_spec(&[schema("test_tool"), schema("test_tool")]);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Duplicate tool name"));
    }

    #[test]
    fn test_tools_to_openai_spec_invalid_name() {
        let result = tools_to_openai_spec(&[schema("sales agent")]);
        assert!(result.unwrap_err().to_string().contains("Invalid tool name"));
    }

    #[test]
    fn test_tools_to_openai_spec_empty() -> Result<()> {
        let spec = tools_to_openai_spec(&[])?;
        assert!(spec.is_empty());
        Ok(())
    }

    #[test]
    fn test_openai_response_to_message_text() -> Result<()> {
        let response = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "Hello from John Cena!"
                }
            }]
        });

        let message = openai_response_to_message(&response)?;
        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.text(), Some("Hello from John Cena!"));
        assert!(!message.has_tool_calls());
        Ok(())
    }

    #[test]
    fn test_openai_response_to_message_tool_calls() -> Result<()> {
        let response: Value = serde_json::from_str(OPENAI_TOOL_USE_RESPONSE)?;
        let message = openai_response_to_message(&response)?;

        assert_eq!(message.content, None);
        let calls = message.tool_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "1");
        assert_eq!(calls[0].name, "example_fn");
        assert_eq!(calls[0].parse_arguments()?, json!({"param": "value"}));
        Ok(())
    }

    #[test]
    fn test_openai_response_keeps_malformed_arguments() -> Result<()> {
        let mut response: Value = serde_json::from_str(OPENAI_TOOL_USE_RESPONSE)?;
        response["choices"][0]["message"]["tool_calls"][0]["function"]["arguments"] =
            json!("invalid json {");

        let message = openai_response_to_message(&response)?;
        assert_eq!(message.tool_calls()[0].arguments, "invalid json {");
        assert!(message.tool_calls()[0].parse_arguments().is_err());
        Ok(())
    }

    #[test]
    fn test_openai_response_empty_tool_calls() -> Result<()> {
        let response = json!({
            "choices": [{"message": {"role": "assistant", "content": "hi", "tool_calls": []}}]
        });
        let message = openai_response_to_message(&response)?;
        assert!(!message.has_tool_calls());
        assert_eq!(message.tool_calls, None);
        Ok(())
    }

    #[test]
    fn test_openai_response_without_choices() {
        let err = openai_response_to_message(&json!({"choices": []})).unwrap_err();
        assert!(err.to_string().starts_with("No message in response"));
    }

    #[test]
    fn test_check_openai_context_length_error() {
        let error = json!({
            "code": "context_length_exceeded",
            "message": "This message is too long"
        });

        let result = check_openai_context_length_error(&error);
        assert_eq!(
            result.unwrap().to_string(),
            "Context length exceeded. Message: This message is too long"
        );

        let error = json!({
            "code": "other_error",
            "message": "Some other error"
        });
        assert!(check_openai_context_length_error(&error).is_none());
    }
}
