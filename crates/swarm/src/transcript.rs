//! Helpers for inspecting a finished conversation.
use std::collections::HashSet;
use thiserror::Error;

use crate::models::message::Message;
use crate::models::role::Role;

#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum TranscriptError {
    #[error("Message {index} is a tool reply without a tool_call_id")]
    MissingToolCallId { index: usize },
    #[error("Message {index} answers tool call {id} which was never requested")]
    UnexpectedToolReply { index: usize, id: String },
    #[error("Tool call {id} was never answered")]
    UnansweredToolCall { id: String },
}

/// The last non-empty assistant text, which after a completed run is the
/// finalizer's synthesis
pub fn final_answer(messages: &[Message]) -> Option<&str> {
    messages
        .iter()
        .rev()
        .filter(|message| message.role == Role::Assistant)
        .find_map(Message::text)
}

/// Check that every tool reply answers an earlier tool call and that every
/// tool call is answered before the next assistant turn
pub fn validate(messages: &[Message]) -> Result<(), TranscriptError> {
    let mut pending: Vec<&str> = Vec::new();
    let mut requested: HashSet<&str> = HashSet::new();

    for (index, message) in messages.iter().enumerate() {
        match message.role {
            Role::Assistant => {
                if let Some(id) = pending.first() {
                    return Err(TranscriptError::UnansweredToolCall { id: id.to_string() });
                }
                for call in message.tool_calls() {
                    pending.push(&call.id);
                    requested.insert(&call.id);
                }
            }
            Role::Tool => {
                let id = message
                    .tool_call_id
                    .as_deref()
                    .ok_or(TranscriptError::MissingToolCallId { index })?;
                match pending.iter().position(|pending| *pending == id) {
                    Some(position) => {
                        pending.remove(position);
                    }
                    None if requested.contains(id) => {}
                    None => {
                        return Err(TranscriptError::UnexpectedToolReply {
                            index,
                            id: id.to_string(),
                        })
                    }
                }
            }
            Role::System | Role::User => {}
        }
    }

    match pending.first() {
        Some(id) => Err(TranscriptError::UnansweredToolCall { id: id.to_string() }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::message::ToolCall;

    fn routed() -> Vec<Message> {
        vec![
            Message::user().with_text("I want a quote"),
            Message::assistant().with_tool_call(ToolCall::new("call_1", "sales", "{}")),
            Message::tool("call_1").with_text("Calling agent: sales"),
            Message::assistant().with_text("The X1 is $499."),
            Message::assistant(),
            Message::assistant().with_text("Final answer"),
        ]
    }

    #[test]
    fn test_final_answer() {
        assert_eq!(final_answer(&routed()), Some("Final answer"));

        let mut messages = routed();
        messages.pop();
        // empty assistant messages are skipped
        assert_eq!(final_answer(&messages), Some("The X1 is $499."));

        assert_eq!(final_answer(&[Message::user().with_text("hi")]), None);
        assert_eq!(final_answer(&[]), None);
    }

    #[test]
    fn test_validate_accepts_answered_calls() {
        assert_eq!(validate(&routed()), Ok(()));
    }

    #[test]
    fn test_validate_rejects_unanswered_call() {
        let messages = vec![
            Message::assistant().with_tool_call(ToolCall::new("call_1", "sales", "{}")),
            Message::assistant().with_text("too soon"),
        ];
        assert_eq!(
            validate(&messages),
            Err(TranscriptError::UnansweredToolCall {
                id: "call_1".into()
            })
        );

        let trailing = vec![Message::assistant().with_tool_call(ToolCall::new("call_2", "sales", "{}"))];
        assert!(matches!(
            validate(&trailing),
            Err(TranscriptError::UnansweredToolCall { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_stray_replies() {
        let messages = vec![Message::tool("nope").with_text("hello")];
        assert_eq!(
            validate(&messages),
            Err(TranscriptError::UnexpectedToolReply {
                index: 0,
                id: "nope".into()
            })
        );

        let mut missing = Message::tool("x");
        missing.tool_call_id = None;
        assert_eq!(
            validate(&[missing]),
            Err(TranscriptError::MissingToolCallId { index: 0 })
        );
    }
}
