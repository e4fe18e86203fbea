use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::models::message::Message;
use crate::providers::base::{Provider, Usage};
use crate::tool::ToolSchema;

/// What the mock saw for one completion call
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub tools: Vec<String>,
}

/// A mock provider that returns pre-configured responses for testing
#[derive(Clone, Default)]
pub struct MockProvider {
    responses: Arc<Mutex<VecDeque<Result<Message, String>>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockProvider {
    /// Create a new mock provider with a sequence of responses
    pub fn new(responses: Vec<Message>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into_iter().map(Ok).collect())),
            requests: Arc::default(),
        }
    }

    /// Queue a transport failure after the responses already queued
    pub fn then_fail<S: Into<String>>(self, error: S) -> Self {
        self.responses.lock().unwrap().push_back(Err(error.into()));
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(
        &self,
        model: &str,
        messages: &[Message],
        tools: &[ToolSchema],
    ) -> Result<(Message, Usage)> {
        self.requests.lock().unwrap().push(RecordedRequest {
            model: model.to_string(),
            messages: messages.to_vec(),
            tools: tools.iter().map(|tool| tool.name.clone()).collect(),
        });

        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(message)) => Ok((message, Usage::new(Some(1), Some(1), Some(2)))),
            Some(Err(error)) => Err(anyhow!(error)),
            None => Err(anyhow!("MockProvider has no more responses")),
        }
    }
}
