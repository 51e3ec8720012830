//! Scripted decision transport for tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use redress_types::DecisionError;
use serde_json::Value;

use super::{DecisionRequest, DecisionTransport, ToolInvocation};

/// One recorded request, for asserting on what the model was shown.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub system_prompt: String,
    pub user_message: String,
    pub temperature: f32,
}

/// Returns canned invocations (or errors) in order.
///
/// With `repeat_last`, an exhausted script keeps replaying its final entry —
/// useful for iteration-bound tests that need an endless supply of
/// decisions. Without it, exhaustion is a transport error, so an
/// over-running test fails loudly.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<ToolInvocation, DecisionError>>>,
    last: Mutex<Option<Result<ToolInvocation, DecisionError>>>,
    repeat_last: bool,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Result<ToolInvocation, DecisionError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            repeat_last: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_repeat_last(mut self) -> Self {
        self.repeat_last = true;
        self
    }

    /// Shorthand for a successful tool call.
    pub fn call(name: &str, arguments: Value) -> Result<ToolInvocation, DecisionError> {
        Ok(ToolInvocation { name: name.to_string(), arguments, reasoning: None })
    }

    /// Every request made so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl DecisionTransport for ScriptedTransport {
    async fn request_action(
        &self,
        request: DecisionRequest<'_>,
    ) -> Result<ToolInvocation, DecisionError> {
        self.requests.lock().unwrap().push(RecordedRequest {
            system_prompt: request.system_prompt.to_string(),
            user_message: request.user_message.to_string(),
            temperature: request.temperature,
        });

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(entry) => {
                *self.last.lock().unwrap() = Some(entry.clone());
                entry
            }
            None if self.repeat_last => self
                .last
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| Err(DecisionError::Transport("script is empty".into()))),
            None => Err(DecisionError::Transport("script exhausted".into())),
        }
    }
}
