//! OpenAI-compatible chat-completions transport.
//!
//! Works against any endpoint speaking the `/v1/chat/completions` tool-call
//! protocol (OpenAI, Anthropic via gateway, vLLM, Ollama). HTTP status
//! classes are mapped onto [`DecisionError`] variants so the control loop
//! can distinguish auth failures from rate limits from connectivity.

use std::time::Duration;

use async_trait::async_trait;
use redress_types::DecisionError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{DecisionRequest, DecisionTransport, ToolInvocation};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP adapter for OpenAI-compatible inference APIs.
pub struct HttpDecisionTransport {
    client: Client,
    api_url: String,
    api_key: String,
    model_name: String,
}

impl HttpDecisionTransport {
    pub fn new(api_url: String, api_key: String, model_name: String) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { client, api_url, api_key, model_name }
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Tool>>,
    tool_choice: &'a str,
    temperature: f32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct Tool {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: ToolFunction,
}

#[derive(Serialize)]
struct ToolFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Deserialize)]
struct ToolCall {
    function: FunctionCall,
}

#[derive(Deserialize)]
struct FunctionCall {
    name: String,
    arguments: String,
}

fn classify_status(status: u16) -> DecisionError {
    match status {
        401 | 403 => DecisionError::Auth { status },
        404 => DecisionError::ModelNotFound,
        429 => DecisionError::RateLimited,
        other => DecisionError::Http { status: other },
    }
}

fn classify_transport(err: reqwest::Error) -> DecisionError {
    if err.is_timeout() {
        DecisionError::Timeout
    } else if err.is_connect() {
        DecisionError::NoInternet
    } else {
        DecisionError::Transport(err.to_string())
    }
}

#[async_trait]
impl DecisionTransport for HttpDecisionTransport {
    async fn request_action(
        &self,
        request: DecisionRequest<'_>,
    ) -> Result<ToolInvocation, DecisionError> {
        let tools = if request.tools.is_empty() {
            None
        } else {
            Some(
                request
                    .tools
                    .iter()
                    .map(|t| Tool {
                        tool_type: "function",
                        function: ToolFunction {
                            name: t.name.clone(),
                            description: t.description.clone(),
                            parameters: t.parameters.clone(),
                        },
                    })
                    .collect(),
            )
        };

        let body = ChatCompletionRequest {
            model: &self.model_name,
            messages: vec![
                Message { role: "system", content: request.system_prompt },
                Message { role: "user", content: request.user_message },
            ],
            tools,
            tool_choice: "required",
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), %detail, "decision request rejected");
            return Err(classify_status(status.as_u16()));
        }

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| DecisionError::Invalid(format!("malformed response: {}", e)))?;

        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| DecisionError::Invalid("no choices returned".into()))?;

        let reasoning = choice.message.content.filter(|c| !c.trim().is_empty());

        let call = choice
            .message
            .tool_calls
            .and_then(|mut calls| if calls.is_empty() { None } else { Some(calls.remove(0)) })
            .ok_or_else(|| DecisionError::Invalid("model returned no tool call".into()))?;

        let arguments: Value =
            serde_json::from_str(&call.function.arguments).unwrap_or_else(|_| json!({}));

        Ok(ToolInvocation { name: call.function.name, arguments, reasoning })
    }
}
