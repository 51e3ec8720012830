//! The decision channel: one prompt exchange, one parsed [`AgentAction`].

use std::sync::Arc;

use once_cell::sync::Lazy;
use redress_api::llm::{DecisionRequest, DecisionTransport, ToolDefinition, ToolInvocation};
use redress_types::{AgentAction, AgentDecision, DecisionError};
use serde_json::{json, Value};

/// The tools the model may call, one per action variant.
static TOOL_CATALOGUE: Lazy<Vec<ToolDefinition>> = Lazy::new(|| {
    vec![
        tool(
            "type_message",
            "Type a message into the visible input field and send it.",
            json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string", "description": "The message to send, written as the customer" }
                },
                "required": ["text"]
            }),
        ),
        tool(
            "click_element",
            "Click a visible element by its label.",
            json!({
                "type": "object",
                "properties": {
                    "label": { "type": "string", "description": "Label of the element to click" },
                    "index": { "type": "integer", "description": "Zero-based index among clickable elements, when no label fits" },
                    "expected_outcome": { "type": "string", "description": "What the click should achieve" }
                }
            }),
        ),
        tool(
            "scroll_forward",
            "Scroll down to reveal more content.",
            reason_schema("Why scrolling helps"),
        ),
        tool(
            "scroll_backward",
            "Scroll up towards the top of the screen.",
            reason_schema("Why scrolling helps"),
        ),
        tool(
            "wait",
            "Do nothing and let the screen settle (e.g. while support replies).",
            reason_schema("What you are waiting for"),
        ),
        tool(
            "upload_file",
            "Attach the customer's evidence through the app's upload control.",
            json!({
                "type": "object",
                "properties": {
                    "description": { "type": "string", "description": "What is being uploaded" }
                },
                "required": ["description"]
            }),
        ),
        tool(
            "press_back",
            "Navigate back to the previous screen.",
            reason_schema("Why going back helps"),
        ),
        tool(
            "request_human_review",
            "Stop and hand the case to a human (sensitive data requested, unexpected state).",
            json!({
                "type": "object",
                "properties": {
                    "reason": { "type": "string", "description": "Why a human is needed" },
                    "input_prompt": { "type": "string", "description": "Question to put to the human, if any" }
                },
                "required": ["reason"]
            }),
        ),
        tool(
            "mark_resolved",
            "Declare the case resolved. Only after the app confirmed the outcome.",
            json!({
                "type": "object",
                "properties": {
                    "summary": { "type": "string", "description": "What was achieved" }
                },
                "required": ["summary"]
            }),
        ),
    ]
});

fn tool(name: &str, description: &str, parameters: Value) -> ToolDefinition {
    ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        parameters,
    }
}

fn reason_schema(description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "reason": { "type": "string", "description": description }
        },
        "required": ["reason"]
    })
}

/// Exchanges one `(system, user)` pair for one [`AgentDecision`].
///
/// Transport errors propagate for the loop to classify; a malformed tool
/// call is retried once and then degraded to `Wait`, so a single garbled
/// response never kills a run.
pub struct DecisionChannel {
    transport: Arc<dyn DecisionTransport>,
}

impl DecisionChannel {
    pub fn new(transport: Arc<dyn DecisionTransport>) -> Self {
        Self { transport }
    }

    pub async fn decide(
        &self,
        system_prompt: &str,
        user_message: &str,
        consecutive_failures: u32,
    ) -> Result<AgentDecision, DecisionError> {
        // A little entropy after failures gets the model off a bad fixpoint.
        let temperature = if consecutive_failures > 0 { 0.5 } else { 0.0 };

        let request = DecisionRequest {
            system_prompt,
            user_message,
            tools: &TOOL_CATALOGUE,
            temperature,
        };

        let invocation = self.transport.request_action(request).await?;
        match parse_invocation(invocation) {
            Ok(decision) => Ok(decision),
            Err(first_error) => {
                tracing::warn!(%first_error, "malformed tool call; retrying once");
                let retry = self.transport.request_action(request).await?;
                Ok(parse_invocation(retry).unwrap_or_else(|second_error| {
                    tracing::warn!(%second_error, "retry also malformed; degrading to wait");
                    AgentDecision {
                        action: AgentAction::Wait { reason: "parse error".into() },
                        reasoning: String::new(),
                    }
                }))
            }
        }
    }
}

/// Turns a named tool invocation into a typed action. The tool name doubles
/// as the serde tag, so one `from_value` covers every variant.
fn parse_invocation(invocation: ToolInvocation) -> Result<AgentDecision, DecisionError> {
    let ToolInvocation { name, arguments, reasoning } = invocation;

    let mut tagged = match arguments {
        Value::Object(map) => Value::Object(map),
        Value::Null => json!({}),
        other => {
            return Err(DecisionError::Invalid(format!(
                "tool arguments must be an object, got {}",
                other
            )))
        }
    };
    tagged["action"] = Value::String(name.clone());

    let action: AgentAction = serde_json::from_value(tagged)
        .map_err(|e| DecisionError::Invalid(format!("bad arguments for {}: {}", name, e)))?;

    let reasoning = reasoning
        .or_else(|| action_reason(&action))
        .unwrap_or_default();

    Ok(AgentDecision { action, reasoning })
}

/// Falls back to the action's own `reason`-style argument when the model
/// sent no prose.
fn action_reason(action: &AgentAction) -> Option<String> {
    match action {
        AgentAction::ScrollForward { reason }
        | AgentAction::ScrollBackward { reason }
        | AgentAction::Wait { reason }
        | AgentAction::PressBack { reason }
        | AgentAction::RequestHumanReview { reason, .. } => Some(reason.clone()),
        AgentAction::ClickElement { expected_outcome, .. } => expected_outcome.clone(),
        _ => None,
    }
}
