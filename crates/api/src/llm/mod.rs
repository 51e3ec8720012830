//! The decision channel boundary: one prompt in, one tool invocation out.

pub mod http;
pub mod mock;

use async_trait::async_trait;
use redress_types::DecisionError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use http::HttpDecisionTransport;
pub use mock::ScriptedTransport;

/// A tool the model may call, in function-calling schema form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Function name, e.g. `click_element`.
    pub name: String,
    /// What the function does; the model uses this to pick.
    pub description: String,
    /// JSON Schema of the accepted arguments.
    pub parameters: Value,
}

/// The model's answer: exactly one named tool call with structured
/// arguments, plus any free-text reasoning it produced alongside.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub name: String,
    pub arguments: Value,
    pub reasoning: Option<String>,
}

/// One decision request.
#[derive(Debug, Clone, Copy)]
pub struct DecisionRequest<'a> {
    pub system_prompt: &'a str,
    pub user_message: &'a str,
    pub tools: &'a [ToolDefinition],
    pub temperature: f32,
}

/// Transport to the language model.
///
/// Responsible only for carrying the request and returning a structured
/// invocation; policy and history pruning happen elsewhere. Failures must be
/// classified so the loop can tell transient from permanent.
#[async_trait]
pub trait DecisionTransport: Send + Sync {
    async fn request_action(
        &self,
        request: DecisionRequest<'_>,
    ) -> Result<ToolInvocation, DecisionError>;
}
